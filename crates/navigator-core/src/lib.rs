//! Core library for `repo-navigator`: stream normalization of agent task
//! results, the task event model, the agent runtime adapter, and the
//! question prompt.

pub mod event;
pub mod prompt;
pub mod runtime;
pub mod stream;
