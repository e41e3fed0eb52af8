//! Agent runtime adapters.
//!
//! A runtime takes a [`TaskRequest`] and hands back its result as a
//! [`Producer`](crate::stream::Producer) of [`TaskEvent`](crate::event::TaskEvent)s,
//! in whatever shape suits it. Callers pass that straight to
//! [`normalize`](crate::stream::normalize).
//!
//! ```text
//! ClaudeCliRuntime::run_task(request)
//!     |
//!     v
//! Producer::Pending ---spawn--> TaskRun (events() accessor)
//!                                   |
//!                                   v
//!                              Producer::Stream over stdout JSONL
//! ```

pub mod claude_cli;
pub mod error;
pub mod trait_def;
pub mod types;

pub use claude_cli::{ClaudeCliRuntime, TaskRun};
pub use error::RuntimeError;
pub use trait_def::AgentRuntime;
pub use types::{DEFAULT_TOOLS, McpServer, TaskRequest};
