/// Failures of the agent runtime process itself, as opposed to errors the
/// agent reports inside its event stream.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to spawn agent runtime '{binary}' -- is it installed and on PATH?")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("agent runtime has no {0} pipe")]
    MissingPipe(&'static str),

    #[error("failed to read agent runtime output")]
    Read(#[source] std::io::Error),

    #[error("agent runtime failed ({status}): {stderr}")]
    Exited { status: String, stderr: String },
}
