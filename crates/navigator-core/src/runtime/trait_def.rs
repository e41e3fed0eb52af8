//! The `AgentRuntime` trait -- the seam between the CLI and whatever
//! executes the task.

use crate::event::TaskEvent;
use crate::stream::Producer;

use super::types::TaskRequest;

/// Something that can run a task and report its progress as events.
///
/// `run_task` must not block: any process or network work belongs inside
/// the returned producer, which is only driven once normalized and polled.
/// The trait is object-safe so the CLI can hold a `Box<dyn AgentRuntime>`.
pub trait AgentRuntime: Send + Sync {
    /// Short name for logs (e.g. "claude-cli").
    fn name(&self) -> &str;

    fn run_task(&self, task: &TaskRequest) -> Producer<TaskEvent>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn AgentRuntime) {}
};

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use futures::StreamExt;

    use super::*;
    use crate::stream::normalize;

    /// Answers every task with a fixed list of text chunks.
    struct CannedRuntime(Vec<&'static str>);

    impl AgentRuntime for CannedRuntime {
        fn name(&self) -> &str {
            "canned"
        }

        fn run_task(&self, _task: &TaskRequest) -> Producer<TaskEvent> {
            Producer::iter(
                self.0
                    .iter()
                    .map(|chunk| TaskEvent::Text {
                        content: chunk.to_string(),
                    })
                    .collect::<Vec<_>>(),
            )
        }
    }

    #[test]
    fn runtime_is_object_safe() {
        let runtime: Box<dyn AgentRuntime> = Box::new(CannedRuntime(vec![]));
        assert_eq!(runtime.name(), "canned");
    }

    #[tokio::test]
    async fn canned_runtime_streams_through_normalize() {
        let runtime: Box<dyn AgentRuntime> = Box::new(CannedRuntime(vec!["a", "b"]));
        let task = TaskRequest::new("prompt", "model", PathBuf::from("/tmp"));

        let text: Vec<String> = normalize(runtime.run_task(&task))
            .map(|event| event.unwrap().text().unwrap().to_string())
            .collect()
            .await;
        assert_eq!(text, vec!["a", "b"]);
    }
}
