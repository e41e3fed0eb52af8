//! Implementation of the default command: ask one question about the
//! repository in the working directory and stream the answer to stdout.

use anyhow::{Context, Result};
use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use navigator_core::event::TaskEvent;
use navigator_core::prompt::build_task_prompt;
use navigator_core::runtime::{AgentRuntime, ClaudeCliRuntime};
use navigator_core::stream::{EventStream, normalize};

use crate::config::NavigatorConfig;

/// How an answer stream ended without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskOutcome {
    Completed,
    Interrupted,
}

/// Run one question against the configured agent runtime.
///
/// Errors returned from here happened while the task's events were being
/// streamed; setup failures surface through the same path because the
/// runtime is only spawned once the stream is first polled.
pub async fn run_ask(
    question: &str,
    config: &NavigatorConfig,
    cancel: CancellationToken,
) -> Result<AskOutcome> {
    let workspace_dir =
        std::env::current_dir().context("failed to determine the current directory")?;
    let runtime = ClaudeCliRuntime::with_binary(&config.agent_binary);

    let prompt = build_task_prompt(&workspace_dir, question);
    let task = config.task_request(prompt, workspace_dir);

    info!(
        run_id = %task.run_id,
        runtime = runtime.name(),
        model = %task.model,
        mcp_servers = task.mcp_servers.len(),
        "asking agent"
    );

    let events = normalize(runtime.run_task(&task));
    let mut stdout = tokio::io::stdout();
    write_answer(events, &mut stdout, &cancel).await
}

/// Copy text events to `out` as they arrive, then a trailing newline.
///
/// Every other event is only logged. An item error, or an
/// [`TaskEvent::Error`] reported by the runtime, aborts the copy.
pub async fn write_answer<W>(
    mut events: EventStream<TaskEvent>,
    out: &mut W,
    cancel: &CancellationToken,
) -> Result<AskOutcome>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(AskOutcome::Interrupted),
            next = events.next() => next,
        };
        let Some(event) = next else { break };

        match event? {
            TaskEvent::Text { content } => {
                out.write_all(content.as_bytes()).await?;
                out.flush().await?;
            }
            TaskEvent::Error { message } => anyhow::bail!("agent reported an error: {message}"),
            TaskEvent::ToolCall { tool, input } => debug!(tool = %tool, %input, "tool call"),
            TaskEvent::ToolResult { tool, .. } => debug!(tool = %tool, "tool result"),
            TaskEvent::TokenUsage {
                input_tokens,
                output_tokens,
            } => debug!(input_tokens, output_tokens, "token usage"),
            TaskEvent::Completed => debug!("task completed"),
        }
    }

    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(AskOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;

    fn text(s: &str) -> anyhow::Result<TaskEvent> {
        Ok(TaskEvent::Text {
            content: s.to_string(),
        })
    }

    fn events(items: Vec<anyhow::Result<TaskEvent>>) -> EventStream<TaskEvent> {
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn writes_text_only_then_newline() {
        let items = vec![
            text("The entry point "),
            Ok(TaskEvent::ToolCall {
                tool: "Read".to_string(),
                input: serde_json::json!({"file_path": "main.rs"}),
            }),
            Ok(TaskEvent::TokenUsage {
                input_tokens: 10,
                output_tokens: 3,
            }),
            text("is main.rs."),
            Ok(TaskEvent::Completed),
        ];
        let mut out = Vec::new();

        let outcome = write_answer(events(items), &mut out, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, AskOutcome::Completed);
        assert_eq!(String::from_utf8(out).unwrap(), "The entry point is main.rs.\n");
    }

    #[tokio::test]
    async fn empty_stream_writes_just_newline() {
        let mut out = Vec::new();
        let outcome = write_answer(events(vec![]), &mut out, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, AskOutcome::Completed);
        assert_eq!(out, b"\n");
    }

    #[tokio::test]
    async fn stream_error_keeps_partial_output_and_propagates() {
        let items = vec![
            text("partial"),
            Err(anyhow::anyhow!("connection reset")),
            text("never written"),
        ];
        let mut out = Vec::new();

        let err = write_answer(events(items), &mut out, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "connection reset");
        assert_eq!(out, b"partial");
    }

    #[tokio::test]
    async fn runtime_error_event_is_fatal() {
        let items = vec![
            text("a"),
            Ok(TaskEvent::Error {
                message: "rate limited".to_string(),
            }),
        ];
        let mut out = Vec::new();

        let err = write_answer(events(items), &mut out, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("rate limited"));
        assert_eq!(out, b"a");
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_stalled_stream() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let stalled: EventStream<TaskEvent> = Box::pin(stream::pending());
        let mut out = Vec::new();

        let outcome = write_answer(stalled, &mut out, &cancel).await.unwrap();

        assert_eq!(outcome, AskOutcome::Interrupted);
        assert!(out.is_empty());
    }
}
