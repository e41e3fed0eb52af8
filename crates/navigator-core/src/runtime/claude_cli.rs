//! Runtime adapter for an LLM coding CLI in print mode.
//!
//! Spawns `<binary> -p --output-format stream-json` in the workspace,
//! writes the prompt to its stdin, and parses the JSONL it prints on
//! stdout into [`TaskEvent`]s.

use std::process::Stdio;

use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::event::{TaskEvent, parse_stream_json_line};
use crate::stream::{EventSource, Producer};

use super::error::RuntimeError;
use super::trait_def::AgentRuntime;
use super::types::{TaskRequest, mcp_config_json};

/// Runs tasks through the `claude` CLI (or a compatible binary).
#[derive(Debug, Clone)]
pub struct ClaudeCliRuntime {
    /// Path to the binary. Defaults to `"claude"` (found via `$PATH`).
    binary: String,
}

impl ClaudeCliRuntime {
    pub fn new() -> Self {
        Self::with_binary("claude")
    }

    pub fn with_binary(path: impl Into<String>) -> Self {
        Self {
            binary: path.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn command(&self, task: &TaskRequest) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-p")
            .arg("--output-format")
            .arg("stream-json")
            .arg("--verbose")
            .arg("--model")
            .arg(&task.model)
            .arg("--allowedTools")
            .arg(task.allowed_tools().join(","));

        if !task.mcp_servers.is_empty() {
            cmd.arg("--mcp-config")
                .arg(mcp_config_json(&task.mcp_servers).to_string());
        }

        cmd.current_dir(&task.workspace_dir)
            .envs(&task.env_vars)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for ClaudeCliRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRuntime for ClaudeCliRuntime {
    fn name(&self) -> &str {
        "claude-cli"
    }

    fn run_task(&self, task: &TaskRequest) -> Producer<TaskEvent> {
        let cmd = self.command(task);
        let binary = self.binary.clone();
        let prompt = task.prompt.clone();
        let run_id = task.run_id;

        Producer::pending(async move {
            let run = TaskRun::spawn(cmd, binary, &prompt, run_id).await?;
            Ok::<_, anyhow::Error>(Producer::accessor(run))
        })
    }
}

/// A spawned runtime process. Its output is read through
/// [`EventSource::events`]; dropping the run (or the stream built from it)
/// kills the process.
#[derive(Debug)]
pub struct TaskRun {
    run_id: Uuid,
    child: Child,
    stdout: ChildStdout,
    stderr: Option<ChildStderr>,
}

impl TaskRun {
    async fn spawn(
        mut cmd: Command,
        binary: String,
        prompt: &str,
        run_id: Uuid,
    ) -> Result<Self, RuntimeError> {
        let mut child = cmd
            .spawn()
            .map_err(|source| RuntimeError::Spawn { binary, source })?;

        info!(run_id = %run_id, pid = ?child.id(), "agent runtime started");

        if let Some(mut stdin) = child.stdin.take() {
            // A runtime that exits without reading its prompt shows up
            // later through its exit status.
            if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                warn!(run_id = %run_id, error = %e, "failed to write prompt to agent stdin");
            }
        }

        let stdout = child.stdout.take().ok_or(RuntimeError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take();

        Ok(Self {
            run_id,
            child,
            stdout,
            stderr,
        })
    }
}

impl EventSource<TaskEvent> for TaskRun {
    fn events(self: Box<Self>) -> Producer<TaskEvent> {
        let TaskRun {
            run_id,
            mut child,
            stdout,
            stderr,
        } = *self;

        Producer::stream(async_stream::stream! {
            // Drain stderr alongside stdout so a chatty runtime cannot fill
            // the pipe and stall.
            let stderr_task = stderr.map(|mut pipe| {
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    if let Err(e) = pipe.read_to_end(&mut buf).await {
                        warn!(run_id = %run_id, error = %e, "failed to read agent stderr");
                    }
                    String::from_utf8_lossy(&buf).into_owned()
                })
            });

            let mut lines = LinesStream::new(BufReader::new(stdout).lines());
            while let Some(line) = lines.next().await {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        yield Err(anyhow::Error::from(RuntimeError::Read(e)));
                        return;
                    }
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match parse_stream_json_line(trimmed) {
                    Ok(events) => {
                        for event in events {
                            yield Ok(event);
                        }
                    }
                    Err(e) => {
                        warn!(line = trimmed, error = %e, "skipping malformed JSONL line");
                    }
                }
            }

            let status = match child.wait().await {
                Ok(status) => status,
                Err(e) => {
                    yield Err(anyhow::Error::from(RuntimeError::Read(e)));
                    return;
                }
            };
            let stderr = match stderr_task {
                Some(task) => task.await.unwrap_or_default(),
                None => String::new(),
            };

            if status.success() {
                info!(run_id = %run_id, "agent runtime finished");
            } else {
                debug!(run_id = %run_id, %status, "agent runtime exited unsuccessfully");
                yield Err(anyhow::Error::from(RuntimeError::Exited {
                    status: status.to_string(),
                    stderr: stderr.trim().to_string(),
                }));
            }
        })
    }
}
