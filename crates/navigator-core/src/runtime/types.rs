//! Request types handed to an [`AgentRuntime`](super::AgentRuntime).

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::json;
use uuid::Uuid;

/// Read-only repository inspection tools granted to the agent.
pub const DEFAULT_TOOLS: &[&str] = &["Read", "LS", "Glob", "Grep"];

/// An MCP server the runtime should start alongside the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpServer {
    pub id: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl McpServer {
    /// The Firecrawl web-context server, launched through `npx`.
    pub fn firecrawl(api_key: impl Into<String>) -> Self {
        Self {
            id: "firecrawl".to_string(),
            command: "npx".to_string(),
            args: vec!["-y".to_string(), "firecrawl-mcp".to_string()],
            env: HashMap::from([("FIRECRAWL_API_KEY".to_string(), api_key.into())]),
        }
    }

    /// Tool-permission pattern covering every tool this server exposes.
    pub fn tool_pattern(&self) -> String {
        format!("mcp__{}", self.id)
    }
}

/// Render servers in the `{"mcpServers": {...}}` layout accepted by
/// `--mcp-config`.
pub fn mcp_config_json(servers: &[McpServer]) -> serde_json::Value {
    let entries: serde_json::Map<String, serde_json::Value> = servers
        .iter()
        .map(|server| {
            (
                server.id.clone(),
                json!({
                    "command": server.command,
                    "args": server.args,
                    "env": server.env,
                }),
            )
        })
        .collect();
    json!({ "mcpServers": entries })
}

/// Everything a runtime needs to run one task.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    /// Correlates log lines for this run.
    pub run_id: Uuid,
    pub prompt: String,
    pub model: String,
    /// Directory the agent inspects; also its working directory.
    pub workspace_dir: PathBuf,
    pub tools: Vec<String>,
    pub mcp_servers: Vec<McpServer>,
    /// Extra environment for the runtime process, merged over ours.
    pub env_vars: HashMap<String, String>,
}

impl TaskRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>, workspace_dir: PathBuf) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            prompt: prompt.into(),
            model: model.into(),
            workspace_dir,
            tools: DEFAULT_TOOLS.iter().map(|t| t.to_string()).collect(),
            mcp_servers: Vec::new(),
            env_vars: HashMap::new(),
        }
    }

    /// Built-in tools plus one permission pattern per MCP server.
    pub fn allowed_tools(&self) -> Vec<String> {
        self.tools
            .iter()
            .cloned()
            .chain(self.mcp_servers.iter().map(McpServer::tool_pattern))
            .collect()
    }
}
