//! Configuration for repo-navigator.
//!
//! Provides an optional TOML config file at
//! `~/.config/repo-navigator/config.toml` and a resolution chain:
//! CLI flag > env var > config file > default. A `.env` file in the working
//! directory is loaded into the environment before resolution (see `main`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use navigator_core::runtime::{DEFAULT_TOOLS, McpServer, TaskRequest};

/// Model used when neither `--model`, `ANTHROPIC_MODEL` nor the config file
/// names one.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Agent runtime binary used when nothing else is configured.
pub const DEFAULT_AGENT_BINARY: &str = "claude";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required env var: {0}")]
    MissingEnv(&'static str),

    #[error("failed to read config file at {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file at {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub agent: AgentSection,
    pub firecrawl: FirecrawlSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub model: Option<String>,
    pub binary: Option<String>,
    /// Replaces the default read-only tool list.
    pub tools: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FirecrawlSection {
    /// Register the Firecrawl MCP server when `FIRECRAWL_API_KEY` is set.
    pub enabled: bool,
}

impl Default for FirecrawlSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// `$XDG_CONFIG_HOME/repo-navigator` or `~/.config/repo-navigator`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("repo-navigator");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("repo-navigator")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read
// -----------------------------------------------------------------------

/// Load the config file at `path`. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Option<ConfigFile>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    toml::from_str(&contents)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read an environment variable that must be set and non-empty.
pub fn required_env(name: &'static str) -> Result<String, ConfigError> {
    non_empty_env(name).ok_or(ConfigError::MissingEnv(name))
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug, Clone)]
pub struct NavigatorConfig {
    pub api_key: String,
    pub model: String,
    pub agent_binary: String,
    pub tools: Vec<String>,
    pub mcp_servers: Vec<McpServer>,
}

impl NavigatorConfig {
    /// Resolve configuration from flags, environment and the config file.
    ///
    /// - API key: `ANTHROPIC_API_KEY` env > error
    /// - Model: `cli_model` > `ANTHROPIC_MODEL` env > `agent.model` > [`DEFAULT_MODEL`]
    /// - Binary: `cli_binary` > `NAVIGATOR_AGENT_BINARY` env > `agent.binary` > [`DEFAULT_AGENT_BINARY`]
    /// - Firecrawl: registered when `FIRECRAWL_API_KEY` is set, unless `firecrawl.enabled = false`
    pub fn resolve(cli_model: Option<&str>, cli_binary: Option<&str>) -> Result<Self, ConfigError> {
        let file = load_config_from(&config_path())?.unwrap_or_default();
        Self::resolve_with(cli_model, cli_binary, file)
    }

    fn resolve_with(
        cli_model: Option<&str>,
        cli_binary: Option<&str>,
        file: ConfigFile,
    ) -> Result<Self, ConfigError> {
        let api_key = required_env("ANTHROPIC_API_KEY")?;

        let model = cli_model
            .map(str::to_string)
            .or_else(|| non_empty_env("ANTHROPIC_MODEL"))
            .or(file.agent.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let agent_binary = cli_binary
            .map(str::to_string)
            .or_else(|| non_empty_env("NAVIGATOR_AGENT_BINARY"))
            .or(file.agent.binary)
            .unwrap_or_else(|| DEFAULT_AGENT_BINARY.to_string());

        let tools = file
            .agent
            .tools
            .unwrap_or_else(|| DEFAULT_TOOLS.iter().map(|t| t.to_string()).collect());

        let mut mcp_servers = Vec::new();
        if file.firecrawl.enabled {
            if let Some(key) = non_empty_env("FIRECRAWL_API_KEY") {
                mcp_servers.push(McpServer::firecrawl(key));
            }
        }

        Ok(Self {
            api_key,
            model,
            agent_binary,
            tools,
            mcp_servers,
        })
    }

    /// Build the runtime request for one prompt.
    pub fn task_request(&self, prompt: String, workspace_dir: PathBuf) -> TaskRequest {
        let mut task = TaskRequest::new(prompt, self.model.clone(), workspace_dir);
        task.tools = self.tools.clone();
        task.mcp_servers = self.mcp_servers.clone();
        task.env_vars = HashMap::from([("ANTHROPIC_API_KEY".to_string(), self.api_key.clone())]);
        task
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
