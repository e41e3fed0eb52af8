mod ask_cmd;
mod config;
#[cfg(test)]
mod test_util;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tokio_util::sync::CancellationToken;

use ask_cmd::AskOutcome;
use config::NavigatorConfig;

const USAGE: &str = "Usage: repo-navigator \"Your question about this repo\"";

#[derive(Parser)]
#[command(
    name = "repo-navigator",
    about = "Ask an LLM agent questions about the repository in the current directory",
    version
)]
struct Cli {
    /// Model to use (overrides ANTHROPIC_MODEL env var)
    #[arg(long)]
    model: Option<String>,

    /// Agent runtime binary (overrides NAVIGATOR_AGENT_BINARY env var)
    #[arg(long)]
    agent_binary: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Your question about this repo
    question: Vec<String>,
}

/// Join the positional words into a single question; `None` when blank.
fn question_from_words(words: &[String]) -> Option<String> {
    let question = words.join(" ").trim().to_string();
    (!question.is_empty()).then_some(question)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(question) = question_from_words(&cli.question) else {
        eprintln!("{USAGE}");
        std::process::exit(1);
    };

    let config = match NavigatorConfig::resolve(cli.model.as_deref(), cli.agent_binary.as_deref())
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    };

    // First Ctrl+C stops the answer, second force-exits.
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    let got_first_signal = Arc::new(AtomicBool::new(false));

    tokio::spawn(async move {
        loop {
            tokio::signal::ctrl_c().await.ok();
            if got_first_signal.swap(true, Ordering::SeqCst) {
                eprintln!("\nForce exit.");
                std::process::exit(130);
            }
            cancel_clone.cancel();
        }
    });

    match ask_cmd::run_ask(&question, &config, cancel).await {
        Ok(AskOutcome::Completed) => Ok(()),
        Ok(AskOutcome::Interrupted) => {
            eprintln!("\nInterrupted.");
            std::process::exit(130);
        }
        Err(e) => {
            eprintln!("Fatal error while streaming task events: {e:#}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn question_joins_words_with_spaces() {
        assert_eq!(
            question_from_words(&words(&["where", "is", "main?"])).as_deref(),
            Some("where is main?")
        );
    }

    #[test]
    fn question_is_trimmed() {
        assert_eq!(
            question_from_words(&words(&["  how does", "it build?  "])).as_deref(),
            Some("how does it build?")
        );
    }

    #[test]
    fn blank_question_is_none() {
        assert_eq!(question_from_words(&[]), None);
        assert_eq!(question_from_words(&words(&["", "   "])), None);
    }

    #[test]
    fn cli_parses_flags_and_question() {
        let cli = Cli::parse_from([
            "repo-navigator",
            "--model",
            "claude-opus",
            "-v",
            "what",
            "is",
            "this?",
        ]);
        assert_eq!(cli.model.as_deref(), Some("claude-opus"));
        assert!(cli.verbose);
        assert!(cli.agent_binary.is_none());
        assert_eq!(cli.question, words(&["what", "is", "this?"]));
    }
}
