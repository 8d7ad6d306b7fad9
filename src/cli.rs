//! Command-line interface for the concierge pipeline.
//!
//! The binary wires a full orchestrator from configuration: live gateway or
//! scripted demo backend, seeded front-desk store and knowledge documents,
//! log-bridged trace sink, and in-process metrics. Turn reports print as
//! JSON, one line per turn.

use std::io::{BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use concierge_config::Config;
use concierge_engine::Orchestrator;
use concierge_gateway::{CompletionBackend, Message, ScriptedBackend};
use concierge_tools::{FrontDesk, KnowledgeStore, MemoryKnowledgeStore, ToolRegistry};
use concierge_trace::{LogTraceSink, MetricsRecorder, TraceSink};
use concierge_types::{logging, ConciergeError, ConfigError};

/// concierge - guest-message orchestration pipeline
#[derive(Parser)]
#[command(name = "concierge")]
#[command(about = "Routes guest messages through specialist agents with review gating and traced escalation")]
#[command(long_about = r#"
concierge classifies each guest message, runs the matching specialist agent
through a bounded tool loop, gates the draft through a quality review, and
applies deterministic escalation rules before anything reaches the guest.

EXAMPLES:
  # One-shot turn against the configured gateway
  concierge chat --message "Do you have a deluxe room for March 10-12?"

  # Offline demo with the scripted backend (no API key required)
  concierge chat --demo --message "What time does the spa open?"

  # Interactive loop reading guest messages from stdin
  concierge chat --session front-desk-7

  # Wiring snapshot
  concierge health

CONFIGURATION:
  Settings load from concierge.toml, discovered upward from the working
  directory, with CONCIERGE_* environment variables taking precedence.
  Use --config for an explicit file. The live gateway reads its API key
  from the environment variable named in [gateway] (default OPENAI_API_KEY).

EXIT CODES:
  0  success
  1  unexpected failure
  2  invalid input or configuration
  3  intent classification failed
  4  model gateway failure
  5  turn cancelled
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Process guest messages through the full pipeline
    Chat {
        /// Single message to process; without it, stdin lines are processed
        /// in a loop sharing one session transcript
        #[arg(short, long)]
        message: Option<String>,

        /// Session identifier; turns in one session are serialized and share
        /// conversation context
        #[arg(long, default_value = "local")]
        session: String,

        /// Use the scripted demo backend instead of the configured gateway
        #[arg(long)]
        demo: bool,

        /// Pretty-print the turn report JSON
        #[arg(long)]
        pretty: bool,

        /// Print the aggregated metrics summary after the last turn
        #[arg(long)]
        summary: bool,
    },
    /// Print the orchestrator wiring snapshot as JSON
    Health,
}

/// Parse arguments and run. Errors are printed here; the caller only maps
/// the exit code.
pub fn run() -> Result<(), i32> {
    let cli = Cli::parse();
    if let Err(error) = execute(cli) {
        let code = error
            .downcast_ref::<ConciergeError>()
            .map_or(1, ConciergeError::exit_code);
        eprintln!("error: {error:#}");
        return Err(code);
    }
    Ok(())
}

fn execute(cli: Cli) -> Result<()> {
    // An already-installed subscriber (embedding process, test harness) is
    // not an error worth failing over.
    let _ = logging::init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Chat {
            message,
            session,
            demo,
            pretty,
            summary,
        } => run_chat(&config, message, &session, demo, pretty, summary),
        Command::Health => run_health(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from_path(path).map_err(ConciergeError::from)?,
        None => Config::discover().map_err(ConciergeError::from)?,
    };
    Ok(config)
}

/// Fully wired pipeline plus the handles the CLI keeps for itself.
struct App {
    orchestrator: Orchestrator,
    metrics: Arc<MetricsRecorder>,
    /// Present in demo mode; canned replies are queued here per turn.
    demo: Option<Arc<ScriptedBackend>>,
}

fn build_app(config: &Config, demo: bool) -> Result<App> {
    let knowledge = Arc::new(MemoryKnowledgeStore::seeded());
    let registry = Arc::new(ToolRegistry::builtin(
        Arc::new(FrontDesk::seeded()),
        Arc::clone(&knowledge) as Arc<dyn KnowledgeStore>,
        config.tools.knowledge_top_k,
    ));
    let metrics = Arc::new(MetricsRecorder::new());
    let sink: Arc<dyn TraceSink> = Arc::new(LogTraceSink::new());

    let (backend, scripted): (Arc<dyn CompletionBackend>, Option<Arc<ScriptedBackend>>) = if demo {
        let scripted = Arc::new(ScriptedBackend::new());
        (
            Arc::clone(&scripted) as Arc<dyn CompletionBackend>,
            Some(scripted),
        )
    } else {
        let backend = concierge_gateway::from_settings(&config.gateway).map_err(|source| {
            ConciergeError::Config(ConfigError::Invalid {
                message: source.to_string(),
            })
        })?;
        (Arc::from(backend), None)
    };

    let orchestrator = Orchestrator::new(
        backend,
        registry,
        knowledge as Arc<dyn KnowledgeStore>,
        sink,
        Arc::clone(&metrics),
        config.clone(),
    );
    Ok(App {
        orchestrator,
        metrics,
        demo: scripted,
    })
}

fn run_chat(
    config: &Config,
    message: Option<String>,
    session: &str,
    demo: bool,
    pretty: bool,
    summary: bool,
) -> Result<()> {
    let app = build_app(config, demo)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building the async runtime")?;

    runtime.block_on(async {
        let mut transcript: Vec<Message> = Vec::new();
        match message {
            Some(message) => {
                process_one(&app, session, &message, &mut transcript, pretty).await?;
            }
            None => {
                let stdin = std::io::stdin();
                if stdin.is_terminal() {
                    eprintln!("Reading guest messages from stdin; Ctrl-D ends the session.");
                }
                for line in stdin.lock().lines() {
                    let line = line.context("reading stdin")?;
                    let message = line.trim();
                    if message.is_empty() {
                        continue;
                    }
                    // One bad turn does not end an interactive session.
                    if let Err(error) =
                        process_one(&app, session, message, &mut transcript, pretty).await
                    {
                        eprintln!("turn failed: {error:#}");
                    }
                }
            }
        }
        if summary {
            print_summary(&app.metrics);
        }
        Ok::<(), anyhow::Error>(())
    })
}

async fn process_one(
    app: &App,
    session: &str,
    message: &str,
    transcript: &mut Vec<Message>,
    pretty: bool,
) -> Result<()> {
    if let Some(scripted) = &app.demo {
        queue_demo_turn(scripted, message);
    }
    let report = app.orchestrator.process_turn(session, message, transcript).await?;
    transcript.push(Message::user(message));
    transcript.push(Message::assistant(report.final_response.as_str()));

    let rendered = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("serializing the turn report")?;
    println!("{rendered}");
    Ok(())
}

fn run_health(config: &Config) -> Result<()> {
    // The snapshot never calls the gateway, so the scripted backend keeps
    // this command credential-free.
    let app = build_app(config, true)?;
    let snapshot = app.orchestrator.health();
    let rendered =
        serde_json::to_string_pretty(&snapshot).context("serializing the health snapshot")?;
    println!("{rendered}");
    Ok(())
}

fn print_summary(metrics: &MetricsRecorder) {
    let summary = metrics.summary();
    let rendered = serde_json::json!({
        "turns_total": summary.turns_total,
        "turns_by_intent": summary.turns_by_intent,
        "escalation_rate": summary.escalation_rate,
        "mean_review_score": summary.mean_review_score,
        "p95_latency_ms": summary.p95_latency.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
    });
    println!("{rendered:#}");
}

/// One turn's worth of canned replies: routing, specialist draft, review
/// approval, lifecycle assessment. Keeps the demo fully offline.
fn queue_demo_turn(backend: &ScriptedBackend, message: &str) {
    backend.push_text(
        r#"{"intent": "general", "confidence": 0.9, "reasoning": "Demo turn, scripted routing"}"#,
    );
    backend.push_text(format!(
        "Happy to help with that. I've noted your request (\"{message}\") and \
         the front desk has everything ready; is there anything else I can \
         arrange for you?"
    ));
    backend.push_text(r#"{"approved": true, "score": 8, "issues": []}"#);
    backend.push_text(
        r#"{"query_status": "resolved", "guest_sentiment": "neutral", "follow_up_needed": false}"#,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn chat_parses_one_shot_flags() {
        let cli = Cli::parse_from([
            "concierge", "chat", "--demo", "--message", "Pool hours?", "--session", "s-1",
        ]);
        match cli.command {
            Command::Chat {
                message,
                session,
                demo,
                pretty,
                summary,
            } => {
                assert_eq!(message.as_deref(), Some("Pool hours?"));
                assert_eq!(session, "s-1");
                assert!(demo);
                assert!(!pretty);
                assert!(!summary);
            }
            Command::Health => panic!("expected chat"),
        }
    }

    #[test]
    fn health_subcommand_parses() {
        let cli = Cli::parse_from(["concierge", "health"]);
        assert!(matches!(cli.command, Command::Health));
    }

    #[test]
    fn explicit_config_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("concierge.toml");
        std::fs::write(
            &path,
            "[policy]\nmax_tool_iterations = 3\n\n[tools]\nknowledge_top_k = 5\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.policy.max_tool_iterations, 3);
        assert_eq!(config.tools.knowledge_top_k, 5);
    }

    #[test]
    fn missing_config_path_keeps_the_exit_code_downcastable() {
        let dir = tempfile::tempdir().unwrap();
        let error = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();

        let code = error
            .downcast_ref::<ConciergeError>()
            .map(ConciergeError::exit_code);
        assert_eq!(code, Some(2));
    }

    #[tokio::test]
    async fn demo_app_processes_a_turn_end_to_end() {
        let config = Config::default();
        let app = build_app(&config, true).unwrap();
        let mut transcript = Vec::new();

        process_one(&app, "demo-session", "What time does the spa open?", &mut transcript, false)
            .await
            .unwrap();

        assert_eq!(transcript.len(), 2);
        assert_eq!(app.metrics.summary().turns_total, 1);
    }
}
