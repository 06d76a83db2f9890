//! Text-mode driver: reads turns from stdin, drives the graph engine, prints
//! streamed tokens, and resolves safety approvals against stdin responses.

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use clap::Parser;
use jarvis_core::checkpoint::{Checkpoint, Checkpointer, SqliteCheckpointer};
use jarvis_core::config::CoreConfig;
use jarvis_core::events::{AppEvent, TokioBroadcastBus};
use jarvis_core::graph::{GraphEngine, TurnHandle, TurnOutcome};
use jarvis_core::llm::LLMFactory;
use jarvis_core::safety::{ApprovalPrompt, SafetyInterceptor};
use jarvis_core::tools::{ToolRegistry, register_builtin_tools};
use jarvis_core::{AgentState, InteractionMode, Role};

const DEFAULT_THREAD_ID: &str = "jarvis-main-thread";

#[derive(Parser, Debug)]
#[command(name = "jarvis", about = "Text-mode driver for the Jarvis agent orchestrator")]
struct Cli {
    /// Conversation thread to resume or start.
    #[arg(long, default_value = DEFAULT_THREAD_ID)]
    thread_id: String,

    /// Disable the interrupt-before-tools safety gate entirely.
    #[arg(long)]
    no_safety: bool,

    /// Starting LLM role for a brand-new thread (ignored if the thread
    /// already has a checkpoint).
    #[arg(long)]
    role: Option<String>,

    /// `tracing-subscriber` env-filter default directive, overridden by
    /// `RUST_LOG` when set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

struct StdinPrompt;

#[async_trait::async_trait]
impl ApprovalPrompt for StdinPrompt {
    async fn ask(&self, description: &str) -> String {
        println!("\n[approval needed] {description}");
        print!("approve? (y/n): ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        if io::stdin().read_line(&mut line).is_err() {
            return String::new();
        }
        line
    }
}

fn init_logging(default_directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn drive_turn(engine: &Arc<GraphEngine>, thread_id: &str, safety: &SafetyInterceptor, mut handle: TurnHandle) -> TurnOutcome {
    loop {
        let mut tokens = handle.stream();
        let printer = tokio::spawn(async move {
            while let Ok(event) = tokens.recv().await {
                if let AppEvent::TokenDelta { delta, .. } = event {
                    print!("{delta}");
                    let _ = io::stdout().flush();
                }
            }
        });

        let outcome = handle.wait().await;
        printer.abort();

        match outcome {
            TurnOutcome::Suspended(pending) => {
                handle = safety.resolve(engine, thread_id, pending, &StdinPrompt).await;
            }
            other => return other,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = Arc::new(CoreConfig::from_env());
    let http_client = reqwest::Client::new();

    let checkpointer: Arc<dyn Checkpointer> = match SqliteCheckpointer::open(&config.checkpoint_path) {
        Ok(cp) => Arc::new(cp),
        Err(err) => {
            eprintln!("failed to open checkpoint database at {}: {err}", config.checkpoint_path.display());
            std::process::exit(1);
        }
    };

    if let Some(role_str) = &cli.role {
        if checkpointer.get_latest(&cli.thread_id).await.ok().flatten().is_none() {
            match role_str.parse::<Role>() {
                Ok(role) => {
                    let mut state = AgentState::new(InteractionMode::Text);
                    state.current_role = role;
                    let fresh = Checkpoint { state, next: vec![], version: 1 };
                    if let Err(err) = checkpointer.put(&cli.thread_id, fresh).await {
                        eprintln!("failed to seed starting role: {err}");
                    }
                }
                Err(err) => eprintln!("ignoring unknown --role '{role_str}': {err}"),
            }
        }
    }

    let mut tool_registry = ToolRegistry::new();
    register_builtin_tools(&mut tool_registry, config.workspace_root.clone(), http_client.clone());
    let tool_registry = Arc::new(tool_registry);

    let llm_factory = Arc::new(LLMFactory::new((*config).clone(), http_client));
    let event_bus = Arc::new(TokioBroadcastBus::new());

    let engine = GraphEngine::new(checkpointer, Arc::clone(&tool_registry), llm_factory, event_bus.clone(), Arc::clone(&config), !cli.no_safety);
    let safety = SafetyInterceptor::new(tool_registry, event_bus, !cli.no_safety);

    let is_tty = io::stdin().is_terminal();
    if is_tty {
        println!("Jarvis. Thread: {}. Type 'exit' to quit.", cli.thread_id);
    }

    loop {
        if is_tty {
            print!("> ");
            let _ = io::stdout().flush();
        }

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                eprintln!("stdin read error: {err}");
                break;
            }
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }

        let handle = engine.start_turn(&cli.thread_id, input, InteractionMode::Text);
        match drive_turn(&engine, &cli.thread_id, &safety, handle).await {
            TurnOutcome::Finished(text) => println!("\n{text}"),
            TurnOutcome::Suspended(_) => unreachable!("drive_turn only returns once resolved"),
            TurnOutcome::Failed(err) => eprintln!("\nturn failed: {err}"),
        }
    }
}
