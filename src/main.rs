use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use skein_core::config::AppConfig;
use skein_core::types::Payload;
use skein_engine::WorkflowDefinition;

#[derive(Parser)]
#[command(name = "skein", version, about = "Graph workflow runner with fan-out and fan-in")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "skein.toml", env = "SKEIN_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow definition and print its results as JSON
    Run {
        /// Workflow definition (TOML)
        definition: PathBuf,
        /// Node to start from (defaults to the first node in the file)
        #[arg(short, long)]
        start: Option<String>,
        /// Initial payload as JSON (read from stdin when omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Execute on the worker pool instead of one unit at a time
        #[arg(long)]
        parallel: bool,
        /// Worker pool size (overrides engine.max_workers)
        #[arg(long, requires = "parallel")]
        max_workers: Option<usize>,
    },
    /// Check that a workflow definition builds
    Validate {
        /// Workflow definition (TOML)
        definition: PathBuf,
    },
    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    // Initialize tracing
    let default_filter = config.log.filter.as_deref().unwrap_or("skein=info,warn");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    if !cli.config.exists() {
        warn!(path = %cli.config.display(), "No config file found, using defaults");
    }

    match cli.command {
        Commands::Run {
            definition,
            start,
            input,
            parallel,
            max_workers,
        } => {
            let def = load_definition(&definition)?;
            let workflow = def.build(config.engine.clone())?;

            let start = match start.or_else(|| def.nodes.first().map(|n| n.name.clone())) {
                Some(start) => start,
                None => anyhow::bail!("{} defines no nodes", definition.display()),
            };
            let payload = read_payload(input)?;

            let results = if parallel {
                workflow.run_parallel(&start, payload, max_workers).await?
            } else {
                workflow.run(&start, payload).await?
            };
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Validate { definition } => {
            let def = load_definition(&definition)?;
            let workflow = def.build(config.engine.clone())?;
            info!(
                nodes = workflow.node_names().len(),
                transitions = workflow.transitions().len(),
                "Workflow definition is valid"
            );
            println!(
                "{}: {} nodes, {} transitions",
                def.name.as_deref().unwrap_or("workflow"),
                workflow.node_names().len(),
                workflow.transitions().len()
            );
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    if path.exists() {
        Ok(AppConfig::load(path)?)
    } else {
        Ok(AppConfig::default())
    }
}

fn load_definition(path: &Path) -> anyhow::Result<WorkflowDefinition> {
    WorkflowDefinition::load(path)
        .with_context(|| format!("failed to load workflow definition {}", path.display()))
}

/// `--input` wins; otherwise stdin, where empty input means `null`.
fn read_payload(input: Option<String>) -> anyhow::Result<Payload> {
    let text = match input {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    if text.trim().is_empty() {
        return Ok(Payload::Null);
    }
    serde_json::from_str(&text).context("input is not valid JSON")
}
