use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use scribe_common::telemetry::{self, TelemetryConfig};
use scribe_common::{EditorConfig, FileStore};

mod replay;

use replay::{Replay, Script};

#[derive(Parser)]
#[command(version, about = "Scribe - collaborative plain-text editing engine", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to an editor config file (.json or .toml)
    #[arg(long, global = true, env = "SCRIBE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scripted editing session and print the final state as JSON
    Replay {
        /// Path to the script file
        script: PathBuf,

        /// Print engine counters in Prometheus text format after the report
        #[cfg(feature = "telemetry")]
        #[arg(long)]
        metrics: bool,
    },
    /// Write the effective configuration to a file
    Config {
        /// Destination (.json or .toml)
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).await?;
    telemetry::init(TelemetryConfig::from_env("scribe").with_filter(config.log_level.clone()));

    match cli.command {
        Commands::Replay {
            script,
            #[cfg(feature = "telemetry")]
            metrics,
        } => {
            let raw = std::fs::read_to_string(&script).into_diagnostic()?;
            let script: Script = serde_json::from_str(&raw).into_diagnostic()?;
            tracing::info!(steps = script.steps.len(), "replaying script");

            let report = Replay::new(&config, &script)?.run(&script.steps);
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);

            #[cfg(feature = "telemetry")]
            if metrics {
                println!("{}", telemetry::render());
            }
        }
        Commands::Config { output } => {
            config.save(&FileStore::new(&output)).await?;
            println!("Wrote config to {}", output.display());
        }
    }

    Ok(())
}

async fn load_config(path: Option<&std::path::Path>) -> Result<EditorConfig> {
    let config = match path {
        Some(path) => EditorConfig::load(&FileStore::new(path)).await?,
        None => EditorConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
