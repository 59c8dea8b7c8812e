//! convergectl binary — converge this host to its declared state, or seal
//! secrets into the encrypted bag store.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use converge::{Outcome, Platform, RunReport};
use convergectl::{converge_host, RunnerConfig};
use databag::{load_key, DataBagStore};

#[derive(Parser, Debug)]
#[command(name = "convergectl", version, about = "Converge a single host to its declared state")]
struct Cli {
    /// Config file (default: ./convergectl.toml when present)
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the webserver recipe against this host
    Run {
        /// Override platform detection (linux-family, windows-family, other)
        #[arg(long)]
        platform: Option<Platform>,

        /// Stop at the first failed resource
        #[arg(long)]
        fail_fast: bool,
    },
    /// Encrypt a JSON field mapping into a bag item
    Seal {
        bag: String,
        item: String,
        /// JSON file with a flat string-to-string mapping
        input: PathBuf,

        /// Key file override
        #[arg(long)]
        key: Option<PathBuf>,
    },
}

fn print_report(report: &RunReport) {
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!("  Converge run on {} — {} resource(s)", report.platform, report.results.len());
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for result in &report.results {
        let status = match &result.outcome {
            Outcome::Applied => "applied",
            Outcome::SkippedGuardSatisfied => "up-to-date",
            Outcome::SkippedPlatformMismatch => "skipped",
            Outcome::Failed { .. } => "FAILED",
        };
        eprintln!(
            "  {:<10} [{}] {} ({}ms)",
            status, result.kind, result.name, result.duration_ms
        );
        if let Outcome::Failed { error } = &result.outcome {
            eprintln!("             {}", error);
        }
    }
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

fn main() {
    // Default to info level if RUST_LOG not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let config = match RunnerConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(1);
        }
    };

    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");

    match cli.command {
        Command::Run { platform, fail_fast } => {
            let platform = platform.unwrap_or_else(Platform::detect);
            let mut config = config;
            if fail_fast {
                config.run.fail_fast = true;
            }

            eprintln!("╔════════════════════════════════════════════════════════════════╗");
            eprintln!("║  convergectl run                                               ║");
            eprintln!("╚════════════════════════════════════════════════════════════════╝");
            eprintln!("  Platform:  {}", platform);
            eprintln!("  Key file:  {}", config.key_path(platform).display());
            eprintln!("  Bag store: {}", config.bag_dir(platform).display());

            info!("Starting converge run on {}", platform);

            let result = rt.block_on(converge_host(&config, platform));
            match result {
                Ok(report) => {
                    print_report(&report);
                    if report.succeeded() {
                        info!("Host converged");
                    } else {
                        // Partial success is still a failed run for the
                        // caller; the report shows what was achieved.
                        tracing::error!(
                            "Run finished with {} failed resource(s)",
                            report.failures().len()
                        );
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    tracing::error!("Run aborted: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Command::Seal { bag, item, input, key } => {
            let platform = Platform::detect();
            let key_path = key.unwrap_or_else(|| config.key_path(platform));

            let result = (|| -> anyhow::Result<()> {
                let key = load_key(&key_path)?;
                let content = std::fs::read_to_string(&input)?;
                let fields: BTreeMap<String, String> = serde_json::from_str(&content)?;
                let store = DataBagStore::open(config.bag_dir(platform));
                store.encrypt(&key, &bag, &item, &fields)?;
                eprintln!("Sealed {}/{} ({} fields)", bag, item, fields.len());
                Ok(())
            })();

            if let Err(e) = result {
                tracing::error!("Seal failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}
