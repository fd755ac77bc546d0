//! redeemd - one-time code issuance and redemption service.

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use redeem_config_and_utils::{init_logging, Config, Paths};
use redemption_engine::CodeKind;

/// redeemd command-line interface.
#[derive(Parser)]
#[command(name = "redeemd")]
#[command(about = "Issues and redeems one-time beta and verification codes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for runtime files (database, logs, config). Defaults to ~/.redeem
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve,
    /// Issue a code for an identity and attempt private delivery
    Issue {
        #[arg(long)]
        identity: String,
        #[arg(long, value_enum)]
        kind: KindArg,
    },
    /// Print the stored record for a code
    Inspect {
        #[arg(long)]
        code: String,
        #[arg(long, value_enum)]
        kind: KindArg,
    },
    /// Show issued and used counts per kind
    Stats,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Beta,
    Verify,
}

impl From<KindArg> for CodeKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Beta => CodeKind::Beta,
            KindArg::Verify => CodeKind::Verify,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;
    let level = cli.log_level.unwrap_or_else(|| config.log_level.clone());

    match cli.command {
        Some(Commands::Serve) | None => {
            paths.ensure_dirs()?;
            init_logging(&level, Some(&paths.log_file()));
            app::run_server(config, paths).await?;
        }
        Some(Commands::Issue { identity, kind }) => {
            init_logging(&level, None);
            app::issue_once(&config, &paths, &identity, kind.into()).await?;
        }
        Some(Commands::Inspect { code, kind }) => {
            init_logging(&level, None);
            app::inspect(&config, &paths, &code, kind.into()).await?;
        }
        Some(Commands::Stats) => {
            init_logging(&level, None);
            app::stats(&config, &paths).await?;
        }
    }

    Ok(())
}
