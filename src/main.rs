use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cwtail")]
#[command(about = "Tail CloudWatch Logs streams with resumable cursors", long_about = None)]
struct Cli {
    #[arg(long, global = true, env = cwtail::config::CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Tail every configured stream until interrupted
    Run,
    /// List the streams each source resolves to
    Discover {
        /// Also read the stored cursor for every stream
        #[arg(long)]
        cursors: bool,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate the config document
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cwtail=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run) | None => {
            // Default behavior is to run
            cwtail::cli::run::run(cli.config).await?;
        }
        Some(Commands::Discover { cursors }) => {
            cwtail::cli::discover::discover(cli.config, cursors).await?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Check => {
                cwtail::cli::config::check(cli.config)?;
            }
        },
    }

    Ok(())
}
