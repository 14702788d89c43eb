use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use quaver_config::Config;
use quaver_discord::DiscordBot;
use quaver_resolver::{SpotifyCatalog, YtDlpSearch};

#[derive(Parser)]
#[command(name = "quaver")]
#[command(about = "Quaver — Discord music bot")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and serve commands
    Run {
        /// Override the command prefix character
        #[arg(short, long)]
        prefix: Option<char>,
    },
    /// Check the environment: credentials and external tools
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { prefix } => {
            let config = Config {
                command_prefix: prefix.unwrap_or(config.command_prefix),
                ..config
            };
            config.validate()?;
            info!(prefix = %config.command_prefix, "starting Quaver");
            DiscordBot::new(config).start().await?;
        }
        Commands::Check => {
            run_check(config).await;
        }
    }

    Ok(())
}

/// Report on everything the bot needs at runtime. Informational only;
/// always exits zero so it can run in half-configured environments.
async fn run_check(config: Config) {
    match config.discord_token() {
        Ok(_) => println!("discord token: set"),
        Err(_) => println!("discord token: MISSING (set QUAVER_DISCORD_TOKEN)"),
    }

    let search = YtDlpSearch::new(config.ytdlp_bin.clone(), config.cookie_file.clone(), 1);
    match search.version().await {
        Ok(version) => println!("{}: {version}", config.ytdlp_bin),
        Err(e) => println!("{}: NOT USABLE ({e})", config.ytdlp_bin),
    }

    match (&config.spotify_client_id, &config.spotify_client_secret) {
        (Some(id), Some(secret)) => {
            let catalog = SpotifyCatalog::new(id.clone(), secret.clone());
            match catalog.authenticate().await {
                Ok(()) => println!("catalog credentials: valid"),
                Err(e) => println!("catalog credentials: REJECTED ({e})"),
            }
        }
        _ => println!("catalog credentials: not configured (catalog links disabled)"),
    }

    match &config.cookie_file {
        Some(path) if std::path::Path::new(path).exists() => {
            println!("cookie file: {path}")
        }
        Some(path) => println!("cookie file: {path} (NOT FOUND)"),
        None => println!("cookie file: not configured"),
    }
}
