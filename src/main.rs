use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};

use meshstat::config::Config;
use meshstat::node::RelayNode;

#[derive(Parser)]
#[command(name = "meshstat")]
#[command(about = "Link telemetry and delivery statistics for mesh relay/gateway nodes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the telemetry node
    Start,
    /// Initialize a new configuration file
    Init,
    /// Show node status and statistics
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .init();

    info!("Starting meshstat v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Start => {
            let config = Config::load(&cli.config).await?;
            let mut node = RelayNode::new(config.clone())?;

            #[cfg(feature = "web")]
            if config.web.enabled {
                let state = meshstat::web::WebState::new(
                    node.composer(),
                    node.stats(),
                    node.restart_handle(),
                );
                let bind = config.web.bind.clone();
                tokio::spawn(async move {
                    if let Err(e) = meshstat::web::serve(&bind, state).await {
                        error!("web server error: {}", e);
                    }
                });
            }

            info!("telemetry node starting...");
            node.run().await?;
        }
        Commands::Init => {
            info!("Initializing new configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Status => {
            let config = Config::load(&cli.config).await?;
            let node = RelayNode::new(config)?;
            node.show_status();
        }
    }

    Ok(())
}
