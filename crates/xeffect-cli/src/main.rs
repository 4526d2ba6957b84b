use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use xeffect_core::Config;

mod commands;

#[derive(Parser)]
#[command(name = "xeffect-cli", version, about = "XEffect goal streak CLI")]
struct Cli {
    /// Log level (overrides log.level; RUST_LOG overrides both)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Goal management and completion tracking
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print the service version
    Version,
}

fn init_logging(level: Option<&str>) {
    // Reading the config here must not create it: `version` leaves no files.
    let (configured, config_error) = match level {
        Some(level) => (level.to_string(), None),
        None => match Config::peek() {
            Ok(cfg) => (cfg.unwrap_or_default().log.level, None),
            Err(e) => (Config::default().log.level, Some(e)),
        },
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&configured))
        .unwrap_or_else(|_| EnvFilter::new(Config::default().log.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Some(e) = config_error {
        tracing::warn!("ignoring config for log level: {e}");
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let result = match cli.command {
        Commands::Goal { action } => commands::goal::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Version => commands::version::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
