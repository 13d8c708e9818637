mod config_commands;
mod pipeline;
mod poll_commands;
mod run;
mod sink;

use std::path::PathBuf;

use {
    anyhow::bail,
    clap::{Parser, Subcommand},
    pixlive_config::{PixliveConfig, Severity, apply_env_overrides, discover_and_load, has_errors},
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "pixlive", about = "Pixlive: gallery and channel reposting pipeline", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (overrides discovery in ./ and ~/.config/pixlive/).
    #[arg(long, global = true, env = "PIXLIVE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pollers, the channel listener and the router (default).
    Run,
    /// Validate the configuration and report errors/warnings.
    CheckConfig {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Fetch one gallery page and print the items newer than the stored
    /// watermark, without persisting anything.
    PollOnce { username: String },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<(PixliveConfig, Option<PathBuf>)> {
    let (mut config, path) = discover_and_load(cli.config.as_deref())?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok((config, path))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "pixlive starting");

    let (config, path) = load_config(&cli)?;

    match cli.command {
        None | Some(Commands::Run) => {
            if let Some(ref path) = path {
                info!(path = %path.display(), "config loaded");
            }
            let diagnostics = pixlive_config::validate(&config);
            for d in &diagnostics {
                match d.severity {
                    Severity::Error => error!(path = %d.path, "{}", d.message),
                    Severity::Warning => warn!(path = %d.path, "{}", d.message),
                    Severity::Info => info!(path = %d.path, "{}", d.message),
                }
            }
            if has_errors(&diagnostics) {
                bail!("invalid configuration, see `pixlive check-config`");
            }
            run::run(config).await
        },
        Some(Commands::CheckConfig { verbose }) => {
            config_commands::check(&config, path.as_deref(), verbose)
        },
        Some(Commands::PollOnce { username }) => poll_commands::poll_once(&config, &username).await,
    }
}
