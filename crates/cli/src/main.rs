mod config_commands;
mod parse_commands;
mod replay_commands;
mod run_command;

use std::path::{Path, PathBuf};

use {
    clap::{Parser, Subcommand},
    freshet_config::LoadedConfig,
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "freshet",
    version,
    about = "Freshet: record the Wikipedia recent-changes IRC feed"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to use instead of the standard search locations.
    #[arg(long, global = true, env = "FRESHET_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record the feed (default when no subcommand is provided).
    Run(run_command::RunArgs),
    /// Parse edit lines and print each as JSON. Reads stdin when no line is
    /// given.
    Parse { lines: Vec<String> },
    /// Convert a JSON-lines archive into CSV edit rows.
    Replay {
        /// Archive written with `--format jsonl`.
        input: PathBuf,
        /// CSV file to append to. Defaults to stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Start the output with a header row.
        #[arg(long)]
        header: bool,
    },
    /// Inspect the configuration.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Load the `--config` file when given, otherwise search the standard
/// locations.
fn load_config(path: Option<&Path>) -> anyhow::Result<LoadedConfig> {
    match path {
        Some(path) => Ok(LoadedConfig {
            config: freshet_config::load_config(path)?,
            path: Some(path.to_path_buf()),
        }),
        None => Ok(freshet_config::discover_and_load()?),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    debug!(version = env!("CARGO_PKG_VERSION"), "freshet starting");

    match cli.command {
        None => {
            let loaded = load_config(cli.config.as_deref())?;
            run_command::run(loaded, run_command::RunArgs::default()).await
        },
        Some(Commands::Run(args)) => {
            run_command::run(load_config(cli.config.as_deref())?, args).await
        },
        Some(Commands::Parse { lines }) => parse_commands::handle_parse(&lines),
        Some(Commands::Replay {
            input,
            output,
            header,
        }) => replay_commands::handle_replay(&input, output.as_deref(), header),
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, load_config(cli.config.as_deref())?)
        },
    }
}
