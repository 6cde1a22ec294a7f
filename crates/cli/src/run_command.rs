use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    anyhow::{Context, Result, bail},
    chrono::{DateTime, Local},
    clap::Args,
    freshet_channels::{ListenerHandle, SubscriptionRegistry},
    freshet_config::{
        FreshetConfig, LoadedConfig, OutputConfig, OutputFormat, Severity, has_errors, validate,
    },
    freshet_irc::IrcClient,
    freshet_sinks::{CsvSink, JsonLinesSink},
    tracing::{error, info, warn},
};

/// Overrides for the configured values.
#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Stop after this many seconds instead of waiting for Ctrl-C.
    #[arg(long)]
    pub duration: Option<u64>,

    /// Channel to follow. Repeat for several; replaces the configured list.
    #[arg(long = "channel", short = 'c')]
    pub channels: Vec<String>,

    /// Directory to create the output file in.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Output format: csv or jsonl.
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Nickname to register with.
    #[arg(long)]
    pub nick: Option<String>,

    /// Start CSV output with a header row.
    #[arg(long)]
    pub csv_header: bool,
}

impl RunArgs {
    fn apply(self, config: &mut FreshetConfig) {
        if let Some(secs) = self.duration {
            config.run.duration_secs = Some(secs);
        }
        if !self.channels.is_empty() {
            config.feed.channels = self.channels;
        }
        if let Some(dir) = self.output_dir {
            config.output.dir = dir;
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if self.nick.is_some() {
            config.irc.nick = self.nick;
        }
        if self.csv_header {
            config.output.csv_header = true;
        }
    }
}

/// `<dir>/<prefix>-<yyyy-MM-ddTHH:mm:ss.S>.<ext>`, where `S` is the
/// millisecond count without padding.
pub(crate) fn output_path(output: &OutputConfig, now: DateTime<Local>) -> PathBuf {
    let stamp = format!(
        "{}.{}",
        now.format("%Y-%m-%dT%H:%M:%S"),
        now.timestamp_subsec_millis()
    );
    output.dir.join(format!(
        "{}-{stamp}.{}",
        output.prefix,
        output.format.extension()
    ))
}

fn open_sink(output: &OutputConfig, path: &Path) -> Result<ListenerHandle> {
    let sink: ListenerHandle = match output.format {
        OutputFormat::Csv => Arc::new(
            CsvSink::create(path, output.csv_header)
                .with_context(|| format!("failed to create {}", path.display()))?,
        ),
        OutputFormat::Jsonl => Arc::new(
            JsonLinesSink::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        ),
    };
    Ok(sink)
}

/// Subscribe `sink` to every channel. A channel listed more than once is
/// joined once.
fn subscribe_all(
    registry: &SubscriptionRegistry,
    channels: &[String],
    sink: &ListenerHandle,
) -> Result<()> {
    for channel in channels {
        match registry.listen(channel, Arc::clone(sink)) {
            Ok(()) => {},
            Err(freshet_channels::Error::AlreadySubscribed { .. }) => {
                warn!(channel = %channel, "channel listed more than once, subscribing once");
            },
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

pub async fn run(loaded: LoadedConfig, args: RunArgs) -> Result<()> {
    let mut config = loaded.config;
    args.apply(&mut config);

    if let Some(path) = &loaded.path {
        info!(path = %path.display(), "using config file");
    }
    let diagnostics = validate(&config);
    for d in &diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
        }
    }
    if has_errors(&diagnostics) {
        bail!("configuration has errors, refusing to start");
    }

    std::fs::create_dir_all(&config.output.dir)
        .with_context(|| format!("failed to create {}", config.output.dir.display()))?;
    let path = output_path(&config.output, Local::now());
    let sink = open_sink(&config.output, &path)?;
    info!(path = %path.display(), format = %config.output.format, "writing feed output");

    let client = IrcClient::new(&config.irc);
    let registry = Arc::new(SubscriptionRegistry::new(Arc::new(client.commands())));
    subscribe_all(&registry, &config.feed.channels, &sink)?;

    let connection = client.connect(Arc::clone(&registry)).await?;
    info!(
        nick = connection.nick(),
        channels = ?registry.channels(),
        "recording feed"
    );

    let deadline = async {
        match config.run.duration() {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupted, shutting down"),
        () = deadline => info!("run duration elapsed, shutting down"),
        () = connection.closed() => warn!("connection closed by the server"),
    }

    for channel in registry.channels() {
        if let Err(e) = registry.unlisten(&channel, &sink) {
            warn!(channel = %channel, error = %e, "failed to unsubscribe");
        }
    }
    registry.close();
    if let Err(e) = connection.stop().await {
        warn!(error = %e, "connection did not shut down cleanly");
    }

    info!(path = %path.display(), "feed output closed");
    Ok(())
}
