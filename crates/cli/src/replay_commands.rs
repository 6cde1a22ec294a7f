use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::Path,
};

use {
    anyhow::{Context, Result},
    freshet_channels::FeedListener,
    freshet_sinks::{CsvSink, read_archive},
    tracing::{info, warn},
};

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ReplayStats {
    pub events: u64,
    pub malformed: u64,
    pub rows: u64,
}

/// Feed every decodable archive line through `sink`. Malformed lines are
/// logged and counted.
pub(crate) fn replay<R: BufRead, W: Write + Send>(
    reader: R,
    sink: &CsvSink<W>,
) -> Result<ReplayStats> {
    let mut stats = ReplayStats::default();
    for line in read_archive(reader) {
        let line = line?;
        match line.event {
            Ok(event) => {
                stats.events += 1;
                sink.on_event(&event)?;
            },
            Err(e) => {
                stats.malformed += 1;
                warn!(line = line.line_number, error = %e, "skipping malformed archive line");
            },
        }
    }
    stats.rows = sink.rows_written();
    Ok(stats)
}

pub fn handle_replay(input: &Path, output: Option<&Path>, header: bool) -> Result<()> {
    let file =
        File::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    let reader = BufReader::new(file);

    let stats = match output {
        Some(path) => {
            let sink = CsvSink::create(path, header)
                .with_context(|| format!("failed to create {}", path.display()))?;
            replay(reader, &sink)?
        },
        None => {
            let sink = if header {
                CsvSink::with_header(io::stdout())?
            } else {
                CsvSink::new(io::stdout())
            };
            replay(reader, &sink)?
        },
    };

    info!(
        events = stats.events,
        rows = stats.rows,
        malformed = stats.malformed,
        "replay finished"
    );
    Ok(())
}
