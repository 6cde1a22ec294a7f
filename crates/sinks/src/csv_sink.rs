use std::{
    io::{self, Write},
    path::Path,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
};

use {
    csv::{Writer, WriterBuilder},
    freshet_channels::{Error, FeedListener, Result},
    freshet_common::FeedEvent,
    freshet_edits::EditRecord,
    tracing::trace,
};

use crate::durable::DurableFile;

/// Column names, in row order.
pub const CSV_COLUMNS: [&str; 15] = [
    "channel",
    "source",
    "time",
    "title",
    "user",
    "diffBytes",
    "diffUrl",
    "summary",
    "isMinor",
    "isTalk",
    "isBotEdit",
    "isNew",
    "isUnpatrolled",
    "isSpecial",
    "unparsedFlags",
];

/// Build the CSV row for one parsed edit. Booleans render as `true`/`false`.
pub fn edit_row(event: &FeedEvent, edit: &EditRecord) -> [String; 15] {
    let [minor, talk, bot, new, unpatrolled, special] =
        edit.flags().to_array().map(|flag| flag.to_string());
    [
        event.channel().to_owned(),
        event.source().to_owned(),
        event.time().to_string(),
        edit.title().to_owned(),
        edit.user().to_owned(),
        edit.diff_bytes().to_string(),
        edit.diff_url().to_owned(),
        edit.summary().to_owned(),
        minor,
        talk,
        bot,
        new,
        unpatrolled,
        special,
        edit.unparsed_flags().to_owned(),
    ]
}

/// Writes one comma-delimited row per edit event, in arrival order.
///
/// Events whose text is not an edit line are skipped. Every row is flushed
/// before [`FeedListener::on_event`] returns.
pub struct CsvSink<W: Write> {
    writer: Mutex<Writer<W>>,
    rows: AtomicU64,
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Mutex::new(WriterBuilder::new().has_headers(false).from_writer(inner)),
            rows: AtomicU64::new(0),
        }
    }

    /// Like [`CsvSink::new`], but starts the output with a header row.
    pub fn with_header(inner: W) -> io::Result<Self> {
        let sink = Self::new(inner);
        {
            let mut writer = sink.lock();
            writer.write_record(CSV_COLUMNS)?;
            writer.flush()?;
        }
        Ok(sink)
    }

    /// Number of edit rows written so far.
    pub fn rows_written(&self) -> u64 {
        self.rows.load(Ordering::Relaxed)
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> io::Result<W> {
        self.writer
            .into_inner()
            .unwrap_or_else(|e| e.into_inner())
            .into_inner()
            .map_err(|e| e.into_error())
    }

    fn lock(&self) -> MutexGuard<'_, Writer<W>> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CsvSink<DurableFile> {
    /// Create (or append to) the CSV file at `path`. The header row is only
    /// written when the file is empty.
    pub fn create(path: impl AsRef<Path>, header: bool) -> io::Result<Self> {
        let file = DurableFile::create(path)?;
        if header && file.is_empty()? {
            Self::with_header(file)
        } else {
            Ok(Self::new(file))
        }
    }
}

impl<W: Write + Send> FeedListener for CsvSink<W> {
    fn on_event(&self, event: &FeedEvent) -> Result<()> {
        let edit = match freshet_edits::parse(event.raw_text()) {
            Ok(edit) => edit,
            Err(reason) => {
                trace!(channel = event.channel(), %reason, "skipping non-edit line");
                return Ok(());
            },
        };

        let row = edit_row(event, &edit);
        let mut writer = self.lock();
        writer
            .write_record(&row)
            .map_err(|e| Error::external("write csv row", e))?;
        writer
            .flush()
            .map_err(|e| Error::external("flush csv row", e))?;
        self.rows.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &str {
        "csv"
    }
}
