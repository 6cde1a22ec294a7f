use std::{
    io::{self, BufRead, Write},
    path::Path,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
};

use {
    freshet_channels::{Error, FeedListener, Result},
    freshet_common::{FeedEvent, MalformedEncoding},
};

use crate::durable::DurableFile;

/// Archives every event, edit or not, as one JSON object per line.
///
/// The archive can be decoded again with [`read_archive`].
pub struct JsonLinesSink<W: Write> {
    writer: Mutex<W>,
    lines: AtomicU64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Mutex::new(inner),
            lines: AtomicU64::new(0),
        }
    }

    pub fn lines_written(&self) -> u64 {
        self.lines.load(Ordering::Relaxed)
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn lock(&self) -> MutexGuard<'_, W> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl JsonLinesSink<DurableFile> {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(DurableFile::create(path)?))
    }
}

impl<W: Write + Send> FeedListener for JsonLinesSink<W> {
    fn on_event(&self, event: &FeedEvent) -> Result<()> {
        let mut line = event.to_text();
        line.push('\n');

        let mut writer = self.lock();
        writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|e| Error::external("append archive line", e))?;
        self.lines.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}

/// One decoded archive line.
#[derive(Debug)]
pub struct ArchivedLine {
    /// 1-based line number in the archive.
    pub line_number: usize,
    pub event: std::result::Result<FeedEvent, MalformedEncoding>,
}

/// Decode a JSON-lines archive. Blank lines are skipped; a malformed line is
/// reported in place and does not stop the iteration.
pub fn read_archive<R: BufRead>(reader: R) -> impl Iterator<Item = io::Result<ArchivedLine>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(index, line)| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(Ok(ArchivedLine {
                line_number: index + 1,
                event: FeedEvent::from_text(&line),
            })),
            Err(e) => Some(Err(e)),
        })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn archives_every_event_and_reads_it_back() {
        let sink = JsonLinesSink::new(Vec::new());
        let events = [
            FeedEvent::new(1, "#en.wikipedia", "rc", "[[P]] [] https://x * u * (+1) s"),
            FeedEvent::new(2, "#en.wikipedia", "rc", "not an edit at all"),
        ];
        for event in &events {
            sink.on_event(event).unwrap();
        }
        assert_eq!(sink.lines_written(), 2);

        let bytes = sink.into_inner();
        let decoded: Vec<FeedEvent> = read_archive(Cursor::new(bytes))
            .map(|line| line.unwrap().event.unwrap())
            .collect();
        assert_eq!(decoded, events);
    }

    #[test]
    fn malformed_and_blank_lines_are_reported_in_place() {
        let archive = concat!(
            r##"{"time":1,"channel":"#a","source":"s","raw":"r"}"##,
            "\n\n",
            r##"{"time":2,"channel":"#a"}"##,
            "\n",
            "garbage\n",
        );
        let lines: Vec<ArchivedLine> = read_archive(Cursor::new(archive))
            .map(|line| line.unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].line_number, 1);
        assert!(lines[0].event.is_ok());
        assert_eq!(lines[1].line_number, 3);
        assert!(matches!(
            lines[1].event,
            Err(MalformedEncoding::MissingKey { key: "source" })
        ));
        assert_eq!(lines[2].line_number, 4);
        assert!(matches!(lines[2].event, Err(MalformedEncoding::Syntax(_))));
    }

    #[test]
    fn file_archive_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.jsonl");
        let sink = JsonLinesSink::create(&path).unwrap();
        sink.on_event(&FeedEvent::new(5, "#c", "n", "hello")).unwrap();

        sink.on_event(&FeedEvent::new(6, "#c", "n", "again")).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(text.ends_with('\n'));
        assert_eq!(
            FeedEvent::from_text(lines[1]).unwrap(),
            FeedEvent::new(6, "#c", "n", "again")
        );
    }
}
