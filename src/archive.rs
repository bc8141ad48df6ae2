// src/archive.rs

use chrono::NaiveDate;
use std::io::{Cursor, Seek, Write};
use thiserror::Error;
use tracing::warn;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Deflate level for the single compression pass. Moderate: the payloads
/// are already-encoded video, so heavier levels buy almost nothing.
const COMPRESSION_LEVEL: i64 = 6;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Finished deliverable: one compressed container plus the name to hand it
/// out under.
#[derive(Debug, Clone)]
pub struct BuiltArchive {
    pub payload: Vec<u8>,
    pub suggested_filename: String,
}

/// Accumulates successful transfer payloads and compresses them into a
/// single ZIP once all batches have been processed.
///
/// Duplicate filenames are last-write-wins: catalog ids are unique but
/// filenames derived from device metadata are not validated, so collisions
/// are possible. Each one is logged and counted so callers can warn.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    entries: Vec<(String, Vec<u8>)>,
    collisions: usize,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a payload under `filename`, replacing any earlier entry with
    /// the same name.
    pub fn insert(&mut self, filename: String, payload: Vec<u8>) {
        if let Some(slot) = self.entries.iter_mut().find(|(name, _)| *name == filename) {
            warn!(%filename, "duplicate archive member, keeping the newer payload");
            self.collisions += 1;
            slot.1 = payload;
        } else {
            self.entries.push((filename, payload));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of duplicate-filename insertions observed so far.
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    /// Member filenames in insertion order.
    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Runs the compression pass over every accumulated entry.
    ///
    /// `on_progress` is invoked with a 0..=100 percentage after each member
    /// is written, so the caller can render archiving separately from
    /// transferring.
    pub fn build<F>(self, user: &str, date: NaiveDate, on_progress: F) -> Result<BuiltArchive, ArchiveError>
    where
        F: FnMut(u8),
    {
        let suggested = suggested_filename(user, date);
        let cursor = self.build_into(Cursor::new(Vec::new()), on_progress)?;
        Ok(BuiltArchive {
            payload: cursor.into_inner(),
            suggested_filename: suggested,
        })
    }

    /// Compression pass over an arbitrary sink. Any write failure aborts
    /// the pass and surfaces as an [`ArchiveError`]; the sink is consumed
    /// either way.
    pub fn build_into<W, F>(self, sink: W, mut on_progress: F) -> Result<W, ArchiveError>
    where
        W: Write + Seek,
        F: FnMut(u8),
    {
        let total = self.entries.len();
        let mut writer = ZipWriter::new(sink);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(COMPRESSION_LEVEL));

        for (written, (filename, payload)) in self.entries.into_iter().enumerate() {
            writer.start_file(filename, options)?;
            writer.write_all(&payload)?;
            on_progress((((written + 1) * 100) / total.max(1)) as u8);
        }
        let sink = writer.finish()?;
        on_progress(100);
        Ok(sink)
    }
}

/// Delivery name pattern: `videos-<DDMMYYYY>-<user>.zip`.
pub fn suggested_filename(user: &str, date: NaiveDate) -> String {
    format!("videos-{}-{}.zip", date.format("%d%m%Y"), user)
}
