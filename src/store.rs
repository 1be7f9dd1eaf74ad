//! Event-file store: open, lazily iterate filtered events, release on drop.

use crate::codec::{self, StoreError, MAGIC, MAX_RECORD_LEN};
use crate::types::Event;
use bytes::BufMut;
use log::debug;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// An open event file.
///
/// The stream is forward-only and consumed exactly once: [`EventFile::events`]
/// picks up wherever the previous iteration stopped, and dropping the handle
/// closes the file on every exit path, error paths included.
pub struct EventFile {
    path: PathBuf,
    reader: BufReader<File>,
}

impl EventFile {
    /// Open an event file, verifying its magic.
    ///
    /// A missing or unreadable path surfaces as [`StoreError::Io`]; a file
    /// that is too short or starts with the wrong bytes is
    /// [`StoreError::BadMagic`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; MAGIC.len()];
        reader.read_exact(&mut magic).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => StoreError::BadMagic,
            _ => StoreError::Io(e),
        })?;
        if magic != MAGIC {
            return Err(StoreError::BadMagic);
        }

        debug!("Opened event file {}", path.display());
        Ok(Self { path, reader })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lazily iterate events whose code is in `codes`.
    ///
    /// An empty `codes` slice matches every event. Records with other codes
    /// are decoded and discarded without being yielded. The first decode
    /// error ends the iteration; the underlying handle is still released
    /// when the `EventFile` drops.
    pub fn events<'a>(&'a mut self, codes: &'a [&'a str]) -> Events<'a> {
        debug!("Iterating {} (codes: {:?})", self.path.display(), codes);
        Events {
            reader: &mut self.reader,
            codes,
            done: false,
        }
    }
}

/// Lazy, fused iterator over filtered events. See [`EventFile::events`].
pub struct Events<'a> {
    reader: &'a mut BufReader<File>,
    codes: &'a [&'a str],
    done: bool,
}

impl Events<'_> {
    fn read_record(&mut self) -> Result<Option<Event>, StoreError> {
        loop {
            let mut prefix = [0u8; 4];
            match self.reader.read_exact(&mut prefix) {
                Ok(()) => {}
                // Clean EOF lands exactly on a record boundary.
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
                Err(e) => return Err(StoreError::Io(e)),
            }

            let len = u32::from_le_bytes(prefix) as usize;
            if len > MAX_RECORD_LEN {
                return Err(StoreError::OversizedRecord(len));
            }

            let mut body = vec![0u8; len];
            self.reader.read_exact(&mut body).map_err(|e| match e.kind() {
                ErrorKind::UnexpectedEof => StoreError::Truncated,
                _ => StoreError::Io(e),
            })?;

            let (code, time, value) = codec::decode_record(&body)?;
            if self.codes.is_empty() || self.codes.iter().any(|c| *c == code) {
                return Ok(Some(Event { code, time, value }));
            }
        }
    }
}

impl Iterator for Events<'_> {
    type Item = Result<Event, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Appends events to a fresh event file.
///
/// Used by tests and embedders to synthesize fixtures; the validator itself
/// never writes.
pub struct EventFileWriter {
    writer: BufWriter<File>,
}

impl EventFileWriter {
    /// Create (or truncate) `path` and write the format magic.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&MAGIC)?;
        Ok(Self { writer })
    }

    /// Append one event as a length-prefixed record.
    pub fn append(&mut self, event: &Event) -> Result<(), StoreError> {
        if event.code.len() > u16::MAX as usize {
            return Err(StoreError::OversizedRecord(event.code.len()));
        }
        let body = codec::encode_record(&event.code, event.time, &event.value);
        if body.len() > MAX_RECORD_LEN {
            return Err(StoreError::OversizedRecord(body.len()));
        }

        let mut prefix = Vec::with_capacity(4);
        prefix.put_u32_le(body.len() as u32);
        self.writer.write_all(&prefix)?;
        self.writer.write_all(&body)?;
        Ok(())
    }

    /// Flush and close the file.
    pub fn finish(mut self) -> Result<(), StoreError> {
        self.writer.flush()?;
        Ok(())
    }
}
