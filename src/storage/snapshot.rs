//! Snapshot Save / Load
//!
//! A snapshot is a point-in-time dump of a store's entire map, expired
//! entries included. It is not a write-ahead log and gives no durability
//! guarantee.
//!
//! ## Format
//!
//! ```text
//! ┌──────────┬─────────┬──────────────────────────────────────┐
//! │ "FKVC"   │ version │ bincode(HashMap<String, Entry>)      │
//! │ 4 bytes  │ 1 byte  │ variable                             │
//! └──────────┴─────────┴──────────────────────────────────────┘
//! ```
//!
//! Every [`Value`](crate::Value) is encoded with its variant, so a reloaded
//! `u16` is still a `u16` and the typed mutators keep working on it.
//! Expirations are wall-clock instants and survive a process restart.
//!
//! ## Loading
//!
//! Loading merges instead of replacing: a snapshot entry is kept only where
//! the store has no entry for that key or its entry has already expired.

use crate::error::{CacheError, Result};
use crate::storage::entry::Entry;
use crate::storage::store::Store;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

/// Magic bytes at the start of every snapshot.
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"FKVC";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u8 = 1;

fn encode_error(err: bincode::Error) -> CacheError {
    match *err {
        bincode::ErrorKind::Io(e) => CacheError::Io(e),
        other => CacheError::Encode(other.to_string()),
    }
}

fn decode_error(err: bincode::Error) -> CacheError {
    match *err {
        bincode::ErrorKind::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            CacheError::Decode("snapshot is truncated".to_string())
        }
        bincode::ErrorKind::Io(e) => CacheError::Io(e),
        other => CacheError::Decode(other.to_string()),
    }
}

/// Reads and validates the snapshot header.
fn read_header<R: Read>(reader: &mut R) -> Result<()> {
    let mut header = [0u8; 5];
    reader.read_exact(&mut header).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => CacheError::Decode("snapshot header is truncated".to_string()),
        _ => CacheError::Io(e),
    })?;

    if &header[..4] != SNAPSHOT_MAGIC {
        return Err(CacheError::Decode("not a cache snapshot".to_string()));
    }
    if header[4] != SNAPSHOT_VERSION {
        return Err(CacheError::Decode(format!(
            "unsupported snapshot version {}",
            header[4]
        )));
    }
    Ok(())
}

/// Decodes a full entries map from a snapshot stream.
///
/// The payload is buffered before decoding so that every length prefix is
/// checked against the bytes actually present. A corrupt prefix fails with
/// `Decode` instead of driving a huge allocation.
pub fn decode<R: Read>(mut reader: R) -> Result<HashMap<String, Entry>> {
    read_header(&mut reader)?;
    let mut payload = Vec::new();
    reader.read_to_end(&mut payload)?;
    bincode::deserialize(&payload).map_err(decode_error)
}

/// Encodes an entries map as a snapshot.
pub fn encode<W: Write>(mut writer: W, items: &HashMap<String, Entry>) -> Result<()> {
    writer.write_all(SNAPSHOT_MAGIC)?;
    writer.write_all(&[SNAPSHOT_VERSION])?;
    bincode::serialize_into(&mut writer, items).map_err(encode_error)?;
    writer.flush()?;
    Ok(())
}

impl Store {
    /// Writes every stored entry, live or expired, to `writer`.
    ///
    /// The shared lock is held for the whole encode, so writers block until
    /// the snapshot is complete.
    pub fn save<W: Write>(&self, writer: W) -> Result<()> {
        self.with_items(|items| -> Result<()> {
            encode(writer, items)?;
            debug!(entries = items.len(), "Snapshot saved");
            Ok(())
        })
    }

    /// Saves a snapshot to `path`, creating or truncating the file.
    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        self.save(BufWriter::new(file))
    }

    /// Reads a snapshot from `reader` and merges it into the store.
    ///
    /// Existing live entries win over the snapshot's.
    ///
    /// # Returns
    ///
    /// Returns the number of snapshot entries that were kept.
    pub fn load<R: Read>(&self, reader: R) -> Result<usize> {
        let items = decode(reader)?;
        let total = items.len();
        let merged = self.merge(items);
        debug!(
            merged = merged,
            skipped = total - merged,
            "Snapshot loaded"
        );
        Ok(merged)
    }

    /// Loads and merges a snapshot from `path`.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let file = File::open(path)?;
        self.load(BufReader::new(file))
    }
}
