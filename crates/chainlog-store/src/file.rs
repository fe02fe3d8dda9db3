use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::RecordStore;

/// Flush/sync strategy for the segment file.
#[derive(Clone, Debug, Default)]
pub enum SyncMode {
    /// `fsync` after every write (safest, highest latency).
    EveryWrite,
    /// Rely on OS page-cache buffering (fastest, least durable).
    #[default]
    OsDefault,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Internal mutable state for the segment writer.
struct SegmentWriter {
    writer: BufWriter<File>,
    /// Current write offset in the segment file.
    offset: u64,
}

/// Crash-recoverable, file-backed record store.
///
/// Entries are serialized with bincode, framed with a length prefix and a
/// CRC32 checksum, and appended to a single segment file:
///
/// ```text
/// [4 bytes: entry length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized (key, value))]
/// ```
///
/// On open the file is read front-to-back into an in-memory index; entries
/// that fail the CRC check are skipped (they represent incomplete/torn
/// writes from a crash). Reads are served from the index.
pub struct FileRecordStore {
    /// Path to the segment file.
    path: PathBuf,
    /// Writer state behind a mutex for thread safety.
    writer: Mutex<SegmentWriter>,
    /// Recovered entries, kept in sync with the file on every `put`.
    index: RwLock<BTreeMap<u64, Vec<u8>>>,
    sync_mode: SyncMode,
}

impl FileRecordStore {
    /// Open (or create) a segment file at the given path.
    pub fn open(path: &Path, sync_mode: SyncMode) -> StoreResult<Self> {
        // Ensure parent directory exists.
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let offset = file.metadata()?.len();
        let writer = BufWriter::new(file);
        let index = Self::recover(path)?;

        debug!(path = %path.display(), entries = index.len(), "segment opened");

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(SegmentWriter { writer, offset }),
            index: RwLock::new(index),
            sync_mode,
        })
    }

    /// Path to the segment file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recover all valid entries from the segment file.
    ///
    /// Reads the file front-to-back. Entries that fail CRC validation are
    /// logged and skipped.
    fn recover(path: &Path) -> StoreResult<BTreeMap<u64, Vec<u8>>> {
        let mut file = BufReader::new(File::open(path)?);
        let file_len = file.get_ref().metadata()?.len();
        let mut entries = BTreeMap::new();
        let mut offset: u64 = 0;

        while offset + HEADER_SIZE as u64 <= file_len {
            file.seek(SeekFrom::Start(offset))?;

            let mut header_buf = [0u8; HEADER_SIZE];
            match file.read_exact(&mut header_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            let length =
                u32::from_le_bytes([header_buf[0], header_buf[1], header_buf[2], header_buf[3]]);
            let expected_crc =
                u32::from_le_bytes([header_buf[4], header_buf[5], header_buf[6], header_buf[7]]);

            if length == 0 || (offset + HEADER_SIZE as u64 + length as u64) > file_len {
                warn!(offset, length, file_len, "invalid entry length; stopping recovery");
                break;
            }

            let mut payload = vec![0u8; length as usize];
            match file.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    warn!(offset, "truncated entry; stopping recovery");
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let actual_crc = crc32fast::hash(&payload);
            if actual_crc != expected_crc {
                warn!(
                    offset,
                    expected = expected_crc,
                    actual = actual_crc,
                    "CRC mismatch; skipping entry"
                );
                offset += HEADER_SIZE as u64 + length as u64;
                continue;
            }

            match bincode::deserialize::<(u64, Vec<u8>)>(&payload) {
                Ok((key, value)) => {
                    if entries.contains_key(&key) {
                        warn!(offset, key, "duplicate key during recovery; keeping first");
                    } else {
                        entries.insert(key, value);
                    }
                }
                Err(e) => {
                    warn!(offset, error = %e, "failed to deserialize entry; skipping");
                }
            }

            offset += HEADER_SIZE as u64 + length as u64;
        }

        debug!(recovered = entries.len(), "segment recovery complete");
        Ok(entries)
    }
}

impl RecordStore for FileRecordStore {
    fn put(&self, key: u64, value: &[u8]) -> StoreResult<()> {
        {
            let index = self.index.read().expect("index lock poisoned");
            if index.contains_key(&key) {
                return Err(StoreError::DuplicateKey { key });
            }
        }

        let payload = bincode::serialize(&(key, value.to_vec()))
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let length = payload.len() as u32;
        let crc = crc32fast::hash(&payload);

        let mut w = self.writer.lock().expect("writer mutex poisoned");
        let entry_offset = w.offset;

        // Write header: [length: u32 LE] [crc: u32 LE]
        w.writer.write_all(&length.to_le_bytes())?;
        w.writer.write_all(&crc.to_le_bytes())?;
        w.writer.write_all(&payload)?;
        w.writer.flush()?;

        if matches!(self.sync_mode, SyncMode::EveryWrite) {
            w.writer.get_ref().sync_all()?;
        }

        w.offset += HEADER_SIZE as u64 + payload.len() as u64;

        // Publish to the index only after the bytes hit the file, so a failed
        // write leaves the index unchanged.
        self.index
            .write()
            .expect("index lock poisoned")
            .insert(key, value.to_vec());

        debug!(offset = entry_offset, key, len = payload.len(), "segment append");
        Ok(())
    }

    fn get(&self, key: u64) -> StoreResult<Option<Vec<u8>>> {
        let index = self.index.read().expect("index lock poisoned");
        Ok(index.get(&key).cloned())
    }

    fn contains(&self, key: u64) -> StoreResult<bool> {
        let index = self.index.read().expect("index lock poisoned");
        Ok(index.contains_key(&key))
    }

    fn len(&self) -> StoreResult<u64> {
        let index = self.index.read().expect("index lock poisoned");
        Ok(index.len() as u64)
    }

    fn scan(&self) -> StoreResult<Vec<(u64, Vec<u8>)>> {
        let index = self.index.read().expect("index lock poisoned");
        Ok(index.iter().map(|(k, v)| (*k, v.clone())).collect())
    }
}

impl std::fmt::Debug for FileRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.index.read().expect("index lock poisoned").len();
        f.debug_struct("FileRecordStore")
            .field("path", &self.path)
            .field("entry_count", &count)
            .finish()
    }
}
