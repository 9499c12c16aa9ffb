//! Flat-file append-only storage.
//!
//! Record framing: an 8-byte big-endian length `L` followed by `L` bytes of
//! canonical entry encoding, records concatenated in index order. No file
//! header, no frame checksum; the `entry_hash` inside each record carries
//! integrity.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use attest_core::{codec, ConfigEntry, MAX_ENTRY_BYTES};
use tracing::warn;

use crate::error::StoreError;
use crate::traits::Store;

struct FileInner {
    /// `None` once closed.
    file: Option<File>,
}

/// Append-only file store.
pub struct FileStore {
    path: PathBuf,
    inner: Mutex<FileInner>,
}

impl FileStore {
    /// Open or create the log file at `path`, creating parent directories
    /// as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;
        Ok(Self {
            path,
            inner: Mutex::new(FileInner { file: Some(file) }),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Store for FileStore {
    fn append(&self, entry: &ConfigEntry) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("file store lock");
        let file = inner.file.as_mut().ok_or(StoreError::Closed)?;

        let data = codec::to_bytes(entry)?;
        let mut frame = Vec::with_capacity(8 + data.len());
        frame.extend_from_slice(&(data.len() as u64).to_be_bytes());
        frame.extend_from_slice(&data);

        file.seek(SeekFrom::End(0))?;
        file.write_all(&frame)?;
        // Not visible to load_all until the bytes are on stable storage.
        file.sync_all()?;
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<ConfigEntry>, StoreError> {
        let mut inner = self.inner.lock().expect("file store lock");
        let file = inner.file.as_mut().ok_or(StoreError::Closed)?;

        file.seek(SeekFrom::Start(0))?;
        let mut entries = Vec::new();
        let mut intact_end: u64 = 0;
        let mut len_buf = [0u8; 8];

        loop {
            match read_exact_or_eof(file, &mut len_buf)? {
                ReadOutcome::Eof => break,
                ReadOutcome::Partial => {
                    truncate_tail(file, &self.path, intact_end)?;
                    break;
                }
                ReadOutcome::Full => {}
            }

            let length = u64::from_be_bytes(len_buf);
            // A torn or zeroed length prefix must not drive allocation;
            // treat it like any other damage past the last intact record.
            if length == 0 || length > MAX_ENTRY_BYTES as u64 {
                truncate_tail(file, &self.path, intact_end)?;
                break;
            }

            let mut data = vec![0u8; length as usize];
            match read_exact_or_eof(file, &mut data)? {
                ReadOutcome::Full => {}
                ReadOutcome::Eof | ReadOutcome::Partial => {
                    truncate_tail(file, &self.path, intact_end)?;
                    break;
                }
            }

            // A complete frame that fails to decode is hard corruption, not
            // a torn tail: fail the load rather than drop valid-looking
            // records behind it.
            let entry = codec::decode_entry(&data)
                .map_err(|_| StoreError::Corrupt("undecodable record"))?;
            entries.push(entry);
            intact_end += 8 + length;
        }

        Ok(entries)
    }

    fn close(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("file store lock");
        let file = inner.file.take().ok_or(StoreError::Closed)?;
        file.sync_all()?;
        Ok(())
    }
}

enum ReadOutcome {
    Full,
    Partial,
    Eof,
}

/// Fill `buf`, distinguishing clean EOF (no bytes read) from a torn record
/// (some bytes read, then EOF).
fn read_exact_or_eof(file: &mut File, buf: &mut [u8]) -> Result<ReadOutcome, StoreError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            return Ok(if filled == 0 {
                ReadOutcome::Eof
            } else {
                ReadOutcome::Partial
            });
        }
        filled += n;
    }
    Ok(ReadOutcome::Full)
}

/// Discard everything past the last intact record.
///
/// A torn tail comes from a crash between the length prefix and the payload
/// flush; dropping it restores the append-only contract for the records
/// that did reach stable storage.
fn truncate_tail(file: &mut File, path: &Path, intact_end: u64) -> Result<(), StoreError> {
    let total = file.metadata()?.len();
    warn!(
        path = %path.display(),
        intact_end,
        total,
        "truncating partial trailing record"
    );
    file.set_len(intact_end)?;
    file.sync_all()?;
    Ok(())
}
