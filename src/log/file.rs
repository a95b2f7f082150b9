//! Log file handle
//!
//! Owns the append position and serves positioned reads and full replays.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

use super::{Command, RecordPos, LEN_PREFIX_SIZE};

/// Handle on the append-only log file
///
/// The append position is owned here and only moves forward (or back to the
/// last valid boundary after a replay). Positioned reads open an independent
/// handle so they never disturb the append cursor.
pub struct LogFile {
    path: PathBuf,
    writer: File,
    write_pos: u64,
    sync_on_append: bool,
}

/// Stats reported by a replay
#[derive(Debug, Default)]
pub struct ReplayStats {
    /// Number of fully-valid records decoded
    pub records: u64,

    /// Offset of the last valid record boundary (the new append position)
    pub valid_len: u64,

    /// Bytes past the last valid boundary (torn or corrupt tail)
    pub truncated_bytes: u64,
}

impl LogFile {
    /// Open or create the log file
    ///
    /// The append position starts at the physical end of file; `replay`
    /// pulls it back to the last valid record boundary.
    pub fn open(path: &Path, sync_on_append: bool) -> Result<Self> {
        let writer = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        let write_pos = writer.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            write_pos,
            sync_on_append,
        })
    }

    /// Append a length-prefixed record at the current end of the log
    ///
    /// Must be called under exclusive access so length prefix and payload
    /// of different calls never interleave. Returns the payload range.
    pub fn append(&mut self, payload: &[u8]) -> Result<RecordPos> {
        let len = payload.len() as u32;

        self.writer.seek(SeekFrom::Start(self.write_pos))?;
        self.writer.write_all(&len.to_be_bytes())?;
        self.writer.write_all(payload)?;
        if self.sync_on_append {
            self.writer.sync_data()?;
        }

        let pos = RecordPos {
            pos: self.write_pos + LEN_PREFIX_SIZE as u64,
            len,
        };
        self.write_pos = pos.pos + u64::from(len);
        Ok(pos)
    }

    /// Positioned read of exactly one record payload
    ///
    /// Opens an independent read handle, so the append position is untouched
    /// and concurrent readers never race over a shared cursor.
    pub fn read_at(&self, pos: RecordPos) -> Result<Vec<u8>> {
        let mut reader = File::open(&self.path)?;
        reader.seek(SeekFrom::Start(pos.pos))?;

        let mut payload = vec![0u8; pos.len as usize];
        reader.read_exact(&mut payload)?;
        Ok(payload)
    }

    /// Replay the whole log from offset 0
    ///
    /// Stops at the last fully-valid record boundary rather than failing on
    /// a torn trailing write, and resets the append position to that
    /// boundary so the partial tail is overwritten by the next append.
    pub fn replay(&mut self) -> Result<(Vec<(Command, RecordPos)>, ReplayStats)> {
        let (records, stats) = scan(&self.path, None)?;

        if stats.truncated_bytes > 0 {
            tracing::warn!(
                path = %self.path.display(),
                valid_len = stats.valid_len,
                truncated_bytes = stats.truncated_bytes,
                "log ends in a torn or corrupt record, resuming from last valid boundary"
            );
        }

        self.write_pos = stats.valid_len;
        Ok((records, stats))
    }

    /// Current append position (logical size of the log)
    pub fn size(&self) -> u64 {
        self.write_pos
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Scan framed records from offset 0 up to `limit` (or end of file)
///
/// Shared by replay and by the compactor, which scans up to a fixed cutoff
/// without holding any lock. Stops cleanly at the first incomplete length
/// field, incomplete payload, or undecodable payload.
pub fn scan(path: &Path, limit: Option<u64>) -> Result<(Vec<(Command, RecordPos)>, ReplayStats)> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let end = limit.map_or(file_len, |l| l.min(file_len));

    let mut reader = BufReader::new(file);
    let mut records = Vec::new();
    let mut offset = 0u64;

    loop {
        if offset + LEN_PREFIX_SIZE as u64 > end {
            break;
        }
        let mut len_buf = [0u8; LEN_PREFIX_SIZE];
        reader.read_exact(&mut len_buf)?;
        let len = u32::from_be_bytes(len_buf);

        let payload_start = offset + LEN_PREFIX_SIZE as u64;
        if payload_start + u64::from(len) > end {
            break;
        }
        let mut payload = vec![0u8; len as usize];
        reader.read_exact(&mut payload)?;

        match Command::decode(&payload) {
            Ok(command) => {
                records.push((
                    command,
                    RecordPos {
                        pos: payload_start,
                        len,
                    },
                ));
                offset = payload_start + u64::from(len);
            }
            Err(_) => break,
        }
    }

    let stats = ReplayStats {
        records: records.len() as u64,
        valid_len: offset,
        truncated_bytes: end - offset,
    };
    Ok((records, stats))
}
