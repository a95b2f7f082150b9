//! Compaction Module
//!
//! Bounds log growth while preserving every key's current value (or
//! absence). The log is rewritten key-latest-wins: for each key only the
//! last record survives, and tombstones for keys that were never set are
//! dropped entirely.
//!
//! ## Phases
//! 1. **Scan (no lock)** — pick a cutoff at the current log size and plan
//!    which records survive. Records are immutable once written, so the
//!    prefix below the cutoff can be read without blocking anyone.
//! 2. **Rewrite (no lock)** — copy the surviving records, in original
//!    relative order, into a private scratch file.
//! 3. **Swap + reindex (exclusive lock)** — carry over any records appended
//!    after the cutoff, sync the scratch file, atomically rename it over
//!    the live log, and rebuild the index by replay. No reader or writer
//!    can observe a swapped-but-unindexed log.
//! 4. **Export (optional)** — write the plain-text snapshot if configured.
//!
//! At most one compaction is in flight at a time; the guard is an atomic
//! flag checked-and-set by the engine, and a trigger that loses the race is
//! silently ignored.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::engine::StoreInner;
use crate::error::Result;
use crate::index::KeyIndex;
use crate::log::{self, Command, LogFile, RecordPos};

/// Messages accepted by the compaction worker thread
pub(crate) enum CompactionJob {
    Run,
    Shutdown,
}

/// Compaction state and algorithm, shared between the engine and the
/// background worker thread
pub(crate) struct Compactor {
    /// Path of the live log
    log_path: PathBuf,

    /// Private scratch file the replacement log is built in
    scratch_path: PathBuf,

    /// Optional plain-text export written after each cycle
    snapshot_path: Option<PathBuf>,

    /// Shared (log, index) state, locked only for the swap+reindex step
    inner: Arc<RwLock<StoreInner>>,

    /// Carried into the reopened log handle after the swap
    sync_on_append: bool,

    /// At most one compaction in flight
    in_flight: AtomicBool,

    /// Completed cycles since open
    completed: AtomicU64,
}

impl Compactor {
    const SCRATCH_SUFFIX: &'static str = ".compact";

    pub fn new(
        log_path: PathBuf,
        inner: Arc<RwLock<StoreInner>>,
        snapshot_path: Option<PathBuf>,
        sync_on_append: bool,
    ) -> Self {
        let mut scratch = log_path.as_os_str().to_os_string();
        scratch.push(Self::SCRATCH_SUFFIX);

        Self {
            log_path,
            scratch_path: PathBuf::from(scratch),
            snapshot_path,
            inner,
            sync_on_append,
            in_flight: AtomicBool::new(false),
            completed: AtomicU64::new(0),
        }
    }

    /// Claim the in-flight guard; returns false if a compaction is running
    pub fn try_begin(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Release the guard without running (scheduling failed)
    pub fn cancel(&self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }

    /// Whether a compaction is currently in flight
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Completed cycles since open
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Run one cycle; the caller must have claimed the guard via `try_begin`
    pub fn run_guarded(&self) -> Result<()> {
        let result = self.compact();
        if result.is_ok() {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    fn compact(&self) -> Result<()> {
        // Phase 1: scan up to a fixed cutoff without the lock.
        let cutoff = self.inner.read().log.size();
        let (records, _) = log::scan(&self.log_path, Some(cutoff))?;
        let retained = plan_retention(&records);

        // Phase 2: rewrite the survivors into the scratch file.
        let mut src = File::open(&self.log_path)?;
        let mut out = BufWriter::new(File::create(&self.scratch_path)?);
        let mut retained_bytes = 0u64;
        for pos in &retained {
            src.seek(SeekFrom::Start(pos.pos))?;
            let mut payload = vec![0u8; pos.len as usize];
            src.read_exact(&mut payload)?;

            out.write_all(&pos.len.to_be_bytes())?;
            out.write_all(&payload)?;
            retained_bytes += (log::LEN_PREFIX_SIZE + payload.len()) as u64;
        }
        let mut out = out
            .into_inner()
            .map_err(|e| crate::EmberError::Io(e.into_error()))?;

        // Phase 3: swap and reindex under the exclusive lock.
        let mut inner = self.inner.write();

        // Writes admitted during the scan landed past the cutoff; carry
        // them over so the swap loses nothing.
        let live_len = inner.log.size();
        if live_len > cutoff {
            let mut tail = vec![0u8; (live_len - cutoff) as usize];
            src.seek(SeekFrom::Start(cutoff))?;
            src.read_exact(&mut tail)?;
            out.write_all(&tail)?;
        }
        out.sync_all()?;
        drop(out);

        fs::rename(&self.scratch_path, &self.log_path)?;

        let mut new_log = LogFile::open(&self.log_path, self.sync_on_append)?;
        let (new_records, _) = new_log.replay()?;
        inner.index = KeyIndex::rebuild(&new_records);
        inner.log = new_log;
        let new_len = inner.log.size();
        drop(inner);

        tracing::info!(
            before_bytes = cutoff,
            after_bytes = new_len,
            retained_records = retained.len(),
            dropped_records = records.len() - retained.len(),
            "compaction complete"
        );
        debug_assert!(retained_bytes <= cutoff);

        // Phase 4: optional human-readable export; never read back.
        if let Some(path) = &self.snapshot_path {
            self.export_snapshot(path)?;
        }

        Ok(())
    }

    /// Export `key,value\r\n` lines for every live key
    ///
    /// Overwritten wholesale each cycle; a debugging convenience only.
    fn export_snapshot(&self, path: &Path) -> Result<()> {
        let inner = self.inner.read();
        let mut out = BufWriter::new(File::create(path)?);

        for (key, pos) in inner.index.iter() {
            let payload = inner.log.read_at(pos)?;
            if let Command::Set { value, .. } = Command::decode(&payload)? {
                write!(out, "{},{}\r\n", key, value)?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

/// Decide which records survive compaction
///
/// Keeps, per key, only the last record (Set or Remove), except that a
/// tombstone for a key with no Set anywhere in the scanned history is pure
/// noise and is dropped too. Survivors keep their original relative order.
fn plan_retention(records: &[(Command, RecordPos)]) -> Vec<RecordPos> {
    let mut last_for_key: HashMap<&str, usize> = HashMap::new();
    let mut ever_set: HashSet<&str> = HashSet::new();

    for (i, (command, _)) in records.iter().enumerate() {
        last_for_key.insert(command.key(), i);
        if matches!(command, Command::Set { .. }) {
            ever_set.insert(command.key());
        }
    }

    records
        .iter()
        .enumerate()
        .filter(|(i, (command, _))| {
            if last_for_key[command.key()] != *i {
                return false;
            }
            match command {
                Command::Set { .. } => true,
                Command::Remove { key } => ever_set.contains(key.as_str()),
            }
        })
        .map(|(_, (_, pos))| *pos)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
