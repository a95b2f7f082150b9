//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Serve Get/Set/Remove against the (Index, Log) pair
//! - Rebuild the index from the log on startup and on `recover`
//! - Count writes and schedule compaction at the configured threshold
//! - Supervise the background compaction worker

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{unbounded, Sender};
use parking_lot::RwLock;

use crate::compaction::{CompactionJob, Compactor};
use crate::config::Config;
use crate::error::Result;
use crate::index::KeyIndex;
use crate::log::{Command, LogFile};

/// State protected by the engine's reader/writer lock
///
/// The log handle, the index derived from it, and the write counter move
/// together: every reader sees a consistent pairing, and the compactor's
/// swap+reindex step replaces log and index in one exclusive section.
pub(crate) struct StoreInner {
    pub log: LogFile,
    pub index: KeyIndex,
    pub writes_since_trigger: usize,
}

/// The main storage engine
///
/// ## Concurrency Model: Multiple-Reader / Single-Writer
///
/// - **Reads** (`get`): shared lock for the index lookup plus the positioned
///   log read, so a read always observes a consistent (Index, Log) snapshot.
/// - **Writes** (`set`/`remove`): exclusive lock for append + index update.
///   Appends complete entirely within one exclusive section, so a torn
///   record can never be observed by a reader.
/// - **Compaction**: scans and rewrites into a private file without the
///   lock; only the file swap + index rebuild runs exclusively.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Lock-protected (log, index, write counter) triple
    inner: Arc<RwLock<StoreInner>>,

    /// Compaction state and algorithm (shared with the worker thread)
    compactor: Arc<Compactor>,

    /// Job queue feeding the compaction worker
    job_tx: Sender<CompactionJob>,

    /// Worker thread handle, joined on drop
    worker: Option<JoinHandle<()>>,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const LOG_FILENAME: &'static str = "data.log";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory if it doesn't exist
    /// 2. Open or create the log file
    /// 3. Replay the log into a fresh index (torn tails tolerated)
    /// 4. Start the compaction worker
    pub fn open(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;

        let log_path = config.data_dir.join(Self::LOG_FILENAME);
        let mut log = LogFile::open(&log_path, config.sync_on_append)?;

        let (records, stats) = log.replay()?;
        let index = KeyIndex::rebuild(&records);
        tracing::info!(
            records = stats.records,
            live_keys = index.len(),
            log_bytes = stats.valid_len,
            "log replayed"
        );

        let inner = Arc::new(RwLock::new(StoreInner {
            log,
            index,
            writes_since_trigger: 0,
        }));

        let snapshot_path = config
            .snapshot_filename
            .as_ref()
            .map(|name| config.data_dir.join(name));
        let compactor = Arc::new(Compactor::new(
            log_path,
            Arc::clone(&inner),
            snapshot_path,
            config.sync_on_append,
        ));

        let (job_tx, job_rx) = unbounded();
        let worker_compactor = Arc::clone(&compactor);
        let worker = std::thread::Builder::new()
            .name("emberkv-compactor".to_string())
            .spawn(move || {
                for job in job_rx {
                    match job {
                        CompactionJob::Run => {
                            if let Err(e) = worker_compactor.run_guarded() {
                                tracing::warn!("background compaction failed: {}", e);
                            }
                        }
                        CompactionJob::Shutdown => break,
                    }
                }
            })?;

        Ok(Self {
            config,
            inner,
            compactor,
            job_tx,
            worker: Some(worker),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let mut config = Config::default();
        config.data_dir = path.to_path_buf();
        Self::open(config)
    }

    /// Get the current value for a key
    ///
    /// A missing key is `Ok(None)`, not an error. The indexed record is read
    /// back from the log and decoded; an indexed tombstone (which the index
    /// invariant rules out) is handled defensively as absent.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let inner = self.inner.read();

        let Some(pos) = inner.index.get(key) else {
            return Ok(None);
        };

        let payload = inner.log.read_at(pos)?;
        match Command::decode(&payload)? {
            Command::Set { value, .. } => Ok(Some(value)),
            Command::Remove { .. } => Ok(None),
        }
    }

    /// Set a key to a value
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write_command(Command::Set {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Remove a key
    ///
    /// A tombstone is always appended, even if the key has no current value,
    /// so the log keeps a full audit of write intents.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.write_command(Command::Remove {
            key: key.to_string(),
        })
    }

    /// Append one command and update the index
    ///
    /// The threshold check happens before the append, and counts writes
    /// since the last trigger: the triggering write proceeds immediately
    /// after scheduling, it never waits for compaction to finish. The index
    /// is only touched after the append has succeeded, so a failed write
    /// commits no partial state.
    fn write_command(&self, command: Command) -> Result<()> {
        let mut inner = self.inner.write();

        if inner.writes_since_trigger >= self.config.compaction_threshold {
            inner.writes_since_trigger = 0;
            self.schedule_compaction();
        }

        let payload = command.encode()?;
        let pos = inner.log.append(&payload)?;
        inner.index.apply(&command, pos);
        inner.writes_since_trigger += 1;

        Ok(())
    }

    /// Rebuild the index from the log and schedule a compaction
    ///
    /// The fresh index is built by a full replay and installed in place of
    /// the old one under exclusive access.
    pub fn recover(&self) -> Result<()> {
        {
            let mut inner = self.inner.write();
            let (records, stats) = inner.log.replay()?;
            inner.index = KeyIndex::rebuild(&records);
            tracing::info!(
                records = stats.records,
                live_keys = inner.index.len(),
                "index recovered from log"
            );
        }

        self.schedule_compaction();
        Ok(())
    }

    /// Run a compaction synchronously on the calling thread
    ///
    /// A no-op returning `Ok(())` if a compaction is already in flight.
    pub fn compact(&self) -> Result<()> {
        if !self.compactor.try_begin() {
            tracing::debug!("compaction already in flight, ignoring");
            return Ok(());
        }
        self.compactor.run_guarded()
    }

    /// Hand a compaction job to the worker, unless one is already in flight
    fn schedule_compaction(&self) {
        if !self.compactor.try_begin() {
            tracing::debug!("compaction already in flight, trigger ignored");
            return;
        }
        if self.job_tx.send(CompactionJob::Run).is_err() {
            // Worker is gone (shutdown race); release the guard.
            self.compactor.cancel();
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the log file path
    pub fn log_path(&self) -> PathBuf {
        self.config.data_dir.join(Self::LOG_FILENAME)
    }

    /// Current logical size of the log in bytes
    pub fn log_size(&self) -> u64 {
        self.inner.read().log.size()
    }

    /// Number of live keys in the index
    pub fn key_count(&self) -> usize {
        self.inner.read().index.len()
    }

    /// Whether a compaction is currently in flight
    pub fn is_compacting(&self) -> bool {
        self.compactor.is_running()
    }

    /// Number of compaction cycles completed since open
    pub fn compactions_completed(&self) -> u64 {
        self.compactor.completed()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Queued jobs drain before the shutdown message; join makes the
        // shutdown deterministic for callers that reopen the directory.
        let _ = self.job_tx.send(CompactionJob::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
