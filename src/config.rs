//! Configuration for emberkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for an emberkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files (created if absent)
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── data.log           (append-only command log)
    ///     ├── data.log.compact   (compaction scratch file, transient)
    ///     └── <snapshot>         (optional plain-text export)
    pub data_dir: PathBuf,

    /// fsync the log after every append
    ///
    /// The index is only updated once the append has durably succeeded,
    /// so turning this off trades crash durability for throughput.
    pub sync_on_append: bool,

    // -------------------------------------------------------------------------
    // Compaction Configuration
    // -------------------------------------------------------------------------
    /// Number of writes since the last trigger before compaction is scheduled
    pub compaction_threshold: usize,

    /// File name (inside `data_dir`) for the plain-text snapshot the
    /// compactor exports after each cycle. Debug convenience only; never
    /// consulted by recovery. `None` disables the export.
    pub snapshot_filename: Option<String>,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./emberkv_data"),
            sync_on_append: true,
            compaction_threshold: 5,
            snapshot_filename: None,
            listen_addr: "127.0.0.1:4690".to_string(),
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Enable or disable fsync after every append
    pub fn sync_on_append(mut self, sync: bool) -> Self {
        self.config.sync_on_append = sync;
        self
    }

    /// Set the compaction write threshold
    pub fn compaction_threshold(mut self, writes: usize) -> Self {
        self.config.compaction_threshold = writes;
        self
    }

    /// Set the snapshot export file name (inside the data directory)
    pub fn snapshot_filename(mut self, name: impl Into<String>) -> Self {
        self.config.snapshot_filename = Some(name.into());
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
