//! Tests for the append-only log
//!
//! These tests verify:
//! - Append framing and returned payload ranges
//! - Positioned reads independent of the append cursor
//! - Replay ordering and torn-tail tolerance
//! - Append position resuming from the last valid boundary

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use emberkv::log::{scan, Command, LogFile, LEN_PREFIX_SIZE};
use emberkv::{Config, Engine};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.log");
    (temp_dir, path)
}

fn set_command(key: &str, value: &str) -> Command {
    Command::Set {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Append raw bytes to a file, bypassing the log's framing
fn append_raw(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

// =============================================================================
// Append & Read Tests
// =============================================================================

#[test]
fn test_append_returns_payload_range() {
    let (_temp, path) = setup_temp_log();
    let mut log = LogFile::open(&path, true).unwrap();

    let payload = set_command("a", "1").encode().unwrap();
    let pos = log.append(&payload).unwrap();

    assert_eq!(pos.pos, LEN_PREFIX_SIZE as u64);
    assert_eq!(pos.len as usize, payload.len());
    assert_eq!(log.size(), (LEN_PREFIX_SIZE + payload.len()) as u64);
}

#[test]
fn test_read_at_returns_exact_payload() {
    let (_temp, path) = setup_temp_log();
    let mut log = LogFile::open(&path, true).unwrap();

    let first = set_command("a", "1").encode().unwrap();
    let second = set_command("b", "2").encode().unwrap();
    let first_pos = log.append(&first).unwrap();
    let second_pos = log.append(&second).unwrap();

    assert_eq!(log.read_at(first_pos).unwrap(), first);
    assert_eq!(log.read_at(second_pos).unwrap(), second);

    // Positioned reads leave the append cursor alone.
    let third = set_command("c", "3").encode().unwrap();
    let third_pos = log.append(&third).unwrap();
    assert_eq!(third_pos.pos, second_pos.pos + second_pos.len as u64 + LEN_PREFIX_SIZE as u64);
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_replay_empty_log() {
    let (_temp, path) = setup_temp_log();
    let mut log = LogFile::open(&path, true).unwrap();

    let (records, stats) = log.replay().unwrap();
    assert!(records.is_empty());
    assert_eq!(stats.valid_len, 0);
    assert_eq!(stats.truncated_bytes, 0);
}

#[test]
fn test_replay_preserves_order() {
    let (_temp, path) = setup_temp_log();
    let mut log = LogFile::open(&path, true).unwrap();

    let commands = vec![
        set_command("a", "1"),
        Command::Remove {
            key: "a".to_string(),
        },
        set_command("b", "2"),
    ];
    let mut positions = Vec::new();
    for command in &commands {
        positions.push(log.append(&command.encode().unwrap()).unwrap());
    }

    let (records, stats) = log.replay().unwrap();
    assert_eq!(stats.records, 3);
    for (i, (command, pos)) in records.iter().enumerate() {
        assert_eq!(command, &commands[i]);
        assert_eq!(pos, &positions[i]);
    }
}

#[test]
fn test_replay_stops_at_torn_length_field() {
    let (_temp, path) = setup_temp_log();
    let mut log = LogFile::open(&path, true).unwrap();
    log.append(&set_command("a", "1").encode().unwrap()).unwrap();
    let valid_len = log.size();
    drop(log);

    // Fewer than 4 bytes remain for the next length field.
    append_raw(&path, &[0x00, 0x01]);

    let mut log = LogFile::open(&path, true).unwrap();
    let (records, stats) = log.replay().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(stats.valid_len, valid_len);
    assert_eq!(stats.truncated_bytes, 2);
}

#[test]
fn test_replay_stops_at_torn_payload() {
    let (_temp, path) = setup_temp_log();
    let mut log = LogFile::open(&path, true).unwrap();
    log.append(&set_command("a", "1").encode().unwrap()).unwrap();
    let valid_len = log.size();
    drop(log);

    // Length field declares 100 bytes but only 3 follow.
    let mut torn = 100u32.to_be_bytes().to_vec();
    torn.extend_from_slice(b"par");
    append_raw(&path, &torn);

    let mut log = LogFile::open(&path, true).unwrap();
    let (records, stats) = log.replay().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(stats.valid_len, valid_len);
}

#[test]
fn test_append_resumes_from_last_valid_boundary() {
    let (_temp, path) = setup_temp_log();
    let mut log = LogFile::open(&path, true).unwrap();
    log.append(&set_command("a", "1").encode().unwrap()).unwrap();
    let valid_len = log.size();
    drop(log);

    append_raw(&path, &[0xde, 0xad, 0xbe]);

    let mut log = LogFile::open(&path, true).unwrap();
    log.replay().unwrap();
    assert_eq!(log.size(), valid_len);

    // The next append overwrites the torn tail.
    let pos = log.append(&set_command("b", "2").encode().unwrap()).unwrap();
    assert_eq!(pos.pos, valid_len + LEN_PREFIX_SIZE as u64);

    let (records, _) = log.replay().unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn test_scan_respects_limit() {
    let (_temp, path) = setup_temp_log();
    let mut log = LogFile::open(&path, true).unwrap();
    log.append(&set_command("a", "1").encode().unwrap()).unwrap();
    let cutoff = log.size();
    log.append(&set_command("b", "2").encode().unwrap()).unwrap();

    let (records, stats) = scan(&path, Some(cutoff)).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(stats.valid_len, cutoff);
}

// =============================================================================
// Engine-level Crash Tolerance
// =============================================================================

#[test]
fn test_engine_survives_torn_tail() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .compaction_threshold(10_000)
        .build();

    let log_path = {
        let engine = Engine::open(config.clone()).unwrap();
        engine.set("a", "1").unwrap();
        engine.set("b", "2").unwrap();
        engine.log_path()
    };

    // Simulate a crash mid-append.
    let mut torn = 64u32.to_be_bytes().to_vec();
    torn.extend_from_slice(b"{\"type\":\"set");
    append_raw(&log_path, &torn);

    let engine = Engine::open(config.clone()).unwrap();
    assert_eq!(engine.get("a").unwrap(), Some("1".to_string()));
    assert_eq!(engine.get("b").unwrap(), Some("2".to_string()));

    // New writes land at the valid boundary and survive another reopen.
    engine.set("c", "3").unwrap();
    drop(engine);

    let engine = Engine::open(config).unwrap();
    assert_eq!(engine.get("a").unwrap(), Some("1".to_string()));
    assert_eq!(engine.get("c").unwrap(), Some("3".to_string()));
}
