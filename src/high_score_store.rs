use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::DEFAULT_BEST_TIME_SEC;
use crate::error::StoreError;

/// Best result for one level. Higher score wins; equal scores go to the
/// shorter time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BestRecord {
    pub score: u32,
    #[serde(rename = "timeSec", alias = "time_sec")]
    pub time_sec: f32,
}

impl Default for BestRecord {
    fn default() -> Self {
        Self {
            score: 0,
            time_sec: DEFAULT_BEST_TIME_SEC,
        }
    }
}

impl BestRecord {
    pub fn is_better_than(&self, previous: &BestRecord) -> bool {
        self.score > previous.score
            || (self.score == previous.score && self.time_sec < previous.time_sec)
    }
}

pub trait HighScoreStore {
    fn get_best(&self, level_id: u32) -> Option<BestRecord>;
    fn set_best(&mut self, level_id: u32, record: BestRecord) -> Result<(), StoreError>;
}

/// Writes `record` when it beats the stored best (or the floor of score 0 /
/// 99999 s). Returns whether it was written.
pub fn submit_result(
    store: &mut dyn HighScoreStore,
    level_id: u32,
    record: BestRecord,
) -> Result<bool, StoreError> {
    let previous = store.get_best(level_id).unwrap_or_default();
    if !record.is_better_than(&previous) {
        return Ok(false);
    }
    store.set_best(level_id, record)?;
    Ok(true)
}

#[derive(Clone, Debug, Default)]
pub struct MemoryHighScoreStore {
    records: HashMap<u32, BestRecord>,
}

impl MemoryHighScoreStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HighScoreStore for MemoryHighScoreStore {
    fn get_best(&self, level_id: u32) -> Option<BestRecord> {
        self.records.get(&level_id).copied()
    }

    fn set_best(&mut self, level_id: u32, record: BestRecord) -> Result<(), StoreError> {
        self.records.insert(level_id, record);
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredBest {
    score: u32,
    #[serde(rename = "timeSec", alias = "time_sec")]
    time_sec: f32,
    #[serde(rename = "updatedAtMs", alias = "updated_at_ms")]
    updated_at_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct HighScoreFile {
    version: u8,
    levels: HashMap<String, StoredBest>,
}

#[derive(Clone, Debug, Deserialize)]
struct HighScoreFileRaw {
    version: u8,
    levels: HashMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, Serialize)]
pub struct HighScoreEntry {
    #[serde(rename = "levelId")]
    pub level_id: u32,
    pub score: u32,
    #[serde(rename = "timeSec")]
    pub time_sec: f32,
    #[serde(rename = "updatedAtMs")]
    pub updated_at_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct HighScoreResponse {
    #[serde(rename = "generatedAtIso")]
    pub generated_at_iso: String,
    pub entries: Vec<HighScoreEntry>,
}

/// JSON file keyed by `Level{n}`, rewritten on every new best.
pub struct FileHighScoreStore {
    file_path: PathBuf,
    levels: HashMap<u32, StoredBest>,
}

impl FileHighScoreStore {
    pub fn new(file_path: PathBuf) -> Self {
        let levels = load_levels(&file_path);
        Self { file_path, levels }
    }

    pub fn build_response(&self, level_id: Option<u32>) -> HighScoreResponse {
        let mut entries: Vec<HighScoreEntry> = self
            .levels
            .iter()
            .filter(|(id, _)| level_id.map(|wanted| wanted == **id).unwrap_or(true))
            .map(|(id, stored)| HighScoreEntry {
                level_id: *id,
                score: stored.score,
                time_sec: stored.time_sec,
                updated_at_ms: stored.updated_at_ms,
            })
            .collect();
        entries.sort_by_key(|entry| entry.level_id);
        HighScoreResponse {
            generated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            entries,
        }
    }

    fn record(&mut self, level_id: u32, record: BestRecord) {
        self.levels.insert(
            level_id,
            StoredBest {
                score: record.score,
                time_sec: record.time_sec,
                updated_at_ms: now_ms(),
            },
        );
    }

    fn payload(&self) -> HighScoreFile {
        HighScoreFile {
            version: 1,
            levels: self
                .levels
                .iter()
                .map(|(id, stored)| (level_key(*id), stored.clone()))
                .collect(),
        }
    }

    fn save(&self) -> Result<(), StoreError> {
        write_file(&self.file_path, &self.payload())
    }
}

fn write_file(path: &Path, payload: &HighScoreFile) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(payload)?;
    fs::write(path, text)?;
    Ok(())
}

impl HighScoreStore for FileHighScoreStore {
    fn get_best(&self, level_id: u32) -> Option<BestRecord> {
        self.levels.get(&level_id).map(|stored| BestRecord {
            score: stored.score,
            time_sec: stored.time_sec,
        })
    }

    fn set_best(&mut self, level_id: u32, record: BestRecord) -> Result<(), StoreError> {
        self.record(level_id, record);
        self.save()
    }
}

/// Cloneable handle so every session writes into one file.
///
/// A deferred handle only updates memory on `set_best`; the file is written
/// by [`SharedHighScoreStore::flush_pending`], which callers run off the
/// game loop.
#[derive(Clone)]
pub struct SharedHighScoreStore {
    inner: Arc<Mutex<FileHighScoreStore>>,
    deferred: bool,
    dirty: Arc<AtomicBool>,
}

impl SharedHighScoreStore {
    pub fn new(store: FileHighScoreStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
            deferred: false,
            dirty: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn deferred(store: FileHighScoreStore) -> Self {
        Self {
            deferred: true,
            ..Self::new(store)
        }
    }

    /// Writes the file if a deferred `set_best` happened since the last
    /// flush. Returns whether anything was written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be written. The pending
    /// change stays queued for the next call.
    pub fn flush_pending(&self) -> Result<bool, StoreError> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(false);
        }
        let (path, payload) = {
            let store = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
            (store.file_path.clone(), store.payload())
        };
        if let Err(error) = write_file(&path, &payload) {
            self.dirty.store(true, Ordering::Release);
            return Err(error);
        }
        Ok(true)
    }

    pub fn build_response(&self, level_id: Option<u32>) -> Result<HighScoreResponse, StoreError> {
        let store = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(store.build_response(level_id))
    }
}

impl HighScoreStore for SharedHighScoreStore {
    fn get_best(&self, level_id: u32) -> Option<BestRecord> {
        self.inner.lock().ok()?.get_best(level_id)
    }

    fn set_best(&mut self, level_id: u32, record: BestRecord) -> Result<(), StoreError> {
        let mut store = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        if !self.deferred {
            return store.set_best(level_id, record);
        }
        store.record(level_id, record);
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }
}

fn level_key(level_id: u32) -> String {
    format!("Level{level_id}")
}

fn parse_level_key(key: &str) -> Option<u32> {
    key.trim()
        .strip_prefix("Level")
        .and_then(|suffix| suffix.parse::<u32>().ok())
}

fn load_levels(path: &Path) -> HashMap<u32, StoredBest> {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), %error, "failed to read high score file");
            }
            return HashMap::new();
        }
    };
    let parsed = match serde_json::from_str::<HighScoreFileRaw>(&text) {
        Ok(value) if value.version == 1 => value,
        Ok(value) => {
            warn!(
                path = %path.display(),
                version = value.version,
                "unsupported high score file version"
            );
            return HashMap::new();
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "failed to parse high score file");
            return HashMap::new();
        }
    };

    let mut levels = HashMap::new();
    for (key, raw_value) in parsed.levels {
        let Some(level_id) = parse_level_key(&key) else {
            warn!(path = %path.display(), key = %key, "skipping unknown level key");
            continue;
        };
        let stored: StoredBest = match serde_json::from_value(raw_value) {
            Ok(entry) => entry,
            Err(error) => {
                warn!(path = %path.display(), key = %key, %error, "skipping malformed level entry");
                continue;
            }
        };
        if !stored.time_sec.is_finite() || stored.time_sec < 0.0 {
            continue;
        }
        levels.insert(level_id, stored);
    }
    levels
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        let unique = format!(
            "{}-{}-{}",
            name,
            std::process::id(),
            now_ms().saturating_add(rand::random::<u32>() as u64)
        );
        std::env::temp_dir().join(unique).join("high-scores.json")
    }

    fn record(score: u32, time_sec: f32) -> BestRecord {
        BestRecord { score, time_sec }
    }

    #[test]
    fn better_means_higher_score_then_shorter_time() {
        assert!(record(1200, 90.0).is_better_than(&record(1000, 10.0)));
        assert!(record(1000, 50.0).is_better_than(&record(1000, 60.0)));
        assert!(!record(1000, 60.0).is_better_than(&record(1000, 60.0)));
        assert!(!record(900, 1.0).is_better_than(&record(1000, 60.0)));
        assert!(record(0, 10.0).is_better_than(&BestRecord::default()));
    }

    #[test]
    fn submit_result_only_writes_improvements() {
        let mut store = MemoryHighScoreStore::new();
        store.set_best(1, record(1000, 60.0)).expect("seed");

        assert!(submit_result(&mut store, 1, record(1200, 90.0)).expect("submit"));
        assert_eq!(store.get_best(1), Some(record(1200, 90.0)));

        assert!(!submit_result(&mut store, 1, record(1200, 95.0)).expect("submit"));
        assert_eq!(store.get_best(1), Some(record(1200, 90.0)));

        assert!(submit_result(&mut store, 2, record(0, 30.0)).expect("submit"));
    }

    #[test]
    fn file_store_persists_and_reloads() {
        let path = temp_file("high-score-store-roundtrip");
        let mut store = FileHighScoreStore::new(path.clone());
        assert_eq!(store.get_best(3), None);
        store.set_best(3, record(4200, 123.5)).expect("save");

        let reloaded = FileHighScoreStore::new(path.clone());
        assert_eq!(reloaded.get_best(3), Some(record(4200, 123.5)));
        let response = reloaded.build_response(Some(3));
        assert_eq!(response.entries.len(), 1);
        assert_eq!(response.entries[0].score, 4200);
        assert!(reloaded.build_response(Some(7)).entries.is_empty());

        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.contains("\"Level3\""));

        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn load_skips_malformed_entries() {
        let path = temp_file("high-score-store-partial");
        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        let raw = r#"{
  "version": 1,
  "levels": {
    "Level1": { "score": 900, "timeSec": 61.5, "updatedAtMs": 10 },
    "Level2": { "score": -5 },
    "Bonus": { "score": 1, "timeSec": 1.0, "updatedAtMs": 1 }
  }
}"#;
        fs::write(&path, raw).expect("write file");

        let store = FileHighScoreStore::new(path.clone());
        assert_eq!(store.get_best(1), Some(record(900, 61.5)));
        assert_eq!(store.get_best(2), None);
        assert_eq!(store.build_response(None).entries.len(), 1);

        let _ = fs::remove_dir_all(&parent);
    }

    #[test]
    fn unsupported_version_starts_empty() {
        let path = temp_file("high-score-store-version");
        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        fs::write(&path, r#"{"version": 9, "levels": {}}"#).expect("write file");

        let store = FileHighScoreStore::new(path);
        assert!(store.build_response(None).entries.is_empty());

        let _ = fs::remove_dir_all(&parent);
    }

    #[test]
    fn shared_store_writes_through_to_file() {
        let path = temp_file("high-score-store-shared");
        let shared = SharedHighScoreStore::new(FileHighScoreStore::new(path.clone()));
        let mut handle = shared.clone();
        assert!(submit_result(&mut handle, 1, record(50, 12.0)).expect("submit"));
        assert_eq!(shared.get_best(1), Some(record(50, 12.0)));
        assert_eq!(FileHighScoreStore::new(path.clone()).get_best(1), Some(record(50, 12.0)));

        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn deferred_store_writes_only_on_flush() {
        let path = temp_file("high-score-store-deferred");
        let shared = SharedHighScoreStore::deferred(FileHighScoreStore::new(path.clone()));
        assert!(!shared.flush_pending().expect("flush"));

        let mut handle = shared.clone();
        assert!(submit_result(&mut handle, 2, record(700, 40.0)).expect("submit"));
        assert_eq!(shared.get_best(2), Some(record(700, 40.0)));
        assert!(!path.exists());

        assert!(shared.flush_pending().expect("flush"));
        assert_eq!(FileHighScoreStore::new(path.clone()).get_best(2), Some(record(700, 40.0)));
        assert!(!shared.flush_pending().expect("flush"));

        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir_all(parent);
        }
    }
}
