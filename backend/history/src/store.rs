//! NDJSON-backed history store.
//!
//! Ids are assigned sequentially from the highest id on disk. Lines that do
//! not decode are skipped on read. Deleting rewrites the file through a
//! sibling temp file and a rename, which drops undecodable lines.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use quill_core::{CorrectionResult, QuillError, RecordSink, SourceType};

use crate::types::{HistoryFilter, HistoryRecord};

pub struct HistoryStore {
    path: PathBuf,
    /// Next id to hand out; the lock also serializes appends.
    next_id: Mutex<u64>,
}

impl HistoryStore {
    /// Open (or prepare to create) the history file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, QuillError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                QuillError::StorageError(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let records = read_records(&path).await?;
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        info!(path = %path.display(), records = records.len(), "History store opened");

        Ok(Self {
            path,
            next_id: Mutex::new(next_id),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and return it with its assigned id.
    pub async fn append(
        &self,
        content: &str,
        result: &CorrectionResult,
        source_type: SourceType,
        created_at: DateTime<Local>,
    ) -> Result<HistoryRecord, QuillError> {
        let mut next_id = self.next_id.lock().await;
        let record = HistoryRecord {
            id: *next_id,
            content: content.to_string(),
            result: result.clone(),
            source_type,
            created_at,
        };

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| storage_error(&self.path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| storage_error(&self.path, e))?;
        file.sync_all().await.map_err(|e| storage_error(&self.path, e))?;

        *next_id += 1;
        debug!(id = record.id, %source_type, "Appended history record");
        Ok(record)
    }

    /// Records in the window, newest first.
    pub async fn list(&self, filter: HistoryFilter) -> Result<Vec<HistoryRecord>, QuillError> {
        let now = Local::now();
        let mut records: Vec<HistoryRecord> = read_records(&self.path)
            .await?
            .into_iter()
            .filter(|r| filter.admits(r.created_at, now))
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    pub async fn get(&self, id: u64) -> Result<Option<HistoryRecord>, QuillError> {
        Ok(read_records(&self.path)
            .await?
            .into_iter()
            .find(|r| r.id == id))
    }

    /// Remove one record. Returns `false` if no record has that id.
    pub async fn delete(&self, id: u64) -> Result<bool, QuillError> {
        let _guard = self.next_id.lock().await;
        let records = read_records(&self.path).await?;
        let before = records.len();
        let kept: Vec<HistoryRecord> = records.into_iter().filter(|r| r.id != id).collect();
        if kept.len() == before {
            return Ok(false);
        }

        self.rewrite(&kept).await?;
        info!(id, "Deleted history record");
        Ok(true)
    }

    /// Remove every record. Ids handed out later keep counting up.
    pub async fn clear(&self) -> Result<(), QuillError> {
        let _guard = self.next_id.lock().await;
        self.rewrite(&[]).await?;
        info!(path = %self.path.display(), "Cleared history");
        Ok(())
    }

    /// Replace the file contents with `records`. Callers hold the id lock.
    async fn rewrite(&self, records: &[HistoryRecord]) -> Result<(), QuillError> {
        let mut body = String::new();
        for record in records {
            body.push_str(&serde_json::to_string(record)?);
            body.push('\n');
        }

        let tmp = temp_path(&self.path);
        let mut file = fs::File::create(&tmp)
            .await
            .map_err(|e| storage_error(&tmp, e))?;
        file.write_all(body.as_bytes())
            .await
            .map_err(|e| storage_error(&tmp, e))?;
        file.sync_all().await.map_err(|e| storage_error(&tmp, e))?;
        drop(file);

        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| storage_error(&self.path, e))?;
        debug!(records = records.len(), "Rewrote history file");
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl RecordSink for HistoryStore {
    async fn append(
        &self,
        content: &str,
        result: &CorrectionResult,
        source_type: SourceType,
        timestamp: DateTime<Local>,
    ) -> Result<u64, QuillError> {
        HistoryStore::append(self, content, result, source_type, timestamp)
            .await
            .map(|record| record.id)
    }
}

fn storage_error(path: &Path, e: std::io::Error) -> QuillError {
    QuillError::StorageError(format!("{}: {e}", path.display()))
}

/// Every decodable record in file order. A missing file is an empty history.
async fn read_records(path: &Path) -> Result<Vec<HistoryRecord>, QuillError> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(storage_error(path, e)),
    };

    let mut records = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<HistoryRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(line = index + 1, error = %e, "Skipping malformed history line"),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn scratch_file() -> PathBuf {
        std::env::temp_dir()
            .join(format!("quill-history-{}", uuid::Uuid::new_v4()))
            .join("history.ndjson")
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[tokio::test]
    async fn appends_and_reads_back() {
        let path = scratch_file();
        let store = HistoryStore::open(&path).await.unwrap();
        let result = CorrectionResult::safe_default();

        let first = store
            .append("essay one", &result, SourceType::Text, Local::now())
            .await
            .unwrap();
        let second = store
            .append("essay two", &result, SourceType::Image, Local::now())
            .await
            .unwrap();

        assert_eq!((first.id, second.id), (1, 2));
        let fetched = store.get(2).await.unwrap().unwrap();
        assert_eq!(fetched.content, "essay two");
        assert_eq!(fetched.source_type, SourceType::Image);
        assert_eq!(fetched.result, result);
        assert!(store.get(3).await.unwrap().is_none());
        cleanup(&path);
    }

    #[tokio::test]
    async fn ids_continue_after_reopen_and_bad_lines_are_skipped() {
        let path = scratch_file();
        {
            let store = HistoryStore::open(&path).await.unwrap();
            store
                .append("a", &CorrectionResult::safe_default(), SourceType::Word, Local::now())
                .await
                .unwrap();
        }
        let mut raw = std::fs::read_to_string(&path).unwrap();
        raw.push_str("{not json\n\n");
        std::fs::write(&path, raw).unwrap();

        let store = HistoryStore::open(&path).await.unwrap();
        let record = store
            .append("b", &CorrectionResult::safe_default(), SourceType::Text, Local::now())
            .await
            .unwrap();

        assert_eq!(record.id, 2);
        assert_eq!(store.list(HistoryFilter::All).await.unwrap().len(), 2);
        cleanup(&path);
    }

    #[tokio::test]
    async fn list_filters_and_sorts_newest_first() {
        let path = scratch_file();
        let store = HistoryStore::open(&path).await.unwrap();
        let result = CorrectionResult::safe_default();
        let now = Local::now();

        for (content, age) in [("old", 10), ("recent", 2), ("fresh", 0)] {
            store
                .append(content, &result, SourceType::Text, now - Duration::days(age))
                .await
                .unwrap();
        }

        let names = |records: Vec<HistoryRecord>| -> Vec<String> {
            records.into_iter().map(|r| r.content).collect()
        };
        assert_eq!(
            names(store.list(HistoryFilter::All).await.unwrap()),
            vec!["fresh", "recent", "old"]
        );
        assert_eq!(
            names(store.list(HistoryFilter::ThreeDays).await.unwrap()),
            vec!["fresh", "recent"]
        );
        assert_eq!(names(store.list(HistoryFilter::Today).await.unwrap()), vec!["fresh"]);
        cleanup(&path);
    }

    #[tokio::test]
    async fn usable_as_record_sink() {
        let path = scratch_file();
        let store = HistoryStore::open(&path).await.unwrap();
        let sink: &dyn RecordSink = &store;
        let id = sink
            .append("via sink", &CorrectionResult::safe_default(), SourceType::Text, Local::now())
            .await
            .unwrap();
        assert_eq!(id, 1);
        cleanup(&path);
    }

    #[tokio::test]
    async fn delete_removes_one_record() {
        let path = scratch_file();
        let store = HistoryStore::open(&path).await.unwrap();
        let result = CorrectionResult::safe_default();
        for content in ["a", "b", "c"] {
            store
                .append(content, &result, SourceType::Text, Local::now())
                .await
                .unwrap();
        }

        assert!(store.delete(2).await.unwrap());
        assert!(!store.delete(2).await.unwrap());
        assert!(!store.delete(42).await.unwrap());

        assert!(store.get(2).await.unwrap().is_none());
        let ids: Vec<u64> = store
            .list(HistoryFilter::All)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![3, 1]);
        assert!(!temp_path(&path).exists());
        cleanup(&path);
    }

    #[tokio::test]
    async fn ids_keep_counting_after_delete_and_clear() {
        let path = scratch_file();
        let store = HistoryStore::open(&path).await.unwrap();
        let result = CorrectionResult::safe_default();
        for content in ["a", "b"] {
            store
                .append(content, &result, SourceType::Text, Local::now())
                .await
                .unwrap();
        }

        assert!(store.delete(2).await.unwrap());
        let third = store
            .append("c", &result, SourceType::Text, Local::now())
            .await
            .unwrap();
        assert_eq!(third.id, 3);

        store.clear().await.unwrap();
        assert!(store.list(HistoryFilter::All).await.unwrap().is_empty());
        let fourth = store
            .append("d", &result, SourceType::Word, Local::now())
            .await
            .unwrap();
        assert_eq!(fourth.id, 4);
        assert_eq!(store.list(HistoryFilter::All).await.unwrap().len(), 1);
        cleanup(&path);
    }

    #[tokio::test]
    async fn clear_on_missing_file_leaves_empty_history() {
        let path = scratch_file();
        let store = HistoryStore::open(&path).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.list(HistoryFilter::All).await.unwrap().is_empty());
        cleanup(&path);
    }

    #[tokio::test]
    async fn missing_file_is_empty_history() {
        let path = scratch_file();
        let store = HistoryStore::open(&path).await.unwrap();
        assert!(store.list(HistoryFilter::All).await.unwrap().is_empty());
        cleanup(&path);
    }
}
