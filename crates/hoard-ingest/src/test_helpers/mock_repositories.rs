//! In-memory UploadRepository for testing

use async_trait::async_trait;
use chrono::Utc;
use hoard_core::models::{NewUpload, Provenance, UploadRecord};
use hoard_core::AppError;
use hoard_db::UploadRepository;
use hoard_storage::Storage;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Upload repository backed by a Vec, with hooks for simulating races.
pub struct MockUploadRepository {
    records: Mutex<Vec<UploadRecord>>,
    storage: Arc<dyn Storage>,
    fail_creates: AtomicBool,
    sum_calls: AtomicUsize,
    /// (sum call number, bytes) pairs: before answering that call, another
    /// writer commits `bytes` for the queried user.
    concurrent_writes: Mutex<Vec<(usize, i64)>>,
}

impl MockUploadRepository {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            storage,
            fail_creates: AtomicBool::new(false),
            sum_calls: AtomicUsize::new(0),
            concurrent_writes: Mutex::new(Vec::new()),
        }
    }

    /// Insert an existing upload without touching storage.
    pub fn seed(&self, user_id: Uuid, filename: &str, size: i64, provenance: Provenance) -> UploadRecord {
        let id = Uuid::now_v7();
        let now = Utc::now();
        let record = UploadRecord {
            id,
            user_id,
            storage_key: format!("media/{}/{}", id, filename),
            storage_url: format!("https://example.com/media/{}/{}", id, filename),
            file_size: size,
            content_type: "application/octet-stream".to_string(),
            original_filename: filename.to_string(),
            provenance,
            original_url: None,
            created_at: now,
            updated_at: now,
        };
        self.records.lock().unwrap().push(record.clone());
        record
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Simulate a concurrent batch committing `bytes` right before the
    /// `call`-th usage read (1-based).
    pub fn commit_concurrently_before_sum(&self, call: usize, bytes: i64) {
        self.concurrent_writes.lock().unwrap().push((call, bytes));
    }

    pub fn sum_calls(&self) -> usize {
        self.sum_calls.load(Ordering::SeqCst)
    }

    pub fn records_for(&self, user_id: Uuid) -> Vec<UploadRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl UploadRepository for MockUploadRepository {
    async fn create(&self, upload: NewUpload) -> Result<UploadRecord, AppError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(AppError::Internal(
                "simulated constraint violation on uploads_pkey".to_string(),
            ));
        }
        let now = Utc::now();
        let record = UploadRecord {
            id: upload.id,
            user_id: upload.user_id,
            storage_key: upload.blob.key,
            storage_url: upload.blob.url,
            file_size: upload.blob.byte_size,
            content_type: upload.blob.content_type,
            original_filename: upload.original_filename,
            provenance: upload.provenance,
            original_url: upload.original_url,
            created_at: now,
            updated_at: now,
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn find(&self, user_id: Uuid, id: Uuid) -> Result<Option<UploadRecord>, AppError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.user_id == user_id && r.id == id)
            .cloned())
    }

    async fn list_recent(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UploadRecord>, AppError> {
        let mut records = self.records_for(user_id);
        records.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(records
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn destroy(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let record = match self.find(user_id, id).await? {
            Some(record) => record,
            None => return Ok(false),
        };

        self.storage
            .delete(&record.storage_key)
            .await
            .map_err(|e| AppError::Storage(format!("Storage delete failed: {}", e)))?;

        self.records.lock().unwrap().retain(|r| r.id != id);
        Ok(true)
    }

    async fn rename(
        &self,
        user_id: Uuid,
        id: Uuid,
        filename: &str,
    ) -> Result<UploadRecord, AppError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.user_id == user_id && r.id == id)
            .ok_or_else(|| AppError::NotFound("Upload not found".to_string()))?;
        record.original_filename = filename.to_string();
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn sum_storage_bytes(&self, user_id: Uuid) -> Result<i64, AppError> {
        let call = self.sum_calls.fetch_add(1, Ordering::SeqCst) + 1;

        let pending: Vec<i64> = {
            let mut writes = self.concurrent_writes.lock().unwrap();
            let due = writes
                .iter()
                .filter(|(at, _)| *at == call)
                .map(|(_, bytes)| *bytes)
                .collect();
            writes.retain(|(at, _)| *at != call);
            due
        };
        for bytes in pending {
            self.seed(user_id, "concurrent.bin", bytes, Provenance::Api);
        }

        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.file_size)
            .sum())
    }
}
