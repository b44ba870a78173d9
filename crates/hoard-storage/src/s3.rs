use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::{
    Attribute, AttributeValue, Attributes, Error as ObjectStoreError, ObjectStoreExt, PutOptions,
    PutPayload,
};
use std::time::Instant;

/// Blobs in an S3 bucket, or any S3-compatible service reachable at `endpoint_url`.
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
}

impl S3Storage {
    /// Credentials come from the usual `AWS_*` environment variables.
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(endpoint) = endpoint_url.as_deref() {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        tracing::info!(
            bucket = %bucket,
            region = %region,
            endpoint = endpoint_url.as_deref().unwrap_or("aws"),
            "S3 storage configured"
        );

        Ok(Self {
            store,
            bucket,
            region,
            endpoint_url,
        })
    }

    /// Path-style URL for custom endpoints, virtual-hosted style for AWS.
    fn object_url(&self, key: &str) -> String {
        match self.endpoint_url.as_deref() {
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
        }
    }

    /// Map an object store failure, logging anything but a missing object.
    fn classify(
        &self,
        operation: &'static str,
        key: &str,
        started: Instant,
        err: ObjectStoreError,
    ) -> StorageError {
        if let ObjectStoreError::NotFound { .. } = err {
            return StorageError::NotFound(key.to_string());
        }

        tracing::error!(
            error = %err,
            bucket = %self.bucket,
            key = %key,
            operation,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "S3 request failed"
        );

        let message = err.to_string();
        match operation {
            "put" => StorageError::UploadFailed(message),
            "get" => StorageError::DownloadFailed(message),
            "delete" => StorageError::DeleteFailed(message),
            _ => StorageError::BackendError(message),
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<String> {
        let started = Instant::now();
        let size_bytes = data.len();
        let location = Path::from(storage_key);

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
        let options = PutOptions {
            attributes,
            ..PutOptions::default()
        };

        let payload = PutPayload::from(Bytes::from(data));
        object_store::ObjectStore::put_opts(&self.store, &location, payload, options)
            .await
            .map_err(|e| self.classify("put", storage_key, started, e))?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes,
            content_type = %content_type,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(self.object_url(storage_key))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let started = Instant::now();
        let location = Path::from(storage_key);

        let object = self
            .store
            .get(&location)
            .await
            .map_err(|e| self.classify("get", storage_key, started, e))?;
        let bytes = object
            .bytes()
            .await
            .map_err(|e| self.classify("get", storage_key, started, e))?;

        Ok(bytes.to_vec())
    }

    /// S3 answers a DELETE of a missing key with success, so no HEAD is needed.
    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let started = Instant::now();
        let location = Path::from(storage_key);

        match self.store.delete(&location).await {
            Ok(()) => {}
            Err(ObjectStoreError::NotFound { .. }) => {
                tracing::info!(
                    bucket = %self.bucket,
                    key = %storage_key,
                    "S3 delete: already absent"
                );
                return Ok(());
            }
            Err(e) => return Err(self.classify("delete", storage_key, started, e)),
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let started = Instant::now();
        match self.store.head(&Path::from(storage_key)).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(self.classify("head", storage_key, started, e)),
        }
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64> {
        let started = Instant::now();
        self.store
            .head(&Path::from(storage_key))
            .await
            .map(|meta| meta.size)
            .map_err(|e| self.classify("head", storage_key, started, e))
    }

    fn public_url(&self, storage_key: &str) -> String {
        self.object_url(storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
