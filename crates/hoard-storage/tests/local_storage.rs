use hoard_storage::{generate_storage_key, LocalStorage, Storage, StorageBackend, StorageError};
use uuid::Uuid;

async fn storage(dir: &tempfile::TempDir) -> LocalStorage {
    LocalStorage::new(dir.path(), "http://localhost:3000/media/".to_string())
        .await
        .unwrap()
}

#[tokio::test]
async fn put_reports_stored_size_and_sniffed_type() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage(&dir).await;
    let key = generate_storage_key(Uuid::now_v7(), "report.txt");

    let mut pdf = b"%PDF-1.4\n".to_vec();
    pdf.extend_from_slice(&[0u8; 100]);
    let blob = storage
        .put(&key, pdf.clone(), "report.txt", Some("text/plain"))
        .await
        .unwrap();

    assert_eq!(blob.key, key);
    assert_eq!(blob.byte_size, pdf.len() as i64);
    assert_eq!(blob.content_type, "application/pdf");
    assert_eq!(blob.url, format!("http://localhost:3000/media/{}", key));
    assert_eq!(storage.content_length(&key).await.unwrap(), pdf.len() as u64);
    assert_eq!(storage.download(&key).await.unwrap(), pdf);
    assert_eq!(storage.backend_type(), StorageBackend::Local);
}

#[tokio::test]
async fn deleting_a_missing_blob_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage(&dir).await;
    let key = generate_storage_key(Uuid::now_v7(), "gone.bin");

    storage
        .upload_with_key(&key, vec![1, 2, 3], "application/octet-stream")
        .await
        .unwrap();
    assert!(storage.exists(&key).await.unwrap());

    storage.delete(&key).await.unwrap();
    assert!(!storage.exists(&key).await.unwrap());

    storage.delete(&key).await.unwrap();
    storage
        .delete(&generate_storage_key(Uuid::now_v7(), "never-written.bin"))
        .await
        .unwrap();
    assert!(matches!(
        storage.download(&key).await,
        Err(StorageError::NotFound(_))
    ));
}

#[tokio::test]
async fn same_filename_never_collides() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage(&dir).await;

    let first = generate_storage_key(Uuid::now_v7(), "photo.png");
    let second = generate_storage_key(Uuid::now_v7(), "photo.png");
    storage.upload_with_key(&first, b"one".to_vec(), "text/plain").await.unwrap();
    storage.upload_with_key(&second, b"two".to_vec(), "text/plain").await.unwrap();

    assert_eq!(storage.download(&first).await.unwrap(), b"one");
    assert_eq!(storage.download(&second).await.unwrap(), b"two");
}
