//! End-to-end: create an account, import files, push them to the
//! remote, free the local blobs, then pull them back.

mod common;

use std::io::Cursor;
use std::sync::Arc;

use tempfile::tempdir;

use common::{test_config, FixedThumbnail, MockRemote};
use vault::{GlobOptions, Vault};

async fn signed_in_vault(dir: &std::path::Path, remote: Arc<MockRemote>) -> Vault {
    let vault = Vault::open(test_config(dir), remote).await.unwrap();
    vault.create_account("alice@example.com", "hunter2").await.unwrap();
    vault
}

#[tokio::test]
async fn import_push_free_then_pull_restores_blobs() {
    let dir = tempdir().unwrap();
    let remote = Arc::new(MockRemote::new());
    let vault = signed_in_vault(dir.path(), Arc::clone(&remote)).await;

    let mut imported = Vec::new();
    let source_dir = tempdir().unwrap();
    for i in 0..3 {
        let path = source_dir.path().join(format!("photo-{i}.jpg"));
        std::fs::write(&path, format!("photo bytes {i}").repeat(64)).unwrap();
        let entry = vault.import(&path, "gallery", &FixedThumbnail::default()).await.unwrap();
        imported.push(entry.file);
    }

    let listed = vault.list_files("gallery/*", &GlobOptions::default()).await.unwrap();
    assert_eq!(listed.len(), 3);

    let report = vault.push(false).await.unwrap();
    assert_eq!(report.succeeded, 3);

    for id in &imported {
        assert!(dir.path().join("blobs").join(id).exists());
    }

    vault.free(&imported).await.unwrap();
    for id in &imported {
        assert!(!dir.path().join("blobs").join(id).exists());
    }

    let downloaded = vault.pull("gallery/*", &GlobOptions::default()).await.unwrap();
    assert_eq!(downloaded, 3);
    for id in &imported {
        assert!(dir.path().join("blobs").join(id).exists());
    }

    let mut out = Cursor::new(Vec::new());
    let path = listed[0].path.clone();
    vault.cat(&path, &mut out).await.unwrap();
    assert!(!out.into_inner().is_empty());
}

#[tokio::test]
async fn sync_reports_unreferenced_files_as_empty_with_single_device() {
    let dir = tempdir().unwrap();
    let remote = Arc::new(MockRemote::new());
    let vault = signed_in_vault(dir.path(), Arc::clone(&remote)).await;

    let source_dir = tempdir().unwrap();
    let path = source_dir.path().join("a.jpg");
    std::fs::write(&path, b"hello vault").unwrap();
    vault.import(&path, "gallery", &FixedThumbnail::default()).await.unwrap();

    let (report, unreferenced) = vault.sync().await.unwrap();
    assert_eq!(report.succeeded, 1);
    assert!(unreferenced.is_empty());
}

#[tokio::test]
async fn second_device_pulls_albums_and_files_after_sync() {
    let remote = Arc::new(MockRemote::new());

    let dir_a = tempdir().unwrap();
    let vault_a = signed_in_vault(dir_a.path(), Arc::clone(&remote)).await;
    vault_a.add_albums(&["Trip".to_string()]).await.unwrap();
    vault_a.sync().await.unwrap();

    let source_dir = tempdir().unwrap();
    let path = source_dir.path().join("b.jpg");
    std::fs::write(&path, b"second device payload").unwrap();
    vault_a.import(&path, "Trip", &FixedThumbnail::default()).await.unwrap();
    vault_a.sync().await.unwrap();

    let dir_b = tempdir().unwrap();
    let vault_b = Vault::open(test_config(dir_b.path()), Arc::clone(&remote)).await.unwrap();
    vault_b.login("alice@example.com", "hunter2").await.unwrap();
    vault_b.get_updates().await.unwrap();

    let listed = vault_b.list_files("Trip/*", &GlobOptions::default()).await.unwrap();
    assert_eq!(listed.len(), 1);

    let downloaded = vault_b.pull("Trip/*", &GlobOptions::default()).await.unwrap();
    assert_eq!(downloaded, 1);
}
