//! Copy, move, rename and delete across albums, gallery and trash,
//! driven through the public `Vault` facade against an in-memory
//! remote double.

mod common;

use std::sync::Arc;

use tempfile::tempdir;

use common::{test_config, FixedThumbnail, MockRemote};
use vault::{GlobOptions, Vault};

async fn signed_in_vault(dir: &std::path::Path, remote: Arc<MockRemote>) -> Vault {
    let vault = Vault::open(test_config(dir), remote).await.unwrap();
    vault.create_account("bob@example.com", "swordfish").await.unwrap();
    vault
}

fn paths(entries: &[vault_model::GlobEntry]) -> Vec<String> {
    let mut out: Vec<String> = entries.iter().map(|e| e.path.clone()).collect();
    out.sort();
    out
}

#[tokio::test]
async fn copy_into_album_keeps_gallery_original() {
    let dir = tempdir().unwrap();
    let remote = Arc::new(MockRemote::new());
    let vault = signed_in_vault(dir.path(), Arc::clone(&remote)).await;

    vault.add_albums(&["Trip".to_string()]).await.unwrap();

    let source_dir = tempdir().unwrap();
    let path = source_dir.path().join("sunset.jpg");
    std::fs::write(&path, b"sunset bytes").unwrap();
    vault.import(&path, "gallery", &FixedThumbnail::default()).await.unwrap();

    vault.copy("gallery/sunset.jpg", "Trip", None).await.unwrap();

    let gallery = vault.list_files("gallery/*", &GlobOptions::default()).await.unwrap();
    assert_eq!(paths(&gallery), vec!["gallery/sunset.jpg".to_string()]);

    let trip = vault.list_files("Trip/*", &GlobOptions::default()).await.unwrap();
    assert_eq!(paths(&trip), vec!["Trip/sunset.jpg".to_string()]);

    let mut out = Vec::new();
    vault.cat("Trip/sunset.jpg", &mut out).await.unwrap();
    assert_eq!(out, b"sunset bytes");
}

#[tokio::test]
async fn move_between_albums_removes_source() {
    let dir = tempdir().unwrap();
    let remote = Arc::new(MockRemote::new());
    let vault = signed_in_vault(dir.path(), Arc::clone(&remote)).await;

    vault.add_albums(&["A".to_string(), "B".to_string()]).await.unwrap();

    let source_dir = tempdir().unwrap();
    let path = source_dir.path().join("doc.jpg");
    std::fs::write(&path, b"doc bytes").unwrap();
    vault.import(&path, "A", &FixedThumbnail::default()).await.unwrap();

    vault.move_file("A/doc.jpg", "B", None).await.unwrap();

    let a_listing = vault.list_files("A/*", &GlobOptions::default()).await.unwrap();
    assert!(a_listing.is_empty());

    let b_listing = vault.list_files("B/*", &GlobOptions::default()).await.unwrap();
    assert_eq!(paths(&b_listing), vec!["B/doc.jpg".to_string()]);
}

#[tokio::test]
async fn rename_in_place_changes_path_not_location() {
    let dir = tempdir().unwrap();
    let remote = Arc::new(MockRemote::new());
    let vault = signed_in_vault(dir.path(), Arc::clone(&remote)).await;

    let source_dir = tempdir().unwrap();
    let path = source_dir.path().join("old.jpg");
    std::fs::write(&path, b"rename me").unwrap();
    vault.import(&path, "gallery", &FixedThumbnail::default()).await.unwrap();

    vault.move_file("gallery/old.jpg", "gallery", Some("new.jpg")).await.unwrap();

    let listing = vault.list_files("gallery/*", &GlobOptions::default()).await.unwrap();
    assert_eq!(paths(&listing), vec!["gallery/new.jpg".to_string()]);

    let mut out = Vec::new();
    vault.cat("gallery/new.jpg", &mut out).await.unwrap();
    assert_eq!(out, b"rename me");
}

#[tokio::test]
async fn delete_moves_to_trash_then_removes_outright() {
    let dir = tempdir().unwrap();
    let remote = Arc::new(MockRemote::new());
    let vault = signed_in_vault(dir.path(), Arc::clone(&remote)).await;

    let source_dir = tempdir().unwrap();
    let path = source_dir.path().join("junk.jpg");
    std::fs::write(&path, b"throwaway").unwrap();
    vault.import(&path, "gallery", &FixedThumbnail::default()).await.unwrap();

    vault.delete("gallery/junk.jpg").await.unwrap();

    let gallery = vault.list_files("gallery/*", &GlobOptions::default()).await.unwrap();
    assert!(gallery.is_empty());

    let trash = vault.list_files(".trash/*", &GlobOptions::default()).await.unwrap();
    assert_eq!(paths(&trash), vec![".trash/junk.jpg".to_string()]);

    vault.delete(".trash/junk.jpg").await.unwrap();

    let trash_after = vault.list_files(".trash/*", &GlobOptions::default()).await.unwrap();
    assert!(trash_after.is_empty());
}

#[tokio::test]
async fn rename_album_and_remove_empty_album() {
    let dir = tempdir().unwrap();
    let remote = Arc::new(MockRemote::new());
    let vault = signed_in_vault(dir.path(), Arc::clone(&remote)).await;

    let created = vault.add_albums(&["Before".to_string()]).await.unwrap();
    let album_id = created[0].album_id.clone();

    vault.rename_album(&album_id, "After").await.unwrap();
    let listing = vault.list_files("After/*", &GlobOptions::default()).await.unwrap();
    assert!(listing.is_empty());

    vault.remove_albums(&[album_id]).await.unwrap();
    let root = vault.list_files("*", &GlobOptions::default()).await.unwrap();
    assert!(!paths(&root).iter().any(|p| p == "After"));
}
