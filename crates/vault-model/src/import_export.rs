//! Import and export/cat: walking the local filesystem to
//! bring files into a file set, and streaming a file's blob back out to a
//! destination or stdout. Thumbnail generation and video-duration
//! extraction are external-tool concerns (Non-goals) — this
//! module only defines the [`ThumbnailSource`] seam a caller plugs a real
//! tool into; everything downstream (blob encryption, header sealing,
//! file-set bookkeeping) lives here.

use std::io::{Read, Write};
use std::path::Path;

use vault_crypto::aead::Version as CryptoVersion;
use vault_storage::blob;
use vault_wire::file_header::{self, FileType as WireFileType, Header, HeaderPair};
use vault_wire::sealed_box::PUBLIC_KEY_LEN;

use crate::error::{ModelError, Result};
use crate::types::{FileEntry, FileType};

/// External collaborator: produces a thumbnail and (for video) a
/// duration for a source file. A real implementation shells out to an
/// image/video tool; tests use a fixed-bytes stub.
pub trait ThumbnailSource {
    fn generate(&self, source_path: &Path, file_type: FileType) -> Result<Vec<u8>>;
    fn video_duration_secs(&self, source_path: &Path) -> Result<Option<u32>>;
}

/// Classify a file by extension into this crate's `FileType` enum.
pub fn detect_file_type(filename: &str) -> FileType {
    let ext = filename.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" | "png" | "heic" | "heif" | "webp" | "gif" | "bmp" => FileType::Photo,
        "mp4" | "mov" | "m4v" | "avi" | "mkv" | "webm" => FileType::Video,
        _ => FileType::General,
    }
}

fn to_wire_file_type(ft: FileType) -> WireFileType {
    match ft {
        FileType::General => WireFileType::General,
        FileType::Photo => WireFileType::Photo,
        FileType::Video => WireFileType::Video,
    }
}

/// Per-file key material and destination paths the caller (which alone
/// holds the account/album secret keys) supplies for one import.
pub struct ImportTarget<'a> {
    pub data_key_main: [u8; 32],
    pub data_key_thumb: [u8; 32],
    pub owner_public_key: &'a [u8; PUBLIC_KEY_LEN],
    pub blob_dir: &'a Path,
    pub version: CryptoVersion,
}

/// Import one local file: read it fully (photos/small files — large
/// video bodies should be streamed by a caller that bypasses this
/// convenience path and drives [`vault_storage::blob`] directly), encrypt
/// body and thumbnail as two separate blobs under `target.blob_dir`, seal
/// a header pair under `target.owner_public_key`, and return the
/// resulting [`FileEntry`].
pub fn import_file(
    source_path: &Path,
    file_id: &str,
    album_id: Option<String>,
    target: &ImportTarget<'_>,
    thumbnails: &dyn ThumbnailSource,
) -> Result<FileEntry> {
    let filename = source_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ModelError::ValidationError(format!("non-UTF8 filename: {source_path:?}")))?
        .to_string();

    let file_type = detect_file_type(&filename);
    let mut body = Vec::new();
    std::fs::File::open(source_path)?.read_to_end(&mut body)?;
    let video_duration_secs = if file_type == FileType::Video {
        thumbnails.video_duration_secs(source_path)?
    } else {
        None
    };
    let thumb_bytes = thumbnails.generate(source_path, file_type)?;

    let context_len = vault_crypto::streaming::context_len(target.version);
    let main_context = derive_context(file_id, "main", context_len);
    let thumb_context = derive_context(file_id, "thumb", context_len);

    let main_path = target.blob_dir.join(file_id);
    let thumb_path = target.blob_dir.join(format!("{file_id}-thumb"));
    write_blob(&main_path, target.version, &target.data_key_main, main_context, &body)?;
    write_blob(&thumb_path, target.version, &target.data_key_thumb, thumb_context, &thumb_bytes)?;

    let pair = HeaderPair {
        main: Header {
            data_key: target.data_key_main,
            filename: filename.clone(),
            data_size: body.len() as u64,
            file_type: to_wire_file_type(file_type),
            video_duration_secs,
        },
        thumb: Header {
            data_key: target.data_key_thumb,
            filename,
            data_size: thumb_bytes.len() as u64,
            file_type: to_wire_file_type(file_type),
            video_duration_secs: None,
        },
    };
    let sealed = file_header::seal_pair(target.owner_public_key, &pair);

    let now = crate::types::now_millis_string();
    Ok(FileEntry {
        file: file_id.to_string(),
        version: "1".to_string(),
        date_created: now.clone(),
        date_modified: now,
        headers: sealed,
        album_id,
    })
}

fn write_blob(path: &Path, version: CryptoVersion, key: &[u8; 32], context: Vec<u8>, data: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let mut writer = blob::open_blob_write(&tmp, version, key, context)?;
    writer.write_all(data)?;
    writer.close()?;
    blob::finalize(&tmp, path)?;
    Ok(())
}

/// Export (or `cat`, with `dest` writing to stdout) a file's body blob:
/// decrypt the header under `recipient_secret` to recover the data key,
/// then stream-decrypt the blob to `dest`.
pub fn export_file(
    blob_path: &Path,
    sealed_headers: &[u8],
    recipient_secret: &[u8; 32],
    version: CryptoVersion,
    file_id: &str,
    dest: &mut dyn Write,
) -> Result<()> {
    let pair = file_header::open_pair(recipient_secret, sealed_headers)?;
    let context_len = vault_crypto::streaming::context_len(version);
    let context = derive_context(file_id, "main", context_len);
    let mut reader = blob::open_blob_read(blob_path, version, pair.main.data_key.to_vec(), context, 0)?;
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read_at_current_pos(&mut buf)?;
        if n == 0 {
            break;
        }
        dest.write_all(&buf[..n])?;
    }
    Ok(())
}

/// Derive a fixed-length streaming context from the file id and a
/// `"main"`/`"thumb"` discriminator so a file's two blobs never share a
/// nonce space even though they're sealed under different data keys
/// anyway (defense in depth against a key-reuse bug elsewhere).
fn derive_context(file_id: &str, which: &str, len: usize) -> Vec<u8> {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(file_id.as_bytes());
    hasher.update(b"/");
    hasher.update(which.as_bytes());
    let digest = hasher.finalize();
    digest[..len].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use vault_wire::sealed_box::generate_keypair;

    struct FixedThumbnail;
    impl ThumbnailSource for FixedThumbnail {
        fn generate(&self, _source_path: &Path, _file_type: FileType) -> Result<Vec<u8>> {
            Ok(vec![0xABu8; 64])
        }
        fn video_duration_secs(&self, _source_path: &Path) -> Result<Option<u32>> {
            Ok(Some(12))
        }
    }

    #[test]
    fn detects_photo_and_video_by_extension() {
        assert_eq!(detect_file_type("a.JPG"), FileType::Photo);
        assert_eq!(detect_file_type("b.mp4"), FileType::Video);
        assert_eq!(detect_file_type("c.txt"), FileType::General);
    }

    #[test]
    fn import_then_export_roundtrips_body() {
        let dir = tempdir().unwrap();
        let source_path = dir.path().join("image000.jpg");
        std::fs::write(&source_path, b"pretend jpeg bytes").unwrap();

        let kp = generate_keypair();
        let target = ImportTarget {
            data_key_main: [7u8; 32],
            data_key_thumb: [8u8; 32],
            owner_public_key: &kp.public,
            blob_dir: dir.path(),
            version: CryptoVersion::V2,
        };

        let entry = import_file(&source_path, "file1.sp", None, &target, &FixedThumbnail).unwrap();
        assert_eq!(entry.file, "file1.sp");

        let mut out = Vec::new();
        let blob_path = dir.path().join("file1.sp");
        export_file(&blob_path, &entry.headers, &kp.secret, CryptoVersion::V2, "file1.sp", &mut out).unwrap();
        assert_eq!(out, b"pretend jpeg bytes");
    }
}
