//! Seekable blob I/O: `OpenBlobWrite(tmp, final)` / `OpenBlobRead(final)`
//! layered over [`vault_crypto::streaming`].
//!
//! Blobs are large enough that they're handled as plain files rather than
//! through the in-memory [`crate::record`] framing; the writer always
//! seals to a temp path and the caller renames on success (no write is
//! ever visible half-done), and the reader computes the plaintext length
//! once per open so `SeekEnd` doesn't need to scan the stream.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use vault_crypto::aead::Version;
use vault_crypto::streaming::{self, SeekableReader, StreamWriter, CHUNK_SIZE, TAG_SIZE};

use crate::error::{Result, StorageError};

/// A blob writer sealing to a temporary path.
pub struct BlobWriter {
    inner: StreamWriter<BufWriter<File>>,
}

/// `OpenBlobWrite(tmp, final)`: open `tmp` for writing. Caller renames to
/// `final` only after a successful [`BlobWriter::close`].
pub fn open_blob_write(tmp: &Path, version: Version, key32: &[u8], context: Vec<u8>) -> Result<BlobWriter> {
    let file = File::create(tmp)?;
    let inner = StreamWriter::new(BufWriter::new(file), version, key32, context);
    Ok(BlobWriter { inner })
}

impl BlobWriter {
    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        Ok(())
    }

    /// Flush the final chunk and sync the underlying file to disk.
    pub fn close(self) -> Result<()> {
        let buffered = self.inner.close()?;
        let mut file = buffered.into_inner().map_err(|e| StorageError::Io(e.into_error()))?;
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }
}

/// Rename a closed blob writer's temp path onto its final path — the
/// commit point for a blob write.
pub fn finalize(tmp: &Path, final_path: &Path) -> Result<()> {
    std::fs::rename(tmp, final_path)?;
    Ok(())
}

/// `OpenBlobRead(final)`: a seekable decrypting reader over `final_path`.
/// `header_len` is the number of clear bytes preceding the first sealed
/// chunk (the record's outer framing, if the blob carries one; pass 0 for
/// a bare sealed stream).
pub fn open_blob_read(
    final_path: &Path,
    version: Version,
    key32: Vec<u8>,
    context: Vec<u8>,
    header_len: u64,
) -> Result<SeekableReader<File>> {
    let file = File::open(final_path)?;
    let file_size = file.metadata()?.len();
    let total_ct = file_size
        .checked_sub(header_len)
        .ok_or_else(|| StorageError::FramingMismatch("blob shorter than its header".into()))?;
    let plaintext_len = plaintext_len_from_ciphertext_len(total_ct)?;
    Ok(SeekableReader::new(file, version, key32, context, header_len, plaintext_len))
}

/// Invert the chunked-AEAD framing to recover the plaintext length from
/// the total sealed-stream length, without scanning: full chunks are
/// always exactly `CHUNK_SIZE + TAG_SIZE` bytes; exactly one trailing
/// chunk is shorter (strictly, even if empty), so a single division
/// recovers both the full-chunk count and the trailing chunk's length.
fn plaintext_len_from_ciphertext_len(total_ct: u64) -> Result<u64> {
    let full = (CHUNK_SIZE + TAG_SIZE) as u64;
    if total_ct < TAG_SIZE as u64 {
        return Err(StorageError::FramingMismatch("ciphertext shorter than one tag".into()));
    }
    let full_chunks = total_ct / full;
    let final_ct = total_ct % full;
    let final_ct = if final_ct == 0 && full_chunks > 0 {
        // an exact multiple of `full` still has its own trailing
        // (possibly empty) chunk per the writer's `close` contract; a
        // remainder of exactly 0 can only mean the file is missing that
        // trailing chunk, which is a truncation.
        return Err(StorageError::FramingMismatch("blob missing trailing chunk".into()));
    } else {
        final_ct
    };
    if final_ct < TAG_SIZE as u64 {
        return Err(StorageError::FramingMismatch("trailing chunk shorter than its tag".into()));
    }
    let final_plain = final_ct - TAG_SIZE as u64;
    Ok(full_chunks * CHUNK_SIZE as u64 + final_plain)
}

/// `file_size - header_size - ceil(chunks)*tag_size`, exposed for
/// callers that need the chunk count without opening the file (e.g.
/// progress reporting).
pub fn chunk_count_for_plaintext_len(plaintext_len: u64) -> u64 {
    plaintext_len / CHUNK_SIZE as u64 + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn v_fn(i: u32) -> u8 {
        (((i >> 24) as u8).wrapping_add((i >> 16) as u8).wrapping_add((i >> 8) as u8).wrapping_add(i as u8)) & 0xFF
    }

    #[test]
    fn write_finalize_and_seekable_read_matches_byte_function() {
        let dir = tempdir().unwrap();
        let tmp = dir.path().join("blob.tmp-1");
        let final_path = dir.path().join("blob");

        let total_len = 5 * 1024 * 1024usize;
        let mut plaintext = Vec::with_capacity(total_len);
        for i in 0u32..total_len as u32 {
            plaintext.push(v_fn(i));
        }

        let key = vec![0x7au8; 32];
        let context = vec![0x01u8; streaming::context_len(Version::V1)];

        let mut writer = open_blob_write(&tmp, Version::V1, &key, context.clone()).unwrap();
        writer.write_all(&plaintext).unwrap();
        writer.close().unwrap();
        finalize(&tmp, &final_path).unwrap();

        let mut reader = open_blob_read(&final_path, Version::V1, key, context, 0).unwrap();
        for &offset in &[0usize, 1, CHUNK_SIZE - 10, CHUNK_SIZE, 3 * CHUNK_SIZE] {
            reader.seek_logical(offset as u64).unwrap();
            let mut buf = [0u8; 100];
            let mut got = 0;
            while got < buf.len() {
                let n = reader.read_at_current_pos(&mut buf[got..]).unwrap();
                if n == 0 {
                    break;
                }
                got += n;
            }
            for (i, &b) in buf[..got].iter().enumerate() {
                assert_eq!(b, v_fn((offset + i) as u32));
            }
        }
    }

    #[test]
    fn plaintext_len_recovered_for_empty_blob() {
        // one empty trailing chunk: just a 16-byte tag.
        assert_eq!(plaintext_len_from_ciphertext_len(TAG_SIZE as u64).unwrap(), 0);
    }

    #[test]
    fn plaintext_len_recovered_for_exact_multiple_of_chunk_size() {
        let full = (CHUNK_SIZE + TAG_SIZE) as u64;
        // one full chunk plus an empty trailing chunk.
        let total_ct = full + TAG_SIZE as u64;
        assert_eq!(plaintext_len_from_ciphertext_len(total_ct).unwrap(), CHUNK_SIZE as u64);
    }
}
