//! Streaming chunked AEAD for blob payloads.
//!
//! Plaintext is divided into fixed 1 MiB chunks; each chunk is sealed
//! independently under a nonce built from a per-stream context plus a
//! 64-bit monotonically increasing counter starting at 1 (— a
//! deliberate departure from fresh-random-nonce-per-chunk schemes: a
//! counter lets [`SeekableReader::seek`] reposition without re-deriving
//! anything beyond arithmetic). v1 uses AES-256-GCM with a 4-byte context
//! (4 + 8 = 12-byte GCM nonce); v2 uses XChaCha20-Poly1305 with an up-to
//! 16-byte context (16 + 8 = 24-byte nonce). There is no size prefix —
//! end of the underlying reader signals the final, possibly short, chunk.

use std::io::{self, Read, Seek, SeekFrom, Write};

use aes_gcm::{Aes256Gcm, Nonce as GcmNonce};
use chacha20poly1305::{
    aead::{Aead as _, KeyInit as _, Payload},
    XChaCha20Poly1305, XNonce,
};

use crate::aead::Version;
use crate::error::{CryptoError, Result};

/// Plaintext chunk size.
pub const CHUNK_SIZE: usize = 1024 * 1024;
/// AEAD tag overhead per chunk.
pub const TAG_SIZE: usize = 16;

/// Context length in bytes, by version.
pub fn context_len(version: Version) -> usize {
    match version {
        Version::V1 => 4,
        Version::V2 => 16,
    }
}

enum Cipher {
    V1(Aes256Gcm),
    V2(XChaCha20Poly1305),
}

impl Cipher {
    fn new(version: Version, key32: &[u8]) -> Self {
        match version {
            Version::V1 => Cipher::V1(<Aes256Gcm as aes_gcm::KeyInit>::new(key32.into())),
            Version::V2 => Cipher::V2(XChaCha20Poly1305::new(key32.into())),
        }
    }

    fn nonce_bytes(version: Version, context: &[u8], counter: u64) -> Vec<u8> {
        let mut n = Vec::with_capacity(context.len() + 8);
        n.extend_from_slice(context);
        n.extend_from_slice(&counter.to_be_bytes());
        debug_assert_eq!(n.len(), if version == Version::V1 { 12 } else { 24 });
        n
    }

    fn seal(&self, version: Version, context: &[u8], counter: u64, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = Self::nonce_bytes(version, context, counter);
        match self {
            Cipher::V1(c) => {
                let n = GcmNonce::from_slice(&nonce);
                aes_gcm::aead::Aead::encrypt(c, n, plaintext)
                    .map_err(|_| CryptoError::DecryptFailed)
            }
            Cipher::V2(c) => {
                let n = XNonce::from_slice(&nonce);
                c.encrypt(n, Payload::from(plaintext)).map_err(|_| CryptoError::DecryptFailed)
            }
        }
    }

    fn open(&self, version: Version, context: &[u8], counter: u64, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let nonce = Self::nonce_bytes(version, context, counter);
        match self {
            Cipher::V1(c) => {
                let n = GcmNonce::from_slice(&nonce);
                aes_gcm::aead::Aead::decrypt(c, n, ciphertext)
                    .map_err(|_| CryptoError::DecryptFailed)
            }
            Cipher::V2(c) => {
                let n = XNonce::from_slice(&nonce);
                c.decrypt(n, Payload::from(ciphertext)).map_err(|_| CryptoError::DecryptFailed)
            }
        }
    }
}

/// Writes plaintext, buffering until a full chunk is available, sealing
/// each full chunk as it fills. `close` MUST be called to flush and seal
/// the final (possibly partial, possibly empty) chunk.
pub struct StreamWriter<W: Write> {
    inner: W,
    cipher: Cipher,
    version: Version,
    context: Vec<u8>,
    counter: u64,
    buf: Vec<u8>,
    closed: bool,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(inner: W, version: Version, key32: &[u8], context: Vec<u8>) -> Self {
        debug_assert_eq!(context.len(), context_len(version));
        StreamWriter {
            inner,
            cipher: Cipher::new(version, key32),
            version,
            context,
            counter: 1,
            buf: Vec::with_capacity(CHUNK_SIZE),
            closed: false,
        }
    }

    fn flush_chunk(&mut self, plaintext: &[u8]) -> Result<()> {
        let sealed = self.cipher.seal(self.version, &self.context, self.counter, plaintext)?;
        self.inner.write_all(&sealed)?;
        self.counter += 1;
        Ok(())
    }

    /// Flush the final partial (or empty) chunk and, if the underlying
    /// writer is a closer, close it too.
    pub fn close(mut self) -> Result<W> {
        self.finish()?;
        Ok(self.inner)
    }

    fn finish(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let remainder = std::mem::take(&mut self.buf);
        self.flush_chunk(&remainder)
    }
}

impl<W: Write> Write for StreamWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let total = data.len();
        let mut offset = 0;
        while offset < data.len() {
            let space = CHUNK_SIZE - self.buf.len();
            let take = space.min(data.len() - offset);
            self.buf.extend_from_slice(&data[offset..offset + take]);
            offset += take;
            if self.buf.len() == CHUNK_SIZE {
                let chunk = std::mem::replace(&mut self.buf, Vec::with_capacity(CHUNK_SIZE));
                self.flush_chunk(&chunk)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            }
        }
        Ok(total)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> Drop for StreamWriter<W> {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.finish();
        }
    }
}

/// Reads and authenticates chunks on demand, buffering the current
/// decrypted chunk so callers may read arbitrarily-sized slices.
pub struct StreamReader<R: Read> {
    inner: R,
    cipher: Cipher,
    version: Version,
    context: Vec<u8>,
    counter: u64,
    current: Vec<u8>,
    pos_in_current: usize,
    eof: bool,
}

impl<R: Read> StreamReader<R> {
    pub fn new(inner: R, version: Version, key32: &[u8], context: Vec<u8>) -> Self {
        debug_assert_eq!(context.len(), context_len(version));
        StreamReader {
            inner,
            cipher: Cipher::new(version, key32),
            version,
            context,
            counter: 1,
            current: Vec::new(),
            pos_in_current: 0,
            eof: false,
        }
    }

    fn fill_next_chunk(&mut self) -> Result<bool> {
        let mut sealed = vec![0u8; CHUNK_SIZE + TAG_SIZE];
        let mut filled = 0;
        loop {
            let n = self.inner.read(&mut sealed[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
            if filled == sealed.len() {
                break;
            }
        }
        if filled == 0 {
            self.eof = true;
            return Ok(false);
        }
        sealed.truncate(filled);
        let plaintext = self
            .cipher
            .open(self.version, &self.context, self.counter, &sealed)?;
        self.counter += 1;
        self.current = plaintext;
        self.pos_in_current = 0;
        Ok(true)
    }
}

impl<R: Read> Read for StreamReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.pos_in_current >= self.current.len() {
            if self.eof {
                return Ok(0);
            }
            let had_data = self
                .fill_next_chunk()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            if !had_data {
                return Ok(0);
            }
        }
        let available = self.current.len() - self.pos_in_current;
        let take = available.min(out.len());
        out[..take].copy_from_slice(&self.current[self.pos_in_current..self.pos_in_current + take]);
        self.pos_in_current += take;
        Ok(take)
    }
}

/// A seekable reader over an AEAD stream whose underlying transport is
/// itself `Read + Seek` (`OpenBlobRead`). Seeking repositions
/// the underlying reader to the enclosing chunk boundary and reinitializes
/// the per-chunk counter so authentication keys stay correct.
pub struct SeekableReader<R: Read + Seek> {
    inner: R,
    version: Version,
    key32: Vec<u8>,
    context: Vec<u8>,
    header_len: u64,
    plaintext_len: u64,
    logical_pos: u64,
    current_chunk_index: Option<u64>,
    current_chunk: Vec<u8>,
}

impl<R: Read + Seek> SeekableReader<R> {
    /// `header_len` is the number of bytes preceding the first sealed
    /// chunk in the underlying stream (record framing); `plaintext_len`
    /// is the total decrypted length, computed once by the caller as
    /// `file_size - header_len - ceil(chunks) * TAG_SIZE`.
    pub fn new(inner: R, version: Version, key32: Vec<u8>, context: Vec<u8>, header_len: u64, plaintext_len: u64) -> Self {
        SeekableReader {
            inner,
            version,
            key32,
            context,
            header_len,
            plaintext_len,
            logical_pos: 0,
            current_chunk_index: None,
            current_chunk: Vec::new(),
        }
    }

    fn load_chunk(&mut self, chunk_index: u64) -> Result<()> {
        if self.current_chunk_index == Some(chunk_index) {
            return Ok(());
        }
        let sealed_chunk_len = (CHUNK_SIZE + TAG_SIZE) as u64;
        let offset = self.header_len + chunk_index * sealed_chunk_len;
        self.inner
            .seek(SeekFrom::Start(offset))
            .map_err(CryptoError::Io)?;

        let remaining_plain = self.plaintext_len - chunk_index * CHUNK_SIZE as u64;
        let this_chunk_plain_len = remaining_plain.min(CHUNK_SIZE as u64) as usize;
        let sealed_len = this_chunk_plain_len + TAG_SIZE;

        let mut sealed = vec![0u8; sealed_len];
        self.inner.read_exact(&mut sealed).map_err(CryptoError::Io)?;

        let cipher = Cipher::new(self.version, &self.key32);
        let plaintext = cipher.open(self.version, &self.context, chunk_index + 1, &sealed)?;
        self.current_chunk = plaintext;
        self.current_chunk_index = Some(chunk_index);
        Ok(())
    }

    pub fn seek_logical(&mut self, offset: u64) -> Result<()> {
        if offset > self.plaintext_len {
            return Err(CryptoError::MalformedKey);
        }
        self.logical_pos = offset;
        Ok(())
    }

    pub fn seek_end(&mut self) -> Result<()> {
        self.logical_pos = self.plaintext_len;
        Ok(())
    }

    pub fn read_at_current_pos(&mut self, out: &mut [u8]) -> Result<usize> {
        if self.logical_pos >= self.plaintext_len {
            return Ok(0);
        }
        let chunk_index = self.logical_pos / CHUNK_SIZE as u64;
        self.load_chunk(chunk_index)?;
        let intra = (self.logical_pos % CHUNK_SIZE as u64) as usize;
        let available = self.current_chunk.len() - intra;
        let take = available.min(out.len());
        out[..take].copy_from_slice(&self.current_chunk[intra..intra + take]);
        self.logical_pos += take as u64;
        Ok(take)
    }
}
