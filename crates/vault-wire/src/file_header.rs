//! Per-file headers: two are always encoded together (main file + its
//! thumbnail), each carrying the per-blob data key, filename, size, file
//! type, and (for video) duration. The pair is sealed as one unit under
//! whichever key currently owns the file — the user's secret key for
//! gallery/trash, the album's key for album files.
//!
//! Moving a file between gallery/album/trash, or renaming it, requires
//! decrypting under the source key and re-sealing under the destination
//! key; [`reencrypt`] does both steps and optionally rewrites the filename
//! field in both headers at once.

use crate::error::{Result, WireError};
use crate::sealed_box::{self, PUBLIC_KEY_LEN, SECRET_KEY_LEN};

const CONTEXT: &str = "file-header";
const DATA_KEY_LEN: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileType {
    General,
    Photo,
    Video,
}

impl FileType {
    fn to_byte(self) -> u8 {
        match self {
            FileType::General => 0,
            FileType::Photo => 1,
            FileType::Video => 2,
        }
    }

    fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(FileType::General),
            1 => Ok(FileType::Photo),
            2 => Ok(FileType::Video),
            other => Err(WireError::UnknownFileType(other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub data_key: [u8; DATA_KEY_LEN],
    pub filename: String,
    pub data_size: u64,
    pub file_type: FileType,
    pub video_duration_secs: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderPair {
    pub main: Header,
    pub thumb: Header,
}

fn encode_one(h: &Header, out: &mut Vec<u8>) {
    out.extend_from_slice(&h.data_key);
    out.push(h.file_type.to_byte());
    let filename_bytes = h.filename.as_bytes();
    out.extend_from_slice(&(filename_bytes.len() as u16).to_be_bytes());
    out.extend_from_slice(filename_bytes);
    out.extend_from_slice(&h.data_size.to_be_bytes());
    match h.video_duration_secs {
        Some(d) => {
            out.push(1);
            out.extend_from_slice(&d.to_be_bytes());
        }
        None => out.push(0),
    }
}

fn decode_one(data: &[u8]) -> Result<(Header, usize)> {
    let mut pos = 0usize;
    let need = |pos: usize, n: usize| -> Result<()> {
        if data.len() < pos + n {
            Err(WireError::MalformedHeader("truncated header".into()))
        } else {
            Ok(())
        }
    };

    need(pos, DATA_KEY_LEN)?;
    let mut data_key = [0u8; DATA_KEY_LEN];
    data_key.copy_from_slice(&data[pos..pos + DATA_KEY_LEN]);
    pos += DATA_KEY_LEN;

    need(pos, 1)?;
    let file_type = FileType::from_byte(data[pos])?;
    pos += 1;

    need(pos, 2)?;
    let filename_len = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
    pos += 2;
    need(pos, filename_len)?;
    let filename = String::from_utf8(data[pos..pos + filename_len].to_vec())
        .map_err(|e| WireError::MalformedHeader(e.to_string()))?;
    pos += filename_len;

    need(pos, 8)?;
    let mut size_bytes = [0u8; 8];
    size_bytes.copy_from_slice(&data[pos..pos + 8]);
    let data_size = u64::from_be_bytes(size_bytes);
    pos += 8;

    need(pos, 1)?;
    let has_duration = data[pos] == 1;
    pos += 1;
    let video_duration_secs = if has_duration {
        need(pos, 4)?;
        let mut d = [0u8; 4];
        d.copy_from_slice(&data[pos..pos + 4]);
        pos += 4;
        Some(u32::from_be_bytes(d))
    } else {
        None
    };

    Ok((
        Header { data_key, filename, data_size, file_type, video_duration_secs },
        pos,
    ))
}

/// Concatenate main then thumb into the plaintext the sealed box carries.
pub fn encode_pair(pair: &HeaderPair) -> Vec<u8> {
    let mut out = Vec::new();
    encode_one(&pair.main, &mut out);
    encode_one(&pair.thumb, &mut out);
    out
}

pub fn decode_pair(data: &[u8]) -> Result<HeaderPair> {
    let (main, consumed) = decode_one(data)?;
    let (thumb, _) = decode_one(&data[consumed..])?;
    Ok(HeaderPair { main, thumb })
}

pub fn seal_pair(recipient_public: &[u8; PUBLIC_KEY_LEN], pair: &HeaderPair) -> Vec<u8> {
    sealed_box::seal(recipient_public, CONTEXT, &encode_pair(pair))
}

pub fn open_pair(recipient_secret: &[u8; SECRET_KEY_LEN], sealed: &[u8]) -> Result<HeaderPair> {
    let plaintext = sealed_box::open(recipient_secret, CONTEXT, sealed)?;
    decode_pair(&plaintext)
}

/// Decrypt under the source key, optionally overwrite the filename in both
/// headers, and re-seal under the destination key.
pub fn reencrypt(
    source_secret: &[u8; SECRET_KEY_LEN],
    dest_public: &[u8; PUBLIC_KEY_LEN],
    sealed: &[u8],
    new_filename: Option<&str>,
) -> Result<Vec<u8>> {
    let mut pair = open_pair(source_secret, sealed)?;
    if let Some(name) = new_filename {
        pair.main.filename = name.to_string();
        pair.thumb.filename = name.to_string();
    }
    Ok(seal_pair(dest_public, &pair))
}
