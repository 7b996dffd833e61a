//! On-disk record shapes for the data model: albums, album
//! lists, file entries, file sets, and contacts. These are the typed
//! values `vault-storage`'s JSON codec serializes directly.

use std::collections::HashMap;

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

/// Random 32-byte URL-base64-without-padding identifier, used for both
/// album ids and (with the `.sp` suffix) file ids.
fn random_id() -> String {
    let mut buf = [0u8; 32];
    OsRng.fill_bytes(&mut buf);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, buf)
}

pub fn new_album_id() -> String {
    random_id()
}

pub const FILE_ID_SUFFIX: &str = ".sp";

pub fn new_file_id() -> String {
    format!("{}{FILE_ID_SUFFIX}", random_id())
}

pub fn now_millis_string() -> String {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    millis.to_string()
}

/// A concrete handle to one of the three kinds of file set: the two fixed
/// sets, or a specific album's set, identified by its `AlbumId`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetKey {
    Gallery,
    Trash,
    Album(String),
}

impl SetKey {
    pub fn album_id(&self) -> Option<&str> {
        match self {
            SetKey::Album(id) => Some(id),
            _ => None,
        }
    }

    /// The logical storage record name for this set's file-set record.
    pub fn record_name(&self) -> String {
        match self {
            SetKey::Gallery => "fileset/gallery".to_string(),
            SetKey::Trash => "fileset/trash".to_string(),
            SetKey::Album(id) => format!("fileset/album/{id}"),
        }
    }
}

/// Four-character permission token: version marker + Add/Share/Copy flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub allow_add: bool,
    pub allow_share: bool,
    pub allow_copy: bool,
}

impl Permissions {
    fn flag_char(on: bool) -> char {
        if on { '1' } else { '0' }
    }

    pub fn to_token(self) -> String {
        format!(
            "1{}{}{}",
            Self::flag_char(self.allow_add),
            Self::flag_char(self.allow_share),
            Self::flag_char(self.allow_copy)
        )
    }

    pub fn parse(token: &str) -> Result<Self, String> {
        let chars: Vec<char> = token.chars().collect();
        if chars.len() != 4 || chars[0] != '1' {
            return Err(format!("malformed permission token: {token}"));
        }
        let bit = |c: char| match c {
            '1' => Ok(true),
            '0' => Ok(false),
            other => Err(format!("malformed permission flag: {other}")),
        };
        Ok(Permissions {
            allow_add: bit(chars[1])?,
            allow_share: bit(chars[2])?,
            allow_copy: bit(chars[3])?,
        })
    }

    /// Apply a change grammar of whitespace-separated tokens like
    /// `+add -share +c -a` (`add`/`a`, `share`/`s`, `copy`/`c`).
    pub fn apply_grammar(mut self, grammar: &str) -> Result<Self, String> {
        for token in grammar.split_whitespace() {
            let (sign, name) = token.split_at(1);
            let on = match sign {
                "+" => true,
                "-" => false,
                _ => return Err(format!("malformed permission change token: {token}")),
            };
            match name {
                "add" | "a" => self.allow_add = on,
                "share" | "s" => self.allow_share = on,
                "copy" | "c" => self.allow_copy = on,
                other => return Err(format!("unknown permission name: {other}")),
            }
        }
        Ok(self)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Album {
    pub album_id: String,
    pub date_created: String,
    pub date_modified: String,
    pub public_key: Vec<u8>,
    /// Sealed under the owner's own public key.
    pub enc_private_key: Vec<u8>,
    /// Sealed per-member copies of the album secret key, keyed by user id.
    pub member_keys: HashMap<u64, Vec<u8>>,
    /// `AlbumMetadata` (name, ...) sealed under `public_key`.
    pub metadata: Vec<u8>,
    pub is_owner: bool,
    pub is_shared: bool,
    pub is_hidden: bool,
    pub is_locked: bool,
    pub permissions: Permissions,
    pub members: Vec<u64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AlbumList {
    pub local: HashMap<String, Album>,
    pub remote: HashMap<String, Album>,
    pub last_update_ts: u64,
    pub last_delete_ts: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileType {
    General,
    Photo,
    Video,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileEntry {
    pub file: String,
    pub version: String,
    pub date_created: String,
    pub date_modified: String,
    /// Two sealed headers (main + thumbnail) concatenated together.
    pub headers: Vec<u8>,
    pub album_id: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileSet {
    pub local: HashMap<String, FileEntry>,
    pub remote: HashMap<String, FileEntry>,
    pub last_update_ts: u64,
    pub last_delete_ts: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    pub user_id: u64,
    pub public_key: Vec<u8>,
    pub date_modified: String,
}
