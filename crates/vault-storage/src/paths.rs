//! Record-name hashing into obfuscated two-level filesystem paths.
//!
//! Concatenates `hex(secret_key_bytes) || "/" || name`, hashes under the
//! master key's HMAC, and renders as `hh/hhhhhh…` to keep any one
//! directory narrow. Before login, `secret_key_bytes` comes from local
//! configuration; after login, from the account's secret key — so
//! per-account isolation on disk falls out automatically from which
//! secret key is active when a path is computed.
//!
//! Open question (a) from : rotating the active secret key changes
//! every future hash, silently orphaning records hashed under the old key.
//! No re-hash pass is implemented here, matching the unresolved behavior
//! of the system this was distilled from — see DESIGN.md.

use vault_crypto::{hashing, ExposedKey};

/// Which secret key is currently active for path hashing.
pub enum ActiveSecretKey<'a> {
    /// Pre-login: a local secret key from configuration.
    PreLogin(&'a [u8]),
    /// Post-login: the account's own secret key.
    Account(&'a [u8]),
}

impl<'a> ActiveSecretKey<'a> {
    fn bytes(&self) -> &'a [u8] {
        match self {
            ActiveSecretKey::PreLogin(b) => b,
            ActiveSecretKey::Account(b) => b,
        }
    }
}

/// Render a record name into its two-level on-disk path.
pub fn record_path(master: &ExposedKey, secret_key: &ActiveSecretKey<'_>, name: &str) -> String {
    let combined = format!("{}/{}", hex::encode(secret_key.bytes()), name);
    let digest = hashing::hash(master, combined.as_bytes());
    let hex_digest = hex::encode(digest);
    format!("{}/{}", &hex_digest[..2], &hex_digest[2..])
}

/// The thumbnail companion path for a blob record path.
pub fn thumb_path(blob_path: &str) -> String {
    format!("{blob_path}-thumb")
}

// TODO: a `rehash_all` pass would be needed to support rotating the
// account secret key without orphaning already-written records; not
// implemented (leaves this unresolved in the source too).
