//! In-memory session state: the decrypted index (album list, file sets)
//! and, once logged in, the account's own keypair and session token —
//! live key material held alongside a cache of decrypted metadata,
//! covering the vault's full local index rather than a single object
//! cache.

use std::collections::HashMap;

use vault_crypto::MaskedKey;
use vault_model::{AlbumList, Contact, FileSet, SetKey};
use vault_remote::dto::UpdateCursors;
use zeroize::Zeroize;

/// The account's own keypair and an active session token, held only
/// while logged in.
pub(crate) struct LoggedInState {
    pub user_id: u64,
    pub email: String,
    pub session_token: String,
    /// Hex-encoded PBKDF2 salt the remote issued at `preLogin`, reused for
    /// every later login-hash computation (`changePass`, `deleteUser`)
    /// against this session.
    pub password_salt: String,
    pub public_key: [u8; 32],
    pub secret_key: [u8; 32],
}

impl Drop for LoggedInState {
    fn drop(&mut self) {
        self.secret_key.zeroize();
    }
}

#[derive(Default)]
pub(crate) struct VaultState {
    pub master: Option<MaskedKey>,
    pub account: Option<LoggedInState>,
    pub album_list: AlbumList,
    pub file_sets: HashMap<SetKey, FileSet>,
    /// Cached contacts, keyed by email (`contacts`/`share`).
    pub contacts: HashMap<String, Contact>,
    pub cursors: UpdateCursors,
}

impl VaultState {
    pub fn account(&self) -> crate::error::Result<&LoggedInState> {
        self.account.as_ref().ok_or(crate::error::VaultError::NotLoggedIn)
    }

    pub fn master(&self) -> crate::error::Result<&MaskedKey> {
        self.master.as_ref().ok_or(crate::error::VaultError::NotLoggedIn)
    }
}
