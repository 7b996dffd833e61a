//! Album lifecycle and sharing: `add_albums`, `remove_albums`,
//! `rename_album`, `change_permissions`, `share`, `unshare_album`,
//! `leave`, `remove_members`, `contacts`. Each member gets its own
//! sealed key bundle (`vault_wire::sealed_box`) rather than a single
//! shared secret.
//!
//! `add_albums`/`remove_albums`/`rename_album`/`change_permissions` only
//! touch local state — the next `push`/`sync` picks up the resulting
//! diff (`SyncOp::AddAlbum`/`RemoveAlbum`/`RenameAlbum`/`EditPerms`).
//! `share`/`unshare_album`/`leave`/`remove_members` have no diffable
//! counterpart in `vault_sync::SyncOp`, so they call the remote directly
//! and apply the result to local state immediately.

use std::collections::{HashMap, HashSet};

use vault_model::mutate;
use vault_model::{Album, Contact, ModelError, SetKey};
use vault_remote::dto::{
    GetContactRequest, LeaveAlbumRequest, RemoveAlbumMemberRequest, ShareRequest, UnshareAlbumRequest,
};
use vault_wire::{album_meta, sealed_box};

use crate::error::{Result, VaultError};
use crate::Vault;

/// Domain separator for sealing an album's own secret key under an
/// account's (owner's or a shared member's) public key — distinct from
/// `album-metadata`/`file-header` so key reuse across those sealed-box
/// uses never collides.
const ALBUM_KEY_CONTEXT: &str = "album-private-key";

/// Recover an album's own 32-byte secret key: from `enc_private_key`
/// (sealed under the owner's own public key) if we own it, else from our
/// entry in `member_keys` (sealed under our own public key at share
/// time).
pub(crate) fn open_album_secret(secret_key: &[u8; 32], user_id: u64, album: &Album) -> Result<[u8; 32]> {
    let sealed: &[u8] = if album.is_owner {
        &album.enc_private_key
    } else {
        album.member_keys.get(&user_id).map(Vec::as_slice).ok_or_else(|| {
            ModelError::NotFound(format!("no key bundle for member {user_id} in album {}", album.album_id))
        })?
    };
    let opened = sealed_box::open(secret_key, ALBUM_KEY_CONTEXT, sealed)?;
    let bytes: [u8; 32] =
        opened.try_into().map_err(|_| VaultError::InvalidArgument("malformed album secret key".into()))?;
    Ok(bytes)
}

fn decrypted_name(secret_key: &[u8; 32], user_id: u64, album: &Album) -> Result<String> {
    let album_secret = open_album_secret(secret_key, user_id, album)?;
    Ok(album_meta::open(&album_secret, &album.metadata)?.name)
}

impl Vault {
    /// Create one local-only album per name, sealed under a fresh
    /// per-album keypair.
    pub async fn add_albums(&self, names: &[String]) -> Result<Vec<Album>> {
        let mut created = Vec::new();
        {
            let mut state = self.state.write().await;
            let (secret_key, user_id, public_key) = {
                let account = state.account()?;
                (account.secret_key, account.user_id, account.public_key)
            };

            let mut existing: HashSet<String> = HashSet::new();
            for album in state.album_list.local.values() {
                existing.insert(decrypted_name(&secret_key, user_id, album)?);
            }

            for name in names {
                let keypair = sealed_box::generate_keypair();
                let enc_private_key = sealed_box::seal(&public_key, ALBUM_KEY_CONTEXT, &keypair.secret);
                let sealed_metadata =
                    album_meta::seal(&keypair.public, &album_meta::AlbumMetadata { name: name.clone() });
                let album = mutate::add_album(
                    &mut state.album_list,
                    &existing,
                    name,
                    keypair.public.to_vec(),
                    enc_private_key,
                    sealed_metadata,
                )?;
                existing.insert(name.clone());
                state.file_sets.entry(SetKey::Album(album.album_id.clone())).or_default();
                created.push(album);
            }
        }
        self.persist_state().await?;
        Ok(created)
    }

    /// Remove local, empty, owned albums. A local-only album (never
    /// synced) also drops its file-set record; a previously-synced one
    /// keeps it so `push` still sees the local/remote mismatch and emits
    /// `RemoveAlbum`.
    pub async fn remove_albums(&self, album_ids: &[String]) -> Result<()> {
        {
            let mut state = self.state.write().await;
            for id in album_ids {
                let set = state.file_sets.get(&SetKey::Album(id.clone())).cloned().unwrap_or_default();
                let was_local_only = mutate::remove_album(&mut state.album_list, &set, id)?;
                if was_local_only {
                    state.file_sets.remove(&SetKey::Album(id.clone()));
                }
            }
        }
        self.persist_state().await?;
        Ok(())
    }

    /// Rename an owned album: re-seal its metadata under its own
    /// (unchanged) keypair.
    pub async fn rename_album(&self, album_id: &str, new_name: &str) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.account()?;
            let album = state
                .album_list
                .local
                .get(album_id)
                .ok_or_else(|| ModelError::NotFound(format!("album {album_id}")))?;
            let public_key: [u8; 32] = album
                .public_key
                .clone()
                .try_into()
                .map_err(|_| VaultError::InvalidArgument("malformed album public key".into()))?;
            let sealed_metadata =
                album_meta::seal(&public_key, &album_meta::AlbumMetadata { name: new_name.to_string() });

            let album = state
                .album_list
                .local
                .get_mut(album_id)
                .ok_or_else(|| ModelError::NotFound(format!("album {album_id}")))?;
            mutate::rename_album(album, sealed_metadata)?;
        }
        self.persist_state().await?;
        Ok(())
    }

    /// Change an owned album's add/share/copy permission grammar, e.g.
    /// `"+add -share"`.
    pub async fn change_permissions(&self, album_id: &str, grammar: &str) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.account()?;
            let album = state
                .album_list
                .local
                .get_mut(album_id)
                .ok_or_else(|| ModelError::NotFound(format!("album {album_id}")))?;
            mutate::change_permissions(album, grammar)?;
        }
        self.persist_state().await?;
        Ok(())
    }

    /// Share an owned album with one or more contacts: seal a copy of
    /// the album's own secret key under each member's public key, then
    /// hand the bundle to the remote.
    pub async fn share(&self, album_id: &str, member_emails: &[String]) -> Result<()> {
        let (token, secret_key, user_id, album) = {
            let state = self.state.read().await;
            let account = state.account()?;
            let album = state
                .album_list
                .local
                .get(album_id)
                .ok_or_else(|| ModelError::NotFound(format!("album {album_id}")))?
                .clone();
            (account.session_token.clone(), account.secret_key, account.user_id, album)
        };
        let album_secret = open_album_secret(&secret_key, user_id, &album)?;

        let mut member_keys: HashMap<u64, Vec<u8>> = HashMap::new();
        for email in member_emails {
            let contact = self.resolve_contact(email).await?;
            let member_public: [u8; 32] = contact
                .public_key
                .clone()
                .try_into()
                .map_err(|_| VaultError::InvalidArgument("malformed contact public key".into()))?;
            member_keys.insert(contact.user_id, sealed_box::seal(&member_public, ALBUM_KEY_CONTEXT, &album_secret));
        }

        self.remote
            .share(ShareRequest {
                session_token: token,
                album_id: album_id.to_string(),
                member_emails: member_emails.to_vec(),
                member_keys: member_keys.clone(),
                permissions: album.permissions.to_token(),
            })
            .await?;

        {
            let mut state = self.state.write().await;
            let album = state
                .album_list
                .local
                .get_mut(album_id)
                .ok_or_else(|| ModelError::NotFound(format!("album {album_id}")))?;
            album.is_shared = true;
            for (member_id, sealed) in member_keys {
                album.member_keys.insert(member_id, sealed);
                if !album.members.contains(&member_id) {
                    album.members.push(member_id);
                }
            }
        }
        self.persist_state().await?;
        Ok(())
    }

    /// Revoke every member's access to an owned album.
    pub async fn unshare_album(&self, album_id: &str) -> Result<()> {
        let token = {
            let state = self.state.read().await;
            state.account()?.session_token.clone()
        };
        self.remote
            .unshare_album(UnshareAlbumRequest { session_token: token, album_id: album_id.to_string() })
            .await?;
        {
            let mut state = self.state.write().await;
            let album = state
                .album_list
                .local
                .get_mut(album_id)
                .ok_or_else(|| ModelError::NotFound(format!("album {album_id}")))?;
            album.is_shared = false;
            album.member_keys.clear();
            album.members.clear();
        }
        self.persist_state().await?;
        Ok(())
    }

    /// Leave an album we were shared into; the owner keeps the album.
    pub async fn leave(&self, album_id: &str) -> Result<()> {
        let token = {
            let state = self.state.read().await;
            state.account()?.session_token.clone()
        };
        self.remote
            .leave_album(LeaveAlbumRequest { session_token: token, album_id: album_id.to_string() })
            .await?;
        {
            let mut state = self.state.write().await;
            state.album_list.local.remove(album_id);
            state.file_sets.remove(&SetKey::Album(album_id.to_string()));
        }
        self.persist_state().await?;
        Ok(())
    }

    /// Remove specific members from an owned, shared album.
    pub async fn remove_members(&self, album_id: &str, member_user_ids: &[u64]) -> Result<()> {
        let token = {
            let state = self.state.read().await;
            state.account()?.session_token.clone()
        };
        for user_id in member_user_ids {
            self.remote
                .remove_album_member(RemoveAlbumMemberRequest {
                    session_token: token.clone(),
                    album_id: album_id.to_string(),
                    member_user_id: *user_id,
                })
                .await?;
        }
        {
            let mut state = self.state.write().await;
            let album = state
                .album_list
                .local
                .get_mut(album_id)
                .ok_or_else(|| ModelError::NotFound(format!("album {album_id}")))?;
            for user_id in member_user_ids {
                album.member_keys.remove(user_id);
                album.members.retain(|m| m != user_id);
            }
        }
        self.persist_state().await?;
        Ok(())
    }

    /// The cached contact list (`contacts`).
    pub async fn contacts(&self) -> Vec<Contact> {
        let state = self.state.read().await;
        state.contacts.values().cloned().collect()
    }

    /// Look up a contact by email, caching the result.
    async fn resolve_contact(&self, email: &str) -> Result<Contact> {
        {
            let state = self.state.read().await;
            if let Some(contact) = state.contacts.get(email) {
                return Ok(contact.clone());
            }
        }
        let token = {
            let state = self.state.read().await;
            state.account()?.session_token.clone()
        };
        let response = self
            .remote
            .get_contact(GetContactRequest { session_token: token, email: email.to_string() })
            .await?;
        let contact = Contact {
            email: email.to_string(),
            user_id: response.user_id,
            public_key: response.public_key,
            date_modified: vault_model::types::now_millis_string(),
        };
        let mut state = self.state.write().await;
        state.contacts.insert(email.to_string(), contact.clone());
        Ok(contact)
    }
}
