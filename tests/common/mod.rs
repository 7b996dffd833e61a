//! In-memory `RemoteApi` double standing in for the Stingle-compatible
//! server, and small test fixtures shared across the scenario tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use vault_model::import_export::ThumbnailSource;
use vault_model::FileType;
use vault_remote::dto::*;
use vault_remote::{RemoteApi, RemoteError, Result as RemoteResult};
use vault_wire::challenge;

#[derive(Clone, Default)]
struct StoredAccount {
    user_id: u64,
    password_hash: String,
    salt: String,
    public_key: Vec<u8>,
    enc_private_key: Vec<u8>,
}

#[derive(Default)]
struct ServerState {
    next_user_id: u64,
    clock: u64,
    accounts_by_email: HashMap<String, StoredAccount>,
    sessions: HashMap<String, String>,
    albums: HashMap<String, AlbumUpdate>,
    files: HashMap<String, FileUpdate>,
    blobs: HashMap<String, (Bytes, Bytes)>,
    deletes: Vec<DeleteEvent>,
    max_albums_ts: u64,
    max_files_ts: u64,
    max_delete_ts: u64,
}

impl ServerState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// A single-process stand-in for the remote service: one shared
/// in-memory account/album/file/blob store behind a trait object a
/// [`vault::Vault`] can sync against.
pub struct MockRemote {
    state: Mutex<ServerState>,
}

impl MockRemote {
    pub fn new() -> Self {
        MockRemote { state: Mutex::new(ServerState::default()) }
    }

    fn require_session(state: &ServerState, token: &str) -> RemoteResult<String> {
        state
            .sessions
            .get(token)
            .cloned()
            .ok_or_else(|| RemoteError::Status(vec!["invalid session".to_string()]))
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteApi for MockRemote {
    async fn create_account(&self, req: CreateAccountRequest) -> RemoteResult<CreateAccountResponse> {
        let mut state = self.state.lock().unwrap();
        if state.accounts_by_email.contains_key(&req.email) {
            return Err(RemoteError::Status(vec!["email already registered".to_string()]));
        }
        state.next_user_id += 1;
        let user_id = state.next_user_id;
        state.accounts_by_email.insert(
            req.email.clone(),
            StoredAccount {
                user_id,
                password_hash: req.password_hash,
                salt: req.salt,
                public_key: req.public_key,
                enc_private_key: req.enc_private_key,
            },
        );
        Ok(CreateAccountResponse { user_id })
    }

    async fn pre_login(&self, req: PreLoginRequest) -> RemoteResult<PreLoginResponse> {
        let state = self.state.lock().unwrap();
        let account = state
            .accounts_by_email
            .get(&req.email)
            .ok_or_else(|| RemoteError::Status(vec!["no such account".to_string()]))?;
        Ok(PreLoginResponse { salt: account.salt.clone() })
    }

    async fn login(&self, req: LoginRequest) -> RemoteResult<LoginResponse> {
        let mut state = self.state.lock().unwrap();
        let account = state
            .accounts_by_email
            .get(&req.email)
            .cloned()
            .ok_or_else(|| RemoteError::Status(vec!["no such account".to_string()]))?;
        if account.password_hash != req.password_hash {
            return Err(RemoteError::Status(vec!["wrong password".to_string()]));
        }
        let public_key: [u8; 32] =
            account.public_key.clone().try_into().map_err(|_| RemoteError::MalformedResponse("bad key".into()))?;
        let challenge = challenge::issue(&public_key);
        let session_token = format!("session-{}-{}", account.user_id, state.tick());
        state.sessions.insert(session_token.clone(), req.email.clone());
        Ok(LoginResponse {
            user_id: account.user_id,
            session_token,
            server_public_key: vec![],
            enc_private_key: account.enc_private_key,
            challenge,
        })
    }

    async fn logout(&self, session_token: &str) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        state.sessions.remove(session_token);
        Ok(())
    }

    async fn check_key(&self, req: CheckKeyRequest) -> RemoteResult<CheckKeyResponse> {
        let state = self.state.lock().unwrap();
        let account = state
            .accounts_by_email
            .get(&req.email)
            .ok_or_else(|| RemoteError::Status(vec!["no such account".to_string()]))?;
        let public_key: [u8; 32] =
            account.public_key.clone().try_into().map_err(|_| RemoteError::MalformedResponse("bad key".into()))?;
        Ok(CheckKeyResponse { challenge: challenge::issue(&public_key), is_key_backed_up: true })
    }

    async fn change_pass(&self, req: ChangePassRequest) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        let email = Self::require_session(&state, &req.session_token)?;
        let account = state.accounts_by_email.get_mut(&email).expect("session implies account exists");
        if account.password_hash != req.old_password_hash {
            return Err(RemoteError::Status(vec!["wrong password".to_string()]));
        }
        account.password_hash = req.new_password_hash;
        account.salt = req.new_salt;
        account.enc_private_key = req.new_enc_private_key;
        Ok(())
    }

    async fn recover_account(&self, req: RecoverAccountRequest) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        let account = state
            .accounts_by_email
            .get_mut(&req.email)
            .ok_or_else(|| RemoteError::Status(vec!["no such account".to_string()]))?;
        account.password_hash = req.new_password_hash;
        account.salt = req.new_salt;
        account.public_key = req.new_public_key;
        account.enc_private_key = req.new_enc_private_key;
        Ok(())
    }

    async fn delete_user(&self, req: DeleteUserRequest) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        let email = Self::require_session(&state, &req.session_token)?;
        state.accounts_by_email.remove(&email);
        state.sessions.retain(|_, v| v != &email);
        Ok(())
    }

    async fn reupload_keys(&self, req: ReuploadKeysRequest) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        let email = Self::require_session(&state, &req.session_token)?;
        let account = state.accounts_by_email.get_mut(&email).expect("session implies account exists");
        account.public_key = req.public_key;
        account.enc_private_key = req.enc_private_key;
        Ok(())
    }

    async fn get_updates(&self, req: GetUpdatesRequest) -> RemoteResult<GetUpdatesResponse> {
        let state = self.state.lock().unwrap();
        Self::require_session(&state, &req.session_token)?;

        let albums: Vec<AlbumUpdate> = state.albums.values().cloned().collect();
        let files: Vec<FileUpdate> = state.files.values().cloned().collect();
        let deletes: Vec<DeleteEvent> = state.deletes.clone();

        Ok(GetUpdatesResponse {
            albums,
            files,
            contacts: vec![],
            deletes,
            cursors: UpdateCursors {
                gallery_files_ts: state.max_files_ts,
                trash_files_ts: state.max_files_ts,
                albums_ts: state.max_albums_ts,
                album_files_ts: state.max_files_ts,
                contacts_ts: 0,
                delete_ts: state.max_delete_ts,
            },
        })
    }

    async fn upload(&self, req: UploadRequest) -> RemoteResult<UploadResponse> {
        let mut state = self.state.lock().unwrap();
        Self::require_session(&state, &req.session_token)?;
        let ts = state.tick();
        state.files.insert(
            req.file.clone(),
            FileUpdate {
                file: req.file.clone(),
                set: req.set,
                album_id: req.album_id,
                version: req.version,
                date_created: req.date_created,
                date_modified: ts.to_string(),
                headers: req.headers,
            },
        );
        state.blobs.insert(req.file.clone(), (req.main_blob, req.thumb_blob));
        state.max_files_ts = state.max_files_ts.max(ts);
        Ok(UploadResponse { file: req.file })
    }

    async fn move_file(&self, req: MoveFileRequest) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::require_session(&state, &req.session_token)?;
        let ts = state.tick();
        if let Some(entry) = state.files.get_mut(&req.file) {
            entry.set = req.to_set;
            entry.album_id = req.to_album_id;
            entry.date_modified = ts.to_string();
            if let Some(headers) = req.headers {
                entry.headers = headers;
            }
        }
        state.max_files_ts = state.max_files_ts.max(ts);
        Ok(())
    }

    async fn delete(&self, req: DeleteRequest) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::require_session(&state, &req.session_token)?;
        let ts = state.tick();
        state.files.remove(&req.file);
        state.blobs.remove(&req.file);
        state
            .deletes
            .push(DeleteEvent { identifier: req.file, set: req.set, date: ts.to_string(), is_album: false });
        state.max_delete_ts = state.max_delete_ts.max(ts);
        Ok(())
    }

    async fn download(&self, req: DownloadRequest) -> RemoteResult<DownloadResponse> {
        let state = self.state.lock().unwrap();
        Self::require_session(&state, &req.session_token)?;
        let (main, thumb) = state
            .blobs
            .get(&req.file)
            .ok_or_else(|| RemoteError::Status(vec![format!("no such blob {}", req.file)]))?;
        let data = if req.thumb { thumb.clone() } else { main.clone() };
        Ok(DownloadResponse { data })
    }

    async fn add_album(&self, req: AddAlbumRequest) -> RemoteResult<AddAlbumResponse> {
        let mut state = self.state.lock().unwrap();
        Self::require_session(&state, &req.session_token)?;
        let ts = state.tick();
        state.albums.insert(
            req.album_id.clone(),
            AlbumUpdate {
                album_id: req.album_id.clone(),
                date_modified: ts.to_string(),
                public_key: req.public_key,
                enc_private_key: req.enc_private_key,
                member_keys: HashMap::new(),
                metadata: req.metadata,
                is_owner: true,
                is_shared: false,
                is_hidden: false,
                is_locked: false,
                permissions: "0111".to_string(),
                members: vec![],
            },
        );
        state.max_albums_ts = state.max_albums_ts.max(ts);
        Ok(AddAlbumResponse { album_id: req.album_id })
    }

    async fn delete_album(&self, req: DeleteAlbumRequest) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::require_session(&state, &req.session_token)?;
        let ts = state.tick();
        state.albums.remove(&req.album_id);
        state
            .deletes
            .push(DeleteEvent { identifier: req.album_id, set: "album".to_string(), date: ts.to_string(), is_album: true });
        state.max_delete_ts = state.max_delete_ts.max(ts);
        Ok(())
    }

    async fn rename_album(&self, req: RenameAlbumRequest) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::require_session(&state, &req.session_token)?;
        let ts = state.tick();
        if let Some(album) = state.albums.get_mut(&req.album_id) {
            album.metadata = req.metadata;
            album.date_modified = ts.to_string();
        }
        state.max_albums_ts = state.max_albums_ts.max(ts);
        Ok(())
    }

    async fn edit_perms(&self, req: EditPermsRequest) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::require_session(&state, &req.session_token)?;
        let ts = state.tick();
        if let Some(album) = state.albums.get_mut(&req.album_id) {
            album.permissions = req.permissions;
            album.date_modified = ts.to_string();
        }
        state.max_albums_ts = state.max_albums_ts.max(ts);
        Ok(())
    }

    async fn share(&self, req: ShareRequest) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::require_session(&state, &req.session_token)?;
        let ts = state.tick();
        if let Some(album) = state.albums.get_mut(&req.album_id) {
            album.is_shared = true;
            for (id, key) in req.member_keys {
                album.member_keys.insert(id, key);
                if !album.members.contains(&id) {
                    album.members.push(id);
                }
            }
            album.permissions = req.permissions;
            album.date_modified = ts.to_string();
        }
        state.max_albums_ts = state.max_albums_ts.max(ts);
        Ok(())
    }

    async fn unshare_album(&self, req: UnshareAlbumRequest) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::require_session(&state, &req.session_token)?;
        if let Some(album) = state.albums.get_mut(&req.album_id) {
            album.is_shared = false;
            album.member_keys.clear();
            album.members.clear();
        }
        Ok(())
    }

    async fn leave_album(&self, req: LeaveAlbumRequest) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        let email = Self::require_session(&state, &req.session_token)?;
        let user_id = state.accounts_by_email.get(&email).map(|a| a.user_id);
        if let (Some(album), Some(user_id)) = (state.albums.get_mut(&req.album_id), user_id) {
            album.members.retain(|m| *m != user_id);
            album.member_keys.remove(&user_id);
        }
        Ok(())
    }

    async fn remove_album_member(&self, req: RemoveAlbumMemberRequest) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::require_session(&state, &req.session_token)?;
        if let Some(album) = state.albums.get_mut(&req.album_id) {
            album.members.retain(|m| *m != req.member_user_id);
            album.member_keys.remove(&req.member_user_id);
        }
        Ok(())
    }

    async fn get_contact(&self, req: GetContactRequest) -> RemoteResult<GetContactResponse> {
        let state = self.state.lock().unwrap();
        Self::require_session(&state, &req.session_token)?;
        let account = state
            .accounts_by_email
            .get(&req.email)
            .ok_or_else(|| RemoteError::Status(vec!["no such contact".to_string()]))?;
        Ok(GetContactResponse { user_id: account.user_id, public_key: account.public_key.clone() })
    }
}

/// A [`ThumbnailSource`] stub returning fixed bytes, for tests that don't
/// care about real thumbnail generation.
pub struct FixedThumbnail {
    pub bytes: Vec<u8>,
    pub duration: Option<u32>,
}

impl Default for FixedThumbnail {
    fn default() -> Self {
        FixedThumbnail { bytes: vec![0xAA; 16], duration: None }
    }
}

impl ThumbnailSource for FixedThumbnail {
    fn generate(&self, _source_path: &std::path::Path, _file_type: FileType) -> vault_model::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }

    fn video_duration_secs(&self, _source_path: &std::path::Path) -> vault_model::Result<Option<u32>> {
        Ok(self.duration)
    }
}

/// A `vault::VaultConfig` suitable for tests: `test_mode` reduces KDF cost
/// so the whole suite runs fast.
pub fn test_config(data_dir: impl Into<std::path::PathBuf>) -> vault::VaultConfig {
    let mut config = vault::VaultConfig::new(data_dir);
    config.test_mode = true;
    config
}
