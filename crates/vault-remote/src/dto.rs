//! Request/response DTOs for every endpoint in [`crate::RemoteApi`],
//! shaped after the Stingle wire protocol: one plain serde struct per
//! operation rather than a shared generic request/response type.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub public_key: Vec<u8>,
    pub enc_private_key: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateAccountResponse {
    pub user_id: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PreLoginRequest {
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PreLoginResponse {
    pub salt: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password_hash: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: u64,
    pub session_token: String,
    pub server_public_key: Vec<u8>,
    pub enc_private_key: Vec<u8>,
    pub challenge: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckKeyRequest {
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckKeyResponse {
    pub challenge: Vec<u8>,
    pub is_key_backed_up: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChangePassRequest {
    pub session_token: String,
    pub old_password_hash: String,
    pub new_password_hash: String,
    pub new_salt: String,
    pub new_enc_private_key: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecoverAccountRequest {
    pub email: String,
    pub new_password_hash: String,
    pub new_salt: String,
    pub new_public_key: Vec<u8>,
    pub new_enc_private_key: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteUserRequest {
    pub session_token: String,
    pub password_hash: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReuploadKeysRequest {
    pub session_token: String,
    pub public_key: Vec<u8>,
    pub enc_private_key: Vec<u8>,
}

/// The six cursors `GetUpdates` sends: last-seen timestamps
/// for gallery files, trash files, albums, album-files, contacts, and the
/// max of last-seen delete timestamps across all sets.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct UpdateCursors {
    pub gallery_files_ts: u64,
    pub trash_files_ts: u64,
    pub albums_ts: u64,
    pub album_files_ts: u64,
    pub contacts_ts: u64,
    pub delete_ts: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetUpdatesRequest {
    pub session_token: String,
    pub cursors: UpdateCursors,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlbumUpdate {
    pub album_id: String,
    pub date_modified: String,
    pub public_key: Vec<u8>,
    pub enc_private_key: Vec<u8>,
    pub member_keys: HashMap<u64, Vec<u8>>,
    pub metadata: Vec<u8>,
    pub is_owner: bool,
    pub is_shared: bool,
    pub is_hidden: bool,
    pub is_locked: bool,
    pub permissions: String,
    pub members: Vec<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileUpdate {
    pub file: String,
    pub set: String,
    pub album_id: Option<String>,
    pub version: String,
    pub date_created: String,
    pub date_modified: String,
    pub headers: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContactUpdate {
    pub email: String,
    pub user_id: u64,
    pub public_key: Vec<u8>,
    pub date_modified: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteEvent {
    pub identifier: String,
    pub set: String,
    pub date: String,
    pub is_album: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GetUpdatesResponse {
    pub albums: Vec<AlbumUpdate>,
    pub files: Vec<FileUpdate>,
    pub contacts: Vec<ContactUpdate>,
    pub deletes: Vec<DeleteEvent>,
    pub cursors: UpdateCursors,
}

/// The multipart body is two blobs (main + thumb) followed by metadata
/// fields: blob ordering before metadata fields is part of the wire
/// contract and must not be reordered. `main_blob`/`thumb_blob` are
/// streamed by a real transport; here they're plain byte buffers since
/// transport itself is out of scope for this crate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadRequest {
    pub session_token: String,
    pub file: String,
    pub set: String,
    pub album_id: Option<String>,
    pub version: String,
    pub date_created: String,
    pub date_modified: String,
    pub headers: Vec<u8>,
    pub main_blob: bytes::Bytes,
    pub thumb_blob: bytes::Bytes,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MoveFileRequest {
    pub session_token: String,
    pub file: String,
    pub from_set: String,
    pub from_album_id: Option<String>,
    pub to_set: String,
    pub to_album_id: Option<String>,
    pub headers: Option<Vec<u8>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub session_token: String,
    pub file: String,
    pub set: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub session_token: String,
    pub file: String,
    pub thumb: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub data: bytes::Bytes,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddAlbumRequest {
    pub session_token: String,
    pub album_id: String,
    pub public_key: Vec<u8>,
    pub enc_private_key: Vec<u8>,
    pub metadata: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddAlbumResponse {
    pub album_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteAlbumRequest {
    pub session_token: String,
    pub album_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RenameAlbumRequest {
    pub session_token: String,
    pub album_id: String,
    pub metadata: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EditPermsRequest {
    pub session_token: String,
    pub album_id: String,
    pub permissions: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShareRequest {
    pub session_token: String,
    pub album_id: String,
    pub member_emails: Vec<String>,
    pub member_keys: HashMap<u64, Vec<u8>>,
    pub permissions: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnshareAlbumRequest {
    pub session_token: String,
    pub album_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeaveAlbumRequest {
    pub session_token: String,
    pub album_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoveAlbumMemberRequest {
    pub session_token: String,
    pub album_id: String,
    pub member_user_id: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetContactRequest {
    pub session_token: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetContactResponse {
    pub user_id: u64,
    pub public_key: Vec<u8>,
}
