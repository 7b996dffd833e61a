//! Remote facade: the Stingle-compatible wire contract as
//! an `async_trait`, with no transport implementation — HTTP transport
//! is an external collaborator. One plain DTO type per endpoint plus a
//! flat error enum; `reqwest` dropped (see `DESIGN.md`) since this crate
//! only describes the contract a transport would implement.

pub mod dto;
pub mod envelope;
pub mod error;

pub use envelope::Envelope;
pub use error::{RemoteError, Result};

use async_trait::async_trait;
use dto::*;

/// Every sync-relevant endpoint the core consumes, as an async trait so
/// `vault-sync` can depend on it without knowing whether calls go out
/// over HTTP or are served by a test double.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn create_account(&self, req: CreateAccountRequest) -> Result<CreateAccountResponse>;
    async fn pre_login(&self, req: PreLoginRequest) -> Result<PreLoginResponse>;
    async fn login(&self, req: LoginRequest) -> Result<LoginResponse>;
    async fn logout(&self, session_token: &str) -> Result<()>;
    async fn check_key(&self, req: CheckKeyRequest) -> Result<CheckKeyResponse>;
    async fn change_pass(&self, req: ChangePassRequest) -> Result<()>;
    async fn recover_account(&self, req: RecoverAccountRequest) -> Result<()>;
    async fn delete_user(&self, req: DeleteUserRequest) -> Result<()>;
    async fn reupload_keys(&self, req: ReuploadKeysRequest) -> Result<()>;

    async fn get_updates(&self, req: GetUpdatesRequest) -> Result<GetUpdatesResponse>;
    async fn upload(&self, req: UploadRequest) -> Result<UploadResponse>;
    async fn move_file(&self, req: MoveFileRequest) -> Result<()>;
    async fn delete(&self, req: DeleteRequest) -> Result<()>;
    async fn download(&self, req: DownloadRequest) -> Result<DownloadResponse>;
    async fn add_album(&self, req: AddAlbumRequest) -> Result<AddAlbumResponse>;
    async fn delete_album(&self, req: DeleteAlbumRequest) -> Result<()>;
    async fn rename_album(&self, req: RenameAlbumRequest) -> Result<()>;
    async fn edit_perms(&self, req: EditPermsRequest) -> Result<()>;
    async fn share(&self, req: ShareRequest) -> Result<()>;
    async fn unshare_album(&self, req: UnshareAlbumRequest) -> Result<()>;
    async fn leave_album(&self, req: LeaveAlbumRequest) -> Result<()>;
    async fn remove_album_member(&self, req: RemoveAlbumMemberRequest) -> Result<()>;
    async fn get_contact(&self, req: GetContactRequest) -> Result<GetContactResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_roundtrips_through_json() {
        let env = Envelope {
            status: "ok".to_string(),
            parts: Some(CreateAccountResponse { user_id: 7 }),
            infos: None,
            errors: None,
        };
        let json = serde_json::to_string(&env).unwrap();
        let back: Envelope<CreateAccountResponse> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.into_result().unwrap().user_id, 7);
    }
}
