//! Account lifecycle: `create_account`, `login`, `logout`,
//! `backup_phrase`, `delete_account`, `wipe_account`. The login/
//! session-establishment sequence is built around the vault's two-key
//! scheme: a local, password-derived master key guarding on-disk
//! records, and a remote-facing account keypair.

use rand_core::{OsRng, RngCore};

use vault_crypto::{aead, masterkey};
use vault_remote::dto::{
    CreateAccountRequest, DeleteUserRequest, LoginRequest, PreLoginRequest,
};
use vault_wire::{challenge, mnemonic, password_hash, sealed_box};

use crate::error::{Result, VaultError};
use crate::session::LoggedInState;
use crate::Vault;

const MASTER_KEY_RECORD: &str = "master.key";

fn random_salt_hex() -> String {
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    hex::encode(salt)
}

impl Vault {
    /// Create a new account: generate a local master key protected by
    /// `password`, a fresh account keypair, register the account with
    /// the remote, then log in to establish a session.
    pub async fn create_account(&self, email: &str, password: &str) -> Result<u64> {
        {
            let state = self.state.read().await;
            if state.master.is_some() {
                return Err(VaultError::AlreadyInitialized);
            }
        }
        if self.storage.backend().exists(MASTER_KEY_RECORD).await? {
            return Err(VaultError::AlreadyInitialized);
        }

        let file = if self.config.test_mode {
            masterkey::generate_for_tests(password.as_bytes(), self.config.crypto_version)?
        } else {
            masterkey::generate(password.as_bytes(), self.config.crypto_version)?
        };
        self.storage.backend().create_exclusive(MASTER_KEY_RECORD, &file).await?;
        let masked = masterkey::open(password.as_bytes(), &file)?;

        let keypair = sealed_box::generate_keypair();
        let salt = random_salt_hex();
        let iterations_hash = if self.config.test_mode {
            password_hash::login_hash_for_tests(password, salt.as_bytes())
        } else {
            password_hash::login_hash(password, salt.as_bytes())
        };

        let enc_private_key = {
            let exposed = masked.unmask();
            aead::encrypt(self.config.crypto_version, exposed.as_ref(), &keypair.secret)?
        };

        let response = self
            .remote
            .create_account(CreateAccountRequest {
                email: email.to_string(),
                password_hash: iterations_hash,
                salt,
                public_key: keypair.public.to_vec(),
                enc_private_key,
            })
            .await?;

        {
            let mut state = self.state.write().await;
            state.master = Some(masked);
        }

        self.login(email, password).await?;
        Ok(response.user_id)
    }

    /// Log in: open the local master key (if not already open), exchange
    /// credentials with the remote, recover the account secret key, and
    /// prove possession of it via the login challenge.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let masked = {
            let state = self.state.read().await;
            state.master.is_some()
        };
        if !masked {
            if !self.storage.backend().exists(MASTER_KEY_RECORD).await? {
                return Err(VaultError::NotInitialized);
            }
            let file = self.storage.backend().read(MASTER_KEY_RECORD).await?;
            let opened = masterkey::open(password.as_bytes(), &file)?;
            let mut state = self.state.write().await;
            state.master = Some(opened);
        }

        // The master key is unlocked now, so any pending-ops manifest a
        // prior crashed session left sealed can finally be read back.
        {
            let state = self.state.read().await;
            let master = state.master()?.unmask();
            self.storage.recover_pending_with_key(&master, self.config.crypto_version).await?;
        }

        let pre = self
            .remote
            .pre_login(PreLoginRequest { email: email.to_string() })
            .await?;
        let salt_bytes = hex::decode(&pre.salt).map_err(|e| VaultError::InvalidArgument(e.to_string()))?;
        let login_hash = if self.config.test_mode {
            password_hash::login_hash_for_tests(password, &salt_bytes)
        } else {
            password_hash::login_hash(password, &salt_bytes)
        };

        let response = self
            .remote
            .login(LoginRequest { email: email.to_string(), password_hash: login_hash })
            .await?;

        let secret_key: [u8; 32] = {
            let state = self.state.read().await;
            let master = state.master()?.unmask();
            let clear = aead::decrypt(master.as_ref(), &response.enc_private_key)?;
            clear
                .try_into()
                .map_err(|_| VaultError::InvalidArgument("malformed account secret key".into()))?
        };
        let public_key = sealed_box::public_from_secret(&secret_key);

        // Proves we hold the matching secret key; the server-side
        // verification path is out of scope for this crate.
        challenge::respond(&secret_key, &response.challenge)?;

        {
            let mut state = self.state.write().await;
            state.account = Some(LoggedInState {
                user_id: response.user_id,
                email: email.to_string(),
                session_token: response.session_token,
                password_salt: pre.salt.clone(),
                public_key,
                secret_key,
            });
        }

        let (album_list, file_sets, contacts) = self.load_state().await?;
        {
            let mut state = self.state.write().await;
            state.album_list = album_list;
            state.file_sets = file_sets;
            state.contacts = contacts;
        }
        Ok(())
    }

    /// End the remote session and drop all in-memory key material.
    pub async fn logout(&self) -> Result<()> {
        let token = {
            let state = self.state.read().await;
            state.account()?.session_token.clone()
        };
        self.remote.logout(&token).await?;
        let mut state = self.state.write().await;
        state.account = None;
        state.master = None;
        Ok(())
    }

    /// Recover the account's secret key as a 24-word mnemonic phrase, for
    /// offline backup.
    pub async fn backup_phrase(&self) -> Result<String> {
        let state = self.state.read().await;
        let account = state.account()?;
        Ok(mnemonic::encode(&account.secret_key))
    }

    /// Delete the account on the remote, then wipe local state.
    pub async fn delete_account(&self, password: &str) -> Result<()> {
        let (token, password_hash_hex) = {
            let state = self.state.read().await;
            let account = state.account()?;
            let salt_bytes =
                hex::decode(&account.password_salt).map_err(|e| VaultError::InvalidArgument(e.to_string()))?;
            let hash = if self.config.test_mode {
                password_hash::login_hash_for_tests(password, &salt_bytes)
            } else {
                password_hash::login_hash(password, &salt_bytes)
            };
            (account.session_token.clone(), hash)
        };
        self.remote
            .delete_user(DeleteUserRequest { session_token: token, password_hash: password_hash_hex })
            .await?;
        self.wipe_account().await
    }

    /// Local-only best-effort teardown: drop the local master key record
    /// and clear in-memory state, without attempting to scrub every
    /// already-hashed on-disk record (judgment call, see
    /// `DESIGN.md`).
    pub async fn wipe_account(&self) -> Result<()> {
        self.storage.backend().delete(MASTER_KEY_RECORD).await?;
        let mut state = self.state.write().await;
        *state = crate::session::VaultState::default();
        Ok(())
    }
}
