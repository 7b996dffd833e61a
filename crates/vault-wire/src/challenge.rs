//! Login challenge: the server seals a random nonce prefixed with
//! `"validkey_"` to the account's public key; only the holder of the
//! matching secret key can open it and echo the nonce back, proving
//! possession without ever transmitting the secret key itself.

use rand_core::{OsRng, RngCore};

use crate::error::{Result, WireError};
use crate::sealed_box::{self, PUBLIC_KEY_LEN, SECRET_KEY_LEN};

const CONTEXT: &str = "login-challenge";
const PREFIX: &[u8] = b"validkey_";
const NONCE_LEN: usize = 32;

/// Server side: build a challenge sealed to `public_key`.
pub fn issue(public_key: &[u8; PUBLIC_KEY_LEN]) -> Vec<u8> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    let mut plaintext = Vec::with_capacity(PREFIX.len() + NONCE_LEN);
    plaintext.extend_from_slice(PREFIX);
    plaintext.extend_from_slice(&nonce);
    sealed_box::seal(public_key, CONTEXT, &plaintext)
}

/// Client side: open `challenge` with the account's secret key and return
/// the proof bytes to send back, or `ChallengeFailed` if the prefix does
/// not match (wrong key, or a tampered/garbage challenge).
pub fn respond(secret_key: &[u8; SECRET_KEY_LEN], challenge: &[u8]) -> Result<Vec<u8>> {
    let plaintext = sealed_box::open(secret_key, CONTEXT, challenge)?;
    if !plaintext.starts_with(PREFIX) {
        return Err(WireError::ChallengeFailed);
    }
    Ok(plaintext)
}

/// Server side: verify the client's response proves possession.
pub fn verify(response: &[u8]) -> bool {
    response.starts_with(PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sealed_box::generate_keypair;

    #[test]
    fn correct_key_proves_possession() {
        let kp = generate_keypair();
        let challenge = issue(&kp.public);
        let response = respond(&kp.secret, &challenge).unwrap();
        assert!(verify(&response));
    }

    #[test]
    fn wrong_key_cannot_open() {
        let kp = generate_keypair();
        let other = generate_keypair();
        let challenge = issue(&kp.public);
        assert!(respond(&other.secret, &challenge).is_err());
    }
}
