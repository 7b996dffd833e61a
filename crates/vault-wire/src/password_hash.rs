//! Deterministic login password hash: PBKDF2-HMAC-SHA256 over (password,
//! salt), rendered as uppercase hex — the form the remote expects in the
//! `password` field of `preLogin`/`login`/`changePass` calls.
//!
//! Grounded on `vault_crypto::masterkey`'s PBKDF2 derivation, with its own
//! fixed iteration count since the login hash and the master-key
//! derivation are independent KDF uses over the same passphrase and must
//! not collapse to the same output.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

const LOGIN_HASH_LEN: usize = 64;
const ITERATIONS_PROD: u32 = 64_000;
const ITERATIONS_TEST: u32 = 2;

fn hash_with_iterations(password: &[u8], salt: &[u8], iterations: u32) -> String {
    let mut out = [0u8; LOGIN_HASH_LEN];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut out);
    hex::encode_upper(out)
}

/// The password hash sent to the server for login.
pub fn login_hash(password: &str, salt: &[u8]) -> String {
    hash_with_iterations(password.as_bytes(), salt, ITERATIONS_PROD)
}

/// Same derivation at a drastically reduced cost, for unit tests.
pub fn login_hash_for_tests(password: &str, salt: &[u8]) -> String {
    hash_with_iterations(password.as_bytes(), salt, ITERATIONS_TEST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = login_hash_for_tests("hunter2", b"some-salt");
        let b = login_hash_for_tests("hunter2", b"some-salt");
        assert_eq!(a, b);
    }

    #[test]
    fn is_uppercase_hex() {
        let h = login_hash_for_tests("hunter2", b"salt");
        assert_eq!(h.len(), LOGIN_HASH_LEN * 2);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn different_salt_differs() {
        let a = login_hash_for_tests("hunter2", b"salt-a");
        let b = login_hash_for_tests("hunter2", b"salt-b");
        assert_ne!(a, b);
    }
}
