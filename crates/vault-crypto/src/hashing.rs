//! Deterministic hashing derived from key material.
//!
//! Used by `vault-storage` to turn a record name into an obfuscated,
//! deterministic filesystem path: callers hash arbitrary bytes under the
//! master key's second half.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::keyhygiene::{ExposedKey, KEY_LEN};

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over `data`, keyed by bytes `32..64` of the exposed key
/// material.
pub fn hash(key: &ExposedKey, data: &[u8]) -> [u8; 32] {
    let bytes = key.as_bytes();
    let half = &bytes[KEY_LEN / 2..];
    let mut mac = <HmacSha256 as Mac>::new_from_slice(half).expect("HMAC accepts any key length");
    mac.update(data);
    let out = mac.finalize().into_bytes();
    let mut result = [0u8; 32];
    result.copy_from_slice(&out);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyhygiene::MaskedKey;

    #[test]
    fn deterministic_for_same_input() {
        let masked = MaskedKey::new([3u8; KEY_LEN]);
        let key = masked.unmask();
        let a = hash(&key, b"gallery/image000.jpg");
        let b = hash(&key, b"gallery/image000.jpg");
        assert_eq!(a, b);
    }

    #[test]
    fn differs_for_different_input() {
        let masked = MaskedKey::new([3u8; KEY_LEN]);
        let key = masked.unmask();
        let a = hash(&key, b"gallery/image000.jpg");
        let b = hash(&key, b"gallery/image001.jpg");
        assert_ne!(a, b);
    }

    #[test]
    fn differs_for_different_key() {
        let k1 = MaskedKey::new([3u8; KEY_LEN]).unmask();
        let k2 = MaskedKey::new([9u8; KEY_LEN]).unmask();
        assert_ne!(hash(&k1, b"x"), hash(&k2, b"x"));
    }
}
