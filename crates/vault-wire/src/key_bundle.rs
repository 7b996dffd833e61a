//! Key bundle: the opaque blob the server stores for a user's public key
//! and, optionally, their passphrase-wrapped secret key (so the secret key
//! can be recovered on a new device without re-deriving it from the
//! mnemonic). Layout: a version byte, the 32-byte public key, a presence
//! flag, and — when present — a 4-byte length-prefixed wrapped secret key
//! blob (produced by [`crate::sealed_box`] callers or by
//! `vault_crypto::wrapped_key`, opaque to this module either way).

use crate::error::{Result, WireError};
use crate::sealed_box::PUBLIC_KEY_LEN;

const VERSION: u8 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyBundle {
    pub public_key: [u8; PUBLIC_KEY_LEN],
    pub wrapped_secret_key: Option<Vec<u8>>,
}

pub fn pack(bundle: &KeyBundle) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(VERSION);
    out.extend_from_slice(&bundle.public_key);
    match &bundle.wrapped_secret_key {
        Some(wrapped) => {
            out.push(1);
            out.extend_from_slice(&(wrapped.len() as u32).to_be_bytes());
            out.extend_from_slice(wrapped);
        }
        None => out.push(0),
    }
    out
}

pub fn unpack(data: &[u8]) -> Result<KeyBundle> {
    if data.is_empty() || data[0] != VERSION {
        return Err(WireError::MalformedKeyBundle("unsupported version".into()));
    }
    if data.len() < 1 + PUBLIC_KEY_LEN + 1 {
        return Err(WireError::MalformedKeyBundle("truncated".into()));
    }
    let mut public_key = [0u8; PUBLIC_KEY_LEN];
    public_key.copy_from_slice(&data[1..1 + PUBLIC_KEY_LEN]);

    let has_secret_pos = 1 + PUBLIC_KEY_LEN;
    let wrapped_secret_key = if data[has_secret_pos] == 1 {
        let len_pos = has_secret_pos + 1;
        if data.len() < len_pos + 4 {
            return Err(WireError::MalformedKeyBundle("truncated length".into()));
        }
        let len = u32::from_be_bytes(data[len_pos..len_pos + 4].try_into().unwrap()) as usize;
        let body_pos = len_pos + 4;
        if data.len() < body_pos + len {
            return Err(WireError::MalformedKeyBundle("truncated wrapped key".into()));
        }
        Some(data[body_pos..body_pos + len].to_vec())
    } else {
        None
    };

    Ok(KeyBundle { public_key, wrapped_secret_key })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_without_secret() {
        let bundle = KeyBundle { public_key: [7u8; 32], wrapped_secret_key: None };
        let packed = pack(&bundle);
        assert_eq!(unpack(&packed).unwrap(), bundle);
    }

    #[test]
    fn roundtrip_with_secret() {
        let bundle = KeyBundle { public_key: [7u8; 32], wrapped_secret_key: Some(vec![1, 2, 3, 4, 5]) };
        let packed = pack(&bundle);
        assert_eq!(unpack(&packed).unwrap(), bundle);
    }
}
