//! Bidirectional mapping between a 32-byte secret key and a BIP-39-style
//! word phrase, used for secret-key backup/recovery, via `bip39`.

use bip39::Mnemonic;

use crate::error::{Result, WireError};

/// Encode a 32-byte secret key as a 24-word BIP-39 mnemonic phrase.
pub fn encode(secret_key: &[u8; 32]) -> String {
    let mnemonic = Mnemonic::from_entropy(secret_key).expect("32 bytes is a valid BIP-39 entropy length");
    mnemonic.to_string()
}

/// Decode a mnemonic phrase back into its 32-byte secret key.
pub fn decode(phrase: &str) -> Result<[u8; 32]> {
    let mnemonic = Mnemonic::parse(phrase).map_err(|e| WireError::InvalidMnemonic(e.to_string()))?;
    let entropy = mnemonic.to_entropy();
    if entropy.len() != 32 {
        return Err(WireError::InvalidMnemonic(format!(
            "expected 32 bytes of entropy, got {}",
            entropy.len()
        )));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&entropy);
    Ok(out)
}
