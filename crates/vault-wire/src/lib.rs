//! Wire-compatible primitives for interoperating with the remote server:
//! the login password hash, album-metadata and file-header sealing, key
//! bundles, mnemonic key encoding, and the login challenge — all built
//! on a sealed-box primitive, shaped to the tagged structures the
//! remote protocol expects.

pub mod album_meta;
pub mod challenge;
pub mod error;
pub mod file_header;
pub mod key_bundle;
pub mod mnemonic;
pub mod password_hash;
pub mod sealed_box;

pub use error::{Result, WireError};
pub use sealed_box::{KeyPair, PUBLIC_KEY_LEN, SECRET_KEY_LEN};
