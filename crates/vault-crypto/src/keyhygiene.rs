//! In-memory key hygiene: XOR-masked storage of live key material.
//!
//! The 64-byte key is never held in the clear except for the duration of
//! an `unmask()` call. A fresh random mask is drawn at construction; the
//! masked bytes and the mask both implement `ZeroizeOnDrop` so the clear
//! value cannot be recovered from a freed allocation.

use rand_core::{OsRng, RngCore};
use std::sync::atomic::{AtomicBool, Ordering};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const KEY_LEN: usize = 64;

/// A 64-byte key held XOR-masked in memory.
///
/// Construct with [`MaskedKey::new`]; read with [`MaskedKey::unmask`],
/// which returns a scope-limited [`ExposedKey`] guard that re-zeroizes on
/// drop. Call [`MaskedKey::wipe`] explicitly at every deliberate end of
/// life; relying on `Drop` alone is the fallback, not the plan.
///
/// `Drop` is implemented by hand rather than derived so it can also carry
/// the debug-mode unused-key audit.
pub struct MaskedKey {
    masked: [u8; KEY_LEN],
    mask: [u8; KEY_LEN],
    touched: AtomicBool,
}

impl MaskedKey {
    /// Mask and take ownership of `clear`. `clear` is zeroized in place.
    pub fn new(mut clear: [u8; KEY_LEN]) -> Self {
        let mut mask = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut mask);
        let mut masked = [0u8; KEY_LEN];
        for i in 0..KEY_LEN {
            masked[i] = clear[i] ^ mask[i];
        }
        clear.zeroize();
        MaskedKey {
            masked,
            mask,
            touched: AtomicBool::new(false),
        }
    }

    /// Unmask transiently. The returned guard zeroizes its clear copy when
    /// dropped.
    pub fn unmask(&self) -> ExposedKey {
        self.touched.store(true, Ordering::Relaxed);
        let mut clear = [0u8; KEY_LEN];
        for i in 0..KEY_LEN {
            clear[i] = self.masked[i] ^ self.mask[i];
        }
        ExposedKey(clear)
    }

    /// Explicit wipe. After this call the mask and masked bytes are zero;
    /// `unmask()` would yield all-zero key material, which is never a
    /// valid key, so accidental reuse is detectable rather than silent.
    pub fn wipe(&mut self) {
        self.masked.zeroize();
        self.mask.zeroize();
    }
}

impl Drop for MaskedKey {
    fn drop(&mut self) {
        if cfg!(debug_assertions) && !self.touched.load(Ordering::Relaxed) {
            tracing::warn!("MaskedKey dropped without ever being unmasked — likely dead key material");
        }
        self.masked.zeroize();
        self.mask.zeroize();
    }
}

/// A transiently-unmasked key. Zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct ExposedKey([u8; KEY_LEN]);

impl ExposedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for ExposedKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
