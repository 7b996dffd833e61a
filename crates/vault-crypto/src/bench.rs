//! Startup algorithm selection: a startup self-test encrypts 20 MiB in
//! memory with each AEAD family and selects the faster.

use std::time::Instant;

use crate::aead::{self, Version};

const BENCH_SIZE: usize = 20 * 1024 * 1024;

/// Encrypt a 20 MiB buffer with both AEAD families and return whichever
/// version was faster. Intended to be called once at startup and the
/// result recorded alongside a newly generated master key.
pub fn select_fastest() -> Version {
    let key = vec![0x5au8; 64];
    let data = vec![0u8; BENCH_SIZE];

    let v1_elapsed = {
        let start = Instant::now();
        let _ = aead::encrypt(Version::V1, &key, &data);
        start.elapsed()
    };
    let v2_elapsed = {
        let start = Instant::now();
        let _ = aead::encrypt(Version::V2, &key, &data);
        start.elapsed()
    };

    if v1_elapsed <= v2_elapsed {
        Version::V1
    } else {
        Version::V2
    }
}
