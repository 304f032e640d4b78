//! Deterministic string hashing for reproducible tables.
//!
//! `Textbook33` is the classic multiply-by-33 string hash. It is not
//! DoS-resistant; use it for tests, benchmarks and inventories whose keys are
//! trusted. `CarDb::new` uses the standard `RandomState` instead.

use core::hash::{BuildHasher, Hasher};

/// `BuildHasher` for [`Textbook33Hasher`].
#[derive(Copy, Clone, Debug, Default)]
pub struct Textbook33;

impl BuildHasher for Textbook33 {
    type Hasher = Textbook33Hasher;

    fn build_hasher(&self) -> Self::Hasher {
        Textbook33Hasher(0)
    }
}

/// `h = h * 33 + byte` over every byte written, wrapping at 64 bits.
///
/// Hashing a `str` through `Hash` also feeds its `0xff` terminator byte.
#[derive(Copy, Clone, Debug, Default)]
pub struct Textbook33Hasher(u64);

impl Hasher for Textbook33Hasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.wrapping_mul(33).wrapping_add(u64::from(b));
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}
