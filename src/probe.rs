//! Probe sequences shared by every lookup, placement and drain path.
//!
//! A sequence is a pure function of `(policy, hash, capacity)`, so insert,
//! remove, find, update and the migration drain all agree on where a key
//! can live.

/// Modulus of the double-hash step. Independent of table capacity.
pub const DOUBLE_HASH_MODULUS: u64 = 11;

/// Collision policy of one table generation.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum ProbePolicy {
    /// Attempt `i` visits `(base + i²) mod capacity`.
    #[default]
    Quadratic,
    /// Attempt `i` visits `(base + i·step) mod capacity` with
    /// `step = 11 − (hash mod 11)`.
    DoubleHash,
}

impl ProbePolicy {
    /// Slot visited on `attempt` (0 is the home slot). `capacity` must be
    /// non-zero; [`sequence`](Self::sequence) is the public entry point.
    #[inline]
    pub(crate) fn index(self, hash: u64, capacity: usize, attempt: usize) -> usize {
        let cap = capacity as u64;
        let base = hash % cap;
        let i = attempt as u64 % cap;
        let offset = match self {
            ProbePolicy::Quadratic => i * i % cap,
            ProbePolicy::DoubleHash => i * double_hash_step(hash, cap) % cap,
        };
        ((base + offset) % cap) as usize
    }

    /// The full sequence of `capacity` attempts for `hash`.
    pub fn sequence(self, hash: u64, capacity: usize) -> ProbeSeq {
        ProbeSeq {
            policy: self,
            hash,
            capacity,
            attempt: 0,
        }
    }
}

/// Double-hash stride, reduced modulo `capacity`.
///
/// `11 − (hash mod 11)` lies in `1..=11` and so is never zero by itself, but
/// it vanishes modulo a capacity that divides it, which would pin the probe
/// to the home slot. A stride of 1 is substituted in that case. Prime
/// capacities above 11 never hit it.
#[inline]
pub(crate) fn double_hash_step(hash: u64, capacity: u64) -> u64 {
    let step = (DOUBLE_HASH_MODULUS - hash % DOUBLE_HASH_MODULUS) % capacity;
    if step == 0 {
        1
    } else {
        step
    }
}

/// Iterator over the slot indices of one probe sequence.
#[derive(Clone, Debug)]
pub struct ProbeSeq {
    policy: ProbePolicy,
    hash: u64,
    capacity: usize,
    attempt: usize,
}

impl Iterator for ProbeSeq {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.attempt >= self.capacity {
            return None;
        }
        let idx = self.policy.index(self.hash, self.capacity, self.attempt);
        self.attempt += 1;
        Some(idx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.capacity.saturating_sub(self.attempt);
        (rest, Some(rest))
    }
}

impl ExactSizeIterator for ProbeSeq {}
