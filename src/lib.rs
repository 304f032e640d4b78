//! car-db: a single-threaded, open-addressing car inventory table with
//! incremental (pay-as-you-go) rehashing.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: resize without ever stopping the world. A full or
//!   tombstone-polluted table is not rebuilt in one call; it is retired and
//!   drained a bounded chunk at a time by the calls that follow.
//! - Layers:
//!   - `probe`: pure probe-sequence functions (quadratic or double hashing)
//!     shared by every path that looks for a slot.
//!   - `Generation`: one prime-sized slot array (empty / occupied /
//!     tombstone) with its live and tombstone counts and its own policy.
//!   - `CarDb<S>`: owns a `current` generation and, while migrating, an
//!     `old` one; runs the resize triggers and the drain.
//!
//! Constraints
//! - Single-threaded: `CarDb` is `Send` but not `Sync`.
//! - Record identity is `(model, dealer)`; quantity is payload and is
//!   ignored by equality, hashing and duplicate detection.
//! - A `(model, dealer)` is live in at most one slot across both
//!   generations.
//! - Capacities are prime and within `[MIN_CAPACITY, MAX_CAPACITY]`;
//!   growth past the ceiling pins there instead of failing.
//! - Reentrancy: the user's `BuildHasher` must not call back into the same
//!   table; debug builds panic if it does.
//!
//! Resize triggers
//! - After an insert: (live + tombstones) / capacity > 0.5.
//! - After a remove that hit `current`: tombstones / live > 0.8.
//! - Neither fires while a migration is in flight. The next generation is
//!   sized at the smallest prime >= 4 × live.
//!
//! Migration
//! - The split moves `current` into `old` as-is and allocates a fresh
//!   `current`. Each later insert, and each remove that hits `current`,
//!   moves `max(1, live_at_split / 4)` records out of `old`, so the old
//!   generation is gone after a handful of calls.
//! - Lookups, updates and removals fall through to `old` on a miss, each
//!   generation probed with its own capacity and policy.
//! - `change_probing_policy` only affects the generation born at the next
//!   split.
//!
//! Errors
//! - Fallible operations return [`Result`] with an [`Error`] that tells
//!   duplicates, misses and invalid input apart. No operation leaves the
//!   table partially modified on failure.
//!
//! Logging
//! - Migration start and retirement are `tracing` debug events; drain steps
//!   are trace events; pinning at the capacity ceiling warns. The crate
//!   never installs a subscriber.

mod car;
mod car_db;
mod car_db_proptest;
mod error;
mod generation;
pub mod hash;
mod prime;
pub mod probe;
mod reentrancy;

// Public surface
pub use car::{Car, MAX_DEALER_ID, MIN_DEALER_ID};
pub use car_db::{
    CarDb, Dump, DRAIN_DIVISOR, GROWTH_FACTOR, MAX_DELETED_RATIO, MAX_LOAD_FACTOR,
};
pub use error::{Error, Result};
pub use hash::Textbook33;
pub use prime::{capacity_for, is_prime, MAX_CAPACITY, MIN_CAPACITY};
pub use probe::{ProbePolicy, DOUBLE_HASH_MODULUS};
