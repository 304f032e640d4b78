//! CarDb: open-addressing car table with incremental rehashing.
//!
//! Two generations live side by side while a resize is in flight. `current`
//! receives every insert; `old` is the retired table being drained. Each
//! mutating call pays for a bounded slice of the move, so no single call
//! ever rebuilds the whole table.
//!
//! State machine:
//! - STABLE (`old == None`): inserts check the load factor, removals check
//!   the tombstone ratio. Either trigger retires `current` into `old` and
//!   allocates a fresh `current` sized from the live count.
//! - MIGRATING (`old == Some`): triggers are suppressed. Every insert and
//!   every remove that hits `current` runs one drain step, moving up to
//!   `quota` records out of `old`. The first drain step that finds `old`
//!   empty drops it and returns to STABLE.

use crate::car::Car;
use crate::error::{Error, Result};
use crate::generation::{Generation, Slot};
use crate::prime::{self, MAX_CAPACITY, MIN_CAPACITY};
use crate::probe::ProbePolicy;
use crate::reentrancy::DebugReentrancy;
use core::fmt;
use core::hash::BuildHasher;
use hashbrown::HashSet;
use std::collections::hash_map::RandomState;
use tracing::{debug, trace, warn};

/// Growth trigger: start a migration once (live + tombstones) / capacity
/// exceeds this.
pub const MAX_LOAD_FACTOR: f64 = 0.5;

/// Tombstone-pressure trigger: start a migration once tombstones / live
/// exceeds this.
pub const MAX_DELETED_RATIO: f64 = 0.8;

/// A new generation is sized at this multiple of the retiring live count.
pub const GROWTH_FACTOR: usize = 4;

/// Each drain step moves `live_at_split / DRAIN_DIVISOR` records (at least 1).
pub const DRAIN_DIVISOR: usize = 4;

/// A retired generation and the progress of draining it.
#[derive(Debug)]
struct Migration {
    table: Generation,
    /// Records moved per drain step, fixed at the split.
    quota: usize,
    /// Slots before this index hold no live record.
    cursor: usize,
}

/// Everything but the reentrancy guard, so that guarded entry points can
/// borrow the guard and mutate the tables at the same time.
struct Tables<S> {
    hasher: S,
    current: Generation,
    old: Option<Migration>,
    /// Policy for the generation born at the next split.
    next_policy: Option<ProbePolicy>,
}

impl<S: BuildHasher> Tables<S> {
    #[inline]
    fn hash(&self, model: &str) -> u64 {
        self.hasher.hash_one(model)
    }

    fn locate(&self, hash: u64, model: &str, dealer: u32) -> Option<&Car> {
        if let Some(idx) = self.current.position(hash, model, dealer) {
            return self.current.occupant(idx);
        }
        let old = &self.old.as_ref()?.table;
        old.position(hash, model, dealer).and_then(|idx| old.occupant(idx))
    }

    fn locate_mut(&mut self, hash: u64, model: &str, dealer: u32) -> Option<&mut Car> {
        if let Some(idx) = self.current.position(hash, model, dealer) {
            return self.current.occupant_mut(idx);
        }
        let old = &mut self.old.as_mut()?.table;
        let idx = old.position(hash, model, dealer)?;
        old.occupant_mut(idx)
    }

    fn insert(&mut self, car: Car) -> Result<()> {
        if car.is_empty() {
            return Err(Error::EmptyRecord);
        }
        let hash = self.hash(car.model());
        if self.locate(hash, car.model(), car.dealer()).is_some() {
            return Err(Error::DuplicateKey);
        }
        if self.current.insert(hash, car).is_err() {
            return Err(Error::ProbeExhausted {
                capacity: self.current.capacity(),
            });
        }
        if self.old.is_none() && self.current.load_factor() > MAX_LOAD_FACTOR {
            self.begin_migration("load_factor");
        }
        self.drain_step();
        Ok(())
    }

    fn remove(&mut self, car: &Car) -> Result<()> {
        if car.is_empty() {
            return Err(Error::EmptyRecord);
        }
        let hash = self.hash(car.model());
        if let Some(idx) = self.current.position(hash, car.model(), car.dealer()) {
            self.current.bury(idx);
            if self.old.is_none() && self.current.deleted_ratio() > MAX_DELETED_RATIO {
                self.begin_migration("deleted_ratio");
            }
            self.drain_step();
            return Ok(());
        }
        // A hit in the old generation is only tombstoned: it is already
        // draining, so no trigger check and no drain step.
        if let Some(migration) = self.old.as_mut() {
            if let Some(idx) = migration.table.position(hash, car.model(), car.dealer()) {
                migration.table.bury(idx);
                return Ok(());
            }
        }
        Err(Error::NotFound)
    }

    /// Retires `current` into `old` and allocates the next generation.
    fn begin_migration(&mut self, trigger: &'static str) {
        debug_assert!(self.old.is_none(), "migration already in flight");
        let policy = self.next_policy.take().unwrap_or(self.current.policy());
        let live = self.current.live();
        let capacity = prime::capacity_for(live.saturating_mul(GROWTH_FACTOR));
        let retired = core::mem::replace(&mut self.current, Generation::new(capacity, policy));
        let quota = (live / DRAIN_DIVISOR).max(1);
        debug!(
            trigger,
            old_capacity = retired.capacity(),
            new_capacity = capacity,
            live,
            tombstones = retired.tombstones(),
            quota,
            policy = ?policy,
            "starting incremental migration"
        );
        self.old = Some(Migration {
            table: retired,
            quota,
            cursor: 0,
        });
    }

    /// One bounded unit of migration work.
    fn drain_step(&mut self) {
        let Some(migration) = self.old.as_mut() else {
            return;
        };
        if migration.table.live() == 0 {
            debug!(
                capacity = migration.table.capacity(),
                "old generation drained; retiring it"
            );
            self.old = None;
            return;
        }

        let mut moved = 0;
        while moved < migration.quota && migration.cursor < migration.table.capacity() {
            let idx = migration.cursor;
            if let Some(car) = migration.table.occupant(idx) {
                let hash = self.hasher.hash_one(car.model());
                let Some(dest) = self.current.vacancy(hash) else {
                    warn!(
                        capacity = self.current.capacity(),
                        live = self.current.live(),
                        "no free slot for a migrating record; drain paused"
                    );
                    break;
                };
                if let Some(car) = migration.table.bury(idx) {
                    self.current.place(dest, car.clone());
                }
                moved += 1;
            }
            migration.cursor += 1;
        }
        trace!(moved, remaining = migration.table.live(), "drain step");
    }
}

/// Car inventory table with incremental rehashing.
///
/// `S` is the externally supplied string hash. [`CarDb::new`] uses the
/// standard `RandomState`; pass [`crate::Textbook33`] to
/// [`CarDb::with_hasher`] for reproducible slot placement.
pub struct CarDb<S = RandomState> {
    tables: Tables<S>,
    reentrancy: DebugReentrancy,
}

impl CarDb {
    /// Table with at least `requested_size` slots (rounded up to a prime and
    /// clamped to `[MIN_CAPACITY, MAX_CAPACITY]`).
    pub fn new(requested_size: usize, policy: ProbePolicy) -> Self {
        Self::with_hasher(requested_size, policy, RandomState::new())
    }
}

impl Default for CarDb {
    fn default() -> Self {
        Self::new(MIN_CAPACITY, ProbePolicy::default())
    }
}

impl<S: BuildHasher> CarDb<S> {
    /// Like [`CarDb::new`], with `hasher` as the string hash for every
    /// generation this table creates.
    pub fn with_hasher(requested_size: usize, policy: ProbePolicy, hasher: S) -> Self {
        Self {
            tables: Tables {
                hasher,
                current: Generation::new(prime::capacity_for(requested_size), policy),
                old: None,
                next_policy: None,
            },
            reentrancy: DebugReentrancy::new(),
        }
    }

    /// Stores `car`.
    ///
    /// Fails without touching the table if `car` is the empty sentinel, if
    /// its `(model, dealer)` is already live in either generation, or if no
    /// free slot is reachable (only possible at `MAX_CAPACITY`). On success
    /// it may start a migration and runs one drain step.
    pub fn insert(&mut self, car: Car) -> Result<()> {
        let _g = self.reentrancy.enter();
        self.tables.insert(car)
    }

    /// Tombstones the live record equal to `car` (by model and dealer).
    ///
    /// A hit in `current` may start a migration and runs one drain step. A
    /// hit in `old` only tombstones the record in place.
    pub fn remove(&mut self, car: &Car) -> Result<()> {
        let _g = self.reentrancy.enter();
        self.tables.remove(car)
    }

    /// The live record for `(model, dealer)`, looked up in `current` and
    /// then in `old`.
    pub fn find(&self, model: &str, dealer: u32) -> Option<&Car> {
        let _g = self.reentrancy.enter();
        let hash = self.tables.hash(model);
        self.tables.locate(hash, model, dealer)
    }

    /// Like [`find`](Self::find), but returns a copy, or [`Car::EMPTY`] on a
    /// miss.
    pub fn get(&self, model: &str, dealer: u32) -> Car {
        self.find(model, dealer).cloned().unwrap_or(Car::EMPTY)
    }

    /// Whether a live record for `(model, dealer)` exists in either
    /// generation.
    pub fn contains(&self, model: &str, dealer: u32) -> bool {
        self.find(model, dealer).is_some()
    }

    /// Sets the quantity of the live record equal to `car`.
    ///
    /// Occupancy does not change, so this never triggers or advances a
    /// migration.
    pub fn update_quantity(&mut self, car: &Car, quantity: u32) -> Result<()> {
        let _g = self.reentrancy.enter();
        let hash = self.tables.hash(car.model());
        match self.tables.locate_mut(hash, car.model(), car.dealer()) {
            Some(stored) => {
                stored.set_quantity(quantity);
                Ok(())
            }
            None => Err(Error::NotFound),
        }
    }

    /// Selects the probing policy of the generation created by the next
    /// migration. The active generations keep theirs.
    pub fn change_probing_policy(&mut self, policy: ProbePolicy) {
        self.tables.next_policy = Some(policy);
    }

    /// Policy the next migration will use, if one was requested.
    pub fn pending_probing_policy(&self) -> Option<ProbePolicy> {
        self.tables.next_policy
    }

    /// Policy of the current generation.
    pub fn probing_policy(&self) -> ProbePolicy {
        self.tables.current.policy()
    }

    /// Live records across both generations.
    pub fn len(&self) -> usize {
        self.tables.current.live() + self.tables.old.as_ref().map_or(0, |m| m.table.live())
    }

    /// True when neither generation holds a live record.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity of the current generation.
    pub fn capacity(&self) -> usize {
        self.tables.current.capacity()
    }

    /// Capacity of the generation being drained, if any.
    pub fn old_capacity(&self) -> Option<usize> {
        self.tables.old.as_ref().map(|m| m.table.capacity())
    }

    /// True while an old generation is still being drained.
    pub fn is_migrating(&self) -> bool {
        self.tables.old.is_some()
    }

    /// (live + tombstones) / capacity of the current generation.
    pub fn load_factor(&self) -> f64 {
        self.tables.current.load_factor()
    }

    /// tombstones / live of the current generation (0 when nothing is live).
    pub fn deleted_ratio(&self) -> f64 {
        self.tables.current.deleted_ratio()
    }

    /// Live records: the current generation in slot order, then the old one.
    pub fn iter(&self) -> impl Iterator<Item = &Car> {
        self.tables.current.cars().chain(
            self.tables
                .old
                .iter()
                .flat_map(|migration| migration.table.cars()),
        )
    }

    /// Slot-by-slot rendering of both generations, for debugging.
    pub fn dump(&self) -> Dump<'_> {
        Dump {
            current: &self.tables.current,
            old: self.tables.old.as_ref().map(|m| &m.table),
        }
    }

    /// Verifies the structural invariants:
    /// - capacities are prime and within bounds;
    /// - live and tombstone counts match the slots, and never exceed capacity;
    /// - every live record is reachable by its own probe sequence;
    /// - no `(model, dealer)` is live twice across both generations.
    pub fn check_invariants(&self) -> Result<()> {
        let _g = self.reentrancy.enter();
        let mut seen = HashSet::new();
        check_generation("current", &self.tables.current, &self.tables.hasher, &mut seen)?;
        if let Some(migration) = &self.tables.old {
            check_generation("old", &migration.table, &self.tables.hasher, &mut seen)?;
        }
        Ok(())
    }
}

fn check_generation<'a, S: BuildHasher>(
    generation: &'static str,
    table: &'a Generation,
    hasher: &S,
    seen: &mut HashSet<(&'a str, u32)>,
) -> Result<()> {
    let fail = |detail: String| Err(Error::Invariant { generation, detail });

    let cap = table.capacity();
    if !prime::is_prime(cap) || !(MIN_CAPACITY..=MAX_CAPACITY).contains(&cap) {
        return fail(format!("capacity {cap} is not a prime in range"));
    }
    if table.live() + table.tombstones() > cap {
        return fail(format!(
            "live {} + tombstones {} exceeds capacity {cap}",
            table.live(),
            table.tombstones()
        ));
    }

    let mut live = 0;
    let mut tombstones = 0;
    for (idx, slot) in table.slots().iter().enumerate() {
        match slot {
            Slot::Empty => {}
            Slot::Tombstone(_) => tombstones += 1,
            Slot::Occupied(car) => {
                live += 1;
                if car.is_empty() {
                    return fail(format!("slot {idx} holds the empty record"));
                }
                if !seen.insert((car.model(), car.dealer())) {
                    return fail(format!("duplicate live record {car} at slot {idx}"));
                }
                let hash = hasher.hash_one(car.model());
                if table.position(hash, car.model(), car.dealer()) != Some(idx) {
                    return fail(format!("{car} at slot {idx} is unreachable by probing"));
                }
            }
        }
    }
    if live != table.live() || tombstones != table.tombstones() {
        return fail(format!(
            "counted {live} live / {tombstones} tombstones, recorded {} / {}",
            table.live(),
            table.tombstones()
        ));
    }
    Ok(())
}

impl<S> fmt::Debug for CarDb<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CarDb")
            .field("capacity", &self.tables.current.capacity())
            .field("live", &self.tables.current.live())
            .field("tombstones", &self.tables.current.tombstones())
            .field("policy", &self.tables.current.policy())
            .field("old_capacity", &self.tables.old.as_ref().map(|m| m.table.capacity()))
            .finish()
    }
}

/// Display adapter returned by [`CarDb::dump`].
pub struct Dump<'a> {
    current: &'a Generation,
    old: Option<&'a Generation>,
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn slots(f: &mut fmt::Formatter<'_>, table: &Generation) -> fmt::Result {
            for (idx, slot) in table.slots().iter().enumerate() {
                writeln!(f, "[{idx}] : {slot}")?;
            }
            Ok(())
        }

        writeln!(
            f,
            "Dump for the current table ({:?}, capacity {}):",
            self.current.policy(),
            self.current.capacity()
        )?;
        slots(f, self.current)?;
        match self.old {
            Some(old) => {
                writeln!(
                    f,
                    "Dump for the old table ({:?}, capacity {}):",
                    old.policy(),
                    old.capacity()
                )?;
                slots(f, old)
            }
            None => writeln!(f, "Dump for the old table:"),
        }
    }
}
