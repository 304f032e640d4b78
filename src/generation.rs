//! Generation: one fixed-capacity slot array with its own probing policy and
//! occupancy accounting.
//!
//! A generation never resizes. Growth and tombstone cleanup happen by
//! retiring a whole generation and draining it into a fresh one (see
//! `car_db`).

use crate::car::Car;
use crate::probe::{ProbePolicy, ProbeSeq};
use core::fmt;

#[derive(Clone, Debug, Default)]
pub(crate) enum Slot {
    #[default]
    Empty,
    Occupied(Car),
    /// Logically deleted. Keeps its record and still takes part in probing.
    Tombstone(Car),
}

impl Slot {
    #[inline]
    pub(crate) fn is_occupied(&self) -> bool {
        matches!(self, Slot::Occupied(_))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Empty => Ok(()),
            Slot::Occupied(car) => write!(f, "{car}"),
            Slot::Tombstone(car) => write!(f, "{car} <deleted>"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Generation {
    slots: Box<[Slot]>,
    live: usize,
    tombstones: usize,
    policy: ProbePolicy,
}

impl Generation {
    /// `capacity` is expected to come from `prime::capacity_for`.
    pub(crate) fn new(capacity: usize, policy: ProbePolicy) -> Self {
        debug_assert!(capacity > 0);
        Self {
            slots: (0..capacity).map(|_| Slot::Empty).collect(),
            live: 0,
            tombstones: 0,
            policy,
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn live(&self) -> usize {
        self.live
    }

    #[inline]
    pub(crate) fn tombstones(&self) -> usize {
        self.tombstones
    }

    #[inline]
    pub(crate) fn policy(&self) -> ProbePolicy {
        self.policy
    }

    pub(crate) fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// (live + tombstones) / capacity.
    pub(crate) fn load_factor(&self) -> f64 {
        (self.live + self.tombstones) as f64 / self.capacity() as f64
    }

    /// tombstones / live, or 0 for a generation with no live records.
    pub(crate) fn deleted_ratio(&self) -> f64 {
        if self.live == 0 {
            return 0.0;
        }
        self.tombstones as f64 / self.live as f64
    }

    #[inline]
    fn probe(&self, hash: u64) -> ProbeSeq {
        self.policy.sequence(hash, self.capacity())
    }

    /// Index of the occupied slot holding `(model, dealer)`.
    ///
    /// Walks past tombstones and stops at the first empty slot: placement
    /// never skips an empty slot, so nothing for this hash lies beyond one.
    pub(crate) fn position(&self, hash: u64, model: &str, dealer: u32) -> Option<usize> {
        for idx in self.probe(hash) {
            match &self.slots[idx] {
                Slot::Empty => return None,
                Slot::Occupied(car) if car.matches(model, dealer) => return Some(idx),
                _ => {}
            }
        }
        None
    }

    /// First empty or tombstoned slot on the probe sequence for `hash`.
    pub(crate) fn vacancy(&self, hash: u64) -> Option<usize> {
        self.probe(hash).find(|&idx| !self.slots[idx].is_occupied())
    }

    pub(crate) fn occupant(&self, idx: usize) -> Option<&Car> {
        match &self.slots[idx] {
            Slot::Occupied(car) => Some(car),
            _ => None,
        }
    }

    pub(crate) fn occupant_mut(&mut self, idx: usize) -> Option<&mut Car> {
        match &mut self.slots[idx] {
            Slot::Occupied(car) => Some(car),
            _ => None,
        }
    }

    /// Writes `car` into the free slot `idx` returned by `vacancy`.
    pub(crate) fn place(&mut self, idx: usize, car: Car) {
        match self.slots[idx] {
            Slot::Occupied(_) => unreachable!("place() into an occupied slot"),
            Slot::Tombstone(_) => self.tombstones -= 1,
            Slot::Empty => {}
        }
        self.slots[idx] = Slot::Occupied(car);
        self.live += 1;
    }

    /// Simple insert: place at the first free slot with no duplicate check.
    /// Returns `car` back if the probe sequence has no free slot.
    pub(crate) fn insert(&mut self, hash: u64, car: Car) -> Result<usize, Car> {
        match self.vacancy(hash) {
            Some(idx) => {
                self.place(idx, car);
                Ok(idx)
            }
            None => Err(car),
        }
    }

    /// Turns the occupied slot `idx` into a tombstone and returns the record
    /// it now keeps. Returns `None` if the slot is not occupied.
    pub(crate) fn bury(&mut self, idx: usize) -> Option<&Car> {
        if !self.slots[idx].is_occupied() {
            return None;
        }
        self.live -= 1;
        self.tombstones += 1;
        let slot = &mut self.slots[idx];
        if let Slot::Occupied(car) = core::mem::take(slot) {
            *slot = Slot::Tombstone(car);
        }
        match &*slot {
            Slot::Tombstone(car) => Some(car),
            _ => None,
        }
    }

    /// Live records in slot order.
    pub(crate) fn cars(&self) -> impl Iterator<Item = &Car> {
        self.slots.iter().filter_map(|s| match s {
            Slot::Occupied(car) => Some(car),
            _ => None,
        })
    }
}
