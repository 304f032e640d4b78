#![cfg(test)]

// Property tests for CarDb kept inside the crate so they can inspect both
// generations directly.

use crate::car_db::{CarDb, MAX_LOAD_FACTOR};
use crate::hash::Textbook33;
use crate::{Car, Error, ProbePolicy};
use core::hash::BuildHasher;
use proptest::prelude::*;
use std::collections::HashMap;

const MODELS: [&str; 5] = ["challenger", "stratos", "gt500", "miura", "x101"];

// Keys are (model index, dealer) so shrinking moves toward small pools.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, u32, u32),
    Remove(usize, u32),
    Find(usize, u32),
    Update(usize, u32, u32),
    ChangePolicy(ProbePolicy),
}

fn arb_policy() -> impl Strategy<Value = ProbePolicy> {
    prop_oneof![Just(ProbePolicy::Quadratic), Just(ProbePolicy::DoubleHash)]
}

fn arb_ops(dealers: u32, max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    let model = 0..MODELS.len();
    let dealer = 0..dealers;
    let op = prop_oneof![
        6 => (model.clone(), dealer.clone(), 0u32..=50).prop_map(|(m, d, q)| Op::Insert(m, d, q)),
        3 => (model.clone(), dealer.clone()).prop_map(|(m, d)| Op::Remove(m, d)),
        2 => (model.clone(), dealer.clone()).prop_map(|(m, d)| Op::Find(m, d)),
        1 => (model, dealer, 0u32..=50).prop_map(|(m, d, q)| Op::Update(m, d, q)),
        1 => arb_policy().prop_map(Op::ChangePolicy),
    ];
    proptest::collection::vec(op, 1..max_len)
}

type Model = HashMap<(usize, u32), u32>;

fn car(m: usize, d: u32, q: u32) -> Car {
    Car::new(MODELS[m], q, d)
}

// Applies one op to both the table and the model, asserting the table's
// answer matches the model's.
fn apply<S: BuildHasher>(sut: &mut CarDb<S>, model: &mut Model, op: Op) -> Result<(), TestCaseError> {
    match op {
        Op::Insert(m, d, q) => {
            let already = model.contains_key(&(m, d));
            match sut.insert(car(m, d, q)) {
                Ok(()) => {
                    prop_assert!(!already, "insert must fail on duplicate");
                    model.insert((m, d), q);
                    // Load factor bound after an insert.
                    prop_assert!(sut.load_factor() <= MAX_LOAD_FACTOR || sut.is_migrating());
                }
                Err(Error::DuplicateKey) => prop_assert!(already, "duplicate only when live"),
                Err(e) => prop_assert!(false, "unexpected insert error: {}", e),
            }
        }
        Op::Remove(m, d) => {
            let res = sut.remove(&car(m, d, 0));
            match model.remove(&(m, d)) {
                Some(_) => prop_assert_eq!(res, Ok(())),
                None => prop_assert_eq!(res, Err(Error::NotFound)),
            }
            prop_assert!(sut.find(MODELS[m], d).is_none(), "removed record still found");
        }
        Op::Find(m, d) => {
            let found = sut.find(MODELS[m], d).map(Car::quantity);
            prop_assert_eq!(found, model.get(&(m, d)).copied());
            prop_assert_eq!(sut.get(MODELS[m], d).is_empty(), found.is_none());
        }
        Op::Update(m, d, q) => {
            let res = sut.update_quantity(&car(m, d, 0), q);
            match model.get_mut(&(m, d)) {
                Some(stored) => {
                    prop_assert_eq!(res, Ok(()));
                    *stored = q;
                }
                None => prop_assert_eq!(res, Err(Error::NotFound)),
            }
        }
        Op::ChangePolicy(p) => {
            let active = sut.probing_policy();
            sut.change_probing_policy(p);
            prop_assert_eq!(sut.pending_probing_policy(), Some(p));
            prop_assert_eq!(sut.probing_policy(), active);
        }
    }
    Ok(())
}

fn assert_matches_model<S: BuildHasher>(sut: &CarDb<S>, model: &Model) -> Result<(), TestCaseError> {
    prop_assert_eq!(sut.len(), model.len());
    prop_assert_eq!(sut.is_empty(), model.is_empty());
    if let Err(e) = sut.check_invariants() {
        prop_assert!(false, "{}", e);
    }
    Ok(())
}

// Issues fresh inserts until the in-flight migration (if any) retires.
fn drive_to_stable<S: BuildHasher>(sut: &mut CarDb<S>, model: &mut Model) -> Result<(), TestCaseError> {
    let mut filler = 100_000;
    while sut.is_migrating() {
        prop_assert!(filler < 100_032, "migration did not finish");
        prop_assert_eq!(sut.insert(car(0, filler, 1)), Ok(()));
        model.insert((0, filler), 1);
        filler += 1;
    }
    Ok(())
}

// Property: state-machine equivalence against a HashMap model.
// Invariants exercised across random operation sequences:
// - Duplicates are rejected; removals and updates fail exactly on misses.
// - Round trip: `find` returns the last written quantity of a live key.
// - Tombstone correctness: a removed key is never found again.
// - Load factor stays <= 0.5 after an insert unless a migration drains.
// - `check_invariants` (uniqueness across generations, prime capacity,
//   counts, reachability) holds after every op.
// - Migration completion: a migration retires after a bounded number of
//   further inserts and every live key is then found in `current`.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(policy in arb_policy(), ops in arb_ops(40, 300)) {
        let mut sut = CarDb::with_hasher(crate::MIN_CAPACITY, policy, Textbook33);
        let mut model = Model::new();
        for op in ops {
            apply(&mut sut, &mut model, op)?;
            assert_matches_model(&sut, &model)?;
        }

        drive_to_stable(&mut sut, &mut model)?;
        assert_matches_model(&sut, &model)?;
        for (&(m, d), &q) in &model {
            prop_assert_eq!(sut.find(MODELS[m], d).map(Car::quantity), Some(q));
        }
    }
}

// Collision variant using a constant hasher to stress equality resolution
// and tombstone traversal on a single shared probe sequence.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl core::hash::Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 48, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_collisions(policy in arb_policy(), ops in arb_ops(16, 160)) {
        let mut sut = CarDb::with_hasher(crate::MIN_CAPACITY, policy, ConstBuildHasher);
        let mut model = Model::new();
        for op in ops {
            apply(&mut sut, &mut model, op)?;
            assert_matches_model(&sut, &model)?;
        }
        drive_to_stable(&mut sut, &mut model)?;
        for (&(m, d), &q) in &model {
            prop_assert_eq!(sut.find(MODELS[m], d).map(Car::quantity), Some(q));
        }
    }
}
