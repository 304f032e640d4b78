// CarDb integration tests.
//
// Each test documents the behavior it verifies. Records come from a seeded
// generator, so every run sees the same models, dealers and quantities.
// The core properties exercised:
// - Round trip: an inserted record is found with its quantity until it is
//   removed or updated.
// - Tombstone correctness: a removed record is not found, whether its slot
//   was tombstoned in `current` or in `old`.
// - Migration completion: once enough mutations follow a split, `old` is
//   gone and every live record is in `current`.
// - Load factor bound and capacity primality after every insert.
use car_db::{
    is_prime, Car, CarDb, Error, ProbePolicy, Textbook33, MAX_CAPACITY, MAX_DEALER_ID,
    MIN_CAPACITY, MIN_DEALER_ID,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

const MODELS: [&str; 5] = ["challenger", "stratos", "gt500", "miura", "x101"];

/// Seeded source of distinct cars.
struct CarGen {
    rng: StdRng,
    issued: HashSet<(&'static str, u32)>,
}

impl CarGen {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            issued: HashSet::new(),
        }
    }

    fn next_car(&mut self) -> Car {
        loop {
            let model = MODELS[self.rng.gen_range(0..MODELS.len())];
            let dealer = self.rng.gen_range(MIN_DEALER_ID..=MAX_DEALER_ID);
            let quantity = self.rng.gen_range(0..=50);
            if self.issued.insert((model, dealer)) {
                return Car::new(model, quantity, dealer);
            }
        }
    }

    fn cars(&mut self, n: usize) -> Vec<Car> {
        (0..n).map(|_| self.next_car()).collect()
    }
}

fn table(policy: ProbePolicy) -> CarDb<Textbook33> {
    CarDb::with_hasher(MIN_CAPACITY, policy, Textbook33)
}

fn assert_found(db: &CarDb<Textbook33>, car: &Car) {
    let found = db
        .find(car.model(), car.dealer())
        .unwrap_or_else(|| panic!("{car} not found"));
    assert_eq!(found, car);
    assert_eq!(found.quantity(), car.quantity());
}

fn assert_missing(db: &CarDb<Textbook33>, car: &Car) {
    assert!(db.find(car.model(), car.dealer()).is_none(), "{car} still found");
    assert!(db.get(car.model(), car.dealer()).is_empty());
}

/// Inserts fresh cars until the in-flight migration retires.
fn drive_to_stable(db: &mut CarDb<Textbook33>, supply: &mut CarGen) -> Vec<Car> {
    let mut added = Vec::new();
    while db.is_migrating() {
        assert!(added.len() < 16, "migration did not finish");
        let car = supply.next_car();
        db.insert(car.clone()).expect("fresh insert");
        added.push(car);
    }
    added
}

// Scenario: ten unique records in a MIN_CAPACITY double-hash table.
// Verifies: every record is found with its quantity; len() == 10.
#[test]
fn insert_ten_and_find_all() {
    let mut db = table(ProbePolicy::DoubleHash);
    let cars = CarGen::new(10).cars(10);
    for car in &cars {
        db.insert(car.clone()).unwrap();
    }
    assert_eq!(db.len(), 10);
    assert!(!db.is_migrating());
    for car in &cars {
        assert_found(&db, car);
    }
    db.check_invariants().unwrap();
}

// Scenario: records sharing a model with different dealers.
// Verifies: they coexist and are found and removed independently.
#[test]
fn same_model_different_dealers() {
    for policy in [ProbePolicy::Quadratic, ProbePolicy::DoubleHash] {
        let mut db = table(policy);
        let first = Car::new("collide", 3, 1111);
        let second = Car::new("collide", 4, 2222);
        db.insert(first.clone()).unwrap();
        db.insert(second.clone()).unwrap();
        assert_found(&db, &first);
        assert_found(&db, &second);

        db.remove(&first).unwrap();
        assert_missing(&db, &first);
        assert_found(&db, &second);

        db.remove(&second).unwrap();
        assert_missing(&db, &second);
        assert!(db.is_empty());
    }
}

// Scenario: sixty records into a MIN_CAPACITY table.
// Verifies: the growth trigger starts a migration, the drain finishes
// within the same run of inserts, and all sixty remain findable.
#[test]
fn sixty_inserts_migrate_and_finish() {
    let mut db = table(ProbePolicy::DoubleHash);
    let cars = CarGen::new(60).cars(60);
    let mut migrated = false;
    for car in &cars {
        db.insert(car.clone()).unwrap();
        migrated |= db.is_migrating();
    }
    assert!(migrated, "growth trigger never fired");
    assert!(!db.is_migrating(), "old generation still present");
    assert_eq!(db.old_capacity(), None);
    assert_eq!(db.len(), 60);
    assert_eq!(db.capacity(), 211);
    for car in &cars {
        assert_found(&db, car);
    }
    db.check_invariants().unwrap();
}

// Scenario: insert fifty, remove forty.
// Verifies: the deleted-ratio trigger fires on the 23rd removal; after the
// migration drains, removed records are gone and the other ten remain.
#[test]
fn fifty_inserts_forty_removals() {
    let mut db = table(ProbePolicy::DoubleHash);
    let mut supply = CarGen::new(50);
    let cars = supply.cars(50);
    for car in &cars {
        db.insert(car.clone()).unwrap();
    }
    assert!(!db.is_migrating());

    let (removed, kept) = cars.split_at(40);
    for (i, car) in removed.iter().enumerate() {
        db.remove(car).unwrap();
        if i == 21 {
            assert!(!db.is_migrating(), "triggered before the 23rd removal");
        }
        if i == 22 {
            assert!(db.is_migrating(), "deleted-ratio trigger did not fire");
        }
        assert_missing(&db, car);
    }

    let added = drive_to_stable(&mut db, &mut supply);
    assert_eq!(db.len(), kept.len() + added.len());
    for car in removed {
        assert_missing(&db, car);
        assert_eq!(db.remove(car), Err(Error::NotFound));
    }
    for car in kept.iter().chain(&added) {
        assert_found(&db, car);
    }
    db.check_invariants().unwrap();
}

// Test: lookup of a record that was never inserted.
// Verifies: find() is None and get() returns the empty sentinel.
#[test]
fn find_nonexistent() {
    let db = table(ProbePolicy::DoubleHash);
    assert!(db.find("nonexistent", 0).is_none());
    let miss = db.get("nonexistent", 0);
    assert!(!miss.is_used());
    assert_eq!(miss.model(), "");
}

// Test: duplicates and invalid input.
// Verifies: each failure reports its own error and leaves len() unchanged.
#[test]
fn rejected_operations_leave_table_untouched() {
    let mut db = table(ProbePolicy::Quadratic);
    let car = Car::new("stratos", 5, 4321);
    db.insert(car.clone()).unwrap();

    assert_eq!(db.insert(Car::new("stratos", 9, 4321)), Err(Error::DuplicateKey));
    assert_eq!(db.insert(Car::EMPTY), Err(Error::EmptyRecord));
    assert_eq!(db.remove(&Car::EMPTY), Err(Error::EmptyRecord));
    assert_eq!(db.remove(&Car::new("stratos", 5, 1234)), Err(Error::NotFound));
    assert_eq!(
        db.update_quantity(&Car::new("miura", 1, 4321), 2),
        Err(Error::NotFound)
    );
    assert_eq!(db.len(), 1);
    assert_found(&db, &car);
}

// Test: quantity updates across a migration.
// Verifies: an update is visible whether the record sits in `old` or has
// already moved to `current`, and the new quantity survives the move.
#[test]
fn updates_survive_migration() {
    let mut db = table(ProbePolicy::Quadratic);
    let mut supply = CarGen::new(7);
    let mut cars = supply.cars(51);
    for car in &cars {
        db.insert(car.clone()).unwrap();
    }
    assert!(db.is_migrating());

    for (i, car) in cars.iter_mut().enumerate() {
        let quantity = 100 + i as u32;
        db.update_quantity(car, quantity).unwrap();
        car.set_quantity(quantity);
    }
    for car in &cars {
        assert_found(&db, car);
    }

    let added = drive_to_stable(&mut db, &mut supply);
    for car in cars.iter().chain(&added) {
        assert_found(&db, car);
    }
}

// Test: load factor bound and capacity primality over sustained growth.
// Verifies: after every insert, λ <= 0.5 or a migration is draining, and
// capacities stay prime and within bounds.
#[test]
fn load_factor_bound_under_growth() {
    let mut db = table(ProbePolicy::DoubleHash);
    let mut supply = CarGen::new(2024);
    let mut splits = 0;
    let mut was_migrating = false;
    for car in supply.cars(2_000) {
        db.insert(car).unwrap();
        assert!(db.load_factor() <= 0.5 || db.is_migrating());
        assert!(is_prime(db.capacity()));
        assert!((MIN_CAPACITY..=MAX_CAPACITY).contains(&db.capacity()));
        if let Some(old) = db.old_capacity() {
            assert!(is_prime(old));
        }
        if db.is_migrating() && !was_migrating {
            splits += 1;
        }
        was_migrating = db.is_migrating();
    }
    assert!(splits >= 4, "expected repeated growth, saw {splits} splits");
    assert_eq!(db.len(), 2_000);
    db.check_invariants().unwrap();
}

// Scenario: growth until sizing reaches the capacity ceiling.
// Verifies: the table pins at MAX_CAPACITY instead of failing, keeps every
// record, and stays structurally sound.
#[test]
fn growth_pins_at_max_capacity() {
    let mut db = table(ProbePolicy::DoubleHash);
    let n = 50_200u32;
    for i in 0..n {
        db.insert(Car::new(format!("pin{i}"), 1, MIN_DEALER_ID + i % 9000)).unwrap();
    }
    assert_eq!(db.capacity(), MAX_CAPACITY);
    if let Some(old) = db.old_capacity() {
        assert!(old <= MAX_CAPACITY);
    }
    assert_eq!(db.len(), n as usize);
    for i in (0..n).step_by(997) {
        assert!(db.contains(&format!("pin{i}"), MIN_DEALER_ID + i % 9000));
    }
    db.check_invariants().unwrap();
}

// Test: deferred probing-policy change.
// Verifies: the active generation keeps its policy until the next split,
// and records placed under either policy stay reachable.
#[test]
fn policy_change_applies_at_next_split() {
    let mut db = table(ProbePolicy::Quadratic);
    let mut supply = CarGen::new(99);
    let first = supply.cars(20);
    for car in &first {
        db.insert(car.clone()).unwrap();
    }
    db.change_probing_policy(ProbePolicy::DoubleHash);
    assert_eq!(db.probing_policy(), ProbePolicy::Quadratic);

    let second = supply.cars(31);
    for car in &second {
        db.insert(car.clone()).unwrap();
    }
    assert!(db.is_migrating());
    assert_eq!(db.probing_policy(), ProbePolicy::DoubleHash);
    assert_eq!(db.pending_probing_policy(), None);
    for car in first.iter().chain(&second) {
        assert_found(&db, car);
    }
}

// Test: the diagnostic dump.
// Verifies: both generations are listed slot by slot in index order.
#[test]
fn dump_lists_slots_in_order() {
    let mut db = table(ProbePolicy::DoubleHash);
    let car = Car::new("gt500", 12, 3456);
    db.insert(car.clone()).unwrap();
    let out = db.dump().to_string();
    let slots: Vec<&str> = out.lines().filter(|l| l.starts_with('[')).collect();
    assert_eq!(slots.len(), MIN_CAPACITY);
    for (i, line) in slots.iter().enumerate() {
        assert!(line.starts_with(&format!("[{i}] : ")));
    }
    assert_eq!(slots.iter().filter(|l| l.ends_with("gt500 (3456,12)")).count(), 1);
}

// Test: the default RandomState hasher.
// Verifies: behavior does not depend on the deterministic test hasher.
#[test]
fn random_state_table() {
    let mut db = CarDb::new(MIN_CAPACITY, ProbePolicy::Quadratic);
    let cars = CarGen::new(5).cars(120);
    for car in &cars {
        db.insert(car.clone()).unwrap();
    }
    for car in cars.iter().step_by(2) {
        db.remove(car).unwrap();
    }
    for (i, car) in cars.iter().enumerate() {
        assert_eq!(db.contains(car.model(), car.dealer()), i % 2 == 1);
    }
    assert_eq!(db.len(), 60);
    db.check_invariants().unwrap();
}
