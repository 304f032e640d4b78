//! Car: the fixed record stored in a `CarDb`.
//!
//! Identity is the `(model, dealer)` pair. `quantity` is payload and takes no
//! part in equality or hashing, so a lookup with any quantity finds the
//! stored record.

use core::fmt;
use core::hash::{Hash, Hasher};

/// Lowest dealer id handed out by the inventory system.
pub const MIN_DEALER_ID: u32 = 1000;
/// Highest dealer id handed out by the inventory system.
pub const MAX_DEALER_ID: u32 = 9999;

#[derive(Clone, Debug, Default)]
pub struct Car {
    model: String,
    dealer: u32,
    quantity: u32,
    used: bool,
}

impl Car {
    /// The "not found" sentinel: empty model, unused.
    pub const EMPTY: Car = Car {
        model: String::new(),
        dealer: 0,
        quantity: 0,
        used: false,
    };

    pub fn new(model: impl Into<String>, quantity: u32, dealer: u32) -> Self {
        Car {
            model: model.into(),
            dealer,
            quantity,
            used: true,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dealer(&self) -> u32 {
        self.dealer
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }

    /// `false` only for the sentinel and records built from it.
    pub fn is_used(&self) -> bool {
        self.used
    }

    /// True for anything that must not be stored: the sentinel, or any
    /// record without a model.
    pub fn is_empty(&self) -> bool {
        !self.used || self.model.is_empty()
    }

    pub(crate) fn matches(&self, model: &str, dealer: u32) -> bool {
        self.dealer == dealer && self.model == model
    }
}

impl PartialEq for Car {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.model, other.dealer)
    }
}

impl Eq for Car {}

impl Hash for Car {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.model.hash(state);
        self.dealer.hash(state);
    }
}

impl fmt::Display for Car {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.model.is_empty() {
            return Ok(());
        }
        write!(f, "{} ({},{})", self.model, self.dealer, self.quantity)
    }
}
