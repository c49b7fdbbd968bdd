//! Money in the smallest currency unit.
//!
//! The catalog is single-currency (USD), so amounts are plain cent counts.
//! Being unsigned, a `Cents` value can never be negative.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(pub u64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub fn new(cents: u64) -> Self {
        Self(cents)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Whole currency units as a float (e.g. `1999` → `19.99`).
    pub fn as_units(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

/// Renders as a decimal amount with two fraction digits (`"19.99"`).
impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}
