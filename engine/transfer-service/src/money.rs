//! Money type for budget calculations
//!
//! Prices and budgets are quoted in millions ("8.5" means $8.5M). Internally
//! every amount is an integer count of basis points of one unit, so ledger
//! arithmetic is exact.

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Basis points per unit
const SCALE: i64 = 10_000;

/// Money represents a budget amount with 1/10000th unit precision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in basis points (1/10000th of a unit)
    pub basis_points: i64,
}

impl Money {
    pub const ZERO: Money = Money { basis_points: 0 };

    /// Create from whole units
    pub const fn from_units(units: i64) -> Self {
        Self { basis_points: units * SCALE }
    }

    /// Create from tenths of a unit (prices are listed to one decimal place)
    pub const fn from_tenths(tenths: i64) -> Self {
        Self { basis_points: tenths * (SCALE / 10) }
    }

    /// Create from basis points
    pub const fn from_basis_points(basis_points: i64) -> Self {
        Self { basis_points }
    }

    /// Get the value as a decimal
    pub fn to_decimal(self) -> Decimal {
        Decimal::from(self.basis_points) / Decimal::from(SCALE)
    }

    /// Create from decimal, rounding to the nearest basis point
    pub fn from_decimal(decimal: Decimal) -> Self {
        let scaled = (decimal * Decimal::from(SCALE))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        let basis_points = scaled.to_i64().unwrap_or(if decimal.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        });
        Self { basis_points }
    }

    pub fn is_zero(self) -> bool {
        self.basis_points == 0
    }

    pub fn is_negative(self) -> bool {
        self.basis_points < 0
    }

    /// Absolute distance between two amounts
    pub fn abs_diff(self, other: Self) -> Self {
        Self { basis_points: (self.basis_points - other.basis_points).abs() }
    }

    /// Subtraction floored at zero
    pub fn saturating_sub(self, other: Self) -> Self {
        Self { basis_points: (self.basis_points - other.basis_points).max(0) }
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self { basis_points: self.basis_points + other.basis_points }
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.basis_points += other.basis_points;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self { basis_points: self.basis_points - other.basis_points }
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        self.basis_points -= other.basis_points;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self {
        Self { basis_points: self.basis_points * rhs }
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self { basis_points: -self.basis_points }
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

impl From<Decimal> for Money {
    fn from(decimal: Decimal) -> Self {
        Money::from_decimal(decimal)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:.1}M", self.to_decimal())
    }
}
