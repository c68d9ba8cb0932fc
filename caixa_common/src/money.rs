use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// The maximum absolute difference, in cents, that is still considered "equal" when comparing a
/// sum of payment allocations against an order total. Covers rounding drift in upstream systems
/// that computed totals in floating point.
pub const MONEY_TOLERANCE: Money = Money(1);

//--------------------------------------       Money       -----------------------------------------------------------
/// A monetary amount in integer cents.
///
/// Amounts are stored and computed as `i64` cents throughout the engine. At serialization
/// boundaries they are rendered as fixed-point decimal strings (`"75.00"`), never as binary
/// floating point.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl From<i64> for Money {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Whole currency units, e.g. `Money::from_units(50)` is 50.00.
    pub const fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// True if `self` and `other` differ by no more than [`MONEY_TOLERANCE`].
    pub fn approx_eq(&self, other: Money) -> bool {
        (self.0 - other.0).abs() <= MONEY_TOLERANCE.0
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid monetary amount: {0}")]
pub struct MoneyParseError(String);

impl FromStr for Money {
    type Err = MoneyParseError;

    /// Parses a fixed-point decimal string, e.g. `"50"`, `"-3.5"` or `"30.00"`. At most two
    /// fractional digits are accepted; there is no rounding.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (sign, digits) = match s.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, s),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(MoneyParseError(s.to_string()));
        }
        if frac.len() > 2 || !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(MoneyParseError(s.to_string()));
        }
        let units: i64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| MoneyParseError(s.to_string()))? };
        let mut cents: i64 = if frac.is_empty() { 0 } else { frac.parse().map_err(|_| MoneyParseError(s.to_string()))? };
        if frac.len() == 1 {
            cents *= 10;
        }
        units
            .checked_mul(100)
            .and_then(|u| u.checked_add(cents))
            .and_then(|v| v.checked_mul(sign))
            .map(Money)
            .ok_or_else(|| MoneyParseError(s.to_string()))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
