use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// The single currency the ledger operates in.
pub const LEDGER_CURRENCY_CODE: &str = "ZAR";

//--------------------------------------    MinorUnits       ---------------------------------------------------------
/// A monetary amount in the smallest currency unit (cents).
///
/// All ledger arithmetic happens on fixed-point integers. Floating point never enters the money path.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct MinorUnits(i64);

op!(binary MinorUnits, Add, add);
op!(binary MinorUnits, Sub, sub);
op!(inplace MinorUnits, SubAssign, sub_assign);
op!(unary MinorUnits, Neg, neg);

impl Mul<i64> for MinorUnits {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for MinorUnits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in minor units: {0}")]
pub struct MinorUnitsConversionError(String);

impl From<i64> for MinorUnits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for MinorUnits {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MinorUnits {}

impl TryFrom<u64> for MinorUnits {
    type Error = MinorUnitsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MinorUnitsConversionError(format!("Value {} is too large to convert to MinorUnits", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for MinorUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.abs();
        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

impl MinorUnits {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Converts whole currency units (e.g. Rand) into minor units.
    pub fn from_major(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = MinorUnits::from(1_500);
        let b = MinorUnits::from_major(10);
        assert_eq!(a + b, MinorUnits::from(2_500));
        assert_eq!(b - a, MinorUnits::from(-500));
        assert_eq!(-a, MinorUnits::from(-1_500));
        assert_eq!(a * 3, MinorUnits::from(4_500));
        let total: MinorUnits = vec![a, b, a].into_iter().sum();
        assert_eq!(total, MinorUnits::from(4_000));
    }

    #[test]
    fn display_formats_cents() {
        assert_eq!(MinorUnits::from(123_456).to_string(), "1234.56");
        assert_eq!(MinorUnits::from(-75).to_string(), "-0.75");
        assert_eq!(MinorUnits::default().to_string(), "0.00");
    }
}
