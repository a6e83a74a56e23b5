use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const BRL_CURRENCY_CODE: &str = "BRL";
pub const BRL_CURRENCY_CODE_LOWER: &str = "brl";

//--------------------------------------       Reais        ----------------------------------------------------------
/// An amount of Brazilian reais, stored as an integer number of centavos.
///
/// Ledger arithmetic never touches floating point. The only place fractions appear is in the commission split, which
/// rounds to the nearest centavo at the moment the split is computed.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Reais(i64);

op!(binary Reais, Add, add);
op!(binary Reais, Sub, sub);
op!(inplace Reais, AddAssign, add_assign);
op!(inplace Reais, SubAssign, sub_assign);
op!(unary Reais, Neg, neg);

impl Mul<i64> for Reais {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Reais {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in centavos: {0}")]
pub struct ReaisConversionError(String);

impl From<i64> for Reais {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Reais {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Reais {}

impl TryFrom<u64> for Reais {
    type Error = ReaisConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(ReaisConversionError(format!("Value {} is too large to convert to Reais", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Reais {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        write!(f, "{sign}R${}.{:02}", cents / 100, cents % 100)
    }
}

impl Reais {
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// The amount in centavos.
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn zero() -> Self {
        Self(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_formats_centavos() {
        assert_eq!(Reais::from_cents(10_000).to_string(), "R$100.00");
        assert_eq!(Reais::from_cents(8_000).to_string(), "R$80.00");
        assert_eq!(Reais::from_cents(5).to_string(), "R$0.05");
        assert_eq!(Reais::from_cents(-2_550).to_string(), "-R$25.50");
    }

    #[test]
    fn arithmetic() {
        let a = Reais::from_cents(1_000);
        let b = Reais::from_cents(250);
        assert_eq!(a + b, Reais::from_cents(1_250));
        assert_eq!(a - b, Reais::from_cents(750));
        assert_eq!(-b, Reais::from_cents(-250));
        assert_eq!(b * 4, Reais::from_cents(1_000));
        let total: Reais = [a, b, b].into_iter().sum();
        assert_eq!(total, Reais::from_cents(1_500));
    }

    #[test]
    fn u64_conversion_guards_overflow() {
        assert!(Reais::try_from(u64::MAX).is_err());
        assert_eq!(Reais::try_from(42u64).unwrap(), Reais::from_cents(42));
    }
}
