//! Bounded numeric value objects.
//!
//! Every operation returns a new value; nothing here mutates in place.
//! Deserialization goes through the same constructors, so a snapshot cannot
//! smuggle an out-of-range value into the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;
use crate::numbers::floor_f64_to_i32;

fn clamp_i64(value: i64, min: i32, max: i32) -> i32 {
    let clamped = value.clamp(i64::from(min), i64::from(max));
    i32::try_from(clamped).unwrap_or(max)
}

// =============================================================================
// Vitality
// =============================================================================

/// The player's single health resource, bounded to `[0, max]`.
///
/// ```
/// use fulfillment_game::Vitality;
///
/// let v = Vitality::new(50, 100).unwrap().decrease(20).unwrap();
/// assert_eq!(v.value(), 30);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "VitalityRepr", into = "VitalityRepr")]
pub struct Vitality {
    value: i32,
    max: i32,
}

#[derive(Serialize, Deserialize)]
struct VitalityRepr {
    value: i32,
    max: i32,
}

impl TryFrom<VitalityRepr> for Vitality {
    type Error = DomainError;

    fn try_from(repr: VitalityRepr) -> Result<Self, Self::Error> {
        Self::new(repr.value, repr.max)
    }
}

impl From<Vitality> for VitalityRepr {
    fn from(v: Vitality) -> Self {
        Self {
            value: v.value,
            max: v.max,
        }
    }
}

impl Vitality {
    /// # Errors
    ///
    /// Returns `DomainError` if `max <= 0` or `value` is outside `[0, max]`.
    pub fn new(value: i32, max: i32) -> Result<Self, DomainError> {
        if max <= 0 {
            return Err(DomainError::NonPositiveMax {
                field: "vitality",
                max,
            });
        }
        if !(0..=max).contains(&value) {
            return Err(DomainError::OutOfRange {
                field: "vitality",
                min: 0,
                max,
                value,
            });
        }
        Ok(Self { value, max })
    }

    /// Full vitality at the given maximum.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if `max <= 0`.
    pub fn full(max: i32) -> Result<Self, DomainError> {
        Self::new(max, max)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.value
    }

    #[must_use]
    pub const fn max(&self) -> i32 {
        self.max
    }

    /// # Errors
    ///
    /// Returns `DomainError` if `amount` is negative.
    pub fn decrease(self, amount: i32) -> Result<Self, DomainError> {
        if amount < 0 {
            return Err(DomainError::NegativeAmount {
                field: "vitality",
                amount,
            });
        }
        let value = clamp_i64(i64::from(self.value) - i64::from(amount), 0, self.max);
        Ok(Self { value, ..self })
    }

    /// # Errors
    ///
    /// Returns `DomainError` if `amount` is negative.
    pub fn increase(self, amount: i32) -> Result<Self, DomainError> {
        if amount < 0 {
            return Err(DomainError::NegativeAmount {
                field: "vitality",
                amount,
            });
        }
        let value = clamp_i64(i64::from(self.value) + i64::from(amount), 0, self.max);
        Ok(Self { value, ..self })
    }

    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.value == 0
    }

    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.value == self.max
    }

    /// `floor(value / max * 100)`.
    #[must_use]
    pub fn percentage(&self) -> i32 {
        clamp_i64(i64::from(self.value) * 100 / i64::from(self.max), 0, 100)
    }
}

impl fmt::Display for Vitality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.max)
    }
}

// =============================================================================
// CardPower
// =============================================================================

/// Strength carried by a card, bounded to `[-99, 999]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct CardPower(i32);

impl CardPower {
    pub const MIN: i32 = -99;
    pub const MAX: i32 = 999;

    /// # Errors
    ///
    /// Returns `DomainError` if `value` is outside `[-99, 999]`.
    pub fn new(value: i32) -> Result<Self, DomainError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(DomainError::OutOfRange {
                field: "card_power",
                min: Self::MIN,
                max: Self::MAX,
                value,
            });
        }
        Ok(Self(value))
    }

    /// Clamp an arbitrary integer into range instead of rejecting it.
    #[must_use]
    pub fn saturating(value: i32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }

    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Self(clamp_i64(
            i64::from(self.0) + i64::from(other.0),
            Self::MIN,
            Self::MAX,
        ))
    }

    /// Sum of all powers; empty input is zero.
    pub fn sum<I: IntoIterator<Item = Self>>(powers: I) -> Self {
        let total: i64 = powers.into_iter().map(|p| i64::from(p.0)).sum();
        Self(clamp_i64(total, Self::MIN, Self::MAX))
    }

    /// # Errors
    ///
    /// Returns `DomainError` if `factor` is negative or NaN.
    pub fn multiply(self, factor: f64) -> Result<Self, DomainError> {
        if factor.is_nan() || factor < 0.0 {
            return Err(DomainError::NegativeFactor {
                field: "card_power",
                factor,
            });
        }
        let scaled = floor_f64_to_i32(f64::from(self.0) * factor);
        Ok(Self(scaled.clamp(Self::MIN, Self::MAX)))
    }
}

impl TryFrom<i32> for CardPower {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CardPower> for i32 {
    fn from(power: CardPower) -> Self {
        power.0
    }
}

impl fmt::Display for CardPower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// InsurancePremium
// =============================================================================

/// Vitality cost of an insurance policy, bounded to `[0, 99]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct InsurancePremium(i32);

impl InsurancePremium {
    pub const MAX: i32 = 99;
    pub const EXPENSIVE_THRESHOLD: i32 = 20;

    /// # Errors
    ///
    /// Returns `DomainError` if `value` is outside `[0, 99]`.
    pub fn new(value: i32) -> Result<Self, DomainError> {
        if !(0..=Self::MAX).contains(&value) {
            return Err(DomainError::OutOfRange {
                field: "insurance_premium",
                min: 0,
                max: Self::MAX,
                value,
            });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn is_expensive(&self) -> bool {
        self.0 >= Self::EXPENSIVE_THRESHOLD
    }

    /// `floor(value * (1 - rate))`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if `rate` is outside `[0, 1]`.
    pub fn apply_discount(self, rate: f64) -> Result<Self, DomainError> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(DomainError::InvalidRate { rate });
        }
        let discounted = floor_f64_to_i32(f64::from(self.0) * (1.0 - rate));
        Ok(Self(discounted.clamp(0, Self::MAX)))
    }

    /// # Errors
    ///
    /// Returns `DomainError` if `multiplier` is negative or NaN.
    pub fn apply_multiplier(self, multiplier: f64) -> Result<Self, DomainError> {
        if multiplier.is_nan() || multiplier < 0.0 {
            return Err(DomainError::NegativeFactor {
                field: "insurance_premium",
                factor: multiplier,
            });
        }
        let scaled = floor_f64_to_i32(f64::from(self.0) * multiplier);
        Ok(Self(scaled.clamp(0, Self::MAX)))
    }

    /// Sum of all premiums, capped at 99; empty input is zero.
    pub fn sum<I: IntoIterator<Item = Self>>(premiums: I) -> Self {
        let total: i64 = premiums.into_iter().map(|p| i64::from(p.0)).sum();
        Self(clamp_i64(total, 0, Self::MAX))
    }
}

impl TryFrom<i32> for InsurancePremium {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<InsurancePremium> for i32 {
    fn from(premium: InsurancePremium) -> Self {
        premium.0
    }
}

impl fmt::Display for InsurancePremium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
