//! Validated monetary amounts (`rupees.paise`)

use std::fmt;

use chime_types::RawAmount;
use thiserror::Error;

/// Largest amount accepted: the biggest integer an `f64` represents exactly
pub const MAX_AMOUNT: f64 = 9_007_199_254_740_991.0;

/// Errors raised while validating an amount
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AmountError {
    #[error("amount is missing")]
    Missing,

    #[error("amount is not numeric: {raw}")]
    NotNumeric { raw: String },

    #[error("amount is not a finite number")]
    NotFinite,

    #[error("amount {value} is negative")]
    Negative { value: f64 },

    #[error("amount {value} must be greater than zero")]
    NotPositive { value: f64 },

    #[error("amount {value} exceeds the supported maximum")]
    TooLarge { value: f64 },
}

/// A non-negative, finite amount. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Amount(f64);

impl Amount {
    /// Validate a value for decomposition (zero allowed)
    pub fn new(value: f64) -> Result<Self, AmountError> {
        if !value.is_finite() {
            return Err(AmountError::NotFinite);
        }
        if value < 0.0 {
            return Err(AmountError::Negative { value });
        }
        if value > MAX_AMOUNT {
            return Err(AmountError::TooLarge { value });
        }
        // Normalize -0.0
        Ok(Self(value + 0.0))
    }

    /// Validate a value for ingestion (strictly positive)
    pub fn positive(value: f64) -> Result<Self, AmountError> {
        let amount = Self::new(value)?;
        if amount.0 == 0.0 {
            return Err(AmountError::NotPositive { value });
        }
        Ok(amount)
    }

    /// Validate an amount exactly as a producing device sent it.
    ///
    /// Numeric strings are accepted and normalized to numbers.
    pub fn from_raw(raw: Option<&RawAmount>) -> Result<Self, AmountError> {
        let value = match raw {
            None => return Err(AmountError::Missing),
            Some(RawAmount::Number(n)) => *n,
            Some(RawAmount::Text(text)) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err(AmountError::Missing);
                }
                trimmed.parse::<f64>().map_err(|_| AmountError::NotNumeric {
                    raw: text.clone(),
                })?
            }
            Some(RawAmount::Other(value)) => {
                return Err(AmountError::NotNumeric {
                    raw: value.to_string(),
                });
            }
        };
        Self::positive(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Whole rupees, `floor(amount)`
    pub fn rupees(self) -> u64 {
        self.0.floor() as u64
    }

    /// Paise, `round((amount - rupees) * 100)`. May be 100 for inputs such
    /// as `1.999`; callers render it as-is.
    pub fn paise(self) -> u64 {
        ((self.0 - self.0.floor()) * 100.0).round() as u64
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<f64> for Amount {
    type Error = AmountError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
