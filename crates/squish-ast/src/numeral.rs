//! Numeric literals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest integer a double represents exactly
pub const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A numeral as written in source, split into its parts so that rendering
/// can pick the shortest spelling.
///
/// Numerals are unsigned: `-1` is a unary minus applied to `1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Numeral {
    pub whole: u64,
    /// Fraction digits in source order, without trailing zeros. Hex digits
    /// when `hex` is set.
    pub fraction: String,
    /// Decimal exponent (`e`), or binary exponent (`p`) for hex numerals
    pub exponent: i32,
    pub hex: bool,
}

impl Numeral {
    pub fn new(whole: u64, fraction: impl Into<String>, exponent: i32, hex: bool) -> Self {
        let mut fraction: String = fraction.into();
        fraction.make_ascii_lowercase();
        let trimmed = fraction.trim_end_matches('0').len();
        fraction.truncate(trimmed);
        Self {
            whole,
            fraction,
            exponent,
            hex,
        }
    }

    pub fn integer(whole: u64) -> Self {
        Self::new(whole, "", 0, false)
    }

    pub fn hex_integer(whole: u64) -> Self {
        Self::new(whole, "", 0, true)
    }

    /// Whether the numeral has neither fraction nor exponent
    pub fn is_integer(&self) -> bool {
        self.fraction.is_empty() && self.exponent == 0
    }

    /// Numeric value of the literal
    pub fn value(&self) -> f64 {
        if self.hex {
            let mut value = self.whole as f64;
            let mut scale = 1.0 / 16.0;
            for digit in self.fraction.chars().filter_map(|c| c.to_digit(16)) {
                value += digit as f64 * scale;
                scale /= 16.0;
            }
            value * 2f64.powi(self.exponent)
        } else {
            let fraction = if self.fraction.is_empty() {
                "0"
            } else {
                self.fraction.as_str()
            };
            format!("{}.{}e{}", self.whole, fraction, self.exponent)
                .parse()
                .unwrap_or(f64::NAN)
        }
    }

    /// Builds the integer numeral for `value` if it is exactly representable
    /// as an unsigned literal.
    pub fn from_exact(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 || value > MAX_EXACT_INTEGER || value.fract() != 0.0 {
            return None;
        }
        Some(Self::integer(value as u64))
    }

    /// Same numeral written in decimal, when that is possible without loss
    pub fn to_decimal(&self) -> Option<Self> {
        if !self.hex {
            return Some(self.clone());
        }
        self.is_integer().then(|| Self::integer(self.whole))
    }
}

impl fmt::Display for Numeral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fraction_only = self.whole == 0 && !self.fraction.is_empty();
        if self.hex {
            if fraction_only {
                write!(f, "0x.{}", self.fraction)?;
            } else {
                write!(f, "0x{:x}", self.whole)?;
                if !self.fraction.is_empty() {
                    write!(f, ".{}", self.fraction)?;
                }
            }
            if self.exponent != 0 {
                write!(f, "p{}", self.exponent)?;
            }
        } else {
            if fraction_only {
                write!(f, ".{}", self.fraction)?;
            } else {
                write!(f, "{}", self.whole)?;
                if !self.fraction.is_empty() {
                    write!(f, ".{}", self.fraction)?;
                }
            }
            if self.exponent != 0 {
                write!(f, "e{}", self.exponent)?;
            }
        }
        Ok(())
    }
}
