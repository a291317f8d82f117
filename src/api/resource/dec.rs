// Copyright 2024 The Kubernetes Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fixed-point decimal numbers backed by a scaled 128-bit integer.
//!
//! A `Dec` is the value `unscaled / 10^scale`. Every operation is exact or
//! rounds with an explicit `Rounding` mode; nothing goes through binary floats.

use super::QuantityError;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Largest scale a `Dec` can carry. `10^MAX_SCALE` still fits in an `i128`.
pub const MAX_SCALE: u32 = 38;

/// Rounding mode used when a value loses fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Drop the discarded digits (round toward zero).
    Down,
    /// Round away from zero whenever a discarded digit is non-zero.
    Up,
    /// Round to nearest, ties away from zero.
    HalfUp,
}

/// Returns `10^exp`, or `None` if it does not fit in an `i128`.
pub(crate) fn pow10(exp: u32) -> Option<i128> {
    10i128.checked_pow(exp)
}

/// Dec is an exact decimal number: `unscaled * 10^-scale`.
#[derive(Debug, Clone, Copy)]
pub struct Dec {
    unscaled: i128,
    scale: u32,
}

impl Dec {
    pub const ZERO: Dec = Dec {
        unscaled: 0,
        scale: 0,
    };

    /// Create a decimal from an unscaled integer and a scale.
    ///
    /// Scales above [`MAX_SCALE`] are reduced to it, rounding away from zero.
    pub fn new(unscaled: i128, scale: u32) -> Self {
        let dec = Dec { unscaled, scale };
        if scale > MAX_SCALE {
            dec.shift_down(scale - MAX_SCALE, Rounding::Up)
        } else {
            dec
        }
    }

    /// Create a whole-number decimal.
    pub fn from_int(value: i128) -> Self {
        Dec::new(value, 0)
    }

    /// Convert a float through its shortest round-trip decimal form, keeping at
    /// most `max_scale` fractional digits (rounded half up).
    ///
    /// Returns `None` for NaN, infinities and magnitudes that do not fit.
    pub fn from_f64(value: f64, max_scale: u32) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let parsed: Dec = format!("{}", value).parse().ok()?;
        if parsed.scale > max_scale {
            parsed.rescale(max_scale, Rounding::HalfUp)
        } else {
            Some(parsed)
        }
    }

    pub fn unscaled(&self) -> i128 {
        self.unscaled
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.unscaled == 0
    }

    pub fn is_negative(&self) -> bool {
        self.unscaled < 0
    }

    /// Return the same value expressed at `scale`, rounding if digits are lost.
    ///
    /// Returns `None` only when widening the scale overflows.
    pub fn rescale(&self, scale: u32, rounding: Rounding) -> Option<Dec> {
        if scale > MAX_SCALE {
            return None;
        }
        if scale >= self.scale {
            let factor = pow10(scale - self.scale)?;
            let unscaled = self.unscaled.checked_mul(factor)?;
            Some(Dec { unscaled, scale })
        } else {
            Some(self.shift_down(self.scale - scale, rounding))
        }
    }

    /// The value multiplied by `10^scale` and rounded to an integer.
    pub fn to_integer(&self, scale: u32, rounding: Rounding) -> Option<i128> {
        if scale >= self.scale {
            let factor = pow10(scale - self.scale)?;
            self.unscaled.checked_mul(factor)
        } else {
            Some(self.shift_down(self.scale - scale, rounding).unscaled)
        }
    }

    /// Multiply by `10^exp` exactly. Negative exponents grow the scale.
    pub fn mul_pow10(&self, exp: i32) -> Option<Dec> {
        if exp >= 0 {
            let exp = exp as u32;
            if exp <= self.scale {
                return Some(Dec {
                    unscaled: self.unscaled,
                    scale: self.scale - exp,
                });
            }
            let unscaled = self.unscaled.checked_mul(pow10(exp - self.scale)?)?;
            Some(Dec { unscaled, scale: 0 })
        } else {
            let scale = self.scale.checked_add(exp.unsigned_abs())?;
            Some(Dec::new(self.unscaled, scale))
        }
    }

    /// Multiply by an integer exactly.
    pub fn mul_int(&self, factor: i128) -> Option<Dec> {
        Some(Dec {
            unscaled: self.unscaled.checked_mul(factor)?,
            scale: self.scale,
        })
    }

    /// Drop trailing fractional zeros.
    pub fn normalize(&self) -> Dec {
        let mut dec = *self;
        while dec.scale > 0 && dec.unscaled % 10 == 0 {
            dec.unscaled /= 10;
            dec.scale -= 1;
        }
        dec
    }

    fn shift_down(&self, digits: u32, rounding: Rounding) -> Dec {
        let scale = self.scale - digits;
        let divisor = match pow10(digits) {
            Some(d) => d,
            // Every digit is discarded; only the sign survives rounding.
            None => {
                let unscaled = match rounding {
                    Rounding::Up if self.unscaled != 0 => self.unscaled.signum(),
                    _ => 0,
                };
                return Dec { unscaled, scale };
            }
        };
        let quotient = self.unscaled / divisor;
        let remainder = self.unscaled % divisor;
        let round_away = match rounding {
            Rounding::Down => false,
            Rounding::Up => remainder != 0,
            Rounding::HalfUp => remainder.unsigned_abs() * 2 >= divisor.unsigned_abs(),
        };
        let unscaled = if round_away {
            quotient.saturating_add(self.unscaled.signum())
        } else {
            quotient
        };
        Dec { unscaled, scale }
    }

    /// Split into a floored integer part and a non-negative fraction at the
    /// value's own scale.
    fn split(&self) -> (i128, i128) {
        // scale <= MAX_SCALE, so the power always fits.
        let one = 10i128.pow(self.scale);
        (self.unscaled.div_euclid(one), self.unscaled.rem_euclid(one))
    }
}

impl Default for Dec {
    fn default() -> Self {
        Dec::ZERO
    }
}

impl Ord for Dec {
    fn cmp(&self, other: &Self) -> Ordering {
        let (self_int, self_frac) = self.split();
        let (other_int, other_frac) = other.split();
        self_int.cmp(&other_int).then_with(|| {
            // Both fractions are below 10^scale, so aligning them to the larger
            // scale stays below 10^MAX_SCALE.
            let scale = self.scale.max(other.scale);
            let lhs = self_frac * 10i128.pow(scale - self.scale);
            let rhs = other_frac * 10i128.pow(scale - other.scale);
            lhs.cmp(&rhs)
        })
    }
}

impl PartialOrd for Dec {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Dec {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Dec {}

impl FromStr for Dec {
    type Err = QuantityError;

    /// Parse `[+-]digits[.digits]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(QuantityError::Empty);
        }
        let invalid = || QuantityError::InvalidNumber(s.to_string());

        let (negative, body) = match s.as_bytes()[0] {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };
        let (whole, fraction) = match body.split_once('.') {
            Some((w, f)) => (w, f),
            None => (body, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }

        if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        // Precision past MAX_SCALE is rounded up.
        let (kept, dropped) = fraction.split_at(fraction.len().min(MAX_SCALE as usize));
        let mut unscaled: i128 = 0;
        for c in whole.chars().chain(kept.chars()) {
            let digit = i128::from(c as u8 - b'0');
            unscaled = unscaled
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or(QuantityError::Overflow)?;
        }
        if dropped.chars().any(|c| c != '0') {
            unscaled = unscaled.checked_add(1).ok_or(QuantityError::Overflow)?;
        }
        let scale = kept.len() as u32;

        if negative {
            unscaled = -unscaled;
        }
        Ok(Dec { unscaled, scale })
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.unscaled);
        }
        let (sign, magnitude) = if self.unscaled < 0 {
            ("-", self.unscaled.unsigned_abs())
        } else {
            ("", self.unscaled.unsigned_abs())
        };
        let one = 10u128.pow(self.scale);
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            magnitude / one,
            magnitude % one,
            width = self.scale as usize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!(dec("12.50").unscaled(), 1250);
        assert_eq!(dec("12.50").scale(), 2);
        assert_eq!(dec("-0.001").unscaled(), -1);
        assert_eq!(dec("+7").unscaled(), 7);
        assert_eq!(dec(".5"), dec("0.5"));
        assert_eq!(dec("3."), dec("3"));
        assert!("".parse::<Dec>().is_err());
        assert!(".".parse::<Dec>().is_err());
        assert!("1.2.3".parse::<Dec>().is_err());
        assert!("1a".parse::<Dec>().is_err());
        assert!(matches!(
            "9".repeat(40).parse::<Dec>(),
            Err(QuantityError::Overflow)
        ));
    }

    #[test]
    fn test_equality_ignores_scale() {
        assert_eq!(dec("1"), dec("1.000"));
        assert!(dec("0.999") < dec("1"));
        assert!(dec("-1.5") < dec("-1.25"));
        assert!(dec("2.0001") > dec("2"));
    }

    #[test]
    fn test_rescale_rounding() {
        let v = dec("1.2345");
        assert_eq!(v.rescale(2, Rounding::Down).unwrap(), dec("1.23"));
        assert_eq!(v.rescale(2, Rounding::Up).unwrap(), dec("1.24"));
        assert_eq!(v.rescale(3, Rounding::HalfUp).unwrap(), dec("1.235"));
        assert_eq!(dec("-1.2345").rescale(2, Rounding::Up).unwrap(), dec("-1.24"));
        assert_eq!(dec("-1.2345").rescale(2, Rounding::Down).unwrap(), dec("-1.23"));
        assert_eq!(v.rescale(6, Rounding::Down).unwrap().unscaled(), 1_234_500);
    }

    #[test]
    fn test_to_integer() {
        assert_eq!(dec("0.0001").to_integer(3, Rounding::Up), Some(1));
        assert_eq!(dec("0.0001").to_integer(3, Rounding::Down), Some(0));
        assert_eq!(dec("2").to_integer(3, Rounding::Up), Some(2000));
    }

    #[test]
    fn test_new_reduces_large_scales_in_one_step() {
        assert_eq!(Dec::new(5, 1000), Dec::new(1, MAX_SCALE));
        assert_eq!(Dec::new(5, 1000).scale(), MAX_SCALE);
        assert_eq!(Dec::new(-5, u32::MAX), Dec::new(-1, MAX_SCALE));
        assert!(Dec::new(0, u32::MAX).is_zero());
        assert_eq!(dec("1").mul_pow10(i32::MIN).unwrap(), Dec::new(1, MAX_SCALE));
    }

    #[test]
    fn test_mul_pow10() {
        assert_eq!(dec("1.5").mul_pow10(3).unwrap(), dec("1500"));
        assert_eq!(dec("1.5").mul_pow10(-3).unwrap(), dec("0.0015"));
        assert_eq!(dec("100").mul_pow10(1).unwrap(), dec("1000"));
    }

    #[test]
    fn test_from_f64_is_exact_for_short_decimals() {
        assert_eq!(Dec::from_f64(0.1, 9).unwrap(), dec("0.1"));
        assert_eq!(Dec::from_f64(50.0, 9).unwrap(), dec("50"));
        assert_eq!(Dec::from_f64(12.5, 9).unwrap(), dec("12.5"));
        assert_eq!(
            Dec::from_f64(100.0 / 3.0, 9).unwrap(),
            dec("33.333333333")
        );
        assert!(Dec::from_f64(f64::NAN, 9).is_none());
        assert!(Dec::from_f64(f64::INFINITY, 9).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(dec("1.050").to_string(), "1.050");
        assert_eq!(dec("-0.25").to_string(), "-0.25");
        assert_eq!(dec("42").to_string(), "42");
        assert_eq!(dec("1.050").normalize().to_string(), "1.05");
    }
}
