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

//! Resource quantities ("500m", "1Gi", "2.5", "1e3").
//!
//! A `Quantity` holds an exact decimal amount together with the notation it was
//! written in, so rewritten values keep the format users chose.

mod dec;

pub use dec::{Dec, Rounding, MAX_SCALE};

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Quantities are stored with at most nano precision; finer digits round up.
const NANO_SCALE: u32 = 9;

/// Errors returned when parsing a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("quantity is empty")]
    Empty,

    #[error("invalid numeric value {0:?}")]
    InvalidNumber(String),

    #[error("unknown quantity suffix {0:?}")]
    InvalidSuffix(String),

    #[error("quantity is too large")]
    Overflow,
}

/// Format is the notation a quantity is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// e.g. "12e6"
    DecimalExponent,
    /// e.g. "12Mi" (binary multiples of 1024)
    BinarySI,
    /// e.g. "12M", "500m"
    #[default]
    DecimalSI,
}

const BINARY_SUFFIXES: [(&str, u32); 6] = [
    ("Ki", 10),
    ("Mi", 20),
    ("Gi", 30),
    ("Ti", 40),
    ("Pi", 50),
    ("Ei", 60),
];

const DECIMAL_SUFFIXES: [(&str, i32); 10] = [
    ("n", -9),
    ("u", -6),
    ("m", -3),
    ("", 0),
    ("k", 3),
    ("M", 6),
    ("G", 9),
    ("T", 12),
    ("P", 15),
    ("E", 18),
];

/// Quantity is an exact, fixed-point representation of a resource amount.
///
/// Equality and ordering compare amounts only; the format is presentation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quantity {
    amount: Dec,
    format: Format,
}

impl Quantity {
    /// Create a quantity from an amount and the format to render it in.
    pub fn new(amount: Dec, format: Format) -> Self {
        Self { amount, format }
    }

    /// Create a quantity of `millis / 1000` units (scale 3).
    pub fn from_milli(millis: i128, format: Format) -> Self {
        Self::new(Dec::new(millis, 3), format)
    }

    /// Create a whole-unit quantity (scale 0).
    pub fn from_value(value: i128, format: Format) -> Self {
        Self::new(Dec::from_int(value), format)
    }

    /// A zero quantity in the given format.
    pub fn zero(format: Format) -> Self {
        Self::new(Dec::ZERO, format)
    }

    /// Parse a quantity string.
    pub fn parse(s: &str) -> Result<Self, QuantityError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(QuantityError::Empty);
        }

        let number_end = s
            .char_indices()
            .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && i == 0)))
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        let (number, suffix) = s.split_at(number_end);
        if number.is_empty() {
            return Err(QuantityError::InvalidNumber(s.to_string()));
        }
        let number: Dec = number.parse()?;

        let (amount, format) = if let Some(&(_, shift)) =
            BINARY_SUFFIXES.iter().find(|(name, _)| *name == suffix)
        {
            let amount = number.mul_int(1i128 << shift).ok_or(QuantityError::Overflow)?;
            (amount, Format::BinarySI)
        } else if let Some(&(_, exp)) = DECIMAL_SUFFIXES.iter().find(|(name, _)| *name == suffix) {
            let amount = number.mul_pow10(exp).ok_or(QuantityError::Overflow)?;
            (amount, Format::DecimalSI)
        } else if let Some(exp) = suffix
            .strip_prefix(['e', 'E'])
            .and_then(|e| e.parse::<i32>().ok())
        {
            let amount = number.mul_pow10(exp).ok_or(QuantityError::Overflow)?;
            (amount, Format::DecimalExponent)
        } else {
            return Err(QuantityError::InvalidSuffix(suffix.to_string()));
        };

        let amount = if amount.scale() > NANO_SCALE {
            amount
                .rescale(NANO_SCALE, Rounding::Up)
                .ok_or(QuantityError::Overflow)?
        } else {
            amount
        };
        // Every stored quantity must be representable in nano units.
        amount
            .to_integer(NANO_SCALE, Rounding::Up)
            .ok_or(QuantityError::Overflow)?;

        Ok(Self { amount, format })
    }

    /// The exact amount.
    pub fn amount(&self) -> &Dec {
        &self.amount
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// The amount rounded up to whole units (bytes, cores).
    pub fn value(&self) -> i128 {
        self.scaled_value(0)
    }

    /// The amount in thousandths of a unit, rounded up.
    pub fn milli_value(&self) -> i128 {
        self.scaled_value(3)
    }

    fn scaled_value(&self, scale: u32) -> i128 {
        self.amount
            .to_integer(scale, Rounding::Up)
            .unwrap_or(if self.amount.is_negative() {
                i128::MIN
            } else {
                i128::MAX
            })
    }

    fn fmt_decimal(&self, f: &mut fmt::Formatter<'_>, exponent: bool) -> fmt::Result {
        let nanos = match self.amount.to_integer(NANO_SCALE, Rounding::Up) {
            Some(n) => n,
            None => return write!(f, "{}", self.amount.normalize()),
        };
        if nanos == 0 {
            return write!(f, "0");
        }
        for &(suffix, exp) in DECIMAL_SUFFIXES.iter().rev() {
            let unit = match dec::pow10((exp + NANO_SCALE as i32) as u32) {
                Some(u) => u,
                None => continue,
            };
            if nanos % unit == 0 {
                let mantissa = nanos / unit;
                return match (exponent, exp) {
                    (_, 0) => write!(f, "{}", mantissa),
                    (true, _) => write!(f, "{}e{}", mantissa, exp),
                    (false, _) => write!(f, "{}{}", mantissa, suffix),
                };
            }
        }
        // Unreachable: every nano count is a multiple of 1n.
        write!(f, "{}n", nanos)
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.amount == other.amount
    }
}

impl Eq for Quantity {}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.amount.cmp(&other.amount)
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quantity::parse(s)
    }
}

impl fmt::Display for Quantity {
    /// Renders the canonical form: the largest suffix that keeps an integer
    /// mantissa. Fractional binary quantities fall back to decimal notation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format {
            Format::BinarySI => {
                let whole = self.amount.rescale(0, Rounding::Down);
                match whole {
                    Some(w) if w == self.amount => {
                        let value = w.unscaled();
                        if value != 0 {
                            for &(suffix, shift) in BINARY_SUFFIXES.iter().rev() {
                                let unit = 1i128 << shift;
                                if value % unit == 0 {
                                    return write!(f, "{}{}", value / unit, suffix);
                                }
                            }
                        }
                        write!(f, "{}", value)
                    }
                    _ => self.fmt_decimal(f, false),
                }
            }
            Format::DecimalSI => self.fmt_decimal(f, false),
            Format::DecimalExponent => self.fmt_decimal(f, true),
        }
    }
}
