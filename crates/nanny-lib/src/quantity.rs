//! Exact, unit-aware resource quantities
//!
//! Implements the Kubernetes quantity grammar (`"300m"`, `"200Mi"`, `"1.5e3"`)
//! on top of an exact integer count of nano-units. Values are never stored as
//! floating point, so comparisons between configured and observed quantities
//! are exact.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Add;
use std::str::FromStr;
use thiserror::Error;

/// Nano-units per whole unit
const NANOS_PER_UNIT: i128 = 1_000_000_000;

/// Decimal SI suffixes with their power-of-ten exponent, largest first
const DECIMAL_SUFFIXES: &[(&str, i32)] = &[
    ("E", 18),
    ("P", 15),
    ("T", 12),
    ("G", 9),
    ("M", 6),
    ("k", 3),
    ("", 0),
    ("m", -3),
    ("u", -6),
    ("n", -9),
];

/// Binary SI suffixes with their power-of-1024 exponent, largest first
const BINARY_SUFFIXES: &[(&str, u32)] = &[
    ("Ei", 6),
    ("Pi", 5),
    ("Ti", 4),
    ("Gi", 3),
    ("Mi", 2),
    ("Ki", 1),
];

/// Errors produced while parsing a quantity string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("quantity is empty")]
    Empty,
    #[error("invalid number in quantity {0:?}")]
    InvalidNumber(String),
    #[error("unknown suffix {suffix:?} in quantity {input:?}")]
    UnknownSuffix { input: String, suffix: String },
    #[error("quantity {0:?} is out of range")]
    OutOfRange(String),
}

/// The suffix family a quantity is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QuantityFormat {
    /// Powers of ten with SI letters (`m`, `k`, `M`, ...)
    #[default]
    DecimalSI,
    /// Powers of 1024 (`Ki`, `Mi`, `Gi`, ...)
    BinarySI,
    /// Scientific notation (`1e3`, `5E-3`)
    DecimalExponent,
}

/// An exact resource quantity with a preferred output format
#[derive(Debug, Clone, Copy, Default)]
pub struct Quantity {
    nanos: i128,
    format: QuantityFormat,
}

impl Quantity {
    /// Zero in decimal SI
    pub const ZERO: Quantity = Quantity {
        nanos: 0,
        format: QuantityFormat::DecimalSI,
    };

    /// Build a quantity from a whole number of units
    pub fn from_units(units: i64, format: QuantityFormat) -> Self {
        Self {
            nanos: units as i128 * NANOS_PER_UNIT,
            format,
        }
    }

    /// Build a quantity from thousandths of a unit (e.g. CPU millicores)
    pub fn from_milli(milli: i64, format: QuantityFormat) -> Self {
        Self {
            nanos: milli as i128 * 1_000_000,
            format,
        }
    }

    /// Parse a Kubernetes quantity string
    pub fn parse(input: &str) -> Result<Self, QuantityError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(QuantityError::Empty);
        }

        let (negative, rest) = match s.as_bytes()[0] {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };

        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, suffix) = rest.split_at(number_len);

        let (int_part, frac_part) = match number.split_once('.') {
            Some((i, f)) => (i, f),
            None => (number, ""),
        };
        if (int_part.is_empty() && frac_part.is_empty()) || frac_part.contains('.') {
            return Err(QuantityError::InvalidNumber(input.to_string()));
        }

        let out_of_range = || QuantityError::OutOfRange(input.to_string());

        let mut digits: i128 = 0;
        for c in int_part.chars().chain(frac_part.chars()) {
            let d = c.to_digit(10).ok_or_else(|| QuantityError::InvalidNumber(input.to_string()))?;
            digits = digits
                .checked_mul(10)
                .and_then(|v| v.checked_add(d as i128))
                .ok_or_else(out_of_range)?;
        }
        let frac_len = frac_part.len() as i32;

        let (format, magnitude) = if let Some(exp) = binary_exponent(suffix) {
            // digits * 1024^exp * 10^9 / 10^frac_len, rounded up
            let scaled = (0..exp)
                .try_fold(digits, |acc, _| acc.checked_mul(1024))
                .and_then(|v| v.checked_mul(NANOS_PER_UNIT))
                .ok_or_else(out_of_range)?;
            let divisor = pow10(frac_len).ok_or_else(out_of_range)?;
            (QuantityFormat::BinarySI, div_ceil(scaled, divisor))
        } else {
            let (format, exp) = decimal_exponent(suffix).ok_or_else(|| {
                QuantityError::UnknownSuffix {
                    input: input.to_string(),
                    suffix: suffix.to_string(),
                }
            })?;
            let shift = exp
                .checked_add(9)
                .and_then(|v| v.checked_sub(frac_len))
                .ok_or_else(out_of_range)?;
            let magnitude = if shift >= 0 {
                let factor = pow10(shift).ok_or_else(out_of_range)?;
                digits.checked_mul(factor).ok_or_else(out_of_range)?
            } else {
                match pow10(-shift) {
                    Some(divisor) => div_ceil(digits, divisor),
                    // Anything finer than the smallest representable step rounds up to it
                    None => i128::from(digits > 0),
                }
            };
            (format, magnitude)
        };

        Ok(Self {
            nanos: if negative { -magnitude } else { magnitude },
            format,
        })
    }

    /// The suffix family this quantity formats with
    pub fn format(&self) -> QuantityFormat {
        self.format
    }

    /// The same value written in a different suffix family
    pub fn with_format(self, format: QuantityFormat) -> Self {
        Self { format, ..self }
    }

    /// Exact value in nano-units
    pub fn nanos(&self) -> i128 {
        self.nanos
    }

    /// Value in thousandths of a unit, rounded up
    pub fn milli_value(&self) -> i128 {
        div_ceil(self.nanos, 1_000_000)
    }

    /// Approximate value in whole units, for display and metrics only
    pub fn as_f64(&self) -> f64 {
        self.nanos as f64 / NANOS_PER_UNIT as f64
    }

    pub fn is_zero(&self) -> bool {
        self.nanos == 0
    }

    /// Add two quantities, keeping this quantity's format
    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.nanos.checked_add(other.nanos).map(|nanos| Self {
            nanos,
            format: self.format,
        })
    }

    /// Multiply by a count, keeping this quantity's format
    pub fn checked_mul(self, factor: u64) -> Option<Quantity> {
        self.nanos.checked_mul(factor as i128).map(|nanos| Self {
            nanos,
            format: self.format,
        })
    }

    /// Multiply by a count, saturating at the representable range
    pub fn saturating_mul(self, factor: u64) -> Quantity {
        Self {
            nanos: self.nanos.saturating_mul(factor as i128),
            format: self.format,
        }
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Self {
            nanos: self.nanos.saturating_add(rhs.nanos),
            format: self.format,
        }
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.nanos == other.nanos
    }
}

impl Eq for Quantity {}

impl Hash for Quantity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.nanos.hash(state);
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.nanos.cmp(&other.nanos)
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanos == 0 {
            return f.write_str("0");
        }

        match self.format {
            QuantityFormat::BinarySI => {
                if self.nanos % NANOS_PER_UNIT == 0 {
                    let units = self.nanos / NANOS_PER_UNIT;
                    for (suffix, exp) in BINARY_SUFFIXES {
                        let base = 1i128 << (10 * exp);
                        if units % base == 0 {
                            return write!(f, "{}{}", units / base, suffix);
                        }
                    }
                    return write!(f, "{}", units);
                }
                // Fractional values have no binary spelling
                write_decimal_si(f, self.nanos)
            }
            QuantityFormat::DecimalSI => write_decimal_si(f, self.nanos),
            QuantityFormat::DecimalExponent => {
                let mut exp = 18;
                while exp >= -9 {
                    // pow10 cannot fail for exponents in [0, 27]
                    let base = pow10(exp + 9).unwrap_or(1);
                    if self.nanos % base == 0 {
                        let mantissa = self.nanos / base;
                        return if exp == 0 {
                            write!(f, "{}", mantissa)
                        } else {
                            write!(f, "{}e{}", mantissa, exp)
                        };
                    }
                    exp -= 3;
                }
                write!(f, "{}e-9", self.nanos)
            }
        }
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Quantity::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<&k8s_openapi::apimachinery::pkg::api::resource::Quantity> for Quantity {
    type Error = QuantityError;

    fn try_from(
        value: &k8s_openapi::apimachinery::pkg::api::resource::Quantity,
    ) -> Result<Self, Self::Error> {
        Quantity::parse(&value.0)
    }
}

impl From<&Quantity> for k8s_openapi::apimachinery::pkg::api::resource::Quantity {
    fn from(value: &Quantity) -> Self {
        k8s_openapi::apimachinery::pkg::api::resource::Quantity(value.to_string())
    }
}

fn write_decimal_si(f: &mut fmt::Formatter<'_>, nanos: i128) -> fmt::Result {
    for (suffix, exp) in DECIMAL_SUFFIXES {
        let base = pow10(exp + 9).unwrap_or(1);
        if nanos % base == 0 {
            return write!(f, "{}{}", nanos / base, suffix);
        }
    }
    write!(f, "{}n", nanos)
}

fn binary_exponent(suffix: &str) -> Option<u32> {
    BINARY_SUFFIXES
        .iter()
        .find(|(s, _)| *s == suffix)
        .map(|(_, exp)| *exp)
}

fn decimal_exponent(suffix: &str) -> Option<(QuantityFormat, i32)> {
    if let Some((_, exp)) = DECIMAL_SUFFIXES.iter().find(|(s, _)| *s == suffix) {
        return Some((QuantityFormat::DecimalSI, *exp));
    }
    let exponent = suffix
        .strip_prefix('e')
        .or_else(|| suffix.strip_prefix('E'))?;
    exponent
        .parse::<i32>()
        .ok()
        .map(|exp| (QuantityFormat::DecimalExponent, exp))
}

fn pow10(exp: i32) -> Option<i128> {
    if exp < 0 {
        return None;
    }
    10i128.checked_pow(exp as u32)
}

/// Division rounding toward positive infinity
fn div_ceil(value: i128, divisor: i128) -> i128 {
    let q = value / divisor;
    if value % divisor > 0 {
        q + 1
    } else {
        q
    }
}
