// Copyright 2024 The Jetdb Authors.
//
// Use of this source code is governed by a BSD 3-clause
// license that can be found in the LICENSE file.

//! The tagged-union value type shared by every evaluated expression, plus
//! the handful of lossy/lossless coercions the operator and function
//! kernels are built on.
//!
//! Booleans are not a distinct variant: by VBA convention `-1` (as a
//! [`Value::Long`]) is TRUE and `0` is FALSE.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

/// Maximum supported precision for [`Value::BigDec`], matching
/// `rust_decimal`'s own 96-bit mantissa ceiling.
pub const MAX_PRECISION: u32 = 28;

/// Errors raised while inspecting or coercing a [`Value`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The operation has no defined meaning on NULL.
    #[error("invalid use of null")]
    Null,

    /// The value could not be interpreted as a boolean.
    #[error("'{0}' cannot be interpreted as a boolean")]
    NotBoolean(String),

    /// The value overflowed, or could not be parsed as, a 32-bit integer.
    #[error("'{0}' does not fit in a 32-bit integer")]
    NotLong(String),

    /// The value could not be interpreted as a number.
    #[error("'{0}' is not numeric")]
    NotNumeric(String),
}

/// Which of a [`Temporal`]'s three on-disk guises a value wears. Purely a
/// rendering distinction: all three share the same date-double arithmetic
/// representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    Date,
    Time,
    DateTime,
}

/// A temporal value: a "date-double" (integer part = days since the Jet
/// epoch, fractional part = time-of-day) plus the format string used to
/// render it back to text.
#[derive(Debug, Clone, PartialEq)]
pub struct Temporal {
    pub date_double: f64,
    pub kind: TemporalKind,
    pub format: String,
}

impl Temporal {
    pub fn new(date_double: f64, kind: TemporalKind, format: impl Into<String>) -> Self {
        Temporal {
            date_double,
            kind,
            format: format.into(),
        }
    }
}

/// The discriminant of a [`Value`], independent of its payload. Mirrors
/// VBA's `VarType` families without committing to VBA's numeric codes --
/// see the `functions` crate for that mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Long,
    Double,
    BigDec,
    Str,
    Date,
    Time,
    DateTime,
}

/// An immutable, typed expression value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Long(i32),
    Double(f64),
    BigDec(Decimal),
    Str(String),
    Date(Temporal),
    Time(Temporal),
    DateTime(Temporal),
}

impl Value {
    /// Constructs the canonical boolean encoding: `-1` for true, `0` for
    /// false.
    pub fn boolean(b: bool) -> Value {
        Value::Long(if b { -1 } else { 0 })
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Long(_) => ValueKind::Long,
            Value::Double(_) => ValueKind::Double,
            Value::BigDec(_) => ValueKind::BigDec,
            Value::Str(_) => ValueKind::Str,
            Value::Date(_) => ValueKind::Date,
            Value::Time(_) => ValueKind::Time,
            Value::DateTime(_) => ValueKind::DateTime,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Long(_) | Value::Double(_) | Value::BigDec(_))
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Value::Date(_) | Value::Time(_) | Value::DateTime(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    /// The date-double of a temporal value, if this is one.
    pub fn temporal(&self) -> Option<&Temporal> {
        match self {
            Value::Date(t) | Value::Time(t) | Value::DateTime(t) => Some(t),
            _ => None,
        }
    }

    /// Any non-zero number is true; the strings `"true"`/`"false"`
    /// (case-insensitive) are recognised; everything else fails.
    pub fn as_boolean(&self) -> Result<bool, Error> {
        match self {
            Value::Null => Err(Error::Null),
            Value::Long(n) => Ok(*n != 0),
            Value::Double(d) => Ok(*d != 0.0),
            Value::BigDec(d) => Ok(!d.is_zero()),
            Value::Str(s) => {
                if s.eq_ignore_ascii_case("true") {
                    Ok(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Ok(false)
                } else {
                    Err(Error::NotBoolean(s.clone()))
                }
            }
            Value::Date(t) | Value::Time(t) | Value::DateTime(t) => Ok(t.date_double != 0.0),
        }
    }

    /// Fails on overflow or a non-numeric string, per the distilled spec.
    pub fn as_long(&self) -> Result<i32, Error> {
        match self {
            Value::Null => Err(Error::Null),
            Value::Long(n) => Ok(*n),
            Value::Double(d) => long_from_f64(*d),
            Value::BigDec(d) => long_from_decimal(*d),
            Value::Str(s) => s
                .trim()
                .parse::<Decimal>()
                .map_err(|_| Error::NotNumeric(s.clone()))
                .and_then(|d| long_from_decimal(d)),
            Value::Date(t) | Value::Time(t) | Value::DateTime(t) => long_from_f64(t.date_double),
        }
    }

    pub fn as_double(&self) -> Result<f64, Error> {
        match self {
            Value::Null => Err(Error::Null),
            Value::Long(n) => Ok(*n as f64),
            Value::Double(d) => Ok(*d),
            Value::BigDec(d) => d.to_f64().ok_or_else(|| Error::NotNumeric(d.to_string())),
            Value::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::NotNumeric(s.clone())),
            Value::Date(t) | Value::Time(t) | Value::DateTime(t) => Ok(t.date_double),
        }
    }

    pub fn as_big_decimal(&self) -> Result<Decimal, Error> {
        match self {
            Value::Null => Err(Error::Null),
            Value::Long(n) => Ok(Decimal::from(*n)),
            Value::Double(d) => {
                Decimal::from_f64_retain(*d).ok_or_else(|| Error::NotNumeric(d.to_string()))
            }
            Value::BigDec(d) => Ok(*d),
            Value::Str(s) => s
                .trim()
                .parse::<Decimal>()
                .map_err(|_| Error::NotNumeric(s.clone())),
            Value::Date(t) | Value::Time(t) | Value::DateTime(t) => {
                Decimal::from_f64_retain(t.date_double)
                    .ok_or_else(|| Error::NotNumeric(t.date_double.to_string()))
            }
        }
    }

    /// The canonical text rendering. Temporal values render via their own
    /// stored format string; numeric values use their natural `Display`.
    pub fn as_string(&self) -> Result<String, Error> {
        match self {
            Value::Null => Err(Error::Null),
            Value::Long(n) => Ok(n.to_string()),
            Value::Double(d) => Ok(format!("{}", d)),
            Value::BigDec(d) => Ok(normalize_decimal(*d).to_string()),
            Value::Str(s) => Ok(s.clone()),
            Value::Date(t) | Value::Time(t) | Value::DateTime(t) => Ok(t.format.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_string() {
            Ok(s) => write!(f, "{}", s),
            Err(_) => write!(f, "Null"),
        }
    }
}

fn long_from_f64(d: f64) -> Result<i32, Error> {
    let rounded = d.round();
    if rounded < i32::MIN as f64 || rounded > i32::MAX as f64 || !rounded.is_finite() {
        return Err(Error::NotLong(d.to_string()));
    }
    Ok(rounded as i32)
}

fn long_from_decimal(d: Decimal) -> Result<i32, Error> {
    let rounded = d.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    rounded
        .to_string()
        .parse::<i32>()
        .map_err(|_| Error::NotLong(d.to_string()))
}

/// Strips trailing fractional zeros and guarantees a non-negative scale,
/// per the distilled spec's normalisation rule.
///
/// `rust_decimal`'s own [`Decimal::normalize`] already special-cases the
/// zero value down to scale `0`, which is the "workaround" the spec calls
/// out explicitly; this function exists so callers have one documented
/// entry point rather than relying on that incidentally.
pub fn normalize_decimal(d: Decimal) -> Decimal {
    d.normalize()
}

/// Rounds `d` to `scale` digits using banker's rounding (round-half-to-even),
/// matching the spec's decimal arithmetic context (precision 28, HALF_EVEN).
pub fn round_half_even(d: Decimal, scale: u32) -> Decimal {
    d.round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_encoding_round_trips() {
        assert_eq!(Value::boolean(true), Value::Long(-1));
        assert_eq!(Value::boolean(false), Value::Long(0));
        assert_eq!(Value::Long(-1).as_boolean().unwrap(), true);
        assert_eq!(Value::Long(0).as_boolean().unwrap(), false);
        assert_eq!(Value::Long(42).as_boolean().unwrap(), true);
    }

    #[test]
    fn string_boolean_is_case_insensitive() {
        assert_eq!(Value::Str("TRUE".into()).as_boolean().unwrap(), true);
        assert_eq!(Value::Str("False".into()).as_boolean().unwrap(), false);
        assert!(Value::Str("nope".into()).as_boolean().is_err());
    }

    #[test]
    fn as_long_fails_on_overflow() {
        assert!(Value::Double(1e30).as_long().is_err());
        assert_eq!(Value::Double(2.0).as_long().unwrap(), 2);
    }

    #[test]
    fn as_long_fails_on_non_numeric_string() {
        assert!(Value::Str("abc".into()).as_long().is_err());
        assert_eq!(Value::Str("5".into()).as_long().unwrap(), 5);
    }

    #[test]
    fn normalize_is_idempotent() {
        let d: Decimal = "33.330000".parse().unwrap();
        let once = normalize_decimal(d);
        let twice = normalize_decimal(once);
        assert_eq!(once, twice);
        assert_eq!(once.to_string(), "33.33");
    }

    #[test]
    fn normalize_zero_value_workaround() {
        let d: Decimal = "0.000".parse().unwrap();
        assert_eq!(normalize_decimal(d).scale(), 0);
    }

    #[test]
    fn round_half_even_matches_banker_rounding() {
        let two_point_five: Decimal = "2.5".parse().unwrap();
        let three_point_five: Decimal = "3.5".parse().unwrap();
        assert_eq!(round_half_even(two_point_five, 0).to_string(), "2");
        assert_eq!(round_half_even(three_point_five, 0).to_string(), "4");
    }

    #[test]
    fn null_conversions_error() {
        assert_eq!(Value::Null.as_boolean(), Err(Error::Null));
        assert_eq!(Value::Null.as_long(), Err(Error::Null));
        assert_eq!(Value::Null.as_double(), Err(Error::Null));
        assert_eq!(Value::Null.as_string(), Err(Error::Null));
    }
}
