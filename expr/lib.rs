// Copyright 2024 The Jetdb Authors.
//
// Use of this source code is governed by a BSD 3-clause
// license that can be found in the LICENSE file.

//! The operator kernel: null propagation, the three arithmetic
//! type-precedence modes, the numeric promotion lattice, and the
//! unary/binary/ternary operator semantics built on top of them.
//!
//! The expression tokenizer and parser are out of scope for this
//! workspace; callers hand this crate already-evaluated [`Value`]
//! operands and get back a [`Value`] or an [`eval::Error`].

use eval::Error;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use value::{Temporal, TemporalKind, Value};

/// A binary expression operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Imp,
    Concat,
}

/// A unary expression operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// A pre-compiled `Like` pattern. The expression parser is responsible
/// for compiling the pattern text; this crate only needs something it
/// can match a string against.
pub trait Pattern {
    fn matches(&self, s: &str) -> bool;
}

/// The three arithmetic type-precedence modes (§5.3). Exposed so callers
/// that need to reason about a result type ahead of evaluation (e.g. a
/// query planner) can do so without duplicating the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    Simple,
    General,
    Compare,
}

impl BinaryOp {
    pub fn precedence(self) -> Option<Precedence> {
        use BinaryOp::*;
        match self {
            Add | Sub => Some(Precedence::Simple),
            Mul | Div | IntDiv | Mod | Pow => Some(Precedence::General),
            Eq | Ne | Lt | Le | Gt | Ge => Some(Precedence::Compare),
            And | Or | Imp | Concat => None,
        }
    }
}

/// A numeric operand demoted to one of the three rungs of the promotion
/// lattice.
#[derive(Debug, Clone, Copy)]
enum Num {
    Long(i32),
    Double(f64),
    Dec(Decimal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum NumKind {
    Long,
    Double,
    Dec,
}

fn num_kind(n: &Num) -> NumKind {
    match n {
        Num::Long(_) => NumKind::Long,
        Num::Double(_) => NumKind::Double,
        Num::Dec(_) => NumKind::Dec,
    }
}

fn pref_fp(k: NumKind) -> NumKind {
    match k {
        NumKind::Long => NumKind::Double,
        other => other,
    }
}

/// The numeric promotion lattice: `LONG < DOUBLE < BIG_DEC`. Two
/// integrals stay integral; otherwise each side is widened to its
/// preferred floating representation and the wider of the two wins.
fn promote(a: NumKind, b: NumKind) -> NumKind {
    if a == NumKind::Long && b == NumKind::Long {
        NumKind::Long
    } else {
        pref_fp(a).max(pref_fp(b))
    }
}

fn to_decimal(n: &Num) -> Decimal {
    match n {
        Num::Long(v) => Decimal::from(*v),
        Num::Double(d) => Decimal::from_f64_retain(*d).unwrap_or(Decimal::ZERO),
        Num::Dec(d) => *d,
    }
}

fn to_f64(n: &Num) -> f64 {
    match n {
        Num::Long(v) => *v as f64,
        Num::Double(d) => *d,
        Num::Dec(d) => d.to_f64().unwrap_or(f64::NAN),
    }
}

fn downcast(kind: NumKind, d: Decimal) -> Value {
    match kind {
        NumKind::Long => d
            .to_i32()
            .map(Value::Long)
            .unwrap_or_else(|| Value::Double(d.to_f64().unwrap_or(f64::NAN))),
        NumKind::Double => Value::Double(d.to_f64().unwrap_or(f64::NAN)),
        NumKind::Dec => Value::BigDec(value::normalize_decimal(d)),
    }
}

/// Demotes a non-STRING value to its numeric representation: numeric
/// values pass through, temporals demote to their date-double as a
/// `DOUBLE` ("their preferred numeric type"). Fails on STRING and NULL --
/// callers handle those cases themselves.
fn demote_to_numeric(v: &Value) -> Result<Num, Error> {
    match v {
        Value::Long(n) => Ok(Num::Long(*n)),
        Value::Double(d) => Ok(Num::Double(*d)),
        Value::BigDec(d) => Ok(Num::Dec(*d)),
        Value::Date(t) | Value::Time(t) | Value::DateTime(t) => Ok(Num::Double(t.date_double)),
        Value::Str(s) => Err(Error::TypeError(format!("'{}' is not numeric", s))),
        Value::Null => Err(Error::TypeError("null is not numeric".to_string())),
    }
}

/// Resolves a pair of operands to `Num`s plus the result kind the
/// type-precedence rules dictate, applying the STRING<->numeric
/// coercion rule when exactly one side is a string: the string is parsed
/// as a decimal, and the *other* side determines the result kind (STRING
/// paired with BIG_DEC stays BIG_DEC; otherwise the result is DOUBLE).
fn coerce_numeric_pair(lhs: &Value, rhs: &Value) -> Result<((Num, Num), NumKind), Error> {
    if lhs.is_string() != rhs.is_string() {
        let (str_val, str_is_lhs) = if lhs.is_string() {
            (lhs, true)
        } else {
            (rhs, false)
        };
        let other = if str_is_lhs { rhs } else { lhs };
        let s = match str_val {
            Value::Str(s) => s,
            _ => unreachable!(),
        };
        let parsed: Decimal = s
            .trim()
            .parse()
            .map_err(|_| Error::TypeError(format!("'{}' is not numeric", s)))?;
        let other_num = demote_to_numeric(other)?;
        let target = if num_kind(&other_num) == NumKind::Dec {
            NumKind::Dec
        } else {
            NumKind::Double
        };
        let str_num = Num::Dec(parsed);
        let pair = if str_is_lhs {
            (str_num, other_num)
        } else {
            (other_num, str_num)
        };
        return Ok((pair, target));
    }

    let l = demote_to_numeric(lhs)?;
    let r = demote_to_numeric(rhs)?;
    let kind = promote(num_kind(&l), num_kind(&r));
    Ok(((l, r), kind))
}

fn tri(v: &Value) -> Result<Option<bool>, Error> {
    if v.is_null() {
        Ok(None)
    } else {
        v.as_boolean().map(Some).map_err(Error::from)
    }
}

fn tri_to_value(t: Option<bool>) -> Value {
    match t {
        Some(b) => Value::boolean(b),
        None => Value::Null,
    }
}

fn and(lhs: Value, rhs: Value) -> Result<Value, Error> {
    let l = tri(&lhs)?;
    let r = tri(&rhs)?;
    let result = match (l, r) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    };
    Ok(tri_to_value(result))
}

fn or(lhs: Value, rhs: Value) -> Result<Value, Error> {
    let l = tri(&lhs)?;
    let r = tri(&rhs)?;
    let result = match (l, r) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    };
    Ok(tri_to_value(result))
}

/// `a -> b`. `F -> *` is always `T`; `T -> b` takes `b`'s truth value
/// directly; `N -> T` is `T`, `N -> F` and `N -> N` stay `N`.
fn imp(lhs: Value, rhs: Value) -> Result<Value, Error> {
    let l = tri(&lhs)?;
    let r = tri(&rhs)?;
    let result = match l {
        Some(false) => Some(true),
        Some(true) => r,
        None => match r {
            Some(true) => Some(true),
            _ => None,
        },
    };
    Ok(tri_to_value(result))
}

fn concat(lhs: Value, rhs: Value) -> Result<Value, Error> {
    let l = if lhs.is_null() {
        String::new()
    } else {
        lhs.as_string().map_err(Error::from)?
    };
    let r = if rhs.is_null() {
        String::new()
    } else {
        rhs.as_string().map_err(Error::from)?
    };
    Ok(Value::Str(l + &r))
}

fn rewrap_temporal(template: &Value, date_double: f64) -> Value {
    match template {
        Value::Date(t) => Value::Date(Temporal::new(date_double, TemporalKind::Date, t.format.clone())),
        Value::Time(t) => Value::Time(Temporal::new(date_double, TemporalKind::Time, t.format.clone())),
        Value::DateTime(t) => {
            Value::DateTime(Temporal::new(date_double, TemporalKind::DateTime, t.format.clone()))
        }
        _ => unreachable!("rewrap_temporal called on a non-temporal template"),
    }
}

fn numeric_add_sub(l: Num, r: Num, kind: NumKind, is_add: bool) -> Value {
    if kind == NumKind::Long {
        if let (Num::Long(a), Num::Long(b)) = (l, r) {
            let res = if is_add {
                a as i64 + b as i64
            } else {
                a as i64 - b as i64
            };
            return if res >= i32::MIN as i64 && res <= i32::MAX as i64 {
                Value::Long(res as i32)
            } else {
                Value::Double(res as f64)
            };
        }
    }
    let a = to_decimal(&l);
    let b = to_decimal(&r);
    let res = if is_add { a + b } else { a - b };
    downcast(kind, res)
}

fn simple_op(lhs: Value, rhs: Value, is_add: bool) -> Result<Value, Error> {
    let same_temporal_kind = matches!(
        (&lhs, &rhs),
        (Value::Date(_), Value::Date(_))
            | (Value::Time(_), Value::Time(_))
            | (Value::DateTime(_), Value::DateTime(_))
    );
    if same_temporal_kind {
        let l = lhs.temporal().unwrap().date_double;
        let r = rhs.temporal().unwrap().date_double;
        let result = if is_add { l + r } else { l - r };
        return Ok(rewrap_temporal(&lhs, result));
    }

    if lhs.is_temporal() && rhs.is_temporal() {
        let l = lhs.temporal().unwrap().date_double;
        let r = rhs.temporal().unwrap().date_double;
        let result = if is_add { l + r } else { l - r };
        return Ok(Value::DateTime(Temporal::new(result, TemporalKind::DateTime, String::new())));
    }

    match coerce_numeric_pair(&lhs, &rhs) {
        Ok(((l, r), kind)) => Ok(numeric_add_sub(l, r, kind, is_add)),
        Err(e) => {
            if is_add {
                let l = lhs.as_string().map_err(Error::from)?;
                let r = rhs.as_string().map_err(Error::from)?;
                Ok(Value::Str(l + &r))
            } else {
                Err(e)
            }
        }
    }
}

fn mul(lhs: Value, rhs: Value) -> Result<Value, Error> {
    let ((l, r), kind) = coerce_numeric_pair(&lhs, &rhs)?;
    if kind == NumKind::Long {
        if let (Num::Long(a), Num::Long(b)) = (l, r) {
            let res = a as i64 * b as i64;
            return Ok(if res >= i32::MIN as i64 && res <= i32::MAX as i64 {
                Value::Long(res as i32)
            } else {
                Value::Double(res as f64)
            });
        }
    }
    let res = to_decimal(&l) * to_decimal(&r);
    Ok(downcast(kind, res))
}

fn div(lhs: Value, rhs: Value) -> Result<Value, Error> {
    if let (Value::Long(a), Value::Long(b)) = (&lhs, &rhs) {
        if *b == 0 {
            return Err(Error::Arithmetic("division by zero".to_string()));
        }
        return Ok(if a % b == 0 {
            Value::Long(a / b)
        } else {
            Value::Double(*a as f64 / *b as f64)
        });
    }

    let ((l, r), kind) = coerce_numeric_pair(&lhs, &rhs)?;
    let a = to_decimal(&l);
    let b = to_decimal(&r);
    if b.is_zero() {
        return Err(Error::Arithmetic("division by zero".to_string()));
    }
    let raw = a
        .checked_div(b)
        .ok_or_else(|| Error::Arithmetic("division overflow".to_string()))?;
    let rounded = value::round_half_even(raw, value::MAX_PRECISION);
    Ok(downcast(kind, rounded))
}

fn int_div(lhs: Value, rhs: Value) -> Result<Value, Error> {
    if lhs.is_string() || rhs.is_string() {
        return Err(Error::TypeError("\\ does not accept STRING operands".to_string()));
    }
    let a = lhs.as_long().map_err(Error::from)?;
    let b = rhs.as_long().map_err(Error::from)?;
    if b == 0 {
        return Err(Error::Arithmetic("division by zero".to_string()));
    }
    Ok(Value::Long(a / b))
}

fn modulo(lhs: Value, rhs: Value) -> Result<Value, Error> {
    if lhs.is_string() || rhs.is_string() {
        return Err(Error::TypeError("mod does not accept STRING operands".to_string()));
    }
    let a = lhs.as_long().map_err(Error::from)?;
    let b = rhs.as_long().map_err(Error::from)?;
    if b == 0 {
        return Err(Error::Arithmetic("division by zero".to_string()));
    }
    Ok(Value::Long(a % b))
}

fn exact_nonneg_exponent(n: &Num) -> Option<u32> {
    match n {
        Num::Long(v) if *v >= 0 => Some(*v as u32),
        Num::Double(d) if *d >= 0.0 && d.fract() == 0.0 && *d <= u32::MAX as f64 => Some(*d as u32),
        Num::Dec(d) if !d.is_sign_negative() && d.fract().is_zero() => d.to_u32(),
        _ => None,
    }
}

fn pow_values(l: Num, r: Num) -> Result<Value, Error> {
    if let Num::Dec(base) = l {
        if let Some(exp) = exact_nonneg_exponent(&r) {
            let mut acc = Decimal::ONE;
            for _ in 0..exp {
                acc = acc
                    .checked_mul(base)
                    .ok_or_else(|| Error::Arithmetic("exponentiation overflow".to_string()))?;
            }
            return Ok(Value::BigDec(value::normalize_decimal(acc)));
        }
    }

    let result = to_f64(&l).powf(to_f64(&r));
    if let (Num::Long(_), Num::Long(_)) = (&l, &r) {
        if result.is_finite() && result.fract() == 0.0 && result >= i32::MIN as f64 && result <= i32::MAX as f64 {
            return Ok(Value::Long(result as i32));
        }
    }
    Ok(Value::Double(result))
}

fn compare_matches(op: BinaryOp, ord: Ordering) -> bool {
    match op {
        BinaryOp::Eq => ord == Ordering::Equal,
        BinaryOp::Ne => ord != Ordering::Equal,
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::Le => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::Ge => ord != Ordering::Less,
        _ => unreachable!("compare_matches called with a non-comparison operator"),
    }
}

fn compare(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, Error> {
    if lhs.is_string() != rhs.is_string() {
        return Err(Error::TypeError(
            "cannot compare a STRING with a non-STRING operand".to_string(),
        ));
    }
    if lhs.is_string() {
        let a = lhs.as_string().map_err(Error::from)?.to_lowercase();
        let b = rhs.as_string().map_err(Error::from)?.to_lowercase();
        return Ok(Value::boolean(compare_matches(op, a.cmp(&b))));
    }

    let l = demote_to_numeric(&lhs)?;
    let r = demote_to_numeric(&rhs)?;
    let ord = to_decimal(&l).cmp(&to_decimal(&r));
    Ok(Value::boolean(compare_matches(op, ord)))
}

/// Evaluates a binary operator over already-computed operands, applying
/// null propagation first (AND/OR/IMP/concat get their own rules; every
/// other operator yields NULL if either side is NULL).
pub fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, Error> {
    match op {
        BinaryOp::And => and(lhs, rhs),
        BinaryOp::Or => or(lhs, rhs),
        BinaryOp::Imp => imp(lhs, rhs),
        BinaryOp::Concat => concat(lhs, rhs),
        _ => {
            if lhs.is_null() || rhs.is_null() {
                return Ok(Value::Null);
            }
            match op {
                BinaryOp::Add => simple_op(lhs, rhs, true),
                BinaryOp::Sub => simple_op(lhs, rhs, false),
                BinaryOp::Mul => mul(lhs, rhs),
                BinaryOp::Div => div(lhs, rhs),
                BinaryOp::IntDiv => int_div(lhs, rhs),
                BinaryOp::Mod => modulo(lhs, rhs),
                BinaryOp::Pow => {
                    let ((l, r), _kind) = coerce_numeric_pair(&lhs, &rhs)?;
                    pow_values(l, r)
                }
                BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                    compare(op, lhs, rhs)
                }
                BinaryOp::And | BinaryOp::Or | BinaryOp::Imp | BinaryOp::Concat => unreachable!(),
            }
        }
    }
}

/// Evaluates a unary operator. Both operators propagate NULL.
pub fn eval_unary(op: UnaryOp, operand: Value) -> Result<Value, Error> {
    if operand.is_null() {
        return Ok(Value::Null);
    }
    match op {
        UnaryOp::Not => {
            let b = operand.as_boolean().map_err(Error::from)?;
            Ok(Value::boolean(!b))
        }
        UnaryOp::Neg => match demote_to_numeric(&operand)? {
            Num::Long(v) => Ok(v.checked_neg().map(Value::Long).unwrap_or(Value::Double(-(v as f64)))),
            Num::Double(d) => Ok(Value::Double(-d)),
            Num::Dec(d) => Ok(Value::BigDec(-d)),
        },
    }
}

/// `Between a b c`: swaps `b`/`c` if out of order, then tests
/// `min <= a <= max`. Propagates NULL from any of the three operands.
pub fn between(a: Value, b: Value, c: Value) -> Result<Value, Error> {
    if a.is_null() || b.is_null() || c.is_null() {
        return Ok(Value::Null);
    }
    let swapped = compare(BinaryOp::Gt, b.clone(), c.clone())?
        .as_boolean()
        .map_err(Error::from)?;
    let (lo, hi) = if swapped { (c, b) } else { (b, c) };
    let ge = compare(BinaryOp::Ge, a.clone(), lo)?.as_boolean().map_err(Error::from)?;
    let le = compare(BinaryOp::Le, a, hi)?.as_boolean().map_err(Error::from)?;
    Ok(Value::boolean(ge && le))
}

/// `In a (list)`: NULL entries in the list are skipped; NULL `a` yields
/// NULL regardless of the list's contents.
pub fn in_list(a: Value, list: &[Value]) -> Result<Value, Error> {
    if a.is_null() {
        return Ok(Value::Null);
    }
    for item in list {
        if item.is_null() {
            continue;
        }
        if compare(BinaryOp::Eq, a.clone(), item.clone())?
            .as_boolean()
            .map_err(Error::from)?
        {
            return Ok(Value::boolean(true));
        }
    }
    Ok(Value::boolean(false))
}

/// `Like`: matches a (pre-compiled, parser-supplied) pattern against the
/// full string. Propagates NULL.
pub fn like(value: Value, pattern: &dyn Pattern) -> Result<Value, Error> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let s = value.as_string().map_err(Error::from)?;
    Ok(Value::boolean(pattern.matches(&s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long(n: i32) -> Value {
        Value::Long(n)
    }

    fn str(s: &str) -> Value {
        Value::Str(s.to_string())
    }

    #[test]
    fn and_truth_table() {
        let t = Value::boolean(true);
        let f = Value::boolean(false);
        let n = Value::Null;
        assert_eq!(and(t.clone(), t.clone()).unwrap(), Value::boolean(true));
        assert_eq!(and(t.clone(), f.clone()).unwrap(), Value::boolean(false));
        assert_eq!(and(t.clone(), n.clone()).unwrap(), Value::Null);
        assert_eq!(and(f.clone(), n.clone()).unwrap(), Value::boolean(false));
        assert_eq!(and(n.clone(), n.clone()).unwrap(), Value::Null);
    }

    #[test]
    fn or_truth_table() {
        let t = Value::boolean(true);
        let f = Value::boolean(false);
        let n = Value::Null;
        assert_eq!(or(f.clone(), t.clone()).unwrap(), Value::boolean(true));
        assert_eq!(or(f.clone(), f.clone()).unwrap(), Value::boolean(false));
        assert_eq!(or(f.clone(), n.clone()).unwrap(), Value::Null);
        assert_eq!(or(n.clone(), t.clone()).unwrap(), Value::boolean(true));
        assert_eq!(or(n.clone(), n.clone()).unwrap(), Value::Null);
    }

    #[test]
    fn imp_truth_table() {
        let t = Value::boolean(true);
        let f = Value::boolean(false);
        let n = Value::Null;
        assert_eq!(imp(f.clone(), t.clone()).unwrap(), Value::boolean(true));
        assert_eq!(imp(f.clone(), f.clone()).unwrap(), Value::boolean(true));
        assert_eq!(imp(t.clone(), f.clone()).unwrap(), Value::boolean(false));
        assert_eq!(imp(n.clone(), t.clone()).unwrap(), Value::boolean(true));
        assert_eq!(imp(n.clone(), f.clone()).unwrap(), Value::Null);
        assert_eq!(imp(n.clone(), n.clone()).unwrap(), Value::Null);
    }

    #[test]
    fn concat_coerces_null_to_empty_string() {
        let result = eval_binary(BinaryOp::Concat, Value::Null, str("x")).unwrap();
        assert_eq!(result, str("x"));
    }

    #[test]
    fn string_plus_number_coerces_to_double() {
        let result = eval_binary(BinaryOp::Add, str("5"), long(3)).unwrap();
        assert_eq!(result, Value::Double(8.0));
    }

    #[test]
    fn string_concat_operator_does_not_coerce() {
        let result = eval_binary(BinaryOp::Concat, str("5"), long(3)).unwrap();
        assert_eq!(result, str("53"));
    }

    #[test]
    fn both_strings_plus_falls_back_to_concat() {
        let result = eval_binary(BinaryOp::Add, str("foo"), str("bar")).unwrap();
        assert_eq!(result, str("foobar"));
    }

    #[test]
    fn id_plus_one_scenarios() {
        assert_eq!(eval_binary(BinaryOp::Add, long(1), long(1)).unwrap(), long(2));
        assert_eq!(eval_binary(BinaryOp::Add, long(-38), long(1)).unwrap(), long(-37));
    }

    #[test]
    fn id_greater_than_zero_scenarios() {
        assert_eq!(eval_binary(BinaryOp::Gt, long(2), long(0)).unwrap(), Value::boolean(true));
        assert_eq!(eval_binary(BinaryOp::Gt, long(-37), long(0)).unwrap(), Value::boolean(false));
    }

    #[test]
    fn division_by_decimal_rounds_half_even_to_28_places() {
        let dividend = long(1);
        let divisor = Value::BigDec("0.03".parse().unwrap());
        let result = eval_binary(BinaryOp::Div, dividend, divisor).unwrap();
        match result {
            Value::BigDec(d) => assert_eq!(d.to_string(), "33.3333333333333333333333333333"),
            other => panic!("expected BigDec, got {:?}", other),
        }
    }

    #[test]
    fn long_division_by_zero_is_arithmetic_error() {
        let err = eval_binary(BinaryOp::Div, long(1), long(0)).unwrap_err();
        assert!(matches!(err, Error::Arithmetic(_)));
    }

    #[test]
    fn double_division_by_zero_is_arithmetic_error() {
        let err = eval_binary(BinaryOp::Div, Value::Double(1.0), Value::Double(0.0)).unwrap_err();
        assert!(matches!(err, Error::Arithmetic(_)));
    }

    #[test]
    fn exact_long_division_stays_long() {
        assert_eq!(eval_binary(BinaryOp::Div, long(10), long(2)).unwrap(), long(5));
    }

    #[test]
    fn inexact_long_division_promotes_to_double() {
        assert_eq!(eval_binary(BinaryOp::Div, long(1), long(3)).unwrap(), Value::Double(1.0 / 3.0));
    }

    #[test]
    fn operator_nullity_holds_for_ordinary_binary_operators() {
        for op in [
            BinaryOp::Add,
            BinaryOp::Sub,
            BinaryOp::Mul,
            BinaryOp::Div,
            BinaryOp::Mod,
            BinaryOp::IntDiv,
            BinaryOp::Pow,
            BinaryOp::Eq,
            BinaryOp::Lt,
        ] {
            assert_eq!(eval_binary(op, Value::Null, long(1)).unwrap(), Value::Null);
            assert_eq!(eval_binary(op, long(1), Value::Null).unwrap(), Value::Null);
        }
    }

    #[test]
    fn string_comparison_is_case_insensitive() {
        let result = eval_binary(BinaryOp::Eq, str("Hello"), str("hello")).unwrap();
        assert_eq!(result, Value::boolean(true));
    }

    #[test]
    fn between_swaps_reversed_bounds() {
        assert_eq!(between(long(5), long(10), long(1)).unwrap(), Value::boolean(true));
        assert_eq!(between(long(50), long(10), long(1)).unwrap(), Value::boolean(false));
    }

    #[test]
    fn in_list_skips_nulls_and_short_circuits_on_match() {
        let list = vec![Value::Null, long(2), long(3)];
        assert_eq!(in_list(long(2), &list).unwrap(), Value::boolean(true));
        assert_eq!(in_list(long(9), &list).unwrap(), Value::boolean(false));
        assert_eq!(in_list(Value::Null, &list).unwrap(), Value::Null);
    }
}
