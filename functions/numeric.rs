// Copyright 2024 The Jetdb Authors.
//
// Use of this source code is governed by a BSD 3-clause
// license that can be found in the LICENSE file.

//! Numeric functions: `Abs`, the trig/transcendental family, `Fix`/`Int`
//! truncation, `Sgn`, `Round` (banker's rounding), and `Rnd`.

use eval::{check_arity, Error, EvalContext, Function};
use std::collections::HashMap;
use value::Value;

pub struct Abs;
impl Function for Abs {
    fn name(&self) -> &'static str {
        "abs"
    }
    fn min_arity(&self) -> usize {
        1
    }
    fn max_arity(&self) -> Option<usize> {
        Some(1)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        Ok(match &args[0] {
            Value::Long(n) => Value::Long(n.wrapping_abs()),
            Value::BigDec(d) => Value::BigDec(d.abs()),
            v => Value::Double(v.as_double()?.abs()),
        })
    }
}

macro_rules! unary_double_fn {
    ($struct_name:ident, $lower:expr, $op:expr) => {
        pub struct $struct_name;
        impl Function for $struct_name {
            fn name(&self) -> &'static str {
                $lower
            }
            fn min_arity(&self) -> usize {
                1
            }
            fn max_arity(&self) -> Option<usize> {
                Some(1)
            }
            fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
                check_arity(self, args)?;
                let d = args[0].as_double()?;
                let op: fn(f64) -> f64 = $op;
                Ok(Value::Double(op(d)))
            }
        }
    };
}

unary_double_fn!(Atan, "atan", |d| d.atan());
unary_double_fn!(Cos, "cos", |d| d.cos());
unary_double_fn!(Exp, "exp", |d| d.exp());
unary_double_fn!(Sin, "sin", |d| d.sin());
unary_double_fn!(Tan, "tan", |d| d.tan());

pub struct Log;
impl Function for Log {
    fn name(&self) -> &'static str {
        "log"
    }
    fn min_arity(&self) -> usize {
        1
    }
    fn max_arity(&self) -> Option<usize> {
        Some(1)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        let d = args[0].as_double()?;
        if d <= 0.0 {
            return Err(Error::Arithmetic("Log requires a positive argument".to_string()));
        }
        Ok(Value::Double(d.ln()))
    }
}

pub struct Sqr;
impl Function for Sqr {
    fn name(&self) -> &'static str {
        "sqr"
    }
    fn min_arity(&self) -> usize {
        1
    }
    fn max_arity(&self) -> Option<usize> {
        Some(1)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        let d = args[0].as_double()?;
        if d < 0.0 {
            return Err(Error::Arithmetic("Sqr requires a non-negative argument".to_string()));
        }
        Ok(Value::Double(d.sqrt()))
    }
}

/// Truncates toward zero.
pub struct Fix;
impl Function for Fix {
    fn name(&self) -> &'static str {
        "fix"
    }
    fn min_arity(&self) -> usize {
        1
    }
    fn max_arity(&self) -> Option<usize> {
        Some(1)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        match &args[0] {
            Value::Long(n) => Ok(Value::Long(*n)),
            v => Ok(Value::Double(v.as_double()?.trunc())),
        }
    }
}

/// Floors toward negative infinity (unlike `Fix`, which truncates toward
/// zero).
pub struct Int;
impl Function for Int {
    fn name(&self) -> &'static str {
        "int"
    }
    fn min_arity(&self) -> usize {
        1
    }
    fn max_arity(&self) -> Option<usize> {
        Some(1)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        match &args[0] {
            Value::Long(n) => Ok(Value::Long(*n)),
            v => Ok(Value::Double(v.as_double()?.floor())),
        }
    }
}

pub struct Sgn;
impl Function for Sgn {
    fn name(&self) -> &'static str {
        "sgn"
    }
    fn min_arity(&self) -> usize {
        1
    }
    fn max_arity(&self) -> Option<usize> {
        Some(1)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        let d = args[0].as_double()?;
        Ok(Value::Long(if d > 0.0 {
            1
        } else if d < 0.0 {
            -1
        } else {
            0
        }))
    }
}

/// `Round(x[, n])`: banker's rounding (round-half-to-even) to `n` decimal
/// places, `n` defaulting to `0`.
pub struct Round;
impl Function for Round {
    fn name(&self) -> &'static str {
        "round"
    }
    fn min_arity(&self) -> usize {
        1
    }
    fn max_arity(&self) -> Option<usize> {
        Some(2)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        let scale = match args.get(1) {
            Some(v) => v.as_long()?,
            None => 0,
        };
        if scale < 0 {
            return Err(Error::EvalArgument("Round's scale must be non-negative".to_string()));
        }
        match &args[0] {
            Value::BigDec(d) => Ok(Value::BigDec(value::round_half_even(*d, scale as u32))),
            Value::Long(n) if scale == 0 => Ok(Value::Long(*n)),
            v => {
                let d = value::normalize_decimal(v.as_big_decimal()?);
                Ok(Value::BigDec(value::round_half_even(d, scale as u32)))
            }
        }
    }
}

/// `Rnd([seed])`, delegating to the evaluation context's VBA-compatible
/// generator.
pub struct Rnd;
impl Function for Rnd {
    fn name(&self) -> &'static str {
        "rnd"
    }
    fn min_arity(&self) -> usize {
        0
    }
    fn max_arity(&self) -> Option<usize> {
        Some(1)
    }
    fn call(&self, ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        let seed = match args.first() {
            Some(v) => Some(v.as_double()? as f32),
            None => None,
        };
        Ok(Value::Double(ctx.rnd(seed) as f64))
    }
}

pub(crate) fn register(by_name: &mut HashMap<&'static str, Box<dyn Function>>) {
    macro_rules! put {
        ($($f:expr),* $(,)?) => {
            $( let f: Box<dyn Function> = Box::new($f); by_name.insert(f.name(), f); )*
        };
    }
    put![Abs, Atan, Cos, Exp, Sin, Tan, Log, Sqr, Fix, Int, Sgn, Round, Rnd];
}

#[cfg(test)]
mod tests {
    use super::*;
    use eval::NoFunctions;

    fn ctx() -> EvalContext {
        EvalContext::new(Box::new(NoFunctions))
    }

    #[test]
    fn round_half_to_even() {
        let mut c = ctx();
        let two_five = Value::BigDec("2.5".parse().unwrap());
        let three_five = Value::BigDec("3.5".parse().unwrap());
        assert_eq!(Round.call(&mut c, &[two_five]).unwrap(), Value::BigDec("2".parse().unwrap()));
        assert_eq!(Round.call(&mut c, &[three_five]).unwrap(), Value::BigDec("4".parse().unwrap()));
    }

    #[test]
    fn fix_truncates_toward_zero_int_floors() {
        let mut c = ctx();
        assert_eq!(Fix.call(&mut c, &[Value::Double(-2.7)]).unwrap(), Value::Double(-2.0));
        assert_eq!(Int.call(&mut c, &[Value::Double(-2.7)]).unwrap(), Value::Double(-3.0));
    }

    #[test]
    fn sgn_classifies_sign() {
        let mut c = ctx();
        assert_eq!(Sgn.call(&mut c, &[Value::Long(5)]).unwrap(), Value::Long(1));
        assert_eq!(Sgn.call(&mut c, &[Value::Long(-5)]).unwrap(), Value::Long(-1));
        assert_eq!(Sgn.call(&mut c, &[Value::Long(0)]).unwrap(), Value::Long(0));
    }

    #[test]
    fn sqr_rejects_negative() {
        let mut c = ctx();
        assert!(Sqr.call(&mut c, &[Value::Long(-1)]).is_err());
    }

    #[test]
    fn abs_handles_each_numeric_kind() {
        let mut c = ctx();
        assert_eq!(Abs.call(&mut c, &[Value::Long(-3)]).unwrap(), Value::Long(3));
        assert_eq!(Abs.call(&mut c, &[Value::Double(-3.5)]).unwrap(), Value::Double(3.5));
    }

    #[test]
    fn rnd_stays_in_unit_interval() {
        let mut c = ctx();
        for _ in 0..32 {
            match Rnd.call(&mut c, &[]).unwrap() {
                Value::Double(d) => assert!(d >= 0.0 && d < 1.0),
                other => panic!("expected Double, got {:?}", other),
            }
        }
    }
}
