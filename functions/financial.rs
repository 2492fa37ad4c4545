// Copyright 2024 The Jetdb Authors.
//
// Use of this source code is governed by a BSD 3-clause
// license that can be found in the LICENSE file.

//! Financial functions built on the standard annuity formulas: `NPer`,
//! `FV`, `PMT`, `PV`, `Rate`, `IPmt`, `PPmt`, `DDB`, `SLN`, `SYD`.
//!
//! Every function takes an optional trailing `due` flag (`0` = payments
//! at period end, the default; `1` = payments at period start), matching
//! VBA's own optional `due`/`type` parameter.

use eval::{check_arity, Error, EvalContext, Function};
use std::collections::HashMap;
use value::Value;

fn opt_f64(args: &[Value], idx: usize, default: f64) -> Result<f64, Error> {
    match args.get(idx) {
        Some(v) if !v.is_null() => Ok(v.as_double()?),
        _ => Ok(default),
    }
}

fn opt_due(args: &[Value], idx: usize) -> Result<bool, Error> {
    Ok(opt_f64(args, idx, 0.0)? != 0.0)
}

fn pv_core(rate: f64, nper: f64, pmt: f64, fv: f64, due: bool) -> f64 {
    if rate == 0.0 {
        return -(pmt * nper + fv);
    }
    let factor_due = if due { 1.0 + rate } else { 1.0 };
    let growth = (1.0 + rate).powf(nper);
    -(pmt * factor_due * ((1.0 - 1.0 / growth) / rate) + fv / growth)
}

fn fv_core(rate: f64, nper: f64, pmt: f64, pv: f64, due: bool) -> f64 {
    if rate == 0.0 {
        return -(pv + pmt * nper);
    }
    let factor_due = if due { 1.0 + rate } else { 1.0 };
    let growth = (1.0 + rate).powf(nper);
    -(pv * growth + pmt * factor_due * ((growth - 1.0) / rate))
}

fn pmt_core(rate: f64, nper: f64, pv: f64, fv: f64, due: bool) -> f64 {
    if rate == 0.0 {
        return -(pv + fv) / nper;
    }
    let factor_due = if due { 1.0 + rate } else { 1.0 };
    let growth = (1.0 + rate).powf(nper);
    -(rate / (factor_due * (growth - 1.0))) * (pv * growth + fv)
}

fn nper_core(rate: f64, pmt: f64, pv: f64, fv: f64, due: bool) -> Result<f64, Error> {
    if rate == 0.0 {
        if pmt == 0.0 {
            return Err(Error::Arithmetic("NPer with a zero rate requires a non-zero payment".to_string()));
        }
        return Ok(-(pv + fv) / pmt);
    }
    let factor_due = if due { 1.0 + rate } else { 1.0 };
    let num = pmt * factor_due - fv * rate;
    let den = pmt * factor_due + pv * rate;
    if num / den <= 0.0 {
        return Err(Error::Arithmetic("NPer has no real solution for these inputs".to_string()));
    }
    Ok((num / den).ln() / (1.0 + rate).ln())
}

/// Newton-Raphson solve for the periodic interest rate, seeded at 10%
/// (the conventional default `guess`), matching the one-parameter `Rate`
/// signature this workspace exposes.
fn rate_core(nper: f64, pmt: f64, pv: f64, fv: f64, due: bool) -> Result<f64, Error> {
    let mut rate = 0.1;
    for _ in 0..64 {
        let f = pv_core(rate, nper, pmt, fv, due) - pv;
        let epsilon = 1e-7;
        let f_prime = (pv_core(rate + epsilon, nper, pmt, fv, due) - pv - f) / epsilon;
        if f_prime.abs() < 1e-12 {
            break;
        }
        let next_rate = rate - f / f_prime;
        if (next_rate - rate).abs() < 1e-10 {
            rate = next_rate;
            break;
        }
        rate = next_rate;
    }
    if !rate.is_finite() {
        return Err(Error::Arithmetic("Rate did not converge".to_string()));
    }
    Ok(rate)
}

fn ipmt_core(rate: f64, per: f64, nper: f64, pv: f64, fv: f64, due: bool) -> f64 {
    let pmt = pmt_core(rate, nper, pv, fv, due);
    if due && per <= 1.0 {
        return 0.0;
    }
    let balance_before = fv_core(rate, per - 1.0, pmt, pv, due);
    let mut ipmt = -balance_before * rate;
    if due {
        ipmt /= 1.0 + rate;
    }
    ipmt
}

macro_rules! financial_fn {
    ($struct_name:ident, $lower:expr, $min:expr, $max:expr, |$args:ident| $body:block) => {
        pub struct $struct_name;
        impl Function for $struct_name {
            fn name(&self) -> &'static str {
                $lower
            }
            fn min_arity(&self) -> usize {
                $min
            }
            fn max_arity(&self) -> Option<usize> {
                $max
            }
            fn call(&self, _ctx: &mut EvalContext, $args: &[Value]) -> Result<Value, Error> {
                check_arity(self, $args)?;
                $body
            }
        }
    };
}

financial_fn!(Pv, "pv", 3, Some(5), |args| {
    let rate = args[0].as_double()?;
    let nper = args[1].as_double()?;
    let pmt = args[2].as_double()?;
    let fv = opt_f64(args, 3, 0.0)?;
    let due = opt_due(args, 4)?;
    Ok(Value::Double(pv_core(rate, nper, pmt, fv, due)))
});

financial_fn!(Fv, "fv", 3, Some(5), |args| {
    let rate = args[0].as_double()?;
    let nper = args[1].as_double()?;
    let pmt = args[2].as_double()?;
    let pv = opt_f64(args, 3, 0.0)?;
    let due = opt_due(args, 4)?;
    Ok(Value::Double(fv_core(rate, nper, pmt, pv, due)))
});

financial_fn!(Pmt, "pmt", 3, Some(5), |args| {
    let rate = args[0].as_double()?;
    let nper = args[1].as_double()?;
    let pv = args[2].as_double()?;
    let fv = opt_f64(args, 3, 0.0)?;
    let due = opt_due(args, 4)?;
    Ok(Value::Double(pmt_core(rate, nper, pv, fv, due)))
});

financial_fn!(NPer, "nper", 3, Some(5), |args| {
    let rate = args[0].as_double()?;
    let pmt = args[1].as_double()?;
    let pv = args[2].as_double()?;
    let fv = opt_f64(args, 3, 0.0)?;
    let due = opt_due(args, 4)?;
    Ok(Value::Double(nper_core(rate, pmt, pv, fv, due)?))
});

financial_fn!(Rate, "rate", 3, Some(5), |args| {
    let nper = args[0].as_double()?;
    let pmt = args[1].as_double()?;
    let pv = args[2].as_double()?;
    let fv = opt_f64(args, 3, 0.0)?;
    let due = opt_due(args, 4)?;
    Ok(Value::Double(rate_core(nper, pmt, pv, fv, due)?))
});

financial_fn!(IPmt, "ipmt", 4, Some(6), |args| {
    let rate = args[0].as_double()?;
    let per = args[1].as_double()?;
    let nper = args[2].as_double()?;
    let pv = args[3].as_double()?;
    let fv = opt_f64(args, 4, 0.0)?;
    let due = opt_due(args, 5)?;
    Ok(Value::Double(ipmt_core(rate, per, nper, pv, fv, due)))
});

financial_fn!(PPmt, "ppmt", 4, Some(6), |args| {
    let rate = args[0].as_double()?;
    let per = args[1].as_double()?;
    let nper = args[2].as_double()?;
    let pv = args[3].as_double()?;
    let fv = opt_f64(args, 4, 0.0)?;
    let due = opt_due(args, 5)?;
    let pmt = pmt_core(rate, nper, pv, fv, due);
    let ipmt = ipmt_core(rate, per, nper, pv, fv, due);
    Ok(Value::Double(pmt - ipmt))
});

financial_fn!(Sln, "sln", 3, Some(3), |args| {
    let cost = args[0].as_double()?;
    let salvage = args[1].as_double()?;
    let life = args[2].as_double()?;
    if life == 0.0 {
        return Err(Error::Arithmetic("SLN requires a non-zero life".to_string()));
    }
    Ok(Value::Double((cost - salvage) / life))
});

financial_fn!(Syd, "syd", 4, Some(4), |args| {
    let cost = args[0].as_double()?;
    let salvage = args[1].as_double()?;
    let life = args[2].as_double()?;
    let period = args[3].as_double()?;
    let denom = life * (life + 1.0) / 2.0;
    if denom == 0.0 {
        return Err(Error::Arithmetic("SYD requires a non-zero life".to_string()));
    }
    Ok(Value::Double((cost - salvage) * (life - period + 1.0) / denom))
});

financial_fn!(Ddb, "ddb", 4, Some(5), |args| {
    let cost = args[0].as_double()?;
    let salvage = args[1].as_double()?;
    let life = args[2].as_double()?;
    let period = args[3].as_double()?;
    let factor = opt_f64(args, 4, 2.0)?;
    if life <= 0.0 || period < 1.0 {
        return Err(Error::EvalArgument("DDB requires life > 0 and period >= 1".to_string()));
    }
    let rate = factor / life;
    let mut book_value = cost;
    let mut depreciation = 0.0;
    let whole_periods = period.floor() as u32;
    for _ in 0..whole_periods {
        depreciation = (book_value * rate).min((book_value - salvage).max(0.0));
        book_value -= depreciation;
    }
    Ok(Value::Double(depreciation))
});

pub(crate) fn register(by_name: &mut HashMap<&'static str, Box<dyn Function>>) {
    macro_rules! put {
        ($($f:expr),* $(,)?) => {
            $( let f: Box<dyn Function> = Box::new($f); by_name.insert(f.name(), f); )*
        };
    }
    put![NPer, Fv, Pmt, Pv, Rate, IPmt, PPmt, Ddb, Sln, Syd];
}

#[cfg(test)]
mod tests {
    use super::*;
    use eval::NoFunctions;

    fn ctx() -> EvalContext {
        EvalContext::new(Box::new(NoFunctions))
    }

    fn d(v: f64) -> Value {
        Value::Double(v)
    }

    #[test]
    fn sln_straight_line_depreciation() {
        let mut c = ctx();
        let result = Sln.call(&mut c, &[d(10000.0), d(1000.0), d(5.0)]).unwrap();
        assert_eq!(result, Value::Double(1800.0));
    }

    #[test]
    fn syd_first_year_is_largest() {
        let mut c = ctx();
        let first = Syd.call(&mut c, &[d(10000.0), d(1000.0), d(5.0), d(1.0)]).unwrap().as_double().unwrap();
        let last = Syd.call(&mut c, &[d(10000.0), d(1000.0), d(5.0), d(5.0)]).unwrap().as_double().unwrap();
        assert!(first > last);
    }

    #[test]
    fn pmt_matches_known_annuity() {
        let mut c = ctx();
        // $100,000 loan, 6%/12 monthly rate, 360 months, zero future value.
        let result = Pmt.call(&mut c, &[d(0.06 / 12.0), d(360.0), d(100000.0)]).unwrap();
        match result {
            Value::Double(v) => assert!((v + 599.55).abs() < 0.5),
            other => panic!("expected Double, got {:?}", other),
        }
    }

    #[test]
    fn pv_fv_are_inverse_for_zero_rate() {
        let mut c = ctx();
        let pv = Pv.call(&mut c, &[d(0.0), d(12.0), d(-100.0)]).unwrap().as_double().unwrap();
        assert_eq!(pv, 1200.0);
    }

    #[test]
    fn ppmt_plus_ipmt_equals_pmt() {
        let mut c = ctx();
        let rate = 0.01;
        let nper = 12.0;
        let pv = 10000.0;
        let pmt_total = pmt_core(rate, nper, pv, 0.0, false);
        let ipmt = IPmt.call(&mut c, &[d(rate), d(3.0), d(nper), d(pv)]).unwrap().as_double().unwrap();
        let ppmt = PPmt.call(&mut c, &[d(rate), d(3.0), d(nper), d(pv)]).unwrap().as_double().unwrap();
        assert!((ipmt + ppmt - pmt_total).abs() < 1e-9);
    }

    #[test]
    fn ddb_depreciation_is_never_negative() {
        let mut c = ctx();
        let result = Ddb.call(&mut c, &[d(10000.0), d(1000.0), d(5.0), d(1.0)]).unwrap().as_double().unwrap();
        assert!(result >= 0.0);
    }
}
