// Copyright 2024 The Jetdb Authors.
//
// Use of this source code is governed by a BSD 3-clause
// license that can be found in the LICENSE file.

//! The shared evaluation context the operator kernel (`expr`) and the
//! built-in function library (`functions`) are both built against:
//! `TemporalConfig`, `Bindings`, the pluggable `FunctionLookup`/`Function`
//! traits, `EvalContext` itself, and the crate-wide evaluation `Error`.

use std::collections::HashMap;
use value::{Value, ValueKind};

/// Errors raised while evaluating an expression or calling a function.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A [`Value`] coercion failed; see `value::Error` for the cause.
    #[error(transparent)]
    Value(#[from] value::Error),

    /// The operand types involved are not a legal combination for this
    /// operator (e.g. STRING `mod` LONG).
    #[error("type mismatch: {0}")]
    TypeError(String),

    /// Division by zero, conversion overflow, or precision exceeded.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    /// A function was called with the wrong arity, or an argument value
    /// it cannot accept.
    #[error("{0}")]
    EvalArgument(String),
}

/// Locale-ish formatting knobs for rendering/parsing temporal values.
/// Defaults to the US locale, per the distilled spec.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalConfig {
    pub date_format: String,
    pub time_format_12: String,
    pub time_format_24: String,
    pub date_separator: char,
    pub time_separator: char,
}

impl TemporalConfig {
    /// The format used to render a `DATE_TIME` value when the active time
    /// format is 12-hour: `"<date> <time12>"`.
    pub fn date_time_format_12(&self) -> String {
        format!("{} {}", self.date_format, self.time_format_12)
    }

    /// The format used to render a `DATE_TIME` value when the active time
    /// format is 24-hour. Per the source this is the bare 24-hour time
    /// format with no date prefix -- preserved literally rather than
    /// "fixed" to match the 12-hour case.
    pub fn date_time_format_24(&self) -> String {
        self.time_format_24.clone()
    }
}

impl Default for TemporalConfig {
    fn default() -> Self {
        TemporalConfig {
            date_format: "M/d/yyyy".to_string(),
            time_format_12: "h:mm:ss a".to_string(),
            time_format_24: "H:mm:ss".to_string(),
            date_separator: '/',
            time_separator: ':',
        }
    }
}

/// A named-value map exposed to function evaluation (e.g. `[fieldName]`
/// column references resolved by the caller before evaluation reaches
/// this workspace).
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Bindings::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// A built-in or user-supplied function callable from an expression.
///
/// Implemented by the individual function structs in the `functions`
/// crate; this crate only defines the seam so `expr` and `functions` can
/// both depend on it without depending on each other.
pub trait Function: Sync {
    /// The function's canonical (already-lowercased) name.
    fn name(&self) -> &'static str;

    /// The minimum number of arguments this function accepts.
    fn min_arity(&self) -> usize;

    /// The maximum number of arguments this function accepts, or `None`
    /// for an unbounded arity.
    fn max_arity(&self) -> Option<usize>;

    /// Invokes the function. Implementors should check arity themselves
    /// via [`check_arity`] before doing any real work.
    fn call(&self, ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error>;
}

/// Convenience arity check shared by every `Function::call` implementation.
pub fn check_arity(f: &dyn Function, args: &[Value]) -> Result<(), Error> {
    let ok = args.len() >= f.min_arity() && f.max_arity().map_or(true, |max| args.len() <= max);
    if ok {
        Ok(())
    } else {
        Err(Error::EvalArgument(format!(
            "{} expects {}{} argument(s), got {}",
            f.name(),
            f.min_arity(),
            match f.max_arity() {
                Some(max) if max != f.min_arity() => format!("..{}", max),
                _ => String::new(),
            },
            args.len()
        )))
    }
}

/// A pluggable name -> function resolver. Names are matched
/// case-insensitively; implementors should canonicalise (typically
/// lowercase) before comparing.
pub trait FunctionLookup {
    fn lookup(&self, name: &str) -> Option<&dyn Function>;
}

/// A [`FunctionLookup`] with no functions registered, useful for
/// evaluating expressions that are known not to call any.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFunctions;

impl FunctionLookup for NoFunctions {
    fn lookup(&self, _name: &str) -> Option<&dyn Function> {
        None
    }
}

const RND_MULTIPLIER: u32 = 1_140_671_485;
const RND_INCREMENT: u32 = 12_820_163;
const RND_MODULUS_BITS: u32 = 24;
const RND_MODULUS: u32 = 1 << RND_MODULUS_BITS;

/// VBA's `Rnd` generator: a 24-bit linear congruential generator,
/// `x <- (x * 1140671485 + 12820163) mod 2^24`, reproduced bit-for-bit.
#[derive(Debug, Clone)]
struct RndState {
    x: u32,
    last: f32,
}

impl RndState {
    fn new() -> Self {
        RndState { x: 0, last: 0.0 }
    }

    fn advance(&mut self) -> f32 {
        self.x = self
            .x
            .wrapping_mul(RND_MULTIPLIER)
            .wrapping_add(RND_INCREMENT)
            & (RND_MODULUS - 1);
        self.last = self.x as f32 / RND_MODULUS as f32;
        self.last
    }

    /// `seed > 0` (or omitted, `None`): next number in sequence.
    /// `seed == 0`: repeat the last number returned.
    /// `seed < 0`: reseed deterministically from `seed`'s bit pattern and
    /// return the first number of the new sequence.
    fn next(&mut self, seed: Option<f32>) -> f32 {
        match seed {
            Some(s) if s < 0.0 => {
                self.x = s.to_bits() & (RND_MODULUS - 1);
                self.advance()
            }
            Some(s) if s == 0.0 => self.last,
            _ => self.advance(),
        }
    }
}

/// The per-evaluation state threaded through operator and function
/// evaluation: configuration (temporal formats, result type), the
/// bindings and function registry the expression may reference, and this
/// evaluation's own `Rnd` generator state.
pub struct EvalContext {
    pub temporal: TemporalConfig,
    pub bindings: Bindings,
    pub functions: Box<dyn FunctionLookup>,
    pub result_type: Option<ValueKind>,
    rnd: RndState,
}

impl EvalContext {
    pub fn new(functions: Box<dyn FunctionLookup>) -> Self {
        EvalContext {
            temporal: TemporalConfig::default(),
            bindings: Bindings::default(),
            functions,
            result_type: None,
            rnd: RndState::new(),
        }
    }

    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn with_temporal(mut self, temporal: TemporalConfig) -> Self {
        self.temporal = temporal;
        self
    }

    pub fn with_result_type(mut self, kind: ValueKind) -> Self {
        self.result_type = Some(kind);
        self
    }

    pub fn lookup_function(&self, name: &str) -> Option<&dyn Function> {
        self.functions.lookup(name)
    }

    /// Draws the next value from this context's `Rnd` generator. See
    /// [`RndState::next`] for the seeding rules.
    pub fn rnd(&mut self, seed: Option<f32>) -> f32 {
        self.rnd.next(seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_context() -> EvalContext {
        EvalContext::new(Box::new(NoFunctions))
    }

    #[test]
    fn temporal_config_default_is_us_locale() {
        let t = TemporalConfig::default();
        assert_eq!(t.date_format, "M/d/yyyy");
        assert_eq!(t.time_format_12, "h:mm:ss a");
        assert_eq!(t.time_format_24, "H:mm:ss");
        assert_eq!(t.date_separator, '/');
        assert_eq!(t.time_separator, ':');
        assert_eq!(t.date_time_format_12(), "M/d/yyyy h:mm:ss a");
        assert_eq!(t.date_time_format_24(), "H:mm:ss");
    }

    #[test]
    fn bindings_round_trip() {
        let mut b = Bindings::new();
        b.insert("id", Value::Long(1));
        assert_eq!(b.get("id"), Some(&Value::Long(1)));
        assert_eq!(b.get("missing"), None);
    }

    #[test]
    fn rnd_values_stay_in_unit_range() {
        let mut ctx = test_context();
        for _ in 0..256 {
            let v = ctx.rnd(None);
            assert!(v >= 0.0 && v < 1.0);
        }
    }

    #[test]
    fn rnd_zero_seed_repeats_last() {
        let mut ctx = test_context();
        let first = ctx.rnd(None);
        let repeated = ctx.rnd(Some(0.0));
        assert_eq!(first, repeated);
    }

    #[test]
    fn rnd_negative_seed_reseeds_deterministically() {
        let mut a = test_context();
        let mut b = test_context();
        assert_eq!(a.rnd(Some(-1.0)), b.rnd(Some(-1.0)));
        // Same seed again from a fresh generator reproduces the whole
        // subsequent sequence, not just the first draw.
        assert_eq!(a.rnd(None), b.rnd(None));
    }

    #[test]
    fn rnd_distinct_negative_seeds_diverge() {
        let mut a = test_context();
        let mut b = test_context();
        assert_ne!(a.rnd(Some(-1.0)), b.rnd(Some(-2.0)));
    }
}
