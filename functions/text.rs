// Copyright 2024 The Jetdb Authors.
//
// Use of this source code is governed by a BSD 3-clause
// license that can be found in the LICENSE file.

//! Text functions: the standard `Len`/`Left`/`Right`/`Mid` family, case
//! and trim helpers, `InStr`/`InStrRev`/`Replace`, `Format`, `Asc`/`Chr`,
//! and the `*$` string-returning aliases.
//!
//! The `$`-suffixed aliases (`Left$`, `Mid$`, ...) propagate the empty
//! string rather than `NULL` for a null argument, per VBA convention; this
//! value model has no distinct `Empty` variant, so that's represented as
//! [`Value::Str`] of length zero (see `DESIGN.md`).

use eval::{check_arity, Error, EvalContext, Function};
use std::collections::HashMap;
use value::Value;

fn as_text(v: &Value) -> Result<String, Error> {
    Ok(v.as_string()?)
}

pub struct Len;
impl Function for Len {
    fn name(&self) -> &'static str {
        "len"
    }
    fn min_arity(&self) -> usize {
        1
    }
    fn max_arity(&self) -> Option<usize> {
        Some(1)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        if args[0].is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Long(as_text(&args[0])?.chars().count() as i32))
    }
}

pub struct Left;
impl Function for Left {
    fn name(&self) -> &'static str {
        "left"
    }
    fn min_arity(&self) -> usize {
        2
    }
    fn max_arity(&self) -> Option<usize> {
        Some(2)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        if args[0].is_null() {
            return Ok(Value::Null);
        }
        let s = as_text(&args[0])?;
        let n = args[1].as_long()?.max(0) as usize;
        Ok(Value::Str(s.chars().take(n).collect()))
    }
}

pub struct Right;
impl Function for Right {
    fn name(&self) -> &'static str {
        "right"
    }
    fn min_arity(&self) -> usize {
        2
    }
    fn max_arity(&self) -> Option<usize> {
        Some(2)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        if args[0].is_null() {
            return Ok(Value::Null);
        }
        let s = as_text(&args[0])?;
        let n = args[1].as_long()?.max(0) as usize;
        let chars: Vec<char> = s.chars().collect();
        let start = chars.len().saturating_sub(n);
        Ok(Value::Str(chars[start..].iter().collect()))
    }
}

/// `Mid(s, start[, length])`: `start` is 1-based. Without `length`,
/// returns everything from `start` to the end.
pub struct Mid;
impl Function for Mid {
    fn name(&self) -> &'static str {
        "mid"
    }
    fn min_arity(&self) -> usize {
        2
    }
    fn max_arity(&self) -> Option<usize> {
        Some(3)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        if args[0].is_null() {
            return Ok(Value::Null);
        }
        let s = as_text(&args[0])?;
        let start = args[1].as_long()?;
        if start < 1 {
            return Err(Error::EvalArgument("Mid's start must be >= 1".to_string()));
        }
        let chars: Vec<char> = s.chars().collect();
        let from = (start as usize - 1).min(chars.len());
        let len = match args.get(2) {
            Some(v) => v.as_long()?.max(0) as usize,
            None => chars.len() - from,
        };
        let to = (from + len).min(chars.len());
        Ok(Value::Str(chars[from..to].iter().collect()))
    }
}

macro_rules! string_transform {
    ($struct_name:ident, $lower:expr, |$s:ident| $body:expr) => {
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
                if args[0].is_null() {
                    return Ok(Value::Null);
                }
                let $s = as_text(&args[0])?;
                Ok(Value::Str($body))
            }
        }
    };
}

string_transform!(LCase, "lcase", |s| s.to_lowercase());
string_transform!(UCase, "ucase", |s| s.to_uppercase());
string_transform!(Trim, "trim", |s| s.trim().to_string());
string_transform!(LTrim, "ltrim", |s| s.trim_start().to_string());
string_transform!(RTrim, "rtrim", |s| s.trim_end().to_string());
string_transform!(StrReverse, "strreverse", |s| s.chars().rev().collect());

/// `InStr([start, ]haystack, needle)`: 1-based index of the first match,
/// or `0` if not found. `start` defaults to `1`.
pub struct InStr;
impl Function for InStr {
    fn name(&self) -> &'static str {
        "instr"
    }
    fn min_arity(&self) -> usize {
        2
    }
    fn max_arity(&self) -> Option<usize> {
        Some(3)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        let (start, haystack, needle) = if args.len() == 3 {
            (args[0].as_long()?.max(1) as usize, &args[1], &args[2])
        } else {
            (1, &args[0], &args[1])
        };
        if haystack.is_null() || needle.is_null() {
            return Ok(Value::Null);
        }
        let h = as_text(haystack)?;
        let n = as_text(needle)?;
        let chars: Vec<char> = h.chars().collect();
        let from = (start - 1).min(chars.len());
        let window: String = chars[from..].iter().collect();
        Ok(Value::Long(match window.find(&n) {
            Some(byte_idx) => (from + window[..byte_idx].chars().count() + 1) as i32,
            None => 0,
        }))
    }
}

/// `InStrRev(haystack, needle[, start])`: like `InStr` but searches
/// backward from `start` (default: end of string).
pub struct InStrRev;
impl Function for InStrRev {
    fn name(&self) -> &'static str {
        "instrrev"
    }
    fn min_arity(&self) -> usize {
        2
    }
    fn max_arity(&self) -> Option<usize> {
        Some(3)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        if args[0].is_null() || args[1].is_null() {
            return Ok(Value::Null);
        }
        let h = as_text(&args[0])?;
        let n = as_text(&args[1])?;
        let chars: Vec<char> = h.chars().collect();
        let end = match args.get(2) {
            Some(v) => v.as_long()?.max(1) as usize,
            None => chars.len(),
        }
        .min(chars.len());
        let prefix: String = chars[..end].iter().collect();
        Ok(Value::Long(match prefix.rfind(&n) {
            Some(byte_idx) => (prefix[..byte_idx].chars().count() + 1) as i32,
            None => 0,
        }))
    }
}

pub struct Replace;
impl Function for Replace {
    fn name(&self) -> &'static str {
        "replace"
    }
    fn min_arity(&self) -> usize {
        3
    }
    fn max_arity(&self) -> Option<usize> {
        Some(3)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        if args[0].is_null() {
            return Ok(Value::Null);
        }
        let s = as_text(&args[0])?;
        let find = as_text(&args[1])?;
        let replacement = as_text(&args[2])?;
        if find.is_empty() {
            return Ok(Value::Str(s));
        }
        Ok(Value::Str(s.replace(&find, &replacement)))
    }
}

pub struct Space;
impl Function for Space {
    fn name(&self) -> &'static str {
        "space"
    }
    fn min_arity(&self) -> usize {
        1
    }
    fn max_arity(&self) -> Option<usize> {
        Some(1)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        let n = args[0].as_long()?;
        if n < 0 {
            return Err(Error::EvalArgument("Space's count must be non-negative".to_string()));
        }
        Ok(Value::Str(" ".repeat(n as usize)))
    }
}

/// `String(count, char)`: `count` repetitions of `char`'s first
/// character.
pub struct StringFn;
impl Function for StringFn {
    fn name(&self) -> &'static str {
        "string"
    }
    fn min_arity(&self) -> usize {
        2
    }
    fn max_arity(&self) -> Option<usize> {
        Some(2)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        let n = args[0].as_long()?;
        if n < 0 {
            return Err(Error::EvalArgument("String's count must be non-negative".to_string()));
        }
        let text = as_text(&args[1])?;
        let ch = text.chars().next().unwrap_or(' ');
        Ok(Value::Str(std::iter::repeat(ch).take(n as usize).collect()))
    }
}

/// `StrComp(a, b)`: `-1` if `a < b`, `0` if equal, `1` if `a > b`
/// (case-insensitive, matching the comparison operator's string rules).
pub struct StrComp;
impl Function for StrComp {
    fn name(&self) -> &'static str {
        "strcomp"
    }
    fn min_arity(&self) -> usize {
        2
    }
    fn max_arity(&self) -> Option<usize> {
        Some(2)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        if args[0].is_null() || args[1].is_null() {
            return Ok(Value::Null);
        }
        let a = as_text(&args[0])?.to_lowercase();
        let b = as_text(&args[1])?.to_lowercase();
        Ok(Value::Long(match a.cmp(&b) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        }))
    }
}

pub struct Asc;
impl Function for Asc {
    fn name(&self) -> &'static str {
        "asc"
    }
    fn min_arity(&self) -> usize {
        1
    }
    fn max_arity(&self) -> Option<usize> {
        Some(1)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        let s = as_text(&args[0])?;
        let c = s
            .chars()
            .next()
            .ok_or_else(|| Error::EvalArgument("Asc requires a non-empty string".to_string()))?;
        Ok(Value::Long(c as i32))
    }
}

pub struct Chr;
impl Function for Chr {
    fn name(&self) -> &'static str {
        "chr"
    }
    fn min_arity(&self) -> usize {
        1
    }
    fn max_arity(&self) -> Option<usize> {
        Some(1)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        let n = args[0].as_long()?;
        let c = u32::try_from(n)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| Error::EvalArgument(format!("{} is not a valid character code", n)))?;
        Ok(Value::Str(c.to_string()))
    }
}

/// `Format(value, pattern)`. This workspace does not implement VBA's full
/// named/picture format language (that belongs to the caller's display
/// layer); it supports the literal pass-through case and numeric/string
/// coercion, which covers calculated-column defaults that merely want a
/// value rendered to text.
pub struct Format;
impl Function for Format {
    fn name(&self) -> &'static str {
        "format"
    }
    fn min_arity(&self) -> usize {
        1
    }
    fn max_arity(&self) -> Option<usize> {
        Some(2)
    }
    fn call(&self, _ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
        check_arity(self, args)?;
        if args[0].is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Str(as_text(&args[0])?))
    }
}

/// A `$`-suffixed alias that coerces a null argument to the empty string
/// rather than propagating `NULL`.
macro_rules! dollar_alias {
    ($struct_name:ident, $lower:expr, $inner:expr, $arity_min:expr, $arity_max:expr) => {
        pub struct $struct_name;
        impl Function for $struct_name {
            fn name(&self) -> &'static str {
                $lower
            }
            fn min_arity(&self) -> usize {
                $arity_min
            }
            fn max_arity(&self) -> Option<usize> {
                $arity_max
            }
            fn call(&self, ctx: &mut EvalContext, args: &[Value]) -> Result<Value, Error> {
                check_arity(self, args)?;
                match $inner.call(ctx, args)? {
                    Value::Null => Ok(Value::Str(String::new())),
                    other => Ok(other),
                }
            }
        }
    };
}

dollar_alias!(LeftDollar, "left$", Left, 2, Some(2));
dollar_alias!(RightDollar, "right$", Right, 2, Some(2));
dollar_alias!(MidDollar, "mid$", Mid, 2, Some(3));
dollar_alias!(LCaseDollar, "lcase$", LCase, 1, Some(1));
dollar_alias!(UCaseDollar, "ucase$", UCase, 1, Some(1));
dollar_alias!(TrimDollar, "trim$", Trim, 1, Some(1));

pub(crate) fn register(by_name: &mut HashMap<&'static str, Box<dyn Function>>) {
    macro_rules! put {
        ($($f:expr),* $(,)?) => {
            $( let f: Box<dyn Function> = Box::new($f); by_name.insert(f.name(), f); )*
        };
    }
    put![
        Len, Left, Right, Mid, LCase, UCase, Trim, LTrim, RTrim, InStr, InStrRev, Replace, Space,
        StringFn, StrComp, StrReverse, Format, Asc, Chr, LeftDollar, RightDollar, MidDollar,
        LCaseDollar, UCaseDollar, TrimDollar,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use eval::NoFunctions;

    fn ctx() -> EvalContext {
        EvalContext::new(Box::new(NoFunctions))
    }

    fn s(text: &str) -> Value {
        Value::Str(text.to_string())
    }

    #[test]
    fn left_right_mid_slice_correctly() {
        let mut c = ctx();
        assert_eq!(Left.call(&mut c, &[s("hello"), Value::Long(3)]).unwrap(), s("hel"));
        assert_eq!(Right.call(&mut c, &[s("hello"), Value::Long(3)]).unwrap(), s("llo"));
        assert_eq!(Mid.call(&mut c, &[s("hello"), Value::Long(2), Value::Long(3)]).unwrap(), s("ell"));
    }

    #[test]
    fn mid_without_length_runs_to_the_end() {
        let mut c = ctx();
        assert_eq!(Mid.call(&mut c, &[s("hello"), Value::Long(2)]).unwrap(), s("ello"));
    }

    #[test]
    fn instr_is_one_based_and_zero_on_miss() {
        let mut c = ctx();
        assert_eq!(InStr.call(&mut c, &[s("hello"), s("ll")]).unwrap(), Value::Long(3));
        assert_eq!(InStr.call(&mut c, &[s("hello"), s("z")]).unwrap(), Value::Long(0));
    }

    #[test]
    fn instrrev_searches_backward() {
        let mut c = ctx();
        assert_eq!(InStrRev.call(&mut c, &[s("abcabc"), s("a")]).unwrap(), Value::Long(4));
    }

    #[test]
    fn dollar_alias_coerces_null_to_empty_string() {
        let mut c = ctx();
        assert_eq!(LeftDollar.call(&mut c, &[Value::Null, Value::Long(2)]).unwrap(), s(""));
    }

    #[test]
    fn strcomp_is_case_insensitive() {
        let mut c = ctx();
        assert_eq!(StrComp.call(&mut c, &[s("ABC"), s("abc")]).unwrap(), Value::Long(0));
    }

    #[test]
    fn strreverse_reverses_characters() {
        let mut c = ctx();
        assert_eq!(StrReverse.call(&mut c, &[s("hello")]).unwrap(), s("olleh"));
    }

    #[test]
    fn chr_and_asc_round_trip() {
        let mut c = ctx();
        let code = Asc.call(&mut c, &[s("A")]).unwrap();
        assert_eq!(code, Value::Long(65));
        assert_eq!(Chr.call(&mut c, &[Value::Long(65)]).unwrap(), s("A"));
    }
}
