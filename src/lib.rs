// Copyright 2024 The Jetdb Authors.
//
// Use of this source code is governed by a BSD 3-clause
// license that can be found in the LICENSE file.

//! `jetdb` ties together the page-usage-map and expression-evaluator
//! crates that make up this workspace's core. Everything else a full Jet
//! (`.mdb`/`.accdb`) implementation needs -- page I/O, row/column
//! marshalling, the tokenizer/parser, cursors, cryptographic page
//! decoding -- is assumed to live in the surrounding application and is
//! out of scope here; see `SPEC_FULL.md` for the boundary.
//!
//! Re-exports the public surface of each member crate under one
//! namespace so a caller depends on a single `jetdb` crate rather than
//! wiring up the workspace members individually.

pub use jet_format::{Error as FormatError, JetFormat, PageChannel, PageNumber};
pub use usage_map::{Error as UsageMapError, Forward, Reverse, UsageMap};
pub use value::{Error as ValueError, Temporal, TemporalKind, Value, ValueKind};

pub use eval::{
    Bindings, Error as EvalError, EvalContext, Function, FunctionLookup, NoFunctions,
    TemporalConfig,
};
pub use expr::{between, eval_binary, eval_unary, in_list, like, BinaryOp, Pattern, Precedence, UnaryOp};
pub use functions::builtins;

pub use calc_value::{
    decode_boolean, decode_double, decode_long, decode_numeric, decode_string, encode_boolean,
    encode_double, encode_long, encode_numeric, encode_string, CalculatedValue,
    Error as CalculatedValueError, OpaquePrefix,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_function_registry_resolves_case_insensitively() {
        let registry = builtins();
        assert!(registry.lookup("IIf").is_some());
        assert!(registry.lookup("round").is_some());
        assert!(registry.lookup("nonexistent_function").is_none());
    }

    #[test]
    fn end_to_end_concat_expression() {
        // [id] & "_" & [data] with id=1, data="foo" -> "1_foo".
        let id = Value::Long(1);
        let data = Value::Str("foo".to_string());
        let step1 = eval_binary(BinaryOp::Concat, id, Value::Str("_".to_string())).unwrap();
        let result = eval_binary(BinaryOp::Concat, step1, data).unwrap();
        assert_eq!(result, Value::Str("1_foo".to_string()));
    }

    #[test]
    fn end_to_end_iif_and_choose() {
        let mut ctx = EvalContext::new(Box::new(NoFunctions));
        let iif = builtins().lookup("iif").unwrap();
        let result = iif
            .call(&mut ctx, &[Value::Null, Value::Str("a".into()), Value::Str("b".into())])
            .unwrap();
        assert_eq!(result, Value::Str("b".into()));

        let choose = builtins().lookup("choose").unwrap();
        let result = choose
            .call(
                &mut ctx,
                &[
                    Value::Long(4),
                    Value::Str("a".into()),
                    Value::Str("b".into()),
                    Value::Str("c".into()),
                ],
            )
            .unwrap();
        assert_eq!(result, Value::Null);
    }

    #[test]
    fn end_to_end_division_scenario() {
        // [id] / 0.03 with id=1 -> BIG_DEC 33.3333333333333333333333333333.
        let result = eval_binary(BinaryOp::Div, Value::Long(1), Value::BigDec("0.03".parse().unwrap())).unwrap();
        match result {
            Value::BigDec(d) => assert_eq!(d.to_string(), "33.3333333333333333333333333333"),
            other => panic!("expected BigDec, got {:?}", other),
        }
    }
}
