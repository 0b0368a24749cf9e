//! Constant folding rules
//!
//! Each item lists the rules that may fold it, tried in order. A rule applies
//! only when every argument is a constant of the kinds it folds; arithmetic
//! that would overflow or leave its domain doesn't fold, so validation can
//! report it.

use super::FunctionKind;
use crate::node::{ExpressionNode, Literal};
use rust_decimal::prelude::*;
use rust_decimal::MathematicalOps;

/// Argument kinds to result kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldRule {
    NumberToNumber,
    NumberToBoolean,
    BooleanToBoolean,
    StringToBoolean,
    StringToString,
    StringToNumber,
    BooleanToNumber,
}

/// Rules tried for an item, in order
pub fn rules(kind: FunctionKind) -> &'static [FoldRule] {
    use FoldRule::*;
    use FunctionKind::*;
    match kind {
        Add | Subtract | Multiply | Divide | Power | Negate | Abs | Sqrt | Log | Log10 | Exp
        | Floor | Ceil | Mod | Round | Trunc | Min | Max => &[NumberToNumber],
        Int => &[NumberToNumber, BooleanToNumber],
        // A cast of a number stays explicit
        Float => &[BooleanToNumber],
        Equal | NotEqual => &[NumberToBoolean, BooleanToBoolean, StringToBoolean],
        Less | LessEqual | Greater | GreaterEqual => &[NumberToBoolean, StringToBoolean],
        And | Or | Not => &[BooleanToBoolean],
        Upper | Lower | Concat | Substring | Replace => &[StringToString],
        Length => &[StringToNumber],
        Like => &[StringToBoolean],
        _ => &[],
    }
}

/// Fold a call with the first applicable rule
pub fn fold_with_rules(kind: FunctionKind, args: &[ExpressionNode]) -> Option<ExpressionNode> {
    if args.is_empty() {
        return None;
    }
    let literals: Vec<&Literal> = args
        .iter()
        .map(ExpressionNode::as_literal)
        .collect::<Option<_>>()?;
    rules(kind)
        .iter()
        .find_map(|rule| rule.apply(kind, &literals))
        .map(ExpressionNode::Constant)
}

impl FoldRule {
    pub fn apply(self, kind: FunctionKind, args: &[&Literal]) -> Option<Literal> {
        match self {
            FoldRule::NumberToNumber => {
                number_to_number(kind, &all(args, Literal::as_number)?).map(Literal::Number)
            }
            FoldRule::NumberToBoolean => {
                compare(kind, &all(args, Literal::as_number)?).map(Literal::Boolean)
            }
            FoldRule::BooleanToBoolean => {
                boolean_to_boolean(kind, &all(args, Literal::as_bool)?).map(Literal::Boolean)
            }
            FoldRule::StringToBoolean => string_to_boolean(kind, args).map(Literal::Boolean),
            FoldRule::StringToString => string_to_string(kind, args).map(Literal::String),
            FoldRule::StringToNumber => string_to_number(kind, args).map(Literal::Number),
            FoldRule::BooleanToNumber => {
                let values = all(args, Literal::as_bool)?;
                match (kind, values.as_slice()) {
                    (FunctionKind::Int | FunctionKind::Float, [b]) => {
                        Some(Literal::Number(if *b { Decimal::ONE } else { Decimal::ZERO }))
                    }
                    _ => None,
                }
            }
        }
    }
}

fn all<T>(args: &[&Literal], extract: impl Fn(&Literal) -> Option<T>) -> Option<Vec<T>> {
    args.iter().map(|l| extract(l)).collect()
}

/// Integral decimal as `i64`
pub(crate) fn as_integer(value: Decimal) -> Option<i64> {
    if value.fract().is_zero() {
        value.to_i64()
    } else {
        None
    }
}

fn digits(value: Option<&Decimal>) -> Option<u32> {
    match value {
        None => Some(0),
        Some(d) => as_integer(*d)
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n <= 28),
    }
}

pub(crate) fn power(base: Decimal, exponent: Decimal) -> Option<Decimal> {
    if base.is_zero() && exponent.is_sign_negative() {
        return None;
    }
    match as_integer(exponent) {
        Some(n) => base.checked_powi(n),
        None if base.is_sign_negative() => None,
        None => base.checked_powd(exponent),
    }
}

fn number_to_number(kind: FunctionKind, args: &[Decimal]) -> Option<Decimal> {
    use FunctionKind::*;
    match (kind, args) {
        (Add, [a, b]) => a.checked_add(*b),
        (Subtract, [a, b]) => a.checked_sub(*b),
        (Multiply, [a, b]) => a.checked_mul(*b),
        (Divide, [_, b]) if b.is_zero() => None,
        (Divide, [a, b]) => a.checked_div(*b),
        (Power, [a, b]) => power(*a, *b),
        (Negate, [a]) => Some(-*a),
        (Abs, [a]) => Some(a.abs()),
        (Sqrt, [a]) => a.sqrt(),
        (Log, [a]) if a.is_sign_positive() && !a.is_zero() => a.checked_ln(),
        (Log10, [a]) if a.is_sign_positive() && !a.is_zero() => a.checked_log10(),
        (Exp, [a]) => a.checked_exp(),
        (Floor | Int, [a]) => Some(a.floor()),
        (Ceil, [a]) => Some(a.ceil()),
        (Mod, [_, b]) if b.is_zero() => None,
        (Mod, [a, b]) => a.checked_rem(*b),
        (Round, [a, rest @ ..]) if rest.len() <= 1 => Some(a.round_dp_with_strategy(
            digits(rest.first())?,
            RoundingStrategy::MidpointAwayFromZero,
        )),
        (Trunc, [a, rest @ ..]) if rest.len() <= 1 => {
            Some(a.round_dp_with_strategy(digits(rest.first())?, RoundingStrategy::ToZero))
        }
        (Min, [first, rest @ ..]) => Some(rest.iter().fold(*first, |m, v| m.min(*v))),
        (Max, [first, rest @ ..]) => Some(rest.iter().fold(*first, |m, v| m.max(*v))),
        _ => None,
    }
}

fn compare<T: PartialOrd>(kind: FunctionKind, args: &[T]) -> Option<bool> {
    use FunctionKind::*;
    match (kind, args) {
        (Equal, [a, b]) => Some(a == b),
        (NotEqual, [a, b]) => Some(a != b),
        (Less, [a, b]) => Some(a < b),
        (LessEqual, [a, b]) => Some(a <= b),
        (Greater, [a, b]) => Some(a > b),
        (GreaterEqual, [a, b]) => Some(a >= b),
        _ => None,
    }
}

fn boolean_to_boolean(kind: FunctionKind, args: &[bool]) -> Option<bool> {
    use FunctionKind::*;
    match (kind, args) {
        (And, _) => Some(args.iter().all(|b| *b)),
        (Or, _) => Some(args.iter().any(|b| *b)),
        (Not, [a]) => Some(!a),
        (Equal, [a, b]) => Some(a == b),
        (NotEqual, [a, b]) => Some(a != b),
        _ => None,
    }
}

fn string_to_boolean(kind: FunctionKind, args: &[&Literal]) -> Option<bool> {
    let values = all(args, |l| l.as_str().map(str::to_string))?;
    match (kind, values.as_slice()) {
        (FunctionKind::Like, [text, pattern]) => Some(like(text, pattern)),
        _ => compare(kind, &values),
    }
}

/// First argument a string, the rest any constants
fn string_to_string(kind: FunctionKind, args: &[&Literal]) -> Option<String> {
    use FunctionKind::*;
    let (first, rest) = args.split_first()?;
    let text = first.as_str()?;
    match (kind, rest) {
        (Upper, []) => Some(text.to_uppercase()),
        (Lower, []) => Some(text.to_lowercase()),
        (Concat, _) => {
            let mut out = text.to_string();
            for arg in rest {
                out.push_str(arg.as_str()?);
            }
            Some(out)
        }
        (Substring, [start, length @ ..]) if length.len() <= 1 => {
            let start = as_integer(start.as_number()?).filter(|s| *s >= 1)?;
            let skip = usize::try_from(start - 1).ok()?;
            let chars = text.chars().skip(skip);
            match length.first() {
                None => Some(chars.collect()),
                Some(len) => {
                    let take = usize::try_from(as_integer(len.as_number()?)?).ok()?;
                    Some(chars.take(take).collect())
                }
            }
        }
        (Replace, [search, replacement]) => {
            let search = search.as_str()?;
            if search.is_empty() {
                return Some(text.to_string());
            }
            Some(text.replace(search, replacement.as_str()?))
        }
        _ => None,
    }
}

fn string_to_number(kind: FunctionKind, args: &[&Literal]) -> Option<Decimal> {
    match (kind, args) {
        (FunctionKind::Length, [text]) => Some(Decimal::from(text.as_str()?.chars().count())),
        _ => None,
    }
}

/// SQL `LIKE` with `%` (any run) and `_` (one character)
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some('_') => {
                t += 1;
                p += 1;
            }
            Some(c) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((bp, bt)) => {
                    p = bp + 1;
                    t = bt + 1;
                    backtrack = Some((bp, bt + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}
