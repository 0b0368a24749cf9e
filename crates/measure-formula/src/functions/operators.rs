//! Arithmetic, comparison and membership operators

use super::{date, fold, FunctionKind, ItemContext};
use crate::node::{ExpressionNode, Literal};
use measure_formula_core::{DataType, ErrorCode, ValidationMessages};
use rust_decimal::Decimal;

/// Numeric result type: a measure when any argument is one, an integer when
/// all arguments are and the operation keeps integers
pub(crate) fn numeric_result(args: &[ExpressionNode], keeps_integer: bool) -> DataType {
    let types: Vec<_> = args.iter().map(ExpressionNode::return_type).collect();
    if types.contains(&DataType::Measure) {
        DataType::Measure
    } else if keeps_integer && !types.is_empty() && types.iter().all(|t| *t == DataType::Integer)
    {
        DataType::Integer
    } else {
        DataType::Number
    }
}

/// A comparison becomes a member filter when its left side is a dimension
/// reference and its right side a constant
fn is_member_comparison(args: &[ExpressionNode]) -> bool {
    matches!(args, [ExpressionNode::Attribute(_), right] if right.is_literal())
}

pub(super) fn infer_return_type(kind: FunctionKind, args: &[ExpressionNode]) -> DataType {
    use FunctionKind::*;
    match kind {
        Add | Subtract | Multiply | Negate => numeric_result(args, true),
        Divide | Power => numeric_result(args, false),
        In | NotIn if matches!(args.first(), Some(ExpressionNode::Attribute(_))) => {
            DataType::DimensionFilter
        }
        _ if kind.is_comparison() && is_member_comparison(args) => DataType::DimensionFilter,
        _ => DataType::Boolean,
    }
}

pub(super) fn rewrite(
    kind: FunctionKind,
    args: &[ExpressionNode],
    cx: &ItemContext<'_>,
) -> Option<ExpressionNode> {
    match kind {
        FunctionKind::In | FunctionKind::NotIn => expand_membership(kind, args),
        _ if kind.is_comparison() => date::rewrite_member_comparison(kind, args, cx),
        _ => None,
    }
}

/// `x IN {a, b}` → `x = a OR x = b`; `x NOT IN {a, b}` → `x != a AND x != b`
fn expand_membership(kind: FunctionKind, args: &[ExpressionNode]) -> Option<ExpressionNode> {
    let [subject, list] = args else {
        return None;
    };
    let elements: Vec<ExpressionNode> = match list {
        ExpressionNode::ListConstant(items) => {
            items.iter().cloned().map(ExpressionNode::Constant).collect()
        }
        ExpressionNode::Array(items) => items.clone(),
        _ => return None,
    };
    let (compare, join) = if kind == FunctionKind::In {
        (FunctionKind::Equal, FunctionKind::Or)
    } else {
        (FunctionKind::NotEqual, FunctionKind::And)
    };

    // Right-folded: a = x OR (a = y OR a = z)
    let mut comparisons = elements
        .into_iter()
        .rev()
        .map(|element| ExpressionNode::call(compare, vec![subject.clone(), element]));
    let last = match comparisons.next() {
        Some(last) => last,
        // Empty list: nothing is a member
        None => return Some(ExpressionNode::boolean(kind == FunctionKind::NotIn)),
    };
    Some(comparisons.fold(last, |acc, previous| {
        ExpressionNode::call(join, vec![previous, acc])
    }))
}

pub(super) fn validate(kind: FunctionKind, args: &[ExpressionNode], out: &mut ValidationMessages) {
    match (kind, args) {
        (FunctionKind::Divide, [_, divisor]) if is_literal_zero(divisor) => {
            out.report(ErrorCode::DivideByZero, "Division by zero");
        }
        (FunctionKind::Power, [base, exponent]) => {
            let (Some(base), Some(exponent)) = (literal_number(base), literal_number(exponent))
            else {
                return;
            };
            if base.is_zero() && exponent.is_sign_negative() && !exponent.is_zero() {
                out.report(
                    ErrorCode::PowerZeroNegative,
                    "Zero cannot be raised to a negative power",
                );
            } else if base.is_sign_negative() && fold::as_integer(exponent).is_none() {
                out.report(
                    ErrorCode::PowerNegativeFractional,
                    "A negative number cannot be raised to a fractional power",
                );
            }
        }
        _ => {}
    }
}

/// Number behind a constant, looking through the `FLOAT` cast added by
/// [`cast_integer_literals`]
pub(crate) fn literal_number(node: &ExpressionNode) -> Option<Decimal> {
    match node {
        ExpressionNode::Constant(Literal::Number(n)) => Some(*n),
        ExpressionNode::Function(f) if f.kind == FunctionKind::Float => {
            f.args.first().and_then(literal_number)
        }
        _ => None,
    }
}

pub(crate) fn is_literal_zero(node: &ExpressionNode) -> bool {
    literal_number(node).map_or(false, |n| n.is_zero())
}

/// Wrap an integer literal operand in `FLOAT(..)` when the other operand
/// isn't a literal, so the backend doesn't fall back to integer division
pub(super) fn cast_integer_literals(args: Vec<ExpressionNode>) -> Vec<ExpressionNode> {
    if args.len() != 2 || args.iter().all(ExpressionNode::is_literal) {
        return args;
    }
    args.into_iter()
        .map(|arg| match arg.as_number() {
            Some(n) if n.fract().is_zero() => ExpressionNode::call(FunctionKind::Float, vec![arg]),
            _ => arg,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{AttributeNode, MemberNode};
    use measure_formula_core::{Dimension, FieldReference, Measure};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn num(n: i64) -> ExpressionNode {
        ExpressionNode::number(Decimal::from(n))
    }

    fn sales() -> ExpressionNode {
        ExpressionNode::Member(MemberNode {
            reference: FieldReference::measure("Sales"),
            measure: Some(Arc::new(Measure::new("Sales"))),
        })
    }

    fn city() -> ExpressionNode {
        ExpressionNode::Attribute(AttributeNode {
            reference: FieldReference::dimension("City"),
            dimension: Some(Arc::new(Dimension::new("City"))),
        })
    }

    #[test]
    fn test_return_types() {
        assert_eq!(
            infer_return_type(FunctionKind::Add, &[sales(), num(1)]),
            DataType::Measure
        );
        assert_eq!(
            infer_return_type(FunctionKind::Add, &[num(1), num(1)]),
            DataType::Number
        );
        assert_eq!(
            infer_return_type(FunctionKind::Equal, &[city(), ExpressionNode::string("Paris")]),
            DataType::DimensionFilter
        );
        assert_eq!(
            infer_return_type(FunctionKind::Equal, &[sales(), num(1)]),
            DataType::Boolean
        );
    }

    #[test]
    fn test_membership_expands() {
        let list = ExpressionNode::ListConstant(vec![
            Literal::String("Paris".into()),
            Literal::String("Rome".into()),
        ]);
        let expanded = expand_membership(FunctionKind::In, &[city(), list.clone()]).unwrap();
        assert_eq!(
            expanded.to_string(),
            r#"[d/City] = "Paris" OR [d/City] = "Rome""#
        );
        let excluded = expand_membership(FunctionKind::NotIn, &[city(), list]).unwrap();
        assert_eq!(
            excluded.to_string(),
            r#"[d/City] != "Paris" AND [d/City] != "Rome""#
        );

        let three = ExpressionNode::ListConstant(vec![
            Literal::String("A".into()),
            Literal::String("B".into()),
            Literal::String("C".into()),
        ]);
        let chained = expand_membership(FunctionKind::In, &[city(), three]).unwrap();
        assert_eq!(
            chained.to_string(),
            r#"[d/City] = "A" OR ([d/City] = "B" OR [d/City] = "C")"#
        );
    }

    #[test]
    fn test_integer_literals_cast_next_to_fields() {
        let args = cast_integer_literals(vec![sales(), num(2)]);
        assert_eq!(args[1].to_string(), "FLOAT(2)");
        assert!(is_literal_zero(&cast_integer_literals(vec![sales(), num(0)])[1]));

        let literal_only = cast_integer_literals(vec![num(1), num(2)]);
        assert_eq!(literal_only, vec![num(1), num(2)]);
    }

    #[test]
    fn test_division_by_zero_reported() {
        let mut out = ValidationMessages::new();
        validate(
            FunctionKind::Divide,
            &cast_integer_literals(vec![sales(), num(0)]),
            &mut out,
        );
        assert_eq!(out.codes(), vec![ErrorCode::DivideByZero]);
    }

    #[test]
    fn test_power_domain() {
        let mut out = ValidationMessages::new();
        validate(FunctionKind::Power, &[num(0), num(-2)], &mut out);
        validate(
            FunctionKind::Power,
            &[num(-8), ExpressionNode::number(Decimal::new(5, 1))],
            &mut out,
        );
        assert_eq!(
            out.codes(),
            vec![ErrorCode::PowerZeroNegative, ErrorCode::PowerNegativeFractional]
        );
    }
}
