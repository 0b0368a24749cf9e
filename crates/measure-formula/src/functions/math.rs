//! Math functions

use super::operators::{is_literal_zero, literal_number, numeric_result};
use super::FunctionKind;
use crate::node::ExpressionNode;
use measure_formula_core::{DataType, ErrorCode, ValidationMessages};

pub(super) fn infer_return_type(kind: FunctionKind, args: &[ExpressionNode]) -> DataType {
    use FunctionKind::*;
    match kind {
        Abs | Floor | Ceil | Mod | Min | Max => numeric_result(args, true),
        Round | Trunc => numeric_result(&args[..args.len().min(1)], true),
        Sqrt | Log | Log10 | Exp => numeric_result(args, false),
        Int => DataType::Integer,
        _ => DataType::Number,
    }
}

pub(super) fn validate(kind: FunctionKind, args: &[ExpressionNode], out: &mut ValidationMessages) {
    match (kind, args) {
        (FunctionKind::Sqrt, [value]) => {
            if literal_number(value).map_or(false, |n| n.is_sign_negative() && !n.is_zero()) {
                out.report(
                    ErrorCode::SqrtDomain,
                    "SQRT is not defined for negative numbers",
                );
            }
        }
        (FunctionKind::Log | FunctionKind::Log10, [value]) => {
            if literal_number(value).map_or(false, |n| n.is_sign_negative() || n.is_zero()) {
                out.report(
                    ErrorCode::LogDomain,
                    format!("{} is only defined for positive numbers", kind.name()),
                );
            }
        }
        (FunctionKind::Mod, [_, divisor]) if is_literal_zero(divisor) => {
            out.report(ErrorCode::DivideByZero, "MOD by zero");
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn num(n: i64) -> ExpressionNode {
        ExpressionNode::number(Decimal::from(n))
    }

    #[test]
    fn test_domain_checks() {
        let mut out = ValidationMessages::new();
        validate(FunctionKind::Sqrt, &[num(-1)], &mut out);
        validate(FunctionKind::Sqrt, &[num(0)], &mut out);
        validate(FunctionKind::Log10, &[num(0)], &mut out);
        validate(FunctionKind::Mod, &[num(7), num(0)], &mut out);
        assert_eq!(
            out.codes(),
            vec![ErrorCode::SqrtDomain, ErrorCode::LogDomain, ErrorCode::DivideByZero]
        );
    }

    #[test]
    fn test_return_types() {
        assert_eq!(infer_return_type(FunctionKind::Int, &[num(1)]), DataType::Integer);
        assert_eq!(infer_return_type(FunctionKind::Sqrt, &[num(4)]), DataType::Number);
        assert_eq!(
            infer_return_type(FunctionKind::Round, &[num(4), num(2)]),
            DataType::Number
        );
    }
}
