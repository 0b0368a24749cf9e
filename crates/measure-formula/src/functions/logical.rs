//! Logical functions: AND, OR, NOT, IF, ISNULL

use super::FunctionKind;
use crate::node::{ExpressionNode, Literal};
use measure_formula_core::DataType;

pub(super) fn infer_return_type(kind: FunctionKind, args: &[ExpressionNode]) -> DataType {
    use FunctionKind::*;
    match kind {
        And | Or | Not
            if !args.is_empty()
                && args
                    .iter()
                    .all(|a| a.return_type() == DataType::DimensionFilter) =>
        {
            DataType::DimensionFilter
        }
        If => {
            let then_type = args.get(1).map_or(DataType::Unknown, ExpressionNode::return_type);
            match (then_type, args.get(2)) {
                (DataType::Unknown, Some(otherwise)) => otherwise.return_type(),
                (ty, _) => ty,
            }
        }
        _ => DataType::Boolean,
    }
}

/// Folds beyond the generic rules: IF on a constant condition and ISNULL on
/// a constant
pub(super) fn fold(kind: FunctionKind, args: &[ExpressionNode]) -> Option<ExpressionNode> {
    match (kind, args) {
        (FunctionKind::If, [condition, then, rest @ ..]) => {
            match condition.as_literal()?.as_bool()? {
                true => Some(then.clone()),
                false => Some(rest.first().cloned().unwrap_or_else(ExpressionNode::null)),
            }
        }
        (FunctionKind::IsNullHana, [value]) => match value {
            ExpressionNode::Constant(literal) => {
                Some(ExpressionNode::boolean(*literal == Literal::Null))
            }
            ExpressionNode::ListConstant(_) => Some(ExpressionNode::boolean(false)),
            _ => None,
        },
        _ => None,
    }
}
