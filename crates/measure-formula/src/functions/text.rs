//! Text functions

use super::FunctionKind;
use measure_formula_core::DataType;

pub(super) fn infer_return_type(kind: FunctionKind) -> DataType {
    match kind {
        FunctionKind::Length => DataType::Integer,
        FunctionKind::Like => DataType::Boolean,
        _ => DataType::String,
    }
}
