//! Argument type checks

use super::{CallSite, Flow, ValidationStage};
use crate::functions::{ArgumentContract, ItemContext};
use measure_formula_core::{DataType, ErrorCode, ValidationMessages};

/// Each argument must be accepted by one of the types of its position
#[derive(Debug, Default)]
pub struct ArgumentTypeCheck;

impl ValidationStage for ArgumentTypeCheck {
    fn name(&self) -> &'static str {
        "argument-types"
    }

    fn check(&self, call: &CallSite<'_>, cx: &ItemContext<'_>, out: &mut ValidationMessages) -> Flow {
        let Ok(item) = call.item else {
            return Flow::Continue;
        };
        let types = cx.types();

        let mut mismatches: Vec<(usize, &ArgumentContract, DataType)> = Vec::new();
        for (position, arg) in call.args.iter().enumerate() {
            let Some(contract) = item.contract(position) else {
                continue;
            };
            let actual = arg.return_type();
            if !contract.types.iter().any(|t| types.accepts(*t, actual)) {
                mismatches.push((position, contract, actual));
            }
        }

        match mismatches.as_slice() {
            [(a, first, a_type), (b, second, b_type)] if first.types == second.types => {
                out.report(
                    ErrorCode::TypeMismatchPair,
                    format!(
                        "Arguments {} and {} of {} must be {}, found {} and {}",
                        a + 1,
                        b + 1,
                        item.name,
                        first.describe_types(),
                        a_type,
                        b_type
                    ),
                );
            }
            _ => {
                for (position, contract, actual) in mismatches {
                    out.report(
                        ErrorCode::TypeMismatch,
                        format!(
                            "Argument {} of {} must be {}, found {}",
                            position + 1,
                            item.name,
                            contract.describe_types(),
                            actual
                        ),
                    );
                }
            }
        }
        Flow::Continue
    }
}

/// A list of mixed value types can't stand next to a single-typed argument
#[derive(Debug, Default)]
pub struct MixedListCheck;

impl ValidationStage for MixedListCheck {
    fn name(&self) -> &'static str {
        "mixed-list"
    }

    fn check(&self, call: &CallSite<'_>, _cx: &ItemContext<'_>, out: &mut ValidationMessages) -> Flow {
        if let [a, b] = call.args {
            let mixed_a = a.return_type() == DataType::ListOfMixed;
            let mixed_b = b.return_type() == DataType::ListOfMixed;
            if mixed_a != mixed_b {
                out.report(
                    ErrorCode::MixedList,
                    format!(
                        "{} does not accept a list of mixed value types",
                        call.display_name()
                    ),
                );
            }
        }
        Flow::Continue
    }
}

/// Arguments declared same-type must be compatible once both types are known
#[derive(Debug, Default)]
pub struct SameTypeCheck;

impl ValidationStage for SameTypeCheck {
    fn name(&self) -> &'static str {
        "same-type"
    }

    fn check(&self, call: &CallSite<'_>, cx: &ItemContext<'_>, out: &mut ValidationMessages) -> Flow {
        let Ok(item) = call.item else {
            return Flow::Continue;
        };
        for (position, arg) in call.args.iter().enumerate() {
            let Some(other) = item.contract(position).and_then(|c| c.same_type_as) else {
                continue;
            };
            let Some(reference) = call.args.get(other) else {
                continue;
            };
            let (expected, actual) = (reference.return_type(), arg.return_type());
            if expected == DataType::Unknown || actual == DataType::Unknown {
                continue;
            }
            if !cx.types().are_compatible(expected, actual) {
                out.report(
                    ErrorCode::SameTypeMismatch,
                    format!(
                        "Argument {} of {} must have the same type as argument {} ({}), found {}",
                        position + 1,
                        item.name,
                        other + 1,
                        expected,
                        actual
                    ),
                );
            }
        }
        Flow::Continue
    }
}
