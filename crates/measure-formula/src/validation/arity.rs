use super::{CallSite, Flow, ValidationStage};
use crate::functions::{Arity, ItemContext};
use measure_formula_core::{ErrorCode, ValidationMessages};

fn arguments(n: usize) -> &'static str {
    if n == 1 {
        "argument"
    } else {
        "arguments"
    }
}

/// Argument count within the item's arity; halts on failure
#[derive(Debug, Default)]
pub struct ArityCheck;

impl ValidationStage for ArityCheck {
    fn name(&self) -> &'static str {
        "arity"
    }

    fn check(
        &self,
        call: &CallSite<'_>,
        _cx: &ItemContext<'_>,
        out: &mut ValidationMessages,
    ) -> Flow {
        let Ok(item) = call.item else {
            return Flow::Continue;
        };
        let count = call.args.len();
        if item.arity.accepts(count) {
            return Flow::Continue;
        }

        match item.arity {
            Arity::Either(a, b) => out.report(
                ErrorCode::ArgumentCountMismatch,
                format!(
                    "{} expected {} or {} arguments, found {}",
                    item.name, a, b, count
                ),
            ),
            Arity::Range { required, .. } if count < required => out.report(
                ErrorCode::TooFewArguments,
                format!(
                    "{} requires at least {} {}, found {}",
                    item.name,
                    required,
                    arguments(required),
                    count
                ),
            ),
            Arity::Range { .. } => {
                let max = item.arity.maximum().unwrap_or(count);
                out.report(
                    ErrorCode::TooManyArguments,
                    format!(
                        "{} accepts at most {} {}, found {}",
                        item.name,
                        max,
                        arguments(max),
                        count
                    ),
                )
            }
        }
        Flow::Halt
    }
}
