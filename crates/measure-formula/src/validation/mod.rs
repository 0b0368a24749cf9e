//! Call validation pipeline
//!
//! Every call node passes through an ordered list of [`ValidationStage`]s.
//! Stages append messages and keep going; a stage that makes the remaining
//! checks meaningless (unknown name, wrong argument count) halts the pipeline
//! for that call.

mod arity;
mod typing;
mod usage;

pub use arity::ArityCheck;
pub use typing::{ArgumentTypeCheck, MixedListCheck, SameTypeCheck};
pub use usage::{DimensionUsageCheck, StringUsageCheck};

use crate::functions::{FormulaBehavior, FormulaItem, ItemContext, Unavailable};
use crate::node::ExpressionNode;
use measure_formula_core::{ErrorCode, ValidationMessages};

/// A call as seen by the validation stages
#[derive(Debug, Clone, Copy)]
pub struct CallSite<'a> {
    /// Name as written
    pub name: &'a str,
    /// Resolved item for the active backend
    pub item: Result<&'a FormulaItem, Unavailable>,
    /// Built arguments, after `transform_args`
    pub args: &'a [ExpressionNode],
}

impl<'a> CallSite<'a> {
    pub fn new(
        name: &'a str,
        item: Result<&'a FormulaItem, Unavailable>,
        args: &'a [ExpressionNode],
    ) -> Self {
        Self { name, item, args }
    }

    /// Display name: the registry name when resolved
    pub fn display_name(&self) -> &'a str {
        self.item.map_or(self.name, |item| item.name)
    }
}

/// Whether later stages should run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halt,
}

/// One independent check over a call
pub trait ValidationStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, call: &CallSite<'_>, cx: &ItemContext<'_>, out: &mut ValidationMessages)
        -> Flow;
}

/// The name must resolve to a callable item on the active backend
#[derive(Debug, Default)]
pub struct KnownFunctionCheck;

impl ValidationStage for KnownFunctionCheck {
    fn name(&self) -> &'static str {
        "known-function"
    }

    fn check(
        &self,
        call: &CallSite<'_>,
        _cx: &ItemContext<'_>,
        out: &mut ValidationMessages,
    ) -> Flow {
        let reason = match call.item {
            Ok(_) => return Flow::Continue,
            Err(reason) => reason,
        };
        let name = call.name.to_uppercase();
        let text = match reason {
            Unavailable::Unknown => format!("Unknown function {}", name),
            Unavailable::Disabled => format!("Function {} is not enabled", name),
            Unavailable::Internal => format!("Function {} cannot be used in formulas", name),
            Unavailable::Backend(backend) => {
                format!("Function {} is not supported on {}", name, backend)
            }
        };
        out.report(ErrorCode::FunctionInvalid, text);
        Flow::Halt
    }
}

/// Item-specific semantic checks
#[derive(Debug, Default)]
pub struct ItemCheck;

impl ValidationStage for ItemCheck {
    fn name(&self) -> &'static str {
        "item"
    }

    fn check(&self, call: &CallSite<'_>, cx: &ItemContext<'_>, out: &mut ValidationMessages) -> Flow {
        if let Ok(item) = call.item {
            out.extend(item.kind.validate(call.args, cx));
        }
        Flow::Continue
    }
}

/// Ordered validation stages
pub struct ValidationPipeline {
    stages: Vec<Box<dyn ValidationStage>>,
}

impl ValidationPipeline {
    pub fn new() -> Self {
        Self::with_stages(vec![
            Box::new(KnownFunctionCheck),
            Box::new(ArityCheck),
            Box::new(StringUsageCheck),
            Box::new(DimensionUsageCheck),
            Box::new(ArgumentTypeCheck),
            Box::new(MixedListCheck),
            Box::new(ItemCheck),
            Box::new(SameTypeCheck),
        ])
    }

    pub fn with_stages(stages: Vec<Box<dyn ValidationStage>>) -> Self {
        Self { stages }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run the stages in order, stopping at the first halt
    pub fn run(&self, call: &CallSite<'_>, cx: &ItemContext<'_>) -> (ValidationMessages, Flow) {
        let mut out = ValidationMessages::new();
        for stage in &self.stages {
            if stage.check(call, cx, &mut out) == Flow::Halt {
                tracing::trace!(stage = stage.name(), call = call.name, "validation halted");
                return (out, Flow::Halt);
            }
        }
        (out, Flow::Continue)
    }
}

impl Default for ValidationPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ValidationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationPipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}
