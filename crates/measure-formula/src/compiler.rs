//! Compiler facade
//!
//! [`Compiler`] ties the pipeline together for one metadata snapshot:
//! parse, build and validate, guard against cyclical measure dependencies and
//! collect the restricted measures the formula derives.

use crate::builder::TreeBuilder;
use crate::config::CompilerEnvironment;
use crate::dependency::check_cyclical_dependency;
use crate::error::FormulaError;
use crate::node::{ExpressionNode, RestrictedMemberNode};
use crate::parser::parse_formula_with_limits;
use crate::presentation;
use crate::scanner::{self, Token};
use measure_formula_core::{
    DataType, ErrorCode, Measure, MetadataProvider, ValidationMessage, ValidationMessages,
};

/// Per-call compile options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileContext {
    /// Measure whose formula is being edited; enables the cycle guard
    pub editing_measure: Option<String>,
}

impl CompileContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for editing the formula of `measure`
    pub fn editing(measure: impl Into<String>) -> Self {
        Self {
            editing_measure: Some(measure.into()),
        }
    }
}

/// A formula that compiled without errors
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFormula {
    pub root: ExpressionNode,
    /// Warnings and infos
    pub messages: ValidationMessages,
    /// Hidden restricted measures derived from `RESTRICT` calls, in source order
    pub derived_measures: Vec<Measure>,
}

impl CompiledFormula {
    pub fn return_type(&self) -> DataType {
        self.root.return_type()
    }

    /// Canonical text of the lowered tree
    pub fn canonical_text(&self) -> String {
        self.root.to_string()
    }
}

/// Formula compiler over one metadata snapshot
pub struct Compiler<'a> {
    env: &'a CompilerEnvironment,
    metadata: &'a dyn MetadataProvider,
}

impl<'a> Compiler<'a> {
    pub fn new(env: &'a CompilerEnvironment, metadata: &'a dyn MetadataProvider) -> Self {
        Self { env, metadata }
    }

    pub fn environment(&self) -> &'a CompilerEnvironment {
        self.env
    }

    /// Compile canonical formula text
    pub fn compile(
        &self,
        text: &str,
        cx: &CompileContext,
    ) -> Result<CompiledFormula, ValidationMessages> {
        let (root, messages) = self.run(text, cx);
        match root {
            Some(root) if !messages.has_errors() => {
                let derived_measures = derived_measures(&root);
                Ok(CompiledFormula {
                    root,
                    messages,
                    derived_measures,
                })
            }
            _ => Err(messages),
        }
    }

    /// Every message for canonical formula text
    pub fn validate(&self, text: &str, cx: &CompileContext) -> ValidationMessages {
        self.run(text, cx).1
    }

    /// Compile display text of the configured locale
    pub fn compile_display(
        &self,
        display: &str,
        cx: &CompileContext,
    ) -> Result<CompiledFormula, ValidationMessages> {
        let guard = presentation::check_separators(display, self.env.locale());
        if guard.has_errors() {
            return Err(guard);
        }
        self.compile(&self.to_canonical_text(display), cx)
    }

    /// Every message for display text of the configured locale
    pub fn validate_display(&self, display: &str, cx: &CompileContext) -> ValidationMessages {
        let guard = presentation::check_separators(display, self.env.locale());
        if guard.has_errors() {
            return guard;
        }
        self.validate(&self.to_canonical_text(display), cx)
    }

    /// Editor tokens of canonical formula text
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        scanner::tokenize(text, &self.env.registry, self.metadata.backend())
    }

    pub fn to_display_text(&self, canonical: &str) -> String {
        presentation::to_display_text(canonical, self.env.locale())
    }

    pub fn to_canonical_text(&self, display: &str) -> String {
        presentation::to_canonical_text(display, self.env.locale())
    }

    fn run(&self, text: &str, cx: &CompileContext) -> (Option<ExpressionNode>, ValidationMessages) {
        let config = &self.env.config;
        let parsed = parse_formula_with_limits(text, config.max_depth, config.max_tree_height);
        let expr = match parsed {
            Ok(expr) => expr,
            Err(err) => {
                tracing::debug!(error = %err, "formula failed to parse");
                return (None, parse_error_messages(err));
            }
        };

        let (root, mut messages) = TreeBuilder::new(self.env, self.metadata).build_formula(&expr);
        if let Some(editing) = &cx.editing_measure {
            if let Some(cycle) = check_cyclical_dependency(&root, editing, self.metadata) {
                messages.push(cycle);
            }
        }

        tracing::debug!(
            length = text.len(),
            messages = messages.len(),
            errors = messages.errors().count(),
            "compiled formula"
        );
        (Some(root), messages)
    }
}

fn parse_error_messages(err: FormulaError) -> ValidationMessages {
    let code = match err {
        FormulaError::NestingTooDeep(_) => ErrorCode::NestingTooDeep,
        _ => ErrorCode::SyntaxError,
    };
    ValidationMessage::new(code, err.to_string()).into()
}

/// Hidden measures for the restricted members of a tree, first occurrence wins
fn derived_measures(root: &ExpressionNode) -> Vec<Measure> {
    let mut restricted: Vec<&RestrictedMemberNode> = Vec::new();
    root.walk(&mut |node| {
        if let ExpressionNode::RestrictedMember(node) = node {
            if !restricted.iter().any(|r| r.id == node.id) {
                restricted.push(node);
            }
        }
    });
    restricted
        .into_iter()
        .map(|node| {
            let value_type = node
                .base
                .measure
                .as_ref()
                .map_or(DataType::Number, |m| m.value_type);
            Measure::new(node.id.clone())
                .with_formula(node.to_string())
                .with_value_type(value_type)
                .hidden()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompilerConfig, Locale};
    use measure_formula_core::{Backend, Dimension, MetadataSnapshot};
    use pretty_assertions::assert_eq;

    fn model() -> MetadataSnapshot {
        MetadataSnapshot::new(Backend::Hana)
            .with_measure(Measure::new("Sales"))
            .with_dimension(Dimension::new("City"))
    }

    #[test]
    fn test_compile_collects_restricted_measures() {
        let env = CompilerEnvironment::default();
        let metadata = model();
        let compiler = Compiler::new(&env, &metadata);

        let compiled = compiler
            .compile(
                r#"RESTRICT([Sales], [d/City] = "Paris") + RESTRICT([Sales], [d/City] = "Paris")"#,
                &CompileContext::new(),
            )
            .unwrap();
        assert_eq!(compiled.derived_measures.len(), 1);
        let derived = &compiled.derived_measures[0];
        assert!(derived.is_hidden());
        assert!(derived.id.starts_with("RESTRICTED_Sales_"));
        assert_eq!(
            derived.formula.as_deref(),
            Some(r#"RESTRICT([Sales], [d/City] = "Paris")"#)
        );
    }

    #[test]
    fn test_parse_errors_become_messages() {
        let env = CompilerEnvironment::default();
        let metadata = model();
        let compiler = Compiler::new(&env, &metadata);
        let cx = CompileContext::new();

        assert_eq!(compiler.validate("1 +", &cx).codes(), vec![ErrorCode::SyntaxError]);

        let deep = format!("{}1{}", "(".repeat(80), ")".repeat(80));
        assert_eq!(compiler.validate(&deep, &cx).codes(), vec![ErrorCode::NestingTooDeep]);
    }

    #[test]
    fn test_display_entry_points() {
        let env = CompilerEnvironment::new(CompilerConfig {
            locale: Locale::COMMA_DECIMAL,
            ..CompilerConfig::default()
        });
        let metadata = model();
        let compiler = Compiler::new(&env, &metadata);
        let cx = CompileContext::new();

        let compiled = compiler.compile_display("ROUND([Sales] * 1,5; 2)", &cx).unwrap();
        assert_eq!(compiled.canonical_text(), "ROUND([Sales] * 1.5, 2)");
        assert_eq!(
            compiler.to_display_text(&compiled.canonical_text()),
            "ROUND([Sales] * 1,5; 2)"
        );
        assert_eq!(
            compiler.validate_display("[Sales] * 1.5", &cx).codes(),
            vec![ErrorCode::WrongDecimalSeparator]
        );
    }

    #[test]
    fn test_tokenize_uses_backend() {
        let env = CompilerEnvironment::default();
        let metadata = MetadataSnapshot::new(Backend::Bw);
        let compiler = Compiler::new(&env, &metadata);
        let tokens = compiler.tokenize("LIKE([d/City], ");
        // LIKE is HANA only, so its argument positions carry no types
        let arguments: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == crate::scanner::TokenKind::Argument)
            .collect();
        assert_eq!(arguments.len(), 2);
        assert!(arguments.iter().all(|t| t.data_types.is_empty()));
    }
}
