//! Expression tree builder
//!
//! Turns the parse trace into typed nodes: resolves field references against
//! the metadata provider, resolves calls against the registry, runs the
//! validation pipeline on every call and lowers valid calls as they are built.
//! Problems are collected as messages; a call that can't be built becomes an
//! inert `NULL` constant so the rest of the formula is still checked.

use crate::ast::FormulaExpr;
use crate::config::CompilerEnvironment;
use crate::engine;
use crate::functions::{FormulaBehavior, FunctionKind, ItemContext};
use crate::node::{AttributeNode, ExpressionNode, MemberNode};
use crate::validation::{CallSite, Flow, ValidationPipeline};
use measure_formula_core::{
    DataType, ErrorCode, FieldKind, FieldReference, MetadataProvider, SuffixKind,
    ValidationMessages,
};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Builds one formula; messages accumulate per builder
pub struct TreeBuilder<'a> {
    cx: ItemContext<'a>,
    pipeline: ValidationPipeline,
    messages: ValidationMessages,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(env: &'a CompilerEnvironment, metadata: &'a dyn MetadataProvider) -> Self {
        Self {
            cx: ItemContext::new(env, metadata),
            pipeline: ValidationPipeline::new(),
            messages: ValidationMessages::new(),
        }
    }

    /// Build a whole formula, including the root type check
    pub fn build_formula(mut self, expr: &FormulaExpr) -> (ExpressionNode, ValidationMessages) {
        let root = self.build(expr);
        let root = self.check_root(root);
        (root, self.messages)
    }

    pub fn messages(&self) -> &ValidationMessages {
        &self.messages
    }

    pub fn into_messages(self) -> ValidationMessages {
        self.messages
    }

    /// Build a subtree
    pub fn build(&mut self, expr: &FormulaExpr) -> ExpressionNode {
        match expr {
            FormulaExpr::Number(text) => self.number(text),
            FormulaExpr::String(value) => ExpressionNode::string(value.clone()),
            FormulaExpr::Boolean(value) => ExpressionNode::boolean(*value),
            FormulaExpr::Null => ExpressionNode::null(),
            FormulaExpr::Field(reference) => self.field(reference),
            FormulaExpr::BinaryOp { op, left, right } => {
                self.call(op.name(), &[left.as_ref(), right.as_ref()], true)
            }
            FormulaExpr::UnaryOp { op, operand } => self.call(op.name(), &[operand.as_ref()], true),
            FormulaExpr::Function { name, args } => {
                let args: Vec<&FormulaExpr> = args.iter().collect();
                self.call(name, &args, false)
            }
            FormulaExpr::List(items) => {
                let items = items.iter().map(|item| self.build(item)).collect();
                ExpressionNode::list(items)
            }
        }
    }

    fn number(&mut self, text: &str) -> ExpressionNode {
        let parsed = if text.contains(|c: char| c.eq_ignore_ascii_case(&'e')) {
            Decimal::from_scientific(text)
        } else if text.starts_with('.') {
            Decimal::from_str(&format!("0{}", text))
        } else {
            Decimal::from_str(text)
        };
        match parsed {
            Ok(value) => ExpressionNode::number(value),
            Err(_) => {
                self.messages.report(
                    ErrorCode::SyntaxError,
                    format!("Number {} is out of range", text),
                );
                ExpressionNode::null()
            }
        }
    }

    fn field(&mut self, reference: &FieldReference) -> ExpressionNode {
        match reference.kind {
            FieldKind::Measure | FieldKind::Unknown => self.measure(reference),
            FieldKind::Dimension => self.dimension(reference),
            FieldKind::Property | FieldKind::Hierarchy => {
                self.messages.report(
                    ErrorCode::InvalidSecondField,
                    format!("{} must follow a dimension reference", reference),
                );
                ExpressionNode::Attribute(AttributeNode {
                    reference: reference.clone(),
                    dimension: None,
                })
            }
        }
    }

    fn measure(&mut self, reference: &FieldReference) -> ExpressionNode {
        if reference.suffix.is_some() {
            self.messages.report(
                ErrorCode::InvalidSecondField,
                format!("Measure {} cannot have a property or hierarchy", reference),
            );
        }
        let measure = self.cx.metadata.resolve_measure(&reference.id);
        if measure.is_none() {
            self.messages.report(
                ErrorCode::InvalidMeasure,
                format!("Unknown measure {}", reference.id),
            );
        }
        ExpressionNode::Member(MemberNode {
            reference: reference.clone(),
            measure,
        })
    }

    fn dimension(&mut self, reference: &FieldReference) -> ExpressionNode {
        let dimension = self.cx.metadata.resolve_dimension(&reference.id);
        match (&dimension, &reference.suffix) {
            (None, _) => self.messages.report(
                ErrorCode::InvalidDimension,
                format!("Unknown dimension {}", reference.id),
            ),
            (Some(d), Some(suffix)) => match suffix.kind {
                SuffixKind::Property if !d.has_property(&suffix.id) => self.messages.report(
                    ErrorCode::InvalidProperty,
                    format!("Dimension {} has no property {}", d.id, suffix.id),
                ),
                SuffixKind::Hierarchy if !d.has_hierarchy(&suffix.id) => self.messages.report(
                    ErrorCode::InvalidHierarchy,
                    format!("Dimension {} has no hierarchy {}", d.id, suffix.id),
                ),
                _ => {}
            },
            (Some(_), None) => {}
        }
        ExpressionNode::Attribute(AttributeNode {
            reference: reference.clone(),
            dimension,
        })
    }

    fn call(&mut self, name: &str, raw: &[&FormulaExpr], operator: bool) -> ExpressionNode {
        let args: Vec<ExpressionNode> = raw.iter().map(|arg| self.build(arg)).collect();

        let env = self.cx.env;
        let backend = self.cx.backend();
        let item = if operator {
            env.registry.resolve_operator(name, backend)
        } else {
            env.registry.resolve(name, backend)
        };
        let args = match item {
            Ok(item) => item.kind.transform_args(args),
            Err(_) => args,
        };

        let (messages, flow) = self
            .pipeline
            .run(&CallSite::new(name, item, &args), &self.cx);
        let failed = messages.has_errors();
        self.messages.extend(messages);

        let item = match (item, flow) {
            (Ok(item), Flow::Continue) => item,
            _ => return ExpressionNode::null(),
        };
        let node = ExpressionNode::call(item.kind, args);
        if failed {
            node
        } else {
            engine::lower_node(node, &self.cx)
        }
    }

    /// The root must be numeric or boolean; booleans are cast to a number
    fn check_root(&mut self, root: ExpressionNode) -> ExpressionNode {
        let ty = root.return_type();
        if ty == DataType::Unknown || ty.is_numeric() {
            return root;
        }
        if ty.is_boolean() {
            let int = engine::lower_node(
                ExpressionNode::call(FunctionKind::Int, vec![root]),
                &self.cx,
            );
            if int.is_literal() {
                return int;
            }
            return ExpressionNode::call(FunctionKind::Float, vec![int]);
        }
        if ty.is_subtype_of(DataType::String) {
            self.messages.report(
                ErrorCode::StringAtRoot,
                format!("A formula must return a number, found {}", ty),
            );
        } else {
            self.messages.report(
                ErrorCode::NonNumericRoot,
                format!("A formula must return a number, found {}", ty),
            );
        }
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;
    use measure_formula_core::{Backend, Dimension, Measure, MetadataSnapshot};
    use pretty_assertions::assert_eq;

    fn model() -> MetadataSnapshot {
        MetadataSnapshot::new(Backend::Hana)
            .with_measure(Measure::new("Sales"))
            .with_measure(Measure::new("Cost").with_alias("Costs"))
            .with_dimension(
                Dimension::new("City")
                    .with_property("Name")
                    .with_hierarchy("Geo"),
            )
    }

    fn build(text: &str) -> (ExpressionNode, Vec<ErrorCode>) {
        let env = CompilerEnvironment::default();
        let metadata = model();
        let expr = parse_formula(text).unwrap();
        let (node, messages) = TreeBuilder::new(&env, &metadata).build_formula(&expr);
        (node, messages.codes())
    }

    #[test]
    fn test_folds_constants() {
        let (node, codes) = build("2 + 2 * 3");
        assert_eq!(node.to_string(), "8");
        assert_eq!(node.return_type(), DataType::Number);
        assert!(codes.is_empty());
    }

    #[test]
    fn test_resolves_fields() {
        let (node, codes) = build("[Sales] - [Costs]");
        assert!(codes.is_empty());
        assert_eq!(node.return_type(), DataType::Measure);
        assert_eq!(node.member_references()[1].id(), "Cost");
    }

    #[test]
    fn test_reference_errors() {
        assert_eq!(build("[Nope]").1, vec![ErrorCode::InvalidMeasure]);
        assert_eq!(
            build("SUBTOTAL([Sales], [d/Town])").1,
            vec![ErrorCode::InvalidDimension]
        );
        assert_eq!(
            build("SUBTOTAL([Sales], [d/City].[p/Zip])").1,
            vec![ErrorCode::InvalidProperty]
        );
        assert_eq!(
            build("SUBTOTAL([Sales], [d/City].[h/Time])").1,
            vec![ErrorCode::InvalidHierarchy]
        );
        assert_eq!(
            build("[Sales].[p/Name]").1,
            vec![ErrorCode::InvalidSecondField]
        );
    }

    #[test]
    fn test_integer_literal_cast_for_division() {
        let (node, codes) = build("[Sales] / 2");
        assert!(codes.is_empty());
        assert_eq!(node.to_string(), "[Sales] / FLOAT(2)");
    }

    #[test]
    fn test_unknown_function_becomes_null() {
        let (node, codes) = build("1 + FOO(2)");
        assert_eq!(codes, vec![ErrorCode::FunctionInvalid]);
        assert_eq!(node.to_string(), "1 + NULL");
    }

    #[test]
    fn test_boolean_root_is_cast() {
        let (node, codes) = build("[Sales] > 10");
        assert!(codes.is_empty());
        assert_eq!(node.to_string(), "FLOAT(INT([Sales] > 10))");
        assert_eq!(node.return_type(), DataType::Number);

        let (node, _) = build("TRUE");
        assert_eq!(node.to_string(), "1");
    }

    #[test]
    fn test_root_types() {
        assert_eq!(build(r#""text""#).1, vec![ErrorCode::StringAtRoot]);
        assert_eq!(
            build("{1, 2}").1,
            vec![ErrorCode::NonNumericRoot]
        );
    }
}
