//! OLAP functions: RESTRICT, totals and percentages

use super::FunctionKind;
use crate::filter;
use crate::node::{AttributeNode, ExpressionNode, Literal};
use measure_formula_core::{DataType, ErrorCode, ValidationMessage, ValidationMessages};

/// Dimension ids of the axis arguments; `None` if any isn't a dimension reference
fn dimension_ids(dimensions: &[ExpressionNode]) -> Option<ExpressionNode> {
    dimensions
        .iter()
        .map(|d| {
            d.as_attribute()
                .map(|a| Literal::String(a.dimension_id().to_string()))
        })
        .collect::<Option<Vec<_>>>()
        .map(ExpressionNode::ListConstant)
}

pub(super) fn rewrite(kind: FunctionKind, args: &[ExpressionNode]) -> Option<ExpressionNode> {
    use FunctionKind::*;
    let (measure, rest) = args.split_first()?;
    match kind {
        Restrict => filter::restrict(measure, rest).map(ExpressionNode::RestrictedMember),
        Subtotal => Some(ExpressionNode::call(
            SubtotalByIds,
            vec![measure.clone(), dimension_ids(rest)?],
        )),
        PercentOfGrandTotal => Some(ExpressionNode::call(
            Divide,
            vec![
                measure.clone(),
                ExpressionNode::call(GrandTotal, vec![measure.clone()]),
            ],
        )),
        PercentOfSubtotal => Some(ExpressionNode::call(
            Divide,
            vec![
                measure.clone(),
                ExpressionNode::call(SubtotalByIds, vec![measure.clone(), dimension_ids(rest)?]),
            ],
        )),
        _ => None,
    }
}

pub(super) fn validate(kind: FunctionKind, args: &[ExpressionNode], out: &mut ValidationMessages) {
    use FunctionKind::*;
    let Some((measure, rest)) = args.split_first() else {
        return;
    };

    let measure_type = measure.return_type();
    if kind == Restrict {
        if !matches!(measure, ExpressionNode::Member(_)) && measure_type != DataType::Unknown {
            out.report(
                ErrorCode::TypeMismatch,
                "RESTRICT expects a measure reference as its first argument",
            );
        }
    } else if !matches!(measure_type, DataType::Measure | DataType::Unknown) {
        out.report(
            ErrorCode::TypeMismatch,
            format!("{} expects a measure as its first argument", kind.name()),
        );
    }

    match kind {
        Restrict => validate_filters(rest, out),
        Subtotal | PercentOfSubtotal => validate_axes(kind, rest, out),
        _ => {}
    }
}

fn validate_filters(filters: &[ExpressionNode], out: &mut ValidationMessages) {
    let mut pairs = Vec::new();
    for filter in filters {
        // Unknown parts were reported during resolution
        if filter.return_type() == DataType::Unknown {
            continue;
        }
        let flat = filter::flatten(filter);
        if flat.is_empty() {
            out.report(
                ErrorCode::InvalidFilter,
                format!(
                    "{} is not a combination of dimension = member conditions",
                    filter
                ),
            );
        }
        pairs.extend(flat);
    }

    for (dimension, value) in filter::duplicates(&pairs) {
        out.push(ValidationMessage::new(
            ErrorCode::DuplicateMember,
            format!("Member {} of {} is selected more than once", value, dimension),
        ));
    }

    let attributes: Vec<AttributeNode> = pairs.iter().map(|(a, _)| a.clone()).collect();
    check_hierarchies(&attributes, out);

    for group in filter::group(pairs) {
        if group.dimension.is_version() && group.is_multi_select() {
            out.report(
                ErrorCode::SingleValueFilterRequired,
                format!(
                    "Version dimension {} must be restricted to a single member",
                    group.dimension.reference
                ),
            );
        }
    }
}

fn validate_axes(kind: FunctionKind, dimensions: &[ExpressionNode], out: &mut ValidationMessages) {
    let mut attributes: Vec<AttributeNode> = Vec::new();
    for dimension in dimensions {
        match dimension.as_attribute() {
            Some(attribute) => {
                if attributes
                    .iter()
                    .any(|a| a.dimension_id() == attribute.dimension_id())
                {
                    out.report(
                        ErrorCode::NonUniqueDimension,
                        format!(
                            "Dimension {} is used more than once in {}",
                            attribute.dimension_id(),
                            kind.name()
                        ),
                    );
                } else {
                    attributes.push(attribute.clone());
                }
            }
            None => out.report(
                ErrorCode::TypeMismatch,
                format!("{} expects dimension references, found {}", kind.name(), dimension),
            ),
        }
    }
    check_hierarchies(&attributes, out);
}

/// At most one dimension may be addressed through a hierarchy
fn check_hierarchies(attributes: &[AttributeNode], out: &mut ValidationMessages) {
    let mut hierarchical: Vec<&str> = attributes
        .iter()
        .filter(|a| a.hierarchy().is_some())
        .map(AttributeNode::dimension_id)
        .collect();
    hierarchical.sort_unstable();
    hierarchical.dedup();
    if hierarchical.len() > 1 {
        out.report(
            ErrorCode::TooManyHierarchicalDimensions,
            format!(
                "Only one hierarchical dimension is allowed, found {}",
                hierarchical.join(", ")
            ),
        );
    }
}
