//! Member-filter flattening and restricted-measure derivation
//!
//! A filter argument of `RESTRICT` must be built only from `AND`/`OR` over
//! `dimension = constant` leaves. It flattens to `(dimension, value)` pairs,
//! which group into one OR-filter per dimension; the groups are AND-ed.

use crate::functions::FunctionKind;
use crate::node::{AttributeNode, ExpressionNode, Literal, MemberNode, RestrictedMemberNode};
use ahash::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};

/// Members selected on one dimension
#[derive(Debug, Clone, PartialEq)]
pub struct MemberFilter {
    pub dimension: AttributeNode,
    /// Distinct values in first-seen order
    pub values: Vec<Literal>,
}

impl MemberFilter {
    pub fn is_multi_select(&self) -> bool {
        self.values.len() > 1
    }

    /// Grouping key: the reference as written, suffix included
    fn key(&self) -> String {
        self.dimension.reference.to_string()
    }
}

impl fmt::Display for MemberFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.values.as_slice() {
            [single] => write!(f, "{} = {}", self.dimension.reference, single),
            values => {
                write!(f, "{} IN {{", self.dimension.reference)?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Flatten a filter tree to `(dimension, value)` pairs in source order;
/// empty when the tree has any other shape
pub fn flatten(node: &ExpressionNode) -> Vec<(AttributeNode, Literal)> {
    let mut pairs = Vec::new();
    if collect(node, &mut pairs) {
        pairs
    } else {
        Vec::new()
    }
}

fn collect(node: &ExpressionNode, out: &mut Vec<(AttributeNode, Literal)>) -> bool {
    let ExpressionNode::Function(function) = node else {
        return false;
    };
    match (function.kind, function.args.as_slice()) {
        (FunctionKind::And | FunctionKind::Or, args) => args.iter().all(|a| collect(a, out)),
        (
            FunctionKind::Equal,
            [ExpressionNode::Attribute(attribute), ExpressionNode::Constant(literal)],
        ) if *literal != Literal::Null => {
            out.push((attribute.clone(), literal.clone()));
            true
        }
        _ => false,
    }
}

/// Group pairs into one filter per dimension, first-seen order, values deduplicated
pub fn group(pairs: Vec<(AttributeNode, Literal)>) -> Vec<MemberFilter> {
    let mut filters: Vec<MemberFilter> = Vec::new();
    for (dimension, value) in pairs {
        let key = dimension.reference.to_string();
        match filters.iter_mut().find(|f| f.key() == key) {
            Some(filter) => {
                if !filter.values.contains(&value) {
                    filter.values.push(value);
                }
            }
            None => filters.push(MemberFilter {
                dimension,
                values: vec![value],
            }),
        }
    }
    filters
}

/// Pairs whose dimension and value both occurred earlier
pub fn duplicates(pairs: &[(AttributeNode, Literal)]) -> Vec<(String, Literal)> {
    let mut seen: Vec<(String, &Literal)> = Vec::new();
    let mut out = Vec::new();
    for (dimension, value) in pairs {
        let key = dimension.reference.to_string();
        if seen.iter().any(|(k, v)| *k == key && *v == value) {
            out.push((key, value.clone()));
        } else {
            seen.push((key, value));
        }
    }
    out
}

// Fixed seeds keep restricted ids stable between runs
const ID_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Deterministic id of the measure `base` restricted by `filters`
pub fn restricted_id(base: &str, filters: &[MemberFilter]) -> String {
    let state = RandomState::with_seeds(ID_SEEDS[0], ID_SEEDS[1], ID_SEEDS[2], ID_SEEDS[3]);
    let mut hasher = state.build_hasher();
    base.hash(&mut hasher);
    for filter in filters {
        filter.to_string().hash(&mut hasher);
    }
    format!("RESTRICTED_{}_{:016x}", base, hasher.finish())
}

/// Derive the restricted measure of `RESTRICT(base, filters...)`
pub fn restrict(base: &ExpressionNode, filters: &[ExpressionNode]) -> Option<RestrictedMemberNode> {
    let ExpressionNode::Member(member) = base else {
        return None;
    };
    let mut pairs = Vec::new();
    for filter in filters {
        let flat = flatten(filter);
        if flat.is_empty() {
            return None;
        }
        pairs.extend(flat);
    }
    if pairs.is_empty() {
        return None;
    }
    Some(restricted_member(member.clone(), group(pairs)))
}

pub fn restricted_member(base: MemberNode, filters: Vec<MemberFilter>) -> RestrictedMemberNode {
    RestrictedMemberNode {
        id: restricted_id(base.id(), &filters),
        base,
        filters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use measure_formula_core::{Dimension, FieldReference, Measure};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn attribute(id: &str) -> ExpressionNode {
        ExpressionNode::Attribute(AttributeNode {
            reference: FieldReference::dimension(id),
            dimension: Some(Arc::new(Dimension::new(id))),
        })
    }

    fn eq(dim: &str, value: &str) -> ExpressionNode {
        ExpressionNode::call(
            FunctionKind::Equal,
            vec![attribute(dim), ExpressionNode::string(value)],
        )
    }

    fn sales() -> ExpressionNode {
        ExpressionNode::Member(MemberNode {
            reference: FieldReference::measure("Sales"),
            measure: Some(Arc::new(Measure::new("Sales"))),
        })
    }

    #[test]
    fn test_flatten_and_group() {
        let tree = ExpressionNode::call(
            FunctionKind::And,
            vec![
                ExpressionNode::call(
                    FunctionKind::Or,
                    vec![eq("City", "Paris"), eq("City", "Rome")],
                ),
                eq("Year", "2024"),
            ],
        );
        let pairs = flatten(&tree);
        assert_eq!(pairs.len(), 3);

        let filters = group(pairs);
        let texts: Vec<_> = filters.iter().map(|f| f.to_string()).collect();
        assert_eq!(
            texts,
            vec![r#"[d/City] IN {"Paris", "Rome"}"#, r#"[d/Year] = "2024""#]
        );
        assert!(filters[0].is_multi_select());
    }

    #[test]
    fn test_other_shapes_do_not_flatten() {
        let not_equal = ExpressionNode::call(
            FunctionKind::NotEqual,
            vec![attribute("City"), ExpressionNode::string("Paris")],
        );
        assert!(flatten(&not_equal).is_empty());

        let mixed = ExpressionNode::call(FunctionKind::And, vec![eq("City", "Paris"), not_equal]);
        assert!(flatten(&mixed).is_empty());
        assert!(flatten(&ExpressionNode::boolean(true)).is_empty());
    }

    #[test]
    fn test_duplicates() {
        let tree = ExpressionNode::call(
            FunctionKind::Or,
            vec![eq("City", "Paris"), eq("City", "Paris")],
        );
        let pairs = flatten(&tree);
        assert_eq!(
            duplicates(&pairs),
            vec![("[d/City]".to_string(), Literal::String("Paris".into()))]
        );
        assert_eq!(group(pairs)[0].values.len(), 1);
    }

    #[test]
    fn test_restricted_ids_are_deterministic() {
        let a = restrict(&sales(), &[eq("City", "Paris")]).unwrap();
        let b = restrict(&sales(), &[eq("City", "Paris")]).unwrap();
        let c = restrict(&sales(), &[eq("City", "Rome")]).unwrap();
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert!(a.id.starts_with("RESTRICTED_Sales_"));
        assert_eq!(a.to_string(), r#"RESTRICT([Sales], [d/City] = "Paris")"#);
    }

    #[test]
    fn test_restrict_needs_member_base() {
        assert!(restrict(&ExpressionNode::string("x"), &[eq("City", "Paris")]).is_none());
        assert!(restrict(&sales(), &[ExpressionNode::boolean(true)]).is_none());
    }
}
