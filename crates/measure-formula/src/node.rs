//! Typed expression tree
//!
//! Nodes are built by the [`TreeBuilder`](crate::builder::TreeBuilder) from the
//! parse trace. Return types are derived from the node and its children and
//! are never stored, so a rewritten tree can't carry a stale type.

use crate::filter::MemberFilter;
use crate::functions::{FormulaBehavior, FunctionKind, Notation, ATOM_PRECEDENCE};
use crate::lexer;
use measure_formula_core::{DataType, Dimension, FieldReference, Measure};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

/// Constant value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Number(Decimal),
    String(String),
    Boolean(bool),
    Null,
}

impl Literal {
    pub fn data_type(&self) -> DataType {
        match self {
            Literal::Number(_) => DataType::Number,
            Literal::String(_) => DataType::String,
            Literal::Boolean(_) => DataType::Boolean,
            Literal::Null => DataType::Unknown,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Literal::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The value as member-key text; `None` for `NULL`
    pub fn value_text(&self) -> Option<String> {
        match self {
            Literal::Number(n) => Some(n.normalize().to_string()),
            Literal::String(s) => Some(s.clone()),
            Literal::Boolean(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Literal::Null => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n.normalize()),
            Literal::String(s) => f.write_str(&lexer::quote(s)),
            Literal::Boolean(true) => f.write_str("TRUE"),
            Literal::Boolean(false) => f.write_str("FALSE"),
            Literal::Null => f.write_str("NULL"),
        }
    }
}

/// Type of a list from the types of its elements
pub fn list_type(elements: impl IntoIterator<Item = DataType>) -> DataType {
    let mut strings = false;
    let mut numbers = false;
    let mut other = false;
    for ty in elements {
        if ty == DataType::Unknown {
            continue;
        } else if ty.is_string() {
            strings = true;
        } else if ty.is_numeric() {
            numbers = true;
        } else {
            other = true;
        }
    }
    match (strings, numbers, other) {
        (false, false, false) => DataType::List,
        (true, false, false) => DataType::ListOfString,
        (false, true, false) => DataType::ListOfNumber,
        _ => DataType::ListOfMixed,
    }
}

/// Reference to a dimension, optionally with a property or hierarchy suffix
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeNode {
    pub reference: FieldReference,
    /// `None` when the reference did not resolve
    pub dimension: Option<Arc<Dimension>>,
}

impl AttributeNode {
    pub fn return_type(&self) -> DataType {
        match &self.dimension {
            None => DataType::Unknown,
            Some(_) if self.reference.property().is_some() => DataType::Attribute,
            Some(d) => d.data_type(),
        }
    }

    /// Resolved dimension id, falling back to the written id
    pub fn dimension_id(&self) -> &str {
        self.dimension
            .as_deref()
            .map_or(self.reference.id.as_str(), |d| d.id.as_str())
    }

    pub fn is_date_like(&self) -> bool {
        self.dimension.as_deref().map_or(false, |d| d.date_like)
    }

    pub fn is_version(&self) -> bool {
        self.dimension.as_deref().map_or(false, |d| d.version)
    }

    pub fn hierarchy(&self) -> Option<&str> {
        self.reference.hierarchy()
    }
}

/// Reference to a measure
#[derive(Debug, Clone, PartialEq)]
pub struct MemberNode {
    pub reference: FieldReference,
    /// `None` when the reference did not resolve
    pub measure: Option<Arc<Measure>>,
}

impl MemberNode {
    pub fn return_type(&self) -> DataType {
        match &self.measure {
            None => DataType::Unknown,
            Some(m) if m.value_type.is_numeric() => DataType::Measure,
            Some(m) => m.value_type,
        }
    }

    /// Resolved measure id, falling back to the written id
    pub fn id(&self) -> &str {
        self.measure
            .as_deref()
            .map_or(self.reference.id.as_str(), |m| m.id.as_str())
    }
}

/// Call of a registry item
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    pub kind: FunctionKind,
    pub args: Vec<ExpressionNode>,
}

impl FunctionNode {
    pub fn return_type(&self) -> DataType {
        self.kind.infer_return_type(&self.args)
    }
}

/// Measure restricted by member filters; produced by lowering `RESTRICT`
#[derive(Debug, Clone, PartialEq)]
pub struct RestrictedMemberNode {
    /// Deterministic id of the derived measure
    pub id: String,
    pub base: MemberNode,
    /// One filter per dimension, in first-seen order
    pub filters: Vec<MemberFilter>,
}

/// Node of the typed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionNode {
    Constant(Literal),
    /// List whose elements are all constants
    ListConstant(Vec<Literal>),
    Attribute(AttributeNode),
    Member(MemberNode),
    Function(FunctionNode),
    /// List with at least one non-constant element
    Array(Vec<ExpressionNode>),
    RestrictedMember(RestrictedMemberNode),
}

impl ExpressionNode {
    pub fn number(value: Decimal) -> Self {
        ExpressionNode::Constant(Literal::Number(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        ExpressionNode::Constant(Literal::String(value.into()))
    }

    pub fn boolean(value: bool) -> Self {
        ExpressionNode::Constant(Literal::Boolean(value))
    }

    pub fn null() -> Self {
        ExpressionNode::Constant(Literal::Null)
    }

    pub fn call(kind: FunctionKind, args: Vec<ExpressionNode>) -> Self {
        ExpressionNode::Function(FunctionNode { kind, args })
    }

    /// `ListConstant` when every element is a constant, else `Array`
    pub fn list(items: Vec<ExpressionNode>) -> Self {
        if items.iter().all(|i| matches!(i, ExpressionNode::Constant(_))) {
            ExpressionNode::ListConstant(
                items
                    .into_iter()
                    .filter_map(|i| match i {
                        ExpressionNode::Constant(literal) => Some(literal),
                        _ => None,
                    })
                    .collect(),
            )
        } else {
            ExpressionNode::Array(items)
        }
    }

    /// Derived return type
    pub fn return_type(&self) -> DataType {
        match self {
            ExpressionNode::Constant(literal) => literal.data_type(),
            ExpressionNode::ListConstant(items) => list_type(items.iter().map(Literal::data_type)),
            ExpressionNode::Attribute(attribute) => attribute.return_type(),
            ExpressionNode::Member(member) => member.return_type(),
            ExpressionNode::Function(function) => function.return_type(),
            ExpressionNode::Array(items) => list_type(items.iter().map(ExpressionNode::return_type)),
            ExpressionNode::RestrictedMember(_) => DataType::Measure,
        }
    }

    /// Text of a constant; `None` for non-constants and `NULL`
    pub fn constant_value(&self) -> Option<String> {
        match self {
            ExpressionNode::Constant(literal) => literal.value_text(),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            ExpressionNode::Constant(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        self.as_literal().and_then(Literal::as_number)
    }

    pub fn as_function(&self) -> Option<&FunctionNode> {
        match self {
            ExpressionNode::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_attribute(&self) -> Option<&AttributeNode> {
        match self {
            ExpressionNode::Attribute(attribute) => Some(attribute),
            _ => None,
        }
    }

    /// Constant or constant list
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            ExpressionNode::Constant(_) | ExpressionNode::ListConstant(_)
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ExpressionNode::Constant(Literal::Null))
    }

    pub fn children(&self) -> &[ExpressionNode] {
        match self {
            ExpressionNode::Function(function) => &function.args,
            ExpressionNode::Array(items) => items,
            _ => &[],
        }
    }

    /// Pre-order walk
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ExpressionNode)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Measures referenced anywhere in the tree, including restricted bases
    pub fn member_references(&self) -> Vec<&MemberNode> {
        let mut out = Vec::new();
        self.walk(&mut |node| match node {
            ExpressionNode::Member(member) => out.push(member),
            ExpressionNode::RestrictedMember(restricted) => out.push(&restricted.base),
            _ => {}
        });
        out
    }

    /// Binding strength used to decide where parentheses go
    fn precedence(&self) -> u8 {
        match self {
            ExpressionNode::Function(function) => function.kind.precedence(),
            ExpressionNode::Constant(Literal::Number(n)) if n.is_sign_negative() && !n.is_zero() => {
                FunctionKind::Negate.precedence()
            }
            _ => ATOM_PRECEDENCE,
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    f.write_str("{")?;
    write_separated(f, items)?;
    f.write_str("}")
}

fn write_separated<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_operand(
    f: &mut fmt::Formatter<'_>,
    operand: &ExpressionNode,
    parenthesize: bool,
) -> fmt::Result {
    if parenthesize {
        write!(f, "({})", operand)
    } else {
        write!(f, "{}", operand)
    }
}

impl fmt::Display for FunctionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind.notation(), self.args.as_slice()) {
            (
                Notation::Infix {
                    symbol,
                    precedence,
                    right_assoc,
                },
                [left, right],
            ) => {
                let left_parens = left.precedence() < precedence
                    || (left.precedence() == precedence && right_assoc);
                let right_parens = right.precedence() < precedence
                    || (right.precedence() == precedence && !right_assoc);
                write_operand(f, left, left_parens)?;
                write!(f, " {} ", symbol)?;
                write_operand(f, right, right_parens)
            }
            (Notation::Prefix { symbol, precedence }, [operand]) => {
                f.write_str(symbol)?;
                write_operand(f, operand, operand.precedence() < precedence)
            }
            // Variadic AND/OR and anything else fall back to call syntax
            _ => {
                write!(f, "{}(", self.kind.name())?;
                write_separated(f, &self.args)?;
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for RestrictedMemberNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RESTRICT({}", self.base.reference)?;
        for filter in &self.filters {
            write!(f, ", {}", filter)?;
        }
        f.write_str(")")
    }
}

/// Canonical formula text
impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionNode::Constant(literal) => write!(f, "{}", literal),
            ExpressionNode::ListConstant(items) => write_list(f, items),
            ExpressionNode::Attribute(attribute) => write!(f, "{}", attribute.reference),
            ExpressionNode::Member(member) => write!(f, "{}", member.reference),
            ExpressionNode::Function(function) => write!(f, "{}", function),
            ExpressionNode::Array(items) => write_list(f, items),
            ExpressionNode::RestrictedMember(restricted) => write!(f, "{}", restricted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn num(n: i64) -> ExpressionNode {
        ExpressionNode::number(Decimal::from(n))
    }

    fn sales() -> ExpressionNode {
        ExpressionNode::Member(MemberNode {
            reference: FieldReference::measure("Sales"),
            measure: Some(Arc::new(Measure::new("Sales"))),
        })
    }

    #[test]
    fn test_literal_display() {
        assert_eq!(Literal::Number(Decimal::new(1500, 3)).to_string(), "1.5");
        assert_eq!(Literal::String("a\"b".into()).to_string(), "\"a\"\"b\"");
        assert_eq!(Literal::Boolean(true).to_string(), "TRUE");
        assert_eq!(Literal::Null.to_string(), "NULL");
        assert_eq!(Literal::Null.value_text(), None);
    }

    #[test]
    fn test_list_types() {
        assert_eq!(list_type([]), DataType::List);
        assert_eq!(
            list_type([DataType::String, DataType::Attribute]),
            DataType::ListOfString
        );
        assert_eq!(
            list_type([DataType::Integer, DataType::Unknown]),
            DataType::ListOfNumber
        );
        assert_eq!(
            list_type([DataType::Number, DataType::String]),
            DataType::ListOfMixed
        );
    }

    #[test]
    fn test_parentheses_follow_precedence() {
        let sum = ExpressionNode::call(FunctionKind::Add, vec![num(1), num(2)]);
        let product = ExpressionNode::call(FunctionKind::Multiply, vec![sum.clone(), num(3)]);
        assert_eq!(product.to_string(), "(1 + 2) * 3");

        let nested = ExpressionNode::call(FunctionKind::Subtract, vec![num(1), sum]);
        assert_eq!(nested.to_string(), "1 - (1 + 2)");

        let power = ExpressionNode::call(
            FunctionKind::Power,
            vec![
                num(2),
                ExpressionNode::call(FunctionKind::Power, vec![num(3), num(2)]),
            ],
        );
        assert_eq!(power.to_string(), "2 ^ 3 ^ 2");

        let negated = ExpressionNode::call(FunctionKind::Negate, vec![power]);
        assert_eq!(negated.to_string(), "-(2 ^ 3 ^ 2)");
    }

    #[test]
    fn test_member_return_type() {
        assert_eq!(sales().return_type(), DataType::Measure);
        let unresolved = ExpressionNode::Member(MemberNode {
            reference: FieldReference::measure("Nope"),
            measure: None,
        });
        assert_eq!(unresolved.return_type(), DataType::Unknown);
        let text = ExpressionNode::Member(MemberNode {
            reference: FieldReference::measure("Label"),
            measure: Some(Arc::new(
                Measure::new("Label").with_value_type(DataType::String),
            )),
        });
        assert_eq!(text.return_type(), DataType::String);
    }

    #[test]
    fn test_calls_and_membership_display() {
        let call = ExpressionNode::call(FunctionKind::Abs, vec![sales()]);
        assert_eq!(call.to_string(), "ABS([Sales])");

        let city = ExpressionNode::Attribute(AttributeNode {
            reference: FieldReference::dimension("City"),
            dimension: Some(Arc::new(Dimension::new("City"))),
        });
        let in_list = ExpressionNode::call(
            FunctionKind::NotIn,
            vec![
                city,
                ExpressionNode::ListConstant(vec![
                    Literal::String("Paris".into()),
                    Literal::String("Rome".into()),
                ]),
            ],
        );
        assert_eq!(in_list.to_string(), r#"[d/City] NOT IN {"Paris", "Rome"}"#);
        assert_eq!(in_list.return_type(), DataType::DimensionFilter);
    }
}
