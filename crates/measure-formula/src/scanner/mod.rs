//! Token scanners for editor integration
//!
//! Each scanner works independently over raw canonical text and tolerates
//! half-typed input. Tokens carry two spans: the syntactic span of the matched
//! text and an interaction span, which may be wider (a dimension token covers
//! its comparison and member list, an argument token covers the whitespace up
//! to its separators).

mod function;
mod number;
mod reference;

pub use function::scan_functions;
pub use number::scan_numbers;
pub use reference::{scan_dimensions, scan_generic, scan_measures};

use crate::functions::FormulaRegistry;
use crate::lexer::{self, Lexeme};
use measure_formula_core::{Backend, DataType};
use std::cmp::Reverse;
use std::ops::Range;

/// Scanner that produced a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenKind {
    Dimension,
    Measure,
    Number,
    Function,
    Argument,
    Generic,
}

impl TokenKind {
    /// Tie-break order for position lookups: leaves before containers
    fn rank(self) -> u8 {
        match self {
            TokenKind::Dimension | TokenKind::Measure | TokenKind::Number => 0,
            TokenKind::Generic => 1,
            TokenKind::Argument => 2,
            TokenKind::Function => 3,
        }
    }
}

/// Member filter written next to a dimension reference, e.g. `[d/City] IN {"A", "B"}`
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemberFilterInfo {
    pub dimension: String,
    pub hierarchy: Option<String>,
    /// Comparison operator as written, `NOT IN` normalised to one space
    pub operator: Option<String>,
    /// `!=`, `<>` and `NOT IN` exclude the listed members
    pub exclude: bool,
    pub multi_select: bool,
    /// Raw text of the member literal or list
    pub members: Option<String>,
}

/// Call structure found by the function scanner
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionCallInfo {
    pub name: String,
    /// Byte ranges between the parentheses and top-level commas
    pub arguments: Vec<Range<usize>>,
    /// Dimension tokens anywhere inside the call
    pub dimensions: Vec<Token>,
    /// Whether the matching `)` was found
    pub closed: bool,
}

/// Scanner-specific data attached to a token
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenPayload {
    MemberFilter(MemberFilterInfo),
    FunctionCall(FunctionCallInfo),
}

/// A classified span of formula text
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    pub kind: TokenKind,
    /// Types the span matches; argument tokens carry the accepted types
    pub data_types: Vec<DataType>,
    pub text: String,
    pub span: Range<usize>,
    pub interaction_span: Range<usize>,
    pub payload: Option<TokenPayload>,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, source: &str, span: Range<usize>) -> Self {
        Self {
            kind,
            data_types: Vec::new(),
            text: source[span.clone()].to_string(),
            interaction_span: span.clone(),
            span,
            payload: None,
        }
    }

    pub(crate) fn with_types(mut self, data_types: Vec<DataType>) -> Self {
        self.data_types = data_types;
        self
    }

    pub(crate) fn with_interaction_span(mut self, span: Range<usize>) -> Self {
        self.interaction_span = span;
        self
    }

    pub(crate) fn with_payload(mut self, payload: TokenPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn member_filter(&self) -> Option<&MemberFilterInfo> {
        match &self.payload {
            Some(TokenPayload::MemberFilter(info)) => Some(info),
            _ => None,
        }
    }

    pub fn function_call(&self) -> Option<&FunctionCallInfo> {
        match &self.payload {
            Some(TokenPayload::FunctionCall(info)) => Some(info),
            _ => None,
        }
    }

    /// Position lies inside the interaction span, both ends included
    pub fn touches(&self, position: usize) -> bool {
        self.interaction_span.start <= position && position <= self.interaction_span.end
    }
}

/// Which neighbour wins when a position sits between two tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// The token ending at the position
    #[default]
    Backward,
    /// The token starting at the position
    Forward,
}

/// Run every scanner over canonical text
///
/// Tokens are ordered by start offset, outer tokens before the tokens they
/// contain.
pub fn tokenize(text: &str, registry: &FormulaRegistry, backend: Backend) -> Vec<Token> {
    let lexemes = lexer::lex(text);
    let dimensions = scan_dimensions(text, &lexemes);

    let mut tokens = Vec::new();
    tokens.extend(scan_functions(text, &lexemes, &dimensions, registry, backend));
    tokens.extend(dimensions);
    tokens.extend(scan_measures(text, &lexemes));
    tokens.extend(scan_numbers(text, &lexemes));
    tokens.extend(scan_generic(text));
    tokens.sort_by_key(|t| (t.span.start, Reverse(t.span.end), Reverse(t.kind.rank())));
    tracing::trace!(count = tokens.len(), "tokenized formula");
    tokens
}

/// Token under a cursor position
///
/// When the position is the end of one token and the start of another,
/// `direction` decides. Otherwise the most specific token wins: references and
/// numbers before generic brackets, then the shortest argument, then the
/// innermost function.
pub fn token_at(tokens: &[Token], position: usize, direction: Direction) -> Option<&Token> {
    let mut candidates: Vec<&Token> = tokens.iter().filter(|t| t.touches(position)).collect();
    if candidates.len() <= 1 {
        return candidates.pop();
    }

    let ending = candidates
        .iter()
        .any(|t| t.interaction_span.end == position && t.interaction_span.start < position);
    let starting = candidates
        .iter()
        .any(|t| t.interaction_span.start == position && t.interaction_span.end > position);
    if ending && starting {
        candidates.retain(|t| match direction {
            Direction::Backward => t.interaction_span.end == position,
            Direction::Forward => t.interaction_span.start == position,
        });
    }

    candidates.into_iter().min_by_key(|t| {
        (
            t.kind.rank(),
            t.interaction_span.end - t.interaction_span.start,
        )
    })
}

/// Index of the first lexeme at or after `offset`
pub(crate) fn lexeme_index(lexemes: &[Lexeme], offset: usize) -> usize {
    lexemes.partition_point(|l| l.span.start < offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use measure_formula_core::FeatureFlags;
    use pretty_assertions::assert_eq;

    fn tokens(text: &str) -> Vec<Token> {
        let registry = FormulaRegistry::new(&FeatureFlags::default());
        tokenize(text, &registry, Backend::Hana)
    }

    fn kinds(tokens: &[Token]) -> Vec<(TokenKind, &str)> {
        tokens.iter().map(|t| (t.kind, t.text.as_str())).collect()
    }

    #[test]
    fn test_tokenize_orders_outer_first() {
        let text = "ROUND([Sales] * 1.5, 2)";
        let tokens = tokens(text);
        assert_eq!(
            kinds(&tokens),
            vec![
                (TokenKind::Function, "ROUND([Sales] * 1.5, 2)"),
                (TokenKind::Argument, "[Sales] * 1.5"),
                (TokenKind::Generic, "[Sales]"),
                (TokenKind::Measure, "[Sales]"),
                (TokenKind::Number, "1.5"),
                (TokenKind::Argument, "2"),
                (TokenKind::Number, "2"),
            ]
        );
    }

    #[test]
    fn test_token_at_prefers_leaves() {
        let text = "ROUND([Sales] * 1.5, 2)";
        let tokens = tokens(text);
        assert_eq!(token_at(&tokens, 8, Direction::Backward).unwrap().kind, TokenKind::Measure);
        assert_eq!(token_at(&tokens, 15, Direction::Backward).unwrap().kind, TokenKind::Argument);
        assert_eq!(token_at(&tokens, 2, Direction::Backward).unwrap().kind, TokenKind::Function);
    }

    #[test]
    fn test_token_at_boundary_direction() {
        // Half-typed text with two adjacent fields
        let text = "[Sales][Cost]";
        let tokens = tokens(text);
        let before = token_at(&tokens, 7, Direction::Backward).unwrap();
        let after = token_at(&tokens, 7, Direction::Forward).unwrap();
        assert_eq!(before.text, "[Sales]");
        assert_eq!(after.text, "[Cost]");
        assert!(token_at(&tokens, 20, Direction::Forward).is_none());
    }

    #[test]
    fn test_nested_call_argument() {
        let text = "ABS(ROUND(1))";
        let tokens = tokens(text);
        let token = token_at(&tokens, 5, Direction::Backward).unwrap();
        assert_eq!(token.kind, TokenKind::Argument);
        assert_eq!(token.text, "ROUND(1)");

        let functions: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Function && t.touches(5))
            .collect();
        assert_eq!(functions.len(), 2);
    }
}
