//! Function call scanner

use super::{FunctionCallInfo, Token, TokenKind, TokenPayload};
use crate::functions::FormulaRegistry;
use crate::lexer::{Lexeme, LexemeKind};
use measure_formula_core::Backend;
use std::ops::Range;

/// Keywords that may precede `(` without being a call
const OPERATOR_KEYWORDS: [&str; 4] = ["AND", "OR", "NOT", "IN"];

/// Calls and their arguments
///
/// A call is an identifier followed by `(`. Its argument boundaries are the
/// commas at the call's own depth; an unclosed call runs to the end of the
/// text. Argument tokens carry the types the registry accepts at that position.
pub fn scan_functions(
    text: &str,
    lexemes: &[Lexeme],
    dimensions: &[Token],
    registry: &FormulaRegistry,
    backend: Backend,
) -> Vec<Token> {
    let mut tokens = Vec::new();
    for (i, name) in lexemes.iter().enumerate() {
        if name.kind != LexemeKind::Identifier
            || OPERATOR_KEYWORDS.iter().any(|k| name.is_keyword(text, k))
        {
            continue;
        }
        match lexemes.get(i + 1) {
            Some(paren) if paren.kind == LexemeKind::LeftParen => {}
            _ => continue,
        }

        let call = walk_call(text, &lexemes[i + 1..]);
        let span = name.span.start..call.end;
        let name_text = name.text(text).to_uppercase();
        let item = registry.resolve(&name_text, backend).ok();

        let arguments: Vec<Token> = call
            .arguments
            .iter()
            .enumerate()
            .map(|(position, range)| {
                let types = item
                    .and_then(|item| item.contract(position))
                    .map(|contract| contract.types.to_vec())
                    .unwrap_or_default();
                Token::new(TokenKind::Argument, text, trim(text, range.clone()))
                    .with_types(types)
                    .with_interaction_span(range.clone())
            })
            .collect();

        let nested = dimensions
            .iter()
            .filter(|d| span.start <= d.span.start && d.span.end <= span.end)
            .cloned()
            .collect();

        tokens.push(
            Token::new(TokenKind::Function, text, span).with_payload(TokenPayload::FunctionCall(
                FunctionCallInfo {
                    name: name_text,
                    arguments: call.arguments,
                    dimensions: nested,
                    closed: call.closed,
                },
            )),
        );
        tokens.extend(arguments);
    }
    tokens
}

struct CallShape {
    arguments: Vec<Range<usize>>,
    /// End of the closing `)`, or of the text
    end: usize,
    closed: bool,
}

/// Walk from the opening parenthesis to its match
fn walk_call(text: &str, lexemes: &[Lexeme]) -> CallShape {
    let mut arguments = Vec::new();
    let mut depth = 0usize;
    let mut start = lexemes.first().map_or(text.len(), |l| l.span.end);

    for lexeme in lexemes {
        match lexeme.kind {
            LexemeKind::LeftParen | LexemeKind::LeftBrace => depth += 1,
            LexemeKind::RightParen | LexemeKind::RightBrace => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    push_argument(text, &mut arguments, start..lexeme.span.start);
                    return CallShape {
                        arguments,
                        end: lexeme.span.end,
                        closed: true,
                    };
                }
            }
            LexemeKind::Comma if depth == 1 => {
                arguments.push(start..lexeme.span.start);
                start = lexeme.span.end;
            }
            _ => {}
        }
    }

    push_argument(text, &mut arguments, start..text.len());
    CallShape {
        arguments,
        end: text.len(),
        closed: false,
    }
}

/// The last argument; `f()` has none
fn push_argument(text: &str, arguments: &mut Vec<Range<usize>>, range: Range<usize>) {
    if arguments.is_empty() && text[range.clone()].trim().is_empty() {
        return;
    }
    arguments.push(range);
}

fn trim(text: &str, range: Range<usize>) -> Range<usize> {
    let slice = &text[range.clone()];
    let start = range.start + (slice.len() - slice.trim_start().len());
    let end = range.end - (slice.len() - slice.trim_end().len());
    if start >= end {
        start..start
    } else {
        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::scanner::scan_dimensions;
    use measure_formula_core::{DataType, FeatureFlags};
    use pretty_assertions::assert_eq;

    fn scan(text: &str) -> Vec<Token> {
        let registry = FormulaRegistry::new(&FeatureFlags::default());
        let lexemes = lex(text);
        let dimensions = scan_dimensions(text, &lexemes);
        scan_functions(text, &lexemes, &dimensions, &registry, Backend::Hana)
    }

    #[test]
    fn test_top_level_commas_only() {
        let text = r#"ROUND(MAX(1, 2), 3)"#;
        let tokens = scan(text);
        let round = tokens[0].function_call().unwrap();
        assert_eq!(round.name, "ROUND");
        assert!(round.closed);
        assert_eq!(round.arguments, vec![6..15, 16..18]);

        let arguments: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Argument)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(arguments, vec!["MAX(1, 2)", "3", "1", "2"]);
    }

    #[test]
    fn test_commas_in_strings_and_lists() {
        let text = r#"CONCAT("a,b", [d/"x,y":City]) + SUBTOTAL([Sales], {1, 2})"#;
        let tokens = scan(text);
        let calls: Vec<_> = tokens.iter().filter_map(Token::function_call).collect();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].arguments.len(), 2);
        assert_eq!(calls[1].arguments.len(), 2);
        assert_eq!(calls[0].dimensions.len(), 1);
    }

    #[test]
    fn test_argument_types_from_contracts() {
        let tokens = scan("SQRT(");
        assert_eq!(tokens.len(), 1);
        assert!(!tokens[0].function_call().unwrap().closed);
        assert!(tokens[0].function_call().unwrap().arguments.is_empty());

        let tokens = scan("RESTRICT([Sales], ");
        let arguments: Vec<_> = tokens.iter().filter(|t| t.kind == TokenKind::Argument).collect();
        assert_eq!(arguments.len(), 2);
        assert!(arguments[0].data_types.contains(&DataType::Measure));
        assert!(arguments[1].data_types.contains(&DataType::DimensionFilter));
        assert_eq!(arguments[1].span, 18..18);
    }

    #[test]
    fn test_operator_keywords_are_not_calls() {
        assert!(scan("NOT ([Sales] > 1)").is_empty());
        assert_eq!(scan("FOO(1)")[0].function_call().unwrap().name, "FOO");
    }
}
