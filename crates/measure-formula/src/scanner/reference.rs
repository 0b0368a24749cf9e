//! Field reference scanners

use super::{lexeme_index, MemberFilterInfo, Token, TokenKind, TokenPayload};
use crate::lexer::{Lexeme, LexemeKind};
use measure_formula_core::{field, DataType, FieldKind, FieldReference};

/// Fields of one head kind, parsed
fn fields<'a>(
    text: &'a str,
    lexemes: &'a [Lexeme],
    kind: FieldKind,
) -> impl Iterator<Item = (&'a Lexeme, FieldReference)> + 'a {
    lexemes
        .iter()
        .filter(|l| l.kind == LexemeKind::Field)
        .filter_map(move |l| {
            let reference = FieldReference::parse(l.text(text))?;
            (reference.kind == kind).then_some((l, reference))
        })
}

/// Dimension references with any member filter written after them
pub fn scan_dimensions(text: &str, lexemes: &[Lexeme]) -> Vec<Token> {
    fields(text, lexemes, FieldKind::Dimension)
        .map(|(lexeme, reference)| {
            let data_type = if reference.property().is_some() {
                DataType::Attribute
            } else {
                DataType::Dimension
            };
            let next = lexeme_index(lexemes, lexeme.span.end);
            let filter = member_filter(text, &lexemes[next..]);

            let mut info = MemberFilterInfo {
                dimension: reference.id.clone(),
                hierarchy: reference.hierarchy().map(str::to_string),
                operator: None,
                exclude: false,
                multi_select: false,
                members: None,
            };
            let mut end = lexeme.span.end;
            if let Some(filter) = filter {
                info.exclude = matches!(filter.operator.as_str(), "!=" | "<>" | "NOT IN");
                info.multi_select = filter.operator.ends_with("IN");
                info.operator = Some(filter.operator);
                info.members = filter.members;
                end = filter.end;
            }

            Token::new(TokenKind::Dimension, text, lexeme.span.clone())
                .with_types(vec![data_type])
                .with_interaction_span(lexeme.span.start..end)
                .with_payload(TokenPayload::MemberFilter(info))
        })
        .collect()
}

struct FilterTail {
    operator: String,
    members: Option<String>,
    end: usize,
}

/// Comparison operator and member literal(s) at the start of `lexemes`
fn member_filter(text: &str, lexemes: &[Lexeme]) -> Option<FilterTail> {
    let first = lexemes.first()?;
    let (operator, consumed) = match first.kind {
        LexemeKind::Equal
        | LexemeKind::NotEqual
        | LexemeKind::Less
        | LexemeKind::LessEqual
        | LexemeKind::Greater
        | LexemeKind::GreaterEqual => (first.text(text).to_string(), 1),
        LexemeKind::Identifier if first.is_keyword(text, "IN") => ("IN".to_string(), 1),
        LexemeKind::Identifier
            if first.is_keyword(text, "NOT")
                && lexemes.get(1).map_or(false, |l| l.is_keyword(text, "IN")) =>
        {
            ("NOT IN".to_string(), 2)
        }
        _ => return None,
    };
    let operator_end = lexemes[consumed - 1].span.end;

    let rest = &lexemes[consumed..];
    let members = match rest.first() {
        Some(l)
            if matches!(l.kind, LexemeKind::String | LexemeKind::Number)
                || ["TRUE", "FALSE", "NULL"].iter().any(|k| l.is_keyword(text, k)) =>
        {
            Some(l.span.clone())
        }
        Some(l) if l.kind == LexemeKind::LeftBrace => {
            let mut depth = 0usize;
            let mut end = text.len();
            for lexeme in rest {
                match lexeme.kind {
                    LexemeKind::LeftBrace => depth += 1,
                    LexemeKind::RightBrace => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            end = lexeme.span.end;
                            break;
                        }
                    }
                    _ => {}
                }
            }
            Some(l.span.start..end)
        }
        _ => None,
    };

    Some(FilterTail {
        operator,
        end: members.as_ref().map_or(operator_end, |m| m.end),
        members: members.map(|m| text[m].to_string()),
    })
}

/// Measure references
pub fn scan_measures(text: &str, lexemes: &[Lexeme]) -> Vec<Token> {
    fields(text, lexemes, FieldKind::Measure)
        .map(|(lexeme, _)| {
            Token::new(TokenKind::Measure, text, lexeme.span.clone()).with_types(vec![DataType::Measure])
        })
        .collect()
}

/// Every bracketed span, well-formed or not
pub fn scan_generic(text: &str) -> Vec<Token> {
    field::references(text)
        .into_iter()
        .map(|(span, _)| Token::new(TokenKind::Generic, text, span))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use pretty_assertions::assert_eq;

    fn dimensions(text: &str) -> Vec<Token> {
        scan_dimensions(text, &lex(text))
    }

    #[test]
    fn test_plain_dimension() {
        let tokens = dimensions("SUBTOTAL([Sales], [d/City].[h/Geo])");
        assert_eq!(tokens.len(), 1);
        let token = &tokens[0];
        assert_eq!(token.text, "[d/City].[h/Geo]");
        assert_eq!(token.span, token.interaction_span);
        let info = token.member_filter().unwrap();
        assert_eq!(info.dimension, "City");
        assert_eq!(info.hierarchy.as_deref(), Some("Geo"));
        assert_eq!(info.operator, None);
    }

    #[test]
    fn test_dimension_with_member_filter() {
        let text = r#"RESTRICT([Sales], [d/City] = "Paris")"#;
        let token = dimensions(text).remove(0);
        assert_eq!(token.span, 18..26);
        assert_eq!(&text[token.interaction_span.clone()], r#"[d/City] = "Paris""#);
        let info = token.member_filter().unwrap();
        assert_eq!(info.operator.as_deref(), Some("="));
        assert_eq!(info.members.as_deref(), Some(r#""Paris""#));
        assert!(!info.exclude);
        assert!(!info.multi_select);
    }

    #[test]
    fn test_excluding_multi_select() {
        let text = r#"[d/City] not in {"A", "B"} AND [d/Year] <> 2020"#;
        let tokens = dimensions(text);
        let city = tokens[0].member_filter().unwrap();
        assert_eq!(city.operator.as_deref(), Some("NOT IN"));
        assert_eq!(city.members.as_deref(), Some(r#"{"A", "B"}"#));
        assert!(city.exclude);
        assert!(city.multi_select);

        let year = tokens[1].member_filter().unwrap();
        assert!(year.exclude);
        assert!(!year.multi_select);
        assert_eq!(year.members.as_deref(), Some("2020"));
    }

    #[test]
    fn test_half_typed_filter() {
        let text = r#"[d/City] IN {"A", "#;
        let token = dimensions(text).remove(0);
        assert_eq!(token.interaction_span, 0..text.len());
        assert_eq!(token.member_filter().unwrap().members.as_deref(), Some(r#"{"A", "#));

        let text = "[d/City] = ";
        let token = dimensions(text).remove(0);
        assert_eq!(token.interaction_span, 0..10);
    }

    #[test]
    fn test_measures_and_generic() {
        let text = "[Sales] + [d/City] + [d/]";
        let lexemes = lex(text);
        let measures: Vec<_> = scan_measures(text, &lexemes)
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(measures, vec!["[Sales]"]);
        let generic: Vec<_> = scan_generic(text).into_iter().map(|t| t.text).collect();
        assert_eq!(generic, vec!["[Sales]", "[d/City]", "[d/]"]);
    }
}
