//! Number literal scanner

use super::{Token, TokenKind};
use crate::lexer::{Lexeme, LexemeKind};
use measure_formula_core::DataType;

/// Number literals; integers match both `Integer` and `Number`
pub fn scan_numbers(text: &str, lexemes: &[Lexeme]) -> Vec<Token> {
    lexemes
        .iter()
        .filter(|l| l.kind == LexemeKind::Number)
        .map(|l| {
            let literal = l.text(text);
            let types = if literal.bytes().all(|b| b.is_ascii_digit()) {
                vec![DataType::Integer, DataType::Number]
            } else {
                vec![DataType::Number]
            };
            Token::new(TokenKind::Number, text, l.span.clone()).with_types(types)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scan_numbers() {
        let text = "12 + .5 * 2e3 - [d/2020]";
        let tokens = scan_numbers(text, &lex(text));
        let found: Vec<_> = tokens
            .iter()
            .map(|t| (t.text.as_str(), t.data_types.len()))
            .collect();
        assert_eq!(found, vec![("12", 2), (".5", 1), ("2e3", 1)]);
    }
}
