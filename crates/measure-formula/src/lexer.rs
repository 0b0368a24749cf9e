//! Character-class lexer over canonical formula text
//!
//! The lexer never fails: malformed input produces [`LexemeKind::Unterminated`]
//! or [`LexemeKind::Unexpected`] lexemes so that editor-facing scanners can work
//! on half-typed text. The parser turns those into parse errors.

use measure_formula_core::field;
use std::ops::Range;

/// Lexeme classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexemeKind {
    Number,
    String,
    /// Bracketed field reference, including an optional `.[..]` suffix
    Field,
    Identifier,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Comma,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    /// String or bracket without its closing delimiter; runs to end of input
    Unterminated,
    Unexpected,
}

/// A classified span of the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    pub kind: LexemeKind,
    pub span: Range<usize>,
}

impl Lexeme {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.clone()]
    }

    /// Keyword check for identifiers (`AND`, `NOT`, `TRUE`...), case-insensitive
    pub fn is_keyword(&self, source: &str, keyword: &str) -> bool {
        self.kind == LexemeKind::Identifier && self.text(source).eq_ignore_ascii_case(keyword)
    }
}

/// Split formula text into lexemes, skipping whitespace
pub fn lex(text: &str) -> Vec<Lexeme> {
    let mut lexer = Lexer { text, pos: 0 };
    let mut out = Vec::new();
    while let Some(lexeme) = lexer.next_lexeme() {
        out.push(lexeme);
    }
    out
}

/// Decode the body of a string literal lexeme (`"a""b"` → `a"b`)
pub fn unquote(literal: &str) -> String {
    let body = literal.strip_prefix('"').unwrap_or(literal);
    let body = body.strip_suffix('"').unwrap_or(body);
    body.replace("\"\"", "\"")
}

/// Encode text as a string literal
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

struct Lexer<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.text[self.pos..].chars().nth(offset)
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().map_or(false, &pred) {
            self.bump();
        }
    }

    fn next_lexeme(&mut self) -> Option<Lexeme> {
        self.eat_while(char::is_whitespace);
        let start = self.pos;
        let c = self.peek()?;

        let kind = match c {
            '+' => self.single(LexemeKind::Plus),
            '-' => self.single(LexemeKind::Minus),
            '*' => self.single(LexemeKind::Star),
            '/' => self.single(LexemeKind::Slash),
            '^' => self.single(LexemeKind::Caret),
            '=' => self.single(LexemeKind::Equal),
            ',' => self.single(LexemeKind::Comma),
            '(' => self.single(LexemeKind::LeftParen),
            ')' => self.single(LexemeKind::RightParen),
            '{' => self.single(LexemeKind::LeftBrace),
            '}' => self.single(LexemeKind::RightBrace),
            '<' => {
                self.bump();
                match self.peek() {
                    Some('=') => self.single(LexemeKind::LessEqual),
                    Some('>') => self.single(LexemeKind::NotEqual),
                    _ => LexemeKind::Less,
                }
            }
            '>' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.single(LexemeKind::GreaterEqual)
                } else {
                    LexemeKind::Greater
                }
            }
            '!' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.single(LexemeKind::NotEqual)
                } else {
                    LexemeKind::Unexpected
                }
            }
            '"' => self.string(),
            '[' => match field::field_end(self.text, start) {
                Some(end) => {
                    self.pos = end;
                    LexemeKind::Field
                }
                None => {
                    self.pos = self.text.len();
                    LexemeKind::Unterminated
                }
            },
            c if c.is_ascii_digit()
                || (c == '.' && self.peek_at(1).map_or(false, |n| n.is_ascii_digit())) =>
            {
                self.number()
            }
            c if c.is_alphabetic() || c == '_' => {
                self.eat_while(|c| c.is_alphanumeric() || c == '_');
                LexemeKind::Identifier
            }
            _ => self.single(LexemeKind::Unexpected),
        };

        Some(Lexeme {
            kind,
            span: start..self.pos,
        })
    }

    fn single(&mut self, kind: LexemeKind) -> LexemeKind {
        self.bump();
        kind
    }

    fn string(&mut self) -> LexemeKind {
        self.bump(); // opening quote
        loop {
            match self.peek() {
                None => return LexemeKind::Unterminated,
                Some('"') if self.peek_at(1) == Some('"') => {
                    self.bump();
                    self.bump();
                }
                Some('"') => {
                    self.bump();
                    return LexemeKind::String;
                }
                Some(_) => self.bump(),
            }
        }
    }

    fn number(&mut self) -> LexemeKind {
        self.eat_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') {
            self.bump();
            self.eat_while(|c| c.is_ascii_digit());
        }
        // Exponent only when digits follow, so `2e` stays a number and an identifier
        if matches!(self.peek(), Some('e' | 'E')) {
            let digit_at = if matches!(self.peek_at(1), Some('+' | '-')) {
                2
            } else {
                1
            };
            if self.peek_at(digit_at).map_or(false, |c| c.is_ascii_digit()) {
                for _ in 0..digit_at {
                    self.bump();
                }
                self.eat_while(|c| c.is_ascii_digit());
            }
        }
        LexemeKind::Number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(text: &str) -> Vec<LexemeKind> {
        lex(text).into_iter().map(|l| l.kind).collect()
    }

    #[test]
    fn test_operators() {
        use LexemeKind::*;
        assert_eq!(
            kinds("1 <> 2 != 3 <= >= < > ^"),
            vec![
                Number, NotEqual, Number, NotEqual, Number, LessEqual, GreaterEqual, Less,
                Greater, Caret
            ]
        );
    }

    #[test]
    fn test_fields_and_strings() {
        let text = r#"RESTRICT([Sales], [d/City].[p/Name] = "A ""quoted"" name")"#;
        let lexemes = lex(text);
        let fields: Vec<_> = lexemes
            .iter()
            .filter(|l| l.kind == LexemeKind::Field)
            .map(|l| l.text(text))
            .collect();
        assert_eq!(fields, vec!["[Sales]", "[d/City].[p/Name]"]);

        let string = lexemes
            .iter()
            .find(|l| l.kind == LexemeKind::String)
            .unwrap();
        assert_eq!(unquote(string.text(text)), "A \"quoted\" name");
    }

    #[test]
    fn test_numbers() {
        let text = "1.5 .25 2e3 7E-2 2e";
        let numbers: Vec<_> = lex(text)
            .into_iter()
            .filter(|l| l.kind == LexemeKind::Number)
            .map(|l| text[l.span].to_string())
            .collect();
        assert_eq!(numbers, vec!["1.5", ".25", "2e3", "7E-2", "2"]);
    }

    #[test]
    fn test_unterminated() {
        assert_eq!(kinds("\"open"), vec![LexemeKind::Unterminated]);
        assert_eq!(
            kinds("1 + [d/City"),
            vec![LexemeKind::Number, LexemeKind::Plus, LexemeKind::Unterminated]
        );
    }

    #[test]
    fn test_quote_round_trip() {
        assert_eq!(quote("a\"b"), "\"a\"\"b\"");
        assert_eq!(unquote(&quote("a\"b")), "a\"b");
    }
}
