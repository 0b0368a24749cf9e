//! Formula parser
//!
//! A recursive descent parser for canonical formula text with proper operator
//! precedence. Nesting is bounded twice: the parser's own recursion against the
//! maximum depth, and the height of the resulting tree against a larger budget
//! that long operator chains count towards.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::config::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_TREE_HEIGHT};
use crate::error::{FormulaError, FormulaResult};
use crate::lexer::{self, Lexeme, LexemeKind};
use measure_formula_core::FieldReference;

/// Parse canonical formula text into a parse trace
///
/// # Example
/// ```rust
/// use measure_formula::parse_formula;
///
/// let ast = parse_formula("1+2").unwrap();
/// let ast = parse_formula("RESTRICT([Sales], [d/City] = \"Paris\")").unwrap();
/// let ast = parse_formula("IF([Sales] > 0, [Sales], 0)").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    parse_formula_with_depth(formula, DEFAULT_MAX_DEPTH)
}

/// Parse with an explicit nesting limit
pub fn parse_formula_with_depth(formula: &str, max_depth: usize) -> FormulaResult<FormulaExpr> {
    parse_formula_with_limits(formula, max_depth, DEFAULT_MAX_TREE_HEIGHT.max(max_depth))
}

/// Parse with explicit nesting and tree height limits
pub fn parse_formula_with_limits(
    formula: &str,
    max_depth: usize,
    max_height: usize,
) -> FormulaResult<FormulaExpr> {
    let mut parser = FormulaParser::new(formula, max_depth);
    if parser.is_at_end() {
        return Err(FormulaError::parse(0, "Formula is empty"));
    }

    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if let Some(lexeme) = parser.current() {
        return Err(FormulaError::parse(
            lexeme.span.start,
            format!(
                "Unexpected characters after expression: '{}'",
                &formula[lexeme.span.start..]
            ),
        ));
    }

    // Left-associative chains grow the tree without deepening the recursion
    if expr.depth() > max_height {
        return Err(FormulaError::NestingTooDeep(max_height));
    }

    Ok(expr)
}

/// Formula parser
struct FormulaParser<'a> {
    input: &'a str,
    lexemes: Vec<Lexeme>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str, max_depth: usize) -> Self {
        Self {
            input,
            lexemes: lexer::lex(input),
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    // === Helper methods ===

    fn current(&self) -> Option<&Lexeme> {
        self.lexemes.get(self.pos)
    }

    fn current_kind(&self) -> Option<LexemeKind> {
        self.current().map(|l| l.kind)
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        self.current()
            .map_or(false, |l| l.is_keyword(self.input, keyword))
    }

    fn is_keyword_at(&self, offset: usize, keyword: &str) -> bool {
        self.lexemes
            .get(self.pos + offset)
            .map_or(false, |l| l.is_keyword(self.input, keyword))
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.lexemes.len()
    }

    /// Byte offset of the current lexeme, or end of input
    fn offset(&self) -> usize {
        self.current().map_or(self.input.len(), |l| l.span.start)
    }

    fn consume(&mut self) -> Option<Lexeme> {
        let lexeme = self.lexemes.get(self.pos).cloned();
        self.pos += 1;
        lexeme
    }

    fn expect(&mut self, expected: LexemeKind, what: &str) -> FormulaResult<()> {
        if self.current_kind() == Some(expected) {
            self.consume();
            Ok(())
        } else {
            Err(FormulaError::parse(
                self.offset(),
                format!("Expected {}, got {}", what, self.describe_current()),
            ))
        }
    }

    fn describe_current(&self) -> String {
        match self.current() {
            Some(l) => format!("'{}'", l.text(self.input)),
            None => "end of formula".to_string(),
        }
    }

    fn enter(&mut self) -> FormulaResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(FormulaError::NestingTooDeep(self.max_depth));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn binary(op: BinaryOperator, left: FormulaExpr, right: FormulaExpr) -> FormulaExpr {
        FormulaExpr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. OR
    // 2. AND
    // 3. Prefix NOT
    // 4. Comparison: =, !=, <>, <, <=, >, >=, IN, NOT IN
    // 5. Addition/Subtraction: +, -
    // 6. Multiplication/Division: *, /
    // 7. Exponentiation: ^ (right associative)
    // 8. Unary: -, +
    // 9. Primary: literals, references, lists, function calls, parentheses

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_and()?;

        while self.is_keyword("OR") {
            self.consume();
            let right = self.parse_and()?;
            left = Self::binary(BinaryOperator::Or, left, right);
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_not()?;

        while self.is_keyword("AND") {
            self.consume();
            let right = self.parse_not()?;
            left = Self::binary(BinaryOperator::And, left, right);
        }

        Ok(left)
    }

    fn parse_not(&mut self) -> FormulaResult<FormulaExpr> {
        if self.is_keyword("NOT") {
            self.consume();
            self.enter()?;
            let operand = self.parse_not()?;
            self.leave();
            return Ok(FormulaExpr::UnaryOp {
                op: UnaryOperator::Not,
                operand: Box::new(operand),
            });
        }

        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.current_kind() {
                Some(LexemeKind::Equal) => BinaryOperator::Equal,
                Some(LexemeKind::NotEqual) => BinaryOperator::NotEqual,
                Some(LexemeKind::Less) => BinaryOperator::LessThan,
                Some(LexemeKind::LessEqual) => BinaryOperator::LessEqual,
                Some(LexemeKind::Greater) => BinaryOperator::GreaterThan,
                Some(LexemeKind::GreaterEqual) => BinaryOperator::GreaterEqual,
                _ if self.is_keyword("IN") => BinaryOperator::In,
                _ if self.is_keyword("NOT") && self.is_keyword_at(1, "IN") => {
                    self.consume();
                    BinaryOperator::NotIn
                }
                _ => break,
            };

            self.consume();
            let right = self.parse_additive()?;
            left = Self::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_kind() {
                Some(LexemeKind::Plus) => BinaryOperator::Add,
                Some(LexemeKind::Minus) => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume();
            let right = self.parse_multiplicative()?;
            left = Self::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_exponent()?;

        loop {
            let op = match self.current_kind() {
                Some(LexemeKind::Star) => BinaryOperator::Multiply,
                Some(LexemeKind::Slash) => BinaryOperator::Divide,
                _ => break,
            };

            self.consume();
            let right = self.parse_exponent()?;
            left = Self::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_exponent(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_unary()?;

        if self.current_kind() == Some(LexemeKind::Caret) {
            self.consume();
            self.enter()?;
            let right = self.parse_exponent()?; // Right associative
            self.leave();
            return Ok(Self::binary(BinaryOperator::Power, left, right));
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.current_kind() {
            // Prefix unary minus
            Some(LexemeKind::Minus) => {
                self.consume();
                self.enter()?;
                let operand = self.parse_unary()?;
                self.leave();
                Ok(FormulaExpr::UnaryOp {
                    op: UnaryOperator::Negate,
                    operand: Box::new(operand),
                })
            }
            // Prefix plus (no-op)
            Some(LexemeKind::Plus) => {
                self.consume();
                self.enter()?;
                let operand = self.parse_unary();
                self.leave();
                operand
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        let offset = self.offset();
        let Some(lexeme) = self.current().cloned() else {
            return Err(FormulaError::parse(offset, "Unexpected end of formula"));
        };
        let text = lexeme.text(self.input);

        match lexeme.kind {
            LexemeKind::Number => {
                self.consume();
                Ok(FormulaExpr::Number(text.to_string()))
            }

            LexemeKind::String => {
                self.consume();
                Ok(FormulaExpr::String(lexer::unquote(text)))
            }

            LexemeKind::Field => {
                self.consume();
                FieldReference::parse(text)
                    .map(FormulaExpr::Field)
                    .ok_or_else(|| {
                        FormulaError::parse(offset, format!("Malformed field reference '{}'", text))
                    })
            }

            LexemeKind::LeftParen => {
                self.consume();
                self.enter()?;
                let expr = self.parse_expression()?;
                self.expect(LexemeKind::RightParen, "')'")?;
                self.leave();
                Ok(expr)
            }

            LexemeKind::LeftBrace => self.parse_list(),

            LexemeKind::Identifier => {
                self.consume();
                let is_call = self.current_kind() == Some(LexemeKind::LeftParen);
                if is_call {
                    return self.parse_function_call(text.to_uppercase());
                }
                match text.to_ascii_uppercase().as_str() {
                    "TRUE" => Ok(FormulaExpr::Boolean(true)),
                    "FALSE" => Ok(FormulaExpr::Boolean(false)),
                    "NULL" => Ok(FormulaExpr::Null),
                    _ => Err(FormulaError::parse(
                        offset,
                        format!("Unknown identifier '{}'", text),
                    )),
                }
            }

            LexemeKind::Unterminated => Err(FormulaError::parse(
                offset,
                "Unterminated string or field reference",
            )),

            _ => Err(FormulaError::parse(
                offset,
                format!("Unexpected token '{}'", text),
            )),
        }
    }

    fn parse_list(&mut self) -> FormulaResult<FormulaExpr> {
        self.expect(LexemeKind::LeftBrace, "'{'")?;
        self.enter()?;

        let mut items = Vec::new();
        if self.current_kind() != Some(LexemeKind::RightBrace) {
            items.push(self.parse_expression()?);

            while self.current_kind() == Some(LexemeKind::Comma) {
                self.consume();
                items.push(self.parse_expression()?);
            }
        }

        self.expect(LexemeKind::RightBrace, "',' or '}' in list")?;
        self.leave();
        Ok(FormulaExpr::List(items))
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        self.expect(LexemeKind::LeftParen, "'('")?;
        self.enter()?;

        let mut args = Vec::new();

        // Parse arguments
        if self.current_kind() != Some(LexemeKind::RightParen) {
            args.push(self.parse_expression()?);

            while self.current_kind() == Some(LexemeKind::Comma) {
                self.consume();
                args.push(self.parse_expression()?);
            }
        }

        self.expect(LexemeKind::RightParen, "',' or ')'")?;
        self.leave();

        Ok(FormulaExpr::Function { name, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn number(text: &str) -> FormulaExpr {
        FormulaExpr::Number(text.into())
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_formula("42").unwrap(), number("42"));
        assert_eq!(parse_formula("3.14").unwrap(), number("3.14"));
        assert_eq!(parse_formula("1e10").unwrap(), number("1e10"));
        assert_eq!(parse_formula("true").unwrap(), FormulaExpr::Boolean(true));
        assert_eq!(parse_formula("NULL").unwrap(), FormulaExpr::Null);
        assert_eq!(
            parse_formula("\"Hello \"\"World\"\"\"").unwrap(),
            FormulaExpr::String("Hello \"World\"".into())
        );
    }

    #[test]
    fn test_parse_arithmetic_precedence() {
        let ast = parse_formula("1+2*3").unwrap();
        // Should parse as 1+(2*3) due to precedence
        if let FormulaExpr::BinaryOp { op, left, right } = ast {
            assert_eq!(op, BinaryOperator::Add);
            assert_eq!(*left, number("1"));
            assert!(matches!(
                *right,
                FormulaExpr::BinaryOp {
                    op: BinaryOperator::Multiply,
                    ..
                }
            ));
        } else {
            panic!("Expected BinaryOp");
        }
    }

    #[test]
    fn test_parse_power_is_right_associative() {
        let ast = parse_formula("2^3^2").unwrap();
        if let FormulaExpr::BinaryOp { op, left, right } = ast {
            assert_eq!(op, BinaryOperator::Power);
            assert_eq!(*left, number("2"));
            assert!(matches!(
                *right,
                FormulaExpr::BinaryOp {
                    op: BinaryOperator::Power,
                    ..
                }
            ));
        } else {
            panic!("Expected BinaryOp");
        }
    }

    #[test]
    fn test_parse_logical_precedence() {
        // a OR (b AND (NOT c))
        let ast = parse_formula("[a] > 1 OR [b] > 1 AND NOT [c] > 1").unwrap();
        let FormulaExpr::BinaryOp { op, right, .. } = ast else {
            panic!("Expected BinaryOp");
        };
        assert_eq!(op, BinaryOperator::Or);
        let FormulaExpr::BinaryOp { op, right, .. } = *right else {
            panic!("Expected AND");
        };
        assert_eq!(op, BinaryOperator::And);
        assert!(matches!(
            *right,
            FormulaExpr::UnaryOp {
                op: UnaryOperator::Not,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_membership() {
        let ast = parse_formula("[d/City] NOT IN {\"Paris\", \"Rome\"}").unwrap();
        let FormulaExpr::BinaryOp { op, left, right } = ast else {
            panic!("Expected BinaryOp");
        };
        assert_eq!(op, BinaryOperator::NotIn);
        assert_eq!(*left, FormulaExpr::Field(FieldReference::dimension("City")));
        assert_eq!(
            *right,
            FormulaExpr::List(vec![
                FormulaExpr::String("Paris".into()),
                FormulaExpr::String("Rome".into())
            ])
        );

        let ast = parse_formula("[d/City] in {\"Paris\"}").unwrap();
        assert!(matches!(
            ast,
            FormulaExpr::BinaryOp {
                op: BinaryOperator::In,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_not_equal_spellings() {
        for text in ["1 <> 2", "1 != 2"] {
            assert!(matches!(
                parse_formula(text).unwrap(),
                FormulaExpr::BinaryOp {
                    op: BinaryOperator::NotEqual,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_parse_function() {
        let ast = parse_formula("restrict([Sales], [d/City] = \"Paris\")").unwrap();
        if let FormulaExpr::Function { name, args } = ast {
            assert_eq!(name, "RESTRICT");
            assert_eq!(args.len(), 2);
            assert_eq!(args[0], FormulaExpr::Field(FieldReference::measure("Sales")));
        } else {
            panic!("Expected Function");
        }

        // Keywords used as call names stay calls
        assert!(matches!(
            parse_formula("AND(TRUE, FALSE)").unwrap(),
            FormulaExpr::Function { .. }
        ));
    }

    #[test]
    fn test_parse_errors_carry_offsets() {
        assert_eq!(
            parse_formula("1 +").unwrap_err(),
            FormulaError::parse(3, "Unexpected end of formula")
        );
        assert!(matches!(
            parse_formula("ABS(1"),
            Err(FormulaError::Parse { offset: 5, .. })
        ));
        assert!(matches!(
            parse_formula("1 2"),
            Err(FormulaError::Parse { offset: 2, .. })
        ));
        assert!(matches!(
            parse_formula("[d/]"),
            Err(FormulaError::Parse { offset: 0, .. })
        ));
        assert!(matches!(
            parse_formula("Sales"),
            Err(FormulaError::Parse { .. })
        ));
        assert!(matches!(parse_formula("  "), Err(FormulaError::Parse { .. })));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert!(parse_formula_with_depth(&deep, 16).is_ok());
        assert_eq!(
            parse_formula_with_depth(&deep, 4).unwrap_err(),
            FormulaError::NestingTooDeep(4)
        );

        // A flat chain only counts against the height budget
        let chain = vec!["1"; 20].join(" + ");
        assert!(parse_formula_with_depth(&chain, 8).is_ok());
        assert!(parse_formula_with_limits(&chain, 8, 32).is_ok());
        assert_eq!(
            parse_formula_with_limits(&chain, 8, 16).unwrap_err(),
            FormulaError::NestingTooDeep(16)
        );
    }
}
