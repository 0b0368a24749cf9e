//! Parse trace: the untyped syntax tree handed to the tree builder

use measure_formula_core::FieldReference;

/// Formula expression as parsed, before name resolution and typing
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    // === Literals ===
    /// Numeric literal, as written in canonical text
    Number(String),
    /// String literal (unescaped)
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// `NULL`
    Null,

    // === References ===
    /// Bracketed field reference (measure, dimension, property or hierarchy head)
    Field(FieldReference),

    // === Operators ===
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },

    // === Function call ===
    Function { name: String, args: Vec<FormulaExpr> },

    // === List ===
    List(Vec<FormulaExpr>),
}

impl FormulaExpr {
    /// Children in source order
    pub fn children(&self) -> Vec<&FormulaExpr> {
        match self {
            FormulaExpr::BinaryOp { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            FormulaExpr::UnaryOp { operand, .. } => vec![operand.as_ref()],
            FormulaExpr::Function { args, .. } | FormulaExpr::List(args) => args.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Height of the tree (a literal has depth 1), computed without recursion
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((expr, depth)) = stack.pop() {
            max = max.max(depth);
            stack.extend(expr.children().into_iter().map(|c| (c, depth + 1)));
        }
        max
    }

    /// Registry name of the call this node stands for, if it is one
    pub fn call_name(&self) -> Option<&str> {
        match self {
            FormulaExpr::BinaryOp { op, .. } => Some(op.name()),
            FormulaExpr::UnaryOp { op, .. } => Some(op.name()),
            FormulaExpr::Function { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Membership
    In,
    NotIn,

    // Logical
    And,
    Or,
}

impl BinaryOperator {
    /// Name of the registry item implementing this operator
    pub fn name(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::In => "IN",
            BinaryOperator::NotIn => "NOTIN",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
}

impl UnaryOperator {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOperator::Negate => "NEGATE",
            UnaryOperator::Not => "NOT",
        }
    }
}
