//! Formula items: operators and functions
//!
//! Every operator and function is a [`FormulaItem`] in the [`FormulaRegistry`]:
//! static metadata (argument contracts, arity, backend support, feature gate)
//! plus behavior hooks implemented by its [`FunctionKind`] through
//! [`FormulaBehavior`]. Logical names with backend-specific semantics (`ISNULL`,
//! `DATEDIFF`) have one item per backend variant.

pub mod date;
pub mod fold;
pub mod logical;
pub mod math;
pub mod olap;
pub mod operators;
pub mod text;

use crate::config::CompilerEnvironment;
use crate::node::ExpressionNode;
use ahash::AHashMap;
use measure_formula_core::{
    Backend, DataType, Feature, FeatureFlags, MetadataProvider, TypeSystem, ValidationMessages,
};
use std::fmt;

/// Closed set of operator and function implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Negate,

    // Comparison and membership
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    In,
    NotIn,

    // Logical
    And,
    Or,
    Not,
    If,
    IsNullHana,
    IsNullBw,

    // Math
    Abs,
    Sqrt,
    Log,
    Log10,
    Exp,
    Floor,
    Ceil,
    Mod,
    Round,
    Trunc,
    Min,
    Max,
    Int,
    Float,

    // Text
    Length,
    Upper,
    Lower,
    Concat,
    Like,
    Substring,
    Replace,

    // Dates
    DateDiffHana,
    DateDiffBw,
    CalcDaysBetween,
    CalcMonthsBetween,
    CalcYearsBetween,

    // OLAP
    Restrict,
    GrandTotal,
    Subtotal,
    SubtotalByIds,
    PercentOfGrandTotal,
    PercentOfSubtotal,
}

/// How a call is written in canonical text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
    Call,
    Infix {
        symbol: &'static str,
        precedence: u8,
        right_assoc: bool,
    },
    Prefix {
        symbol: &'static str,
        precedence: u8,
    },
}

/// Precedence of atoms and call syntax
pub const ATOM_PRECEDENCE: u8 = 10;

impl FunctionKind {
    /// Canonical name; backend variants share their external name
    pub fn name(self) -> &'static str {
        use FunctionKind::*;
        match self {
            Add => "+",
            Subtract => "-",
            Multiply => "*",
            Divide => "/",
            Power => "^",
            Negate => "NEGATE",
            Equal => "=",
            NotEqual => "!=",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            In => "IN",
            NotIn => "NOTIN",
            And => "AND",
            Or => "OR",
            Not => "NOT",
            If => "IF",
            IsNullHana | IsNullBw => "ISNULL",
            Abs => "ABS",
            Sqrt => "SQRT",
            Log => "LOG",
            Log10 => "LOG10",
            Exp => "EXP",
            Floor => "FLOOR",
            Ceil => "CEIL",
            Mod => "MOD",
            Round => "ROUND",
            Trunc => "TRUNC",
            Min => "MIN",
            Max => "MAX",
            Int => "INT",
            Float => "FLOAT",
            Length => "LENGTH",
            Upper => "UPPER",
            Lower => "LOWER",
            Concat => "CONCAT",
            Like => "LIKE",
            Substring => "SUBSTRING",
            Replace => "REPLACE",
            DateDiffHana | DateDiffBw => "DATEDIFF",
            CalcDaysBetween => "CALCDAYSBETWEEN",
            CalcMonthsBetween => "CALCMONTHSBETWEEN",
            CalcYearsBetween => "CALCYEARSBETWEEN",
            Restrict => "RESTRICT",
            GrandTotal => "GRANDTOTAL",
            Subtotal => "SUBTOTAL",
            SubtotalByIds => "SUBTOTALBYIDS",
            PercentOfGrandTotal => "PERCENTOFGRANDTOTAL",
            PercentOfSubtotal => "PERCENTOFSUBTOTAL",
        }
    }

    pub fn category(self) -> Category {
        use FunctionKind::*;
        match self {
            Add | Subtract | Multiply | Divide | Power | Negate | Equal | NotEqual | Less
            | LessEqual | Greater | GreaterEqual | In | NotIn => Category::Operator,
            And | Or | Not | If | IsNullHana | IsNullBw => Category::Logical,
            Abs | Sqrt | Log | Log10 | Exp | Floor | Ceil | Mod | Round | Trunc | Min | Max
            | Int | Float => Category::Math,
            Length | Upper | Lower | Concat | Like | Substring | Replace => Category::Text,
            DateDiffHana | DateDiffBw | CalcDaysBetween | CalcMonthsBetween
            | CalcYearsBetween => Category::Date,
            Restrict | GrandTotal | Subtotal | SubtotalByIds | PercentOfGrandTotal
            | PercentOfSubtotal => Category::Olap,
        }
    }

    pub fn notation(self) -> Notation {
        use FunctionKind::*;
        let infix = |symbol, precedence| Notation::Infix {
            symbol,
            precedence,
            right_assoc: false,
        };
        match self {
            Or => infix("OR", 1),
            And => infix("AND", 2),
            Not => Notation::Prefix {
                symbol: "NOT ",
                precedence: 3,
            },
            Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual | In => {
                infix(self.name(), 4)
            }
            NotIn => infix("NOT IN", 4),
            Add | Subtract => infix(self.name(), 5),
            Multiply | Divide => infix(self.name(), 6),
            Power => Notation::Infix {
                symbol: "^",
                precedence: 7,
                right_assoc: true,
            },
            Negate => Notation::Prefix {
                symbol: "-",
                precedence: 8,
            },
            _ => Notation::Call,
        }
    }

    pub fn precedence(self) -> u8 {
        match self.notation() {
            Notation::Call => ATOM_PRECEDENCE,
            Notation::Infix { precedence, .. } | Notation::Prefix { precedence, .. } => precedence,
        }
    }

    /// Comparison operators (`=`, `!=`, `<`, `<=`, `>`, `>=`)
    pub fn is_comparison(self) -> bool {
        use FunctionKind::*;
        matches!(
            self,
            Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual
        )
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Item category, used for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Operator,
    Logical,
    Math,
    Text,
    Date,
    Olap,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::Operator => "operator",
            Category::Logical => "logical",
            Category::Math => "math",
            Category::Text => "text",
            Category::Date => "date",
            Category::Olap => "olap",
        }
    }
}

/// Accepted types of one argument position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentContract {
    pub types: &'static [DataType],
    pub optional: bool,
    /// The argument must be compatible with the argument at this index
    pub same_type_as: Option<usize>,
}

impl ArgumentContract {
    pub const fn required(types: &'static [DataType]) -> Self {
        Self {
            types,
            optional: false,
            same_type_as: None,
        }
    }

    pub const fn optional(types: &'static [DataType]) -> Self {
        Self {
            types,
            optional: true,
            same_type_as: None,
        }
    }

    pub const fn same_type_as(mut self, index: usize) -> Self {
        self.same_type_as = Some(index);
        self
    }

    pub fn describe_types(&self) -> String {
        self.types
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

/// Upper bound on optional arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Optional {
    Count(usize),
    Unbounded,
}

/// Accepted argument counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// `required` up to `required + optional`
    Range { required: usize, optional: Optional },
    /// Exactly one of two counts
    Either(usize, usize),
}

impl Arity {
    pub fn fixed(count: usize) -> Self {
        Arity::Range {
            required: count,
            optional: Optional::Count(0),
        }
    }

    pub fn required(&self) -> usize {
        match *self {
            Arity::Range { required, .. } => required,
            Arity::Either(a, b) => a.min(b),
        }
    }

    /// Largest accepted count; `None` when unbounded
    pub fn maximum(&self) -> Option<usize> {
        match *self {
            Arity::Range {
                required,
                optional: Optional::Count(n),
            } => Some(required + n),
            Arity::Range {
                optional: Optional::Unbounded,
                ..
            } => None,
            Arity::Either(a, b) => Some(a.max(b)),
        }
    }

    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Either(a, b) => count == a || count == b,
            Arity::Range { .. } => {
                count >= self.required() && self.maximum().map_or(true, |max| count <= max)
            }
        }
    }
}

/// Whether string-typed arguments need [`FeatureFlags::string_arguments`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringUsage {
    Allowed,
    Gated,
}

/// Where dimension references may appear as arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionUsage {
    /// Never as a direct argument
    Never,
    /// Only when [`FeatureFlags::dimension_arguments`] is on
    Gated,
    /// As the subject of a member filter
    Filter,
    /// Always (aggregation axes)
    Always,
}

/// Registry entry for one operator or function (variant)
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaItem {
    pub kind: FunctionKind,
    pub name: &'static str,
    pub syntax: &'static str,
    pub description: &'static str,
    pub arguments: Vec<ArgumentContract>,
    pub arity: Arity,
    pub backends: &'static [Backend],
    pub feature: Option<Feature>,
    /// Produced by rewrites only; not callable from formula text
    pub internal: bool,
    pub string_usage: StringUsage,
    pub dimension_usage: DimensionUsage,
}

impl FormulaItem {
    /// Start an item; the argument list determines the arity
    pub fn new(kind: FunctionKind, syntax: &'static str, description: &'static str) -> Self {
        Self {
            kind,
            name: kind.name(),
            syntax,
            description,
            arguments: Vec::new(),
            arity: Arity::fixed(0),
            backends: &Backend::ALL,
            feature: None,
            internal: false,
            string_usage: StringUsage::Allowed,
            dimension_usage: DimensionUsage::Never,
        }
    }

    fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    fn args(mut self, arguments: Vec<ArgumentContract>) -> Self {
        let required = arguments.iter().filter(|a| !a.optional).count();
        self.arity = Arity::Range {
            required,
            optional: Optional::Count(arguments.len() - required),
        };
        self.arguments = arguments;
        self
    }

    /// The last contract repeats without limit
    fn variadic(mut self) -> Self {
        if let Arity::Range { required, .. } = self.arity {
            self.arity = Arity::Range {
                required,
                optional: Optional::Unbounded,
            };
        }
        self
    }

    fn arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }

    fn backends(mut self, backends: &'static [Backend]) -> Self {
        self.backends = backends;
        self
    }

    fn feature(mut self, feature: Feature) -> Self {
        self.feature = Some(feature);
        self
    }

    fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    fn strings_gated(mut self) -> Self {
        self.string_usage = StringUsage::Gated;
        self
    }

    fn dimensions(mut self, usage: DimensionUsage) -> Self {
        self.dimension_usage = usage;
        self
    }

    /// Contract for an argument position; extra positions of a variadic item
    /// reuse the last contract
    pub fn contract(&self, position: usize) -> Option<&ArgumentContract> {
        self.arguments.get(position).or_else(|| match self.arity {
            Arity::Range {
                optional: Optional::Unbounded,
                ..
            } => self.arguments.last(),
            _ => None,
        })
    }

    pub fn supports(&self, backend: Backend) -> bool {
        self.backends.contains(&backend)
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }
}

/// Everything a behavior hook may consult
#[derive(Clone, Copy)]
pub struct ItemContext<'a> {
    pub env: &'a CompilerEnvironment,
    pub metadata: &'a dyn MetadataProvider,
}

impl<'a> ItemContext<'a> {
    pub fn new(env: &'a CompilerEnvironment, metadata: &'a dyn MetadataProvider) -> Self {
        Self { env, metadata }
    }

    pub fn types(&self) -> &'a TypeSystem {
        &self.env.types
    }

    pub fn flags(&self) -> &'a FeatureFlags {
        &self.env.config.flags
    }

    pub fn backend(&self) -> Backend {
        self.metadata.backend()
    }
}

/// Per-item behavior hooks
pub trait FormulaBehavior {
    /// Return type of a call with these (already built) arguments
    fn infer_return_type(&self, args: &[ExpressionNode]) -> DataType;

    /// Constant-fold a call; `None` when not applicable
    fn fold(&self, args: &[ExpressionNode], cx: &ItemContext<'_>) -> Option<ExpressionNode>;

    /// Lower a call into primitives; takes precedence over [`fold`](Self::fold)
    fn rewrite(&self, args: &[ExpressionNode], cx: &ItemContext<'_>) -> Option<ExpressionNode>;

    /// Item-specific semantic checks
    fn validate(&self, args: &[ExpressionNode], cx: &ItemContext<'_>) -> ValidationMessages;

    /// Argument preprocessing before validation
    fn transform_args(&self, args: Vec<ExpressionNode>) -> Vec<ExpressionNode> {
        args
    }
}

impl FormulaBehavior for FunctionKind {
    fn infer_return_type(&self, args: &[ExpressionNode]) -> DataType {
        match self.category() {
            Category::Operator => operators::infer_return_type(*self, args),
            Category::Logical => logical::infer_return_type(*self, args),
            Category::Math => math::infer_return_type(*self, args),
            Category::Text => text::infer_return_type(*self),
            Category::Date => DataType::Integer,
            Category::Olap => DataType::Measure,
        }
    }

    fn fold(&self, args: &[ExpressionNode], cx: &ItemContext<'_>) -> Option<ExpressionNode> {
        let special = match self.category() {
            Category::Logical => logical::fold(*self, args),
            Category::Date => date::fold(*self, args, cx),
            _ => None,
        };
        special.or_else(|| fold::fold_with_rules(*self, args))
    }

    fn rewrite(&self, args: &[ExpressionNode], cx: &ItemContext<'_>) -> Option<ExpressionNode> {
        match self.category() {
            Category::Operator => operators::rewrite(*self, args, cx),
            Category::Date => date::rewrite(*self, args),
            Category::Olap => olap::rewrite(*self, args),
            _ => None,
        }
    }

    fn validate(&self, args: &[ExpressionNode], _cx: &ItemContext<'_>) -> ValidationMessages {
        let mut out = ValidationMessages::new();
        match self.category() {
            Category::Operator => operators::validate(*self, args, &mut out),
            Category::Math => math::validate(*self, args, &mut out),
            Category::Date => date::validate(*self, args, &mut out),
            Category::Olap => olap::validate(*self, args, &mut out),
            Category::Logical | Category::Text => {}
        }
        out
    }

    fn transform_args(&self, args: Vec<ExpressionNode>) -> Vec<ExpressionNode> {
        match self {
            FunctionKind::Divide | FunctionKind::Power => operators::cast_integer_literals(args),
            _ => args,
        }
    }
}

/// Why a name did not resolve to a callable item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    Unknown,
    Disabled,
    Internal,
    Backend(Backend),
}

/// Name-indexed catalog of formula items
#[derive(Debug, Clone)]
pub struct FormulaRegistry {
    items: Vec<FormulaItem>,
    by_name: AHashMap<String, Vec<usize>>,
    flags: FeatureFlags,
}

// Argument type sets
const NUMBER: &[DataType] = &[DataType::Number];
const NUMBER_OR_BOOLEAN: &[DataType] = &[DataType::Number, DataType::Boolean];
const BOOLEAN: &[DataType] = &[DataType::Boolean];
const ANY: &[DataType] = &[DataType::Any];
const LIST: &[DataType] = &[DataType::List];
const STRING: &[DataType] = &[DataType::String];
const DATE: &[DataType] = &[DataType::Date, DataType::String];
const MEASURE: &[DataType] = &[DataType::Measure];
const FILTER: &[DataType] = &[DataType::DimensionFilter];
const DIMENSION: &[DataType] = &[DataType::Dimension];

const HANA: &[Backend] = &[Backend::Hana];
const BW: &[Backend] = &[Backend::Bw];

use ArgumentContract as Arg;

impl FormulaRegistry {
    /// Create a new registry with all built-in items
    pub fn new(flags: &FeatureFlags) -> Self {
        let mut registry = Self {
            items: Vec::new(),
            by_name: AHashMap::new(),
            flags: flags.clone(),
        };

        registry.register_operators();
        registry.register_logical_functions();
        registry.register_math_functions();
        registry.register_text_functions();
        registry.register_date_functions();
        registry.register_olap_functions();

        registry
    }

    /// Register an item
    pub fn register(&mut self, item: FormulaItem) {
        self.by_name
            .entry(item.name.to_uppercase())
            .or_default()
            .push(self.items.len());
        self.items.push(item);
    }

    /// All variants registered under a name
    pub fn get(&self, name: &str) -> Vec<&FormulaItem> {
        self.by_name
            .get(&name.to_uppercase())
            .map(|ids| ids.iter().map(|&i| &self.items[i]).collect())
            .unwrap_or_default()
    }

    /// First registered item of a kind
    pub fn item(&self, kind: FunctionKind) -> Option<&FormulaItem> {
        self.items.iter().find(|i| i.kind == kind)
    }

    pub fn is_enabled(&self, item: &FormulaItem) -> bool {
        item.feature.map_or(true, |f| self.flags.is_enabled(f))
    }

    /// Resolve a function name written in formula text for a backend
    pub fn resolve(&self, name: &str, backend: Backend) -> Result<&FormulaItem, Unavailable> {
        self.lookup(name, backend, false)
    }

    /// Resolve an operator name produced by the parser; internal items allowed
    pub fn resolve_operator(
        &self,
        name: &str,
        backend: Backend,
    ) -> Result<&FormulaItem, Unavailable> {
        self.lookup(name, backend, true)
    }

    fn lookup(
        &self,
        name: &str,
        backend: Backend,
        allow_internal: bool,
    ) -> Result<&FormulaItem, Unavailable> {
        let candidates = self.get(name);
        if candidates.is_empty() {
            return Err(Unavailable::Unknown);
        }
        let visible: Vec<_> = candidates
            .into_iter()
            .filter(|i| allow_internal || !i.internal)
            .collect();
        if visible.is_empty() {
            return Err(Unavailable::Internal);
        }
        let enabled: Vec<_> = visible.into_iter().filter(|i| self.is_enabled(i)).collect();
        if enabled.is_empty() {
            return Err(Unavailable::Disabled);
        }
        enabled
            .into_iter()
            .find(|i| i.supports(backend))
            .ok_or(Unavailable::Backend(backend))
    }

    /// Callable items for a backend, sorted by category and name
    pub fn available(&self, backend: Backend) -> Vec<&FormulaItem> {
        let mut items: Vec<_> = self
            .items
            .iter()
            .filter(|i| !i.internal && self.is_enabled(i) && i.supports(backend))
            .collect();
        items.sort_by(|a, b| (a.category(), a.name).cmp(&(b.category(), b.name)));
        items
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormulaItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn register_operators(&mut self) {
        use FunctionKind::*;

        for (kind, syntax, description) in [
            (Add, "a + b", "Sum of two numbers"),
            (Subtract, "a - b", "Difference of two numbers"),
            (Multiply, "a * b", "Product of two numbers"),
            (Divide, "a / b", "Quotient of two numbers"),
            (Power, "a ^ b", "a raised to the power b"),
        ] {
            self.register(
                FormulaItem::new(kind, syntax, description)
                    .args(vec![Arg::required(NUMBER), Arg::required(NUMBER)]),
            );
        }

        // POWER shares the implementation of ^
        self.register(
            FormulaItem::new(Power, "POWER(base, exponent)", "base raised to the power exponent")
                .named("POWER")
                .args(vec![Arg::required(NUMBER), Arg::required(NUMBER)]),
        );

        self.register(
            FormulaItem::new(Negate, "-a", "Negation")
                .args(vec![Arg::required(NUMBER)])
                .internal(),
        );

        for (kind, syntax) in [
            (Equal, "a = b"),
            (NotEqual, "a != b"),
            (Less, "a < b"),
            (LessEqual, "a <= b"),
            (Greater, "a > b"),
            (GreaterEqual, "a >= b"),
        ] {
            self.register(
                FormulaItem::new(kind, syntax, "Comparison; a member filter when a is a dimension")
                    .args(vec![Arg::required(ANY), Arg::required(ANY).same_type_as(0)])
                    .dimensions(DimensionUsage::Filter),
            );
        }

        self.register(
            FormulaItem::new(In, "a IN {x, y, ...}", "a equals one of the listed values")
                .args(vec![Arg::required(ANY), Arg::required(LIST)])
                .dimensions(DimensionUsage::Filter),
        );
        self.register(
            FormulaItem::new(NotIn, "a NOT IN {x, y, ...}", "a equals none of the listed values")
                .args(vec![Arg::required(ANY), Arg::required(LIST)])
                .dimensions(DimensionUsage::Filter),
        );
    }

    fn register_logical_functions(&mut self) {
        use FunctionKind::*;

        self.register(
            FormulaItem::new(And, "AND(condition, condition, ...)", "True when all conditions hold")
                .args(vec![Arg::required(BOOLEAN), Arg::required(BOOLEAN)])
                .variadic()
                .dimensions(DimensionUsage::Filter),
        );
        self.register(
            FormulaItem::new(Or, "OR(condition, condition, ...)", "True when any condition holds")
                .args(vec![Arg::required(BOOLEAN), Arg::required(BOOLEAN)])
                .variadic()
                .dimensions(DimensionUsage::Filter),
        );
        self.register(
            FormulaItem::new(Not, "NOT condition", "Logical negation")
                .args(vec![Arg::required(BOOLEAN)])
                .dimensions(DimensionUsage::Filter),
        );

        self.register(
            FormulaItem::new(If, "IF(condition, then, [else])", "Conditional value")
                .args(vec![
                    Arg::required(BOOLEAN),
                    Arg::required(ANY),
                    Arg::optional(ANY).same_type_as(1),
                ])
                .strings_gated(),
        );

        self.register(
            FormulaItem::new(IsNullHana, "ISNULL(value)", "True when value is null")
                .args(vec![Arg::required(ANY)])
                .backends(HANA)
                .dimensions(DimensionUsage::Gated),
        );
        self.register(
            FormulaItem::new(IsNullBw, "ISNULL(measure)", "True when the measure has no value")
                .args(vec![Arg::required(MEASURE)])
                .backends(BW),
        );
    }

    fn register_math_functions(&mut self) {
        use FunctionKind::*;

        for (kind, syntax, description) in [
            (Abs, "ABS(number)", "Absolute value"),
            (Sqrt, "SQRT(number)", "Square root"),
            (Log, "LOG(number)", "Natural logarithm"),
            (Log10, "LOG10(number)", "Base-10 logarithm"),
            (Exp, "EXP(number)", "e raised to number"),
            (Floor, "FLOOR(number)", "Round down to an integer"),
            (Ceil, "CEIL(number)", "Round up to an integer"),
        ] {
            self.register(
                FormulaItem::new(kind, syntax, description).args(vec![Arg::required(NUMBER)]),
            );
        }

        self.register(
            FormulaItem::new(Mod, "MOD(number, divisor)", "Remainder of a division")
                .args(vec![Arg::required(NUMBER), Arg::required(NUMBER)]),
        );

        for (kind, syntax, description) in [
            (Round, "ROUND(number, [digits])", "Round to a number of decimal digits"),
            (Trunc, "TRUNC(number, [digits])", "Truncate to a number of decimal digits"),
        ] {
            self.register(
                FormulaItem::new(kind, syntax, description)
                    .args(vec![Arg::required(NUMBER), Arg::optional(NUMBER)]),
            );
        }

        for (kind, syntax, description) in [
            (Min, "MIN(number, ...)", "Smallest value"),
            (Max, "MAX(number, ...)", "Largest value"),
        ] {
            self.register(
                FormulaItem::new(kind, syntax, description)
                    .args(vec![Arg::required(NUMBER)])
                    .variadic(),
            );
        }

        self.register(
            FormulaItem::new(Int, "INT(value)", "Convert to an integer")
                .args(vec![Arg::required(NUMBER_OR_BOOLEAN)]),
        );
        self.register(
            FormulaItem::new(Float, "FLOAT(value)", "Convert to a floating point number")
                .args(vec![Arg::required(NUMBER_OR_BOOLEAN)]),
        );
    }

    fn register_text_functions(&mut self) {
        use FunctionKind::*;

        for (kind, syntax, description) in [
            (Length, "LENGTH(text)", "Number of characters"),
            (Upper, "UPPER(text)", "Upper-case text"),
            (Lower, "LOWER(text)", "Lower-case text"),
        ] {
            self.register(
                FormulaItem::new(kind, syntax, description)
                    .args(vec![Arg::required(STRING)])
                    .strings_gated()
                    .dimensions(DimensionUsage::Gated),
            );
        }

        self.register(
            FormulaItem::new(Concat, "CONCAT(text, text, ...)", "Join texts")
                .args(vec![Arg::required(STRING), Arg::required(STRING)])
                .variadic()
                .strings_gated()
                .dimensions(DimensionUsage::Gated),
        );
        self.register(
            FormulaItem::new(Like, "LIKE(text, pattern)", "Pattern match with % and _")
                .args(vec![Arg::required(STRING), Arg::required(STRING)])
                .backends(HANA)
                .strings_gated()
                .dimensions(DimensionUsage::Gated),
        );
        self.register(
            FormulaItem::new(Substring, "SUBSTRING(text, start, [length])", "Part of a text")
                .args(vec![
                    Arg::required(STRING),
                    Arg::required(NUMBER),
                    Arg::optional(NUMBER),
                ])
                .strings_gated()
                .dimensions(DimensionUsage::Gated),
        );
        self.register(
            FormulaItem::new(
                Replace,
                "REPLACE(text, search, replacement, [occurrence])",
                "Replace occurrences of search",
            )
            .args(vec![
                Arg::required(STRING),
                Arg::required(STRING),
                Arg::required(STRING),
                Arg::optional(NUMBER),
            ])
            .arity(Arity::Either(3, 4))
            .strings_gated()
            .dimensions(DimensionUsage::Gated),
        );
    }

    fn register_date_functions(&mut self) {
        use FunctionKind::*;

        self.register(
            FormulaItem::new(
                DateDiffHana,
                "DATEDIFF(date, date, [\"Day\"|\"Month\"|\"Year\"])",
                "Difference between two dates in the given granularity",
            )
            .args(vec![
                Arg::required(DATE),
                Arg::required(DATE),
                Arg::optional(STRING),
            ])
            .backends(HANA)
            .feature(Feature::DateFunctions)
            .dimensions(DimensionUsage::Always),
        );
        self.register(
            FormulaItem::new(DateDiffBw, "DATEDIFF(date, date)", "Days between two dates")
                .args(vec![Arg::required(DATE), Arg::required(DATE)])
                .backends(BW)
                .feature(Feature::DateFunctions)
                .dimensions(DimensionUsage::Always),
        );

        for (kind, syntax) in [
            (CalcDaysBetween, "CALCDAYSBETWEEN(date, date)"),
            (CalcMonthsBetween, "CALCMONTHSBETWEEN(date, date)"),
            (CalcYearsBetween, "CALCYEARSBETWEEN(date, date)"),
        ] {
            self.register(
                FormulaItem::new(kind, syntax, "First date minus second date")
                    .args(vec![Arg::required(DATE), Arg::required(DATE)])
                    .feature(Feature::DateFunctions)
                    .dimensions(DimensionUsage::Always)
                    .internal(),
            );
        }
    }

    fn register_olap_functions(&mut self) {
        use FunctionKind::*;

        self.register(
            FormulaItem::new(
                Restrict,
                "RESTRICT(measure, filter, ...)",
                "Measure restricted to dimension members",
            )
            .args(vec![Arg::required(MEASURE), Arg::required(FILTER)])
            .variadic()
            .dimensions(DimensionUsage::Filter),
        );
        self.register(
            FormulaItem::new(GrandTotal, "GRANDTOTAL(measure)", "Measure over all members")
                .args(vec![Arg::required(MEASURE)]),
        );
        self.register(
            FormulaItem::new(
                Subtotal,
                "SUBTOTAL(measure, dimension, ...)",
                "Measure aggregated over the given dimensions",
            )
            .args(vec![Arg::required(MEASURE), Arg::required(DIMENSION)])
            .variadic()
            .dimensions(DimensionUsage::Always),
        );
        self.register(
            FormulaItem::new(SubtotalByIds, "SUBTOTALBYIDS(measure, {ids})", "Subtotal primitive")
                .args(vec![Arg::required(MEASURE), Arg::required(LIST)])
                .internal(),
        );
        self.register(
            FormulaItem::new(
                PercentOfGrandTotal,
                "PERCENTOFGRANDTOTAL(measure)",
                "Share of the grand total",
            )
            .args(vec![Arg::required(MEASURE)])
            .feature(Feature::PercentageFunctions),
        );
        self.register(
            FormulaItem::new(
                PercentOfSubtotal,
                "PERCENTOFSUBTOTAL(measure, dimension, ...)",
                "Share of the subtotal over the given dimensions",
            )
            .args(vec![Arg::required(MEASURE), Arg::required(DIMENSION)])
            .variadic()
            .feature(Feature::PercentageFunctions)
            .dimensions(DimensionUsage::Always),
        );
    }
}
