//! Validation messages and the closed taxonomy of error codes
//!
//! Validation never raises: every finding becomes a [`ValidationMessage`] that is
//! collected into [`ValidationMessages`] for the current compile call.

use std::fmt;

/// Message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        })
    }
}

/// Error codes, grouped by the phase that reports them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCode {
    // === Syntax ===
    SyntaxError,
    NestingTooDeep,

    // === Member / field resolution ===
    InvalidMeasure,
    InvalidDimension,
    InvalidProperty,
    InvalidHierarchy,
    InvalidSecondField,

    // === Argument shape ===
    FunctionInvalid,
    TooFewArguments,
    TooManyArguments,
    ArgumentCountMismatch,
    TypeMismatch,
    TypeMismatchPair,
    MixedList,
    StringNotSupported,
    DimensionNotSupported,
    NonUniqueDimension,
    TooManyHierarchicalDimensions,
    VersionDimensionNotAllowed,
    SingleValueFilterRequired,
    SameTypeMismatch,
    InvalidFilter,
    InvalidGranularity,
    DuplicateMember,

    // === Function domain ===
    DivideByZero,
    LogDomain,
    SqrtDomain,
    PowerZeroNegative,
    PowerNegativeFractional,

    // === Structure ===
    CyclicalDependency,
    StringAtRoot,
    NonNumericRoot,

    // === Presentation ===
    WrongDecimalSeparator,
    WrongArgumentSeparator,
}

impl ErrorCode {
    /// Numeric error code
    pub fn number(self) -> u32 {
        match self {
            ErrorCode::SyntaxError => 1000,
            ErrorCode::NestingTooDeep => 1001,
            ErrorCode::InvalidMeasure => 2001,
            ErrorCode::InvalidDimension => 2002,
            ErrorCode::InvalidProperty => 2003,
            ErrorCode::InvalidHierarchy => 2004,
            ErrorCode::InvalidSecondField => 2005,
            ErrorCode::FunctionInvalid => 3000,
            ErrorCode::TooFewArguments => 3001,
            ErrorCode::TooManyArguments => 3002,
            ErrorCode::ArgumentCountMismatch => 3003,
            ErrorCode::TypeMismatch => 3004,
            ErrorCode::TypeMismatchPair => 3005,
            ErrorCode::MixedList => 3006,
            ErrorCode::StringNotSupported => 3007,
            ErrorCode::DimensionNotSupported => 3008,
            ErrorCode::NonUniqueDimension => 3009,
            ErrorCode::TooManyHierarchicalDimensions => 3010,
            ErrorCode::VersionDimensionNotAllowed => 3011,
            ErrorCode::SingleValueFilterRequired => 3012,
            ErrorCode::SameTypeMismatch => 3013,
            ErrorCode::InvalidFilter => 3014,
            ErrorCode::InvalidGranularity => 3015,
            ErrorCode::DuplicateMember => 3016,
            ErrorCode::DivideByZero => 4001,
            ErrorCode::LogDomain => 4002,
            ErrorCode::SqrtDomain => 4003,
            ErrorCode::PowerZeroNegative => 4004,
            ErrorCode::PowerNegativeFractional => 4005,
            ErrorCode::CyclicalDependency => 5001,
            ErrorCode::StringAtRoot => 5002,
            ErrorCode::NonNumericRoot => 5003,
            ErrorCode::WrongDecimalSeparator => 6001,
            ErrorCode::WrongArgumentSeparator => 6002,
        }
    }

    /// String code ("kind")
    pub fn kind(self) -> &'static str {
        match self {
            ErrorCode::SyntaxError => "SYNTAX_ERROR",
            ErrorCode::NestingTooDeep => "NESTING_TOO_DEEP",
            ErrorCode::InvalidMeasure => "INVALID_MEASURE",
            ErrorCode::InvalidDimension => "INVALID_DIMENSION",
            ErrorCode::InvalidProperty => "INVALID_PROPERTY",
            ErrorCode::InvalidHierarchy => "INVALID_HIERARCHY",
            ErrorCode::InvalidSecondField => "INVALID_SECOND_FIELD",
            ErrorCode::FunctionInvalid => "FUNCTION_INVALID",
            ErrorCode::TooFewArguments => "TOO_FEW_ARGUMENTS",
            ErrorCode::TooManyArguments => "TOO_MANY_ARGUMENTS",
            ErrorCode::ArgumentCountMismatch => "ARGUMENT_COUNT_MISMATCH",
            ErrorCode::TypeMismatch => "TYPE_MISMATCH",
            ErrorCode::TypeMismatchPair => "TYPE_MISMATCH_PAIR",
            ErrorCode::MixedList => "MIXED_LIST",
            ErrorCode::StringNotSupported => "STRING_NOT_SUPPORTED",
            ErrorCode::DimensionNotSupported => "DIMENSION_NOT_SUPPORTED",
            ErrorCode::NonUniqueDimension => "NON_UNIQUE_DIMENSION",
            ErrorCode::TooManyHierarchicalDimensions => "TOO_MANY_HIERARCHICAL_DIMENSIONS",
            ErrorCode::VersionDimensionNotAllowed => "VERSION_DIMENSION_NOT_ALLOWED",
            ErrorCode::SingleValueFilterRequired => "SINGLE_VALUE_FILTER_REQUIRED",
            ErrorCode::SameTypeMismatch => "SAME_TYPE_MISMATCH",
            ErrorCode::InvalidFilter => "INVALID_FILTER",
            ErrorCode::InvalidGranularity => "INVALID_GRANULARITY",
            ErrorCode::DuplicateMember => "DUPLICATE_MEMBER",
            ErrorCode::DivideByZero => "DIVIDE_BY_ZERO",
            ErrorCode::LogDomain => "LOG_DOMAIN",
            ErrorCode::SqrtDomain => "SQRT_DOMAIN",
            ErrorCode::PowerZeroNegative => "POWER_ZERO_NEGATIVE",
            ErrorCode::PowerNegativeFractional => "POWER_NEGATIVE_FRACTIONAL",
            ErrorCode::CyclicalDependency => "CYCLICAL_DEPENDENCY",
            ErrorCode::StringAtRoot => "STRING_AT_ROOT",
            ErrorCode::NonNumericRoot => "NON_NUMERIC_ROOT",
            ErrorCode::WrongDecimalSeparator => "WRONG_DECIMAL_SEPARATOR",
            ErrorCode::WrongArgumentSeparator => "WRONG_ARGUMENT_SEPARATOR",
        }
    }

    /// Severity a message with this code is reported at
    pub fn default_severity(self) -> Severity {
        match self {
            ErrorCode::DuplicateMember => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationMessage {
    pub severity: Severity,
    pub code: ErrorCode,
    pub text: String,
}

impl ValidationMessage {
    /// Create a message at the code's default severity
    pub fn new(code: ErrorCode, text: impl Into<String>) -> Self {
        Self {
            severity: code.default_severity(),
            code,
            text: text.into(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// String code ("kind")
    pub fn kind(&self) -> &'static str {
        self.code.kind()
    }

    /// Numeric error code
    pub fn number(&self) -> u32 {
        self.code.number()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} {}]: {}",
            self.severity,
            self.code.kind(),
            self.code.number(),
            self.text
        )
    }
}

/// Messages accumulated during one compile or validate call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationMessages {
    messages: Vec<ValidationMessage>,
}

impl ValidationMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ValidationMessage) {
        self.messages.push(message);
    }

    /// Record a message at the code's default severity
    pub fn report(&mut self, code: ErrorCode, text: impl Into<String>) {
        self.push(ValidationMessage::new(code, text));
    }

    pub fn extend(&mut self, other: ValidationMessages) {
        self.messages.extend(other.messages);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(ValidationMessage::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationMessage> {
        self.messages.iter().filter(|m| m.is_error())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationMessage> {
        self.messages.iter()
    }

    /// Codes in report order
    pub fn codes(&self) -> Vec<ErrorCode> {
        self.messages.iter().map(|m| m.code).collect()
    }

    pub fn contains(&self, code: ErrorCode) -> bool {
        self.messages.iter().any(|m| m.code == code)
    }

    pub fn into_vec(self) -> Vec<ValidationMessage> {
        self.messages
    }
}

impl IntoIterator for ValidationMessages {
    type Item = ValidationMessage;
    type IntoIter = std::vec::IntoIter<ValidationMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationMessages {
    type Item = &'a ValidationMessage;
    type IntoIter = std::slice::Iter<'a, ValidationMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

impl FromIterator<ValidationMessage> for ValidationMessages {
    fn from_iter<I: IntoIterator<Item = ValidationMessage>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

impl From<ValidationMessage> for ValidationMessages {
    fn from(message: ValidationMessage) -> Self {
        Self {
            messages: vec![message],
        }
    }
}

impl fmt::Display for ValidationMessages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, message) in self.messages.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let codes = [
            ErrorCode::SyntaxError,
            ErrorCode::InvalidMeasure,
            ErrorCode::FunctionInvalid,
            ErrorCode::TooFewArguments,
            ErrorCode::DivideByZero,
            ErrorCode::CyclicalDependency,
            ErrorCode::WrongDecimalSeparator,
        ];
        let mut numbers: Vec<u32> = codes.iter().map(|c| c.number()).collect();
        numbers.sort_unstable();
        numbers.dedup();
        assert_eq!(numbers.len(), codes.len());
    }

    #[test]
    fn test_accumulation() {
        let mut messages = ValidationMessages::new();
        assert!(!messages.has_errors());

        messages.report(ErrorCode::DuplicateMember, "\"Paris\" listed twice");
        assert!(!messages.has_errors());

        messages.report(ErrorCode::DivideByZero, "Division by zero");
        assert!(messages.has_errors());
        assert_eq!(
            messages.codes(),
            vec![ErrorCode::DuplicateMember, ErrorCode::DivideByZero]
        );
        assert_eq!(messages.errors().count(), 1);
    }

    #[test]
    fn test_display() {
        let message = ValidationMessage::new(ErrorCode::StringAtRoot, "Formula returns a string");
        assert_eq!(
            message.to_string(),
            "error [STRING_AT_ROOT 5002]: Formula returns a string"
        );
    }
}
