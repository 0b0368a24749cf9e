//! Compiler configuration
//!
//! The type system and the formula registry are built once from a
//! [`CompilerConfig`] and shared read-only through a [`CompilerEnvironment`].

use crate::functions::FormulaRegistry;
use measure_formula_core::{FeatureFlags, TypeSystem};

/// Default maximum nesting depth of a formula
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default maximum height of a parsed tree, operator chains included
pub const DEFAULT_MAX_TREE_HEIGHT: usize = 512;

/// Decimal and argument separators of a locale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Locale {
    pub decimal_separator: char,
    pub argument_separator: char,
}

impl Locale {
    /// Separators of canonical formula text
    pub const CANONICAL: Locale = Locale {
        decimal_separator: '.',
        argument_separator: ',',
    };

    /// Separators used by locales with a comma decimal mark
    pub const COMMA_DECIMAL: Locale = Locale {
        decimal_separator: ',',
        argument_separator: ';',
    };

    pub fn is_canonical(&self) -> bool {
        *self == Locale::CANONICAL
    }

    /// Pick the locale for a decimal separator
    pub fn for_decimal_separator(separator: char) -> Locale {
        if separator == ',' {
            Locale::COMMA_DECIMAL
        } else {
            Locale::CANONICAL
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::CANONICAL
    }
}

/// Field order of ambiguous short dates such as `03/04/2024`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DateOrder {
    #[default]
    MonthFirst,
    DayFirst,
}

/// Options for compiling formulas
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct CompilerConfig {
    /// Separators of display text
    pub locale: Locale,
    /// Feature flags consulted by the registry and the type system
    pub flags: FeatureFlags,
    /// Maximum nesting depth of a formula (default: 64)
    pub max_depth: usize,
    /// Maximum height of the parsed tree (default: 512). Flat chains such as
    /// `a + b + c` add one level per operand without nesting.
    pub max_tree_height: usize,
    /// Field order of short-date member literals
    pub date_order: DateOrder,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            locale: Locale::CANONICAL,
            flags: FeatureFlags::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_tree_height: DEFAULT_MAX_TREE_HEIGHT,
            date_order: DateOrder::MonthFirst,
        }
    }
}

/// Configuration plus everything derived from it once at startup
#[derive(Debug, Clone)]
pub struct CompilerEnvironment {
    pub config: CompilerConfig,
    pub types: TypeSystem,
    pub registry: FormulaRegistry,
}

impl CompilerEnvironment {
    pub fn new(config: CompilerConfig) -> Self {
        let types = TypeSystem::new(&config.flags);
        let registry = FormulaRegistry::new(&config.flags);
        Self {
            config,
            types,
            registry,
        }
    }

    pub fn flags(&self) -> &FeatureFlags {
        &self.config.flags
    }

    pub fn locale(&self) -> Locale {
        self.config.locale
    }
}

impl Default for CompilerEnvironment {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}
