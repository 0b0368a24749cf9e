//! # measure-formula
//!
//! Calculation-formula compiler for BI measures.
//!
//! This crate provides:
//! - Formula parsing (canonical text → parse trace)
//! - A registry of operators and functions with argument contracts
//! - Typed expression trees, validated call by call as they are built
//! - Constant folding and structural rewrites (`IN`, `DATEDIFF`, `SUBTOTAL`...)
//! - Restricted-measure derivation and a cyclical-dependency guard
//! - Locale-aware display text and editor tokens
//!
//! ## Example
//!
//! ```rust
//! use measure_formula::{CompileContext, Compiler, CompilerEnvironment};
//! use measure_formula_core::{Backend, Dimension, Measure, MetadataSnapshot};
//!
//! let env = CompilerEnvironment::default();
//! let model = MetadataSnapshot::new(Backend::Hana)
//!     .with_measure(Measure::new("Sales"))
//!     .with_dimension(Dimension::new("City"));
//! let compiler = Compiler::new(&env, &model);
//!
//! let compiled = compiler
//!     .compile(r#"RESTRICT([Sales], [d/City] = "Paris")"#, &CompileContext::new())
//!     .unwrap();
//! assert_eq!(compiled.derived_measures.len(), 1);
//! ```

pub mod ast;
pub mod builder;
pub mod compiler;
pub mod config;
pub mod dependency;
pub mod editor;
pub mod engine;
pub mod error;
pub mod filter;
pub mod functions;
pub mod lexer;
pub mod node;
pub mod parser;
pub mod presentation;
pub mod scanner;
pub mod validation;

pub use ast::{BinaryOperator, FormulaExpr, UnaryOperator};
pub use builder::TreeBuilder;
pub use compiler::{CompileContext, CompiledFormula, Compiler};
pub use config::{CompilerConfig, CompilerEnvironment, DateOrder, Locale};
pub use dependency::{check_cyclical_dependency, DependencyGraph};
pub use editor::EditorBridge;
pub use error::{FormulaError, FormulaResult};
pub use filter::MemberFilter;
pub use functions::{FormulaItem, FormulaRegistry, FunctionKind};
pub use node::{ExpressionNode, Literal};
pub use parser::parse_formula;
pub use presentation::{to_canonical_text, to_display_text, FormulaText};
pub use scanner::{tokenize, Direction, Token, TokenKind};
pub use validation::ValidationPipeline;
