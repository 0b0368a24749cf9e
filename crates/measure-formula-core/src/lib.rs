//! # measure-formula-core
//!
//! Core data structures for the measure-formula compiler.
//!
//! This crate provides the fundamental types used throughout measure-formula:
//! - [`DataType`] and [`TypeSystem`] - Type tags, subtyping and compatibility groups
//! - [`FieldReference`] - Bracketed field syntax (`[d/City].[p/Region]`, `[Sales]`)
//! - [`ValidationMessage`] - The closed taxonomy of validation codes
//! - [`MetadataProvider`] - The resolver the compiler consults for dimensions and measures
//!
//! ## Example
//!
//! ```rust
//! use measure_formula_core::{DataType, FeatureFlags, FieldReference, TypeSystem};
//!
//! let types = TypeSystem::new(&FeatureFlags::default());
//! assert!(DataType::Integer.is_subtype_of(DataType::Number));
//! assert!(types.are_compatible(DataType::Measure, DataType::Number));
//!
//! let field = FieldReference::parse("[d/City].[p/Region]").unwrap();
//! assert_eq!(field.id, "City");
//! ```

pub mod error;
pub mod field;
pub mod flags;
pub mod message;
pub mod metadata;
pub mod types;

pub use error::{Error, Result};
pub use field::{FieldKind, FieldReference, FieldSuffix, SuffixKind};
pub use flags::{Feature, FeatureFlags};
pub use message::{ErrorCode, Severity, ValidationMessage, ValidationMessages};
pub use metadata::{
    Backend, Dimension, Measure, MetadataProvider, MetadataSnapshot, StructureMembers,
    Visibility,
};
pub use types::{CompatibilityGroup, DataType, TypeSystem};
