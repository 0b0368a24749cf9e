//! Metadata model consumed by the compiler
//!
//! The compiler never talks to the OLAP model directly. It resolves names through
//! a [`MetadataProvider`]; [`MetadataSnapshot`] is the in-memory implementation and
//! [`StructureMembers`] is the one-shot loading boundary in front of it.

mod loader;
mod snapshot;

pub use loader::StructureMembers;
pub use snapshot::MetadataSnapshot;

use crate::error::Error;
use crate::types::DataType;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// OLAP datasource backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Backend {
    Hana,
    Bw,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Hana, Backend::Bw];
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Hana => "HANA",
            Backend::Bw => "BW",
        })
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hana" => Ok(Backend::Hana),
            "bw" => Ok(Backend::Bw),
            _ => Err(Error::UnknownBackend(s.to_string())),
        }
    }
}

/// A dimension of the OLAP model
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dimension {
    pub id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub alias: Option<String>,
    #[cfg_attr(feature = "serde", serde(default = "default_key_field"))]
    pub key_field: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub hierarchies: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub properties: Vec<String>,
    /// Numeric or date-like dimension (time, fiscal period)
    #[cfg_attr(feature = "serde", serde(default))]
    pub date_like: bool,
    /// The planning version dimension
    #[cfg_attr(feature = "serde", serde(default))]
    pub version: bool,
}

#[cfg(feature = "serde")]
fn default_key_field() -> String {
    "ID".to_string()
}

impl Dimension {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            alias: None,
            key_field: "ID".to_string(),
            hierarchies: Vec::new(),
            properties: Vec::new(),
            date_like: false,
            version: false,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_hierarchy(mut self, id: impl Into<String>) -> Self {
        self.hierarchies.push(id.into());
        self
    }

    pub fn with_property(mut self, id: impl Into<String>) -> Self {
        self.properties.push(id.into());
        self
    }

    pub fn date_like(mut self) -> Self {
        self.date_like = true;
        self
    }

    pub fn version(mut self) -> Self {
        self.version = true;
        self
    }

    pub fn has_property(&self, id: &str) -> bool {
        self.properties.iter().any(|p| p == id)
    }

    pub fn has_hierarchy(&self, id: &str) -> bool {
        self.hierarchies.iter().any(|h| h == id)
    }

    /// Type of a reference to this dimension without a suffix
    pub fn data_type(&self) -> DataType {
        if self.date_like {
            DataType::DateDimension
        } else {
            DataType::Dimension
        }
    }
}

/// Visibility of a measure in the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

/// A measure of the OLAP model
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Measure {
    pub id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub alias: Option<String>,
    #[cfg_attr(feature = "serde", serde(default = "default_value_type"))]
    pub value_type: DataType,
    #[cfg_attr(feature = "serde", serde(default))]
    pub visibility: Visibility,
    /// Canonical formula text of a calculated measure
    #[cfg_attr(feature = "serde", serde(default))]
    pub formula: Option<String>,
}

#[cfg(feature = "serde")]
fn default_value_type() -> DataType {
    DataType::Number
}

impl Measure {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            alias: None,
            value_type: DataType::Number,
            visibility: Visibility::Visible,
            formula: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    pub fn with_value_type(mut self, value_type: DataType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visibility = Visibility::Hidden;
        self
    }

    pub fn is_hidden(&self) -> bool {
        self.visibility == Visibility::Hidden
    }
}

/// Name resolution against the OLAP model
///
/// Names resolve by id first, then by alias.
pub trait MetadataProvider {
    fn resolve_dimension(&self, name: &str) -> Option<Arc<Dimension>>;

    fn resolve_measure(&self, name: &str) -> Option<Arc<Measure>>;

    fn all_measures(&self) -> Vec<Arc<Measure>>;

    fn all_dimensions(&self) -> Vec<Arc<Dimension>>;

    /// Ids of the measures referenced by the formula of `measure_id`
    fn dependent_measure_ids(&self, measure_id: &str) -> Vec<String>;

    fn backend(&self) -> Backend;
}
