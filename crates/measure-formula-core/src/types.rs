//! Data type tags, subtyping and compatibility groups
//!
//! Types form a forest: every type has at most one parent and subtyping is the
//! reflexive-transitive closure of the parent links. Compatibility is coarser and
//! is decided by membership in a small number of fixed groups, some of which can be
//! widened or narrowed by [`FeatureFlags`].

use crate::error::Error;
use crate::flags::FeatureFlags;
use ahash::AHashMap;
use once_cell::sync::Lazy;
use std::fmt;
use std::str::FromStr;

/// Data type tag attached to every expression node and argument contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    Unknown,
    Any,
    Boolean,
    Number,
    Integer,
    Measure,
    String,
    Attribute,
    Date,
    Dimension,
    DateDimension,
    DimensionMember,
    DimensionFilter,
    List,
    ListOfString,
    ListOfNumber,
    ListOfMixed,
}

static BY_NAME: Lazy<AHashMap<String, DataType>> = Lazy::new(|| {
    DataType::ALL
        .iter()
        .map(|t| (t.name().to_ascii_lowercase(), *t))
        .collect()
});

impl DataType {
    /// Every data type, in declaration order
    pub const ALL: [DataType; 17] = [
        DataType::Unknown,
        DataType::Any,
        DataType::Boolean,
        DataType::Number,
        DataType::Integer,
        DataType::Measure,
        DataType::String,
        DataType::Attribute,
        DataType::Date,
        DataType::Dimension,
        DataType::DateDimension,
        DataType::DimensionMember,
        DataType::DimensionFilter,
        DataType::List,
        DataType::ListOfString,
        DataType::ListOfNumber,
        DataType::ListOfMixed,
    ];

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            DataType::Unknown => "Unknown",
            DataType::Any => "Any",
            DataType::Boolean => "Boolean",
            DataType::Number => "Number",
            DataType::Integer => "Integer",
            DataType::Measure => "Measure",
            DataType::String => "String",
            DataType::Attribute => "Attribute",
            DataType::Date => "Date",
            DataType::Dimension => "Dimension",
            DataType::DateDimension => "DateDimension",
            DataType::DimensionMember => "DimensionMember",
            DataType::DimensionFilter => "DimensionFilter",
            DataType::List => "List",
            DataType::ListOfString => "ListOfString",
            DataType::ListOfNumber => "ListOfNumber",
            DataType::ListOfMixed => "ListOfMixed",
        }
    }

    /// Look a type up by name (case-insensitive)
    pub fn from_name(name: &str) -> Option<DataType> {
        BY_NAME.get(&name.to_ascii_lowercase()).copied()
    }

    /// Parent in the type forest
    pub fn parent(self) -> Option<DataType> {
        match self {
            DataType::Integer | DataType::Measure => Some(DataType::Number),
            DataType::Attribute => Some(DataType::String),
            DataType::DateDimension | DataType::DimensionMember => Some(DataType::Dimension),
            DataType::DimensionFilter => Some(DataType::Boolean),
            DataType::ListOfString | DataType::ListOfNumber | DataType::ListOfMixed => {
                Some(DataType::List)
            }
            _ => None,
        }
    }

    /// Whether the per-position argument type check applies to this type
    pub fn participates_in_generic_validation(self) -> bool {
        !matches!(self, DataType::Unknown | DataType::Any)
    }

    /// This type followed by its parent chain up to the root
    pub fn ancestors(self) -> impl Iterator<Item = DataType> {
        std::iter::successors(Some(self), |t| t.parent())
    }

    /// Reflexive-transitive subtype check over parent links
    pub fn is_subtype_of(self, other: DataType) -> bool {
        self.ancestors().any(|t| t == other)
    }

    pub fn is_numeric(self) -> bool {
        self.is_subtype_of(DataType::Number)
    }

    pub fn is_boolean(self) -> bool {
        self.is_subtype_of(DataType::Boolean)
    }

    pub fn is_list(self) -> bool {
        self.is_subtype_of(DataType::List)
    }

    /// True for dimension-shaped types (dimension, date dimension, member)
    pub fn is_dimension(self) -> bool {
        self.is_subtype_of(DataType::Dimension)
    }

    /// True for types that carry text (strings and dimension attributes)
    pub fn is_string(self) -> bool {
        self.is_subtype_of(DataType::String) || self == DataType::ListOfString
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::from_name(s).ok_or_else(|| Error::UnknownDataType(s.to_string()))
    }
}

/// Fixed equivalence classes used by the loose compatibility check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompatibilityGroup {
    StringLike,
    NumberLike,
    DateLike,
    FilterLike,
}

impl CompatibilityGroup {
    pub const ALL: [CompatibilityGroup; 4] = [
        CompatibilityGroup::StringLike,
        CompatibilityGroup::NumberLike,
        CompatibilityGroup::DateLike,
        CompatibilityGroup::FilterLike,
    ];

    /// Group members under the given flags
    pub fn members(self, flags: &FeatureFlags) -> &'static [DataType] {
        use DataType::*;
        match self {
            CompatibilityGroup::StringLike if flags.string_dimension_compatibility => {
                &[String, Attribute, Dimension, DimensionMember, ListOfString]
            }
            CompatibilityGroup::StringLike => &[String, Attribute, ListOfString],
            CompatibilityGroup::NumberLike => &[Number, Integer, Measure, ListOfNumber],
            CompatibilityGroup::DateLike if flags.date_dimension_compatibility => {
                &[Date, DateDimension]
            }
            CompatibilityGroup::DateLike => &[Date],
            CompatibilityGroup::FilterLike if flags.dimension_filter_compatibility => {
                &[DimensionFilter, Dimension]
            }
            CompatibilityGroup::FilterLike => &[DimensionFilter],
        }
    }
}

/// The type system: subtyping plus the flag-configured compatibility groups
///
/// Built once from [`FeatureFlags`] and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct TypeSystem {
    groups: Vec<(CompatibilityGroup, &'static [DataType])>,
}

impl TypeSystem {
    /// Build the compatibility groups for the given flags
    pub fn new(flags: &FeatureFlags) -> Self {
        Self {
            groups: CompatibilityGroup::ALL
                .iter()
                .map(|g| (*g, g.members(flags)))
                .collect(),
        }
    }

    pub fn is_subtype_of(&self, sub: DataType, sup: DataType) -> bool {
        sub.is_subtype_of(sup)
    }

    /// Groups a type belongs to, directly or through one of its ancestors
    pub fn groups_of(&self, ty: DataType) -> Vec<CompatibilityGroup> {
        self.groups
            .iter()
            .filter(|(_, members)| ty.ancestors().any(|t| members.contains(&t)))
            .map(|(g, _)| *g)
            .collect()
    }

    /// Loose compatibility: identical, or both fall in a common group
    pub fn are_compatible(&self, a: DataType, b: DataType) -> bool {
        if a == b {
            return true;
        }
        self.groups.iter().any(|(_, members)| {
            a.ancestors().any(|t| members.contains(&t))
                && b.ancestors().any(|t| members.contains(&t))
        })
    }

    /// Strict compatibility: identical types only
    pub fn are_strictly_compatible(&self, a: DataType, b: DataType) -> bool {
        a == b
    }

    /// Whether a value of type `actual` may be passed where `expected` is declared
    pub fn accepts(&self, expected: DataType, actual: DataType) -> bool {
        expected == DataType::Any
            || !actual.participates_in_generic_validation()
            || actual.is_subtype_of(expected)
            || self.are_compatible(actual, expected)
    }
}

impl Default for TypeSystem {
    fn default() -> Self {
        Self::new(&FeatureFlags::default())
    }
}
