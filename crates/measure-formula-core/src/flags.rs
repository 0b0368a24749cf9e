//! Feature flags consulted by the type system and the formula registry

/// A switchable family of formula items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// `PERCENTOFGRANDTOTAL`, `PERCENTOFSUBTOTAL`
    PercentageFunctions,
    /// `DATEDIFF` and its lowered primitives
    DateFunctions,
}

/// Feature flags, loaded once by the host and passed in with the compiler configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct FeatureFlags {
    /// Allow string-typed arguments in text functions and `IF` branches
    pub string_arguments: bool,
    /// Allow dimension references as arguments of non-filter functions
    pub dimension_arguments: bool,
    /// Enable the percentage-of-total functions
    pub percentage_functions: bool,
    /// Enable `DATEDIFF`
    pub date_functions: bool,
    /// Dimensions and dimension members join the string-like compatibility group
    pub string_dimension_compatibility: bool,
    /// Date dimensions join the date-like compatibility group
    pub date_dimension_compatibility: bool,
    /// Dimensions join the filter-like compatibility group
    pub dimension_filter_compatibility: bool,
}

impl FeatureFlags {
    /// Check whether a feature family is switched on
    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::PercentageFunctions => self.percentage_functions,
            Feature::DateFunctions => self.date_functions,
        }
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            string_arguments: true,
            dimension_arguments: true,
            percentage_functions: true,
            date_functions: true,
            string_dimension_compatibility: true,
            date_dimension_compatibility: true,
            dimension_filter_compatibility: true,
        }
    }
}
