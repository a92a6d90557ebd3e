//! Category selector used by list projections.
//!
//! Categories stay open strings on `Task`; the preset list only seeds the
//! picker shown by the view layer.

/// Sentinel selector meaning "every category".
pub const ALL_CATEGORIES: &str = "all";

/// Categories offered by the default task form.
pub const PRESET_CATEGORIES: &[&str] = &["Personal", "Work", "Shopping", "Other"];

/// Parsed category selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(String),
}

impl CategoryFilter {
    /// Parses a selector string; `"all"` maps to [`CategoryFilter::All`].
    ///
    /// Any other value, including the empty string, is an exact-match filter.
    pub fn parse(selector: &str) -> Self {
        if selector == ALL_CATEGORIES {
            Self::All
        } else {
            Self::Only(selector.to_string())
        }
    }

    pub fn matches(&self, category: Option<&str>) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => category == Some(expected.as_str()),
        }
    }
}

impl From<&str> for CategoryFilter {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}
