//! Category module - the fixed top-level taxonomy

use serde::{Deserialize, Serialize};

/// Top-level category of a knowledge item
///
/// The set is closed: classification always lands on one of these four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Tools, systems, engineering
    Technology,

    /// Markets, strategy, finance, organisations
    Business,

    /// Processes, frameworks, ways of working
    Methodology,

    /// Everything else; the fallback bucket
    #[default]
    General,
}

impl Category {
    /// All categories in declaration order
    pub const ALL: [Category; 4] = [
        Category::Technology,
        Category::Business,
        Category::Methodology,
        Category::General,
    ];

    /// Get the category name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Technology => "technology",
            Category::Business => "business",
            Category::Methodology => "methodology",
            Category::General => "general",
        }
    }

    /// Parse a category from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "technology" => Some(Category::Technology),
            "business" => Some(Category::Business),
            "methodology" => Some(Category::Methodology),
            "general" => Some(Category::General),
            _ => None,
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid category: {}", s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured refinement of a category, matched by keywords
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    /// Identifier referenced by items
    pub id: String,

    /// Parent category
    pub category: Category,

    /// Display name
    pub name: String,

    /// Keywords compared against item tags
    pub keywords: Vec<String>,
}

impl Subcategory {
    /// Create a subcategory
    pub fn new(
        id: impl Into<String>,
        category: Category,
        name: impl Into<String>,
        keywords: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            category,
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::parse(category.as_str()), Some(category));
        }
        assert_eq!(Category::parse(" Business "), Some(Category::Business));
        assert_eq!(Category::parse("science"), None);
    }

    #[test]
    fn test_default_is_general() {
        assert_eq!(Category::default(), Category::General);
    }
}
