//! Tag-based category and subcategory assignment

use crate::types::Classification;
use sift_domain::{Category, Subcategory};

/// Normalized scores below this fall back to the default category
pub const MIN_MATCH_SCORE: f64 = 0.1;

/// Tag to category table used when no subcategories are configured
const TAG_CATEGORIES: &[(&str, Category)] = &[
    ("ai", Category::Technology),
    ("api", Category::Technology),
    ("architecture", Category::Technology),
    ("cloud", Category::Technology),
    ("database", Category::Technology),
    ("devops", Category::Technology),
    ("infrastructure", Category::Technology),
    ("kubernetes", Category::Technology),
    ("machine learning", Category::Technology),
    ("programming", Category::Technology),
    ("rust", Category::Technology),
    ("security", Category::Technology),
    ("software", Category::Technology),
    ("technology", Category::Technology),
    ("business", Category::Business),
    ("customer", Category::Business),
    ("finance", Category::Business),
    ("leadership", Category::Business),
    ("management", Category::Business),
    ("marketing", Category::Business),
    ("pricing", Category::Business),
    ("revenue", Category::Business),
    ("sales", Category::Business),
    ("strategy", Category::Business),
    ("agile", Category::Methodology),
    ("best practices", Category::Methodology),
    ("framework", Category::Methodology),
    ("kanban", Category::Methodology),
    ("lean", Category::Methodology),
    ("methodology", Category::Methodology),
    ("process", Category::Methodology),
    ("scrum", Category::Methodology),
    ("workflow", Category::Methodology),
];

/// Assign a category and subcategory to a set of tags
///
/// With subcategories configured, each is scored against the tags: `+2` per
/// exact keyword match and `+1` per substring containment in either
/// direction, normalized by `keywords + tags`. The best score wins, ties
/// going to the earlier subcategory. Scores under [`MIN_MATCH_SCORE`] fall
/// back to the first `general` subcategory.
///
/// Without subcategories, tags vote through a static lookup table.
///
/// # Examples
///
/// ```
/// use sift_domain::{Category, Subcategory};
/// use sift_extractor::classifier::classify;
///
/// let subs = vec![Subcategory::new("lang", Category::Technology, "Languages", &["rust", "go"])];
/// let result = classify(&["Rust".to_string()], &subs);
/// assert_eq!(result.category, Category::Technology);
/// assert_eq!(result.subcategory_id.as_deref(), Some("lang"));
/// ```
pub fn classify(tags: &[String], subcategories: &[Subcategory]) -> Classification {
    if subcategories.is_empty() {
        return Classification {
            category: lookup_category(tags),
            subcategory_id: None,
        };
    }

    let tags: Vec<String> = tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    let mut best: Option<(&Subcategory, f64)> = None;
    for sub in subcategories {
        let score = match_score(&tags, &sub.keywords);
        if best.is_none_or(|(_, b)| score > b) {
            best = Some((sub, score));
        }
    }

    match best {
        Some((sub, score)) if score >= MIN_MATCH_SCORE => Classification {
            category: sub.category,
            subcategory_id: Some(sub.id.clone()),
        },
        _ => fallback(subcategories),
    }
}

fn match_score(tags: &[String], keywords: &[String]) -> f64 {
    let denominator = keywords.len() + tags.len();
    if denominator == 0 || tags.is_empty() {
        return 0.0;
    }

    let mut points = 0u32;
    for keyword in keywords {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            continue;
        }
        for tag in tags {
            if *tag == keyword {
                points += 2;
            } else if tag.contains(&keyword) || keyword.contains(tag.as_str()) {
                points += 1;
            }
        }
    }
    points as f64 / denominator as f64
}

fn fallback(subcategories: &[Subcategory]) -> Classification {
    let default = Category::default();
    Classification {
        category: default,
        subcategory_id: subcategories
            .iter()
            .find(|s| s.category == default)
            .map(|s| s.id.clone()),
    }
}

fn lookup_category(tags: &[String]) -> Category {
    let mut votes = [0usize; Category::ALL.len()];
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if let Some((_, category)) = TAG_CATEGORIES.iter().find(|(t, _)| *t == tag) {
            if let Some(slot) = Category::ALL.iter().position(|c| c == category) {
                votes[slot] += 1;
            }
        }
    }

    let mut winner = Category::default();
    let mut most = 0;
    for (category, count) in Category::ALL.iter().zip(votes) {
        if count > most {
            most = count;
            winner = *category;
        }
    }
    winner
}
