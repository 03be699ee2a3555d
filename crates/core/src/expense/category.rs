//! Category suggestion matching.

use super::types::Category;

/// Picks the user category that a suggested name refers to.
pub trait CategoryResolver: Send + Sync {
    /// Returns the matching category, if any.
    fn resolve<'a>(&self, suggestion: &str, categories: &'a [Category]) -> Option<&'a Category>;
}

/// Exact name match; the first category in list order wins.
///
/// Surrounding whitespace in the suggestion is ignored. Case is not.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactNameResolver;

impl CategoryResolver for ExactNameResolver {
    fn resolve<'a>(&self, suggestion: &str, categories: &'a [Category]) -> Option<&'a Category> {
        let suggestion = suggestion.trim();
        categories.iter().find(|category| category.name == suggestion)
    }
}
