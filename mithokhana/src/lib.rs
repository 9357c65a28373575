//! # Mitho Khana
//!
//! A recipe sharing catalog with TF-IDF relevance search.
//!
//! Mitho Khana provides:
//! - **Recipe catalog** with ingredients, media, categories, regions and festivals
//! - **Social features**: likes, bookmarks, threaded comments, chef profiles
//! - **Recommendations** from users with overlapping likes
//! - **Relevance search**: substring filtering ranked by TF-IDF cosine similarity
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mithokhana::{ListingQuery, Searcher, Store};
//!
//! let store = Store::open("~/.cache/mithokhana/recipes.sqlite").unwrap();
//! mithokhana::Importer::new(&store).import_file("seed.yaml").unwrap();
//!
//! let listing = Searcher::new(&store)
//!     .list(&ListingQuery::text("chicken curry"))
//!     .unwrap();
//! for recipe in listing.recipes() {
//!     println!("{}", recipe.title);
//! }
//! if let Some(notice) = listing.notice {
//!     println!("{}", notice);
//! }
//! ```
//!
//! The ranker works on anything implementing [`HasText`], without a store:
//!
//! ```
//! use mithokhana::{Document, RelevanceRanker};
//!
//! let corpus = vec![
//!     Document::new(1, "Chicken Curry", "spicy chicken curry with rice"),
//!     Document::new(2, "Fruit Salad", "mixed fruit with honey"),
//!     Document::new(3, "Chicken Soup", "light chicken broth"),
//! ];
//! let outcome = RelevanceRanker::default().rank("chicken curry", &corpus);
//! let ids: Vec<i64> = outcome.documents().iter().map(|d| d.id).collect();
//! assert_eq!(ids, vec![1, 3]);
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod festival;
pub mod import;
pub mod search;
pub mod social;
pub mod store;

// Re-exports for convenience
pub use catalog::{Catalog, IngredientDraft, RecipeDraft, RecipeDetail};
pub use config::Config;
pub use error::{Error, Result};
pub use import::{ImportStats, Importer};
pub use search::{
    Document, HasText, Listing, ListingQuery, Notice, RankOutcome, RankerConfig,
    RelevanceRanker, Searcher,
};
pub use social::{ChefRegistration, Social};
pub use store::{RecipeFilter, Store};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default database path
pub fn default_db_path() -> std::path::PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("mithokhana")
        .join("recipes.sqlite")
}

/// Shorten text to at most `max_chars` characters, adding an ellipsis when cut.
///
/// # Examples
/// ```
/// use mithokhana::truncate_chars;
///
/// assert_eq!(truncate_chars("Sel Roti", 20), "Sel Roti");
/// assert_eq!(truncate_chars("Spicy chicken curry", 5), "Spicy…");
/// ```
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_db_path() {
        let path = default_db_path();
        assert!(path.ends_with("mithokhana/recipes.sqlite"));
    }

    #[test]
    fn test_truncate_chars_unicode() {
        assert_eq!(truncate_chars("सेल रोटी", 3), "सेल…");
        assert_eq!(truncate_chars("", 3), "");
    }
}
