//! Recipe listing and search
//!
//! A listing narrows the store to a candidate set (structured filters in
//! SQL, then a case-insensitive substring match on title or description)
//! and hands the candidates to the [`RelevanceRanker`].

pub mod ranker;
pub mod stopwords;
pub mod vectorizer;

pub use ranker::{
    Document, HasText, Notice, RankOutcome, RankerConfig, RelevanceRanker, ScoredDocument,
    DEFAULT_THRESHOLD,
};
pub use stopwords::{StopWords, ENGLISH_STOP_WORDS};
pub use vectorizer::{cosine_similarity, SparseVector, TfidfVectorizer, VectorizeError};

use crate::error::Result;
use crate::store::{Recipe, RecipeFilter, Store};
use rand::seq::SliceRandom;
use rand::Rng;

impl HasText for Recipe {
    fn text(&self) -> (&str, &str) {
        (&self.title, &self.description)
    }
}

/// Parameters of a recipe listing request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingQuery {
    /// Free-text query; blank means "no text search"
    pub query: String,
    pub category: Option<i64>,
    pub region: Option<i64>,
    pub festival: Option<i64>,
}

impl ListingQuery {
    pub fn text(query: impl Into<String>) -> Self {
        ListingQuery {
            query: query.into(),
            ..Default::default()
        }
    }

    fn filter(&self) -> RecipeFilter {
        RecipeFilter {
            category: self.category,
            region: self.region,
            festival: self.festival,
        }
    }
}

/// A listed recipe with its relevance when the listing was ranked
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingHit {
    #[serde(flatten)]
    pub recipe: Recipe,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Output of a listing request
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Listing {
    pub hits: Vec<ListingHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

impl Listing {
    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.hits.iter().map(|hit| &hit.recipe)
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Listing searcher bound to a store
pub struct Searcher<'a> {
    store: &'a Store,
    ranker: RelevanceRanker,
}

impl<'a> Searcher<'a> {
    /// Create a searcher with the default ranker
    pub fn new(store: &'a Store) -> Self {
        Self::with_ranker(store, RelevanceRanker::default())
    }

    pub fn with_ranker(store: &'a Store, ranker: RelevanceRanker) -> Self {
        Searcher { store, ranker }
    }

    /// List recipes matching `query`
    pub fn list(&self, query: &ListingQuery) -> Result<Listing> {
        let text = query.query.trim();
        let mut candidates = self.store.list_recipes(&query.filter())?;

        if !text.is_empty() {
            let needle = text.to_lowercase();
            candidates.retain(|recipe| {
                recipe.title.to_lowercase().contains(&needle)
                    || recipe.description.to_lowercase().contains(&needle)
            });
        }

        tracing::debug!(
            "Listing '{}' with {:?}: {} candidates",
            text,
            query.filter(),
            candidates.len()
        );

        let outcome = self.ranker.rank(text, &candidates);
        let notice = outcome.notice();
        let hits = match &outcome {
            RankOutcome::Ranked(scored) => scored
                .iter()
                .map(|hit| ListingHit {
                    recipe: hit.document.clone(),
                    score: Some(hit.score),
                })
                .collect(),
            _ => outcome
                .documents()
                .into_iter()
                .map(|recipe| ListingHit {
                    recipe: recipe.clone(),
                    score: None,
                })
                .collect(),
        };

        Ok(Listing { hits, notice })
    }

    /// Pick `count` recipes at random among the `pool` most liked
    pub fn popular(&self, pool: usize, count: usize) -> Result<Vec<Recipe>> {
        self.popular_with_rng(pool, count, &mut rand::thread_rng())
    }

    pub fn popular_with_rng<R: Rng + ?Sized>(
        &self,
        pool: usize,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<Recipe>> {
        let mut recipes: Vec<Recipe> = self
            .store
            .most_liked(pool)?
            .into_iter()
            .map(|(recipe, _)| recipe)
            .collect();
        recipes.shuffle(rng);
        recipes.truncate(count);
        Ok(recipes)
    }
}
