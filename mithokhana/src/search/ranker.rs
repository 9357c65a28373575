//! Relevance ranking of a candidate set against a free-text query
//!
//! The ranker is a pure function of `(query, corpus)`. It fits a fresh
//! TF-IDF space on the corpus, scores every document by cosine similarity
//! with the query, keeps the scores above the threshold and orders them
//! best first. Ties keep corpus order.

use super::stopwords::StopWords;
use super::vectorizer::{cosine_similarity, TfidfVectorizer, VectorizeError};
use serde::{Deserialize, Serialize};

/// Minimum similarity a document must exceed to be kept
pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// Anything with a title and a description can be ranked
pub trait HasText {
    /// `(title, description)`
    fn text(&self) -> (&str, &str);
}

/// A minimal rankable record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub description: String,
}

impl Document {
    pub fn new(id: i64, title: impl Into<String>, description: impl Into<String>) -> Self {
        Document {
            id,
            title: title.into(),
            description: description.into(),
        }
    }
}

impl HasText for Document {
    fn text(&self) -> (&str, &str) {
        (&self.title, &self.description)
    }
}

impl<T: HasText + ?Sized> HasText for &T {
    fn text(&self) -> (&str, &str) {
        (**self).text()
    }
}

/// A document paired with its similarity to the query, in [0, 1]
#[derive(Debug)]
pub struct ScoredDocument<'a, D> {
    pub document: &'a D,
    pub score: f64,
}

/// User-facing notice attached to an empty ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    /// Nothing matched the query
    NoResults,
    /// The candidates had no content words to rank by
    TooGeneric,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::NoResults => "No recipes matched your search.",
            Notice::TooGeneric => "Your search input is too generic. Try more specific words.",
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of a ranking call
#[derive(Debug)]
pub enum RankOutcome<'a, D> {
    /// Empty query: the corpus in its original order
    Unranked(Vec<&'a D>),
    /// Documents above the threshold, best first
    Ranked(Vec<ScoredDocument<'a, D>>),
    /// Empty corpus
    NoResults,
    /// No content words in the corpus, or the vector math failed
    TooGeneric,
}

impl<'a, D> RankOutcome<'a, D> {
    /// The documents to show, in order
    pub fn documents(&self) -> Vec<&'a D> {
        match self {
            RankOutcome::Unranked(docs) => docs.clone(),
            RankOutcome::Ranked(hits) => hits.iter().map(|hit| hit.document).collect(),
            RankOutcome::NoResults | RankOutcome::TooGeneric => Vec::new(),
        }
    }

    /// Scores aligned with [`documents`](Self::documents); `None` when unranked
    pub fn scores(&self) -> Option<Vec<f64>> {
        match self {
            RankOutcome::Ranked(hits) => Some(hits.iter().map(|hit| hit.score).collect()),
            RankOutcome::Unranked(_) => None,
            RankOutcome::NoResults | RankOutcome::TooGeneric => Some(Vec::new()),
        }
    }

    /// Notice to surface alongside the documents, if any
    pub fn notice(&self) -> Option<Notice> {
        match self {
            RankOutcome::Unranked(_) => None,
            RankOutcome::Ranked(hits) if hits.is_empty() => Some(Notice::NoResults),
            RankOutcome::Ranked(_) => None,
            RankOutcome::NoResults => Some(Notice::NoResults),
            RankOutcome::TooGeneric => Some(Notice::TooGeneric),
        }
    }

    pub fn is_ranked(&self) -> bool {
        !matches!(self, RankOutcome::Unranked(_))
    }
}

/// Tunables for [`RelevanceRanker`]
#[derive(Debug, Clone, PartialEq)]
pub struct RankerConfig {
    /// Scores must be strictly greater than this
    pub threshold: f64,
    pub stop_words: StopWords,
}

impl Default for RankerConfig {
    fn default() -> Self {
        RankerConfig {
            threshold: DEFAULT_THRESHOLD,
            stop_words: StopWords::english(),
        }
    }
}

/// TF-IDF relevance ranker
#[derive(Debug, Clone, Default)]
pub struct RelevanceRanker {
    config: RankerConfig,
}

impl RelevanceRanker {
    pub fn new(config: RankerConfig) -> Self {
        RelevanceRanker { config }
    }

    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Rank `corpus` against `query`
    pub fn rank<'a, D: HasText>(&self, query: &str, corpus: &'a [D]) -> RankOutcome<'a, D> {
        if query.trim().is_empty() {
            tracing::debug!("Empty query, passing {} candidates through", corpus.len());
            return RankOutcome::Unranked(corpus.iter().collect());
        }

        if corpus.is_empty() {
            tracing::debug!("No candidates to rank for '{}'", query);
            return RankOutcome::NoResults;
        }

        let scores = match self.score(query, corpus) {
            Ok(scores) => scores,
            Err(VectorizeError::EmptyVocabulary) => {
                tracing::debug!("Candidates for '{}' contain only stop words", query);
                return RankOutcome::TooGeneric;
            }
            Err(err) => {
                tracing::warn!("Ranking '{}' failed: {}", query, err);
                return RankOutcome::TooGeneric;
            }
        };

        let mut hits: Vec<ScoredDocument<'a, D>> = corpus
            .iter()
            .zip(scores)
            .filter(|(_, score)| *score > self.config.threshold)
            .map(|(document, score)| ScoredDocument { document, score })
            .collect();
        // sort_by is stable, so equal scores keep corpus order
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));

        tracing::debug!(
            "Ranked '{}': {} of {} candidates above {}",
            query,
            hits.len(),
            corpus.len(),
            self.config.threshold
        );

        RankOutcome::Ranked(hits)
    }

    /// Cosine similarity of every document with the query, in corpus order
    pub fn score<D: HasText>(&self, query: &str, corpus: &[D]) -> Result<Vec<f64>, VectorizeError> {
        let texts: Vec<String> = corpus
            .iter()
            .map(|doc| {
                let (title, description) = doc.text();
                format!("{} {}", title, description)
            })
            .collect();

        let (vectorizer, vectors) = TfidfVectorizer::fit_transform(&texts, &self.config.stop_words)?;
        let query_vector = vectorizer.transform(query)?;

        vectors
            .iter()
            .map(|vector| {
                let score = cosine_similarity(&query_vector, vector);
                if score.is_finite() {
                    // Rounding can push identical vectors a hair past 1.0
                    Ok(score.clamp(0.0, 1.0))
                } else {
                    Err(VectorizeError::NonFinite(query.to_string()))
                }
            })
            .collect()
    }
}
