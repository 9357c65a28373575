//! TF-IDF vectorization over a per-request corpus
//!
//! Text is lowercased and split into tokens of two or more word characters.
//! Stop words are dropped, the remaining terms form the vocabulary, and each
//! document becomes an L2-normalised sparse vector of `tf * idf` weights with
//! smoothed IDF: `ln((1 + n) / (1 + df)) + 1`.

use super::stopwords::StopWords;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;
use thiserror::Error;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"));

/// Failures while building or applying a vector space
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorizeError {
    /// Every document was empty or consisted only of stop words
    #[error("empty vocabulary: documents contain only stop words")]
    EmptyVocabulary,

    /// A weight or norm came out as NaN or infinity
    #[error("non-finite weight for term '{0}'")]
    NonFinite(String),
}

/// Sparse vector as `(term index, weight)` pairs sorted by term index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn is_zero(&self) -> bool {
        self.entries.iter().all(|(_, w)| *w == 0.0)
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a, wa) = self.entries[i];
            let (b, wb) = other.entries[j];
            match a.cmp(&b) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += wa * wb;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

/// Cosine of the angle between two vectors; 0.0 when either is zero
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let denom = a.norm() * b.norm();
    if denom == 0.0 {
        return 0.0;
    }
    a.dot(b) / denom
}

/// Lowercase, tokenize and drop stop words
pub fn tokenize(text: &str, stop_words: &StopWords) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|token| !stop_words.contains(token))
        .map(String::from)
        .collect()
}

/// A vocabulary and IDF weights fitted on one corpus
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    stop_words: StopWords,
}

impl TfidfVectorizer {
    /// Learn vocabulary and IDF weights from `documents`
    pub fn fit<S: AsRef<str>>(
        documents: &[S],
        stop_words: &StopWords,
    ) -> Result<Self, VectorizeError> {
        Self::fit_transform(documents, stop_words).map(|(vectorizer, _)| vectorizer)
    }

    /// Fit on `documents` and return their vectors in the same pass
    pub fn fit_transform<S: AsRef<str>>(
        documents: &[S],
        stop_words: &StopWords,
    ) -> Result<(Self, Vec<SparseVector>), VectorizeError> {
        let tokenized: Vec<Vec<String>> = documents
            .iter()
            .map(|doc| tokenize(doc.as_ref(), stop_words))
            .collect();

        // Sorted vocabulary keeps term indices deterministic
        let terms: BTreeSet<&str> = tokenized
            .iter()
            .flat_map(|tokens| tokens.iter().map(String::as_str))
            .collect();
        if terms.is_empty() {
            return Err(VectorizeError::EmptyVocabulary);
        }

        let vocabulary: HashMap<String, usize> = terms
            .iter()
            .enumerate()
            .map(|(i, term)| (term.to_string(), i))
            .collect();

        let mut df = vec![0usize; vocabulary.len()];
        for tokens in &tokenized {
            let unique: BTreeSet<usize> = tokens.iter().map(|t| vocabulary[t.as_str()]).collect();
            for index in unique {
                df[index] += 1;
            }
        }

        let n = documents.len() as f64;
        let idf = df
            .iter()
            .map(|&count| ((1.0 + n) / (1.0 + count as f64)).ln() + 1.0)
            .collect();

        let vectorizer = TfidfVectorizer {
            vocabulary,
            idf,
            stop_words: stop_words.clone(),
        };
        let vectors = tokenized
            .iter()
            .map(|tokens| vectorizer.weigh(tokens))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((vectorizer, vectors))
    }

    /// Project text into the fitted space. Unknown terms are ignored.
    pub fn transform(&self, text: &str) -> Result<SparseVector, VectorizeError> {
        self.weigh(&tokenize(text, &self.stop_words))
    }

    /// Number of distinct terms in the vocabulary
    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// IDF weight of a term, if it is in the vocabulary
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&i| self.idf[i])
    }

    fn weigh(&self, tokens: &[String]) -> Result<SparseVector, VectorizeError> {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for token in tokens {
            if let Some(&index) = self.vocabulary.get(token) {
                *counts.entry(index).or_default() += 1;
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, tf)| (index, tf as f64 * self.idf[index]))
            .collect();
        entries.sort_by_key(|(index, _)| *index);

        let mut vector = SparseVector { entries };
        let norm = vector.norm();
        if !norm.is_finite() {
            return Err(VectorizeError::NonFinite(self.term_at(&vector)));
        }
        if norm > 0.0 {
            for (_, weight) in vector.entries.iter_mut() {
                *weight /= norm;
            }
        }
        Ok(vector)
    }

    fn term_at(&self, vector: &SparseVector) -> String {
        vector
            .entries
            .iter()
            .find(|(_, w)| !w.is_finite())
            .and_then(|(index, _)| {
                self.vocabulary
                    .iter()
                    .find(|(_, i)| *i == index)
                    .map(|(term, _)| term.clone())
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_tokenize_drops_short_tokens_and_stop_words() {
        let tokens = tokenize("The Chicken, a curry & 2 naan!", &StopWords::english());
        assert_eq!(tokens, vec!["chicken", "curry", "naan"]);
    }

    #[test]
    fn test_tokenize_unicode_words() {
        let tokens = tokenize("Sel Roti सेल रोटी", &StopWords::none());
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0], "sel");
    }

    #[test]
    fn test_smoothed_idf() {
        let docs = ["chicken curry", "chicken soup", "fruit salad"];
        let vectorizer = TfidfVectorizer::fit(&docs, &StopWords::english()).unwrap();

        // chicken appears in 2 of 3 documents
        let expected = (4.0f64 / 3.0).ln() + 1.0;
        assert!((vectorizer.idf("chicken").unwrap() - expected).abs() < EPS);
        // curry appears in 1 of 3
        let expected = 2.0f64.ln() + 1.0;
        assert!((vectorizer.idf("curry").unwrap() - expected).abs() < EPS);
        assert_eq!(vectorizer.idf("the"), None);
        assert_eq!(vectorizer.vocabulary_len(), 5);
    }

    #[test]
    fn test_vectors_are_unit_length() {
        let docs = ["spicy chicken curry with rice", "light chicken broth"];
        let (_, vectors) = TfidfVectorizer::fit_transform(&docs, &StopWords::english()).unwrap();
        for vector in vectors {
            assert!((vector.norm() - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn test_empty_vocabulary() {
        let docs = ["the and of", "", "a an"];
        let err = TfidfVectorizer::fit(&docs, &StopWords::english()).unwrap_err();
        assert_eq!(err, VectorizeError::EmptyVocabulary);

        let empty: [&str; 0] = [];
        assert!(TfidfVectorizer::fit(&empty, &StopWords::english()).is_err());
    }

    #[test]
    fn test_transform_ignores_unknown_terms() {
        let docs = ["chicken curry"];
        let vectorizer = TfidfVectorizer::fit(&docs, &StopWords::english()).unwrap();
        assert!(vectorizer.transform("xyz123 pizza").unwrap().is_zero());
        assert_eq!(vectorizer.vocabulary_len(), 2);
    }

    #[test]
    fn test_cosine_similarity() {
        let docs = ["chicken curry", "fruit salad"];
        let (vectorizer, vectors) =
            TfidfVectorizer::fit_transform(&docs, &StopWords::english()).unwrap();
        let query = vectorizer.transform("Chicken Curry").unwrap();

        assert!((cosine_similarity(&query, &vectors[0]) - 1.0).abs() < EPS);
        assert_eq!(cosine_similarity(&query, &vectors[1]), 0.0);
        assert_eq!(cosine_similarity(&SparseVector::default(), &vectors[0]), 0.0);
    }
}
