use std::collections::{BTreeMap, BTreeSet, HashMap};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A TF-IDF weighted vocabulary learned once from a training corpus.
///
/// Terms are whitespace-separated words of at least two characters. The
/// vocabulary keeps the `max_features` most frequent terms, assigns columns in
/// alphabetical order, and weights counts with smoothed inverse document
/// frequency before L2-normalizing each row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVocabulary {
    terms: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

fn terms_of(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace().filter(|w| w.chars().count() >= 2)
}

impl TfidfVocabulary {
    /// Learns the vocabulary from already cleaned documents.
    pub fn fit<S: AsRef<str>>(documents: &[S], max_features: usize) -> Self {
        let mut term_freq: HashMap<&str, usize> = HashMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();

        for doc in documents {
            let mut seen = BTreeSet::new();
            for term in terms_of(doc.as_ref()) {
                *term_freq.entry(term).or_insert(0) += 1;
                if seen.insert(term) {
                    *doc_freq.entry(term).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(&str, usize)> = term_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(max_features);

        let kept: BTreeSet<&str> = ranked.into_iter().map(|(term, _)| term).collect();
        let n_docs = documents.len() as f64;

        let mut terms = BTreeMap::new();
        let mut idf = Vec::with_capacity(kept.len());
        for (column, term) in kept.into_iter().enumerate() {
            let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
            idf.push(((1.0 + n_docs) / (1.0 + df)).ln() + 1.0);
            terms.insert(term.to_string(), column);
        }

        Self { terms, idf }
    }

    /// Projects cleaned documents onto the vocabulary, one row per document.
    /// Terms outside the vocabulary are ignored.
    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Array2<f64> {
        let mut matrix = Array2::zeros((documents.len(), self.len()));
        for (i, doc) in documents.iter().enumerate() {
            let mut row = matrix.row_mut(i);
            for term in terms_of(doc.as_ref()) {
                if let Some(&column) = self.terms.get(term) {
                    row[column] += 1.0;
                }
            }
            for (value, idf) in row.iter_mut().zip(&self.idf) {
                *value *= idf;
            }
            let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                row.mapv_inplace(|v| v / norm);
            }
        }
        matrix
    }

    pub fn len(&self) -> usize {
        self.idf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idf.is_empty()
    }

    pub fn column_of(&self, term: &str) -> Option<usize> {
        self.terms.get(term).copied()
    }

    /// Internal consistency check used when loading persisted vocabularies.
    pub(crate) fn is_consistent(&self) -> bool {
        let mut columns: Vec<usize> = self.terms.values().copied().collect();
        columns.sort_unstable();
        self.terms.len() == self.idf.len()
            && columns.into_iter().eq(0..self.idf.len())
            && self.idf.iter().all(|v| v.is_finite())
    }
}
