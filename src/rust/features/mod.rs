//! Feature assembly: bag-of-words ⊕ category counts ⊕ embedding.

use ndarray::{s, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierError;
use crate::text::CategoryCounts;

mod vocabulary;

pub use vocabulary::TfidfVocabulary;

/// Column widths of the three feature groups of one trained model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLayout {
    pub vocabulary: usize,
    pub embedding: usize,
}

impl FeatureLayout {
    pub fn new(vocabulary: usize, embedding: usize) -> Self {
        Self { vocabulary, embedding }
    }

    pub fn width(&self) -> usize {
        self.vocabulary + CategoryCounts::WIDTH + self.embedding
    }
}

/// Learns the vocabulary for a training corpus of cleaned texts.
pub fn fit_vocabulary<S: AsRef<str>>(cleaned: &[S], max_features: usize) -> TfidfVocabulary {
    TfidfVocabulary::fit(cleaned, max_features)
}

pub fn vectorize_bag_of_words<S: AsRef<str>>(
    cleaned: &[S],
    vocabulary: &TfidfVocabulary,
) -> Array2<f64> {
    vocabulary.transform(cleaned)
}

/// Concatenates the feature groups row by row.
///
/// # Errors
/// - `ShapeMismatch` if the groups hold different numbers of examples
/// - `ShapeMismatch` if a group's width disagrees with `layout`
pub fn combine(
    bow: ArrayView2<f64>,
    counts: &[CategoryCounts],
    embeddings: ArrayView2<f32>,
    layout: FeatureLayout,
) -> Result<Array2<f64>, ClassifierError> {
    let rows = bow.nrows();
    if counts.len() != rows || embeddings.nrows() != rows {
        return Err(ClassifierError::ShapeMismatch(format!(
            "feature groups hold different numbers of examples: {} bag-of-words, {} counts, {} embeddings",
            rows,
            counts.len(),
            embeddings.nrows()
        )));
    }
    if bow.ncols() != layout.vocabulary {
        return Err(ClassifierError::ShapeMismatch(format!(
            "bag-of-words width {} does not match vocabulary size {}",
            bow.ncols(),
            layout.vocabulary
        )));
    }
    if embeddings.ncols() != layout.embedding {
        return Err(ClassifierError::ShapeMismatch(format!(
            "embedding width {} does not match expected dimension {}",
            embeddings.ncols(),
            layout.embedding
        )));
    }

    let counts_start = layout.vocabulary;
    let embedding_start = counts_start + CategoryCounts::WIDTH;

    let mut combined = Array2::zeros((rows, layout.width()));
    combined.slice_mut(s![.., ..counts_start]).assign(&bow);
    for (i, example) in counts.iter().enumerate() {
        for (j, value) in example.as_features().into_iter().enumerate() {
            combined[[i, counts_start + j]] = value;
        }
    }
    combined
        .slice_mut(s![.., embedding_start..])
        .assign(&embeddings.mapv(|v| v as f64));

    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn counts(n: usize) -> Vec<CategoryCounts> {
        (0..n as u32)
            .map(|i| CategoryCounts { nouns: i, verbs: 1, adjectives: 2 })
            .collect()
    }

    #[test]
    fn test_combine_concatenates_in_order() {
        let bow = array![[0.5, 0.5], [1.0, 0.0]];
        let emb = array![[0.25f32], [-1.0f32]];
        let combined = combine(bow.view(), &counts(2), emb.view(), FeatureLayout::new(2, 1)).unwrap();

        assert_eq!(combined.dim(), (2, 6));
        assert_eq!(combined.row(0).to_vec(), vec![0.5, 0.5, 0.0, 1.0, 2.0, 0.25]);
        assert_eq!(combined.row(1).to_vec(), vec![1.0, 0.0, 1.0, 1.0, 2.0, -1.0]);
    }

    #[test]
    fn test_combine_rejects_length_mismatch() {
        let layout = FeatureLayout::new(2, 1);
        let bow = Array2::<f64>::zeros((3, 2));
        let emb = Array2::<f32>::zeros((3, 1));

        for (b, c, e) in [(3, 2, 3), (2, 3, 3), (3, 3, 2), (0, 1, 0)] {
            let result = combine(
                bow.slice(s![..b, ..]),
                &counts(c),
                emb.slice(s![..e, ..]),
                layout,
            );
            assert!(matches!(result, Err(ClassifierError::ShapeMismatch(_))));
        }
    }

    #[test]
    fn test_combine_rejects_width_mismatch() {
        let bow = Array2::<f64>::zeros((1, 3));
        let emb = Array2::<f32>::zeros((1, 1));
        let result = combine(bow.view(), &counts(1), emb.view(), FeatureLayout::new(2, 1));
        assert!(matches!(result, Err(ClassifierError::ShapeMismatch(_))));

        let bow = Array2::<f64>::zeros((1, 2));
        let emb = Array2::<f32>::zeros((1, 4));
        let result = combine(bow.view(), &counts(1), emb.view(), FeatureLayout::new(2, 1));
        assert!(matches!(result, Err(ClassifierError::ShapeMismatch(_))));
    }

    #[test]
    fn test_layout_width() {
        assert_eq!(FeatureLayout::new(100, 768).width(), 871);
    }
}
