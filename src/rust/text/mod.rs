//! Text normalization and grammatical category counting.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

mod tagger;

pub use tagger::{LexiconTagger, PosTagger};

/// Noun, verb and adjective counts for one text, always in that order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub nouns: u32,
    pub verbs: u32,
    pub adjectives: u32,
}

impl CategoryCounts {
    /// Number of feature columns contributed by the counts.
    pub const WIDTH: usize = 3;

    pub fn total(&self) -> u32 {
        self.nouns + self.verbs + self.adjectives
    }

    pub fn as_features(&self) -> [f64; Self::WIDTH] {
        [self.nouns as f64, self.verbs as f64, self.adjectives as f64]
    }
}

/// Cleaned texts and their category counts, index-aligned with the input.
#[derive(Debug, Clone, Default)]
pub struct PreprocessedBatch {
    pub cleaned: Vec<String>,
    pub counts: Vec<CategoryCounts>,
}

impl PreprocessedBatch {
    pub fn len(&self) -> usize {
        self.cleaned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cleaned.is_empty()
    }
}

/// Lowercases and strips text, and counts grammatical categories using an injected tagger.
#[derive(Clone)]
pub struct TextNormalizer {
    tagger: Arc<dyn PosTagger>,
}

impl std::fmt::Debug for TextNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextNormalizer").finish_non_exhaustive()
    }
}

impl TextNormalizer {
    pub fn new(tagger: Arc<dyn PosTagger>) -> Self {
        Self { tagger }
    }

    /// Lowercases `text` and drops everything except ASCII letters, digits and whitespace.
    ///
    /// ```
    /// use jaguar_sense::TextNormalizer;
    ///
    /// assert_eq!(TextNormalizer::clean("The Jaguar F-Type!"), "the jaguar ftype");
    /// ```
    pub fn clean(text: &str) -> String {
        text.to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
            .collect()
    }

    /// Counts nouns (`NN*`), verbs (`VB*`) and adjectives (`JJ*`) in the cleaned text.
    pub fn categorize(&self, text: &str) -> CategoryCounts {
        let cleaned = Self::clean(text);
        let tokens = self.tagger.tokenize(&cleaned);
        let tagged = self.tagger.tag(&tokens);

        let mut counts = CategoryCounts::default();
        for (_, tag) in &tagged {
            if tag.starts_with("NN") {
                counts.nouns += 1;
            } else if tag.starts_with("VB") {
                counts.verbs += 1;
            } else if tag.starts_with("JJ") {
                counts.adjectives += 1;
            }
        }
        counts
    }

    pub fn preprocess_batch<S: AsRef<str>>(&self, texts: &[S]) -> PreprocessedBatch {
        let cleaned: Vec<String> = texts.iter().map(|t| Self::clean(t.as_ref())).collect();
        let counts = cleaned.iter().map(|t| self.categorize(t)).collect();
        PreprocessedBatch { cleaned, counts }
    }

    pub fn tagger(&self) -> &dyn PosTagger {
        self.tagger.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new(Arc::new(LexiconTagger::builtin().unwrap()))
    }

    #[test]
    fn test_clean_strips_punctuation_and_case() {
        assert_eq!(
            TextNormalizer::clean("The big cat, the jaguar, hunts at night."),
            "the big cat the jaguar hunts at night"
        );
        assert_eq!(TextNormalizer::clean("E-Type #1 (1961)"), "etype 1 1961");
        assert_eq!(TextNormalizer::clean(""), "");
    }

    #[test]
    fn test_clean_drops_non_ascii_letters() {
        assert_eq!(TextNormalizer::clean("Café JAGUÁR"), "caf jagur");
        assert_eq!(TextNormalizer::clean("ジャガー"), "");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let inputs = [
            "The Jaguar sedan offers a luxurious ride.",
            "  tabs\tand\nnewlines  ",
            "İstanbul ÀÉÎ ß ﬁ",
            "!!!???",
            "Mixed123 CASE_with-symbols",
        ];
        for input in inputs {
            let once = TextNormalizer::clean(input);
            assert_eq!(TextNormalizer::clean(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_categorize_counts_within_token_count() {
        let normalizer = normalizer();
        let inputs = [
            "The jaguar is a solitary predator native to the Americas.",
            "I test drove the new Jaguar F-Type yesterday.",
            "",
            "running quickly beautiful cars 42",
        ];
        for input in inputs {
            let counts = normalizer.categorize(input);
            let tokens = normalizer.tagger().tokenize(&TextNormalizer::clean(input));
            assert!(counts.total() as usize <= tokens.len(), "input: {input:?}");
        }
    }

    #[test]
    fn test_categorize_example_sentence() {
        let counts = normalizer().categorize("The big cat, the jaguar, hunts at night.");
        assert_eq!(counts.adjectives, 1);
        assert_eq!(counts.verbs, 1);
        assert_eq!(counts.nouns, 3);
    }

    #[test]
    fn test_preprocess_batch_preserves_order() {
        let batch = normalizer().preprocess_batch(&["B a!", "Jaguar cars.", ""]);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.cleaned, vec!["b a", "jaguar cars", ""]);
        assert_eq!(batch.counts[2], CategoryCounts::default());
    }
}
