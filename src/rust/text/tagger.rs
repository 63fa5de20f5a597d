use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{info, warn};
use tokenizers::pre_tokenizers::whitespace::Whitespace;
use tokenizers::{OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer};

use crate::classifier::ClassifierError;

const BUILTIN_LEXICON: &str = include_str!("../../../resources/lexicon.tsv");

/// Word tokenization and part-of-speech tagging.
///
/// Tags follow the Penn Treebank tag set (`NN`, `VBD`, `JJ`, ...).
pub trait PosTagger: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Returns one `(token, tag)` pair per input token, in order.
    fn tag(&self, tokens: &[String]) -> Vec<(String, String)>;
}

/// Unigram lexicon tagger with suffix rules for words the lexicon does not know.
pub struct LexiconTagger {
    lexicon: HashMap<String, String>,
    splitter: Whitespace,
}

impl std::fmt::Debug for LexiconTagger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexiconTagger")
            .field("entries", &self.lexicon.len())
            .finish()
    }
}

impl LexiconTagger {
    /// Builds the tagger from the lexicon bundled with the crate.
    pub fn builtin() -> Result<Self, ClassifierError> {
        Self::parse(BUILTIN_LEXICON, "builtin lexicon")
    }

    /// Loads a lexicon of `word<TAB>TAG` lines. Blank lines and `#` comments are ignored.
    ///
    /// # Errors
    /// - `ResourceUnavailable` if the file is missing, unreadable, malformed or empty
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ClassifierError::ResourceUnavailable(format!(
                "Failed to read tagger lexicon {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&contents, &path.display().to_string())
    }

    fn parse(contents: &str, source: &str) -> Result<Self, ClassifierError> {
        let mut lexicon = HashMap::new();
        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split('\t');
            match (fields.next(), fields.next()) {
                (Some(word), Some(tag)) if !word.is_empty() && !tag.trim().is_empty() => {
                    lexicon.insert(word.to_lowercase(), tag.trim().to_string());
                }
                _ => {
                    return Err(ClassifierError::ResourceUnavailable(format!(
                        "Malformed lexicon entry in {} at line {}: {:?}",
                        source,
                        line_no + 1,
                        line
                    )));
                }
            }
        }

        if lexicon.is_empty() {
            return Err(ClassifierError::ResourceUnavailable(format!(
                "Tagger lexicon {} has no entries",
                source
            )));
        }

        info!("Loaded tagger lexicon from {} ({} entries)", source, lexicon.len());
        Ok(Self {
            lexicon,
            splitter: Whitespace::default(),
        })
    }

    pub fn len(&self) -> usize {
        self.lexicon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }

    fn tag_word(&self, word: &str) -> String {
        let lower = word.to_lowercase();
        if let Some(tag) = self.lexicon.get(&lower) {
            return tag.clone();
        }
        Self::guess_tag(&lower).to_string()
    }

    fn guess_tag(word: &str) -> &'static str {
        if word.chars().any(|c| c.is_ascii_digit()) {
            return "CD";
        }
        if !word.chars().any(char::is_alphabetic) {
            return "SYM";
        }
        let len = word.chars().count();
        if len > 4 && word.ends_with("ing") {
            "VBG"
        } else if len > 3 && word.ends_with("ed") {
            "VBD"
        } else if len > 3 && word.ends_with("ly") {
            "RB"
        } else if ["ous", "ful", "ive", "able", "ible", "ic", "ish", "less"]
            .iter()
            .any(|suffix| len > suffix.len() + 2 && word.ends_with(suffix))
        {
            "JJ"
        } else if len > 3 && word.ends_with('s') && !word.ends_with("ss") {
            "NNS"
        } else {
            "NN"
        }
    }
}

impl PosTagger for LexiconTagger {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut pretokenized = PreTokenizedString::from(text);
        if let Err(e) = self.splitter.pre_tokenize(&mut pretokenized) {
            warn!("Pre-tokenizer failed ({}), falling back to whitespace split", e);
            return text.split_whitespace().map(str::to_string).collect();
        }
        pretokenized
            .get_splits(OffsetReferential::Original, OffsetType::Byte)
            .into_iter()
            .map(|(token, _, _)| token.to_string())
            .collect()
    }

    fn tag(&self, tokens: &[String]) -> Vec<(String, String)> {
        tokens
            .iter()
            .map(|token| (token.clone(), self.tag_word(token)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_lexicon_loads() {
        let tagger = LexiconTagger::builtin().unwrap();
        assert!(tagger.len() > 100);
    }

    #[test]
    fn test_tokenize_splits_words_and_punctuation() {
        let tagger = LexiconTagger::builtin().unwrap();
        assert_eq!(
            tagger.tokenize("the jaguar, hunts."),
            vec!["the", "jaguar", ",", "hunts", "."]
        );
        assert!(tagger.tokenize("").is_empty());
    }

    #[test]
    fn test_tag_uses_lexicon_then_suffix_rules() {
        let tagger = LexiconTagger::builtin().unwrap();
        let tokens: Vec<String> = ["the", "jaguar", "zooming", "glorious", "1961"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let tags: Vec<String> = tagger.tag(&tokens).into_iter().map(|(_, t)| t).collect();
        assert_eq!(tags, vec!["DT", "NN", "VBG", "JJ", "CD"]);
    }

    #[test]
    fn test_missing_lexicon_fails_loudly() {
        let result = LexiconTagger::from_file("/nonexistent/lexicon.tsv");
        assert!(matches!(result, Err(ClassifierError::ResourceUnavailable(_))));
    }

    #[test]
    fn test_malformed_and_empty_lexicons_are_rejected() {
        let mut malformed = tempfile::NamedTempFile::new().unwrap();
        writeln!(malformed, "jaguar").unwrap();
        assert!(matches!(
            LexiconTagger::from_file(malformed.path()),
            Err(ClassifierError::ResourceUnavailable(_))
        ));

        let mut empty = tempfile::NamedTempFile::new().unwrap();
        writeln!(empty, "# only a comment").unwrap();
        assert!(matches!(
            LexiconTagger::from_file(empty.path()),
            Err(ClassifierError::ResourceUnavailable(_))
        ));
    }

    #[test]
    fn test_custom_lexicon_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# custom\njaguar\tNNP\nroars\tVBZ").unwrap();
        let tagger = LexiconTagger::from_file(file.path()).unwrap();
        let tagged = tagger.tag(&["Jaguar".to_string(), "roars".to_string()]);
        assert_eq!(tagged[0].1, "NNP");
        assert_eq!(tagged[1].1, "VBZ");
    }
}
