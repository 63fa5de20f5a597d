//! The built-in demo corpus the server trains on when no artifacts are given.

use crate::classifier::Sense;

pub const REFERENCE_SENTENCES: [&str; 10] = [
    "The jaguar is a solitary predator native to the Americas.",
    "Jaguars are known for their beautiful spotted coats.",
    "The big cat, the jaguar, hunts at night.",
    "I saw a jaguar in the zoo today.",
    "The jaguar runs very fast in the jungle.",
    "I test drove the new Jaguar F-Type yesterday.",
    "The Jaguar sedan offers a luxurious ride.",
    "Jaguar cars are known for their speed and elegance.",
    "The dealer showed me the latest Jaguar model.",
    "My neighbor bought a vintage Jaguar E-Type.",
];

pub const REFERENCE_LABELS: [u8; 10] = [0, 0, 0, 0, 0, 1, 1, 1, 1, 1];

/// Sentences `train` reports predictions for after fitting.
pub const PROBE_SENTENCES: [&str; 2] = [
    "The jaguar speeds through the rainforest.",
    "The jaguar speeds down the highway.",
];

/// The reference corpus as owned training inputs.
pub fn reference_corpus() -> (Vec<String>, Vec<Sense>) {
    let texts = REFERENCE_SENTENCES.iter().map(|s| s.to_string()).collect();
    let labels = REFERENCE_LABELS
        .iter()
        .filter_map(|&l| Sense::try_from(l).ok())
        .collect();
    (texts, labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_is_balanced() {
        let (texts, labels) = reference_corpus();
        assert_eq!(texts.len(), labels.len());
        assert_eq!(labels.iter().filter(|&&s| s == Sense::Animal).count(), 5);
        assert_eq!(labels.iter().filter(|&&s| s == Sense::Car).count(), 5);
    }
}
