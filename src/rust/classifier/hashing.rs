use ndarray::Array1;
use sha2::{Digest, Sha256};

use super::embedding::Embedder;
use super::error::ClassifierError;

/// Signed feature hashing of word unigrams and bigrams.
///
/// Needs no model files, and SHA-256 keeps bucket assignment stable across
/// builds and platforms. Rows are L2 normalized; text without words maps to
/// the zero vector.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub const DEFAULT_DIMENSION: usize = 768;

    pub fn new(dimension: usize) -> Result<Self, ClassifierError> {
        if dimension == 0 {
            return Err(ClassifierError::BuildError("Embedding dimension must be positive".into()));
        }
        Ok(Self { dimension })
    }

    fn bucket(&self, term: &str) -> (usize, f32) {
        let digest = Sha256::digest(term.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(head) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self { dimension: Self::DEFAULT_DIMENSION }
    }
}

impl Embedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Array1<f32>, ClassifierError> {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let mut vector = Array1::<f32>::zeros(self.dimension);
        for word in &words {
            let (index, sign) = self.bucket(word);
            vector[index] += sign;
        }
        for pair in words.windows(2) {
            let (index, sign) = self.bucket(&format!("{} {}", pair[0], pair[1]));
            vector[index] += 0.5 * sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 1e-10 {
            vector.mapv_inplace(|v| v / norm);
        }
        Ok(vector)
    }
}
