mod error;
mod embedding;
mod forest;
mod hashing;
mod model;
mod sense;
pub mod builder;

pub use builder::SenseClassifierBuilder;
pub use embedding::{Embedder, OnnxEmbedder};
pub use error::ClassifierError;
pub use forest::{ForestConfig, MaxFeatures, RandomForest};
pub use hashing::HashingEmbedder;
pub use model::{SenseClassifier, TrainedModel, FOREST_BLOB, VOCABULARY_BLOB};
pub use sense::{Prediction, Sense};

/// Information about the current state and configuration of a classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierInfo {
    /// Whether a model has been trained or loaded
    pub trained: bool,
    /// Number of TF-IDF columns of the current model
    pub vocabulary_size: Option<usize>,
    /// Size of the embedding vectors
    pub embedding_dimension: usize,
    /// Total width of a feature row of the current model
    pub feature_width: Option<usize>,
    /// Number of trees in the current forest
    pub n_trees: Option<usize>,
    /// Vocabulary size limit applied when training
    pub max_features: usize,
}
