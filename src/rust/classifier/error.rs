use ort::Error as OrtError;
use thiserror::Error;

/// Represents the different types of errors that can occur in the sense classifier.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Tagger lexicon, tokenizer or model files are missing or unreadable
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),
    /// Feature groups disagree in length or width
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    /// Training texts and labels have different lengths
    #[error("Label count mismatch: {texts} texts but {labels} labels")]
    LabelCountMismatch { texts: usize, labels: usize },
    /// Training data does not contain every class
    #[error("Insufficient classes: {0}")]
    InsufficientClasses(String),
    /// Training label outside the known classes
    #[error("Invalid label {0}: expected 0 (Animal) or 1 (Car)")]
    InvalidLabel(usize),
    /// Prediction or save attempted before training
    #[error("Model not ready: train or load a model first")]
    ModelNotReady,
    /// Saved artifacts do not parse or do not fit together
    #[error("Corrupt artifact: {0}")]
    CorruptArtifact(String),
    /// Error occurred while loading or using the tokenizer
    #[error("Tokenizer error: {0}")]
    TokenizerError(String),
    /// Error occurred while loading or running the ONNX model
    #[error("Model error: {0}")]
    ModelError(String),
    /// Error occurred during the build phase
    #[error("Build error: {0}")]
    BuildError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::ModelError(err.to_string())
    }
}
