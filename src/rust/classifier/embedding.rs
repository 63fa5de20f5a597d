use std::collections::HashMap;
use std::path::Path;

use log::{error, info};
use ndarray::{Array1, Array2};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::error::ClassifierError;
use crate::runtime::{create_session_builder, RuntimeConfig};
use crate::{BuiltinModel, ModelCharacteristics, ModelManager};

/// A fixed-width dense text representation.
///
/// Implementations must be deterministic for a given model and always return
/// vectors of length [`Embedder::dimension`].
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Array1<f32>, ClassifierError>;

    /// Embeds every text into one row of the returned matrix.
    ///
    /// # Errors
    /// - `ShapeMismatch` if an embedding does not have `dimension()` entries
    /// - Forwards all errors from `embed()`
    fn embed_batch(&self, texts: &[String]) -> Result<Array2<f32>, ClassifierError> {
        let dimension = self.dimension();
        let mut matrix = Array2::zeros((texts.len(), dimension));
        for (i, text) in texts.iter().enumerate() {
            let embedding = self.embed(text)?;
            if embedding.len() != dimension {
                return Err(ClassifierError::ShapeMismatch(format!(
                    "embedder returned {} values, expected {}",
                    embedding.len(),
                    dimension
                )));
            }
            matrix.row_mut(i).assign(&embedding);
        }
        Ok(matrix)
    }
}

/// Embeds text with an ONNX transformer encoder, using the first ([CLS]) token
/// of the last hidden state as the sentence vector.
///
/// The ONNX model is expected to:
/// - Accept `input_ids` and `attention_mask` (and optionally `token_type_ids`),
///   each shaped `[batch_size, sequence_length]`
/// - Output hidden states shaped `[batch_size, sequence_length, embedding_size]`
pub struct OnnxEmbedder {
    model_path: String,
    tokenizer_path: String,
    tokenizer: Tokenizer,
    session: Session,
    characteristics: ModelCharacteristics,
}

impl std::fmt::Debug for OnnxEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbedder")
            .field("model_path", &self.model_path)
            .field("tokenizer_path", &self.tokenizer_path)
            .field("characteristics", &self.characteristics)
            .finish()
    }
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<OnnxEmbedder>();
    }
};

impl OnnxEmbedder {
    /// Loads a built-in model that `manager` has already downloaded.
    ///
    /// # Errors
    /// - `ResourceUnavailable` if the model files are not in the cache
    /// - `BuildError` if the tokenizer or model fails to load
    /// - `ModelError` if the model structure is invalid
    pub fn from_builtin(
        model: BuiltinModel,
        manager: &ModelManager,
        runtime: &RuntimeConfig,
    ) -> Result<Self, ClassifierError> {
        if !manager.is_model_downloaded(model) {
            return Err(ClassifierError::ResourceUnavailable(format!(
                "Model '{:?}' is not downloaded. Download it first with ModelManager::download_model()",
                model
            )));
        }

        let model_path = manager.get_model_path(model);
        let tokenizer_path = manager.get_tokenizer_path(model);
        let (tokenizer, session) = Self::load(&model_path, &tokenizer_path, runtime)?;

        Ok(Self {
            model_path: model_path.to_string_lossy().to_string(),
            tokenizer_path: tokenizer_path.to_string_lossy().to_string(),
            tokenizer,
            session,
            characteristics: model.characteristics(),
        })
    }

    /// Loads a custom ONNX encoder and tokenizer, inferring the embedding size
    /// by embedding a probe sentence.
    ///
    /// `max_sequence_length` defaults to 64 tokens; longer inputs are truncated.
    pub fn from_files(
        model_path: &str,
        tokenizer_path: &str,
        max_sequence_length: Option<usize>,
        runtime: &RuntimeConfig,
    ) -> Result<Self, ClassifierError> {
        if model_path.is_empty() || tokenizer_path.is_empty() {
            return Err(ClassifierError::BuildError("Model and tokenizer paths cannot be empty".to_string()));
        }
        for path in [model_path, tokenizer_path] {
            if !Path::new(path).exists() {
                return Err(ClassifierError::ResourceUnavailable(format!("File not found: {}", path)));
            }
        }

        let (tokenizer, session) = Self::load(Path::new(model_path), Path::new(tokenizer_path), runtime)?;
        let mut embedder = Self {
            model_path: model_path.to_string(),
            tokenizer_path: tokenizer_path.to_string(),
            tokenizer,
            session,
            characteristics: ModelCharacteristics {
                embedding_size: 0,
                max_sequence_length: max_sequence_length.unwrap_or(64),
                model_size_mb: 0,
            },
        };

        let probe = embedder.embed("Test input to infer embedding size")?;
        embedder.characteristics.embedding_size = probe.len();
        info!("Inferred embedding size from model: {}", probe.len());
        Ok(embedder)
    }

    fn load(
        model_path: &Path,
        tokenizer_path: &Path,
        runtime: &RuntimeConfig,
    ) -> Result<(Tokenizer, Session), ClassifierError> {
        let tokenizer = Tokenizer::from_file(tokenizer_path).map_err(|e| {
            error!("Failed to load tokenizer: {}", e);
            ClassifierError::BuildError(format!("Failed to load tokenizer: {}", e))
        })?;
        info!("Tokenizer loaded from {}", tokenizer_path.display());

        let session = create_session_builder(runtime)?.commit_from_file(model_path)?;
        Self::validate_model(&session)?;
        info!("Model structure validated successfully");

        Ok((tokenizer, session))
    }

    fn validate_model(session: &Session) -> Result<(), ClassifierError> {
        if session.inputs.len() < 2 {
            return Err(ClassifierError::ModelError(format!(
                "Model must have at least 2 inputs (input_ids and attention_mask), found {}",
                session.inputs.len()
            )));
        }
        if session.outputs.is_empty() {
            return Err(ClassifierError::ModelError(
                "Model must have at least 1 output for embeddings".to_string(),
            ));
        }
        Ok(())
    }

    pub fn characteristics(&self) -> &ModelCharacteristics {
        &self.characteristics
    }

    /// Counts the tokens of `text` (special tokens included) before truncation.
    pub fn count_tokens(&self, text: &str) -> Result<usize, ClassifierError> {
        self.tokenizer
            .encode(text, true)
            .map_err(|e| ClassifierError::TokenizerError(e.to_string()))
            .map(|encoding| encoding.get_ids().len())
    }

    /// Tokenizes with special tokens, truncating to the maximum sequence length
    /// while keeping the closing special token.
    fn tokenize(&self, text: &str) -> Result<Vec<u32>, ClassifierError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ClassifierError::TokenizerError(e.to_string()))?;
        let mut ids = encoding.get_ids().to_vec();

        let max_length = self.characteristics.max_sequence_length.max(2);
        if ids.len() > max_length {
            let last = ids[ids.len() - 1];
            ids.truncate(max_length - 1);
            ids.push(last);
        }
        if ids.is_empty() {
            return Err(ClassifierError::TokenizerError("Tokenizer produced no tokens".into()));
        }
        Ok(ids)
    }

    fn get_embedding(&self, tokens: &[u32]) -> Result<Array1<f32>, ClassifierError> {
        let shape = (1, tokens.len());
        let tensor = |values: Vec<i64>, what: &str| -> Result<Tensor<i64>, ClassifierError> {
            let array = Array2::from_shape_vec(shape, values)
                .map_err(|e| ClassifierError::ModelError(format!("Failed to create {} array: {}", what, e)))?
                .into_dyn();
            Tensor::from_array(&array.as_standard_layout())
                .map_err(|e| ClassifierError::ModelError(format!("Failed to create {} tensor: {}", what, e)))
        };

        let mut input_tensors = HashMap::new();
        input_tensors.insert("input_ids", tensor(tokens.iter().map(|&x| x as i64).collect(), "input")?);
        input_tensors.insert(
            "attention_mask",
            tensor(tokens.iter().map(|&x| if x == 0 { 0i64 } else { 1i64 }).collect(), "mask")?,
        );
        if self.session.inputs.iter().any(|input| input.name == "token_type_ids") {
            input_tensors.insert("token_type_ids", tensor(vec![0i64; tokens.len()], "token type")?);
        }

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to run model: {}", e)))?;
        let hidden = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::ModelError(format!("Failed to extract output tensor: {}", e)))?;
        if hidden.ndim() != 3 {
            return Err(ClassifierError::ModelError(format!(
                "Expected hidden states of rank 3, got shape {:?}",
                hidden.shape()
            )));
        }

        Ok(hidden.slice(ndarray::s![0, 0, ..]).iter().copied().collect())
    }
}

impl Embedder for OnnxEmbedder {
    fn dimension(&self) -> usize {
        self.characteristics.embedding_size
    }

    fn embed(&self, text: &str) -> Result<Array1<f32>, ClassifierError> {
        let tokens = self.tokenize(text)?;
        self.get_embedding(&tokens)
    }
}
