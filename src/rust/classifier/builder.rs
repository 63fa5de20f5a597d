use std::sync::Arc;

use log::info;

use super::embedding::{Embedder, OnnxEmbedder};
use super::error::ClassifierError;
use super::forest::ForestConfig;
use super::model::SenseClassifier;
use crate::runtime::RuntimeConfig;
use crate::text::{LexiconTagger, PosTagger, TextNormalizer};
use crate::{BuiltinModel, ModelManager};

/// Vocabulary size limit used unless [`SenseClassifierBuilder::with_max_features`] says otherwise.
pub const DEFAULT_MAX_FEATURES: usize = 100;

/// A builder for constructing a [`SenseClassifier`] with a fluent interface.
///
/// Exactly one embedder source must be chosen: [`with_embedder`](Self::with_embedder),
/// [`with_builtin_model`](Self::with_builtin_model) or
/// [`with_custom_model`](Self::with_custom_model). The tagger defaults to the
/// built-in lexicon.
pub struct SenseClassifierBuilder {
    embedder: Option<Arc<dyn Embedder>>,
    tagger: Option<Arc<dyn PosTagger>>,
    model_manager: Option<ModelManager>,
    runtime_config: RuntimeConfig,
    max_features: usize,
    forest_config: ForestConfig,
}

impl Default for SenseClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SenseClassifierBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenseClassifierBuilder")
            .field("has_embedder", &self.embedder.is_some())
            .field("has_tagger", &self.tagger.is_some())
            .field("model_manager", &self.model_manager)
            .field("runtime_config", &self.runtime_config)
            .field("max_features", &self.max_features)
            .field("forest_config", &self.forest_config)
            .finish()
    }
}

impl SenseClassifierBuilder {
    pub fn new() -> Self {
        Self {
            embedder: None,
            tagger: None,
            model_manager: None,
            runtime_config: RuntimeConfig::default(),
            max_features: DEFAULT_MAX_FEATURES,
            forest_config: ForestConfig::default(),
        }
    }

    /// Sets the ONNX Runtime configuration. Only affects models loaded after this call.
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Looks up built-in models in `manager` instead of the default cache.
    pub fn with_model_manager(mut self, manager: ModelManager) -> Self {
        self.model_manager = Some(manager);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Loads a built-in ONNX encoder from the model cache.
    ///
    /// # Errors
    /// - `BuildError` if an embedder is already set
    /// - `ResourceUnavailable` if the model has not been downloaded
    /// - Forwards tokenizer and ONNX Runtime load errors
    pub fn with_builtin_model(mut self, model: BuiltinModel) -> Result<Self, ClassifierError> {
        if self.embedder.is_some() {
            return Err(ClassifierError::BuildError("Embedder already set".to_string()));
        }
        let manager = match self.model_manager.take() {
            Some(manager) => manager,
            None => ModelManager::new_default()
                .map_err(|e| ClassifierError::BuildError(format!("Failed to create model manager: {}", e)))?,
        };
        let embedder = OnnxEmbedder::from_builtin(model, &manager, &self.runtime_config)?;
        info!("Using built-in model {:?}", model);
        self.model_manager = Some(manager);
        self.embedder = Some(Arc::new(embedder));
        Ok(self)
    }

    /// Loads a custom ONNX encoder and tokenizer. `max_sequence_length`
    /// defaults to 64 tokens.
    ///
    /// # Errors
    /// - `BuildError` if an embedder is already set or a path is empty
    /// - `ResourceUnavailable` if a file does not exist
    /// - Forwards tokenizer and ONNX Runtime load errors
    pub fn with_custom_model(
        mut self,
        model_path: &str,
        tokenizer_path: &str,
        max_sequence_length: Option<usize>,
    ) -> Result<Self, ClassifierError> {
        if self.embedder.is_some() {
            return Err(ClassifierError::BuildError("Embedder already set".to_string()));
        }
        let embedder =
            OnnxEmbedder::from_files(model_path, tokenizer_path, max_sequence_length, &self.runtime_config)?;
        self.embedder = Some(Arc::new(embedder));
        Ok(self)
    }

    pub fn with_tagger(mut self, tagger: Arc<dyn PosTagger>) -> Self {
        self.tagger = Some(tagger);
        self
    }

    /// Caps the TF-IDF vocabulary at the `max_features` most frequent terms.
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_forest_config(mut self, config: ForestConfig) -> Self {
        self.forest_config = config;
        self
    }

    /// Builds an untrained classifier.
    ///
    /// # Errors
    /// - `BuildError` if no embedder was configured
    /// - `BuildError` if `max_features`, the tree count or `min_samples_split` is zero
    /// - `ResourceUnavailable` if the built-in lexicon cannot be parsed
    pub fn build(self) -> Result<SenseClassifier, ClassifierError> {
        let embedder = self.embedder.ok_or_else(|| {
            ClassifierError::BuildError("No embedder configured. Call with_embedder() or with_builtin_model() first".into())
        })?;
        if self.max_features == 0 {
            return Err(ClassifierError::BuildError("max_features must be positive".into()));
        }
        if self.forest_config.n_estimators == 0 {
            return Err(ClassifierError::BuildError("Forest needs at least one tree".into()));
        }
        if self.forest_config.min_samples_split == 0 {
            return Err(ClassifierError::BuildError("min_samples_split must be positive".into()));
        }

        let tagger = match self.tagger {
            Some(tagger) => tagger,
            None => Arc::new(LexiconTagger::builtin()?),
        };

        Ok(SenseClassifier::from_parts(
            TextNormalizer::new(tagger),
            embedder,
            self.max_features,
            self.forest_config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::HashingEmbedder;

    #[test]
    fn test_build_without_embedder_fails() {
        let result = SenseClassifierBuilder::new().build();
        assert!(matches!(result, Err(ClassifierError::BuildError(_))));
    }

    #[test]
    fn test_build_with_embedder() {
        let classifier = SenseClassifier::builder()
            .with_embedder(Arc::new(HashingEmbedder::new(16).unwrap()))
            .with_max_features(50)
            .build()
            .unwrap();
        let info = classifier.info();
        assert_eq!(info.embedding_dimension, 16);
        assert_eq!(info.max_features, 50);
        assert!(!info.trained);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::default());
        let zero_vocab = SenseClassifier::builder()
            .with_embedder(Arc::clone(&embedder))
            .with_max_features(0)
            .build();
        assert!(matches!(zero_vocab, Err(ClassifierError::BuildError(_))));

        let zero_trees = SenseClassifier::builder()
            .with_embedder(embedder)
            .with_forest_config(ForestConfig {
                n_estimators: 0,
                ..ForestConfig::default()
            })
            .build();
        assert!(matches!(zero_trees, Err(ClassifierError::BuildError(_))));
    }

    #[test]
    fn test_second_embedder_source_rejected() {
        let result = SenseClassifier::builder()
            .with_embedder(Arc::new(HashingEmbedder::default()))
            .with_custom_model("model.onnx", "tokenizer.json", None);
        assert!(matches!(result, Err(ClassifierError::BuildError(_))));
    }

    #[test]
    fn test_missing_builtin_model_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(dir.path()).unwrap();
        let result = SenseClassifier::builder()
            .with_model_manager(manager)
            .with_builtin_model(BuiltinModel::MiniLM);
        assert!(matches!(result, Err(ClassifierError::ResourceUnavailable(_))));
    }

    #[test]
    fn test_missing_custom_model_is_unavailable() {
        let result = SenseClassifier::builder().with_custom_model("/nonexistent/model.onnx", "/nonexistent/tokenizer.json", None);
        assert!(matches!(result, Err(ClassifierError::ResourceUnavailable(_))));
    }
}
