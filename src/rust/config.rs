use std::path::PathBuf;
use std::sync::Arc;

use clap::ValueEnum;
use log::info;

use crate::classifier::builder::DEFAULT_MAX_FEATURES;
use crate::classifier::{ClassifierError, ForestConfig, HashingEmbedder, SenseClassifier};
use crate::runtime::RuntimeConfig;
use crate::text::LexiconTagger;
use crate::{BuiltinModel, ModelManager};

/// Where sentence embeddings come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EmbedderKind {
    /// ONNX transformer encoder, downloaded on first use
    #[default]
    Onnx,
    /// Offline feature hashing
    Hashing,
}

/// Everything needed to assemble an untrained classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub embedder: EmbedderKind,
    pub model: BuiltinModel,
    /// Cache directory for downloaded models; `None` uses the default cache
    pub models_dir: Option<PathBuf>,
    /// Re-download the model even if a cached copy verifies
    pub fresh: bool,
    pub hashing_dimension: usize,
    /// Tagger lexicon; `None` uses the built-in one
    pub lexicon: Option<PathBuf>,
    pub max_features: usize,
    pub forest: ForestConfig,
    pub runtime: RuntimeConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            embedder: EmbedderKind::default(),
            model: BuiltinModel::MiniLM,
            models_dir: None,
            fresh: false,
            hashing_dimension: HashingEmbedder::DEFAULT_DIMENSION,
            lexicon: None,
            max_features: DEFAULT_MAX_FEATURES,
            forest: ForestConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Builds an untrained classifier, downloading the embedding model first
    /// when the ONNX embedder is selected.
    ///
    /// # Errors
    /// - `ResourceUnavailable` if the model cannot be downloaded or the lexicon read
    /// - Forwards builder errors
    pub async fn build_classifier(&self) -> Result<SenseClassifier, ClassifierError> {
        let mut builder = SenseClassifier::builder()
            .with_runtime_config(self.runtime)
            .with_max_features(self.max_features)
            .with_forest_config(self.forest.clone());

        if let Some(path) = &self.lexicon {
            builder = builder.with_tagger(Arc::new(LexiconTagger::from_file(path)?));
        }

        builder = match self.embedder {
            EmbedderKind::Hashing => {
                info!("Using hashing embedder with {} dimensions", self.hashing_dimension);
                builder.with_embedder(Arc::new(HashingEmbedder::new(self.hashing_dimension)?))
            }
            EmbedderKind::Onnx => {
                let manager = self.model_manager()?;
                if self.fresh {
                    info!("Removing cached copy of {:?}", self.model);
                    manager.remove_download(self.model).map_err(unavailable)?;
                }
                manager.ensure_model_downloaded(self.model).await.map_err(unavailable)?;
                builder.with_model_manager(manager).with_builtin_model(self.model)?
            }
        };

        builder.build()
    }

    fn model_manager(&self) -> Result<ModelManager, ClassifierError> {
        let manager = match &self.models_dir {
            Some(dir) => ModelManager::new(dir),
            None => ModelManager::new_default(),
        };
        manager.map_err(|e| ClassifierError::ResourceUnavailable(format!("Model cache unavailable: {}", e)))
    }
}

fn unavailable(err: crate::ModelError) -> ClassifierError {
    ClassifierError::ResourceUnavailable(format!("Embedding model unavailable: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_reference_setup() {
        let config = PipelineConfig::default();
        assert_eq!(config.embedder, EmbedderKind::Onnx);
        assert_eq!(config.max_features, 100);
        assert_eq!(config.forest.n_estimators, 100);
        assert_eq!(config.forest.seed, 42);
    }

    #[tokio::test]
    async fn test_hashing_pipeline_builds_offline() {
        let config = PipelineConfig {
            embedder: EmbedderKind::Hashing,
            hashing_dimension: 24,
            ..PipelineConfig::default()
        };
        let classifier = config.build_classifier().await.unwrap();
        assert_eq!(classifier.info().embedding_dimension, 24);
    }

    #[tokio::test]
    async fn test_missing_lexicon_is_unavailable() {
        let config = PipelineConfig {
            embedder: EmbedderKind::Hashing,
            lexicon: Some(PathBuf::from("/nonexistent/lexicon.tsv")),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.build_classifier().await,
            Err(ClassifierError::ResourceUnavailable(_))
        ));
    }
}
