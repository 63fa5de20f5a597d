use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use log::info;
use ndarray::Array2;
use serde::de::DeserializeOwned;

use super::builder::SenseClassifierBuilder;
use super::embedding::Embedder;
use super::error::ClassifierError;
use super::forest::{ForestConfig, RandomForest};
use super::sense::{Prediction, Sense};
use super::ClassifierInfo;
use crate::artifacts::{BlobStore, FsBlobStore};
use crate::features::{self, FeatureLayout, TfidfVocabulary};
use crate::text::{PreprocessedBatch, TextNormalizer};

pub const VOCABULARY_BLOB: &str = "vocabulary.json";
pub const FOREST_BLOB: &str = "forest.json";

/// Everything `train` learns. Replaced as a whole, never mutated.
#[derive(Debug)]
pub struct TrainedModel {
    pub vocabulary: TfidfVocabulary,
    pub forest: RandomForest,
    pub layout: FeatureLayout,
}

/// Disambiguates "jaguar" between the animal and the car.
///
/// Starts untrained; [`train`](Self::train) or [`load`](Self::load) make it
/// ready. A retrain swaps the whole model at once, so concurrent predictions
/// see either the old model or the new one.
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use std::sync::Arc;
/// use jaguar_sense::{corpus, HashingEmbedder, SenseClassifier};
///
/// let classifier = SenseClassifier::builder()
///     .with_embedder(Arc::new(HashingEmbedder::new(64)?))
///     .build()?;
/// assert!(!classifier.is_trained());
///
/// let (texts, labels) = corpus::reference_corpus();
/// classifier.train(&texts, &labels)?;
///
/// let prediction = classifier.predict("The jaguar runs very fast in the jungle.")?;
/// println!("{} ({:.2})", prediction.sense, prediction.confidence());
/// # Ok(())
/// # }
/// ```
pub struct SenseClassifier {
    normalizer: TextNormalizer,
    embedder: Arc<dyn Embedder>,
    max_features: usize,
    forest_config: ForestConfig,
    state: RwLock<Option<Arc<TrainedModel>>>,
}

impl std::fmt::Debug for SenseClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenseClassifier")
            .field("normalizer", &self.normalizer)
            .field("embedding_dimension", &self.embedder.dimension())
            .field("max_features", &self.max_features)
            .field("forest_config", &self.forest_config)
            .field("trained", &self.is_trained())
            .finish()
    }
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<SenseClassifier>();
    }
};

fn parse_blob<T: DeserializeOwned>(bytes: &[u8], name: &str) -> Result<T, ClassifierError> {
    serde_json::from_slice(bytes)
        .map_err(|e| ClassifierError::CorruptArtifact(format!("{} does not parse: {}", name, e)))
}

impl SenseClassifier {
    pub fn builder() -> SenseClassifierBuilder {
        SenseClassifierBuilder::new()
    }

    pub(crate) fn from_parts(
        normalizer: TextNormalizer,
        embedder: Arc<dyn Embedder>,
        max_features: usize,
        forest_config: ForestConfig,
    ) -> Self {
        Self {
            normalizer,
            embedder,
            max_features,
            forest_config,
            state: RwLock::new(None),
        }
    }

    pub fn is_trained(&self) -> bool {
        self.current().is_ok()
    }

    pub fn info(&self) -> ClassifierInfo {
        let model = self.current().ok();
        ClassifierInfo {
            trained: model.is_some(),
            vocabulary_size: model.as_ref().map(|m| m.layout.vocabulary),
            embedding_dimension: self.embedder.dimension(),
            feature_width: model.as_ref().map(|m| m.layout.width()),
            n_trees: model.as_ref().map(|m| m.forest.n_trees()),
            max_features: self.max_features,
        }
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// The model predictions currently run against.
    pub fn current(&self) -> Result<Arc<TrainedModel>, ClassifierError> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ClassifierError::ModelNotReady)
    }

    fn install(&self, model: TrainedModel) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(model));
    }

    /// Builds feature rows for a preprocessed batch against a fitted vocabulary.
    ///
    /// Training and prediction both go through here, so their columns line up.
    fn featurize(
        &self,
        batch: &PreprocessedBatch,
        vocabulary: &TfidfVocabulary,
    ) -> Result<(Array2<f64>, FeatureLayout), ClassifierError> {
        let bow = features::vectorize_bag_of_words(&batch.cleaned, vocabulary);
        let embeddings = self.embedder.embed_batch(&batch.cleaned)?;
        let layout = FeatureLayout::new(vocabulary.len(), self.embedder.dimension());
        let combined = features::combine(bow.view(), &batch.counts, embeddings.view(), layout)?;
        Ok((combined, layout))
    }

    /// Fits a fresh vocabulary and forest on `texts` and installs them.
    ///
    /// On error the previously trained model, if any, stays in place.
    ///
    /// # Errors
    /// - `LabelCountMismatch` if `texts` and `labels` differ in length
    /// - `InsufficientClasses` if either sense has no examples
    /// - Forwards embedding and shape errors
    pub fn train<S: AsRef<str>>(&self, texts: &[S], labels: &[Sense]) -> Result<(), ClassifierError> {
        if texts.len() != labels.len() {
            return Err(ClassifierError::LabelCountMismatch {
                texts: texts.len(),
                labels: labels.len(),
            });
        }
        for sense in Sense::ALL {
            if !labels.contains(&sense) {
                return Err(ClassifierError::InsufficientClasses(format!(
                    "training data has no {} examples",
                    sense
                )));
            }
        }

        info!("Preprocessing data...");
        let batch = self.normalizer.preprocess_batch(texts);

        info!("Extracting TF-IDF features...");
        let vocabulary = features::fit_vocabulary(&batch.cleaned, self.max_features);

        info!("Extracting embeddings...");
        let (combined, layout) = self.featurize(&batch, &vocabulary)?;

        info!("Training random forest on feature matrix of shape {:?}...", combined.dim());
        let forest = RandomForest::fit(&self.forest_config, combined.view(), labels)?;

        self.install(TrainedModel {
            vocabulary,
            forest,
            layout,
        });
        info!("Training complete.");
        Ok(())
    }

    /// # Errors
    /// - `ModelNotReady` before the first successful `train` or `load`
    pub fn predict(&self, text: &str) -> Result<Prediction, ClassifierError> {
        let model = self.current()?;
        let batch = self.normalizer.preprocess_batch(&[text]);
        let (features, _) = self.featurize(&batch, &model.vocabulary)?;
        let probabilities = model.forest.predict_proba(features.row(0))?;
        Ok(Prediction::from_probabilities(probabilities))
    }

    /// Classifies several sentences against one snapshot of the model.
    pub fn predict_batch<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<Prediction>, ClassifierError> {
        let model = self.current()?;
        let batch = self.normalizer.preprocess_batch(texts);
        let (features, _) = self.featurize(&batch, &model.vocabulary)?;
        features
            .rows()
            .into_iter()
            .map(|row| model.forest.predict_proba(row).map(Prediction::from_probabilities))
            .collect()
    }

    /// Writes `vocabulary.json` and `forest.json` under `dir`.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<(), ClassifierError> {
        self.save_to(&FsBlobStore, dir.as_ref())
    }

    pub fn save_to(&self, store: &dyn BlobStore, dir: &Path) -> Result<(), ClassifierError> {
        let model = self.current()?;
        let vocabulary = serde_json::to_vec(&model.vocabulary).map_err(std::io::Error::from)?;
        let forest = serde_json::to_vec(&model.forest).map_err(std::io::Error::from)?;
        store.write_blob(&dir.join(VOCABULARY_BLOB), &vocabulary)?;
        store.write_blob(&dir.join(FOREST_BLOB), &forest)?;
        info!("Model artifacts saved to {}", dir.display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(&self, dir: P) -> Result<(), ClassifierError> {
        self.load_from(&FsBlobStore, dir.as_ref())
    }

    /// Restores a saved vocabulary and forest and installs them.
    ///
    /// # Errors
    /// - `Io` if a blob cannot be read
    /// - `CorruptArtifact` if a blob does not parse, if the forest width is not
    ///   vocabulary + 3 + embedding dimension, or if this classifier is already
    ///   trained with a different vocabulary size
    pub fn load_from(&self, store: &dyn BlobStore, dir: &Path) -> Result<(), ClassifierError> {
        let vocabulary: TfidfVocabulary =
            parse_blob(&store.read_blob(&dir.join(VOCABULARY_BLOB))?, VOCABULARY_BLOB)?;
        let forest: RandomForest = parse_blob(&store.read_blob(&dir.join(FOREST_BLOB))?, FOREST_BLOB)?;

        if !vocabulary.is_consistent() {
            return Err(ClassifierError::CorruptArtifact(format!(
                "{} has inconsistent columns",
                VOCABULARY_BLOB
            )));
        }
        if !forest.is_consistent() {
            return Err(ClassifierError::CorruptArtifact(format!(
                "{} has no trees or references missing features",
                FOREST_BLOB
            )));
        }

        let layout = FeatureLayout::new(vocabulary.len(), self.embedder.dimension());
        if layout.width() != forest.n_features() {
            return Err(ClassifierError::CorruptArtifact(format!(
                "forest expects {} features but vocabulary ({}) + counts + embedding ({}) give {}",
                forest.n_features(),
                layout.vocabulary,
                layout.embedding,
                layout.width()
            )));
        }
        if let Ok(current) = self.current() {
            if current.layout.vocabulary != layout.vocabulary {
                return Err(ClassifierError::CorruptArtifact(format!(
                    "classifier is trained with {} vocabulary terms, artifacts have {}",
                    current.layout.vocabulary, layout.vocabulary
                )));
            }
        }

        self.install(TrainedModel {
            vocabulary,
            forest,
            layout,
        });
        info!("Model artifacts loaded from {}", dir.display());
        Ok(())
    }
}
