//! Word-sense disambiguation for "jaguar": the animal or the car.
//!
//! Each sentence becomes one feature row made of a TF-IDF bag of words, the
//! number of nouns, verbs and adjectives, and a dense sentence embedding. A
//! random forest over those rows picks the sense.
//!
//! # Basic Usage
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use jaguar_sense::{corpus, HashingEmbedder, Sense, SenseClassifier};
//!
//! let classifier = SenseClassifier::builder()
//!     .with_embedder(Arc::new(HashingEmbedder::new(128)?))
//!     .build()?;
//!
//! let (texts, labels) = corpus::reference_corpus();
//! classifier.train(&texts, &labels)?;
//!
//! let prediction = classifier.predict("I test drove the new Jaguar F-Type yesterday.")?;
//! assert_eq!(prediction.sense, Sense::Car);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! [`SenseClassifier`] is `Send + Sync`. Retraining installs the new model in
//! one step, so it can be shared through an `Arc` while predictions run:
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use std::thread;
//! use jaguar_sense::{corpus, HashingEmbedder, SenseClassifier};
//!
//! let classifier = Arc::new(
//!     SenseClassifier::builder()
//!         .with_embedder(Arc::new(HashingEmbedder::new(64)?))
//!         .build()?,
//! );
//! let (texts, labels) = corpus::reference_corpus();
//! classifier.train(&texts, &labels)?;
//!
//! let mut handles = vec![];
//! for _ in 0..3 {
//!     let classifier = Arc::clone(&classifier);
//!     handles.push(thread::spawn(move || {
//!         classifier.predict("The jaguar hunts at night.").unwrap();
//!     }));
//! }
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! # Ok(())
//! # }
//! ```

pub mod artifacts;
pub mod classifier;
pub mod config;
pub mod corpus;
pub mod features;
pub mod model_manager;
pub mod models;
mod runtime;
pub mod server;
pub mod text;

pub use artifacts::{BlobStore, FsBlobStore};
pub use classifier::{
    ClassifierError, ClassifierInfo, Embedder, ForestConfig, HashingEmbedder, MaxFeatures, OnnxEmbedder,
    Prediction, RandomForest, Sense, SenseClassifier, SenseClassifierBuilder,
};
pub use config::{EmbedderKind, PipelineConfig};
pub use features::{FeatureLayout, TfidfVocabulary};
pub use model_manager::{ModelError, ModelManager};
pub use models::{BuiltinModel, ModelCharacteristics, ModelInfo};
pub use runtime::{create_session_builder, OptimizationLevel, RuntimeConfig};
pub use text::{CategoryCounts, LexiconTagger, PosTagger, TextNormalizer};

/// Initializes `env_logger`, defaulting to `info` when `RUST_LOG` is unset.
/// Safe to call more than once.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}
