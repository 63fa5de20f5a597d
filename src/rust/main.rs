use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use jaguar_sense::server::{self, AppState};
use jaguar_sense::{corpus, EmbedderKind, ForestConfig, PipelineConfig, SenseClassifier};

#[derive(Parser)]
#[command(author, version, about = "Tells whether \"jaguar\" means the animal or the car", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Serve POST /predict over HTTP (default)
    Serve(ServeArgs),
    /// Train on the reference corpus and save the artifacts
    Train {
        /// Artifact directory to write
        #[arg(long, default_value = "model_artifacts")]
        artifacts: PathBuf,
    },
    /// Classify one sentence
    Predict {
        sentence: String,
        /// Load artifacts from this directory instead of training
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, env = "JAGUAR_SENSE_HOST", default_value = "0.0.0.0")]
    host: IpAddr,
    #[arg(long, env = "JAGUAR_SENSE_PORT", default_value_t = 8000)]
    port: u16,
    /// Load a saved model instead of training on the reference corpus
    #[arg(long)]
    artifacts: Option<PathBuf>,
    /// Save the model after startup training
    #[arg(long)]
    save_artifacts: Option<PathBuf>,
}

/// Parses only the serve options, for when no subcommand is given.
#[derive(Parser)]
struct ServeDefaults {
    #[command(flatten)]
    args: ServeArgs,
}

impl ServeArgs {
    fn from_env() -> Self {
        ServeDefaults::parse_from([env!("CARGO_BIN_NAME")]).args
    }
}

#[derive(Args)]
struct PipelineArgs {
    #[arg(long, global = true, value_enum, default_value_t = EmbedderKind::Onnx)]
    embedder: EmbedderKind,
    /// Dimension of the hashing embedder
    #[arg(long, global = true, default_value_t = jaguar_sense::HashingEmbedder::DEFAULT_DIMENSION)]
    hashing_dim: usize,
    /// Force a fresh download of the model files
    #[arg(short, long, global = true)]
    fresh: bool,
    /// Tagger lexicon (word<TAB>tag per line) replacing the built-in one
    #[arg(long, global = true)]
    lexicon: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = 100)]
    max_features: usize,
    #[arg(long, global = true, default_value_t = 100)]
    trees: usize,
    #[arg(long, global = true, default_value_t = 42)]
    seed: u64,
}

impl PipelineArgs {
    fn to_config(&self) -> PipelineConfig {
        PipelineConfig {
            embedder: self.embedder,
            fresh: self.fresh,
            hashing_dimension: self.hashing_dim,
            lexicon: self.lexicon.clone(),
            max_features: self.max_features,
            forest: ForestConfig {
                n_estimators: self.trees,
                seed: self.seed,
                ..ForestConfig::default()
            },
            ..PipelineConfig::default()
        }
    }
}

fn train_reference(classifier: &SenseClassifier) -> Result<()> {
    let (texts, labels) = corpus::reference_corpus();
    classifier
        .train(&texts, &labels)
        .context("Training on the reference corpus failed")
}

fn print_prediction(classifier: &SenseClassifier, sentence: &str) -> Result<()> {
    let prediction = classifier.predict(sentence)?;
    println!("\nSentence: '{}'", sentence);
    println!(
        "Prediction: {} (confidence {:.2}; Animal {:.2}, Car {:.2})",
        prediction.sense,
        prediction.confidence(),
        prediction.probabilities[0],
        prediction.probabilities[1]
    );
    Ok(())
}

async fn serve(classifier: SenseClassifier, args: ServeArgs) -> Result<()> {
    match &args.artifacts {
        Some(dir) => classifier
            .load(dir)
            .with_context(|| format!("Failed to load artifacts from {}", dir.display()))?,
        None => {
            info!("Initializing and training model on reference data...");
            train_reference(&classifier)?;
        }
    }
    if let Some(dir) = &args.save_artifacts {
        classifier
            .save(dir)
            .with_context(|| format!("Failed to save artifacts to {}", dir.display()))?;
    }
    info!("Model ready.");

    let state = AppState::new(Arc::new(classifier));
    server::run(state, SocketAddr::new(args.host, args.port))
        .await
        .context("HTTP server failed")
}

#[tokio::main]
async fn main() -> Result<()> {
    jaguar_sense::init_logger();
    let cli = Cli::parse();

    let start_time = Instant::now();
    info!("Building classifier...");
    let classifier = cli
        .pipeline
        .to_config()
        .build_classifier()
        .await
        .context("Failed to build classifier")?;
    info!("Classifier built in {:.2?}", start_time.elapsed());

    match cli.command {
        None => serve(classifier, ServeArgs::from_env()).await,
        Some(Command::Serve(args)) => serve(classifier, args).await,
        Some(Command::Train { artifacts }) => {
            train_reference(&classifier)?;
            for sentence in corpus::PROBE_SENTENCES {
                print_prediction(&classifier, sentence)?;
            }
            classifier
                .save(&artifacts)
                .with_context(|| format!("Failed to save artifacts to {}", artifacts.display()))?;
            Ok(())
        }
        Some(Command::Predict { sentence, artifacts }) => {
            match &artifacts {
                Some(dir) => classifier
                    .load(dir)
                    .with_context(|| format!("Failed to load artifacts from {}", dir.display()))?,
                None => train_reference(&classifier)?,
            }
            print_prediction(&classifier, &sentence)
        }
    }
}
