use std::sync::OnceLock;

use clap::ValueEnum;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;

use crate::classifier::ClassifierError;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Graph optimization applied when an ONNX session is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OptimizationLevel {
    Disable,
    Basic,
    Extended,
    #[default]
    All,
}

impl From<OptimizationLevel> for GraphOptimizationLevel {
    fn from(level: OptimizationLevel) -> Self {
        match level {
            OptimizationLevel::Disable => GraphOptimizationLevel::Disable,
            OptimizationLevel::Basic => GraphOptimizationLevel::Level1,
            OptimizationLevel::Extended => GraphOptimizationLevel::Level2,
            OptimizationLevel::All => GraphOptimizationLevel::Level3,
        }
    }
}

/// ONNX Runtime settings for the embedding session. Zero thread counts let
/// ONNX Runtime decide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization: OptimizationLevel,
}

/// Commits the process-wide ONNX Runtime environment exactly once.
pub fn ensure_initialized() -> Result<(), ClassifierError> {
    let outcome = INIT.get_or_init(|| {
        ort::init()
            .with_name("jaguar-sense")
            .commit()
            .map(|_| ())
            .map_err(|e| e.to_string())
    });
    outcome.clone().map_err(|msg| {
        ClassifierError::ModelError(format!("ONNX Runtime environment failed to initialize: {}", msg))
    })
}

pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, ClassifierError> {
    ensure_initialized()?;
    let mut builder = Session::builder()?;

    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }
    builder = builder.with_optimization_level(config.optimization.into())?;

    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_lets_runtime_decide() {
        let config = RuntimeConfig::default();
        assert_eq!(config.inter_threads, 0);
        assert_eq!(config.intra_threads, 0);
        assert_eq!(config.optimization, OptimizationLevel::All);
    }

    #[test]
    fn test_optimization_levels_map_to_ort() {
        assert!(matches!(
            GraphOptimizationLevel::from(OptimizationLevel::Basic),
            GraphOptimizationLevel::Level1
        ));
        assert!(matches!(
            GraphOptimizationLevel::from(OptimizationLevel::Disable),
            GraphOptimizationLevel::Disable
        ));
    }
}
