use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::models::{BuiltinModel, ModelInfo};

/// Environment variable overriding the cache root; models live under `<root>/models`.
pub const CACHE_ENV_VAR: &str = "JAGUAR_SENSE_CACHE";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Model verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
}

/// One downloadable file of a model.
struct ModelFile<'a> {
    kind: &'static str,
    url: &'a str,
    hash: &'a str,
    path: PathBuf,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Downloads embedding models into a local cache and verifies them by SHA-256.
#[derive(Debug, Clone)]
pub struct ModelManager {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Creates a new ModelManager with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Resolves the models directory: `$JAGUAR_SENSE_CACHE/models`, then the
    /// platform cache dir, then `~/.cache`, then the system temp dir.
    pub fn get_default_models_dir() -> PathBuf {
        if let Ok(path) = env::var(CACHE_ENV_VAR) {
            return PathBuf::from(path).join("models");
        }
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("jaguar-sense").join("models");
        }
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("jaguar-sense").join("models");
        }
        env::temp_dir().join("jaguar-sense").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn get_model_path(&self, model: BuiltinModel) -> PathBuf {
        self.models_dir.join(model.get_model_info().name).join("model.onnx")
    }

    pub fn get_tokenizer_path(&self, model: BuiltinModel) -> PathBuf {
        self.models_dir.join(model.get_model_info().name).join("tokenizer.json")
    }

    fn files<'a>(&self, model: BuiltinModel, info: &'a ModelInfo) -> [ModelFile<'a>; 2] {
        [
            ModelFile {
                kind: "model",
                url: &info.model_url,
                hash: &info.model_hash,
                path: self.get_model_path(model),
            },
            ModelFile {
                kind: "tokenizer",
                url: &info.tokenizer_url,
                hash: &info.tokenizer_hash,
                path: self.get_tokenizer_path(model),
            },
        ]
    }

    pub fn is_model_downloaded(&self, model: BuiltinModel) -> bool {
        let model_path = self.get_model_path(model);
        let tokenizer_path = self.get_tokenizer_path(model);
        log::debug!(
            "Model files: {:?} (exists: {}), {:?} (exists: {})",
            model_path,
            model_path.exists(),
            tokenizer_path,
            tokenizer_path.exists()
        );
        model_path.exists() && tokenizer_path.exists()
    }

    fn verify_file(path: &Path, expected_hash: &str) -> Result<bool, ModelError> {
        let bytes = fs::read(path)?;
        let hash = sha256_hex(&bytes);
        if hash != expected_hash {
            log::warn!("Hash of {:?} is {}, expected {}", path, hash, expected_hash);
        }
        Ok(hash == expected_hash)
    }

    /// Returns `Ok(false)` when a file is missing or its hash does not match.
    pub fn verify_model(&self, model: BuiltinModel) -> Result<bool, ModelError> {
        let info = model.get_model_info();
        for file in self.files(model, &info) {
            if !file.path.exists() || !Self::verify_file(&file.path, file.hash)? {
                log::info!("{} file {:?} is missing or invalid", file.kind, file.path);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Downloads any missing or invalid file of `model`. On failure the
    /// partial download is removed.
    pub async fn download_model(&self, model: BuiltinModel) -> Result<(), ModelError> {
        let info = model.get_model_info();
        let _lock = self.download_lock.lock().await;
        fs::create_dir_all(self.models_dir.join(&info.name))?;

        for file in self.files(model, &info) {
            if file.path.exists() && Self::verify_file(&file.path, file.hash)? {
                log::info!("Existing {} file verified at {:?}", file.kind, file.path);
                continue;
            }
            if let Err(e) = Self::download_and_verify_file(&file).await {
                log::error!("Failed to set up {} file: {}", file.kind, e);
                let _ = self.remove_download(model);
                return Err(e);
            }
        }

        log::info!("Model '{}' ready at {:?}", info.name, self.models_dir.join(&info.name));
        Ok(())
    }

    async fn download_and_verify_file(file: &ModelFile<'_>) -> Result<(), ModelError> {
        log::info!("Downloading {} file from {}", file.kind, file.url);
        let response = reqwest::get(file.url).await?.error_for_status()?;
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        let actual = sha256_hex(&bytes);
        if actual != file.hash {
            return Err(ModelError::HashMismatch {
                file_type: file.kind.to_string(),
                expected: file.hash.to_string(),
                actual,
            });
        }

        if let Some(parent) = file.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file.path, &bytes)?;

        if !Self::verify_file(&file.path, file.hash)? {
            return Err(ModelError::VerificationFailed);
        }
        Ok(())
    }

    pub fn remove_download(&self, model: BuiltinModel) -> Result<(), ModelError> {
        for path in [self.get_model_path(model), self.get_tokenizer_path(model)] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Downloads the model if absent, and re-downloads it if verification fails.
    pub async fn ensure_model_downloaded(&self, model: BuiltinModel) -> Result<(), ModelError> {
        if self.is_model_downloaded(model) && self.verify_model(model)? {
            log::info!("Model {:?} present and verified", model);
            return Ok(());
        }
        log::info!("Model {:?} missing or invalid, downloading...", model);
        self.remove_download(model)?;
        self.download_model(model).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_paths() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(dir.path()).unwrap();
        assert!(manager.get_model_path(BuiltinModel::MiniLM).ends_with("minilm/model.onnx"));
        assert!(manager
            .get_tokenizer_path(BuiltinModel::MiniLM)
            .ends_with("minilm/tokenizer.json"));
    }

    #[test]
    fn test_missing_model_is_not_downloaded_or_verified() -> Result<(), ModelError> {
        let dir = tempfile::tempdir()?;
        let manager = ModelManager::new(dir.path())?;
        assert!(!manager.is_model_downloaded(BuiltinModel::MiniLM));
        assert!(!manager.verify_model(BuiltinModel::MiniLM)?);
        Ok(())
    }

    #[test]
    fn test_corrupt_files_fail_verification_and_can_be_removed() -> Result<(), ModelError> {
        let dir = tempfile::tempdir()?;
        let manager = ModelManager::new(dir.path())?;
        let model_path = manager.get_model_path(BuiltinModel::MiniLM);
        fs::create_dir_all(model_path.parent().unwrap())?;
        fs::write(&model_path, "corrupted data")?;
        fs::write(manager.get_tokenizer_path(BuiltinModel::MiniLM), "{}")?;

        assert!(manager.is_model_downloaded(BuiltinModel::MiniLM));
        assert!(!manager.verify_model(BuiltinModel::MiniLM)?);

        manager.remove_download(BuiltinModel::MiniLM)?;
        assert!(!manager.is_model_downloaded(BuiltinModel::MiniLM));
        Ok(())
    }

    #[test]
    fn test_default_models_dir_honours_env() {
        env::set_var(CACHE_ENV_VAR, "/tmp/jaguar-sense-test-cache");
        let path = ModelManager::get_default_models_dir();
        env::remove_var(CACHE_ENV_VAR);
        assert_eq!(path, PathBuf::from("/tmp/jaguar-sense-test-cache/models"));
    }
}
