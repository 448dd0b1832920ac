use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use super::model::{ModelError, RegressionModel};
use super::scaler::{Scaler, ScalerError};

pub const MODEL_FILE: &str = "genre_model.json";
pub const FEATURE_SCALER_FILE: &str = "genre_feature_scaler.json";
pub const TARGET_SCALER_FILE: &str = "genre_target_scaler.json";

/// The regressor and the two scalers it was fitted with.
#[derive(Clone, Debug)]
pub struct ModelArtifacts {
    pub model: RegressionModel,
    pub feature_scaler: Scaler,
    pub target_scaler: Scaler,
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("model artifacts not found in {}: {}", dir.display(), missing.join(", "))]
    Missing { dir: PathBuf, missing: Vec<String> },
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid artifact JSON at {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("model at {path} is malformed")]
    Model {
        path: PathBuf,
        #[source]
        source: ModelError,
    },
    #[error("scaler at {path} is malformed")]
    Scaler {
        path: PathBuf,
        #[source]
        source: ScalerError,
    },
}

/// Where inference gets its model from. Implementations decide whether to
/// cache; the engine calls `load` once per request.
pub trait ArtifactSource {
    fn load(&self) -> Result<ModelArtifacts, ArtifactError>;
}

impl<S: ArtifactSource + ?Sized> ArtifactSource for &S {
    fn load(&self) -> Result<ModelArtifacts, ArtifactError> {
        (**self).load()
    }
}

/// Reads the three artifact files from a directory on every call.
#[derive(Clone, Debug)]
pub struct FsArtifactSource {
    dir: PathBuf,
}

impl FsArtifactSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifact file names absent from the directory.
    pub fn missing(&self) -> Vec<String> {
        [MODEL_FILE, FEATURE_SCALER_FILE, TARGET_SCALER_FILE]
            .iter()
            .filter(|name| !self.dir.join(name).is_file())
            .map(|name| name.to_string())
            .collect()
    }

    fn scaler(&self, name: &str) -> Result<Scaler, ArtifactError> {
        let path = self.dir.join(name);
        let scaler: Scaler = read_json(&path)?;
        scaler
            .validate()
            .map_err(|source| ArtifactError::Scaler { path, source })?;
        Ok(scaler)
    }
}

impl ArtifactSource for FsArtifactSource {
    fn load(&self) -> Result<ModelArtifacts, ArtifactError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(ArtifactError::Missing {
                dir: self.dir.clone(),
                missing,
            });
        }

        let model_path = self.dir.join(MODEL_FILE);
        log::debug!("Loading model from {}", model_path.display());
        let model: RegressionModel = read_json(&model_path)?;
        model.validate().map_err(|source| ArtifactError::Model {
            path: model_path,
            source,
        })?;

        Ok(ModelArtifacts {
            model,
            feature_scaler: self.scaler(FEATURE_SCALER_FILE)?,
            target_scaler: self.scaler(TARGET_SCALER_FILE)?,
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })
}
