use serde::Serialize;

use super::artifacts::{ArtifactError, ArtifactSource, FsArtifactSource};
use super::features;
use super::model::ModelError;
use super::ShapeError;
use crate::config::Config;
use crate::profile::store::{ProfileStore, StoreError};

/// Mastering targets predicted for one genre.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SuggestionResult {
    pub rms_mid: f64,
    pub rms_side: f64,
    pub stereo_width: f64,
}

const TARGET_COUNT: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum SuggestError {
    #[error("model or scalers not found: {}", missing.join(", "))]
    MissingArtifacts { missing: Vec<String> },
    #[error("failed to load model artifacts")]
    Artifacts(#[source] ArtifactError),
    #[error("genre profile '{genre}.json' not found")]
    ProfileNotFound { genre: String },
    #[error("failed to load profile for '{genre}'")]
    Profile {
        genre: String,
        #[source]
        source: StoreError,
    },
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(#[source] ShapeError),
    #[error("inference failed")]
    Model(#[source] ModelError),
}

impl From<ArtifactError> for SuggestError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::Missing { missing, .. } => SuggestError::MissingArtifacts { missing },
            other => SuggestError::Artifacts(other),
        }
    }
}

impl From<ShapeError> for SuggestError {
    fn from(err: ShapeError) -> Self {
        SuggestError::DimensionMismatch(err)
    }
}

impl From<ModelError> for SuggestError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Input(shape) => SuggestError::DimensionMismatch(shape),
            other => SuggestError::Model(other),
        }
    }
}

/// Predicts mastering targets from stored genre profiles.
pub struct SuggestionEngine<S = FsArtifactSource> {
    source: S,
    store: ProfileStore,
    vocabulary: Vec<String>,
}

impl SuggestionEngine {
    pub fn new(config: &Config) -> Self {
        Self::with_source(config, FsArtifactSource::new(&config.paths.model_dir))
    }
}

impl<S: ArtifactSource> SuggestionEngine<S> {
    pub fn with_source(config: &Config, source: S) -> Self {
        Self {
            source,
            store: ProfileStore::from_config(&config.paths),
            vocabulary: config.genres.focus.clone(),
        }
    }

    /// Suggested targets for `genre`. Artifacts are loaded before the profile
    /// is looked up, so a broken model install is reported first.
    pub fn get_suggestions(&self, genre: &str) -> Result<SuggestionResult, SuggestError> {
        let artifacts = self.source.load()?;

        let profile = self.store.load(genre).map_err(|err| match err {
            StoreError::NotFound(_) => SuggestError::ProfileNotFound {
                genre: genre.to_string(),
            },
            source => SuggestError::Profile {
                genre: genre.to_string(),
                source,
            },
        })?;

        let input = features::encode_profile(&profile, &self.vocabulary);
        let scaled = artifacts.feature_scaler.transform(&input)?;
        let predicted = artifacts.model.predict(&scaled)?;
        let targets = artifacts.target_scaler.inverse_transform(&predicted)?;
        ShapeError::check("suggestion", TARGET_COUNT, targets.len())?;

        let result = SuggestionResult {
            rms_mid: targets[0],
            rms_side: targets[1],
            stereo_width: targets[2],
        };
        log::info!(
            "Suggestions for {}: rms_mid={:.4} rms_side={:.4} stereo_width={:.4}",
            genre,
            result.rms_mid,
            result.rms_side,
            result.stereo_width
        );
        Ok(result)
    }
}
