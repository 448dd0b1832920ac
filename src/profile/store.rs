use std::path::{Path, PathBuf};

use super::document::{GenreProfile, InvalidProfile};
use crate::config::PathsConfig;

pub const ASSET_EXTENSION: &str = "mp3";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid genre name '{0}'")]
    InvalidName(String),
    #[error("genre profile '{0}.json' not found")]
    NotFound(String),
    #[error("failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid profile JSON at {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("profile {path} is malformed")]
    Invalid {
        path: PathBuf,
        #[source]
        source: InvalidProfile,
    },
}

/// Resolves genre names to profile documents in the built-in catalog and the
/// custom profile directory.
#[derive(Clone, Debug)]
pub struct ProfileStore {
    profiles_dir: PathBuf,
    custom_dir: PathBuf,
}

/// Genre names become directory and file names, so they must be a single
/// plain path component.
pub fn validate_genre_name(genre: &str) -> Result<(), StoreError> {
    let trimmed = genre.trim();
    let bad = trimmed.is_empty()
        || trimmed != genre
        || genre == "."
        || genre.contains("..")
        || genre.chars().any(|c| matches!(c, '/' | '\\' | ':' | '\0'));
    if bad {
        return Err(StoreError::InvalidName(genre.to_string()));
    }
    Ok(())
}

impl ProfileStore {
    pub fn new(profiles_dir: impl Into<PathBuf>, custom_dir: impl Into<PathBuf>) -> Self {
        Self {
            profiles_dir: profiles_dir.into(),
            custom_dir: custom_dir.into(),
        }
    }

    pub fn from_config(paths: &PathsConfig) -> Self {
        Self::new(&paths.profiles_dir, &paths.custom_dir)
    }

    pub fn builtin_path(&self, genre: &str) -> PathBuf {
        self.profiles_dir.join(format!("{}.json", genre))
    }

    pub fn custom_genre_dir(&self, genre: &str) -> PathBuf {
        self.custom_dir.join(genre)
    }

    pub fn custom_profile_path(&self, genre: &str) -> PathBuf {
        self.custom_genre_dir(genre).join(format!("{}.json", genre))
    }

    pub fn custom_asset_path(&self, genre: &str) -> PathBuf {
        self.custom_genre_dir(genre)
            .join(format!("{}.{}", genre, ASSET_EXTENSION))
    }

    /// Built-in catalog first, then the custom directory.
    pub fn locate(&self, genre: &str) -> Result<PathBuf, StoreError> {
        validate_genre_name(genre)?;
        let builtin = self.builtin_path(genre);
        if builtin.is_file() {
            return Ok(builtin);
        }
        let custom = self.custom_profile_path(genre);
        if custom.is_file() {
            return Ok(custom);
        }
        Err(StoreError::NotFound(genre.to_string()))
    }

    pub fn load(&self, genre: &str) -> Result<GenreProfile, StoreError> {
        let path = self.locate(genre)?;
        log::debug!("Loading profile for '{}' from {}", genre, path.display());
        read_profile(&path)
    }

    /// Write `profile` as `<custom_dir>/<genre>/<genre>.json`, replacing any
    /// previous document.
    pub fn save(&self, profile: &GenreProfile) -> Result<PathBuf, StoreError> {
        validate_genre_name(&profile.genre)?;
        let dir = self.custom_genre_dir(&profile.genre);
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let path = self.custom_profile_path(&profile.genre);
        let json = serde_json::to_string_pretty(profile).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Built-in genres (sorted) followed by custom genres (sorted) not
    /// already listed.
    pub fn list_genres(&self) -> Result<Vec<String>, StoreError> {
        let mut builtin = Vec::new();
        for entry in read_dir_if_exists(&self.profiles_dir)? {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    builtin.push(stem.to_string());
                }
            }
        }
        builtin.sort();

        let mut custom = Vec::new();
        for entry in read_dir_if_exists(&self.custom_dir)? {
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    if !builtin.iter().any(|g| g == name) {
                        custom.push(name.to_string());
                    }
                }
            }
        }
        custom.sort();

        builtin.extend(custom);
        Ok(builtin)
    }
}

fn read_dir_if_exists(dir: &Path) -> Result<Vec<std::fs::DirEntry>, StoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let io_err = |source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    };
    std::fs::read_dir(dir)
        .map_err(io_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)
}

pub fn read_profile(path: &Path) -> Result<GenreProfile, StoreError> {
    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let profile: GenreProfile =
        serde_json::from_str(&content).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    profile.validate().map_err(|source| StoreError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(profile)
}
