use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub encode: EncodeConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub genres: GenreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Rate audio is loaded at before any analysis
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Upsampling factor applied to the processed signal before measurement
    #[serde(default = "default_oversampling_factor")]
    pub oversampling_factor: u32,
    /// STFT size for the mid/side simplified spectra
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    /// Number of mel bands in each simplified spectrum
    #[serde(default = "default_band_count")]
    pub band_count: usize,
    /// Matching iterations for the self-referenced processing pass
    #[serde(default = "default_processing_passes")]
    pub processing_passes: u32,
    /// Frequency axis for centroid, bandwidth and mel projection.
    /// The pretrained model was fit against descriptors on a 22050 Hz axis.
    #[serde(default = "default_descriptor_sample_rate")]
    pub descriptor_sample_rate: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncodeConfig {
    /// External encoder binary, looked up on PATH when not absolute
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default = "default_bitrate_kbps")]
    pub bitrate_kbps: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Read-only catalog of built-in `<genre>.json` profiles
    #[serde(default = "default_profiles_dir")]
    pub profiles_dir: PathBuf,
    /// User profiles, one `<genre>/` subdirectory each
    #[serde(default = "default_custom_dir")]
    pub custom_dir: PathBuf,
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenreConfig {
    /// Ordered one-hot vocabulary the model was trained on
    #[serde(default = "default_focus_genres")]
    pub focus: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            oversampling_factor: default_oversampling_factor(),
            fft_size: default_fft_size(),
            band_count: default_band_count(),
            processing_passes: default_processing_passes(),
            descriptor_sample_rate: default_descriptor_sample_rate(),
        }
    }
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            bitrate_kbps: default_bitrate_kbps(),
            channels: default_channels(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            profiles_dir: default_profiles_dir(),
            custom_dir: default_custom_dir(),
            model_dir: default_model_dir(),
        }
    }
}

impl Default for GenreConfig {
    fn default() -> Self {
        Self {
            focus: default_focus_genres(),
        }
    }
}

impl Config {
    /// Config rooted at `root`: every storage directory is placed under it.
    pub fn with_root(root: &Path) -> Self {
        Self {
            paths: PathsConfig {
                profiles_dir: root.join(default_profiles_dir()),
                custom_dir: root.join(default_custom_dir()),
                model_dir: root.join(default_model_dir()),
            },
            ..Self::default()
        }
    }
}

fn default_sample_rate() -> u32 { 44100 }
fn default_oversampling_factor() -> u32 { 2 }
fn default_fft_size() -> usize { 2048 }
fn default_band_count() -> usize { 10 }
fn default_processing_passes() -> u32 { 4 }
fn default_descriptor_sample_rate() -> u32 { 22050 }
fn default_ffmpeg() -> String { "ffmpeg".into() }
fn default_bitrate_kbps() -> u32 { 320 }
fn default_channels() -> u16 { 2 }
fn default_profiles_dir() -> PathBuf { PathBuf::from("profiles") }
fn default_custom_dir() -> PathBuf { PathBuf::from("custom") }
fn default_model_dir() -> PathBuf { PathBuf::from("model") }

fn default_focus_genres() -> Vec<String> {
    [
        "Pop", "EDM", "Rock", "Dance", "Hiphop", "Ambient", "Chillout", "Orchestral", "Speech",
        "Piano",
    ]
    .iter()
    .map(|g| g.to_string())
    .collect()
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::debug!("Config parse error in {}: {}", path.display(), err);
            None
        }
    }
}
