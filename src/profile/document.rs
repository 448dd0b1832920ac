use serde::{Deserialize, Serialize};

use super::extract::FeatureRecord;

pub const PROFILE_VERSION: &str = "1.0";

/// Persisted descriptor set for one genre. Field order matches the on-disk
/// document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenreProfile {
    pub version: String,
    pub genre: String,
    pub initial_rms: f64,
    pub rms_mid: f64,
    pub rms_side: f64,
    pub rms_after_matching: f64,
    pub stereo_width_mid: f64,
    pub stereo_width_side: f64,
    pub simplified_spectrum_mid: Vec<f64>,
    pub simplified_spectrum_side: Vec<f64>,
    pub level_correction_mid: f64,
    pub level_correction_side: f64,
    pub lufs: f64,
    pub spectral_centroid: f64,
    pub spectral_bandwidth: f64,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InvalidProfile {
    #[error("field `{0}` is not a finite number")]
    NonFinite(&'static str),
    #[error("spectrum lengths differ: mid has {mid} bands, side has {side}")]
    SpectrumLength { mid: usize, side: usize },
}

impl GenreProfile {
    pub fn from_record(genre: &str, record: &FeatureRecord) -> Self {
        Self {
            version: PROFILE_VERSION.to_string(),
            genre: genre.to_string(),
            initial_rms: record.initial_rms,
            rms_mid: record.rms_mid,
            rms_side: record.rms_side,
            rms_after_matching: record.rms_after_matching,
            stereo_width_mid: record.stereo_width_mid,
            stereo_width_side: record.stereo_width_side,
            simplified_spectrum_mid: record.simplified_spectrum_mid.clone(),
            simplified_spectrum_side: record.simplified_spectrum_side.clone(),
            level_correction_mid: record.level_correction_mid,
            level_correction_side: record.level_correction_side,
            lufs: record.lufs,
            spectral_centroid: record.spectral_centroid,
            spectral_bandwidth: record.spectral_bandwidth,
        }
    }

    /// The nine scalar descriptors in model input order.
    pub fn scalar_descriptors(&self) -> [f64; 9] {
        [
            self.initial_rms,
            self.rms_mid,
            self.rms_side,
            self.rms_after_matching,
            self.stereo_width_mid,
            self.stereo_width_side,
            self.lufs,
            self.spectral_centroid,
            self.spectral_bandwidth,
        ]
    }

    pub fn band_count(&self) -> usize {
        self.simplified_spectrum_mid.len()
    }

    pub fn validate(&self) -> Result<(), InvalidProfile> {
        let scalars = [
            ("initial_rms", self.initial_rms),
            ("rms_mid", self.rms_mid),
            ("rms_side", self.rms_side),
            ("rms_after_matching", self.rms_after_matching),
            ("stereo_width_mid", self.stereo_width_mid),
            ("stereo_width_side", self.stereo_width_side),
            ("level_correction_mid", self.level_correction_mid),
            ("level_correction_side", self.level_correction_side),
            ("lufs", self.lufs),
            ("spectral_centroid", self.spectral_centroid),
            ("spectral_bandwidth", self.spectral_bandwidth),
        ];
        if let Some((name, _)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
            return Err(InvalidProfile::NonFinite(name));
        }
        if self.simplified_spectrum_mid.iter().any(|v| !v.is_finite()) {
            return Err(InvalidProfile::NonFinite("simplified_spectrum_mid"));
        }
        if self.simplified_spectrum_side.iter().any(|v| !v.is_finite()) {
            return Err(InvalidProfile::NonFinite("simplified_spectrum_side"));
        }
        if self.simplified_spectrum_mid.len() != self.simplified_spectrum_side.len() {
            return Err(InvalidProfile::SpectrumLength {
                mid: self.simplified_spectrum_mid.len(),
                side: self.simplified_spectrum_side.len(),
            });
        }
        Ok(())
    }
}
