use serde::{Deserialize, Serialize};

use super::ShapeError;

/// Fitted per-column affine scaler, stored as tagged JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    /// `x' = (x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x' = x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ScalerError {
    #[error("scaler has no columns")]
    Empty,
    #[error("scaler offset has {offset} columns but scale has {scale}")]
    Columns { offset: usize, scale: usize },
    #[error("scaler column {0} is not finite")]
    NonFinite(usize),
}

/// Constant columns are fitted with a zero scale, which acts as one.
fn safe_scale(s: f64) -> f64 {
    if s == 0.0 {
        1.0
    } else {
        s
    }
}

impl Scaler {
    fn parts(&self) -> (&[f64], &[f64]) {
        match self {
            Scaler::Standard { mean, scale } => (mean.as_slice(), scale.as_slice()),
            Scaler::MinMax { min, scale } => (min.as_slice(), scale.as_slice()),
        }
    }

    pub fn dim(&self) -> usize {
        self.parts().1.len()
    }

    pub fn validate(&self) -> Result<(), ScalerError> {
        let (offset, scale) = self.parts();
        if scale.is_empty() {
            return Err(ScalerError::Empty);
        }
        if offset.len() != scale.len() {
            return Err(ScalerError::Columns {
                offset: offset.len(),
                scale: scale.len(),
            });
        }
        if let Some(i) = offset
            .iter()
            .zip(scale)
            .position(|(o, s)| !o.is_finite() || !s.is_finite())
        {
            return Err(ScalerError::NonFinite(i));
        }
        Ok(())
    }

    pub fn transform(&self, x: &[f64]) -> Result<Vec<f64>, ShapeError> {
        ShapeError::check("scaler", self.dim(), x.len())?;
        Ok(match self {
            Scaler::Standard { mean, scale } => x
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(v, (m, s))| (v - m) / safe_scale(*s))
                .collect(),
            Scaler::MinMax { min, scale } => x
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(v, (m, s))| v * s + m)
                .collect(),
        })
    }

    pub fn inverse_transform(&self, x: &[f64]) -> Result<Vec<f64>, ShapeError> {
        ShapeError::check("inverse scaler", self.dim(), x.len())?;
        Ok(match self {
            Scaler::Standard { mean, scale } => x
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(v, (m, s))| v * safe_scale(*s) + m)
                .collect(),
            Scaler::MinMax { min, scale } => x
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(v, (m, s))| (v - m) / safe_scale(*s))
                .collect(),
        })
    }
}
