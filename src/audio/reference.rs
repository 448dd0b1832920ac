//! Reference-based processing pass run before feature extraction.
//!
//! The full mastering chain lives outside this crate; the extractor only needs
//! something that takes a target and a reference and returns a processed
//! signal of the same shape. [`LevelMatchProcessor`] is the built-in one.

use super::decode::AudioData;
use super::signal::{lr_to_ms, ms_to_lr, peak, rms};

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("{0} signal is empty")]
    Empty(&'static str),
    #[error("target has {target} channels but reference has {reference}")]
    ChannelMismatch { target: usize, reference: usize },
    #[error("{0} signal contains non-finite samples")]
    NonFinite(&'static str),
}

pub trait ReferenceProcessor {
    /// Process `target` towards `reference`, running `passes` refinement
    /// iterations. The result has the channel count and length of `target`.
    fn process(
        &self,
        target: &AudioData,
        reference: &AudioData,
        passes: u32,
    ) -> Result<AudioData, ProcessError>;
}

impl<P: ReferenceProcessor + ?Sized> ReferenceProcessor for &P {
    fn process(
        &self,
        target: &AudioData,
        reference: &AudioData,
        passes: u32,
    ) -> Result<AudioData, ProcessError> {
        (**self).process(target, reference, passes)
    }
}

/// Matches mid and side RMS to the reference, one gain step per pass, and
/// keeps the result under a peak ceiling.
///
/// Like [`lr_to_ms`], only the first two channels form the mid/side pair.
/// Further channels are carried through and only share the ceiling scaling.
#[derive(Clone, Debug)]
pub struct LevelMatchProcessor {
    /// Linear sample peak the output is scaled under
    pub ceiling: f32,
}

impl Default for LevelMatchProcessor {
    fn default() -> Self {
        Self { ceiling: 0.999 }
    }
}

fn validate(audio: &AudioData, label: &'static str) -> Result<(), ProcessError> {
    if audio.is_empty() {
        return Err(ProcessError::Empty(label));
    }
    if audio.channels.iter().flatten().any(|s| !s.is_finite()) {
        return Err(ProcessError::NonFinite(label));
    }
    Ok(())
}

fn matching_gain(current: f64, target: f64) -> f32 {
    if current <= f64::EPSILON {
        1.0
    } else {
        (target / current) as f32
    }
}

impl ReferenceProcessor for LevelMatchProcessor {
    fn process(
        &self,
        target: &AudioData,
        reference: &AudioData,
        passes: u32,
    ) -> Result<AudioData, ProcessError> {
        validate(target, "target")?;
        validate(reference, "reference")?;
        if target.num_channels() != reference.num_channels() {
            return Err(ProcessError::ChannelMismatch {
                target: target.num_channels(),
                reference: reference.num_channels(),
            });
        }

        let (ref_mid, ref_side) = lr_to_ms(reference);
        let ref_mid_rms = rms(&ref_mid);
        let ref_side_rms = rms(&ref_side);

        let (mut mid, mut side) = lr_to_ms(target);
        for pass in 0..passes {
            let gain_mid = matching_gain(rms(&mid), ref_mid_rms);
            let gain_side = matching_gain(rms(&side), ref_side_rms);
            mid.iter_mut().for_each(|s| *s *= gain_mid);
            side.iter_mut().for_each(|s| *s *= gain_side);
            log::debug!(
                "Matching pass {}/{}: mid gain {:.4}, side gain {:.4}",
                pass + 1,
                passes,
                gain_mid,
                gain_side
            );
        }

        let channels = if target.num_channels() == 1 {
            vec![mid]
        } else {
            let frames = mid.len();
            let (left, right) = ms_to_lr(&mid, &side);
            let mut channels = vec![left, right];
            channels.extend(target.channels[2..].iter().map(|ch| ch[..frames].to_vec()));
            channels
        };
        let mut processed = AudioData::new(channels, target.sample_rate);

        let level = peak(&processed);
        if level > self.ceiling {
            let scale = self.ceiling / level;
            for ch in &mut processed.channels {
                ch.iter_mut().for_each(|s| *s *= scale);
            }
        }

        Ok(processed)
    }
}
