//! Sample rate conversion using rubato.
//!
//! Used twice in the pipeline: bringing decoded files to the analysis rate and
//! oversampling the processed signal before measurement.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};

use super::decode::AudioData;

const CHUNK_SIZE: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum ResampleError {
    #[error("invalid rate conversion {from}Hz -> {to}Hz")]
    InvalidRate { from: u32, to: u32 },
    #[error("failed to create resampler: {0}")]
    Construction(#[from] rubato::ResamplerConstructionError),
    #[error("resampling failed: {0}")]
    Process(#[from] rubato::ResampleError),
}

/// Resample every channel of `audio` to `target_rate`.
///
/// The resampler's group delay is trimmed so the output is time-aligned with
/// the input and holds `round(frames * ratio)` frames.
pub fn resample(audio: &AudioData, target_rate: u32) -> Result<AudioData, ResampleError> {
    let input_rate = audio.sample_rate;
    if input_rate == 0 || target_rate == 0 {
        return Err(ResampleError::InvalidRate { from: input_rate, to: target_rate });
    }
    if input_rate == target_rate || audio.is_empty() {
        log::debug!("Sample rate already at {}Hz, skipping resample", target_rate);
        return Ok(AudioData::new(audio.channels.clone(), target_rate));
    }

    let channels = audio.num_channels();
    let frames = audio.num_frames();
    let ratio = target_rate as f64 / input_rate as f64;
    let expected = (frames as f64 * ratio).round() as usize;

    log::debug!(
        "Resampling {} frames from {}Hz to {}Hz ({} channels)",
        frames, input_rate, target_rate, channels
    );

    let mut resampler = FastFixedIn::<f32>::new(
        ratio,
        1.0,
        PolynomialDegree::Septic,
        CHUNK_SIZE,
        channels,
    )?;
    let delay = resampler.output_delay();

    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); channels];

    let mut pos = 0;
    while pos + CHUNK_SIZE <= frames {
        let chunk: Vec<&[f32]> = audio.channels.iter().map(|c| &c[pos..pos + CHUNK_SIZE]).collect();
        let block = resampler.process(&chunk, None)?;
        append(&mut output, block);
        pos += CHUNK_SIZE;
    }

    if pos < frames {
        let chunk: Vec<&[f32]> = audio.channels.iter().map(|c| &c[pos..frames]).collect();
        let block = resampler.process_partial(Some(chunk.as_slice()), None)?;
        append(&mut output, block);
    }

    // Push silence through until the delayed tail has come out
    while output[0].len() < expected + delay {
        let block = resampler.process_partial(None::<&[&[f32]]>, None)?;
        if block.first().map_or(true, Vec::is_empty) {
            break;
        }
        append(&mut output, block);
    }

    for ch in &mut output {
        ch.drain(..delay.min(ch.len()));
        ch.truncate(expected);
    }

    Ok(AudioData::new(output, target_rate))
}

/// Resample to `factor` times the current rate.
pub fn oversample(audio: &AudioData, factor: u32) -> Result<AudioData, ResampleError> {
    let target = audio
        .sample_rate
        .checked_mul(factor)
        .filter(|&r| r > 0)
        .ok_or(ResampleError::InvalidRate {
            from: audio.sample_rate,
            to: audio.sample_rate.saturating_mul(factor),
        })?;
    resample(audio, target)
}

fn append(output: &mut [Vec<f32>], block: Vec<Vec<f32>>) {
    for (out, ch) in output.iter_mut().zip(block) {
        out.extend_from_slice(&ch);
    }
}
