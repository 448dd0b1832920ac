//! Channel arithmetic shared by the processor and the feature extractor.

use super::decode::AudioData;

/// Split a channel pair into mid `(L + R) / 2` and side `(L - R) / 2`.
///
/// A single channel is treated as dual mono, so side is silent.
pub fn lr_to_ms(audio: &AudioData) -> (Vec<f32>, Vec<f32>) {
    let n = audio.num_frames();
    match audio.channels.as_slice() {
        [] => (Vec::new(), Vec::new()),
        [mono] => (mono[..n].to_vec(), vec![0.0; n]),
        [left, right, ..] => left[..n]
            .iter()
            .zip(&right[..n])
            .map(|(&l, &r)| ((l + r) * 0.5, (l - r) * 0.5))
            .unzip(),
    }
}

/// Inverse of [`lr_to_ms`].
pub fn ms_to_lr(mid: &[f32], side: &[f32]) -> (Vec<f32>, Vec<f32>) {
    mid.iter().zip(side).map(|(&m, &s)| (m + s, m - s)).unzip()
}

pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt()
}

/// RMS over every sample of every channel.
pub fn rms_all(audio: &AudioData) -> f64 {
    let n = audio.num_frames();
    let count = n * audio.num_channels();
    if count == 0 {
        return 0.0;
    }
    let sum: f64 = audio
        .channels
        .iter()
        .flat_map(|ch| ch[..n].iter())
        .map(|&s| (s as f64) * (s as f64))
        .sum();
    (sum / count as f64).sqrt()
}

pub fn mean_abs(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&s| s.abs() as f64).sum::<f64>() / samples.len() as f64
}

pub fn peak(audio: &AudioData) -> f32 {
    audio
        .channels
        .iter()
        .flat_map(|ch| ch.iter())
        .map(|s| s.abs())
        .fold(0.0f32, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mid_side_inverts() {
        let audio = AudioData::new(vec![vec![0.5, -0.25, 1.0], vec![0.1, 0.25, -1.0]], 8000);
        let (mid, side) = lr_to_ms(&audio);
        assert!((mid[0] - 0.3).abs() < 1e-6);
        assert_eq!(&mid[1..], &[0.0, 0.0]);
        assert!((side[2] - 1.0).abs() < 1e-6);
        let (l, r) = ms_to_lr(&mid, &side);
        for (a, b) in l.iter().zip(&audio.channels[0]) {
            assert!((a - b).abs() < 1e-6);
        }
        for (a, b) in r.iter().zip(&audio.channels[1]) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn mono_has_silent_side() {
        let audio = AudioData::new(vec![vec![0.2, -0.4]], 8000);
        let (mid, side) = lr_to_ms(&audio);
        assert_eq!(mid, vec![0.2, -0.4]);
        assert_eq!(side, vec![0.0, 0.0]);
    }

    #[test]
    fn sine_rms_and_mean_abs() {
        let n = 48000;
        let sine: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 100.0 * i as f32 / n as f32).sin())
            .collect();
        assert!((rms(&sine) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-4);
        assert!((mean_abs(&sine) - 2.0 / std::f64::consts::PI).abs() < 1e-3);
    }

    #[test]
    fn empty_inputs_measure_zero() {
        assert_eq!(rms(&[]), 0.0);
        assert_eq!(mean_abs(&[]), 0.0);
        assert_eq!(rms_all(&AudioData::new(vec![], 44100)), 0.0);
    }

    #[test]
    fn rms_all_spans_channels() {
        let audio = AudioData::new(vec![vec![1.0; 4], vec![0.0; 4]], 8000);
        assert!((rms_all(&audio) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9);
        assert_eq!(peak(&audio), 1.0);
    }
}
