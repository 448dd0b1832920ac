use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::decode::AudioData;

/// FFT size and hop used for centroid and bandwidth descriptors.
pub const DESCRIPTOR_FFT_SIZE: usize = 2048;
pub const DESCRIPTOR_HOP_SIZE: usize = 512;

/// Centred short-time Fourier transform producing magnitude frames.
///
/// The signal is zero-padded by `n_fft / 2` on both sides, so frame `t` is
/// centred on sample `t * hop` and there are `1 + len / hop` frames.
pub struct Stft {
    n_fft: usize,
    hop: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl Stft {
    /// Hop defaults to a quarter of the window.
    pub fn new(n_fft: usize) -> Self {
        Self::with_hop(n_fft, (n_fft / 4).max(1))
    }

    pub fn with_hop(n_fft: usize, hop: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n_fft);
        Self {
            n_fft,
            hop: hop.max(1),
            window: hann_window(n_fft),
            fft,
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    pub fn num_frames(&self, len: usize) -> usize {
        1 + len / self.hop
    }

    /// Call `f` with the magnitude spectrum (`n_fft / 2 + 1` bins) of each frame.
    pub fn for_each_frame(&self, samples: &[f32], mut f: impl FnMut(&[f32])) {
        let half = self.n_fft / 2;
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        let mut magnitudes = vec![0.0f32; self.num_bins()];

        for frame in 0..self.num_frames(samples.len()) {
            let center = frame * self.hop;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let sample = (center + i)
                    .checked_sub(half)
                    .and_then(|idx| samples.get(idx))
                    .copied()
                    .unwrap_or(0.0);
                *slot = Complex::new(sample * self.window[i], 0.0);
            }
            self.fft.process(&mut buffer);
            for (mag, c) in magnitudes.iter_mut().zip(&buffer) {
                *mag = c.norm();
            }
            f(&magnitudes);
        }
    }

    pub fn magnitudes(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let mut frames = Vec::with_capacity(self.num_frames(samples.len()));
        self.for_each_frame(samples, |mags| frames.push(mags.to_vec()));
        frames
    }
}

/// Periodic Hann window.
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
        .collect()
}

/// Centre frequency of every FFT bin.
pub fn fft_frequencies(sample_rate: f32, n_fft: usize) -> Vec<f32> {
    (0..=n_fft / 2)
        .map(|k| k as f32 * sample_rate / n_fft as f32)
        .collect()
}

const MEL_F_SP: f64 = 200.0 / 3.0;
const MEL_MIN_LOG_HZ: f64 = 1000.0;
const MEL_MIN_LOG_MEL: f64 = MEL_MIN_LOG_HZ / MEL_F_SP;

fn mel_log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Slaney mel scale: linear below 1 kHz, logarithmic above.
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MEL_MIN_LOG_HZ {
        MEL_MIN_LOG_MEL + (hz / MEL_MIN_LOG_HZ).ln() / mel_log_step()
    } else {
        hz / MEL_F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MEL_MIN_LOG_MEL {
        MEL_MIN_LOG_HZ * (mel_log_step() * (mel - MEL_MIN_LOG_MEL)).exp()
    } else {
        mel * MEL_F_SP
    }
}

/// Triangular mel filters spanning 0 Hz to Nyquist, area-normalised
/// (each filter scaled by `2 / bandwidth`).
pub struct MelFilterbank {
    weights: Vec<Vec<f32>>,
}

impl MelFilterbank {
    pub fn new(sample_rate: f32, n_fft: usize, n_mels: usize) -> Self {
        let fmax = sample_rate as f64 / 2.0;
        let mel_max = hz_to_mel(fmax);
        let mel_f: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
            .collect();
        let fft_freqs = fft_frequencies(sample_rate, n_fft);

        let weights = (0..n_mels)
            .map(|m| {
                let lower_width = mel_f[m + 1] - mel_f[m];
                let upper_width = mel_f[m + 2] - mel_f[m + 1];
                let enorm = 2.0 / (mel_f[m + 2] - mel_f[m]);
                fft_freqs
                    .iter()
                    .map(|&f| {
                        let f = f as f64;
                        let lower = (f - mel_f[m]) / lower_width;
                        let upper = (mel_f[m + 2] - f) / upper_width;
                        (lower.min(upper).max(0.0) * enorm) as f32
                    })
                    .collect()
            })
            .collect();

        Self { weights }
    }

    pub fn num_bands(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[Vec<f32>] {
        &self.weights
    }

    pub fn project(&self, spectrum: &[f32]) -> Vec<f64> {
        self.weights
            .iter()
            .map(|filter| {
                filter
                    .iter()
                    .zip(spectrum)
                    .map(|(&w, &s)| w as f64 * s as f64)
                    .sum()
            })
            .collect()
    }
}

/// Time-averaged mel projection of the magnitude spectrum.
///
/// `axis_rate` defines the frequency axis of the filterbank; it need not be
/// the rate the samples were recorded at.
pub fn simplified_spectrum(
    samples: &[f32],
    n_fft: usize,
    axis_rate: u32,
    bands: usize,
) -> Vec<f64> {
    let stft = Stft::new(n_fft);
    let filterbank = MelFilterbank::new(axis_rate as f32, n_fft, bands);

    let mut sums = vec![0.0f64; bands];
    let mut frames = 0usize;
    stft.for_each_frame(samples, |mags| {
        for (sum, v) in sums.iter_mut().zip(filterbank.project(mags)) {
            *sum += v;
        }
        frames += 1;
    });

    if frames > 0 {
        for sum in &mut sums {
            *sum /= frames as f64;
        }
    }
    sums
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpectralShape {
    /// Mean spectral centroid in Hz
    pub centroid: f64,
    /// Mean second-order spectral bandwidth in Hz
    pub bandwidth: f64,
}

/// Centroid and bandwidth of one magnitude frame. Silent frames yield zeros.
fn frame_shape(mags: &[f32], freqs: &[f32]) -> (f64, f64) {
    let total: f64 = mags.iter().map(|&m| m as f64).sum();
    if total <= f64::MIN_POSITIVE {
        return (0.0, 0.0);
    }
    let centroid: f64 = mags
        .iter()
        .zip(freqs)
        .map(|(&m, &f)| m as f64 / total * f as f64)
        .sum();
    let spread: f64 = mags
        .iter()
        .zip(freqs)
        .map(|(&m, &f)| m as f64 / total * (f as f64 - centroid).powi(2))
        .sum();
    (centroid, spread.sqrt())
}

/// Centroid and bandwidth averaged over every frame of every channel.
pub fn spectral_shape(audio: &AudioData, axis_rate: u32) -> SpectralShape {
    let stft = Stft::with_hop(DESCRIPTOR_FFT_SIZE, DESCRIPTOR_HOP_SIZE);
    let freqs = fft_frequencies(axis_rate as f32, DESCRIPTOR_FFT_SIZE);
    let frames = audio.num_frames();

    let mut centroid_sum = 0.0;
    let mut bandwidth_sum = 0.0;
    let mut count = 0usize;
    for ch in &audio.channels {
        stft.for_each_frame(&ch[..frames], |mags| {
            let (c, b) = frame_shape(mags, &freqs);
            centroid_sum += c;
            bandwidth_sum += b;
            count += 1;
        });
    }

    if count == 0 {
        return SpectralShape { centroid: 0.0, bandwidth: 0.0 };
    }
    SpectralShape {
        centroid: centroid_sum / count as f64,
        bandwidth: bandwidth_sum / count as f64,
    }
}
