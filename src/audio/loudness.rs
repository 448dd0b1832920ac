//! Loudness measurements: ITU-R BS.1770 integrated LUFS and gated RMS.

use super::decode::AudioData;

/// Reported for signals with no block above the absolute gate.
pub const LOUDNESS_FLOOR: f64 = -70.0;

const ABSOLUTE_GATE: f64 = -70.0;
const RELATIVE_GATE: f64 = -10.0;
const BLOCK_SECONDS: f64 = 0.4;
const BLOCK_OVERLAP: f64 = 0.75;

/// Two-stage K-weighting pre-filter: high shelf then high pass, TDF-II.
#[derive(Debug, Clone)]
struct KWeighting {
    shelf: Biquad,
    high_pass: Biquad,
}

#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Biquad {
    fn new((b0, b1, b2, a1, a2): (f64, f64, f64, f64, f64)) -> Self {
        Self {
            b0,
            b1,
            b2,
            a1,
            a2,
            z1: 0.0,
            z2: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f64) -> f64 {
        let out = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * out + self.z2;
        self.z2 = self.b2 * input - self.a2 * out;
        out
    }
}

impl KWeighting {
    fn new(sample_rate: f64) -> Self {
        Self {
            shelf: Biquad::new(high_shelf_coeffs(sample_rate)),
            high_pass: Biquad::new(high_pass_coeffs(sample_rate)),
        }
    }

    #[inline]
    fn process(&mut self, input: f64) -> f64 {
        self.high_pass.process(self.shelf.process(input))
    }
}

/// +4 dB shelf around 1.68 kHz
fn high_shelf_coeffs(fs: f64) -> (f64, f64, f64, f64, f64) {
    let db = 3.999843853973347;
    let f0 = 1681.974450955533;
    let q = 0.7071752369554196;

    let k = (std::f64::consts::PI * f0 / fs).tan();
    let vh = 10.0_f64.powf(db / 20.0);
    let vb = vh.powf(0.4996667741545416);

    let a0 = 1.0 + k / q + k * k;
    let b0 = (vh + vb * k / q + k * k) / a0;
    let b1 = 2.0 * (k * k - vh) / a0;
    let b2 = (vh - vb * k / q + k * k) / a0;
    let a1 = 2.0 * (k * k - 1.0) / a0;
    let a2 = (1.0 - k / q + k * k) / a0;

    (b0, b1, b2, a1, a2)
}

/// Second-order high pass at 38 Hz
fn high_pass_coeffs(fs: f64) -> (f64, f64, f64, f64, f64) {
    let f0 = 38.13547087602444;
    let q = 0.5003270373238773;

    let k = (std::f64::consts::PI * f0 / fs).tan();
    let a0 = 1.0 + k / q + k * k;

    let a1 = 2.0 * (k * k - 1.0) / a0;
    let a2 = (1.0 - k / q + k * k) / a0;

    (1.0, -2.0, 1.0, a1, a2)
}

/// Mean square of each 400 ms block (75% overlap), summed across channels.
fn block_powers(channels: &[Vec<f64>], sample_rate: u32) -> Vec<f64> {
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    let block = (BLOCK_SECONDS * sample_rate as f64).round() as usize;
    let step = ((1.0 - BLOCK_OVERLAP) * block as f64).round().max(1.0) as usize;
    if block == 0 || frames < block {
        return Vec::new();
    }

    let mut powers = Vec::with_capacity((frames - block) / step + 1);
    let mut start = 0;
    while start + block <= frames {
        let power: f64 = channels
            .iter()
            .map(|ch| ch[start..start + block].iter().map(|s| s * s).sum::<f64>() / block as f64)
            .sum();
        powers.push(power);
        start += step;
    }
    powers
}

/// Two-stage gating: absolute at -70, then relative at -10 below the
/// ungated mean. Returns the mean power of the surviving blocks.
fn gated_mean(powers: &[f64], to_level: impl Fn(f64) -> f64) -> Option<f64> {
    let above_abs: Vec<f64> = powers
        .iter()
        .copied()
        .filter(|&p| p > 0.0 && to_level(p) > ABSOLUTE_GATE)
        .collect();
    if above_abs.is_empty() {
        return None;
    }

    let mean_abs = above_abs.iter().sum::<f64>() / above_abs.len() as f64;
    let relative = to_level(mean_abs) + RELATIVE_GATE;

    let kept: Vec<f64> = above_abs.into_iter().filter(|&p| to_level(p) > relative).collect();
    if kept.is_empty() {
        return None;
    }
    Some(kept.iter().sum::<f64>() / kept.len() as f64)
}

fn lufs_from_power(power: f64) -> f64 {
    -0.691 + 10.0 * power.log10()
}

/// Integrated loudness in LUFS. Signals shorter than one block, or entirely
/// below the absolute gate, read as [`LOUDNESS_FLOOR`].
pub fn integrated_lufs(audio: &AudioData) -> f64 {
    let frames = audio.num_frames();
    let weighted: Vec<Vec<f64>> = audio
        .channels
        .iter()
        .map(|ch| {
            let mut filter = KWeighting::new(audio.sample_rate as f64);
            ch[..frames].iter().map(|&s| filter.process(s as f64)).collect()
        })
        .collect();

    let powers = block_powers(&weighted, audio.sample_rate);
    match gated_mean(&powers, lufs_from_power) {
        Some(power) => lufs_from_power(power).max(LOUDNESS_FLOOR),
        None => LOUDNESS_FLOOR,
    }
}

/// RMS over gated 400 ms blocks, ignoring silence and quiet passages the way
/// integrated loudness does, but without frequency weighting.
///
/// Per-channel powers are averaged, so a full-scale sine in every channel
/// reads the same as its plain RMS.
pub fn improved_rms(audio: &AudioData) -> f64 {
    let frames = audio.num_frames();
    let channels = audio.num_channels().max(1) as f64;
    let samples: Vec<Vec<f64>> = audio
        .channels
        .iter()
        .map(|ch| ch[..frames].iter().map(|&s| s as f64).collect())
        .collect();

    let powers: Vec<f64> = block_powers(&samples, audio.sample_rate)
        .into_iter()
        .map(|p| p / channels)
        .collect();
    let to_db = |p: f64| 10.0 * p.log10();

    match gated_mean(&powers, to_db) {
        Some(power) => power.sqrt(),
        None => super::signal::rms_all(audio),
    }
}
