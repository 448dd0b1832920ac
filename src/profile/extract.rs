use crate::audio::decode::AudioData;
use crate::audio::reference::{ProcessError, ReferenceProcessor};
use crate::audio::resample::{self, ResampleError};
use crate::audio::{loudness, signal, spectral};
use crate::config::AnalysisConfig;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("input waveform is empty")]
    EmptySignal,
    #[error("reference processing failed")]
    Processing(#[source] ProcessError),
    #[error("oversampling failed")]
    Resample(#[source] ResampleError),
}

/// Everything measured from one reference track.
#[derive(Clone, Debug)]
pub struct FeatureRecord {
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
    /// Unprocessed input, kept for re-encoding the profile's audio asset
    pub waveform: AudioData,
}

impl FeatureRecord {
    pub fn sample_rate(&self) -> u32 {
        self.waveform.sample_rate
    }
}

/// Share of the combined mid+side RMS carried by each channel.
/// A fully silent pair splits evenly.
pub fn stereo_width(rms_mid: f64, rms_side: f64) -> (f64, f64) {
    let total = rms_mid + rms_side;
    if total <= f64::EPSILON {
        return (0.5, 0.5);
    }
    (rms_mid / total, rms_side / total)
}

pub struct FeatureExtractor<'a, P> {
    config: &'a AnalysisConfig,
    processor: P,
}

impl<'a, P: ReferenceProcessor> FeatureExtractor<'a, P> {
    pub fn new(config: &'a AnalysisConfig, processor: P) -> Self {
        Self { config, processor }
    }

    /// Measure `audio`, optionally limited to its first `duration` seconds.
    ///
    /// Processing failures are logged here with their full cause and returned
    /// without any partial record.
    pub fn extract(
        &self,
        audio: &AudioData,
        duration: Option<f32>,
    ) -> Result<FeatureRecord, ExtractError> {
        let mut waveform = audio.clone();
        if let Some(d) = duration {
            waveform.truncate_seconds(d);
        }
        if waveform.is_empty() {
            return Err(ExtractError::EmptySignal);
        }

        log::info!("Processing audio ({} passes)...", self.config.processing_passes);
        let processed = self
            .processor
            .process(&waveform, &waveform, self.config.processing_passes)
            .map_err(|e| {
                log::error!(
                    "Reference processing failed on {} channels x {} frames @ {}Hz: {}",
                    waveform.num_channels(),
                    waveform.num_frames(),
                    waveform.sample_rate,
                    e
                );
                ExtractError::Processing(e)
            })?;

        log::info!("Oversampling x{}...", self.config.oversampling_factor);
        let oversampled = resample::oversample(&processed, self.config.oversampling_factor)
            .map_err(|e| {
                log::error!(
                    "Oversampling x{} from {}Hz failed: {}",
                    self.config.oversampling_factor,
                    processed.sample_rate,
                    e
                );
                ExtractError::Resample(e)
            })?;

        log::info!("Converting to mid-side...");
        let (mid, side) = signal::lr_to_ms(&oversampled);

        let initial_rms = signal::rms_all(&oversampled);
        let rms_mid = signal::rms(&mid);
        let rms_side = signal::rms(&side);

        log::info!("Calculating RMS after matching...");
        let rms_after_matching = loudness::improved_rms(&oversampled);

        let (stereo_width_mid, stereo_width_side) = stereo_width(rms_mid, rms_side);

        log::info!("Calculating frequency spectrum...");
        let axis = self.config.descriptor_sample_rate;
        let (n_fft, bands) = (self.config.fft_size, self.config.band_count);
        let simplified_spectrum_mid = spectral::simplified_spectrum(&mid, n_fft, axis, bands);
        let simplified_spectrum_side = spectral::simplified_spectrum(&side, n_fft, axis, bands);

        let level_correction_mid = signal::mean_abs(&mid);
        let level_correction_side = signal::mean_abs(&side);

        log::info!("Calculating LUFS...");
        let lufs = loudness::integrated_lufs(&oversampled);

        let shape = spectral::spectral_shape(&oversampled, axis);

        log::debug!(
            "rms={:.5} mid={:.5} side={:.5} matched={:.5} width={:.3}/{:.3} \
             lufs={:.2} centroid={:.1} bandwidth={:.1}",
            initial_rms,
            rms_mid,
            rms_side,
            rms_after_matching,
            stereo_width_mid,
            stereo_width_side,
            lufs,
            shape.centroid,
            shape.bandwidth
        );
        log::info!("Feature extraction complete.");

        Ok(FeatureRecord {
            initial_rms,
            rms_mid,
            rms_side,
            rms_after_matching,
            stereo_width_mid,
            stereo_width_side,
            simplified_spectrum_mid,
            simplified_spectrum_side,
            level_correction_mid,
            level_correction_side,
            lufs,
            spectral_centroid: shape.centroid,
            spectral_bandwidth: shape.bandwidth,
            waveform,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audio::reference::LevelMatchProcessor;

    /// Stereo test signal: a shared tone plus uncorrelated noise per channel.
    pub(crate) fn test_signal(rate: u32, seconds: f32) -> AudioData {
        let frames = (rate as f32 * seconds) as usize;
        let mut seed = 0x2545_f491u32;
        let mut noise = move || {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (seed >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0
        };
        let mut left = Vec::with_capacity(frames);
        let mut right = Vec::with_capacity(frames);
        for i in 0..frames {
            let tone = (2.0 * std::f32::consts::PI * 220.0 * i as f32 / rate as f32).sin() * 0.4;
            left.push(tone + noise() * 0.1);
            right.push(tone * 0.8 + noise() * 0.1);
        }
        AudioData::new(vec![left, right], rate)
    }

    struct FailingProcessor;

    impl ReferenceProcessor for FailingProcessor {
        fn process(&self, _: &AudioData, _: &AudioData, _: u32) -> Result<AudioData, ProcessError> {
            Err(ProcessError::Empty("target"))
        }
    }

    fn small_config() -> AnalysisConfig {
        AnalysisConfig {
            sample_rate: 22050,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn widths_sum_to_one_and_spectra_have_band_count() {
        let config = small_config();
        let extractor = FeatureExtractor::new(&config, LevelMatchProcessor::default());
        let record = extractor.extract(&test_signal(22050, 1.0), None).unwrap();

        assert!((record.stereo_width_mid + record.stereo_width_side - 1.0).abs() < 1e-9);
        assert!(record.stereo_width_mid > record.stereo_width_side);
        assert_eq!(record.simplified_spectrum_mid.len(), config.band_count);
        assert_eq!(record.simplified_spectrum_side.len(), config.band_count);
        assert!(record.lufs.is_finite() && record.lufs < 0.0);
        assert!(record.spectral_centroid > 0.0);
        assert!(record.spectral_bandwidth > 0.0);
        assert!(record.level_correction_mid > record.level_correction_side);
        assert!(record.initial_rms > 0.0);
        assert!(record.rms_after_matching > 0.0);
    }

    #[test]
    fn keeps_original_waveform() {
        let config = small_config();
        let extractor = FeatureExtractor::new(&config, LevelMatchProcessor::default());
        let input = test_signal(22050, 1.0);
        let record = extractor.extract(&input, None).unwrap();
        assert_eq!(record.waveform, input);
        assert_eq!(record.sample_rate(), 22050);
    }

    #[test]
    fn duration_cap_truncates() {
        let config = small_config();
        let extractor = FeatureExtractor::new(&config, LevelMatchProcessor::default());
        let record = extractor.extract(&test_signal(22050, 1.0), Some(0.5)).unwrap();
        assert_eq!(record.waveform.num_frames(), 11025);
    }

    #[test]
    fn custom_band_count() {
        let config = AnalysisConfig {
            band_count: 6,
            ..small_config()
        };
        let extractor = FeatureExtractor::new(&config, LevelMatchProcessor::default());
        let record = extractor.extract(&test_signal(22050, 0.5), None).unwrap();
        assert_eq!(record.simplified_spectrum_mid.len(), 6);
        assert_eq!(record.simplified_spectrum_side.len(), 6);
    }

    #[test]
    fn mono_input_is_all_mid() {
        let config = small_config();
        let extractor = FeatureExtractor::new(&config, LevelMatchProcessor::default());
        let mono = AudioData::new(vec![test_signal(22050, 0.5).channels[0].clone()], 22050);
        let record = extractor.extract(&mono, None).unwrap();
        assert_eq!(record.stereo_width_mid, 1.0);
        assert_eq!(record.stereo_width_side, 0.0);
        assert!(record.simplified_spectrum_side.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn processing_failure_yields_no_record() {
        let config = small_config();
        let extractor = FeatureExtractor::new(&config, FailingProcessor);
        let result = extractor.extract(&test_signal(22050, 0.5), None);
        assert!(matches!(result, Err(ExtractError::Processing(_))));
    }

    #[test]
    fn bad_oversampling_factor_yields_no_record() {
        let config = AnalysisConfig {
            oversampling_factor: 0,
            ..small_config()
        };
        let extractor = FeatureExtractor::new(&config, LevelMatchProcessor::default());
        let result = extractor.extract(&test_signal(22050, 0.5), None);
        assert!(matches!(
            result,
            Err(ExtractError::Resample(ResampleError::InvalidRate { from: 22050, to: 0 }))
        ));
    }

    #[test]
    fn surround_input_is_measured_on_front_pair() {
        let config = small_config();
        let extractor = FeatureExtractor::new(&config, LevelMatchProcessor::default());
        let stereo = test_signal(22050, 0.5);
        let mut channels = stereo.channels.clone();
        channels.extend((0..4).map(|_| vec![0.0; stereo.num_frames()]));
        let surround = AudioData::new(channels, 22050);

        let record = extractor.extract(&surround, None).unwrap();
        let reference = extractor.extract(&stereo, None).unwrap();
        assert_eq!(record.waveform.num_channels(), 6);
        assert!((record.rms_mid - reference.rms_mid).abs() < 1e-9);
        assert!((record.stereo_width_mid - reference.stereo_width_mid).abs() < 1e-9);
        assert_eq!(record.simplified_spectrum_mid, reference.simplified_spectrum_mid);
    }

    #[test]
    fn empty_input_is_rejected() {
        let config = small_config();
        let extractor = FeatureExtractor::new(&config, LevelMatchProcessor::default());
        let empty = AudioData::new(vec![vec![], vec![]], 22050);
        assert!(matches!(extractor.extract(&empty, None), Err(ExtractError::EmptySignal)));
    }

    #[test]
    fn silent_pair_splits_evenly() {
        assert_eq!(stereo_width(0.0, 0.0), (0.5, 0.5));
        let (m, s) = stereo_width(0.3, 0.1);
        assert!((m - 0.75).abs() < 1e-12 && (s - 0.25).abs() < 1e-12);
    }
}
