use std::path::{Path, PathBuf};

use super::document::GenreProfile;
use super::extract::FeatureExtractor;
use super::store::{validate_genre_name, ProfileStore};
use super::ProfileError;
use crate::audio::decode;
use crate::audio::reference::{LevelMatchProcessor, ReferenceProcessor};
use crate::config::Config;
use crate::encode::{AssetEncoder, EncoderKind};

/// Result of a successful profile generation.
#[derive(Clone, Debug)]
pub struct GeneratedProfile {
    pub profile: GenreProfile,
    pub profile_path: PathBuf,
    pub asset_path: PathBuf,
    pub encoder: EncoderKind,
}

/// Turns a reference track into a custom genre profile plus its audio asset.
pub struct ProfileBuilder<'a, P = LevelMatchProcessor> {
    config: &'a Config,
    processor: P,
    store: ProfileStore,
    encoder: AssetEncoder,
}

impl<'a> ProfileBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self::with_processor(config, LevelMatchProcessor::default())
    }
}

impl<'a, P: ReferenceProcessor> ProfileBuilder<'a, P> {
    pub fn with_processor(config: &'a Config, processor: P) -> Self {
        Self {
            config,
            processor,
            store: ProfileStore::from_config(&config.paths),
            encoder: AssetEncoder::from_config(&config.encode),
        }
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Analyse `audio_path` and write `<genre>.json` and `<genre>.mp3` under
    /// the custom profile directory, replacing any earlier profile of that
    /// name. Nothing is written unless extraction succeeds.
    ///
    /// `duration` limits the analysis only; the audio asset always holds the
    /// whole track, whichever encoder writes it.
    pub fn create_genre_profile(
        &self,
        audio_path: &Path,
        genre: &str,
        duration: Option<f32>,
    ) -> Result<GeneratedProfile, ProfileError> {
        validate_genre_name(genre)?;

        log::info!("Extracting features from: {}", audio_path.display());
        let audio = decode::decode_audio(audio_path, self.config.analysis.sample_rate, None)
            .map_err(|source| ProfileError::Decode {
                path: audio_path.to_path_buf(),
                source,
            })?;

        let extractor = FeatureExtractor::new(&self.config.analysis, &self.processor);
        let record = extractor.extract(&audio, duration).map_err(|source| {
            log::error!("Failed to extract features for {}: {}", genre, source);
            ProfileError::Extraction {
                genre: genre.to_string(),
                source,
            }
        })?;

        let profile = GenreProfile::from_record(genre, &record);
        profile.validate().map_err(|source| ProfileError::Invalid {
            genre: genre.to_string(),
            source,
        })?;

        let profile_path = self.store.save(&profile)?;
        log::info!("Profile written to {}", profile_path.display());

        let asset_path = self.store.custom_asset_path(genre);
        let encoder = self
            .encoder
            .encode(audio_path, &audio, &asset_path)
            .map_err(|source| {
                log::error!("Failed to encode {}: {}", asset_path.display(), source);
                ProfileError::Encode {
                    profile_path: profile_path.clone(),
                    source,
                }
            })?;

        log::info!("Created profile for {} ({} asset)", genre, encoder);
        Ok(GeneratedProfile {
            profile,
            profile_path,
            asset_path,
            encoder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::{decode_audio, probe_audio, AudioData};
    use crate::audio::reference::ProcessError;
    use crate::encode::EncodeError;
    use crate::profile::document::tests::assert_profiles_close;
    use crate::profile::store::read_profile;
    use tempfile::TempDir;

    fn write_wav(path: &Path, sample_rate: u32, seconds: f32, freq: f32) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let frames = (sample_rate as f32 * seconds) as usize;
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let left = (2.0 * std::f32::consts::PI * freq * t).sin() * 0.4;
            let right = (2.0 * std::f32::consts::PI * freq * 1.5 * t).sin() * 0.3;
            writer.write_sample((left * i16::MAX as f32) as i16).unwrap();
            writer.write_sample((right * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    /// Config rooted in a temp dir, with ffmpeg pointed at a missing binary so
    /// the in-process encoder is always used.
    fn offline_config(root: &TempDir, sample_rate: u32) -> Config {
        let mut config = Config::with_root(root.path());
        config.analysis.sample_rate = sample_rate;
        config.encode.ffmpeg = root.path().join("no-such-ffmpeg").display().to_string();
        config
    }

    struct FailingProcessor;

    impl ReferenceProcessor for FailingProcessor {
        fn process(&self, _: &AudioData, _: &AudioData, _: u32) -> Result<AudioData, ProcessError> {
            Err(ProcessError::Empty("target"))
        }
    }

    #[test]
    fn writes_document_and_fallback_asset() {
        let root = TempDir::new().unwrap();
        let config = offline_config(&root, 32000);
        let input = root.path().join("reference.wav");
        write_wav(&input, 32000, 1.0, 330.0);

        let builder = ProfileBuilder::new(&config);
        let generated = builder.create_genre_profile(&input, "Indie", None).unwrap();

        assert_eq!(generated.encoder, EncoderKind::Lame);
        assert_eq!(generated.profile_path, root.path().join("custom/Indie/Indie.json"));
        assert_eq!(generated.asset_path, root.path().join("custom/Indie/Indie.mp3"));

        let on_disk = read_profile(&generated.profile_path).unwrap();
        assert_profiles_close(&on_disk, &generated.profile);
        assert_eq!(on_disk.version, "1.0");
        assert_eq!(on_disk.genre, "Indie");
        assert_eq!(on_disk.band_count(), 10);
        assert!((on_disk.stereo_width_mid + on_disk.stereo_width_side - 1.0).abs() < 1e-9);

        // Fallback keeps the analysis sample rate and writes two channels
        let info = probe_audio(&generated.asset_path).unwrap();
        assert_eq!(info.channels, 2);
        assert_eq!(info.sample_rate, 32000);
    }

    #[test]
    fn regenerating_overwrites_both_files() {
        let root = TempDir::new().unwrap();
        let config = offline_config(&root, 32000);
        let first = root.path().join("first.wav");
        let second = root.path().join("second.wav");
        write_wav(&first, 32000, 1.0, 220.0);
        write_wav(&second, 32000, 1.0, 2500.0);

        let builder = ProfileBuilder::new(&config);
        let a = builder.create_genre_profile(&first, "Mine", None).unwrap();
        std::fs::write(&a.asset_path, b"stale").unwrap();

        let b = builder.create_genre_profile(&second, "Mine", None).unwrap();
        assert_eq!(a.profile_path, b.profile_path);

        let stored = read_profile(&b.profile_path).unwrap();
        assert!(stored.spectral_centroid > a.profile.spectral_centroid);
        assert_profiles_close(&stored, &b.profile);
        assert_ne!(std::fs::read(&b.asset_path).unwrap(), b"stale".to_vec());
    }

    #[test]
    fn duration_limits_analysis_but_not_asset() {
        let root = TempDir::new().unwrap();
        let config = offline_config(&root, 32000);
        let full = root.path().join("full.wav");
        let head = root.path().join("head.wav");
        write_wav(&full, 32000, 2.0, 440.0);
        write_wav(&head, 32000, 0.5, 440.0);

        let builder = ProfileBuilder::new(&config);
        let capped = builder.create_genre_profile(&full, "Cut", Some(0.5)).unwrap();
        let short = builder.create_genre_profile(&head, "Head", None).unwrap();

        // Analysing the first half second of the long file equals analysing
        // a file holding just that half second
        assert_eq!(
            capped.profile.scalar_descriptors(),
            short.profile.scalar_descriptors()
        );

        let asset = decode_audio(&capped.asset_path, 32000, None).unwrap();
        assert!(
            asset.duration() > 1.9 && asset.duration() < 2.3,
            "asset lasts {:.2}s",
            asset.duration()
        );
    }

    /// Shell script standing in for ffmpeg: answers `-version` and writes its
    /// arguments, one per line, to the output path.
    #[cfg(unix)]
    fn fake_ffmpeg(root: &TempDir) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = root.path().join("fake-ffmpeg");
        let script = "#!/bin/sh\n\
            if [ \"$1\" = \"-version\" ]; then echo \"ffmpeg version test\"; exit 0; fi\n\
            for last; do :; done\n\
            printf '%s\\n' \"$@\" > \"$last\"\n";
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[cfg(unix)]
    #[test]
    fn installed_ffmpeg_is_preferred() {
        let root = TempDir::new().unwrap();
        let mut config = offline_config(&root, 32000);
        config.encode.ffmpeg = fake_ffmpeg(&root);
        let input = root.path().join("reference.wav");
        write_wav(&input, 32000, 1.0, 330.0);

        let builder = ProfileBuilder::new(&config);
        let generated = builder.create_genre_profile(&input, "Live", Some(0.5)).unwrap();
        assert_eq!(generated.encoder, EncoderKind::Ffmpeg);

        let written = std::fs::read_to_string(&generated.asset_path).unwrap();
        let args: Vec<&str> = written.lines().collect();
        let input_arg = input.display().to_string();
        let asset_arg = generated.asset_path.display().to_string();
        assert_eq!(
            args,
            vec![
                "-i",
                input_arg.as_str(),
                "-loglevel",
                "error",
                "-ac",
                "2",
                "-b:a",
                "320k",
                "-y",
                asset_arg.as_str(),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn failing_ffmpeg_keeps_saved_profile() {
        let root = TempDir::new().unwrap();
        let mut config = offline_config(&root, 32000);
        // Runs, ignores its arguments and exits non-zero
        config.encode.ffmpeg = "false".to_string();
        let input = root.path().join("reference.wav");
        write_wav(&input, 32000, 1.0, 330.0);

        let builder = ProfileBuilder::new(&config);
        let err = builder.create_genre_profile(&input, "Broken", None).unwrap_err();
        match err {
            ProfileError::Encode {
                profile_path,
                source: EncodeError::Failed { .. },
            } => {
                assert_eq!(profile_path, builder.store().custom_profile_path("Broken"));
                assert!(read_profile(&profile_path).is_ok());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!builder.store().custom_asset_path("Broken").exists());
    }

    #[test]
    fn extraction_failure_writes_nothing() {
        let root = TempDir::new().unwrap();
        let config = offline_config(&root, 22050);
        let input = root.path().join("reference.wav");
        write_wav(&input, 22050, 0.5, 440.0);

        let builder = ProfileBuilder::with_processor(&config, FailingProcessor);
        let err = builder.create_genre_profile(&input, "Broken", None).unwrap_err();
        assert!(matches!(err, ProfileError::Extraction { .. }));
        assert!(!config.paths.custom_dir.exists());
    }

    #[test]
    fn unreadable_input_writes_nothing() {
        let root = TempDir::new().unwrap();
        let config = offline_config(&root, 22050);
        let builder = ProfileBuilder::new(&config);
        let err = builder
            .create_genre_profile(&root.path().join("missing.wav"), "Ghost", None)
            .unwrap_err();
        assert!(matches!(err, ProfileError::Decode { .. }));
        assert!(!config.paths.custom_dir.exists());
    }

    #[test]
    fn bad_genre_name_is_rejected_first() {
        let root = TempDir::new().unwrap();
        let config = offline_config(&root, 22050);
        let builder = ProfileBuilder::new(&config);
        let err = builder
            .create_genre_profile(&root.path().join("missing.wav"), "../up", None)
            .unwrap_err();
        assert!(matches!(err, ProfileError::Store(_)));
    }
}
