pub mod ffmpeg;
pub mod lame;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::audio::decode::AudioData;
use crate::config::EncodeConfig;
use ffmpeg::FfmpegEncoder;

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("no audio to encode")]
    Empty,
    #[error("failed to run {binary}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{binary} exited with {status}: {stderr}")]
    Failed {
        binary: String,
        status: String,
        stderr: String,
    },
    #[error("cannot encode {0} output channels, expected 1 or 2")]
    Channels(u16),
    #[error("LAME {0}")]
    Lame(String),
    #[error("failed to write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncoderKind {
    Ffmpeg,
    Lame,
}

impl fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncoderKind::Ffmpeg => write!(f, "ffmpeg"),
            EncoderKind::Lame => write!(f, "lame"),
        }
    }
}

/// Writes the compressed audio copy stored beside each custom profile.
pub struct AssetEncoder {
    ffmpeg: FfmpegEncoder,
    bitrate_kbps: u32,
    channels: u16,
}

impl AssetEncoder {
    pub fn from_config(config: &EncodeConfig) -> Self {
        Self {
            ffmpeg: FfmpegEncoder::new(config.ffmpeg.clone()),
            bitrate_kbps: config.bitrate_kbps,
            channels: config.channels,
        }
    }

    /// Transcode `source` with ffmpeg when it is installed, otherwise encode
    /// the decoded `waveform` in-process at its own sample rate.
    pub fn encode(
        &self,
        source: &Path,
        waveform: &AudioData,
        dest: &Path,
    ) -> Result<EncoderKind, EncodeError> {
        match self.ffmpeg.installed_version()? {
            Some(version) => {
                log::info!("FFmpeg installed: {}", version);
                self.ffmpeg
                    .transcode(source, dest, self.channels, self.bitrate_kbps)?;
                Ok(EncoderKind::Ffmpeg)
            }
            None => {
                log::warn!(
                    "FFmpeg ({}) is not installed, encoding with LAME instead",
                    self.ffmpeg.binary()
                );
                lame::write_mp3(waveform, self.bitrate_kbps, self.channels, dest)?;
                Ok(EncoderKind::Lame)
            }
        }
    }
}
