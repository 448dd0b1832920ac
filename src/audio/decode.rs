use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::resample;

/// Planar multi-channel audio: `channels[c][frame]`.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioData {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl AudioData {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self { channels, sample_rate }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_frames(&self) -> usize {
        self.channels.iter().map(Vec::len).min().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.num_frames() == 0
    }

    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames() as f32 / self.sample_rate as f32
    }

    /// Keep at most `seconds` of audio from the start.
    pub fn truncate_seconds(&mut self, seconds: f32) {
        let max_frames = (seconds.max(0.0) * self.sample_rate as f32) as usize;
        for ch in &mut self.channels {
            ch.truncate(max_frames);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioInfo {
    pub channels: usize,
    pub sample_rate: u32,
}

/// Read channel count and sample rate from the container without decoding.
pub fn probe_audio(path: &Path) -> Result<AudioInfo> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe audio format")?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio tracks found")?;

    Ok(AudioInfo {
        channels: track.codec_params.channels.map_or(1, |c| c.count()),
        sample_rate: track.codec_params.sample_rate.context("Unknown sample rate")?,
    })
}

/// Decode an audio file, keeping every channel, and resample it to `target_rate`.
pub fn decode_audio(path: &Path, target_rate: u32, duration: Option<f32>) -> Result<AudioData> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe audio format")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio tracks found")?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count());
    let sample_rate = track.codec_params.sample_rate.context("Unknown sample rate")?;
    let max_frames = duration.map(|d| (d.max(0.0) * sample_rate as f32) as usize);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let mut planar: Vec<Vec<f32>> = vec![Vec::new(); channels];

    loop {
        if let Some(limit) = max_frames {
            if planar[0].len() >= limit {
                break;
            }
        }

        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        for frame_samples in sample_buf.samples().chunks(channels) {
            for (ch, &s) in planar.iter_mut().zip(frame_samples) {
                ch.push(s);
            }
        }
    }

    let mut audio = AudioData::new(planar, sample_rate);
    if let Some(d) = duration {
        audio.truncate_seconds(d);
    }

    log::info!(
        "Decoded audio: {} channels, {} frames, {}Hz, {:.1}s",
        audio.num_channels(),
        audio.num_frames(),
        sample_rate,
        audio.duration()
    );

    if sample_rate != target_rate && !audio.is_empty() {
        audio = resample::resample(&audio, target_rate).with_context(|| {
            format!("Failed to resample {} to {}Hz", path.display(), target_rate)
        })?;
    }

    Ok(audio)
}
