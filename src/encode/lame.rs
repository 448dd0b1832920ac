//! In-process MP3 encoding with LAME, used when no ffmpeg binary is around.

use std::path::Path;

use super::EncodeError;
use crate::audio::decode::AudioData;

fn lame_bitrate(kbps: u32) -> mp3lame_encoder::Bitrate {
    match kbps {
        0..=111 => mp3lame_encoder::Bitrate::Kbps96,
        112..=127 => mp3lame_encoder::Bitrate::Kbps112,
        128..=159 => mp3lame_encoder::Bitrate::Kbps128,
        160..=191 => mp3lame_encoder::Bitrate::Kbps160,
        192..=223 => mp3lame_encoder::Bitrate::Kbps192,
        224..=255 => mp3lame_encoder::Bitrate::Kbps224,
        256..=319 => mp3lame_encoder::Bitrate::Kbps256,
        _ => mp3lame_encoder::Bitrate::Kbps320,
    }
}

fn to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
        .collect()
}

/// Left and right PCM for the encoder. One output channel folds the input
/// to `(L + R) / 2`; two channels duplicate mono input and drop anything past
/// the second channel.
fn output_pcm(audio: &AudioData, channels: u16) -> Result<(Vec<i16>, Vec<i16>), EncodeError> {
    let frames = audio.num_frames();
    if frames == 0 {
        return Err(EncodeError::Empty);
    }
    let (left, right) = match audio.channels.as_slice() {
        [] => return Err(EncodeError::Empty),
        [mono] => (&mono[..frames], &mono[..frames]),
        [l, r, ..] => (&l[..frames], &r[..frames]),
    };
    match channels {
        1 => {
            let mix: Vec<f32> = left.iter().zip(right).map(|(l, r)| (l + r) * 0.5).collect();
            let pcm = to_pcm16(&mix);
            Ok((pcm.clone(), pcm))
        }
        2 => Ok((to_pcm16(left), to_pcm16(right))),
        n => Err(EncodeError::Channels(n)),
    }
}

/// Encode `audio` as MP3 with `channels` output channels (1 or 2) at its own
/// sample rate.
pub fn encode_mp3(
    audio: &AudioData,
    bitrate_kbps: u32,
    channels: u16,
) -> Result<Vec<u8>, EncodeError> {
    use mp3lame_encoder::{Builder, DualPcm, FlushNoGap};

    let (left, right) = output_pcm(audio, channels)?;
    let frames = left.len();

    let mut builder =
        Builder::new().ok_or_else(|| EncodeError::Lame("encoder init failed".to_string()))?;
    builder
        .set_num_channels(channels as u8)
        .map_err(|e| EncodeError::Lame(format!("set channels failed: {:?}", e)))?;
    builder
        .set_sample_rate(audio.sample_rate)
        .map_err(|e| EncodeError::Lame(format!("set sample rate failed: {:?}", e)))?;
    builder
        .set_brate(lame_bitrate(bitrate_kbps))
        .map_err(|e| EncodeError::Lame(format!("set bitrate failed: {:?}", e)))?;
    builder
        .set_quality(mp3lame_encoder::Quality::Best)
        .map_err(|e| EncodeError::Lame(format!("set quality failed: {:?}", e)))?;

    let mut encoder = builder
        .build()
        .map_err(|e| EncodeError::Lame(format!("build failed: {:?}", e)))?;

    let capacity = mp3lame_encoder::max_required_buffer_size(frames);
    let mut mp3_out: Vec<u8> = Vec::with_capacity(capacity);

    // With one channel configured LAME reads only `left`
    let input = DualPcm {
        left: &left,
        right: &right,
    };
    let encoded = encoder
        .encode(input, mp3_out.spare_capacity_mut())
        .map_err(|e| EncodeError::Lame(format!("encode failed: {:?}", e)))?;
    // SAFETY: the encoder initialised `encoded` bytes of spare capacity
    unsafe {
        mp3_out.set_len(encoded);
    }

    mp3_out.reserve(7200);
    let flushed = encoder
        .flush::<FlushNoGap>(mp3_out.spare_capacity_mut())
        .map_err(|e| EncodeError::Lame(format!("flush failed: {:?}", e)))?;
    // SAFETY: the encoder initialised `flushed` bytes past the current length
    unsafe {
        mp3_out.set_len(mp3_out.len() + flushed);
    }

    Ok(mp3_out)
}

pub fn write_mp3(
    audio: &AudioData,
    bitrate_kbps: u32,
    channels: u16,
    path: &Path,
) -> Result<(), EncodeError> {
    let bytes = encode_mp3(audio, bitrate_kbps, channels)?;
    std::fs::write(path, &bytes).map_err(|source| EncodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "LAME encoding complete: {} ({} bytes, {}ch @ {}Hz)",
        path.display(),
        bytes.len(),
        channels,
        audio.sample_rate
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::probe_audio;

    fn tone(channels: usize, rate: u32, seconds: f32) -> AudioData {
        let frames = (rate as f32 * seconds) as usize;
        let ch: Vec<f32> = (0..frames)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / rate as f32).sin() * 0.3)
            .collect();
        AudioData::new(vec![ch; channels], rate)
    }

    #[test]
    fn encodes_stereo_frames() {
        let bytes = encode_mp3(&tone(2, 44100, 0.5), 320, 2).unwrap();
        assert!(bytes.len() > 1000);
        // MPEG audio frame sync
        let synced = bytes.windows(2).any(|w| w[0] == 0xFF && (w[1] & 0xE0) == 0xE0);
        assert!(synced);
    }

    #[test]
    fn mono_is_upmixed() {
        assert!(encode_mp3(&tone(1, 44100, 0.25), 192, 2).is_ok());
    }

    #[test]
    fn channel_count_follows_request() {
        let dir = tempfile::tempdir().unwrap();
        let mono = dir.path().join("mono.mp3");
        let stereo = dir.path().join("stereo.mp3");
        write_mp3(&tone(2, 44100, 0.5), 128, 1, &mono).unwrap();
        write_mp3(&tone(1, 44100, 0.5), 128, 2, &stereo).unwrap();
        assert_eq!(probe_audio(&mono).unwrap().channels, 1);
        assert_eq!(probe_audio(&stereo).unwrap().channels, 2);
    }

    #[test]
    fn downmix_averages_left_and_right() {
        let audio = AudioData::new(vec![vec![0.5, 0.2], vec![-0.5, 0.4]], 44100);
        let (left, right) = output_pcm(&audio, 1).unwrap();
        assert_eq!(left, right);
        assert_eq!(left, to_pcm16(&[0.0, 0.3]));
    }

    #[test]
    fn unsupported_channel_counts_are_rejected() {
        let audio = tone(2, 44100, 0.1);
        assert!(matches!(encode_mp3(&audio, 320, 0), Err(EncodeError::Channels(0))));
        assert!(matches!(encode_mp3(&audio, 320, 6), Err(EncodeError::Channels(6))));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            encode_mp3(&AudioData::new(vec![], 44100), 320, 2),
            Err(EncodeError::Empty)
        ));
        assert!(matches!(
            encode_mp3(&AudioData::new(vec![vec![], vec![]], 44100), 320, 2),
            Err(EncodeError::Empty)
        ));
    }

    #[test]
    fn bitrate_snaps_to_lame_steps() {
        assert!(matches!(lame_bitrate(320), mp3lame_encoder::Bitrate::Kbps320));
        assert!(matches!(lame_bitrate(200), mp3lame_encoder::Bitrate::Kbps192));
        assert!(matches!(lame_bitrate(64), mp3lame_encoder::Bitrate::Kbps96));
    }
}
