use std::path::Path;
use std::process::{Command, Stdio};

use super::EncodeError;

pub struct FfmpegEncoder {
    binary: String,
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// First line of `ffmpeg -version`, or `None` when the binary is not
    /// installed.
    pub fn installed_version(&self) -> Result<Option<String>, EncodeError> {
        let output = match Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(EncodeError::Spawn {
                    binary: self.binary.clone(),
                    source,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(Some(stdout.lines().next().unwrap_or_default().to_string()))
    }

    /// Transcode `input` to `output` with a fixed channel count and bitrate,
    /// overwriting `output`.
    pub fn transcode(
        &self,
        input: &Path,
        output: &Path,
        channels: u16,
        bitrate_kbps: u32,
    ) -> Result<(), EncodeError> {
        let result = Command::new(&self.binary)
            .arg("-i")
            .arg(input)
            .args(["-loglevel", "error"])
            .args(["-ac", &channels.to_string()])
            .args(["-b:a", &format!("{}k", bitrate_kbps)])
            .arg("-y")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| EncodeError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(EncodeError::Failed {
                binary: self.binary.clone(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        log::info!(
            "FFmpeg encoding complete: {} ({}ch @ {}k)",
            output.display(),
            channels,
            bitrate_kbps
        );
        Ok(())
    }
}
