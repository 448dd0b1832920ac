use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "soren-profile",
    about = "Build genre profiles from reference tracks and suggest mastering targets"
)]
pub struct Cli {
    /// Reference audio file (WAV, MP3, FLAC, OGG, AAC)
    #[arg(value_name = "AUDIO_FILE")]
    pub input: Option<PathBuf>,

    /// Name of the genre profile to create
    #[arg(short, long, default_value = "CustomProfile")]
    pub name: String,

    /// Only analyse the first SECONDS of the track
    #[arg(long, value_name = "SECONDS")]
    pub duration: Option<f32>,

    /// Print suggested mastering targets for GENRE and exit
    #[arg(long, value_name = "GENRE")]
    pub suggest: Option<String>,

    /// Print suggestions as JSON
    #[arg(long, requires = "suggest")]
    pub json: bool,

    /// List built-in and custom genre profiles and exit
    #[arg(long)]
    pub list_profiles: bool,

    /// Path to a TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// FFmpeg binary used for the profile's audio asset
    #[arg(long)]
    pub ffmpeg: Option<String>,

    /// Matching iterations for the reference processing pass
    #[arg(long)]
    pub passes: Option<u32>,
}
