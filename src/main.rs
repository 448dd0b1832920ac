mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

use cli::Cli;
use soren_profile::audio::decode;
use soren_profile::config::{self, Config};
use soren_profile::profile::{ProfileBuilder, ProfileStore};
use soren_profile::suggest::SuggestionEngine;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect soren.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("soren.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("soren").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });
    let mut config = match config_path {
        Some(ref path) => match config::load_config(path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}, using defaults", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };
    if let Some(ffmpeg) = cli.ffmpeg.clone() {
        config.encode.ffmpeg = ffmpeg;
    }
    if let Some(passes) = cli.passes {
        config.analysis.processing_passes = passes;
    }

    if cli.list_profiles {
        let store = ProfileStore::from_config(&config.paths);
        let genres = store.list_genres()?;
        if genres.is_empty() {
            println!("No genre profiles found.");
        } else {
            println!("Available genre profiles:");
            for genre in &genres {
                println!("  {}", genre);
            }
        }
        return Ok(());
    }

    if let Some(ref genre) = cli.suggest {
        let engine = SuggestionEngine::new(&config);
        let result = engine
            .get_suggestions(genre)
            .with_context(|| format!("Failed to get suggestions for {}", genre))?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("Suggested targets for {}:", genre);
            println!("  rms_mid       {:.6}", result.rms_mid);
            println!("  rms_side      {:.6}", result.rms_side);
            println!("  stereo_width  {:.6}", result.stereo_width);
        }
        return Ok(());
    }

    let input = cli.input.as_ref().context("Input audio file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    log::info!("soren-profile - genre profile generator");
    log::info!("Input: {}", input.display());
    log::info!("Profile: {}", cli.name);
    if let Ok(info) = decode::probe_audio(input) {
        log::info!("Source: {} channels @ {}Hz", info.channels, info.sample_rate);
    }
    if let Some(d) = cli.duration {
        log::info!("Analysing first {:.1}s", d);
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} [{elapsed_precise}] {msg}")
            .context("Invalid progress template")?,
    );
    spinner.set_message(format!("Generating profile '{}'", cli.name));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let builder = ProfileBuilder::new(&config);
    let generated = builder.create_genre_profile(input, &cli.name, cli.duration);
    spinner.finish_and_clear();

    let generated =
        generated.with_context(|| format!("Failed to create profile '{}'", cli.name))?;

    log::info!(
        "Done! Profile: {}, audio: {} (via {})",
        generated.profile_path.display(),
        generated.asset_path.display(),
        generated.encoder
    );
    Ok(())
}
