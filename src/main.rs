//! Tinyaudio CLI
//!
//! Command-line front end for probing, rendering and streaming audio.

use clap::Parser;
use env_logger::Env;
use log::info;

use tinyaudio::cli::commands::{self, RenderOptions, StreamOptions};
use tinyaudio::cli::{Cli, Commands};
use tinyaudio::TinyaudioError;

fn main() {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Tinyaudio v{}", env!("CARGO_PKG_VERSION"));

    if let Err(err) = handle_command(cli.command) {
        eprintln!("Error: {:#}", err);
        if let Some(audio_err) = err.downcast_ref::<TinyaudioError>() {
            for suggestion in audio_err.recovery_suggestions() {
                eprintln!("  hint: {}", suggestion);
            }
        }
        std::process::exit(1);
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Probe { path, json } => commands::probe(&path, json),
        Commands::Render {
            input,
            output,
            format,
            channels,
            sample_rate,
            frame_count,
            gain,
        } => commands::render(
            &input,
            &output,
            RenderOptions {
                format,
                channels,
                sample_rate,
                frame_count,
                gain,
            },
        ),
        Commands::Stream {
            config,
            input,
            output,
            looping,
            format,
            channels,
            sample_rate,
            frame_count,
            seconds,
            gain,
            simulated,
        } => commands::stream(StreamOptions {
            config,
            input,
            output,
            looping,
            format,
            channels,
            sample_rate,
            frame_count,
            seconds,
            gain,
            simulated,
        }),
    }
}
