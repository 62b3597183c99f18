//! CLI Module
//!
//! Command-line interface for the tinyaudio engine.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::audio::SampleFormat;

/// Tinyaudio - duplex audio streaming and offline WAV rendering
#[derive(Parser, Debug)]
#[command(name = "tinyaudio")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the header of a WAV file
    #[command(name = "probe")]
    Probe {
        /// Path to the WAV file
        path: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a WAV file through the callback into another WAV file
    #[command(name = "render")]
    Render {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file
        output: PathBuf,

        /// Sample format of the rendered file (defaults to the input's)
        #[arg(short, long)]
        format: Option<SampleFormat>,

        /// Channel count (defaults to the input's)
        #[arg(short, long)]
        channels: Option<usize>,

        /// Sample rate in Hz (defaults to the input's)
        #[arg(short = 'r', long)]
        sample_rate: Option<u32>,

        /// Frames per callback
        #[arg(long, default_value_t = 128)]
        frame_count: usize,

        /// Linear gain applied in the callback
        #[arg(short, long, default_value_t = 1.0)]
        gain: f32,
    },

    /// Stream through the audio device
    #[command(name = "stream")]
    Stream {
        /// JSON session configuration; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Play this file instead of device capture
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Record the callback output to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Loop the input file
        #[arg(short = 'l', long = "loop")]
        looping: bool,

        #[arg(short, long)]
        format: Option<SampleFormat>,

        #[arg(short, long)]
        channels: Option<usize>,

        #[arg(short = 'r', long)]
        sample_rate: Option<u32>,

        #[arg(long)]
        frame_count: Option<usize>,

        /// Seconds to stream before stopping
        #[arg(short, long, default_value_t = 5.0)]
        seconds: f64,

        /// Linear gain applied in the callback
        #[arg(short, long, default_value_t = 1.0)]
        gain: f32,

        /// Use the simulated device even when hardware support is compiled in
        #[arg(long)]
        simulated: bool,
    },
}
