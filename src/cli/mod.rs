//! CLI Module
//!
//! Command-line interface for rendering audio offline through the effect
//! chain.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::params::ParamId;

/// Adlib FX - six-stage multi-effect renderer
#[derive(Parser, Debug)]
#[command(name = "adlib-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Engine configuration shared by the rendering commands
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Host block size used while rendering
    #[arg(long, default_value_t = 512)]
    pub block_size: usize,

    /// Parameter override, e.g. --set delay_time=350 (repeatable)
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = commands::parse_override)]
    pub overrides: Vec<(ParamId, f32)>,

    /// JSON object of parameter overrides, applied before --set
    #[arg(long, value_name = "FILE")]
    pub params_json: Option<PathBuf>,

    /// Append the reverb/delay tail as silence before rendering
    #[arg(long)]
    pub tail: bool,

    /// Output bit depth: 16, 24 or 32 (float)
    #[arg(long, default_value_t = 32)]
    pub bit_depth: u16,
}

impl Default for EngineArgs {
    fn default() -> Self {
        Self {
            block_size: 512,
            overrides: Vec::new(),
            params_json: None,
            tail: false,
            bit_depth: 32,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream a WAV file through the effect chain
    #[command(name = "render")]
    Render {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file
        output: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// List every parameter with its range and default
    #[command(name = "params")]
    Params {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a generated sine tone through the effect chain
    #[command(name = "tone")]
    Tone {
        /// Output WAV file
        output: PathBuf,

        /// Tone frequency in Hz
        #[arg(long, default_value_t = 440.0)]
        frequency: f32,

        /// Peak amplitude (linear)
        #[arg(long, default_value_t = 0.5)]
        amplitude: f32,

        /// Length in seconds
        #[arg(long, default_value_t = 2.0)]
        duration: f32,

        #[arg(long, default_value_t = 48000)]
        sample_rate: u32,

        /// Render a single channel instead of stereo
        #[arg(long)]
        mono: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },
}
