//! Adlib FX CLI
//!
//! Offline renderer for the multi-effect chain.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{debug, error};

use adlib_fx::cli::{commands, Cli, Commands};
use adlib_fx::engine::ChannelLayout;
use adlib_fx::FxError;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    debug!("Adlib FX v{}", env!("CARGO_PKG_VERSION"));

    let (result, action) = match cli.command {
        Commands::Render {
            input,
            output,
            engine,
        } => (
            commands::render(&input, &output, &engine).map(|_| ()),
            format!("render {}", input.display()),
        ),
        Commands::Params { json } => (commands::params(json), "list parameters".to_string()),
        Commands::Tone {
            output,
            frequency,
            amplitude,
            duration,
            sample_rate,
            mono,
            engine,
        } => {
            let layout = if mono {
                ChannelLayout::Mono
            } else {
                ChannelLayout::Stereo
            };
            (
                commands::tone(
                    &output,
                    frequency,
                    amplitude,
                    duration,
                    sample_rate,
                    layout,
                    &engine,
                )
                .map(|_| ()),
                format!("render tone to {}", output.display()),
            )
        }
    };

    if let Err(err) = &result {
        report(err);
    }
    result.with_context(|| format!("failed to {}", action))
}

fn report(err: &FxError) {
    error!("[{}] {}", err.error_code(), err.recovery_hint());
}
