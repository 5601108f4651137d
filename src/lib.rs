//! Adlib FX - Real-time Multi-Effect Chain
//!
//! A six-stage effect processor for mono and stereo audio:
//! Filter -> Distortion -> Chorus -> Flanger -> Delay -> Reverb.
//!
//! # Architecture
//!
//! - [`params`]: lock-free parameter store written by control threads and
//!   snapshotted once per block by the audio thread
//! - [`dsp`]: the individual stages and the [`dsp::EffectChain`] that runs
//!   them with per-stage wet/dry blending, global mix and in/out gain
//! - [`meter`]: decay-hold RMS level meters
//! - [`processor`]: the host-facing [`Processor`] and its [`ControlHandle`]
//! - [`engine`]: planar buffers and WAV I/O for offline rendering
//! - [`cli`]: the `adlib-cli` renderer

pub mod cli;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod meter;
pub mod params;
pub mod processor;

pub use error::{FxError, Result};
pub use meter::LevelMeter;
pub use params::{ParamId, ParamSnapshot, Parameters};
pub use processor::{ControlHandle, ProcessSpec, Processor, TAIL_LENGTH_SECS};
