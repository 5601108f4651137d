//! Offline engine collaborators
//!
//! Everything the binary and tests need around the real-time processor:
//! - Planar audio buffers and level helpers
//! - WAV file I/O

pub mod buffer;
pub mod io;

pub use buffer::{
    calculate_peak, calculate_rms, db_to_linear, generate_test_tone, linear_to_db, AudioBuffer,
    ChannelLayout,
};
pub use io::{export_audio, import_audio, ExportFormat};
