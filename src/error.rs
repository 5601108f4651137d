//! Error handling for Adlib FX
//!
//! The real-time path never returns errors. Everything here is raised by
//! configuration (`prepare`), by name-based parameter lookup, or by the
//! offline WAV collaborators.

use thiserror::Error;

/// Result type alias for Adlib FX operations
pub type Result<T> = std::result::Result<T, FxError>;

/// Main error type for Adlib FX operations
#[derive(Error, Debug)]
pub enum FxError {
    // Configuration Errors
    #[error("Invalid sample rate: {sample_rate} Hz (must be finite and positive)")]
    InvalidSampleRate { sample_rate: f64 },

    #[error("Invalid maximum block length: {len} (must be at least 1)")]
    InvalidBlockLength { len: usize },

    #[error("Invalid channel count: {inputs} in / {outputs} out")]
    InvalidChannelCount { inputs: usize, outputs: usize },

    // Parameter Errors
    #[error("Unknown parameter: {name}")]
    UnknownParameter { name: String },

    #[error("Invalid value for {param}: {value}")]
    InvalidParameterValue { param: String, value: String },

    // Audio File Errors
    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Failed to read audio file: {path}")]
    AudioRead {
        path: String,
        #[source]
        source: hound::Error,
    },

    #[error("Failed to write audio file: {path}")]
    AudioWrite {
        path: String,
        #[source]
        source: hound::Error,
    },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FxError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::InvalidSampleRate { .. } => "INVALID_SAMPLE_RATE",
            FxError::InvalidBlockLength { .. } => "INVALID_BLOCK_LENGTH",
            FxError::InvalidChannelCount { .. } => "INVALID_CHANNEL_COUNT",
            FxError::UnknownParameter { .. } => "UNKNOWN_PARAMETER",
            FxError::InvalidParameterValue { .. } => "INVALID_PARAMETER_VALUE",
            FxError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            FxError::AudioRead { .. } => "AUDIO_READ_ERROR",
            FxError::AudioWrite { .. } => "AUDIO_WRITE_ERROR",
            FxError::Io(_) => "IO_ERROR",
            FxError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the error comes from engine configuration
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            FxError::InvalidSampleRate { .. }
                | FxError::InvalidBlockLength { .. }
                | FxError::InvalidChannelCount { .. }
        )
    }

    /// Returns a suggested recovery action for this error
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            FxError::InvalidSampleRate { .. } => "Prepare the engine with the host's real sample rate",
            FxError::InvalidBlockLength { .. } => "Use a block size of at least one sample",
            FxError::InvalidChannelCount { .. } => {
                "Use at least one output channel and no more inputs than outputs"
            }
            FxError::UnknownParameter { .. } => "Run 'adlib-cli params' to list identifiers",
            FxError::InvalidParameterValue { .. } => "Pass a number, or true/false for switches",
            FxError::UnsupportedFormat { .. } => "Convert to 16/24-bit PCM or 32-bit float WAV",
            FxError::AudioRead { .. } => "Check that the file exists and is a valid WAV file",
            FxError::AudioWrite { .. } => "Check that the output directory is writable",
            _ => "Check the error details and try again",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = FxError::InvalidSampleRate { sample_rate: 0.0 };
        assert_eq!(err.error_code(), "INVALID_SAMPLE_RATE");
        assert!(err.is_configuration_error());

        let err = FxError::UnknownParameter {
            name: "wah".to_string(),
        };
        assert_eq!(err.error_code(), "UNKNOWN_PARAMETER");
        assert!(!err.is_configuration_error());
    }

    #[test]
    fn test_error_display() {
        let err = FxError::InvalidChannelCount {
            inputs: 3,
            outputs: 2,
        };
        assert_eq!(err.to_string(), "Invalid channel count: 3 in / 2 out");
        assert!(!err.recovery_hint().is_empty());
    }
}
