//! Audio file I/O
//!
//! Reads and writes WAV files through `hound`. Samples are converted to and
//! from 32-bit float; the sample rate is carried through untouched since the
//! engine runs at whatever rate it is prepared for.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::engine::buffer::AudioBuffer;
use crate::error::{FxError, Result};

/// Export format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    /// Bit depth: 16, 24, or 32 (float)
    pub bit_depth: u16,
}

impl Default for ExportFormat {
    fn default() -> Self {
        Self::float()
    }
}

impl ExportFormat {
    pub fn new(bit_depth: u16) -> Self {
        ExportFormat { bit_depth }
    }

    /// 32-bit float, lossless for the engine's output
    pub fn float() -> Self {
        ExportFormat { bit_depth: 32 }
    }

    /// 16-bit integer
    pub fn cd_quality() -> Self {
        ExportFormat { bit_depth: 16 }
    }

    fn validate(&self) -> Result<()> {
        match self.bit_depth {
            16 | 24 | 32 => Ok(()),
            other => Err(FxError::UnsupportedFormat {
                format: format!("{}-bit audio (only 16, 24, 32 supported)", other),
            }),
        }
    }
}

/// Read a WAV file into a planar float buffer
///
/// Accepts 8/16/24/32-bit integer and 32-bit float files with any
/// channel count.
pub fn import_audio(path: &Path) -> Result<AudioBuffer> {
    let reader = WavReader::open(path).map_err(|source| FxError::AudioRead {
        path: path.display().to_string(),
        source,
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)
        .map_err(|source| FxError::AudioRead {
            path: path.display().to_string(),
            source,
        })?;

    log::debug!(
        "Read {} ({} ch, {} Hz, {}-bit {:?})",
        path.display(),
        channels,
        spec.sample_rate,
        spec.bits_per_sample,
        spec.sample_format
    );

    AudioBuffer::from_interleaved(&interleaved, channels, spec.sample_rate)
}

/// Write a buffer to a WAV file at its own sample rate
pub fn export_audio(buffer: &AudioBuffer, path: &Path, format: ExportFormat) -> Result<()> {
    format.validate()?;

    let spec = WavSpec {
        channels: buffer.channels() as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: format.bit_depth,
        sample_format: if format.bit_depth == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    let write_err = |source| FxError::AudioWrite {
        path: path.display().to_string(),
        source,
    };

    let mut writer = WavWriter::create(path, spec).map_err(write_err)?;

    for sample in buffer.to_interleaved() {
        match format.bit_depth {
            16 => {
                let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled).map_err(write_err)?;
            }
            24 => {
                // 24-bit stored as i32 in hound
                let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled).map_err(write_err)?;
            }
            _ => writer.write_sample(sample).map_err(write_err)?,
        }
    }

    writer.finalize().map_err(write_err)?;

    log::debug!(
        "Wrote {} ({} ch, {} Hz, {}-bit)",
        path.display(),
        buffer.channels(),
        buffer.sample_rate,
        format.bit_depth
    );
    Ok(())
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> std::result::Result<Vec<f32>, hound::Error> {
    match sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect(),
        SampleFormat::Int => {
            let scale = match bits_per_sample {
                8 => 128.0,
                16 => 32768.0,
                24 => 8388608.0,
                32 => 2147483648.0,
                _ => return Err(hound::Error::Unsupported),
            };
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::buffer::{generate_test_tone, ChannelLayout};
    use tempfile::tempdir;

    #[test]
    fn test_round_trip_stereo_float() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");

        let tone = generate_test_tone(440.0, 0.5, 0.05, ChannelLayout::Stereo, 44100);
        export_audio(&tone, &path, ExportFormat::float()).unwrap();
        let loaded = import_audio(&path).unwrap();

        assert_eq!(loaded.sample_rate, 44100);
        assert_eq!(loaded, tone);
    }

    #[test]
    fn test_round_trip_16bit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mono16.wav");

        let tone = generate_test_tone(1000.0, 0.8, 0.05, ChannelLayout::Mono, 48000);
        export_audio(&tone, &path, ExportFormat::cd_quality()).unwrap();
        let loaded = import_audio(&path).unwrap();

        assert_eq!(loaded.len(), tone.len());
        for (a, b) in loaded.channel(0).iter().zip(tone.channel(0)) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_round_trip_24bit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mono24.wav");

        let tone = generate_test_tone(200.0, 0.9, 0.02, ChannelLayout::Mono, 96000);
        export_audio(&tone, &path, ExportFormat::new(24)).unwrap();
        let loaded = import_audio(&path).unwrap();

        assert_eq!(loaded.sample_rate, 96000);
        for (a, b) in loaded.channel(0).iter().zip(tone.channel(0)) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_unsupported_bit_depth() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.wav");
        let tone = generate_test_tone(200.0, 0.5, 0.01, ChannelLayout::Mono, 44100);
        let err = export_audio(&tone, &path, ExportFormat::new(12)).unwrap_err();
        assert!(matches!(err, FxError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_import_nonexistent_file() {
        let err = import_audio(Path::new("/nonexistent/input.wav")).unwrap_err();
        assert!(matches!(err, FxError::AudioRead { .. }));
        assert_eq!(err.error_code(), "AUDIO_READ_ERROR");
    }
}
