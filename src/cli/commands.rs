//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::collections::BTreeMap;
use std::path::Path;

use log::{info, warn};
use serde_json::Value;

use crate::cli::EngineArgs;
use crate::engine::{
    calculate_peak, calculate_rms, export_audio, generate_test_tone, import_audio, AudioBuffer,
    ChannelLayout, ExportFormat,
};
use crate::error::{FxError, Result};
use crate::params::{ParamId, ParamKind, ParamSnapshot, Parameters};
use crate::processor::{Processor, TAIL_LENGTH_SECS};

/// Outcome of rendering a buffer through the chain
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    pub frames: usize,
    pub channels: usize,
    pub sample_rate: u32,
    pub input_peak_db: f32,
    pub output_peak_db: f32,
    pub input_rms_db: f32,
    pub output_rms_db: f32,
    /// Held output meter after the last block
    pub output_level: f32,
}

/// Parse a `name=value` override; switches also accept on/off and true/false
pub fn parse_override(s: &str) -> Result<(ParamId, f32)> {
    let (name, value) = s.split_once('=').ok_or_else(|| FxError::InvalidParameterValue {
        param: s.to_string(),
        value: String::new(),
    })?;

    let id: ParamId = name.parse()?;
    let value = parse_value(id, value.trim())?;
    Ok((id, value))
}

fn parse_value(id: ParamId, raw: &str) -> Result<f32> {
    let invalid = || FxError::InvalidParameterValue {
        param: id.to_string(),
        value: raw.to_string(),
    };

    if id.range().kind == ParamKind::Bool {
        match raw.to_ascii_lowercase().as_str() {
            "on" | "true" | "yes" => return Ok(1.0),
            "off" | "false" | "no" => return Ok(0.0),
            _ => {}
        }
    }

    let value: f32 = raw.parse().map_err(|_| invalid())?;
    if value.is_nan() {
        return Err(invalid());
    }
    Ok(value)
}

/// Load overrides from a flat JSON object of `{ "identifier": value }`
pub fn load_params_json(path: &Path) -> Result<Vec<(ParamId, f32)>> {
    let text = std::fs::read_to_string(path)?;
    let entries: BTreeMap<String, Value> = serde_json::from_str(&text)?;

    entries
        .into_iter()
        .map(|(name, value)| {
            let id: ParamId = name.parse()?;
            let value = match value {
                Value::Bool(on) => {
                    if on {
                        1.0
                    } else {
                        0.0
                    }
                }
                Value::Number(n) => n.as_f64().map(|v| v as f32).ok_or_else(|| {
                    FxError::InvalidParameterValue {
                        param: name.clone(),
                        value: n.to_string(),
                    }
                })?,
                other => {
                    return Err(FxError::InvalidParameterValue {
                        param: name,
                        value: other.to_string(),
                    })
                }
            };
            Ok((id, value))
        })
        .collect()
}

/// Apply JSON overrides then `--set` overrides to a parameter store
pub fn apply_overrides(params: &Parameters, engine: &EngineArgs) -> Result<()> {
    if let Some(path) = &engine.params_json {
        for (id, value) in load_params_json(path)? {
            let stored = params.set(id, value);
            info!("{} = {} (from {})", id, stored, path.display());
        }
    }
    for &(id, value) in &engine.overrides {
        let stored = params.set(id, value);
        if stored != value {
            warn!("{} clamped from {} to {}", id, value, stored);
        }
        info!("{} = {}", id, stored);
    }
    Ok(())
}

/// Run a buffer through a freshly prepared processor, block by block
pub fn render_buffer(buffer: &mut AudioBuffer, engine: &EngineArgs) -> Result<RenderSummary> {
    let channels = buffer.channels();
    if buffer.channel_layout().is_none() {
        warn!(
            "{} channels: effects run on the first two, the rest pass with gain only",
            channels
        );
    }

    let mut processor = Processor::new();
    apply_overrides(processor.parameters(), engine)?;
    processor.prepare(buffer.sample_rate as f64, engine.block_size, channels)?;

    if engine.tail {
        buffer.pad_silence((TAIL_LENGTH_SECS * buffer.sample_rate as f64).ceil() as usize);
    }

    let input_peak_db = calculate_peak(buffer);
    let input_rms_db = calculate_rms(buffer);

    let frames = buffer.len();
    let mut offset = 0;
    while offset < frames {
        let end = (offset + engine.block_size).min(frames);
        let mut block: Vec<&mut [f32]> = buffer
            .samples
            .iter_mut()
            .map(|channel| &mut channel[offset..end])
            .collect();
        processor.process_block(&mut block);
        offset = end;
    }

    if !buffer.is_finite() {
        warn!("Rendered output contains non-finite samples");
    }

    Ok(RenderSummary {
        frames,
        channels,
        sample_rate: buffer.sample_rate,
        input_peak_db,
        output_peak_db: calculate_peak(buffer),
        input_rms_db,
        output_rms_db: calculate_rms(buffer),
        output_level: processor.output_level(),
    })
}

/// Render a WAV file through the chain.
pub fn render(input: &Path, output: &Path, engine: &EngineArgs) -> Result<RenderSummary> {
    info!("Rendering {} -> {}", input.display(), output.display());

    let mut buffer = import_audio(input)?;
    let summary = render_buffer(&mut buffer, engine)?;
    export_audio(&buffer, output, ExportFormat::new(engine.bit_depth))?;

    print_summary(output, &summary);
    Ok(summary)
}

/// Render a generated sine tone through the chain.
pub fn tone(
    output: &Path,
    frequency: f32,
    amplitude: f32,
    duration_secs: f32,
    sample_rate: u32,
    layout: ChannelLayout,
    engine: &EngineArgs,
) -> Result<RenderSummary> {
    info!(
        "Rendering {:.1} Hz tone ({:.2} s) -> {}",
        frequency,
        duration_secs,
        output.display()
    );

    let mut buffer = generate_test_tone(frequency, amplitude, duration_secs, layout, sample_rate);
    let summary = render_buffer(&mut buffer, engine)?;
    export_audio(&buffer, output, ExportFormat::new(engine.bit_depth))?;

    print_summary(output, &summary);
    Ok(summary)
}

/// Parameter table as text, or descriptors plus the default snapshot as JSON
pub fn params_listing(json: bool) -> Result<String> {
    let infos: Vec<_> = ParamId::ALL.iter().map(|id| id.info()).collect();
    if json {
        let listing = serde_json::json!({
            "parameters": serde_json::to_value(&infos)?,
            "defaults": serde_json::to_value(ParamSnapshot::default())?,
        });
        return Ok(serde_json::to_string_pretty(&listing)?);
    }

    let mut out = format!(
        "{:<20} {:<16} {:>9} {:>9} {:>9}  {}\n",
        "ID", "NAME", "MIN", "MAX", "DEFAULT", "UNIT"
    );
    for info in &infos {
        let range = info.range;
        let row = match range.kind {
            ParamKind::Bool => format!(
                "{:<20} {:<16} {:>9} {:>9} {:>9}  switch\n",
                info.id.as_str(),
                info.name,
                "off",
                "on",
                if range.default >= 0.5 { "on" } else { "off" }
            ),
            ParamKind::Float => format!(
                "{:<20} {:<16} {:>9} {:>9} {:>9}  {}\n",
                info.id.as_str(),
                info.name,
                range.min,
                range.max,
                range.default,
                info.unit
            ),
        };
        out.push_str(&row);
    }
    Ok(out)
}

/// Print the parameter table.
pub fn params(json: bool) -> Result<()> {
    print!("{}", params_listing(json)?);
    Ok(())
}

fn print_summary(output: &Path, summary: &RenderSummary) {
    println!("Rendered: {}", output.display());
    println!(
        "  {} frames, {} ch, {} Hz",
        summary.frames, summary.channels, summary.sample_rate
    );
    println!(
        "  Peak in: {:.1} dBFS, peak out: {:.1} dBFS",
        summary.input_peak_db, summary.output_peak_db
    );
    println!(
        "  RMS in: {:.1} dBFS, RMS out: {:.1} dBFS",
        summary.input_rms_db, summary.output_rms_db
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};
    use test_case::test_case;

    #[test_case("delay_time=350", ParamId::DelayTime, 350.0 ; "float")]
    #[test_case("reverb_enabled=off", ParamId::ReverbEnabled, 0.0 ; "switch off")]
    #[test_case("Chorus_Enabled=TRUE", ParamId::ChorusEnabled, 1.0 ; "switch case insensitive")]
    #[test_case("input_gain= -6", ParamId::InputGain, -6.0 ; "whitespace")]
    fn test_parse_override(raw: &str, id: ParamId, value: f32) {
        assert_eq!(parse_override(raw).unwrap(), (id, value));
    }

    #[test]
    fn test_parse_override_errors() {
        assert!(matches!(
            parse_override("wah=1"),
            Err(FxError::UnknownParameter { .. })
        ));
        assert!(matches!(
            parse_override("drive=loud"),
            Err(FxError::InvalidParameterValue { .. })
        ));
        assert!(matches!(
            parse_override("drive"),
            Err(FxError::InvalidParameterValue { .. })
        ));
        assert!(parse_override("drive=NaN").is_err());
    }

    #[test]
    fn test_load_params_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "delay_time": 80, "reverb_enabled": false }}"#).unwrap();

        let overrides = load_params_json(file.path()).unwrap();
        assert_eq!(
            overrides,
            vec![(ParamId::DelayTime, 80.0), (ParamId::ReverbEnabled, 0.0)]
        );
    }

    #[test]
    fn test_load_params_json_rejects_strings() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "drive": "lots" }}"#).unwrap();
        assert!(load_params_json(file.path()).is_err());
    }

    #[test]
    fn test_set_wins_over_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "drive": 3 }}"#).unwrap();

        let engine = EngineArgs {
            params_json: Some(file.path().to_path_buf()),
            overrides: vec![(ParamId::Drive, 12.0)],
            ..EngineArgs::default()
        };
        let params = Parameters::new();
        apply_overrides(&params, &engine).unwrap();
        assert_eq!(params.get(ParamId::Drive), 12.0);
    }

    #[test]
    fn test_params_listing() {
        let text = params_listing(false).unwrap();
        assert_eq!(text.lines().count(), ParamId::COUNT + 1);
        assert!(text.contains("hpf_cutoff"));

        let json: Value = serde_json::from_str(&params_listing(true).unwrap()).unwrap();
        let entries = json["parameters"].as_array().unwrap();
        assert_eq!(entries.len(), ParamId::COUNT);
        assert_eq!(entries[0]["id"], "input_gain");

        let defaults = &json["defaults"];
        assert_eq!(defaults["delay"]["time_ms"], 220.0);
        assert_eq!(defaults["reverb"]["enabled"], true);
        assert_eq!(defaults["global_mix"], 1.0);
    }

    #[test]
    fn test_tone_renders_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");

        let summary = tone(
            &path,
            440.0,
            0.5,
            0.25,
            44100,
            ChannelLayout::Stereo,
            &EngineArgs::default(),
        )
        .unwrap();

        assert_eq!(summary.frames, 11025);
        assert_eq!(summary.channels, 2);
        assert!(summary.output_peak_db.is_finite());
        assert!(summary.output_rms_db.is_finite());
        assert!(summary.input_rms_db < summary.input_peak_db);

        let rendered = import_audio(&path).unwrap();
        assert_eq!(rendered.len(), 11025);
        assert!(rendered.is_finite());
    }

    #[test]
    fn test_render_with_tail() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");

        let source = generate_test_tone(220.0, 0.5, 0.1, ChannelLayout::Mono, 8000);
        export_audio(&source, &input, ExportFormat::float()).unwrap();

        let engine = EngineArgs {
            tail: true,
            block_size: 100,
            ..EngineArgs::default()
        };
        let summary = render(&input, &output, &engine).unwrap();
        assert_eq!(summary.frames, 800 + 16000);

        let rendered = import_audio(&output).unwrap();
        assert_eq!(rendered.len(), 16800);
        // The delay tail keeps ringing after the source ends
        let tail_energy: f32 = rendered.channel(0)[1000..].iter().map(|s| s * s).sum();
        assert!(tail_energy > 0.0);
    }
}
