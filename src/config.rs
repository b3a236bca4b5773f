/// Session constants, fixed from startup to shutdown
use serde::Deserialize;
use std::path::Path;

use crate::error::{SynthError, SynthResult};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynthConfig {
    /// Grid width in columns
    pub columns: usize,
    /// Number of pitch rows
    pub rows: usize,
    /// MIDI note number of row 0
    pub base_note: u8,
    /// Columns per second
    pub tempo: f64,
    pub sample_rate: u32,
    /// Peak amplitude of a single oscillator
    pub amplitude: f32,
    /// Frames rendered per export step
    pub export_block_frames: usize,
    /// Largest block the renderer processes in one pass
    pub max_block_frames: usize,
    /// Undo depth
    pub max_history: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            columns: 32,
            rows: 25, // two octaves + extra C
            base_note: 48, // C3
            tempo: 8.0,
            sample_rate: 48_000,
            amplitude: 0.2,
            export_block_frames: 1,
            max_block_frames: 4096,
            max_history: 1024,
        }
    }
}

impl SynthConfig {
    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> SynthResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SynthConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SynthResult<()> {
        if self.columns == 0 || self.rows == 0 {
            return Err(SynthError::Config("grid must have at least one column and one row".into()));
        }
        if !self.tempo.is_finite() || self.tempo <= 0.0 {
            return Err(SynthError::Config(format!("tempo must be positive, got {}", self.tempo)));
        }
        if self.sample_rate == 0 {
            return Err(SynthError::Config("sample rate must be positive".into()));
        }
        if self.base_note as usize + self.rows > 128 {
            return Err(SynthError::Config(format!(
                "{} rows from note {} run past MIDI note 127",
                self.rows, self.base_note
            )));
        }
        if !(0.0..=1.0).contains(&self.amplitude) {
            return Err(SynthError::Config(format!(
                "amplitude must be within 0..=1, got {}",
                self.amplitude
            )));
        }
        if self.export_block_frames == 0 || self.max_block_frames == 0 {
            return Err(SynthError::Config("block sizes must be positive".into()));
        }
        if self.max_history == 0 {
            return Err(SynthError::Config("undo history needs room for one action".into()));
        }
        Ok(())
    }

    /// Song length in seconds
    pub fn duration(&self) -> f64 {
        self.columns as f64 / self.tempo
    }

    /// Frames written by a full export
    pub fn total_frames(&self) -> u64 {
        (self.duration() * self.sample_rate as f64).ceil() as u64
    }

    /// MIDI note number played by `row`
    pub fn note_for_row(&self, row: usize) -> u8 {
        (self.base_note as usize + row).min(127) as u8
    }
}
