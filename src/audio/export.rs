//! WAV file output for song export

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::SynthResult;

/// Mono 32-bit float at `sample_rate`
pub fn wav_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    }
}

pub struct WavExporter {
    writer: hound::WavWriter<BufWriter<File>>,
    frames: u64,
}

impl WavExporter {
    pub fn create(path: &Path, sample_rate: u32) -> SynthResult<Self> {
        let writer = hound::WavWriter::create(path, wav_spec(sample_rate))?;
        Ok(Self { writer, frames: 0 })
    }

    pub fn write(&mut self, samples: &[f32]) -> SynthResult<()> {
        for &sample in samples {
            self.writer.write_sample(sample)?;
        }
        self.frames += samples.len() as u64;
        Ok(())
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Patch the header lengths and flush.
    pub fn finalize(self) -> SynthResult<()> {
        self.writer.finalize()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");

        let mut exporter = WavExporter::create(&path, 48_000).unwrap();
        exporter.write(&[0.0, 0.5, -0.25]).unwrap();
        exporter.write(&[1.5]).unwrap();
        assert_eq!(exporter.frames(), 4);
        exporter.finalize().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec(), wav_spec(48_000));
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0.0, 0.5, -0.25, 1.5]);
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.wav");
        assert!(WavExporter::create(&path, 48_000).is_err());
    }
}
