/// Audio output using cpal
///
/// The control side and the device callback share one `SharedState`. The
/// control side writes flags, the column and grid cells; the callback reads
/// them once per buffer. Nothing on the callback path takes a lock.
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::SynthConfig;
use crate::error::{SynthError, SynthResult};
use crate::sequencer::NoteGrid;

pub mod export;
pub mod mixer;
pub mod oscillator;

use mixer::Mixer;
use oscillator::{OscillatorBank, Waveform};

pub struct SharedState {
    grid: NoteGrid,
    playing: AtomicBool,
    exporting: AtomicBool,
    column: AtomicUsize,
    preview: AtomicBool,
    preview_row: AtomicUsize,
    waveform: AtomicU8,
}

impl SharedState {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            grid: NoteGrid::new(columns, rows),
            playing: AtomicBool::new(false),
            exporting: AtomicBool::new(false),
            column: AtomicUsize::new(0),
            preview: AtomicBool::new(false),
            preview_row: AtomicUsize::new(0),
            waveform: AtomicU8::new(Waveform::default().index() as u8),
        }
    }

    pub fn grid(&self) -> &NoteGrid {
        &self.grid
    }

    /// Publish the transport position to the callback.
    pub fn set_playback(&self, playing: bool, column: usize) {
        self.column.store(column, Ordering::Relaxed);
        self.playing.store(playing, Ordering::Release);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn column(&self) -> usize {
        self.column.load(Ordering::Relaxed)
    }

    pub fn set_exporting(&self, exporting: bool) {
        self.exporting.store(exporting, Ordering::Release);
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting.load(Ordering::Acquire)
    }

    pub fn set_preview(&self, row: Option<usize>) {
        match row {
            Some(row) => {
                self.preview_row.store(row, Ordering::Relaxed);
                self.preview.store(true, Ordering::Release);
            }
            None => self.preview.store(false, Ordering::Release),
        }
    }

    pub fn preview(&self) -> Option<usize> {
        self.preview
            .load(Ordering::Acquire)
            .then(|| self.preview_row.load(Ordering::Relaxed))
    }

    pub fn set_waveform(&self, waveform: Waveform) {
        self.waveform.store(waveform.index() as u8, Ordering::Relaxed);
    }

    pub fn waveform(&self) -> Waveform {
        Waveform::from_index(self.waveform.load(Ordering::Relaxed) as usize).unwrap_or_default()
    }
}

/// Body of the audio callback. Owns the oscillator phases, so each renderer
/// produces its own continuous stream.
pub struct Renderer {
    mixer: Mixer,
    shared: Arc<SharedState>,
    mono: Vec<f32>,
}

impl Renderer {
    pub fn new(config: &SynthConfig, shared: Arc<SharedState>) -> Self {
        let bank = OscillatorBank::new(
            config.rows,
            config.base_note,
            config.amplitude,
            config.sample_rate,
            shared.waveform(),
        );

        Self {
            mixer: Mixer::new(bank, config.max_block_frames),
            shared,
            mono: vec![0.0; config.max_block_frames.max(1)],
        }
    }

    /// Render one mono buffer: the playing column, else the edit preview,
    /// else silence.
    pub fn process(&mut self, out: &mut [f32]) {
        let waveform = self.shared.waveform();
        if waveform != self.mixer.bank().waveform() {
            self.mixer.bank_mut().set_waveform(waveform);
        }

        if self.shared.is_playing() || self.shared.is_exporting() {
            let column = self.shared.column();
            self.mixer.render(self.shared.grid(), column, out);
        } else if let Some(row) = self.shared.preview() {
            self.mixer.render_preview(row, out);
        } else {
            out.fill(0.0);
        }
    }

    /// Device callback for a mono stream. Silent while an export is
    /// rendering on the control side.
    pub fn fill(&mut self, out: &mut [f32]) {
        if self.shared.is_exporting() {
            out.fill(0.0);
            return;
        }
        self.process(out);
    }

    /// Device callback for interleaved output; the mono signal is copied to
    /// every channel.
    pub fn fill_interleaved(&mut self, data: &mut [f32], channels: usize) {
        if channels <= 1 {
            self.fill(data);
            return;
        }

        let mut mono = std::mem::take(&mut self.mono);
        for frames in data.chunks_mut(mono.len() * channels) {
            let count = frames.len() / channels;
            self.fill(&mut mono[..count]);
            for (frame, &sample) in frames.chunks_mut(channels).zip(mono.iter()) {
                frame.fill(sample);
            }
        }
        self.mono = mono;
    }
}

pub struct AudioOutput {
    _stream: cpal::Stream,
    channels: u16,
    sample_rate: u32,
}

impl AudioOutput {
    /// Open the default output device and start streaming. Failure here is
    /// fatal for live playback.
    pub fn start(config: &SynthConfig, shared: Arc<SharedState>) -> SynthResult<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(SynthError::NoDevice)?;
        let stream_config = Self::stream_config(&device, config.sample_rate)?;
        let channels = stream_config.channels;

        let mut renderer = Renderer::new(config, shared);
        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    renderer.fill_interleaved(data, channels as usize);
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| SynthError::StreamBuild(e.to_string()))?;

        stream.play().map_err(|e| SynthError::Stream(e.to_string()))?;

        info!(
            "audio output on {} ({} ch @ {} Hz)",
            device.name().unwrap_or_else(|_| "unknown device".into()),
            channels,
            config.sample_rate
        );

        Ok(Self {
            _stream: stream,
            channels,
            sample_rate: config.sample_rate,
        })
    }

    /// Fewest-channel f32 config that runs at `sample_rate`.
    fn stream_config(device: &cpal::Device, sample_rate: u32) -> SynthResult<cpal::StreamConfig> {
        let rate = cpal::SampleRate(sample_rate);
        let configs = device
            .supported_output_configs()
            .map_err(|e| SynthError::DeviceConfig(e.to_string()))?;

        let mut best: Option<cpal::SupportedStreamConfig> = None;
        let mut saw_f32 = false;
        for supported in configs {
            if supported.sample_format() != cpal::SampleFormat::F32 {
                continue;
            }
            saw_f32 = true;
            if supported.min_sample_rate() > rate || supported.max_sample_rate() < rate {
                continue;
            }
            if best.as_ref().map_or(true, |b| supported.channels() < b.channels()) {
                best = Some(supported.with_sample_rate(rate));
            }
        }

        match best {
            Some(supported) => Ok(supported.config()),
            None if !saw_f32 => Err(SynthError::UnsupportedSampleFormat(
                "device offers no f32 output".into(),
            )),
            None => Err(SynthError::DeviceConfig(format!(
                "no f32 output config at {} Hz",
                sample_rate
            ))),
        }
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
