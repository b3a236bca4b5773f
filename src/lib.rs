/// gridsynth - a step-sequencer synthesizer core
///
/// This library provides the pieces behind a note-grid synthesizer:
/// - Note grid shared lock-free with the audio callback
/// - Undo/redo history with a one-level clear snapshot
/// - Transport that turns clock time into grid columns
/// - Per-row oscillators and a real-time mixer
/// - Live output through cpal and WAV export through hound
/// - Optional MIDI mirror of playback

pub mod audio;
pub mod config;
pub mod error;
pub mod midi;
pub mod sequencer;
pub mod session;

// Re-export commonly used types
pub use audio::export::WavExporter;
pub use audio::mixer::Mixer;
pub use audio::oscillator::{note_frequency, Oscillator, OscillatorBank, ToneBank, Waveform};
pub use audio::{AudioOutput, Renderer, SharedState};
pub use config::SynthConfig;
pub use error::{SynthError, SynthResult};
pub use midi::{midi_note_name, MidiMirror, MidiOutputDevice};
pub use sequencer::history::{Action, ActionLog};
pub use sequencer::playback::{Clock, SystemClock, Transport, TransportState};
pub use sequencer::NoteGrid;
pub use session::{Session, SessionEvent};
