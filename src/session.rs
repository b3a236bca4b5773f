/// Session - the control-side owner of grid history, transport and export
///
/// Every UI command lands here. The audio callback only ever sees the
/// `SharedState` this session publishes into.
use log::{debug, error, info, warn};
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use crate::audio::export::WavExporter;
use crate::audio::oscillator::Waveform;
use crate::audio::{Renderer, SharedState};
use crate::config::SynthConfig;
use crate::error::SynthResult;
use crate::midi::{midi_note_name, MidiMirror, MidiOutputDevice};
use crate::sequencer::history::{Action, ActionLog};
use crate::sequencer::playback::Transport;
use crate::sequencer::NoteGrid;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Grid contents changed; redraw
    GridChanged,
    StepAdvanced(usize),
    PlaybackStarted,
    PlaybackStopped,
    PlaybackReset,
    /// Playback ran past the last column and rewound
    SongFinished,
    InstrumentChanged(Waveform),
    ExportFinished { frames: u64 },
}

pub struct Session {
    config: SynthConfig,
    shared: Arc<SharedState>,
    history: ActionLog,
    transport: Transport,
    midi: Option<MidiMirror>,
    sender: Sender<SessionEvent>,
    receiver: Receiver<SessionEvent>,
}

impl Session {
    pub fn new(config: SynthConfig) -> SynthResult<Self> {
        config.validate()?;
        let (sender, receiver) = channel();
        let shared = Arc::new(SharedState::new(config.columns, config.rows));

        Ok(Self {
            history: ActionLog::new(shared.grid().len(), config.max_history),
            transport: Transport::new(config.columns, config.tempo),
            shared,
            config,
            midi: None,
            sender,
            receiver,
        })
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Handle for the audio callback
    pub fn shared(&self) -> Arc<SharedState> {
        Arc::clone(&self.shared)
    }

    pub fn grid(&self) -> &NoteGrid {
        self.shared.grid()
    }

    pub fn history(&self) -> &ActionLog {
        &self.history
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn poll_events(&self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }

    // Editing

    pub fn toggle_note_at(&mut self, col: i32, row: i32) {
        self.edit(Action::ToggleNote { col, row });
    }

    pub fn add_note_at(&mut self, col: i32, row: i32) {
        self.edit(Action::AddNote { col, row });
    }

    pub fn remove_note_at(&mut self, col: i32, row: i32) {
        self.edit(Action::RemoveNote { col, row });
    }

    /// Clear the grid. Only the most recent clear can be undone.
    pub fn clear_all(&mut self) {
        self.edit(Action::ClearAll);
    }

    fn edit(&mut self, action: Action) {
        debug!("{:?}", action);
        self.history.record_and_apply(self.shared.grid(), action);
        self.emit(SessionEvent::GridChanged);
    }

    pub fn undo(&mut self) -> bool {
        let changed = self.history.undo(self.shared.grid());
        if changed {
            self.emit(SessionEvent::GridChanged);
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        let changed = self.history.redo(self.shared.grid());
        if changed {
            self.emit(SessionEvent::GridChanged);
        }
        changed
    }

    /// Sound `row` while it is being edited. Ignored for rows off the grid.
    pub fn begin_preview(&mut self, row: i32) {
        match usize::try_from(row).ok().filter(|&r| r < self.config.rows) {
            Some(row) => {
                debug!("previewing {}", midi_note_name(self.config.note_for_row(row)));
                self.shared.set_preview(Some(row));
            }
            None => self.shared.set_preview(None),
        }
    }

    pub fn end_preview(&mut self) {
        self.shared.set_preview(None);
    }

    // Instrument

    /// Select the waveform for every row by its selector index
    /// (sine, square, triangle, saw). Unknown indices are ignored.
    pub fn set_instrument(&mut self, index: usize) {
        let Some(waveform) = Waveform::from_index(index) else {
            warn!("ignoring unknown instrument index {}", index);
            return;
        };
        if waveform == self.shared.waveform() {
            return;
        }

        info!("instrument: {}", waveform.name());
        self.shared.set_waveform(waveform);
        self.emit(SessionEvent::InstrumentChanged(waveform));
    }

    pub fn instrument(&self) -> Waveform {
        self.shared.waveform()
    }

    // Transport

    pub fn is_playing(&self) -> bool {
        self.transport.is_running()
    }

    pub fn start_playback(&mut self) {
        self.transport.start();
        self.publish();
        self.mirror_column();
        info!("now playing");
        self.emit(SessionEvent::PlaybackStarted);
    }

    pub fn stop_playback(&mut self) {
        self.transport.stop();
        self.publish();
        self.release_midi();
        info!("stopped playing");
        self.emit(SessionEvent::PlaybackStopped);
    }

    pub fn reset_playback(&mut self) {
        self.transport.reset();
        self.publish();
        self.release_midi();
        info!("reset");
        self.emit(SessionEvent::PlaybackReset);
    }

    /// Drive playback from a clock timestamp.
    pub fn tick(&mut self, now: Duration) -> usize {
        let before = self.transport.state();
        self.transport.tick(now);
        self.after_advance(before.column, before.running)
    }

    /// Drive playback by an explicit time step in seconds.
    pub fn advance(&mut self, delta: f64) -> usize {
        let before = self.transport.state();
        self.transport.advance(delta);
        self.after_advance(before.column, before.running)
    }

    fn after_advance(&mut self, previous: usize, was_running: bool) -> usize {
        self.publish();
        let column = self.transport.column();

        if was_running && !self.transport.is_running() {
            self.release_midi();
            info!("song finished");
            self.emit(SessionEvent::SongFinished);
        } else if column != previous {
            self.mirror_column();
            self.emit(SessionEvent::StepAdvanced(column));
        }
        column
    }

    fn publish(&self) {
        self.shared
            .set_playback(self.transport.is_running(), self.transport.column());
    }

    // MIDI

    /// Mirror playback to `device` from now on.
    pub fn attach_midi(&mut self, device: MidiOutputDevice) {
        self.midi = Some(MidiMirror::new(device));
        if self.transport.is_running() {
            self.mirror_column();
        }
    }

    fn mirror_column(&mut self) {
        let Some(midi) = self.midi.as_mut() else {
            return;
        };
        let column = self.transport.column();
        let grid = self.shared.grid();
        let notes: Vec<u8> = (0..self.config.rows)
            .filter(|&row| grid.is_active(column, row))
            .map(|row| self.config.note_for_row(row))
            .collect();
        midi.enter_column(notes);
    }

    fn release_midi(&mut self) {
        if let Some(midi) = self.midi.as_mut() {
            midi.release_all();
        }
    }

    // Export

    /// Render the whole song from the start into `sink`, one export block at
    /// a time. The device callback stays silent meanwhile, and the transport
    /// is put back where it was whether or not the export succeeds.
    pub fn export_with<F>(&mut self, mut sink: F) -> SynthResult<u64>
    where
        F: FnMut(&[f32]) -> SynthResult<()>,
    {
        let saved = self.transport.state();
        let total = self.config.total_frames();
        let block = self.config.export_block_frames;
        let sample_rate = self.config.sample_rate as f64;

        let mut renderer = Renderer::new(&self.config, Arc::clone(&self.shared));
        let mut buffer = vec![0.0; block];

        self.release_midi();
        self.shared.set_exporting(true);
        self.transport.reset();
        self.transport.start();
        self.publish();
        info!("Beginning export ({} frames)", total);

        let mut written = 0u64;
        let result = loop {
            if written >= total {
                break Ok(written);
            }

            let frames = (total - written).min(block as u64) as usize;
            let out = &mut buffer[..frames];
            renderer.process(out);
            if let Err(e) = sink(out) {
                break Err(e);
            }

            written += frames as u64;
            self.transport.seek(written as f64 / sample_rate);
            self.publish();
        };

        self.shared.set_exporting(false);
        self.transport.restore(saved);
        self.publish();

        match &result {
            Ok(frames) => {
                info!("Finished export. Total frames written: {}", frames);
                self.emit(SessionEvent::ExportFinished { frames: *frames });
            }
            Err(e) => error!("export aborted after {} frames: {}", written, e),
        }
        result
    }

    /// Export the song to a mono 32-bit float WAV file. Blocks until the
    /// file is written.
    pub fn begin_export(&mut self, path: &Path) -> SynthResult<u64> {
        let mut exporter = WavExporter::create(path, self.config.sample_rate)?;
        let frames = self.export_with(|samples| exporter.write(samples))?;
        exporter.finalize()?;
        info!("wrote {}", path.display());
        Ok(frames)
    }
}
