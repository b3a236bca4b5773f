/// MIDI output using midir
///
/// Playback can be mirrored to an external MIDI port: every column entered
/// sends note-on for its active rows and note-off for the previous column.
use log::{info, warn};
use midir::{MidiOutput, MidiOutputConnection};

use crate::error::{SynthError, SynthResult};

const CLIENT_NAME: &str = "gridsynth MIDI Output";
const VELOCITY: u8 = 100;

pub struct MidiOutputDevice {
    connection: Option<MidiOutputConnection>,
}

impl MidiOutputDevice {
    pub fn new() -> Self {
        Self { connection: None }
    }

    pub fn available_ports() -> Vec<String> {
        if let Ok(midi_out) = MidiOutput::new(CLIENT_NAME) {
            midi_out
                .ports()
                .iter()
                .filter_map(|p| midi_out.port_name(p).ok())
                .collect()
        } else {
            vec![]
        }
    }

    pub fn connect(&mut self, port_index: usize) -> SynthResult<()> {
        let midi_out = MidiOutput::new(CLIENT_NAME)
            .map_err(|e| SynthError::Midi(format!("Failed to create MIDI output: {}", e)))?;

        let ports = midi_out.ports();
        let port = ports
            .get(port_index)
            .ok_or_else(|| SynthError::Midi(format!("Invalid port index {}", port_index)))?;
        let name = midi_out.port_name(port).unwrap_or_default();

        let connection = midi_out
            .connect(port, "gridsynth")
            .map_err(|e| SynthError::Midi(format!("Failed to connect: {}", e)))?;

        info!("MIDI output connected to {}", name);
        self.connection = Some(connection);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn send_note_on(&mut self, note: u8, velocity: u8) -> SynthResult<()> {
        if let Some(ref mut conn) = self.connection {
            conn.send(&[0x90, note, velocity])
                .map_err(|e| SynthError::Midi(format!("Failed to send note on: {}", e)))?;
        }
        Ok(())
    }

    pub fn send_note_off(&mut self, note: u8) -> SynthResult<()> {
        if let Some(ref mut conn) = self.connection {
            conn.send(&[0x80, note, 0])
                .map_err(|e| SynthError::Midi(format!("Failed to send note off: {}", e)))?;
        }
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.connection = None;
    }
}

impl Default for MidiOutputDevice {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks which notes are sounding on a MIDI device so each column change
/// sends exactly the matching note-offs.
pub struct MidiMirror {
    device: MidiOutputDevice,
    sounding: Vec<u8>,
}

impl MidiMirror {
    pub fn new(device: MidiOutputDevice) -> Self {
        Self {
            device,
            sounding: Vec::new(),
        }
    }

    pub fn sounding(&self) -> &[u8] {
        &self.sounding
    }

    /// Release the previous column and start `notes`.
    pub fn enter_column(&mut self, notes: impl IntoIterator<Item = u8>) {
        self.release_all();
        for note in notes {
            if let Err(e) = self.device.send_note_on(note, VELOCITY) {
                warn!("{}", e);
            }
            self.sounding.push(note);
        }
    }

    pub fn release_all(&mut self) {
        for note in self.sounding.drain(..) {
            if let Err(e) = self.device.send_note_off(note) {
                warn!("{}", e);
            }
        }
    }
}

impl Drop for MidiMirror {
    fn drop(&mut self) {
        self.release_all();
    }
}

pub fn midi_note_name(note: u8) -> String {
    let note_names = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = (note / 12) as i32 - 1;
    let note_index = (note % 12) as usize;
    format!("{}{}", note_names[note_index], octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_names() {
        assert_eq!(midi_note_name(60), "C4");
        assert_eq!(midi_note_name(48), "C3");
        assert_eq!(midi_note_name(69), "A4");
        assert_eq!(midi_note_name(0), "C-1");
    }

    #[test]
    fn test_mirror_tracks_sounding_notes() {
        // unconnected device: sends are no-ops
        let mut mirror = MidiMirror::new(MidiOutputDevice::new());
        mirror.enter_column([48, 52, 55]);
        assert_eq!(mirror.sounding(), &[48, 52, 55]);

        mirror.enter_column([50]);
        assert_eq!(mirror.sounding(), &[50]);

        mirror.release_all();
        assert!(mirror.sounding().is_empty());
    }
}
