//! Real-time mix of the active rows of one grid column
//!
//! Nothing here locks or allocates after construction. Buffers longer than
//! the scratch space are mixed in chunks, so the cost is bounded by
//! `rows * frames` whatever the grid width.

use super::oscillator::{OscillatorBank, ToneBank};
use crate::sequencer::NoteGrid;

pub struct Mixer<B = OscillatorBank> {
    bank: B,
    scratch: Vec<f32>,
}

impl<B: ToneBank> Mixer<B> {
    pub fn new(bank: B, max_block_frames: usize) -> Self {
        Self {
            bank,
            scratch: vec![0.0; max_block_frames.max(1)],
        }
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    /// Sum every row active in `column` into `out`. No clipping or
    /// normalisation is applied.
    pub fn render(&mut self, grid: &NoteGrid, column: usize, out: &mut [f32]) {
        out.fill(0.0);
        let rows = self.bank.rows().min(grid.rows());

        for chunk in out.chunks_mut(self.scratch.len()) {
            let temp = &mut self.scratch[..chunk.len()];
            for row in 0..rows {
                if !grid.is_active(column, row) {
                    continue;
                }
                self.bank.read(row, temp);
                for (sample, voice) in chunk.iter_mut().zip(temp.iter()) {
                    *sample += *voice;
                }
            }
        }
    }

    /// Play a single row straight into `out`, ignoring the grid.
    pub fn render_preview(&mut self, row: usize, out: &mut [f32]) {
        self.bank.read(row, out);
    }
}
