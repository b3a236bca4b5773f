//! Per-row oscillators with continuous phase

use std::f64::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl Waveform {
    /// Instrument selector order
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Triangle,
        Waveform::Sawtooth,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            Waveform::Sine => 0,
            Waveform::Square => 1,
            Waveform::Triangle => 2,
            Waveform::Sawtooth => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine wave",
            Waveform::Square => "square wave",
            Waveform::Triangle => "triangle wave",
            Waveform::Sawtooth => "saw wave",
        }
    }

    /// Unit-amplitude sample at `phase`, measured in cycles.
    pub fn sample(self, phase: f64) -> f64 {
        let f = phase - phase.floor();
        match self {
            Waveform::Sine => (f * TAU).sin(),
            Waveform::Square => {
                if f < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 2.0 * (2.0 * (f - 0.5)).abs() - 1.0,
            Waveform::Sawtooth => 2.0 * (f - 0.5),
        }
    }
}

/// Equal-tempered frequency of a MIDI note, A4 = 440 Hz.
pub fn note_frequency(note: u8) -> f64 {
    440.0 * 2.0_f64.powf((note as f64 - 69.0) / 12.0)
}

#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    frequency: f64,
    amplitude: f64,
    /// Cycles advanced per sample
    step: f64,
    phase: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f64, amplitude: f32, sample_rate: u32) -> Self {
        Self {
            waveform,
            frequency,
            amplitude: amplitude as f64,
            step: frequency / sample_rate as f64,
            phase: 0.0,
        }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Overwrite `out` with the next `out.len()` samples.
    pub fn read(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = (self.waveform.sample(self.phase) * self.amplitude) as f32;
            self.phase += self.step;
            // keep precision over long sessions
            if self.phase >= 1.0 {
                self.phase -= self.phase.floor();
            }
        }
    }
}

/// Anything the mixer can pull per-row audio from.
pub trait ToneBank {
    fn rows(&self) -> usize;

    /// Overwrite `out` with the next samples of `row`. Rows out of range
    /// produce silence.
    fn read(&mut self, row: usize, out: &mut [f32]);
}

/// One oscillator per pitch row, all sharing one waveform.
#[derive(Debug, Clone)]
pub struct OscillatorBank {
    oscillators: Vec<Oscillator>,
    waveform: Waveform,
}

impl OscillatorBank {
    /// Row `r` plays MIDI note `base_note + r`.
    pub fn new(rows: usize, base_note: u8, amplitude: f32, sample_rate: u32, waveform: Waveform) -> Self {
        let oscillators = (0..rows)
            .map(|row| {
                let note = (base_note as usize + row).min(127) as u8;
                Oscillator::new(waveform, note_frequency(note), amplitude, sample_rate)
            })
            .collect();

        Self { oscillators, waveform }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Switch every row to `waveform`; frequencies and phases are kept.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
        for oscillator in &mut self.oscillators {
            oscillator.set_waveform(waveform);
        }
    }

    pub fn oscillator(&self, row: usize) -> Option<&Oscillator> {
        self.oscillators.get(row)
    }
}

impl ToneBank for OscillatorBank {
    fn rows(&self) -> usize {
        self.oscillators.len()
    }

    fn read(&mut self, row: usize, out: &mut [f32]) {
        match self.oscillators.get_mut(row) {
            Some(oscillator) => oscillator.read(out),
            None => out.fill(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_note_frequency() {
        assert_relative_eq!(note_frequency(69), 440.0);
        assert_relative_eq!(note_frequency(81), 880.0, max_relative = 1e-12);
        assert_relative_eq!(note_frequency(48), 130.812_782_650_299_3, max_relative = 1e-9);
    }

    #[test]
    fn test_waveform_shapes() {
        assert_relative_eq!(Waveform::Sine.sample(0.25), 1.0);
        assert_eq!(Waveform::Square.sample(0.1), 1.0);
        assert_eq!(Waveform::Square.sample(0.6), -1.0);
        assert_eq!(Waveform::Triangle.sample(0.0), 1.0);
        assert_eq!(Waveform::Triangle.sample(0.5), -1.0);
        assert_eq!(Waveform::Sawtooth.sample(0.0), -1.0);
        assert_eq!(Waveform::Sawtooth.sample(0.75), 0.5);
        // phase wraps
        assert_eq!(Waveform::Sawtooth.sample(1.75), 0.5);
    }

    #[test]
    fn test_waveform_index_round_trip() {
        for waveform in Waveform::ALL {
            assert_eq!(Waveform::from_index(waveform.index()), Some(waveform));
        }
        assert_eq!(Waveform::from_index(4), None);
    }

    #[test]
    fn test_phase_continues_across_reads() {
        let mut split = Oscillator::new(Waveform::Sine, 440.0, 0.2, 48_000);
        let mut whole = split.clone();

        let mut a = [0.0; 100];
        let mut b = [0.0; 156];
        split.read(&mut a);
        split.read(&mut b);

        let mut all = [0.0; 256];
        whole.read(&mut all);

        assert_eq!(&all[..100], &a[..]);
        assert_eq!(&all[100..], &b[..]);
    }

    #[test]
    fn test_amplitude_bounds_output() {
        let mut osc = Oscillator::new(Waveform::Square, 1000.0, 0.2, 48_000);
        let mut out = [0.0; 480];
        osc.read(&mut out);
        assert!(out.iter().all(|s| s.abs() <= 0.2 + f32::EPSILON));
        assert!(out.iter().any(|&s| s > 0.0));
        assert!(out.iter().any(|&s| s < 0.0));
    }

    #[test]
    fn test_bank_rows_and_waveform() {
        let mut bank = OscillatorBank::new(25, 48, 0.2, 48_000, Waveform::Sine);
        assert_eq!(bank.rows(), 25);
        assert_relative_eq!(bank.oscillator(21).unwrap().frequency(), 440.0);

        bank.set_waveform(Waveform::Sawtooth);
        assert_eq!(bank.waveform(), Waveform::Sawtooth);
        let mut out = [0.0; 2];
        bank.read(21, &mut out);
        // first sawtooth sample starts at the bottom
        assert_relative_eq!(out[0], -0.2);
    }

    #[test]
    fn test_bank_out_of_range_row_is_silent() {
        let mut bank = OscillatorBank::new(2, 60, 0.2, 48_000, Waveform::Square);
        let mut out = [1.0; 8];
        bank.read(5, &mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
