#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use std::time::Duration;

#[cfg(feature = "cli")]
use anyhow::Context;
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use log::info;

#[cfg(feature = "cli")]
use gridsynth::{
    midi_note_name, AudioOutput, Clock, MidiOutputDevice, Session, SessionEvent, SynthConfig,
    SystemClock, Waveform,
};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "gridsynth", about = "Step-sequencer synthesizer")]
struct Cli {
    /// TOML file overriding the session constants
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Command {
    /// Play the song once through the default audio device
    Play {
        #[command(flatten)]
        song: SongArgs,

        /// Also send the notes to this MIDI output port
        #[arg(long)]
        midi_port: Option<usize>,
    },
    /// Render the song to a WAV file
    Export {
        #[command(flatten)]
        song: SongArgs,

        #[arg(short, long, default_value = "my_file.wav")]
        out: PathBuf,
    },
    /// List MIDI output ports
    Ports,
}

#[cfg(feature = "cli")]
#[derive(clap::Args)]
struct SongArgs {
    /// Active cell as COL:ROW, repeatable
    #[arg(short, long = "note", value_parser = parse_cell)]
    notes: Vec<(i32, i32)>,

    /// 0 sine, 1 square, 2 triangle, 3 saw
    #[arg(short, long, default_value_t = 0)]
    instrument: usize,
}

#[cfg(feature = "cli")]
fn parse_cell(s: &str) -> Result<(i32, i32), String> {
    let (col, row) = s
        .split_once(':')
        .ok_or_else(|| format!("expected COL:ROW, got '{}'", s))?;
    let col = col.trim().parse().map_err(|e| format!("bad column '{}': {}", col, e))?;
    let row = row.trim().parse().map_err(|e| format!("bad row '{}': {}", row, e))?;
    Ok((col, row))
}

#[cfg(feature = "cli")]
fn build_session(config: SynthConfig, song: &SongArgs) -> anyhow::Result<Session> {
    let mut session = Session::new(config)?;
    for &(col, row) in &song.notes {
        session.toggle_note_at(col, row);
    }
    session.set_instrument(song.instrument);
    info!(
        "{} notes, {}",
        session.grid().active_count(),
        Waveform::from_index(song.instrument)
            .unwrap_or_default()
            .name()
    );
    Ok(session)
}

#[cfg(feature = "cli")]
fn play(session: &mut Session, midi_port: Option<usize>) -> anyhow::Result<()> {
    let _output = AudioOutput::start(session.config(), session.shared())
        .context("Failed to initialize audio device")?;

    if let Some(port) = midi_port {
        let mut device = MidiOutputDevice::new();
        device.connect(port)?;
        session.attach_midi(device);
    }

    let clock = SystemClock::new();
    session.start_playback();
    session.tick(clock.now());

    while session.is_playing() {
        std::thread::sleep(Duration::from_millis(10));
        session.tick(clock.now());

        for event in session.poll_events() {
            if let SessionEvent::StepAdvanced(column) = event {
                let notes: Vec<String> = (0..session.config().rows)
                    .filter(|&row| session.grid().is_active(column, row))
                    .map(|row| midi_note_name(session.config().note_for_row(row)))
                    .collect();
                info!("column {:>3}  {}", column, notes.join(" "));
            }
        }
    }

    // let the last buffer drain
    std::thread::sleep(Duration::from_millis(100));
    Ok(())
}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => SynthConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SynthConfig::default(),
    };

    match cli.command {
        Command::Play { song, midi_port } => {
            let mut session = build_session(config, &song)?;
            play(&mut session, midi_port)
        }
        Command::Export { song, out } => {
            let mut session = build_session(config, &song)?;
            let frames = session
                .begin_export(&out)
                .with_context(|| format!("Failed to export {}", out.display()))?;
            println!("Wrote {} frames to {}", frames, out.display());
            Ok(())
        }
        Command::Ports => {
            let ports = MidiOutputDevice::available_ports();
            if ports.is_empty() {
                println!("No MIDI ports available");
            }
            for (i, name) in ports.iter().enumerate() {
                println!("{}: {}", i, name);
            }
            Ok(())
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature to be enabled");
    std::process::exit(1);
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("3:12"), Ok((3, 12)));
        assert_eq!(parse_cell(" -1 : 2 "), Ok((-1, 2)));
        assert!(parse_cell("3").is_err());
        assert!(parse_cell("a:1").is_err());
    }

    #[test]
    fn test_cli_parses_export() {
        let cli = Cli::try_parse_from([
            "gridsynth", "export", "--note", "0:1", "-n", "4:2", "-i", "3", "-o", "song.wav",
        ])
        .unwrap();
        match cli.command {
            Command::Export { song, out } => {
                assert_eq!(song.notes, vec![(0, 1), (4, 2)]);
                assert_eq!(song.instrument, 3);
                assert_eq!(out, PathBuf::from("song.wav"));
            }
            _ => panic!("expected export"),
        }
    }
}
