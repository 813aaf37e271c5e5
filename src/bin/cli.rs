//! wiretrack CLI - Debug tool for the track finder
//!
//! Usage:
//!   wiretrack-cli find <events.json> [--output <file>] [--config <file>]
//!   wiretrack-cli synth [--events <n>] [--tracks <n>] [--output <file>]
//!
//! The `find` command runs the full pipeline over a JSON event file and
//! shows per-event stage counters, helping to understand how hits are
//! being clustered, linked and assembled. The `synth` command writes a
//! synthetic event file with known ground truth.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use wiretrack::synthetic::SyntheticScenario;
use wiretrack::{
    DriftCalibration, EventData, FinderConfig, TrackFindingEngine, WireTopology,
};

#[derive(Parser)]
#[command(name = "wiretrack-cli")]
#[command(about = "Debug tool for drift-chamber track finding", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the track finder over a JSON event file
    Find {
        /// JSON file containing an array of events
        input: PathBuf,

        /// Output file for the found tracks (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Finder configuration file (JSON); defaults apply otherwise
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Process events in parallel
        #[cfg(feature = "parallel")]
        #[arg(long)]
        parallel: bool,
    },

    /// Generate a synthetic event file with known ground truth
    Synth {
        /// Number of events
        #[arg(long, default_value = "10")]
        events: usize,

        /// Tracks per event
        #[arg(long, default_value = "5")]
        tracks: usize,

        /// Noise hits per event
        #[arg(long, default_value = "30")]
        noise: usize,

        /// RNG seed
        #[arg(long, default_value = "4711")]
        seed: u64,

        /// Output file for the events (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Find {
            input,
            output,
            config,
            #[cfg(feature = "parallel")]
            parallel,
        } => run_find(
            input,
            output,
            config,
            #[cfg(feature = "parallel")]
            parallel,
        ),
        Commands::Synth {
            events,
            tracks,
            noise,
            seed,
            output,
        } => run_synth(events, tracks, noise, seed, output),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run_find(
    input: PathBuf,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
    #[cfg(feature = "parallel")] parallel: bool,
) -> wiretrack::Result<()> {
    let config: FinderConfig = match config_path {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => FinderConfig::default(),
    };

    let events: Vec<EventData> = serde_json::from_str(&fs::read_to_string(&input)?)?;
    println!("loaded {} event(s) from {}", events.len(), input.display());

    let topology = WireTopology::standard();
    let calibration = DriftCalibration::default();
    let mut engine = TrackFindingEngine::new(topology, calibration, config)?;

    #[cfg(feature = "parallel")]
    let results = if parallel {
        engine.process_events_parallel(&events)
    } else {
        engine.process_events(&events)
    };
    #[cfg(not(feature = "parallel"))]
    let results = engine.process_events(&events);

    let mut all_tracks = Vec::new();
    for (event, result) in events.iter().zip(results) {
        match result {
            Ok(tracks) => {
                println!(
                    "event '{}': {} hits -> {} track(s)",
                    event.event_id,
                    event.hits.len(),
                    tracks.len()
                );
                for (index, track) in tracks.iter().enumerate() {
                    println!(
                        "  track {index}: {} hits, curvature {:+.5}/cm, tan(lambda) {:+.3}, prob {:.3}",
                        track.len(),
                        track.start.circle.curvature,
                        track.start.sz.tan_lambda,
                        track.probability()
                    );
                }
                all_tracks.extend(tracks);
            }
            Err(e) => println!("event '{}': {e}", event.event_id),
        }
    }

    if let Some(path) = output {
        fs::write(&path, serde_json::to_string_pretty(&all_tracks)?)?;
        println!("wrote {} track(s) to {}", all_tracks.len(), path.display());
    }
    Ok(())
}

fn run_synth(
    events: usize,
    tracks: usize,
    noise: usize,
    seed: u64,
    output: Option<PathBuf>,
) -> wiretrack::Result<()> {
    let topology = WireTopology::standard();
    let calibration = DriftCalibration::default();
    let scenario = SyntheticScenario {
        track_count: tracks,
        noise_hits: noise,
        seed,
        ..SyntheticScenario::default()
    };

    let generated = scenario.generate_batch(events, &topology, &calibration);
    let event_data: Vec<EventData> = generated.iter().map(|g| g.event.clone()).collect();

    let total_hits: usize = event_data.iter().map(|e| e.hits.len()).sum();
    println!(
        "generated {} event(s), {} hits total ({} tracks + {} noise hits per event)",
        events, total_hits, tracks, noise
    );

    match output {
        Some(path) => {
            fs::write(&path, serde_json::to_string_pretty(&event_data)?)?;
            println!("wrote events to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&event_data)?),
    }
    Ok(())
}
