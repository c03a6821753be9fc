use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use flate2::read::GzDecoder;
use obstacle_kf::filters::RecordingObserver;
use obstacle_kf::types::Measurement;
use obstacle_kf::{
    FollowTrackObstacleKf, FollowTrackParams, Lane, ObstacleFilter, SteadyObstacleKf, SteadyParams,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Model {
    Steady,
    FollowTrack,
}

#[derive(Parser, Debug)]
#[command(name = "obstacle_replay")]
#[command(about = "Replay recorded obstacle fixes through a Kalman filter", long_about = None)]
struct Args {
    /// Path to scenario_*.json[.gz]
    #[arg(long, conflicts_with = "scenario_dir")]
    scenario: Option<PathBuf>,

    /// Directory of scenarios to batch replay (processes scenario_*.json[.gz])
    #[arg(long)]
    scenario_dir: Option<PathBuf>,

    /// Motion model
    #[arg(long, value_enum, default_value = "follow-track")]
    model: Model,

    /// Include per-correction gain and residual in the output
    #[arg(long, default_value_t = false)]
    diagnostics: bool,
}

/// Recorded obstacle fixes; `null` entries are ticks without a detection
#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default = "default_delta_t")]
    delta_t: f64,
    #[serde(default)]
    lane: Vec<[f64; 2]>,
    measurements: Vec<Option<[f64; 2]>>,
    #[serde(default)]
    steady: SteadyParams,
    #[serde(default)]
    follow_track: FollowTrackParams,
}

fn default_delta_t() -> f64 {
    1.0
}

fn parse_scenario<R: Read>(reader: R) -> anyhow::Result<Scenario> {
    Ok(serde_json::from_reader(reader)?)
}

fn load_scenario(path: &Path) -> anyhow::Result<Scenario> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        parse_scenario(BufReader::new(GzDecoder::new(file)))
    } else {
        parse_scenario(BufReader::new(file))
    }
}

fn build_filter(
    scenario: &Scenario,
    model: Model,
    recorder: &RecordingObserver,
) -> anyhow::Result<Box<dyn ObstacleFilter>> {
    match model {
        Model::Steady => {
            let mut kf = SteadyObstacleKf::with_params(scenario.steady)?;
            kf.set_observer(Box::new(recorder.clone()));
            Ok(Box::new(kf))
        }
        Model::FollowTrack => {
            let lane = Arc::new(Lane::new(scenario.lane.iter().copied())?);
            let mut kf =
                FollowTrackObstacleKf::with_params(scenario.delta_t, lane, scenario.follow_track)?;
            kf.set_observer(Box::new(recorder.clone()));
            Ok(Box::new(kf))
        }
    }
}

fn run_once(path: &Path, args: &Args) -> anyhow::Result<serde_json::Value> {
    let scenario = load_scenario(path)?;
    let recorder = RecordingObserver::new();
    let mut kf = build_filter(&scenario, args.model, &recorder)?;

    let mut ticks = Vec::with_capacity(scenario.measurements.len());
    let mut coasted = 0u64;
    for (tick, fix) in scenario.measurements.iter().enumerate() {
        let z = fix.map(|[x, y]| Measurement::new(x, y));
        if z.is_none() {
            coasted += 1;
        }
        kf.filter(z)
            .with_context(|| format!("{}: tick {}", path.display(), tick))?;

        let mut entry = json!({
            "tick": tick,
            "measurement": fix,
            "state": kf.snapshot(),
        });
        if args.diagnostics {
            entry["corrections"] = serde_json::to_value(recorder.drain())?;
        } else {
            recorder.drain();
        }
        ticks.push(entry);
    }

    let final_state = kf.snapshot();
    log::info!(
        "{}: {} ticks ({} coasted), final position ({:.3}, {:.3})",
        path.display(),
        ticks.len(),
        coasted,
        final_state.position.0,
        final_state.position.1
    );

    Ok(json!({
        "scenario": path.display().to_string(),
        "model": format!("{:?}", args.model),
        "coasted_ticks": coasted,
        "final": final_state,
        "ticks": ticks,
    }))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut results = Vec::new();

    if let Some(dir) = args.scenario_dir.as_ref() {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if !(name.starts_with("scenario_")
                && (name.ends_with(".json") || name.ends_with(".json.gz")))
            {
                continue;
            }
            match run_once(&path, &args) {
                Ok(res) => results.push(res),
                Err(e) => log::error!("Failed {}: {:#}", path.display(), e),
            }
        }
    } else if let Some(scenario) = args.scenario.as_ref() {
        results.push(run_once(scenario, &args)?);
    } else {
        anyhow::bail!("Provide --scenario or --scenario-dir");
    }

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
