//! SPACE 404 XY headless runner
//!
//! Plays one level with the autopilot for a fixed number of frames and
//! prints a JSON snapshot. Useful for balancing and for checking that a
//! tuning file behaves before it ships.

use std::path::PathBuf;

use clap::Parser;
use glam::UVec2;

use space404::assets::Loader;
use space404::audio::AudioManager;
use space404::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};
use space404::renderer::DrawList;
use space404::scene::Transition;
use space404::sim::{LevelId, LevelSim, LevelSnapshot};
use space404::{Difficulty, Result, Settings, Tuning};

#[derive(Parser, Debug)]
#[command(name = "space404")]
#[command(about = "Run a SPACE 404 XY level headless and report the outcome")]
struct Cli {
    /// Level number (1-3)
    #[arg(long, default_value_t = 1)]
    level: u8,
    /// Difficulty tier: facil, medio or dificil
    #[arg(long, default_value = "medio")]
    difficulty: String,
    /// Rendered frames to run
    #[arg(long, default_value_t = 3600)]
    frames: u32,
    /// Seconds per rendered frame; clamped to 0.1
    #[arg(long, default_value_t = 1.0 / 60.0)]
    frame_dt: f32,
    #[arg(long, default_value_t = 404)]
    seed: u64,
    /// Tuning JSON overriding the built-in balance
    #[arg(long)]
    tuning: Option<PathBuf>,
    /// Use manual AABB collision instead of the physics world
    #[arg(long)]
    no_physics: bool,
    /// Keep running after game over or level complete
    #[arg(long)]
    keep_going: bool,
    /// Report how many draw commands the final frame produced
    #[arg(long)]
    draw: bool,
}

#[derive(serde::Serialize)]
struct Report {
    frames: u32,
    transitions: Vec<Transition>,
    snapshot: LevelSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    draw_commands: Option<usize>,
}

fn main() {
    env_logger::init();
    if let Err(e) = run(Cli::parse()) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let level = LevelId::try_from(cli.level)?;
    let mut tuning = match &cli.tuning {
        Some(path) => Tuning::from_json(&std::fs::read_to_string(path)?)?,
        None => Tuning::default(),
    };
    if cli.no_physics {
        tuning.physics.enabled = false;
    }

    let settings = Settings {
        difficulty: Difficulty::from_str_or_default(&cli.difficulty),
        ..Settings::default()
    };
    log::info!("SPACE 404 XY (headless) starting {level} on `{}`", cli.difficulty);

    let mut assets = Loader::with_fallback_size(UVec2::new(64, 64));
    let mut audio = AudioManager::default();
    audio.apply_settings(&settings);

    let mut sim = LevelSim::new(level, tuning, cli.seed);
    let ticket = sim.enter(&settings);
    sim.load_assets_blocking(ticket, &mut assets);

    let mut transitions = Vec::new();
    let mut accumulator = 0.0;
    let mut frames = 0;
    let frame_dt = cli.frame_dt.clamp(0.0, MAX_FRAME_DT);

    while frames < cli.frames {
        frames += 1;
        accumulator += frame_dt;

        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            sim.set_keys(sim.autopilot());
            sim.update(SIM_DT, &mut transitions, &mut audio);
            accumulator -= SIM_DT;
            substeps += 1;
        }

        let finished = transitions
            .iter()
            .any(|t| matches!(t, Transition::GameOver { .. } | Transition::LevelComplete { .. }));
        if finished && !cli.keep_going {
            break;
        }
    }

    let draw_commands = cli.draw.then(|| {
        let mut list = DrawList::new();
        sim.render(&mut list, &assets, f64::from(frames) * f64::from(frame_dt) * 1000.0);
        list.len()
    });

    sim.exit();
    let report = Report {
        frames,
        transitions,
        snapshot: sim.snapshot(),
        draw_commands,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
