//! Headless duel runner.
//!
//! `simulate` plays one AI-vs-AI duel through the Bevy plugin and prints a
//! JSON summary. `balance` runs many seeded duels in parallel and prints
//! the balance report.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use duel_core::ai::AiProfile;
use duel_core::balance::{run_balance_simulation, SimConfig};
use duel_core::combat::{CombatantId, RuleSet};
use duel_core::config::DuelConfig;
use duel_core::logging::{init_tracing, LogLevel, TracingConfig};
use duel_core::plugin::{DuelEventMessage, DuelPlugin, DuelResource};
use duel_core::DuelEvent;

#[derive(Parser, Debug)]
#[command(name = "duel_core")]
#[command(about = "Headless directional duel simulation")]
struct Cli {
    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play one AI-vs-AI duel and print a JSON summary
    Simulate {
        #[arg(long, value_enum, default_value_t = Mode::Parry)]
        mode: Mode,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Duel config (.ron or .json); overrides --mode
        #[arg(long)]
        config: Option<PathBuf>,

        /// AI profile for the player side (.ron or .json)
        #[arg(long)]
        player_ai: Option<PathBuf>,

        /// AI profile for the opponent side (.ron or .json)
        #[arg(long)]
        opponent_ai: Option<PathBuf>,

        /// Give up after this many seconds of duel time
        #[arg(long, default_value_t = 180.0)]
        max_secs: f32,
    },
    /// Run many seeded AI-vs-AI duels and print the balance report
    Balance {
        #[arg(long, value_enum, default_value_t = Mode::Parry)]
        mode: Mode,

        #[arg(long, default_value_t = 200)]
        duels: u64,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Commit,
    Parry,
}

impl From<Mode> for RuleSet {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Commit => RuleSet::Commit,
            Mode::Parry => RuleSet::Parry,
        }
    }
}

#[derive(Serialize)]
struct SimulationSummary {
    rule_set: &'static str,
    seed: u64,
    winner: Option<CombatantId>,
    ticks: u64,
    duration_secs: f32,
    player_focus: f32,
    opponent_focus: f32,
    player_health: f32,
    opponent_health: f32,
    events: usize,
    resolutions: usize,
}

#[derive(Resource, Default)]
struct EventCounter {
    events: usize,
    resolutions: usize,
}

fn count_events(mut messages: EventReader<DuelEventMessage>, mut counter: ResMut<EventCounter>) {
    for message in messages.read() {
        counter.events += 1;
        if matches!(message.0, DuelEvent::Resolved { .. }) {
            counter.resolutions += 1;
        }
    }
}

fn load_profile(path: Option<PathBuf>, fallback: AiProfile) -> Result<AiProfile> {
    match path {
        Some(path) => AiProfile::load(&path)
            .with_context(|| format!("loading AI profile {}", path.display())),
        None => Ok(fallback),
    }
}

fn simulate(
    mode: Mode,
    seed: u64,
    config: Option<PathBuf>,
    player_ai: Option<PathBuf>,
    opponent_ai: Option<PathBuf>,
    max_secs: f32,
) -> Result<()> {
    let config = match config {
        Some(path) => DuelConfig::load(&path)
            .with_context(|| format!("loading duel config {}", path.display()))?,
        None => DuelConfig::for_rule_set(mode.into()),
    }
    .with_seed(seed);
    let player = load_profile(player_ai, AiProfile::stance_duelist())?;
    let opponent = load_profile(opponent_ai, AiProfile::telegraphing_duelist())?;

    let dt = 1.0 / 60.0;
    let max_updates = (max_secs / dt).ceil() as u64;
    let rule_set = config.rule_set;

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f32(dt)))
        .init_resource::<EventCounter>()
        .add_plugins(
            DuelPlugin::new(config)
                .with_ai(CombatantId::Player, player)
                .with_ai(CombatantId::Opponent, opponent),
        )
        .add_systems(PostUpdate, count_events);

    let duel = app.world().resource::<DuelResource>().0.clone();
    for _ in 0..max_updates {
        app.update();
        let over = duel.read().map(|d| d.is_over()).unwrap_or(true);
        if over {
            break;
        }
    }

    let counter = app.world().resource::<EventCounter>();
    let duel = duel
        .read()
        .map_err(|_| anyhow::anyhow!("duel state poisoned"))?;
    let summary = SimulationSummary {
        rule_set: rule_set.as_str(),
        seed,
        winner: duel.winner(),
        ticks: duel.ticks(),
        duration_secs: duel.elapsed(),
        player_focus: duel.state(CombatantId::Player).focus(),
        opponent_focus: duel.state(CombatantId::Opponent).focus(),
        player_health: duel.damage().health(CombatantId::Player),
        opponent_health: duel.damage().health(CombatantId::Opponent),
        events: counter.events,
        resolutions: counter.resolutions,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn balance(mode: Mode, duels: u64, seed: u64) -> Result<()> {
    let sim = SimConfig {
        duel_count: duels,
        base_seed: seed,
        config: DuelConfig::for_rule_set(mode.into()),
        ..Default::default()
    };
    let report = run_balance_simulation(&sim);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&TracingConfig::default().with_default_level(LogLevel::from_verbosity(cli.verbose)));

    match cli.command {
        Command::Simulate {
            mode,
            seed,
            config,
            player_ai,
            opponent_ai,
            max_secs,
        } => simulate(mode, seed, config, player_ai, opponent_ai, max_secs),
        Command::Balance { mode, duels, seed } => balance(mode, duels, seed),
    }
}
