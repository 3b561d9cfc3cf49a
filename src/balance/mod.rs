//! Monte-Carlo balance runs.
//!
//! Plays many seeded AI-vs-AI duels in parallel with rayon and summarises
//! who wins, how long it takes and how exchanges resolve. A healthy rule
//! set lets two equal profiles win about equally often.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use tracing::info;

use crate::ai::AiProfile;
use crate::combat::{CombatResult, CombatantId};
use crate::config::DuelConfig;
use crate::duel::{Duel, DuelEvent, HealthLedger};
use crate::logging::TimingSpan;

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub duel_count: u64,
    pub base_seed: u64,
    pub config: DuelConfig,
    pub player: AiProfile,
    pub opponent: AiProfile,
    pub max_health: f32,
    pub tick_dt: f32,
    /// Duels still running after this many ticks count as draws.
    pub max_ticks: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            duel_count: 200,
            base_seed: 42,
            config: DuelConfig::parry_mode(),
            player: AiProfile::stance_duelist(),
            opponent: AiProfile::stance_duelist(),
            max_health: 100.0,
            tick_dt: 1.0 / 60.0,
            max_ticks: 60 * 180,
        }
    }
}

/// How one simulated duel went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuelOutcome {
    pub seed: u64,
    pub winner: Option<CombatantId>,
    pub ticks: u64,
    pub duration_secs: f32,
    /// Counts in `CombatResult::ALL` order.
    pub results: [u32; 6],
    pub executions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceReport {
    pub total_duels: u64,
    pub player_wins: u64,
    pub opponent_wins: u64,
    pub draws: u64,
    /// Share of decided duels the player side won.
    pub player_win_rate: f32,
    pub avg_duration_secs: f32,
    pub result_counts: Vec<(String, u64)>,
    pub executions: u64,
    pub balance_grade: BalanceGrade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceGrade {
    Excellent, // win rate within 5 points of even
    Good,      // within 10
    Fair,      // within 20
    Poor,      // within 30
    Critical,
}

impl BalanceGrade {
    pub fn from_win_rate(win_rate: f32) -> Self {
        let skew = (win_rate - 0.5).abs();
        if skew < 0.05 {
            BalanceGrade::Excellent
        } else if skew < 0.1 {
            BalanceGrade::Good
        } else if skew < 0.2 {
            BalanceGrade::Fair
        } else if skew < 0.3 {
            BalanceGrade::Poor
        } else {
            BalanceGrade::Critical
        }
    }
}

fn duel_seed(base_seed: u64, index: u64) -> u64 {
    let mut hasher = Sha3_256::new();
    hasher.update(base_seed.to_le_bytes());
    hasher.update(index.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Play a single AI-vs-AI duel to the end or the tick limit.
pub fn simulate_duel(sim: &SimConfig, seed: u64) -> DuelOutcome {
    let config = sim.config.clone().with_seed(seed);
    let mut duel = Duel::new(config, HealthLedger::new(sim.max_health))
        .with_ai(CombatantId::Player, sim.player.clone())
        .with_ai(CombatantId::Opponent, sim.opponent.clone());

    let mut results = [0u32; 6];
    let mut executions = 0;
    while !duel.is_over() && duel.ticks() < sim.max_ticks {
        let report = duel.tick(sim.tick_dt);
        for event in &report.events {
            match event {
                DuelEvent::Resolved { result, .. } => {
                    if let Some(i) = CombatResult::ALL.iter().position(|r| r == result) {
                        results[i] += 1;
                    }
                }
                DuelEvent::AttackCommitted {
                    execution: true, ..
                } => executions += 1,
                _ => {}
            }
        }
    }

    DuelOutcome {
        seed,
        winner: duel.winner(),
        ticks: duel.ticks(),
        duration_secs: duel.elapsed(),
        results,
        executions,
    }
}

pub fn run_balance_simulation(sim: &SimConfig) -> BalanceReport {
    let _span = TimingSpan::new("balance_simulation");
    let seeds: Vec<u64> = (0..sim.duel_count)
        .map(|i| duel_seed(sim.base_seed, i))
        .collect();

    let outcomes: Vec<DuelOutcome> = seeds
        .par_iter()
        .map(|seed| simulate_duel(sim, *seed))
        .collect();

    let report = analyze_outcomes(&outcomes);
    info!(
        duels = report.total_duels,
        player_win_rate = report.player_win_rate,
        grade = ?report.balance_grade,
        "Balance run finished"
    );
    report
}

pub fn analyze_outcomes(outcomes: &[DuelOutcome]) -> BalanceReport {
    let count_wins = |side: CombatantId| {
        outcomes
            .iter()
            .filter(|o| o.winner == Some(side))
            .count() as u64
    };
    let player_wins = count_wins(CombatantId::Player);
    let opponent_wins = count_wins(CombatantId::Opponent);
    let total = outcomes.len() as u64;
    let decided = player_wins + opponent_wins;

    let player_win_rate = if decided == 0 {
        0.5
    } else {
        player_wins as f32 / decided as f32
    };
    let avg_duration_secs = if outcomes.is_empty() {
        0.0
    } else {
        outcomes.iter().map(|o| o.duration_secs).sum::<f32>() / outcomes.len() as f32
    };

    let result_counts = CombatResult::ALL
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let n = outcomes.iter().map(|o| o.results[i] as u64).sum();
            (result.as_str().to_string(), n)
        })
        .collect();

    BalanceReport {
        total_duels: total,
        player_wins,
        opponent_wins,
        draws: total - decided,
        player_win_rate,
        avg_duration_secs,
        result_counts,
        executions: outcomes.iter().map(|o| o.executions as u64).sum(),
        balance_grade: BalanceGrade::from_win_rate(player_win_rate),
    }
}
