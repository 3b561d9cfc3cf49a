//! Weighted direction strategies.
//!
//! A table is a list of (strategy, weight) pairs walked in order against a
//! single roll in [0, 1). Weight left over past the last entry falls
//! through to `Random`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::combat::{CombatantState, Direction};
use crate::error::ConfigError;

use super::patterns::PatternTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackStrategy {
    /// Where the opponent has guarded least often.
    LeastDefended,
    /// Opposite of the opponent's current guard.
    OppositeStance,
    /// Heavy attacks only: straight into the current guard, punishing
    /// players who read the opposite. Light attacks fall through to random.
    Feint,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefenseStrategy {
    /// Guard the direction we expect to be attacked from.
    Predict,
    /// Copy the opponent's current stance.
    Mirror,
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyTable<S> {
    pub entries: Vec<(S, f32)>,
}

impl<S: Copy> StrategyTable<S> {
    pub fn new(entries: Vec<(S, f32)>) -> Self {
        Self { entries }
    }

    /// First entry whose cumulative weight exceeds `roll`.
    pub fn pick(&self, roll: f32) -> Option<S> {
        let mut cumulative = 0.0f32;
        for (strategy, weight) in &self.entries {
            cumulative += *weight;
            if roll < cumulative {
                return Some(*strategy);
            }
        }
        None
    }

    pub fn total_weight(&self) -> f32 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    pub(crate) fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if self.entries.iter().any(|(_, w)| !(w.is_finite() && *w >= 0.0)) {
            return Err(ConfigError::invalid(field, "weights must be >= 0"));
        }
        let total = self.total_weight();
        if total > 1.0 + 1e-4 {
            return Err(ConfigError::invalid(
                field,
                format!("weights sum to {total}, must be <= 1"),
            ));
        }
        Ok(())
    }
}

/// Pick an attack strategy for this roll.
pub fn pick_attack(table: &StrategyTable<AttackStrategy>, roll: f32, heavy: bool) -> AttackStrategy {
    match table.pick(roll) {
        Some(AttackStrategy::Feint) if !heavy => AttackStrategy::Random,
        Some(strategy) => strategy,
        None => AttackStrategy::Random,
    }
}

pub fn pick_defense(table: &StrategyTable<DefenseStrategy>, roll: f32) -> DefenseStrategy {
    table.pick(roll).unwrap_or(DefenseStrategy::Random)
}

/// Resolve an attack strategy to a direction. Without an opponent every
/// strategy degrades to random.
pub fn attack_direction<R: Rng + ?Sized>(
    strategy: AttackStrategy,
    opponent: Option<&CombatantState>,
    patterns: &PatternTracker,
    rng: &mut R,
) -> Direction {
    let Some(opponent) = opponent else {
        return Direction::random(rng);
    };
    match strategy {
        AttackStrategy::LeastDefended => patterns.least_defended(),
        AttackStrategy::OppositeStance => {
            let guard = opponent.defense_direction();
            if guard.is_none() {
                Direction::random(rng)
            } else {
                guard.opposite()
            }
        }
        AttackStrategy::Feint => {
            let guard = opponent.defense_direction();
            if guard.is_none() {
                Direction::random(rng)
            } else {
                guard
            }
        }
        AttackStrategy::Random => Direction::random(rng),
    }
}

/// Resolve a defense strategy to a direction.
pub fn defense_direction<R: Rng + ?Sized>(
    strategy: DefenseStrategy,
    me: &CombatantState,
    opponent: Option<&CombatantState>,
    min_samples: u32,
    rng: &mut R,
) -> Direction {
    let Some(opponent) = opponent else {
        return Direction::random(rng);
    };
    match strategy {
        DefenseStrategy::Predict => predict_incoming(me, min_samples, rng),
        DefenseStrategy::Mirror => {
            let stance = opponent.defense_direction();
            if stance.is_none() {
                Direction::random(rng)
            } else {
                stance
            }
        }
        DefenseStrategy::Random => Direction::random(rng),
    }
}

/// Most frequent incoming direction once it has been seen more than
/// `min_samples` times, otherwise the last one seen.
pub fn predict_incoming<R: Rng + ?Sized>(
    me: &CombatantState,
    min_samples: u32,
    rng: &mut R,
) -> Direction {
    let favourite = me.direction_histogram.most_frequent();
    if me.direction_histogram.count(favourite) > min_samples {
        return favourite;
    }
    if me.last_incoming.is_none() {
        Direction::random(rng)
    } else {
        me.last_incoming
    }
}
