//! AI personality: timing, aggression, read skill and strategy weights.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{load_by_extension, non_negative};
use crate::error::ConfigError;

use super::strategy::{AttackStrategy, DefenseStrategy, StrategyTable};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiProfile {
    pub name: String,

    /// Seconds before the first decision.
    pub initial_delay: f32,
    pub think_interval_min: f32,
    pub think_interval_max: f32,
    /// Extra pause added to the think timer after choosing to wait.
    pub idle_wait: f32,

    pub base_aggression: f32,
    /// Heavy attack if roll < aggression * this (Parry rules).
    pub heavy_share: f32,
    /// Light attack if roll < aggression * this (Parry rules).
    pub light_share: f32,
    /// Parry if roll < this when not attacking (Parry rules).
    pub defend_chance: f32,
    /// Chance an attack becomes a feint sequence (Commit rules).
    pub feint_chance: f32,
    /// Chance of a random aggression boost each decision.
    pub counter_attack_chance: f32,
    pub counter_boost: f32,

    /// Focus fraction below which a fighter counts as low.
    pub low_focus_fraction: f32,
    pub opponent_low_bonus: f32,
    pub self_low_penalty: f32,
    /// Opponent stance changes above this count raise aggression.
    pub stance_change_threshold: u32,
    pub stance_change_bonus: f32,
    /// Consecutive hits or misses needed before the streak adjustment applies.
    pub streak_threshold: u32,
    pub streak_adjust: f32,

    /// Permanent aggression shifts from defending.
    pub parry_success_boost: f32,
    pub block_boost: f32,
    pub parry_failed_penalty: f32,
    pub hit_taken_penalty: f32,

    pub attack_strategies: StrategyTable<AttackStrategy>,
    pub defense_strategies: StrategyTable<DefenseStrategy>,
    /// Most-frequent prediction needs more than this many samples.
    pub prediction_min_samples: u32,

    pub pattern_sample_interval: f32,
    pub focus_lerp: f32,

    /// Parry rules: per-second rate of re-guarding on the predicted direction.
    pub defense_predict_rate: f32,
    /// Parry rules: per-second rate of a random guard switch.
    pub defense_random_rate: f32,

    /// Delay between choosing a stance and committing (Commit rules).
    pub strike_delay: f32,
    pub feint_step_delay: f32,
    pub feint_commit_delay: f32,
    pub feint_changes: u32,
    /// Delay before the counter strike after a successful parry.
    pub counter_delay: f32,
    /// Parry rules: announce attacks this long before they land. 0 disables.
    pub telegraph_duration: f32,
}

impl Default for AiProfile {
    fn default() -> Self {
        Self::stance_duelist()
    }
}

impl AiProfile {
    /// Pattern-reading stance fighter: reads defensive habits, feints,
    /// presses hard when the opponent runs low.
    pub fn stance_duelist() -> Self {
        Self {
            name: "stance_duelist".to_string(),
            initial_delay: 2.0,
            think_interval_min: 1.0,
            think_interval_max: 3.0,
            idle_wait: 0.2,
            base_aggression: 0.5,
            heavy_share: 0.25,
            light_share: 0.6,
            defend_chance: 0.25,
            feint_chance: 0.4,
            counter_attack_chance: 0.6,
            counter_boost: 0.15,
            low_focus_fraction: 0.4,
            opponent_low_bonus: 0.4,
            self_low_penalty: 0.3,
            stance_change_threshold: 5,
            stance_change_bonus: 0.2,
            streak_threshold: 2,
            streak_adjust: 0.2,
            parry_success_boost: 0.15,
            block_boost: 0.05,
            parry_failed_penalty: 0.1,
            hit_taken_penalty: 0.05,
            attack_strategies: StrategyTable::new(vec![
                (AttackStrategy::LeastDefended, 0.7),
                (AttackStrategy::OppositeStance, 0.2),
            ]),
            defense_strategies: StrategyTable::new(vec![
                (DefenseStrategy::Predict, 0.7),
                (DefenseStrategy::Mirror, 0.3),
            ]),
            prediction_min_samples: 3,
            pattern_sample_interval: 0.5,
            focus_lerp: 0.1,
            defense_predict_rate: 0.0,
            defense_random_rate: 0.0,
            strike_delay: 0.3,
            feint_step_delay: 0.15,
            feint_commit_delay: 0.2,
            feint_changes: 2,
            counter_delay: 0.2,
            telegraph_duration: 0.0,
        }
    }

    /// Slower, readable fighter for Parry rules: announces every attack,
    /// parries on prediction and counters after a successful parry.
    pub fn telegraphing_duelist() -> Self {
        Self {
            name: "telegraphing_duelist".to_string(),
            initial_delay: 2.0,
            think_interval_min: 2.5,
            think_interval_max: 4.5,
            idle_wait: 0.8,
            base_aggression: 0.4,
            heavy_share: 0.25,
            light_share: 0.6,
            defend_chance: 0.25,
            feint_chance: 0.0,
            counter_attack_chance: 0.0,
            counter_boost: 0.0,
            low_focus_fraction: 0.4,
            opponent_low_bonus: 0.0,
            self_low_penalty: 0.0,
            stance_change_threshold: 5,
            stance_change_bonus: 0.0,
            streak_threshold: 2,
            streak_adjust: 0.2,
            parry_success_boost: 0.15,
            block_boost: 0.0,
            parry_failed_penalty: 0.1,
            hit_taken_penalty: 0.0,
            attack_strategies: StrategyTable::new(vec![
                (AttackStrategy::OppositeStance, 0.35),
                (AttackStrategy::LeastDefended, 0.25),
                (AttackStrategy::Feint, 0.2),
            ]),
            defense_strategies: StrategyTable::new(vec![(DefenseStrategy::Predict, 0.35)]),
            prediction_min_samples: 3,
            pattern_sample_interval: 0.5,
            focus_lerp: 0.1,
            defense_predict_rate: 3.0,
            defense_random_rate: 0.5,
            strike_delay: 0.3,
            feint_step_delay: 0.15,
            feint_commit_delay: 0.2,
            feint_changes: 2,
            counter_delay: 0.2,
            telegraph_duration: 1.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.think_interval_min > 0.0 && self.think_interval_min <= self.think_interval_max) {
            return Err(ConfigError::invalid(
                "ai.think_interval",
                format!(
                    "need 0 < min <= max, got [{}, {}]",
                    self.think_interval_min, self.think_interval_max
                ),
            ));
        }
        for (field, value) in [
            ("ai.base_aggression", self.base_aggression),
            ("ai.heavy_share", self.heavy_share),
            ("ai.light_share", self.light_share),
            ("ai.defend_chance", self.defend_chance),
            ("ai.feint_chance", self.feint_chance),
            ("ai.counter_attack_chance", self.counter_attack_chance),
            ("ai.low_focus_fraction", self.low_focus_fraction),
            ("ai.focus_lerp", self.focus_lerp),
        ] {
            unit_interval(field, value)?;
        }
        for (field, value) in [
            ("ai.initial_delay", self.initial_delay),
            ("ai.idle_wait", self.idle_wait),
            ("ai.counter_boost", self.counter_boost),
            ("ai.opponent_low_bonus", self.opponent_low_bonus),
            ("ai.self_low_penalty", self.self_low_penalty),
            ("ai.stance_change_bonus", self.stance_change_bonus),
            ("ai.streak_adjust", self.streak_adjust),
            ("ai.parry_success_boost", self.parry_success_boost),
            ("ai.block_boost", self.block_boost),
            ("ai.parry_failed_penalty", self.parry_failed_penalty),
            ("ai.hit_taken_penalty", self.hit_taken_penalty),
            ("ai.defense_predict_rate", self.defense_predict_rate),
            ("ai.defense_random_rate", self.defense_random_rate),
            ("ai.strike_delay", self.strike_delay),
            ("ai.feint_step_delay", self.feint_step_delay),
            ("ai.feint_commit_delay", self.feint_commit_delay),
            ("ai.counter_delay", self.counter_delay),
            ("ai.telegraph_duration", self.telegraph_duration),
        ] {
            non_negative(field, value)?;
        }
        if !(self.pattern_sample_interval > 0.0) {
            return Err(ConfigError::invalid("ai.pattern_sample_interval", "must be > 0"));
        }
        self.attack_strategies.validate("ai.attack_strategies")?;
        self.defense_strategies.validate("ai.defense_strategies")?;
        Ok(())
    }

    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let profile: AiProfile = ron::from_str(text)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let profile: AiProfile = serde_json::from_str(text)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_by_extension(path.as_ref(), Self::from_ron_str, Self::from_json_str)
    }
}

fn unit_interval(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be in [0, 1], got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        AiProfile::stance_duelist().validate().unwrap();
        AiProfile::telegraphing_duelist().validate().unwrap();
    }

    #[test]
    fn test_inverted_think_interval_rejected() {
        let mut p = AiProfile::stance_duelist();
        p.think_interval_min = 5.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_overweight_table_rejected() {
        let mut p = AiProfile::stance_duelist();
        p.attack_strategies = StrategyTable::new(vec![
            (AttackStrategy::Random, 0.8),
            (AttackStrategy::Feint, 0.8),
        ]);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let p = AiProfile::telegraphing_duelist();
        let json = serde_json::to_string(&p).unwrap();
        let back = AiProfile::from_json_str(&json).unwrap();
        assert_eq!(back.name, "telegraphing_duelist");
        assert_eq!(back.telegraph_duration, 1.0);
    }
}
