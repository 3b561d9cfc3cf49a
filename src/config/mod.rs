//! Duel configuration.
//!
//! Every cost, reward, threshold and timing window is a field here; the
//! resolver and controllers read them, they never hard-code gameplay
//! numbers. A `DuelConfig` is built once and handed to `Duel::new`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Which defense rules are in play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleSet {
    /// Separate attack/defense directions, timed parry toggle, dodge i-frames.
    Parry,
    /// One stance for attack and defense, double-tap commit, blocks reward focus.
    Commit,
}

impl RuleSet {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleSet::Parry => "parry",
            RuleSet::Commit => "commit",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusConfig {
    pub focus_max: f32,
    /// Passive regeneration per second.
    pub regen_rate: f32,
    /// At or below this focus a combatant is executable.
    pub execution_threshold: f32,
    /// Extra regen per second while meditating (Parry rules only).
    pub meditate_bonus: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostTable {
    pub stance_change: f32,
    pub light_attack: f32,
    pub heavy_attack: f32,
    pub parry: f32,
    pub dodge: f32,
    pub surprise_attack: f32,
    /// Defender cost of a direction-match block (Parry rules).
    pub block: f32,
    /// Defender cost of resolving a parry, success or not.
    pub parry_resolve: f32,
    /// Added on top of `parry_resolve` when the parry guessed wrong.
    pub parry_fail_penalty: f32,
    /// Defender cost of a wrong guard (Commit rules).
    pub failed_defense_penalty: f32,
    /// Attacker cost when a surprise attack runs into a correct guard.
    pub surprise_attack_penalty: f32,
    /// Execution finisher cost = light_attack * this.
    pub execution_multiplier: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardTable {
    pub successful_block: f32,
    pub perfect_block: f32,
    /// Blocks against attacks above this damage count as perfect.
    pub perfect_block_damage: f32,
    /// Focus handed back to a defender after a successful parry.
    pub parry_refund: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    pub double_tap_window: f32,
    pub input_buffer_window: f32,
    pub combo_window: f32,
    pub max_combo: u32,
    /// Cost reduction per combo step.
    pub combo_discount: f32,
    /// Stance-change cost never drops below base * this.
    pub combo_cost_floor: f32,
    pub surprise_attack_window: f32,
    pub parry_window: f32,
    pub dodge_window: f32,
    pub counter_window: f32,
    /// Time a committed attack stays frozen before the stance is released.
    pub commit_hold: f32,
    pub attack_cooldown: f32,
    /// Attack cooldown used when striking out of an open counter window.
    pub counter_attack_cooldown: f32,
    /// Short lock after parry/dodge activation.
    pub action_lock: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DamageConfig {
    pub light: f32,
    pub heavy: f32,
    pub surprise_multiplier: f32,
    pub counter_multiplier: f32,
    pub execution: f32,
}

/// Complete, immutable parameter set for one duel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuelConfig {
    pub rule_set: RuleSet,
    pub focus: FocusConfig,
    pub costs: CostTable,
    pub rewards: RewardTable,
    pub timing: TimingConfig,
    pub damage: DamageConfig,
    pub seed: u64,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self::commit_mode()
    }
}

impl DuelConfig {
    /// Stance-commit rules: blocks pay out, wrong guards are expensive,
    /// regen is a trickle and low focus means execution.
    pub fn commit_mode() -> Self {
        Self {
            rule_set: RuleSet::Commit,
            focus: FocusConfig {
                focus_max: 100.0,
                regen_rate: 0.5,
                execution_threshold: 20.0,
                meditate_bonus: 0.0,
            },
            costs: CostTable {
                stance_change: 5.0,
                light_attack: 20.0,
                heavy_attack: 30.0,
                parry: 8.0,
                dodge: 10.0,
                surprise_attack: 30.0,
                block: 0.0,
                parry_resolve: 0.0,
                parry_fail_penalty: 0.0,
                failed_defense_penalty: 35.0,
                surprise_attack_penalty: 20.0,
                execution_multiplier: 1.5,
            },
            rewards: RewardTable {
                successful_block: 15.0,
                perfect_block: 25.0,
                perfect_block_damage: 25.0,
                parry_refund: 0.0,
            },
            timing: TimingConfig {
                double_tap_window: 0.5,
                input_buffer_window: 0.2,
                combo_window: 1.5,
                max_combo: 5,
                combo_discount: 0.1,
                combo_cost_floor: 0.5,
                surprise_attack_window: 0.4,
                parry_window: 0.25,
                dodge_window: 0.4,
                counter_window: 1.2,
                commit_hold: 0.2,
                attack_cooldown: 0.8,
                counter_attack_cooldown: 0.2,
                action_lock: 0.1,
            },
            damage: DamageConfig {
                light: 20.0,
                heavy: 30.0,
                surprise_multiplier: 2.0,
                counter_multiplier: 1.25,
                execution: 70.0,
            },
            seed: 42,
        }
    }

    /// Directional parry rules: separate attack and defense guards, timed
    /// parry, dodge i-frames, fast regen and meditation.
    pub fn parry_mode() -> Self {
        Self {
            rule_set: RuleSet::Parry,
            focus: FocusConfig {
                focus_max: 100.0,
                regen_rate: 10.0,
                execution_threshold: 0.0,
                meditate_bonus: 15.0,
            },
            costs: CostTable {
                stance_change: 0.0,
                light_attack: 6.0,
                heavy_attack: 12.0,
                parry: 5.0,
                dodge: 10.0,
                surprise_attack: 0.0,
                block: 5.0,
                parry_resolve: 8.0,
                parry_fail_penalty: 15.0,
                failed_defense_penalty: 0.0,
                surprise_attack_penalty: 0.0,
                execution_multiplier: 1.5,
            },
            rewards: RewardTable {
                successful_block: 0.0,
                perfect_block: 0.0,
                perfect_block_damage: 25.0,
                parry_refund: 2.5,
            },
            timing: TimingConfig {
                double_tap_window: 0.5,
                input_buffer_window: 0.2,
                combo_window: 1.5,
                max_combo: 5,
                combo_discount: 0.1,
                combo_cost_floor: 0.5,
                surprise_attack_window: 0.0,
                parry_window: 0.25,
                dodge_window: 0.3,
                counter_window: 0.8,
                commit_hold: 0.1,
                attack_cooldown: 0.4,
                counter_attack_cooldown: 0.2,
                action_lock: 0.1,
            },
            damage: DamageConfig {
                light: 12.0,
                heavy: 25.0,
                surprise_multiplier: 1.0,
                counter_multiplier: 1.25,
                execution: 70.0,
            },
            seed: 42,
        }
    }

    pub fn for_rule_set(rule_set: RuleSet) -> Self {
        match rule_set {
            RuleSet::Parry => Self::parry_mode(),
            RuleSet::Commit => Self::commit_mode(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check ranges. Called by every loader.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.focus;
        if !(f.focus_max.is_finite() && f.focus_max > 0.0) {
            return Err(ConfigError::invalid("focus.focus_max", "must be > 0"));
        }
        let threshold = f.execution_threshold;
        if !(threshold.is_finite() && threshold >= 0.0 && threshold < f.focus_max) {
            return Err(ConfigError::invalid(
                "focus.execution_threshold",
                format!("must be in [0, {})", f.focus_max),
            ));
        }
        non_negative("focus.regen_rate", f.regen_rate)?;
        non_negative("focus.meditate_bonus", f.meditate_bonus)?;

        let c = &self.costs;
        for (field, value) in [
            ("costs.stance_change", c.stance_change),
            ("costs.light_attack", c.light_attack),
            ("costs.heavy_attack", c.heavy_attack),
            ("costs.parry", c.parry),
            ("costs.dodge", c.dodge),
            ("costs.surprise_attack", c.surprise_attack),
            ("costs.block", c.block),
            ("costs.parry_resolve", c.parry_resolve),
            ("costs.parry_fail_penalty", c.parry_fail_penalty),
            ("costs.failed_defense_penalty", c.failed_defense_penalty),
            ("costs.surprise_attack_penalty", c.surprise_attack_penalty),
            ("costs.execution_multiplier", c.execution_multiplier),
        ] {
            non_negative(field, value)?;
        }

        let r = &self.rewards;
        for (field, value) in [
            ("rewards.successful_block", r.successful_block),
            ("rewards.perfect_block", r.perfect_block),
            ("rewards.perfect_block_damage", r.perfect_block_damage),
            ("rewards.parry_refund", r.parry_refund),
        ] {
            non_negative(field, value)?;
        }

        let t = &self.timing;
        for (field, value) in [
            ("timing.double_tap_window", t.double_tap_window),
            ("timing.input_buffer_window", t.input_buffer_window),
            ("timing.combo_window", t.combo_window),
            ("timing.combo_discount", t.combo_discount),
            ("timing.surprise_attack_window", t.surprise_attack_window),
            ("timing.parry_window", t.parry_window),
            ("timing.dodge_window", t.dodge_window),
            ("timing.counter_window", t.counter_window),
            ("timing.commit_hold", t.commit_hold),
            ("timing.attack_cooldown", t.attack_cooldown),
            ("timing.counter_attack_cooldown", t.counter_attack_cooldown),
            ("timing.action_lock", t.action_lock),
        ] {
            non_negative(field, value)?;
        }
        if !(t.combo_cost_floor > 0.0 && t.combo_cost_floor <= 1.0) {
            return Err(ConfigError::invalid(
                "timing.combo_cost_floor",
                "must be in (0, 1]",
            ));
        }

        let d = &self.damage;
        for (field, value) in [
            ("damage.light", d.light),
            ("damage.heavy", d.heavy),
            ("damage.surprise_multiplier", d.surprise_multiplier),
            ("damage.counter_multiplier", d.counter_multiplier),
            ("damage.execution", d.execution),
        ] {
            non_negative(field, value)?;
        }
        Ok(())
    }

    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: DuelConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: DuelConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a `.ron` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_by_extension(path.as_ref(), Self::from_ron_str, Self::from_json_str)
    }

    pub fn to_ron(&self) -> String {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).unwrap_or_default()
    }
}

pub(crate) fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be >= 0, got {value}")))
    }
}

pub(crate) fn load_by_extension<T>(
    path: &Path,
    from_ron: fn(&str) -> Result<T, ConfigError>,
    from_json: fn(&str) -> Result<T, ConfigError>,
) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => from_ron(&text),
        Some("json") => from_json(&text),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}
