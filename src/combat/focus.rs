//! Focus economy: the single resource behind every action.
//!
//! - Use/Gain clamp to [0, focus_max]; bad amounts (negative, NaN) are no-ops
//! - Executable = focus <= execution_threshold, reported once per crossing
//! - Passive regen stops entirely while executable, and while meditating

use crate::config::{FocusConfig, RuleSet};

use super::state::CombatantState;

#[derive(Debug, Clone)]
pub struct FocusEconomy {
    config: FocusConfig,
    rule_set: RuleSet,
}

impl FocusEconomy {
    pub fn new(config: FocusConfig, rule_set: RuleSet) -> Self {
        Self { config, rule_set }
    }

    pub fn config(&self) -> &FocusConfig {
        &self.config
    }

    /// Spend up to `amount`. Returns what was actually removed.
    pub fn use_focus(&self, state: &mut CombatantState, amount: f32) -> f32 {
        if !(amount.is_finite() && amount > 0.0) {
            return 0.0;
        }
        let before = state.focus;
        state.focus = (state.focus - amount).clamp(0.0, state.focus_max);
        before - state.focus
    }

    /// Add up to `amount`. Returns what was actually added.
    pub fn gain_focus(&self, state: &mut CombatantState, amount: f32) -> f32 {
        if !(amount.is_finite() && amount > 0.0) {
            return 0.0;
        }
        let before = state.focus;
        state.focus = (state.focus + amount).clamp(0.0, state.focus_max);
        state.focus - before
    }

    /// Positive deltas gain, negative deltas spend.
    pub fn apply_delta(&self, state: &mut CombatantState, delta: f32) -> f32 {
        if delta >= 0.0 {
            self.gain_focus(state, delta)
        } else {
            -self.use_focus(state, -delta)
        }
    }

    pub fn can_afford(&self, state: &CombatantState, cost: f32) -> bool {
        state.focus >= cost
    }

    /// Refresh the executable flag. True only on the rising edge.
    pub fn check_executable(&self, state: &mut CombatantState) -> bool {
        let was = state.is_executable;
        state.is_executable = state.focus <= self.config.execution_threshold;
        state.is_executable && !was
    }

    /// Passive regen for one tick. Returns focus gained.
    pub fn regen(&self, state: &mut CombatantState, dt: f32) -> f32 {
        if state.is_executable {
            return 0.0;
        }
        if self.rule_set == RuleSet::Parry && state.is_meditating() {
            return 0.0;
        }
        self.gain_focus(state, self.config.regen_rate * dt)
    }

    /// Meditation regen for one tick (Parry rules). Nothing while executable.
    pub fn meditate(&self, state: &mut CombatantState, dt: f32) -> f32 {
        if state.is_executable || self.rule_set != RuleSet::Parry {
            return 0.0;
        }
        self.gain_focus(
            state,
            (self.config.regen_rate + self.config.meditate_bonus) * dt,
        )
    }

    /// Full focus and a cleared flag, for a new encounter.
    pub fn restore(&self, state: &mut CombatantState) {
        state.focus = state.focus_max;
        state.is_executable = false;
    }
}
