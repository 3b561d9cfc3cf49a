//! Attack resolution.
//!
//! `DirectionResolver::resolve` is pure: it reads the intent and the
//! defender's state and returns what should happen. Applying the focus
//! delta, opening windows and routing damage is the orchestrator's job.
//!
//! Precedence, first match wins:
//! 1. no target / no direction -> Missed
//! 2. defender executable      -> Hit, no focus change
//! 3. defender dodging         -> Dodged
//! 4. Parry rules: active parry -> ParrySuccess (guard differs) / ParryFailed (guard matches)
//! 5. guard matches attack     -> Blocked
//! 6. otherwise                -> Hit

use serde::{Deserialize, Serialize};

use crate::config::{CostTable, DuelConfig, RewardTable, RuleSet};

use super::direction::Direction;
use super::state::{CombatantId, CombatantState};

/// One attack attempt, consumed once by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackIntent {
    pub attacker: CombatantId,
    pub direction: Direction,
    pub is_heavy: bool,
    pub damage: f32,
    pub focus_cost: f32,
    /// Committed inside the surprise window after a stance change.
    pub surprise: bool,
    /// Execution finisher against an executable defender.
    pub execution: bool,
    /// Launched out of an open counter window.
    pub counter: bool,
}

impl AttackIntent {
    pub fn new(attacker: CombatantId, direction: Direction, damage: f32, focus_cost: f32) -> Self {
        Self {
            attacker,
            direction,
            is_heavy: false,
            damage,
            focus_cost,
            surprise: false,
            execution: false,
            counter: false,
        }
    }

    pub fn heavy(mut self) -> Self {
        self.is_heavy = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatResult {
    Blocked,
    ParrySuccess,
    ParryFailed,
    Dodged,
    Hit,
    Missed,
}

impl CombatResult {
    pub const ALL: [CombatResult; 6] = [
        CombatResult::Blocked,
        CombatResult::ParrySuccess,
        CombatResult::ParryFailed,
        CombatResult::Dodged,
        CombatResult::Hit,
        CombatResult::Missed,
    ];

    /// The defender kept the attack off: no damage was dealt.
    pub fn is_defended(self) -> bool {
        matches!(
            self,
            CombatResult::Blocked | CombatResult::ParrySuccess | CombatResult::Dodged
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CombatResult::Blocked => "blocked",
            CombatResult::ParrySuccess => "parry_success",
            CombatResult::ParryFailed => "parry_failed",
            CombatResult::Dodged => "dodged",
            CombatResult::Hit => "hit",
            CombatResult::Missed => "missed",
        }
    }
}

/// Outcome of resolving one intent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub result: CombatResult,
    pub applies_damage: bool,
    /// Signed change to the defender's focus (rewards positive, costs negative).
    pub defender_focus_delta: f32,
    pub opens_counter_window: bool,
    pub consumes_parry: bool,
}

impl Resolution {
    fn plain(result: CombatResult, applies_damage: bool, defender_focus_delta: f32) -> Self {
        Self {
            result,
            applies_damage,
            defender_focus_delta,
            opens_counter_window: false,
            consumes_parry: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectionResolver {
    rule_set: RuleSet,
    costs: CostTable,
    rewards: RewardTable,
}

impl DirectionResolver {
    pub fn new(config: &DuelConfig) -> Self {
        Self {
            rule_set: config.rule_set,
            costs: config.costs.clone(),
            rewards: config.rewards.clone(),
        }
    }

    pub fn rule_set(&self) -> RuleSet {
        self.rule_set
    }

    pub fn resolve(&self, intent: &AttackIntent, defender: &CombatantState) -> Resolution {
        if intent.direction.is_none() || intent.attacker == defender.id {
            return Resolution::plain(CombatResult::Missed, false, 0.0);
        }
        if defender.is_executable() {
            return Resolution::plain(CombatResult::Hit, true, 0.0);
        }
        if defender.is_dodging() {
            return Resolution::plain(CombatResult::Dodged, false, 0.0);
        }
        match self.rule_set {
            RuleSet::Parry => self.resolve_parry_rules(intent, defender),
            RuleSet::Commit => self.resolve_commit_rules(intent, defender),
        }
    }

    fn resolve_parry_rules(&self, intent: &AttackIntent, defender: &CombatantState) -> Resolution {
        let guard_matches = defender.defense_direction() == intent.direction;
        if defender.is_parrying() {
            return if guard_matches {
                Resolution {
                    result: CombatResult::ParryFailed,
                    applies_damage: true,
                    defender_focus_delta: -(self.costs.parry_resolve
                        + self.costs.parry_fail_penalty),
                    opens_counter_window: false,
                    consumes_parry: true,
                }
            } else {
                Resolution {
                    result: CombatResult::ParrySuccess,
                    applies_damage: false,
                    defender_focus_delta: -self.costs.parry_resolve,
                    opens_counter_window: true,
                    consumes_parry: true,
                }
            };
        }
        if guard_matches {
            Resolution::plain(CombatResult::Blocked, false, -self.costs.block)
        } else {
            Resolution::plain(CombatResult::Hit, true, 0.0)
        }
    }

    fn resolve_commit_rules(&self, intent: &AttackIntent, defender: &CombatantState) -> Resolution {
        if defender.stance() == intent.direction {
            let perfect = intent.is_heavy || intent.damage > self.rewards.perfect_block_damage;
            let reward = if perfect {
                self.rewards.perfect_block
            } else {
                self.rewards.successful_block
            };
            Resolution::plain(CombatResult::Blocked, false, reward)
        } else {
            Resolution::plain(CombatResult::Hit, true, -self.costs.failed_defense_penalty)
        }
    }
}
