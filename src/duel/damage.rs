//! Damage application. Health is not part of the duel core; whoever owns
//! it implements `DamageSink`.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::combat::{CombatResult, CombatantId};

pub trait DamageSink: Send + Sync {
    /// Called once for every resolution whose damage applies.
    fn apply_damage(&mut self, target: CombatantId, amount: f32, result: CombatResult);

    /// A combatant who can no longer fight, if any. Ends the duel.
    fn defeated(&self) -> Option<CombatantId> {
        None
    }

    /// New encounter.
    fn reset(&mut self) {}
}

/// Discards damage. Duels against it never end on their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDamage;

impl DamageSink for NoDamage {
    fn apply_damage(&mut self, _target: CombatantId, _amount: f32, _result: CombatResult) {}
}

/// Plain health pool per side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthLedger {
    max_health: f32,
    health: [f32; 2],
    hits_taken: [u32; 2],
}

impl HealthLedger {
    pub fn new(max_health: f32) -> Self {
        Self {
            max_health,
            health: [max_health; 2],
            hits_taken: [0; 2],
        }
    }

    pub fn health(&self, id: CombatantId) -> f32 {
        self.health[id.index()]
    }

    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    pub fn hits_taken(&self, id: CombatantId) -> u32 {
        self.hits_taken[id.index()]
    }
}

impl Default for HealthLedger {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl DamageSink for HealthLedger {
    fn apply_damage(&mut self, target: CombatantId, amount: f32, result: CombatResult) {
        if !(amount.is_finite() && amount > 0.0) {
            return;
        }
        let i = target.index();
        self.health[i] = (self.health[i] - amount).max(0.0);
        self.hits_taken[i] += 1;
        if self.health[i] <= 0.0 {
            info!(target = target.as_str(), result = result.as_str(), "Combatant defeated");
        }
    }

    fn defeated(&self) -> Option<CombatantId> {
        CombatantId::BOTH
            .into_iter()
            .find(|id| self.health[id.index()] <= 0.0)
    }

    fn reset(&mut self) {
        self.health = [self.max_health; 2];
        self.hits_taken = [0; 2];
    }
}
