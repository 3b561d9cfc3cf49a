//! Directional combat core: guard directions, per-fighter state, the focus
//! economy and the attack resolver.

pub mod direction;
pub mod focus;
pub mod resolver;
pub mod state;

pub use crate::config::RuleSet;
pub use direction::{Direction, DirectionHistogram};
pub use focus::FocusEconomy;
pub use resolver::{AttackIntent, CombatResult, DirectionResolver, Resolution};
pub use state::{CombatantId, CombatantState, Countdown, TimerExpiries};
