//! Duel Core - Directional Combat Library
//!
//! Deterministic one-on-one duel logic, engine-agnostic:
//! - Direction resolution (block, parry, dodge, hit, execution)
//! - Focus economy (the single resource behind every action)
//! - Stance input (double-tap commit, combo discounts, surprise attacks)
//! - Opponent AI (pattern reading, feints, telegraphs, counters)
//! - Orchestrator with a fixed tick order and an event stream
//! - Replay recording/verification and Monte-Carlo balance runs
//! - Bevy plugin for embedding in an app

pub mod ai;
pub mod balance;
pub mod combat;
pub mod config;
pub mod duel;
pub mod error;
pub mod input;
pub mod logging;
pub mod plugin;
pub mod replay;

pub use ai::{AiDecisionEngine, AiProfile};
pub use combat::{CombatResult, CombatantId, CombatantState, Direction, RuleSet};
pub use config::DuelConfig;
pub use duel::{DamageSink, Duel, DuelEvent, EventLog, EventSink, HealthLedger, NoDamage, TickReport};
pub use error::{ConfigError, ReplayError};
pub use input::{DuelCommand, RejectReason};
pub use plugin::{DuelInput, DuelPlugin};
