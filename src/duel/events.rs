//! Outbound notifications.
//!
//! Every gameplay consequence the presentation layer cares about (sounds,
//! flashes, arrow colours, health bars) is published as a `DuelEvent`, in
//! the order it happened, exactly once.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combat::{CombatResult, CombatantId, Direction};
use crate::input::{DuelCommand, RejectReason};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DuelEvent {
    StanceChanged {
        who: CombatantId,
        direction: Direction,
        cost: f32,
        combo: u32,
    },
    AttackDirectionChanged {
        who: CombatantId,
        direction: Direction,
    },
    DefenseDirectionChanged {
        who: CombatantId,
        direction: Direction,
    },
    InputBuffered {
        who: CombatantId,
        direction: Direction,
    },
    ComboReset {
        who: CombatantId,
        combo: u32,
    },
    AttackCommitted {
        who: CombatantId,
        direction: Direction,
        cost: f32,
        heavy: bool,
        surprise: bool,
        counter: bool,
        execution: bool,
    },
    TelegraphStarted {
        who: CombatantId,
        direction: Direction,
        duration: f32,
    },
    Resolved {
        attacker: CombatantId,
        defender: CombatantId,
        direction: Direction,
        result: CombatResult,
        damage_applied: bool,
        damage: f32,
        defender_focus_delta: f32,
    },
    SurprisePenalty {
        who: CombatantId,
        amount: f32,
    },
    ParryActivated {
        who: CombatantId,
        direction: Direction,
    },
    DodgeActivated {
        who: CombatantId,
    },
    CounterWindowOpened {
        who: CombatantId,
    },
    CounterWindowClosed {
        who: CombatantId,
    },
    Meditation {
        who: CombatantId,
        active: bool,
    },
    Executable {
        who: CombatantId,
    },
    CommandRejected {
        who: CombatantId,
        command: DuelCommand,
        reason: RejectReason,
    },
    DuelEnded {
        winner: CombatantId,
    },
}

impl DuelEvent {
    /// Short stable name, used for log fields and histograms.
    pub fn kind(&self) -> &'static str {
        match self {
            DuelEvent::StanceChanged { .. } => "stance_changed",
            DuelEvent::AttackDirectionChanged { .. } => "attack_direction_changed",
            DuelEvent::DefenseDirectionChanged { .. } => "defense_direction_changed",
            DuelEvent::InputBuffered { .. } => "input_buffered",
            DuelEvent::ComboReset { .. } => "combo_reset",
            DuelEvent::AttackCommitted { .. } => "attack_committed",
            DuelEvent::TelegraphStarted { .. } => "telegraph_started",
            DuelEvent::Resolved { .. } => "resolved",
            DuelEvent::SurprisePenalty { .. } => "surprise_penalty",
            DuelEvent::ParryActivated { .. } => "parry_activated",
            DuelEvent::DodgeActivated { .. } => "dodge_activated",
            DuelEvent::CounterWindowOpened { .. } => "counter_window_opened",
            DuelEvent::CounterWindowClosed { .. } => "counter_window_closed",
            DuelEvent::Meditation { .. } => "meditation",
            DuelEvent::Executable { .. } => "executable",
            DuelEvent::CommandRejected { .. } => "command_rejected",
            DuelEvent::DuelEnded { .. } => "duel_ended",
        }
    }
}

/// A subscriber to duel events. Sinks must not assume any ordering
/// relative to other sinks.
pub trait EventSink: Send + Sync {
    fn publish(&mut self, event: &DuelEvent);
}

/// Collects every event into a shared buffer. Clones share the buffer,
/// so a test can keep one handle and give the other to the duel.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<DuelEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<DuelEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn drain(&self) -> Vec<DuelEvent> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for EventLog {
    fn publish(&mut self, event: &DuelEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Writes each event as a `debug!` line under the `duel_core::events` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&mut self, event: &DuelEvent) {
        debug!(target: "duel_core::events", kind = event.kind(), ?event);
    }
}
