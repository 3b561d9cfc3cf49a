//! Opponent habit tracking, sampled on a fixed interval rather than every tick.

use crate::combat::{CombatantState, Countdown, Direction, DirectionHistogram};

#[derive(Debug, Clone)]
pub struct PatternTracker {
    interval: f32,
    lerp: f32,
    sample: Countdown,
    last_guard: Direction,
    stance_changes: u32,
    guards: DirectionHistogram,
    average_focus: f32,
}

impl PatternTracker {
    pub fn new(interval: f32, lerp: f32, initial_focus: f32) -> Self {
        let mut sample = Countdown::default();
        sample.start(interval);
        Self {
            interval,
            lerp,
            sample,
            last_guard: Direction::None,
            stance_changes: 0,
            guards: DirectionHistogram::new(),
            average_focus: initial_focus,
        }
    }

    /// Advance the sampling clock. With no opponent nothing is learned.
    pub fn update(&mut self, dt: f32, opponent: Option<&CombatantState>) {
        if !self.sample.tick(dt) {
            return;
        }
        self.sample.start(self.interval);
        let Some(opponent) = opponent else {
            return;
        };
        let guard = opponent.defense_direction();
        if guard != self.last_guard && !self.last_guard.is_none() {
            self.stance_changes += 1;
        }
        self.last_guard = guard;
        self.guards.record(guard);
        self.average_focus += (opponent.focus() - self.average_focus) * self.lerp;
    }

    pub fn stance_changes(&self) -> u32 {
        self.stance_changes
    }

    pub fn average_focus(&self) -> f32 {
        self.average_focus
    }

    pub fn guard_histogram(&self) -> &DirectionHistogram {
        &self.guards
    }

    pub fn least_defended(&self) -> Direction {
        self.guards.least_frequent()
    }
}
