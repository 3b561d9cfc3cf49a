//! Per-fighter duel state.
//!
//! Waiting is modelled as a `Countdown` field decremented by the tick,
//! never as suspended control flow.

use serde::{Deserialize, Serialize};

use super::direction::{Direction, DirectionHistogram};

/// The two sides of a duel. Input is processed Player first, then
/// Opponent, every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatantId {
    Player,
    Opponent,
}

impl CombatantId {
    pub const BOTH: [CombatantId; 2] = [CombatantId::Player, CombatantId::Opponent];

    pub fn other(self) -> CombatantId {
        match self {
            CombatantId::Player => CombatantId::Opponent,
            CombatantId::Opponent => CombatantId::Player,
        }
    }

    pub fn index(self) -> usize {
        match self {
            CombatantId::Player => 0,
            CombatantId::Opponent => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CombatantId::Player => "player",
            CombatantId::Opponent => "opponent",
        }
    }
}

/// Remaining duration of a window. Inactive at zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Countdown {
    remaining: f32,
}

impl Countdown {
    pub fn start(&mut self, duration: f32) {
        self.remaining = duration.max(0.0);
    }

    pub fn clear(&mut self) {
        self.remaining = 0.0;
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Advance by `dt`. Returns true only on the tick the window closes.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.remaining <= 0.0 {
            return false;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            true
        } else {
            false
        }
    }
}

/// Windows that closed during one timer pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerExpiries {
    pub parry_closed: bool,
    pub dodge_closed: bool,
    pub counter_closed: bool,
    pub commit_released: bool,
    pub unlocked: bool,
}

/// Everything the resolver and controllers need to know about one fighter.
///
/// Focus is read-only from outside the crate; only `FocusEconomy` moves it,
/// and only through clamping operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatantState {
    pub id: CombatantId,
    pub(crate) focus: f32,
    pub(crate) focus_max: f32,
    attack_direction: Direction,
    defense_direction: Direction,
    is_committed: bool,
    pub(crate) is_executable: bool,
    is_meditating: bool,
    dodge: Countdown,
    parry: Countdown,
    counter: Countdown,
    commit_hold: Countdown,
    action_lock: Countdown,
    /// Directions this fighter has been attacked from.
    pub direction_histogram: DirectionHistogram,
    /// Most recent direction this fighter was attacked from.
    pub last_incoming: Direction,
}

impl CombatantState {
    pub fn new(id: CombatantId, focus_max: f32) -> Self {
        Self {
            id,
            focus: focus_max,
            focus_max,
            attack_direction: Direction::Up,
            defense_direction: Direction::Up,
            is_committed: false,
            is_executable: false,
            is_meditating: false,
            dodge: Countdown::default(),
            parry: Countdown::default(),
            counter: Countdown::default(),
            commit_hold: Countdown::default(),
            action_lock: Countdown::default(),
            direction_histogram: DirectionHistogram::new(),
            last_incoming: Direction::None,
        }
    }

    /// Back to full focus and a neutral Up guard for a new encounter.
    pub fn reset(&mut self) {
        *self = Self::new(self.id, self.focus_max);
    }

    pub fn focus(&self) -> f32 {
        self.focus
    }

    pub fn focus_max(&self) -> f32 {
        self.focus_max
    }

    pub fn focus_fraction(&self) -> f32 {
        if self.focus_max > 0.0 {
            self.focus / self.focus_max
        } else {
            0.0
        }
    }

    pub fn attack_direction(&self) -> Direction {
        self.attack_direction
    }

    pub fn defense_direction(&self) -> Direction {
        self.defense_direction
    }

    /// Commit rules: the single stance serving attack and defense.
    pub fn stance(&self) -> Direction {
        self.defense_direction
    }

    pub fn is_committed(&self) -> bool {
        self.is_committed
    }

    pub fn is_executable(&self) -> bool {
        self.is_executable
    }

    pub fn is_meditating(&self) -> bool {
        self.is_meditating
    }

    pub fn is_dodging(&self) -> bool {
        self.dodge.is_active()
    }

    pub fn is_parrying(&self) -> bool {
        self.parry.is_active()
    }

    pub fn is_in_counter_window(&self) -> bool {
        self.counter.is_active()
    }

    /// Free to start a new action: not locked and not executable.
    pub fn can_act(&self) -> bool {
        !self.action_lock.is_active() && !self.is_executable
    }

    pub fn is_locked(&self) -> bool {
        self.action_lock.is_active()
    }

    pub fn lock_remaining(&self) -> f32 {
        self.action_lock.remaining()
    }

    /// Returns true if the attack direction actually changed.
    pub fn set_attack_direction(&mut self, direction: Direction) -> bool {
        if self.attack_direction == direction {
            return false;
        }
        self.attack_direction = direction;
        true
    }

    /// Returns true if the defense direction actually changed.
    pub fn set_defense_direction(&mut self, direction: Direction) -> bool {
        if self.defense_direction == direction {
            return false;
        }
        self.defense_direction = direction;
        true
    }

    /// Set both guards at once. Frozen while committed.
    pub fn set_stance(&mut self, direction: Direction) -> bool {
        if self.is_committed || direction.is_none() || self.stance() == direction {
            return false;
        }
        self.attack_direction = direction;
        self.defense_direction = direction;
        true
    }

    pub fn activate_parry(&mut self, window: f32) {
        self.parry.start(window);
    }

    pub fn consume_parry(&mut self) {
        self.parry.clear();
    }

    pub fn activate_dodge(&mut self, window: f32) {
        self.dodge.start(window);
    }

    pub fn open_counter_window(&mut self, window: f32) {
        self.counter.start(window);
    }

    pub fn consume_counter_window(&mut self) {
        self.counter.clear();
    }

    /// Freeze the stance for `hold` seconds.
    pub fn commit(&mut self, hold: f32) {
        self.is_committed = true;
        self.commit_hold.start(hold);
    }

    pub fn lock_for(&mut self, duration: f32) {
        if duration > self.action_lock.remaining() {
            self.action_lock.start(duration);
        }
    }

    pub fn set_meditating(&mut self, meditating: bool) {
        self.is_meditating = meditating;
    }

    /// Record an incoming attack direction (the learning histogram).
    pub fn record_incoming(&mut self, direction: Direction) {
        self.direction_histogram.record(direction);
        if !direction.is_none() {
            self.last_incoming = direction;
        }
    }

    /// Decrement every window and report which ones closed this tick.
    pub fn tick_timers(&mut self, dt: f32) -> TimerExpiries {
        let expiries = TimerExpiries {
            parry_closed: self.parry.tick(dt),
            dodge_closed: self.dodge.tick(dt),
            counter_closed: self.counter.tick(dt),
            commit_released: self.commit_hold.tick(dt),
            unlocked: self.action_lock.tick(dt),
        };
        if expiries.commit_released {
            self.is_committed = false;
        }
        expiries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_fires_once() {
        let mut c = Countdown::default();
        assert!(!c.tick(0.1));
        c.start(0.25);
        assert!(c.is_active());
        assert!(!c.tick(0.1));
        assert!(!c.tick(0.1));
        assert!(c.tick(0.1));
        assert!(!c.is_active());
        assert!(!c.tick(0.1));
    }

    #[test]
    fn test_new_state_full_focus() {
        let s = CombatantState::new(CombatantId::Player, 100.0);
        assert_eq!(s.focus(), 100.0);
        assert_eq!(s.stance(), Direction::Up);
        assert!(s.can_act());
        assert!(!s.is_executable());
    }

    #[test]
    fn test_stance_frozen_while_committed() {
        let mut s = CombatantState::new(CombatantId::Player, 100.0);
        assert!(s.set_stance(Direction::Left));
        s.commit(0.2);
        assert!(!s.set_stance(Direction::Right));
        assert_eq!(s.stance(), Direction::Left);

        let expiries = s.tick_timers(0.25);
        assert!(expiries.commit_released);
        assert!(!s.is_committed());
        assert!(s.set_stance(Direction::Right));
    }

    #[test]
    fn test_windows_close_independently() {
        let mut s = CombatantState::new(CombatantId::Opponent, 100.0);
        s.activate_parry(0.25);
        s.activate_dodge(0.4);
        s.open_counter_window(0.8);
        let first = s.tick_timers(0.3);
        assert!(first.parry_closed);
        assert!(!first.dodge_closed);
        assert!(s.is_dodging());
        let second = s.tick_timers(0.2);
        assert!(second.dodge_closed);
        assert!(s.is_in_counter_window());
    }

    #[test]
    fn test_lock_keeps_longest() {
        let mut s = CombatantState::new(CombatantId::Player, 100.0);
        s.lock_for(1.0);
        s.lock_for(0.1);
        assert!((s.lock_remaining() - 1.0).abs() < f32::EPSILON);
        assert!(!s.can_act());
    }

    #[test]
    fn test_reset_clears_history() {
        let mut s = CombatantState::new(CombatantId::Player, 100.0);
        s.record_incoming(Direction::Down);
        s.focus = 3.0;
        s.reset();
        assert_eq!(s.focus(), 100.0);
        assert!(s.direction_histogram.is_empty());
        assert_eq!(s.last_incoming, Direction::None);
    }
}
