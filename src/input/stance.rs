//! Commit-rules stance input: one key per direction.
//!
//! - A press on a new direction changes stance (serves attack and defense)
//! - The same direction again inside the double-tap window commits an attack
//! - Rapid stance changes build a combo that discounts the change cost
//! - A commit right after a stance change is a surprise attack
//! - Presses while locked are buffered and replayed once free

use tracing::{debug, warn};

use crate::combat::{AttackIntent, Countdown, Direction};
use crate::config::TimingConfig;
use crate::duel::events::DuelEvent;

use super::actions::announce;
use super::command::{DuelCommand, RejectReason};
use super::ActionContext;

#[derive(Debug, Clone)]
pub struct StanceInputController {
    timing: TimingConfig,
    last_pressed: Direction,
    double_tap: Countdown,
    combo: u32,
    combo_window: Countdown,
    surprise_window: Countdown,
    surprise_armed: bool,
    buffered: Option<Direction>,
    buffer: Countdown,
}

impl StanceInputController {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            timing: timing.clone(),
            last_pressed: Direction::None,
            double_tap: Countdown::default(),
            combo: 0,
            combo_window: Countdown::default(),
            surprise_window: Countdown::default(),
            surprise_armed: false,
            buffered: None,
            buffer: Countdown::default(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(&self.timing);
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn buffered(&self) -> Option<Direction> {
        self.buffered
    }

    pub fn surprise_ready(&self) -> bool {
        self.surprise_armed && self.surprise_window.is_active()
    }

    /// Stance-change cost multiplier at a given combo count.
    pub fn cost_multiplier(&self, combo: u32) -> f32 {
        let steps = combo.min(self.timing.max_combo) as f32;
        (1.0 - self.timing.combo_discount * steps).max(self.timing.combo_cost_floor)
    }

    /// Advance input windows. Returns the combo count if it just lapsed.
    pub fn tick(&mut self, dt: f32) -> Option<u32> {
        self.double_tap.tick(dt);
        self.surprise_window.tick(dt);
        if self.buffer.tick(dt) {
            if let Some(direction) = self.buffered.take() {
                debug!(direction = direction.as_str(), "Buffered press expired");
            }
        }
        if self.combo_window.tick(dt) && self.combo > 0 {
            let lapsed = self.combo;
            self.combo = 0;
            return Some(lapsed);
        }
        None
    }

    /// Replay a buffered press once the fighter is free again.
    pub fn flush_buffer(&mut self, ctx: &mut ActionContext<'_>) {
        if !ctx.state.can_act() {
            return;
        }
        let Some(direction) = self.buffered.take() else {
            return;
        };
        if !self.buffer.is_active() {
            return;
        }
        self.buffer.clear();
        debug!(who = ctx.who().as_str(), direction = direction.as_str(), "Replaying buffered press");
        if direction != ctx.state.stance() {
            self.change_stance(direction, ctx);
        }
        self.arm_double_tap(direction);
    }

    /// Handle one raw direction press.
    pub fn press(&mut self, direction: Direction, ctx: &mut ActionContext<'_>) -> Option<AttackIntent> {
        if direction.is_none() {
            ctx.reject(DuelCommand::Press(direction), RejectReason::NoDirection);
            return None;
        }
        if !ctx.state.can_act() {
            self.buffered = Some(direction);
            self.buffer.start(self.timing.input_buffer_window);
            let who = ctx.who();
            ctx.emit(DuelEvent::InputBuffered { who, direction });
            return None;
        }

        if direction == self.last_pressed && self.double_tap.is_active() {
            self.last_pressed = Direction::None;
            self.double_tap.clear();
            self.buffered = None;
            self.buffer.clear();
            return self.request_commit(ctx);
        }

        if direction != ctx.state.stance() {
            self.change_stance(direction, ctx);
        } else {
            debug!(who = ctx.who().as_str(), direction = direction.as_str(), "Stance armed");
        }
        self.arm_double_tap(direction);
        None
    }

    /// Switch stance, paying the combo-discounted cost. Focus clamps at
    /// zero, so a change is never refused for cost.
    pub fn change_stance(&mut self, direction: Direction, ctx: &mut ActionContext<'_>) -> bool {
        if direction.is_none() {
            ctx.reject(DuelCommand::SetStance(direction), RejectReason::NoDirection);
            return false;
        }
        if ctx.state.is_committed() {
            ctx.reject(DuelCommand::SetStance(direction), RejectReason::Committed);
            return false;
        }
        if direction == ctx.state.stance() {
            return false;
        }

        self.combo = if self.combo_window.is_active() {
            (self.combo + 1).min(self.timing.max_combo)
        } else {
            1
        };
        self.combo_window.start(self.timing.combo_window);
        let cost = ctx.config.costs.stance_change * self.cost_multiplier(self.combo);
        ctx.economy.use_focus(ctx.state, cost);
        ctx.state.set_stance(direction);

        self.surprise_window.start(self.timing.surprise_attack_window);
        self.surprise_armed = true;

        let who = ctx.who();
        debug!(who = who.as_str(), direction = direction.as_str(), cost, combo = self.combo, "Stance changed");
        ctx.emit(DuelEvent::StanceChanged {
            who,
            direction,
            cost,
            combo: self.combo,
        });
        true
    }

    /// Commit an attack from the current stance.
    pub fn request_commit(&mut self, ctx: &mut ActionContext<'_>) -> Option<AttackIntent> {
        let direction = ctx.state.stance();
        if direction.is_none() {
            warn!(who = ctx.who().as_str(), "Commit with no stance selected");
            ctx.reject(DuelCommand::Commit, RejectReason::NoDirection);
            return None;
        }

        let surprise = self.surprise_ready();
        self.surprise_armed = false;

        let costs = &ctx.config.costs;
        let cost = if surprise {
            costs.surprise_attack
        } else {
            costs.light_attack
        };
        if !ctx.pay(DuelCommand::Commit, cost) {
            return None;
        }

        let damage_cfg = &ctx.config.damage;
        let mut damage = damage_cfg.light;
        if surprise {
            damage *= damage_cfg.surprise_multiplier;
        }
        let counter = ctx.state.is_in_counter_window();
        let cooldown = if counter {
            ctx.state.consume_counter_window();
            damage *= damage_cfg.counter_multiplier;
            self.timing.counter_attack_cooldown
        } else {
            self.timing.attack_cooldown
        };
        ctx.state.commit(self.timing.commit_hold);
        ctx.state.lock_for(self.timing.commit_hold + cooldown);

        let mut intent = AttackIntent::new(ctx.who(), direction, damage, cost);
        intent.is_heavy = surprise;
        intent.surprise = surprise;
        intent.counter = counter;
        debug!(who = ctx.who().as_str(), direction = direction.as_str(), surprise, counter, cost, "Attack committed");
        announce(ctx, &intent);
        Some(intent)
    }

    /// Drop a pending surprise bonus (any attack spends it).
    pub fn clear_surprise(&mut self) {
        self.surprise_armed = false;
    }

    fn arm_double_tap(&mut self, direction: Direction) {
        self.last_pressed = direction;
        self.double_tap.start(self.timing.double_tap_window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{CombatantId, CombatantState, FocusEconomy};
    use crate::config::DuelConfig;

    struct Rig {
        config: DuelConfig,
        economy: FocusEconomy,
        me: CombatantState,
        them: CombatantState,
        controller: StanceInputController,
        events: Vec<DuelEvent>,
    }

    impl Rig {
        fn new() -> Self {
            let config = DuelConfig::commit_mode();
            Self {
                economy: FocusEconomy::new(config.focus.clone(), config.rule_set),
                me: CombatantState::new(CombatantId::Player, 100.0),
                them: CombatantState::new(CombatantId::Opponent, 100.0),
                controller: StanceInputController::new(&config.timing),
                config,
                events: Vec::new(),
            }
        }

        fn advance(&mut self, dt: f32) {
            self.me.tick_timers(dt);
            self.controller.tick(dt);
        }

        fn press(&mut self, direction: Direction) -> Option<AttackIntent> {
            let mut ctx = ActionContext {
                state: &mut self.me,
                opponent: &self.them,
                economy: &self.economy,
                config: &self.config,
                events: &mut self.events,
            };
            self.controller.flush_buffer(&mut ctx);
            self.controller.press(direction, &mut ctx)
        }

        fn flush(&mut self) {
            let mut ctx = ActionContext {
                state: &mut self.me,
                opponent: &self.them,
                economy: &self.economy,
                config: &self.config,
                events: &mut self.events,
            };
            self.controller.flush_buffer(&mut ctx);
        }
    }

    #[test]
    fn test_double_tap_inside_window_commits() {
        let mut rig = Rig::new();
        assert!(rig.press(Direction::Left).is_none());
        rig.advance(0.3);
        let intent = rig.press(Direction::Left).expect("double tap commits");
        assert_eq!(intent.direction, Direction::Left);
        assert!(rig.me.is_committed());
        assert!(!rig.me.can_act());
    }

    #[test]
    fn test_second_press_after_window_is_fresh() {
        let mut rig = Rig::new();
        rig.press(Direction::Left);
        rig.advance(0.6);
        assert!(rig.press(Direction::Left).is_none(), "window lapsed");
        rig.advance(0.2);
        assert!(rig.press(Direction::Left).is_some(), "re-armed by the fresh press");
    }

    #[test]
    fn test_first_change_pays_discounted_cost() {
        let mut rig = Rig::new();
        rig.press(Direction::Down);
        assert!((rig.me.focus() - 95.5).abs() < 1e-4, "5 * 0.9");
        assert_eq!(rig.controller.combo(), 1);
    }

    #[test]
    fn test_combo_cost_never_below_floor() {
        let rig = Rig::new();
        for n in 0..20 {
            let m = rig.controller.cost_multiplier(n);
            assert!(m >= 0.5 - f32::EPSILON);
            let expected = (1.0 - 0.1 * n.min(5) as f32).max(0.5);
            assert!((m - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_combo_lapses_after_window() {
        let mut rig = Rig::new();
        rig.press(Direction::Down);
        rig.advance(0.7);
        rig.press(Direction::Left);
        assert_eq!(rig.controller.combo(), 2);
        rig.me.tick_timers(1.6);
        assert_eq!(rig.controller.tick(1.6), Some(2));
        assert_eq!(rig.controller.combo(), 0);
    }

    #[test]
    fn test_surprise_attack_right_after_change() {
        let mut rig = Rig::new();
        rig.press(Direction::Right);
        rig.advance(0.1);
        let intent = rig.press(Direction::Right).unwrap();
        assert!(intent.surprise);
        assert!(intent.is_heavy);
        assert_eq!(intent.damage, 40.0);
        assert_eq!(intent.focus_cost, 30.0);
    }

    #[test]
    fn test_late_commit_is_plain() {
        let mut rig = Rig::new();
        rig.press(Direction::Right);
        rig.advance(0.45);
        let intent = rig.press(Direction::Right).unwrap();
        assert!(!intent.surprise);
        assert_eq!(intent.damage, 20.0);
        assert_eq!(intent.focus_cost, 20.0);
    }

    #[test]
    fn test_commit_without_focus_is_noop() {
        let mut rig = Rig::new();
        rig.me.focus = 10.0;
        rig.press(Direction::Up);
        rig.advance(0.1);
        assert!(rig.press(Direction::Up).is_none());
        assert!(!rig.me.is_committed());
        assert!(rig.me.can_act());
    }

    #[test]
    fn test_press_while_locked_is_buffered_and_replayed() {
        let mut rig = Rig::new();
        rig.press(Direction::Up);
        rig.advance(0.1);
        rig.press(Direction::Up).unwrap();
        // locked for 0.2 + 0.8
        rig.advance(0.9);
        assert!(rig.press(Direction::Down).is_none());
        assert_eq!(rig.controller.buffered(), Some(Direction::Down));
        rig.advance(0.15);
        rig.flush();
        assert_eq!(rig.me.stance(), Direction::Down);
        assert_eq!(rig.controller.buffered(), None);
    }

    #[test]
    fn test_stale_buffer_is_dropped() {
        let mut rig = Rig::new();
        rig.press(Direction::Up);
        rig.advance(0.1);
        rig.press(Direction::Up).unwrap();
        rig.advance(0.1);
        rig.press(Direction::Left);
        rig.advance(0.95);
        rig.flush();
        assert_eq!(rig.me.stance(), Direction::Up);
    }
}
