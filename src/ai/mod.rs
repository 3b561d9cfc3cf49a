//! Opponent AI.
//!
//! The engine decides on a randomized think interval, never every tick,
//! and acts only by emitting the same `DuelCommand`s a human would. It
//! reads the opponent's current guard and sampled habits, its own
//! incoming-attack history, and both focus pools.
//!
//! Decision cycle:
//! 1. Effective aggression = base +/- focus, stance-change, streak and random adjustments
//! 2. Attack (strike / feint / telegraph), defend (stance or parry) or wait
//! 3. Directions come from weighted strategy tables (see `strategy`)
//!
//! An executable opponent overrides all of it with the finisher.

pub mod patterns;
pub mod plan;
pub mod profile;
pub mod strategy;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::debug;

use crate::combat::{CombatResult, CombatantId, CombatantState, Countdown, Direction, RuleSet};
use crate::config::{CostTable, DuelConfig, TimingConfig};
use crate::duel::events::DuelEvent;
use crate::input::DuelCommand;

pub use patterns::PatternTracker;
pub use plan::{Plan, PlanKind};
pub use profile::AiProfile;
pub use strategy::{AttackStrategy, DefenseStrategy, StrategyTable};

/// What the AI wants done this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AiAction {
    Command(DuelCommand),
    Telegraph { heavy: bool, duration: f32 },
}

#[derive(Debug, Clone)]
pub struct AiDecisionEngine {
    profile: AiProfile,
    rule_set: RuleSet,
    costs: CostTable,
    timing: TimingConfig,
    rng: Xoshiro256PlusPlus,
    /// Open while a commit would still count as a surprise attack.
    surprise_window: Countdown,
    think: Countdown,
    patterns: PatternTracker,
    plan: Option<Plan>,
    aggression: f32,
    consecutive_hits: u32,
    consecutive_misses: u32,
}

impl AiDecisionEngine {
    pub fn new(profile: AiProfile, config: &DuelConfig, seed: u64) -> Self {
        let mut think = Countdown::default();
        think.start(profile.initial_delay);
        Self {
            patterns: PatternTracker::new(
                profile.pattern_sample_interval,
                profile.focus_lerp,
                config.focus.focus_max,
            ),
            aggression: profile.base_aggression,
            rule_set: config.rule_set,
            costs: config.costs.clone(),
            timing: config.timing.clone(),
            surprise_window: Countdown::default(),
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            think,
            plan: None,
            consecutive_hits: 0,
            consecutive_misses: 0,
            profile,
        }
    }

    pub fn profile(&self) -> &AiProfile {
        &self.profile
    }

    pub fn aggression(&self) -> f32 {
        self.aggression
    }

    pub fn patterns(&self) -> &PatternTracker {
        &self.patterns
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn streaks(&self) -> (u32, u32) {
        (self.consecutive_hits, self.consecutive_misses)
    }

    /// One simulation step. `opponent` is `None` when there is nobody to
    /// read: the AI then picks directions at random and learns nothing.
    pub fn update(
        &mut self,
        dt: f32,
        me: &CombatantState,
        opponent: Option<&CombatantState>,
    ) -> Vec<AiAction> {
        self.surprise_window.tick(dt);
        let actions = self.act(dt, me, opponent);
        if actions
            .iter()
            .any(|a| matches!(a, AiAction::Command(DuelCommand::SetStance(_))))
        {
            self.surprise_window.start(self.timing.surprise_attack_window);
        }
        actions
    }

    fn act(
        &mut self,
        dt: f32,
        me: &CombatantState,
        opponent: Option<&CombatantState>,
    ) -> Vec<AiAction> {
        let mut actions = Vec::new();
        if me.is_executable() {
            self.plan = None;
            return actions;
        }
        self.patterns.update(dt, opponent);

        if opponent.is_some_and(|o| o.is_executable()) {
            self.plan = None;
            if me.can_act() {
                debug!(who = me.id.as_str(), "Opponent executable, going for the finisher");
                actions.push(AiAction::Command(DuelCommand::Execute));
            }
            return actions;
        }

        if let Some(plan) = self.plan.as_mut() {
            actions.extend(plan.advance(dt).into_iter().map(AiAction::Command));
            if self.plan.as_ref().is_some_and(Plan::is_finished) {
                self.plan = None;
            }
            return actions;
        }

        if !me.can_act() {
            return actions;
        }
        if self.rule_set == RuleSet::Parry {
            self.drift_defense(dt, me, opponent, &mut actions);
        }
        if self.think.tick(dt) {
            let extra = self.decide(me, opponent, &mut actions);
            let interval = self
                .rng
                .gen_range(self.profile.think_interval_min..=self.profile.think_interval_max);
            self.think.start(interval + extra);
        }
        actions
    }

    /// Learn from a resolved exchange this fighter took part in.
    pub fn observe(
        &mut self,
        event: &DuelEvent,
        me: &CombatantState,
        opponent: Option<&CombatantState>,
    ) {
        let DuelEvent::Resolved {
            attacker,
            defender,
            result,
            damage_applied,
            ..
        } = *event
        else {
            return;
        };

        if attacker == me.id {
            if damage_applied {
                self.consecutive_hits += 1;
                self.consecutive_misses = 0;
            } else {
                self.consecutive_misses += 1;
                self.consecutive_hits = 0;
            }
            return;
        }
        if defender != me.id {
            return;
        }

        let shift = match result {
            CombatResult::ParrySuccess => self.profile.parry_success_boost,
            CombatResult::Blocked => self.profile.block_boost,
            CombatResult::ParryFailed => -self.profile.parry_failed_penalty,
            CombatResult::Hit => -self.profile.hit_taken_penalty,
            CombatResult::Dodged | CombatResult::Missed => 0.0,
        };
        self.aggression = (self.aggression + shift).clamp(0.0, 1.0);

        if result == CombatResult::ParrySuccess && self.plan.is_none() {
            self.schedule_counter(me, opponent);
        }
    }

    /// Aggression for this decision, before the roll.
    pub fn effective_aggression(
        &mut self,
        me: &CombatantState,
        opponent: Option<&CombatantState>,
    ) -> f32 {
        let p = &self.profile;
        let mut aggro = self.aggression;
        if let Some(opponent) = opponent {
            // Sampled estimate: an opponent who has been running low stays a target
            // for a while after a quick recovery.
            let estimate = self.patterns.average_focus() / opponent.focus_max().max(f32::EPSILON);
            if opponent.focus_fraction() < p.low_focus_fraction || estimate < p.low_focus_fraction {
                aggro += p.opponent_low_bonus;
            }
            if self.patterns.stance_changes() > p.stance_change_threshold {
                aggro += p.stance_change_bonus;
            }
        }
        if me.focus_fraction() < p.low_focus_fraction {
            aggro -= p.self_low_penalty;
        }
        if self.consecutive_hits >= p.streak_threshold {
            aggro += p.streak_adjust;
        } else if self.consecutive_misses >= p.streak_threshold {
            aggro -= p.streak_adjust;
        }
        let counter_roll: f32 = self.rng.gen();
        if counter_roll < p.counter_attack_chance {
            aggro += p.counter_boost;
        }
        aggro.clamp(0.0, 1.0)
    }

    /// Returns extra seconds to add to the next think interval.
    fn decide(
        &mut self,
        me: &CombatantState,
        opponent: Option<&CombatantState>,
        actions: &mut Vec<AiAction>,
    ) -> f32 {
        let aggression = self.effective_aggression(me, opponent);
        let roll: f32 = self.rng.gen();
        match self.rule_set {
            RuleSet::Commit => self.decide_commit(roll, aggression, me, opponent, actions),
            RuleSet::Parry => self.decide_parry(roll, aggression, me, opponent, actions),
        }
    }

    fn decide_commit(
        &mut self,
        roll: f32,
        aggression: f32,
        me: &CombatantState,
        opponent: Option<&CombatantState>,
        actions: &mut Vec<AiAction>,
    ) -> f32 {
        let focus = me.focus();
        if roll < aggression {
            let feint_roll: f32 = self.rng.gen();
            let target = self.choose_attack_direction(false, opponent);
            if feint_roll < self.profile.feint_chance && self.profile.feint_changes > 0 {
                let mut decoys = Vec::new();
                let mut current = me.stance();
                for _ in 0..self.profile.feint_changes {
                    current = Direction::random_except(&mut self.rng, current);
                    decoys.push(current);
                }
                let step = self.profile.feint_step_delay;
                let changes: Vec<(f32, Direction)> = decoys
                    .iter()
                    .chain(std::iter::once(&target))
                    .enumerate()
                    .map(|(i, d)| (if i == 0 { 0.0 } else { step }, *d))
                    .collect();
                let cost = self.projected_commit_cost(me, &changes, self.profile.feint_commit_delay);
                if focus >= cost {
                    debug!(who = me.id.as_str(), target = target.as_str(), cost, "Feint");
                    self.plan = Some(Plan::feint(
                        &decoys,
                        target,
                        step,
                        self.profile.feint_commit_delay,
                    ));
                    return 0.0;
                }
            }
            let cost = self.projected_commit_cost(me, &[(0.0, target)], self.profile.strike_delay);
            if focus >= cost {
                debug!(who = me.id.as_str(), target = target.as_str(), cost, "Strike");
                self.plan = Some(
                    Plan::new(PlanKind::Strike)
                        .then(0.0, DuelCommand::SetStance(target))
                        .then(self.profile.strike_delay, DuelCommand::Commit),
                );
                return 0.0;
            }
        }
        if focus >= self.costs.stance_change {
            let guard = self.choose_defense_direction(me, opponent);
            if guard != me.stance() {
                actions.push(AiAction::Command(DuelCommand::SetStance(guard)));
            }
        }
        self.profile.idle_wait
    }

    /// Commit rules: focus a planned attack needs from start to finish.
    ///
    /// `changes` are `(delay, stance)` steps ahead of the commit. Each real
    /// change pays the stance cost at the combo it would reach (a combo
    /// carried over from earlier changes is ignored, so this never
    /// underestimates), and the commit is priced as a surprise attack when
    /// it lands inside the surprise window of the last change.
    pub fn projected_commit_cost(
        &self,
        me: &CombatantState,
        changes: &[(f32, Direction)],
        commit_delay: f32,
    ) -> f32 {
        let t = &self.timing;
        let mut stance = me.stance();
        let mut combo = 0u32;
        let mut since_change: Option<f32> = None;
        let mut total = 0.0;
        for &(delay, direction) in changes {
            if let Some(since) = since_change.as_mut() {
                *since += delay;
            }
            if direction == stance || direction.is_none() {
                continue;
            }
            combo = match since_change {
                Some(since) if since < t.combo_window => (combo + 1).min(t.max_combo),
                _ => 1,
            };
            let steps = combo.min(t.max_combo) as f32;
            total += self.costs.stance_change * (1.0 - t.combo_discount * steps).max(t.combo_cost_floor);
            stance = direction;
            since_change = Some(0.0);
        }
        let surprise = match since_change {
            Some(since) => since + commit_delay <= t.surprise_attack_window,
            None => self.surprise_window.remaining() >= commit_delay && self.surprise_window.is_active(),
        };
        let commit = if surprise {
            self.costs.surprise_attack.max(self.costs.light_attack)
        } else {
            self.costs.light_attack
        };
        total + commit
    }

    fn decide_parry(
        &mut self,
        roll: f32,
        aggression: f32,
        me: &CombatantState,
        opponent: Option<&CombatantState>,
        actions: &mut Vec<AiAction>,
    ) -> f32 {
        let focus = me.focus();
        let p = &self.profile;
        let heavy = if focus >= self.costs.heavy_attack && roll < aggression * p.heavy_share {
            Some(true)
        } else if focus >= self.costs.light_attack && roll < aggression * p.light_share {
            Some(false)
        } else {
            None
        };

        if let Some(heavy) = heavy {
            let direction = self.choose_attack_direction(heavy, opponent);
            if direction != me.attack_direction() {
                actions.push(AiAction::Command(DuelCommand::SetAttackDirection(direction)));
            }
            if self.profile.telegraph_duration > 0.0 {
                actions.push(AiAction::Telegraph {
                    heavy,
                    duration: self.profile.telegraph_duration,
                });
            } else {
                let command = if heavy {
                    DuelCommand::HeavyAttack
                } else {
                    DuelCommand::LightAttack
                };
                actions.push(AiAction::Command(command));
            }
            return 0.0;
        }

        if focus >= self.costs.parry && roll < self.profile.defend_chance {
            let guard = self.choose_defense_direction(me, opponent);
            if guard != me.defense_direction() {
                actions.push(AiAction::Command(DuelCommand::SetDefenseDirection(guard)));
            }
            actions.push(AiAction::Command(DuelCommand::Parry));
            return 0.0;
        }
        self.profile.idle_wait
    }

    /// Parry rules: between decisions the guard keeps drifting toward the
    /// predicted direction, with occasional random switches.
    fn drift_defense(
        &mut self,
        dt: f32,
        me: &CombatantState,
        opponent: Option<&CombatantState>,
        actions: &mut Vec<AiAction>,
    ) {
        if opponent.is_none() {
            return;
        }
        let predict_roll: f32 = self.rng.gen();
        let guard = if predict_roll < self.profile.defense_predict_rate * dt {
            strategy::predict_incoming(me, self.profile.prediction_min_samples, &mut self.rng)
        } else {
            let random_roll: f32 = self.rng.gen();
            if random_roll < self.profile.defense_random_rate * dt {
                Direction::random(&mut self.rng)
            } else {
                return;
            }
        };
        if guard != me.defense_direction() {
            actions.push(AiAction::Command(DuelCommand::SetDefenseDirection(guard)));
        }
    }

    fn schedule_counter(&mut self, me: &CombatantState, opponent: Option<&CombatantState>) {
        let direction = self.choose_attack_direction(false, opponent);
        let delay = self.profile.counter_delay;
        let plan = match self.rule_set {
            RuleSet::Parry => {
                if me.focus() < self.costs.light_attack {
                    return;
                }
                Plan::new(PlanKind::Counter)
                    .then(delay, DuelCommand::SetAttackDirection(direction))
                    .then(0.0, DuelCommand::LightAttack)
            }
            RuleSet::Commit => {
                if me.focus() < self.projected_commit_cost(me, &[(delay, direction)], 0.0) {
                    return;
                }
                Plan::new(PlanKind::Counter)
                    .then(delay, DuelCommand::SetStance(direction))
                    .then(0.0, DuelCommand::Commit)
            }
        };
        debug!(who = me.id.as_str(), direction = direction.as_str(), "Counter scheduled");
        self.plan = Some(plan);
    }

    fn choose_attack_direction(&mut self, heavy: bool, opponent: Option<&CombatantState>) -> Direction {
        let roll: f32 = self.rng.gen();
        let chosen = strategy::pick_attack(&self.profile.attack_strategies, roll, heavy);
        strategy::attack_direction(chosen, opponent, &self.patterns, &mut self.rng)
    }

    fn choose_defense_direction(
        &mut self,
        me: &CombatantState,
        opponent: Option<&CombatantState>,
    ) -> Direction {
        let roll: f32 = self.rng.gen();
        let chosen = strategy::pick_defense(&self.profile.defense_strategies, roll);
        strategy::defense_direction(
            chosen,
            me,
            opponent,
            self.profile.prediction_min_samples,
            &mut self.rng,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(profile: AiProfile, config: &DuelConfig) -> AiDecisionEngine {
        AiDecisionEngine::new(profile, config, 11)
    }

    fn resolved(attacker: CombatantId, result: CombatResult, damage_applied: bool) -> DuelEvent {
        DuelEvent::Resolved {
            attacker,
            defender: attacker.other(),
            direction: Direction::Up,
            result,
            damage_applied,
            damage: 20.0,
            defender_focus_delta: 0.0,
        }
    }

    #[test]
    fn test_quiet_during_initial_delay() {
        let config = DuelConfig::commit_mode();
        let mut ai = engine(AiProfile::stance_duelist(), &config);
        let me = CombatantState::new(CombatantId::Opponent, 100.0);
        let them = CombatantState::new(CombatantId::Player, 100.0);
        for _ in 0..100 {
            assert!(ai.update(1.0 / 60.0, &me, Some(&them)).is_empty());
        }
    }

    #[test]
    fn test_executable_ai_does_nothing() {
        let config = DuelConfig::commit_mode();
        let mut ai = engine(AiProfile::stance_duelist(), &config);
        let mut me = CombatantState::new(CombatantId::Opponent, 100.0);
        me.is_executable = true;
        let mut them = CombatantState::new(CombatantId::Player, 100.0);
        them.is_executable = true;
        for _ in 0..600 {
            assert!(ai.update(1.0 / 60.0, &me, Some(&them)).is_empty());
        }
    }

    #[test]
    fn test_finisher_overrides_initial_delay() {
        let config = DuelConfig::commit_mode();
        let mut ai = engine(AiProfile::stance_duelist(), &config);
        let me = CombatantState::new(CombatantId::Opponent, 100.0);
        let mut them = CombatantState::new(CombatantId::Player, 100.0);
        them.is_executable = true;
        let actions = ai.update(1.0 / 60.0, &me, Some(&them));
        assert_eq!(actions, vec![AiAction::Command(DuelCommand::Execute)]);
    }

    #[test]
    fn test_eventually_acts_without_opponent() {
        let config = DuelConfig::commit_mode();
        let mut ai = engine(AiProfile::stance_duelist(), &config);
        let me = CombatantState::new(CombatantId::Opponent, 100.0);
        let mut acted = false;
        for _ in 0..(60 * 20) {
            if !ai.update(1.0 / 60.0, &me, None).is_empty() {
                acted = true;
                break;
            }
        }
        assert!(acted, "AI should still decide with no opponent to read");
        assert!(ai.patterns().guard_histogram().is_empty());
    }

    #[test]
    fn test_defense_outcomes_shift_aggression() {
        let config = DuelConfig::parry_mode();
        let mut ai = engine(AiProfile::telegraphing_duelist(), &config);
        let me = CombatantState::new(CombatantId::Opponent, 100.0);
        let start = ai.aggression();
        ai.observe(&resolved(CombatantId::Player, CombatResult::ParryFailed, true), &me, None);
        assert!((ai.aggression() - (start - 0.1)).abs() < 1e-5);
        ai.observe(&resolved(CombatantId::Player, CombatResult::ParrySuccess, false), &me, None);
        assert!((ai.aggression() - (start + 0.05)).abs() < 1e-5);
    }

    #[test]
    fn test_parry_success_schedules_counter() {
        let config = DuelConfig::parry_mode();
        let mut ai = engine(AiProfile::telegraphing_duelist(), &config);
        let me = CombatantState::new(CombatantId::Opponent, 100.0);
        let them = CombatantState::new(CombatantId::Player, 100.0);
        ai.observe(
            &resolved(CombatantId::Player, CombatResult::ParrySuccess, false),
            &me,
            Some(&them),
        );
        assert_eq!(ai.plan().map(Plan::kind), Some(PlanKind::Counter));

        let mut fired = Vec::new();
        for _ in 0..30 {
            fired.extend(ai.update(1.0 / 60.0, &me, Some(&them)));
        }
        assert!(fired.contains(&AiAction::Command(DuelCommand::LightAttack)));
        assert!(ai.plan().is_none());
    }

    #[test]
    fn test_attack_streaks() {
        let config = DuelConfig::commit_mode();
        let mut ai = engine(AiProfile::stance_duelist(), &config);
        let me = CombatantState::new(CombatantId::Opponent, 100.0);
        ai.observe(&resolved(CombatantId::Opponent, CombatResult::Hit, true), &me, None);
        ai.observe(&resolved(CombatantId::Opponent, CombatResult::Hit, true), &me, None);
        assert_eq!(ai.streaks(), (2, 0));
        ai.observe(&resolved(CombatantId::Opponent, CombatResult::Blocked, false), &me, None);
        assert_eq!(ai.streaks(), (0, 1));
    }

    #[test]
    fn test_projected_commit_cost() {
        let config = DuelConfig::commit_mode();
        let ai = engine(AiProfile::stance_duelist(), &config);
        let me = CombatantState::new(CombatantId::Opponent, 100.0);

        // No change, nothing recent: a plain commit.
        assert_eq!(ai.projected_commit_cost(&me, &[(0.0, Direction::Up)], 0.3), 20.0);
        // One change then a commit inside the surprise window.
        let strike = ai.projected_commit_cost(&me, &[(0.0, Direction::Left)], 0.3);
        assert!((strike - 34.5).abs() < 1e-4);
        // Feint: three discounted changes (4.5 + 4 + 3.5) and a surprise commit.
        let feint = [
            (0.0, Direction::Down),
            (0.15, Direction::Right),
            (0.15, Direction::Left),
        ];
        assert!((ai.projected_commit_cost(&me, &feint, 0.2) - 42.0).abs() < 1e-4);
        // Committing after the window closes is charged as a plain attack.
        assert!((ai.projected_commit_cost(&me, &feint, 0.5) - 32.0).abs() < 1e-4);
    }

    #[test]
    fn test_low_focus_never_plans_a_surprise_it_cannot_pay() {
        let config = DuelConfig::commit_mode();
        let window_ticks = (config.timing.surprise_attack_window * 60.0).ceil() as usize;
        let them = CombatantState::new(CombatantId::Player, 100.0);
        for seed in 0..20 {
            let mut ai = AiDecisionEngine::new(AiProfile::stance_duelist(), &config, seed);
            let mut me = CombatantState::new(CombatantId::Opponent, 100.0);
            me.focus = 25.0;
            let mut last_change: Option<usize> = None;
            for tick in 0..(60 * 30) {
                for action in ai.update(1.0 / 60.0, &me, Some(&them)) {
                    match action {
                        AiAction::Command(DuelCommand::SetStance(d)) if d != me.stance() => {
                            last_change = Some(tick);
                        }
                        AiAction::Command(DuelCommand::Commit) => {
                            let surprise = last_change.is_some_and(|t| tick - t <= window_ticks);
                            assert!(!surprise, "seed {seed}: surprise commit planned on 25 focus");
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    #[test]
    fn test_sampled_focus_keeps_pressure_on() {
        let config = DuelConfig::commit_mode();
        let mut profile = AiProfile::stance_duelist();
        profile.counter_attack_chance = 0.0;
        let me = CombatantState::new(CombatantId::Opponent, 100.0);
        let rested = CombatantState::new(CombatantId::Player, 100.0);
        let mut drained = rested.clone();
        drained.focus = 0.0;

        let mut fresh = engine(profile.clone(), &config);
        assert!((fresh.effective_aggression(&me, Some(&rested)) - 0.5).abs() < 1e-5);

        let mut ai = engine(profile, &config);
        for _ in 0..(60 * 10) {
            ai.update(1.0 / 60.0, &me, Some(&drained));
        }
        assert!(ai.patterns().average_focus() < 40.0);
        assert!((ai.effective_aggression(&me, Some(&rested)) - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_same_seed_same_choices() {
        let config = DuelConfig::commit_mode();
        let me = CombatantState::new(CombatantId::Opponent, 100.0);
        let them = CombatantState::new(CombatantId::Player, 100.0);
        let mut a = engine(AiProfile::stance_duelist(), &config);
        let mut b = engine(AiProfile::stance_duelist(), &config);
        for _ in 0..(60 * 10) {
            assert_eq!(
                a.update(1.0 / 60.0, &me, Some(&them)),
                b.update(1.0 / 60.0, &me, Some(&them))
            );
        }
    }
}
