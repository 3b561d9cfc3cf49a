//! The duel orchestrator.
//!
//! Owns both fighters, the economy, the resolver and the outbound sinks,
//! and advances everything one fixed step at a time:
//!
//! 1. decrement timers, apply regen or meditation
//! 2. act on expiries (telegraphed attacks release)
//! 3. accept input: queued commands then AI, Player before Opponent
//! 4. resolve the attacks launched this tick, in launch order
//!
//! Identical config, seed and command stream produce an identical event
//! stream.

pub mod damage;
pub mod events;

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{debug, info, trace_span};

use crate::ai::{AiAction, AiDecisionEngine, AiProfile};
use crate::combat::{
    AttackIntent, CombatResult, CombatantId, CombatantState, DirectionResolver, FocusEconomy,
    RuleSet,
};
use crate::config::DuelConfig;
use crate::input::{actions, dispatch, ActionContext, DuelCommand, PendingAttack, StanceInputController};

pub use damage::{DamageSink, HealthLedger, NoDamage};
pub use events::{DuelEvent, EventLog, EventSink, TracingSink};

/// Everything that happened during one tick, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub events: Vec<DuelEvent>,
}

impl TickReport {
    pub fn results(&self) -> impl Iterator<Item = CombatResult> + '_ {
        self.events.iter().filter_map(|e| match e {
            DuelEvent::Resolved { result, .. } => Some(*result),
            _ => None,
        })
    }
}

struct Fighter {
    state: CombatantState,
    controller: StanceInputController,
    ai: Option<AiDecisionEngine>,
    profile: Option<AiProfile>,
    queue: VecDeque<DuelCommand>,
    pending: Option<PendingAttack>,
}

impl Fighter {
    fn new(id: CombatantId, config: &DuelConfig) -> Self {
        Self {
            state: CombatantState::new(id, config.focus.focus_max),
            controller: StanceInputController::new(&config.timing),
            ai: None,
            profile: None,
            queue: VecDeque::new(),
            pending: None,
        }
    }
}

pub struct Duel<D: DamageSink = NoDamage> {
    config: DuelConfig,
    economy: FocusEconomy,
    resolver: DirectionResolver,
    fighters: [Fighter; 2],
    ai_seeds: [u64; 2],
    damage: D,
    sinks: Vec<Box<dyn EventSink>>,
    ticks: u64,
    elapsed: f32,
    winner: Option<CombatantId>,
}

impl<D: DamageSink> Duel<D> {
    /// Both sides start human-controlled. Pass a config that has been
    /// through `DuelConfig::validate` (every loader does this).
    pub fn new(config: DuelConfig, damage: D) -> Self {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);
        let ai_seeds = [rng.gen(), rng.gen()];
        info!(rule_set = config.rule_set.as_str(), seed = config.seed, "Duel created");
        Self {
            economy: FocusEconomy::new(config.focus.clone(), config.rule_set),
            resolver: DirectionResolver::new(&config),
            fighters: [
                Fighter::new(CombatantId::Player, &config),
                Fighter::new(CombatantId::Opponent, &config),
            ],
            ai_seeds,
            damage,
            sinks: Vec::new(),
            ticks: 0,
            elapsed: 0.0,
            winner: None,
            config,
        }
    }

    pub fn with_ai(mut self, id: CombatantId, profile: AiProfile) -> Self {
        self.set_ai(id, Some(profile));
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Hand a side to the AI, or back to external input with `None`.
    pub fn set_ai(&mut self, id: CombatantId, profile: Option<AiProfile>) {
        let seed = self.ai_seeds[id.index()];
        let fighter = &mut self.fighters[id.index()];
        fighter.ai = profile
            .clone()
            .map(|p| AiDecisionEngine::new(p, &self.config, seed));
        fighter.profile = profile;
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Queue a command for the next tick.
    pub fn submit(&mut self, id: CombatantId, command: DuelCommand) {
        self.fighters[id.index()].queue.push_back(command);
    }

    pub fn state(&self, id: CombatantId) -> &CombatantState {
        &self.fighters[id.index()].state
    }

    pub fn controller(&self, id: CombatantId) -> &StanceInputController {
        &self.fighters[id.index()].controller
    }

    pub fn ai(&self, id: CombatantId) -> Option<&AiDecisionEngine> {
        self.fighters[id.index()].ai.as_ref()
    }

    pub fn ai_profile(&self, id: CombatantId) -> Option<&AiProfile> {
        self.fighters[id.index()].profile.as_ref()
    }

    pub fn config(&self) -> &DuelConfig {
        &self.config
    }

    pub fn rule_set(&self) -> RuleSet {
        self.config.rule_set
    }

    pub fn damage(&self) -> &D {
        &self.damage
    }

    pub fn damage_mut(&mut self) -> &mut D {
        &mut self.damage
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn winner(&self) -> Option<CombatantId> {
        self.winner
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    /// Start a new encounter with the same config, seed and AI profiles.
    pub fn reset(&mut self) {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.seed);
        self.ai_seeds = [rng.gen(), rng.gen()];
        for (i, fighter) in self.fighters.iter_mut().enumerate() {
            fighter.state.reset();
            fighter.controller.reset();
            fighter.queue.clear();
            fighter.pending = None;
            fighter.ai = fighter
                .profile
                .clone()
                .map(|p| AiDecisionEngine::new(p, &self.config, self.ai_seeds[i]));
        }
        self.damage.reset();
        self.ticks = 0;
        self.elapsed = 0.0;
        self.winner = None;
        info!(seed = self.config.seed, "Duel reset");
    }

    /// Advance the simulation by `dt` seconds. A finished duel does nothing.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        if self.winner.is_some() {
            return TickReport {
                tick: self.ticks,
                events: Vec::new(),
            };
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.ticks += 1;
        self.elapsed += dt;
        let _span = trace_span!("duel_tick", tick = self.ticks).entered();

        let mut events = Vec::new();
        let mut released = self.advance_timers(dt, &mut events);
        self.check_executable(&mut events);

        let mut intents = self.release_telegraphs(&mut released, &mut events);
        for id in CombatantId::BOTH {
            intents.extend(self.process_input(id, dt, &mut events));
        }
        self.check_executable(&mut events);

        for intent in intents {
            if self.winner.is_some() {
                break;
            }
            self.resolve(intent, &mut events);
        }

        for event in &events {
            for sink in self.sinks.iter_mut() {
                sink.publish(event);
            }
        }
        self.feed_ai(&events);

        TickReport {
            tick: self.ticks,
            events,
        }
    }

    /// Step 1. Returns which fighters have a telegraph that just ran out.
    fn advance_timers(&mut self, dt: f32, events: &mut Vec<DuelEvent>) -> [bool; 2] {
        let mut released = [false; 2];
        for (i, fighter) in self.fighters.iter_mut().enumerate() {
            let who = fighter.state.id;
            let expiries = fighter.state.tick_timers(dt);
            if expiries.counter_closed {
                events.push(DuelEvent::CounterWindowClosed { who });
            }
            if let Some(combo) = fighter.controller.tick(dt) {
                events.push(DuelEvent::ComboReset { who, combo });
            }
            if let Some(pending) = fighter.pending.as_mut() {
                released[i] = pending.countdown.tick(dt);
            }
            if self.config.rule_set == RuleSet::Parry && fighter.state.is_meditating() {
                self.economy.meditate(&mut fighter.state, dt);
            } else {
                self.economy.regen(&mut fighter.state, dt);
            }
        }
        released
    }

    /// Step 2.
    fn release_telegraphs(
        &mut self,
        released: &mut [bool; 2],
        events: &mut Vec<DuelEvent>,
    ) -> Vec<AttackIntent> {
        let mut intents = Vec::new();
        for id in CombatantId::BOTH {
            if !released[id.index()] {
                continue;
            }
            released[id.index()] = false;
            let (me, other) = pair_mut(&mut self.fighters, id);
            let Some(pending) = me.pending.take() else {
                continue;
            };
            let mut ctx = ActionContext {
                state: &mut me.state,
                opponent: &other.state,
                economy: &self.economy,
                config: &self.config,
                events: &mut *events,
            };
            if let Some(intent) = actions::release_telegraph(&mut ctx, pending) {
                intents.push(intent);
            }
        }
        intents
    }

    /// Step 3 for one fighter: buffered press, queued commands, then AI.
    fn process_input(
        &mut self,
        id: CombatantId,
        dt: f32,
        events: &mut Vec<DuelEvent>,
    ) -> Vec<AttackIntent> {
        let mut intents = Vec::new();
        let (me, other) = pair_mut(&mut self.fighters, id);
        let Fighter {
            state,
            controller,
            ai,
            queue,
            pending,
            ..
        } = me;

        {
            let mut ctx = ActionContext {
                state: &mut *state,
                opponent: &other.state,
                economy: &self.economy,
                config: &self.config,
                events: &mut *events,
            };
            if ctx.rule_set() == RuleSet::Commit && !ctx.state.is_executable() {
                controller.flush_buffer(&mut ctx);
            }
            while let Some(command) = queue.pop_front() {
                intents.extend(dispatch(command, controller, &mut ctx));
            }
        }

        let Some(ai) = ai.as_mut() else {
            return intents;
        };
        if pending.is_some() {
            return intents;
        }
        let decisions = ai.update(dt, &*state, Some(&other.state));
        let mut ctx = ActionContext {
            state,
            opponent: &other.state,
            economy: &self.economy,
            config: &self.config,
            events,
        };
        for decision in decisions {
            match decision {
                AiAction::Command(command) => {
                    intents.extend(dispatch(command, controller, &mut ctx));
                }
                AiAction::Telegraph { heavy, duration } => {
                    *pending = actions::begin_telegraph(&mut ctx, heavy, duration);
                }
            }
        }
        intents
    }

    /// Step 4 for one intent.
    fn resolve(&mut self, intent: AttackIntent, events: &mut Vec<DuelEvent>) {
        let defender_id = intent.attacker.other();
        let (attacker, defender) = pair_mut(&mut self.fighters, intent.attacker);

        let resolution = self.resolver.resolve(&intent, &defender.state);
        defender.state.record_incoming(intent.direction);

        let mut delta = self
            .economy
            .apply_delta(&mut defender.state, resolution.defender_focus_delta);
        if resolution.consumes_parry {
            defender.state.consume_parry();
        }
        if resolution.result == CombatResult::ParrySuccess {
            delta += self
                .economy
                .gain_focus(&mut defender.state, self.config.rewards.parry_refund);
        }
        if resolution.applies_damage {
            self.damage
                .apply_damage(defender_id, intent.damage, resolution.result);
        }
        debug!(
            attacker = intent.attacker.as_str(),
            direction = intent.direction.as_str(),
            result = resolution.result.as_str(),
            delta,
            "Attack resolved"
        );
        events.push(DuelEvent::Resolved {
            attacker: intent.attacker,
            defender: defender_id,
            direction: intent.direction,
            result: resolution.result,
            damage_applied: resolution.applies_damage,
            damage: if resolution.applies_damage {
                intent.damage
            } else {
                0.0
            },
            defender_focus_delta: delta,
        });

        if resolution.opens_counter_window {
            defender
                .state
                .open_counter_window(self.config.timing.counter_window);
            events.push(DuelEvent::CounterWindowOpened { who: defender_id });
        }
        if intent.surprise && resolution.result == CombatResult::Blocked {
            let amount = self
                .economy
                .use_focus(&mut attacker.state, self.config.costs.surprise_attack_penalty);
            events.push(DuelEvent::SurprisePenalty {
                who: intent.attacker,
                amount,
            });
        }

        self.check_executable(events);
        if let Some(loser) = self.damage.defeated() {
            let winner = loser.other();
            self.winner = Some(winner);
            info!(winner = winner.as_str(), elapsed = self.elapsed, "Duel ended");
            events.push(DuelEvent::DuelEnded { winner });
        }
    }

    fn check_executable(&mut self, events: &mut Vec<DuelEvent>) {
        for fighter in self.fighters.iter_mut() {
            if self.economy.check_executable(&mut fighter.state) {
                let who = fighter.state.id;
                info!(who = who.as_str(), "Executable");
                fighter.state.set_meditating(false);
                fighter.pending = None;
                events.push(DuelEvent::Executable { who });
            }
        }
    }

    fn feed_ai(&mut self, events: &[DuelEvent]) {
        for event in events {
            if !matches!(event, DuelEvent::Resolved { .. }) {
                continue;
            }
            for id in CombatantId::BOTH {
                let (me, other) = pair_mut(&mut self.fighters, id);
                if let Some(ai) = me.ai.as_mut() {
                    ai.observe(event, &me.state, Some(&other.state));
                }
            }
        }
    }
}

fn pair_mut(fighters: &mut [Fighter; 2], id: CombatantId) -> (&mut Fighter, &mut Fighter) {
    let (first, second) = fighters.split_at_mut(1);
    match id {
        CombatantId::Player => (&mut first[0], &mut second[0]),
        CombatantId::Opponent => (&mut second[0], &mut first[0]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::Direction;

    const DT: f32 = 1.0 / 60.0;

    fn commit_duel() -> Duel<HealthLedger> {
        Duel::new(DuelConfig::commit_mode(), HealthLedger::new(100.0))
    }

    fn parry_duel() -> Duel<HealthLedger> {
        Duel::new(DuelConfig::parry_mode(), HealthLedger::new(100.0))
    }

    #[test]
    fn test_commit_block_rewards_defender() {
        let mut duel = commit_duel();
        duel.submit(CombatantId::Player, DuelCommand::Commit);
        let report = duel.tick(DT);
        assert_eq!(report.results().collect::<Vec<_>>(), vec![CombatResult::Blocked]);
        assert_eq!(duel.state(CombatantId::Player).focus(), 80.0);
        assert_eq!(duel.state(CombatantId::Opponent).focus(), 100.0, "reward clamps at max");
        assert_eq!(duel.damage().health(CombatantId::Opponent), 100.0);
    }

    #[test]
    fn test_commit_hit_penalises_and_damages() {
        let mut duel = commit_duel();
        duel.submit(CombatantId::Player, DuelCommand::SetStance(Direction::Down));
        duel.submit(CombatantId::Player, DuelCommand::Commit);
        let report = duel.tick(DT);
        assert_eq!(report.results().collect::<Vec<_>>(), vec![CombatResult::Hit]);
        assert!((duel.state(CombatantId::Opponent).focus() - 65.0).abs() < 0.1);
        assert_eq!(duel.damage().health(CombatantId::Opponent), 60.0, "surprise: 20 * 2");
    }

    #[test]
    fn test_parry_success_opens_counter_window() {
        let mut duel = parry_duel();
        duel.submit(CombatantId::Opponent, DuelCommand::Parry);
        duel.submit(CombatantId::Player, DuelCommand::SetAttackDirection(Direction::Down));
        duel.submit(CombatantId::Player, DuelCommand::LightAttack);
        let report = duel.tick(DT);
        assert_eq!(report.results().collect::<Vec<_>>(), vec![CombatResult::ParrySuccess]);
        let opp = duel.state(CombatantId::Opponent);
        assert!(opp.is_in_counter_window());
        assert!(!opp.is_parrying());
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, DuelEvent::CounterWindowOpened { who: CombatantId::Opponent })));
        assert_eq!(duel.damage().health(CombatantId::Opponent), 100.0);
    }

    #[test]
    fn test_parry_failed_applies_damage() {
        let mut duel = parry_duel();
        duel.submit(CombatantId::Opponent, DuelCommand::Parry);
        duel.submit(CombatantId::Player, DuelCommand::LightAttack);
        let report = duel.tick(DT);
        assert_eq!(report.results().collect::<Vec<_>>(), vec![CombatResult::ParryFailed]);
        assert_eq!(duel.damage().health(CombatantId::Opponent), 88.0);
    }

    #[test]
    fn test_counter_window_closes_with_event() {
        let mut duel = parry_duel();
        duel.submit(CombatantId::Opponent, DuelCommand::Parry);
        duel.submit(CombatantId::Player, DuelCommand::SetAttackDirection(Direction::Left));
        duel.submit(CombatantId::Player, DuelCommand::LightAttack);
        duel.tick(DT);
        let mut closed = false;
        for _ in 0..60 {
            let report = duel.tick(DT);
            closed |= report
                .events
                .iter()
                .any(|e| matches!(e, DuelEvent::CounterWindowClosed { .. }));
        }
        assert!(closed);
        assert!(!duel.state(CombatantId::Opponent).is_in_counter_window());
    }

    #[test]
    fn test_executable_event_fires_once() {
        let mut duel = commit_duel();
        duel.fighters[1].state.focus = 30.0;
        duel.submit(CombatantId::Player, DuelCommand::SetStance(Direction::Down));
        duel.submit(CombatantId::Player, DuelCommand::Commit);
        let mut executable_events = 0;
        for _ in 0..180 {
            let report = duel.tick(DT);
            executable_events += report
                .events
                .iter()
                .filter(|e| matches!(e, DuelEvent::Executable { who: CombatantId::Opponent }))
                .count();
        }
        assert!(duel.state(CombatantId::Opponent).is_executable());
        assert_eq!(executable_events, 1);
        assert_eq!(duel.state(CombatantId::Opponent).focus(), 0.0, "no regen while executable");
    }

    #[test]
    fn test_execution_ends_duel() {
        let mut duel = Duel::new(DuelConfig::commit_mode(), HealthLedger::new(60.0));
        duel.fighters[1].state.focus = 5.0;
        duel.submit(CombatantId::Player, DuelCommand::Execute);
        let report = duel.tick(DT);
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, DuelEvent::DuelEnded { winner: CombatantId::Player })));
        assert!(duel.is_over());
        assert!(duel.tick(DT).events.is_empty());

        duel.reset();
        assert!(!duel.is_over());
        assert_eq!(duel.state(CombatantId::Opponent).focus(), 100.0);
        assert_eq!(duel.damage().health(CombatantId::Opponent), 60.0);
    }

    #[test]
    fn test_ai_duel_is_deterministic() {
        let run = |seed: u64| {
            let mut duel = Duel::new(DuelConfig::parry_mode().with_seed(seed), HealthLedger::default())
                .with_ai(CombatantId::Player, AiProfile::stance_duelist())
                .with_ai(CombatantId::Opponent, AiProfile::telegraphing_duelist());
            let mut events = Vec::new();
            for _ in 0..1200 {
                events.extend(duel.tick(DT).events);
            }
            events
        };
        let first = run(7);
        assert!(!first.is_empty());
        assert_eq!(first, run(7));
    }

    #[test]
    fn test_sinks_receive_every_event() {
        let log = EventLog::new();
        let mut duel = commit_duel().with_sink(Box::new(log.clone()));
        duel.submit(CombatantId::Player, DuelCommand::Press(Direction::Left));
        let report = duel.tick(DT);
        assert_eq!(log.snapshot(), report.events);
    }

    #[test]
    fn test_telegraphed_attack_resolves_later() {
        let mut duel = Duel::new(DuelConfig::parry_mode(), NoDamage);
        let opp = CombatantId::Opponent;
        {
            let (me, other) = pair_mut(&mut duel.fighters, opp);
            let mut events = Vec::new();
            let mut ctx = ActionContext {
                state: &mut me.state,
                opponent: &other.state,
                economy: &duel.economy,
                config: &duel.config,
                events: &mut events,
            };
            me.pending = actions::begin_telegraph(&mut ctx, true, 0.5);
        }
        let mut resolved_at = None;
        for i in 0..60 {
            let report = duel.tick(DT);
            if report.results().next().is_some() {
                resolved_at = Some(i);
                break;
            }
        }
        let at = resolved_at.expect("telegraph releases");
        assert!((28..=31).contains(&at), "released after ~0.5s, got tick {at}");
    }
}
