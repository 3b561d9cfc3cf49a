//! Single-step actions: directional guards, attacks, parry, dodge,
//! meditation, the execution finisher and telegraphed strikes.
//!
//! Callers have already checked lock and rule-set gating.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::combat::{AttackIntent, Countdown, Direction, RuleSet};
use crate::duel::events::DuelEvent;

use super::command::{DuelCommand, RejectReason};
use super::stance::StanceInputController;
use super::ActionContext;

pub fn set_attack_direction(ctx: &mut ActionContext<'_>, direction: Direction) {
    if direction.is_none() {
        ctx.reject(DuelCommand::SetAttackDirection(direction), RejectReason::NoDirection);
        return;
    }
    if ctx.state.set_attack_direction(direction) {
        let who = ctx.who();
        ctx.emit(DuelEvent::AttackDirectionChanged { who, direction });
    }
}

pub fn set_defense_direction(ctx: &mut ActionContext<'_>, direction: Direction) {
    if direction.is_none() {
        ctx.reject(DuelCommand::SetDefenseDirection(direction), RejectReason::NoDirection);
        return;
    }
    if ctx.state.set_defense_direction(direction) {
        let who = ctx.who();
        ctx.emit(DuelEvent::DefenseDirectionChanged { who, direction });
    }
}

/// Parry-rules light or heavy attack along the current attack direction.
pub fn attack(ctx: &mut ActionContext<'_>, heavy: bool) -> Option<AttackIntent> {
    let command = if heavy {
        DuelCommand::HeavyAttack
    } else {
        DuelCommand::LightAttack
    };
    let direction = ctx.state.attack_direction();
    if direction.is_none() {
        ctx.reject(command, RejectReason::NoDirection);
        return None;
    }
    let (cost, base_damage) = if heavy {
        (ctx.config.costs.heavy_attack, ctx.config.damage.heavy)
    } else {
        (ctx.config.costs.light_attack, ctx.config.damage.light)
    };
    if !ctx.pay(command, cost) {
        return None;
    }

    let counter = ctx.state.is_in_counter_window();
    let timing = &ctx.config.timing;
    let (damage, cooldown) = if counter {
        ctx.state.consume_counter_window();
        (
            base_damage * ctx.config.damage.counter_multiplier,
            timing.counter_attack_cooldown,
        )
    } else {
        (base_damage, timing.attack_cooldown)
    };
    ctx.state.lock_for(cooldown);

    let mut intent = AttackIntent::new(ctx.who(), direction, damage, cost);
    intent.is_heavy = heavy;
    intent.counter = counter;
    debug!(who = ctx.who().as_str(), direction = direction.as_str(), heavy, counter, cost, "Attack launched");
    announce(ctx, &intent);
    Some(intent)
}

pub fn parry(ctx: &mut ActionContext<'_>) {
    if !ctx.pay(DuelCommand::Parry, ctx.config.costs.parry) {
        return;
    }
    ctx.state.activate_parry(ctx.config.timing.parry_window);
    ctx.state.lock_for(ctx.config.timing.action_lock);
    let who = ctx.who();
    let direction = ctx.state.defense_direction();
    debug!(who = who.as_str(), direction = direction.as_str(), "Parry window opened");
    ctx.emit(DuelEvent::ParryActivated { who, direction });
}

pub fn dodge(ctx: &mut ActionContext<'_>) {
    if !ctx.pay(DuelCommand::Dodge, ctx.config.costs.dodge) {
        return;
    }
    ctx.state.activate_dodge(ctx.config.timing.dodge_window);
    ctx.state.lock_for(ctx.config.timing.action_lock);
    let who = ctx.who();
    debug!(who = who.as_str(), "Dodge");
    ctx.emit(DuelEvent::DodgeActivated { who });
}

pub fn meditate(ctx: &mut ActionContext<'_>, active: bool) {
    if ctx.state.is_meditating() == active {
        return;
    }
    ctx.state.set_meditating(active);
    let who = ctx.who();
    debug!(who = who.as_str(), active, "Meditation");
    ctx.emit(DuelEvent::Meditation { who, active });
}

/// Finisher against an executable opponent. Skips the affordability check
/// but still pays its cost, clamped at zero.
pub fn execute(
    ctx: &mut ActionContext<'_>,
    controller: &mut StanceInputController,
) -> Option<AttackIntent> {
    if !ctx.opponent.is_executable() {
        ctx.reject(DuelCommand::Execute, RejectReason::TargetNotExecutable);
        return None;
    }
    let direction = match ctx.rule_set() {
        RuleSet::Commit => ctx.state.stance(),
        RuleSet::Parry => ctx.state.attack_direction(),
    };
    if direction.is_none() {
        ctx.reject(DuelCommand::Execute, RejectReason::NoDirection);
        return None;
    }
    let cost = ctx.config.costs.light_attack * ctx.config.costs.execution_multiplier;
    ctx.economy.use_focus(ctx.state, cost);

    let timing = &ctx.config.timing;
    if ctx.rule_set() == RuleSet::Commit {
        ctx.state.commit(timing.commit_hold);
        ctx.state.lock_for(timing.commit_hold + timing.attack_cooldown);
        controller.clear_surprise();
    } else {
        ctx.state.lock_for(timing.attack_cooldown);
    }

    let mut intent = AttackIntent::new(ctx.who(), direction, ctx.config.damage.execution, cost);
    intent.is_heavy = true;
    intent.execution = true;
    info!(who = ctx.who().as_str(), direction = direction.as_str(), "Execution");
    announce(ctx, &intent);
    Some(intent)
}

/// An announced attack waiting for its telegraph to run out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingAttack {
    pub heavy: bool,
    pub direction: Direction,
    pub countdown: Countdown,
}

/// Announce a Parry-rules attack ahead of time. The attacker is locked
/// for the telegraph; cost is paid when the strike releases.
pub fn begin_telegraph(
    ctx: &mut ActionContext<'_>,
    heavy: bool,
    duration: f32,
) -> Option<PendingAttack> {
    let command = if heavy {
        DuelCommand::HeavyAttack
    } else {
        DuelCommand::LightAttack
    };
    if ctx.state.is_executable() {
        ctx.reject(command, RejectReason::Executable);
        return None;
    }
    if !ctx.state.can_act() {
        ctx.reject(command, RejectReason::Locked);
        return None;
    }
    let direction = ctx.state.attack_direction();
    if direction.is_none() {
        ctx.reject(command, RejectReason::NoDirection);
        return None;
    }
    ctx.state.lock_for(duration);
    let mut countdown = Countdown::default();
    countdown.start(duration);
    let who = ctx.who();
    debug!(who = who.as_str(), direction = direction.as_str(), duration, "Telegraph");
    ctx.emit(DuelEvent::TelegraphStarted {
        who,
        direction,
        duration,
    });
    Some(PendingAttack {
        heavy,
        direction,
        countdown,
    })
}

/// Launch a telegraphed attack along the direction that was announced.
pub fn release_telegraph(ctx: &mut ActionContext<'_>, pending: PendingAttack) -> Option<AttackIntent> {
    let command = if pending.heavy {
        DuelCommand::HeavyAttack
    } else {
        DuelCommand::LightAttack
    };
    if ctx.state.is_executable() {
        warn!(who = ctx.who().as_str(), "Telegraphed attack dropped: attacker executable");
        ctx.reject(command, RejectReason::Executable);
        return None;
    }
    ctx.state.set_attack_direction(pending.direction);
    attack(ctx, pending.heavy)
}

pub(crate) fn announce(ctx: &mut ActionContext<'_>, intent: &AttackIntent) {
    ctx.emit(DuelEvent::AttackCommitted {
        who: intent.attacker,
        direction: intent.direction,
        cost: intent.focus_cost,
        heavy: intent.is_heavy,
        surprise: intent.surprise,
        counter: intent.counter,
        execution: intent.execution,
    });
}
