//! Command handling shared by human input and the AI.
//!
//! Every command, whoever issued it, goes through [`dispatch`]: the same
//! gating, the same costs, the same events. The AI has no private path
//! into combat state.

pub mod actions;
pub mod command;
pub mod stance;

use tracing::{debug, warn};

use crate::combat::{AttackIntent, CombatantId, CombatantState, FocusEconomy, RuleSet};
use crate::config::DuelConfig;
use crate::duel::events::DuelEvent;

pub use actions::PendingAttack;
pub use command::{DuelCommand, RejectReason};
pub use stance::StanceInputController;

/// Borrowed view of everything one fighter's action may touch.
pub struct ActionContext<'a> {
    pub state: &'a mut CombatantState,
    pub opponent: &'a CombatantState,
    pub economy: &'a FocusEconomy,
    pub config: &'a DuelConfig,
    pub events: &'a mut Vec<DuelEvent>,
}

impl ActionContext<'_> {
    pub fn who(&self) -> CombatantId {
        self.state.id
    }

    pub fn rule_set(&self) -> RuleSet {
        self.config.rule_set
    }

    pub fn emit(&mut self, event: DuelEvent) {
        self.events.push(event);
    }

    /// Record a refused command. No state is touched.
    pub fn reject(&mut self, command: DuelCommand, reason: RejectReason) {
        match reason {
            RejectReason::NoDirection | RejectReason::WrongRuleSet => {
                warn!(who = self.who().as_str(), command = command.name(), reason = reason.as_str(), "Command ignored");
            }
            _ => {
                debug!(who = self.who().as_str(), command = command.name(), reason = reason.as_str(), "Command rejected");
            }
        }
        self.events.push(DuelEvent::CommandRejected {
            who: self.who(),
            command,
            reason,
        });
    }

    /// Spend `cost` if affordable, otherwise reject `command`.
    pub(crate) fn pay(&mut self, command: DuelCommand, cost: f32) -> bool {
        if !self.economy.can_afford(self.state, cost) {
            let available = self.state.focus();
            self.reject(
                command,
                RejectReason::InsufficientFocus {
                    needed: cost,
                    available,
                },
            );
            return false;
        }
        self.economy.use_focus(self.state, cost);
        true
    }
}

/// Apply one command. Returns the attack it launched, if any.
pub fn dispatch(
    command: DuelCommand,
    controller: &mut StanceInputController,
    ctx: &mut ActionContext<'_>,
) -> Option<AttackIntent> {
    if ctx.state.is_executable() {
        ctx.reject(command, RejectReason::Executable);
        return None;
    }
    if ctx.state.is_meditating() && !matches!(command, DuelCommand::Meditate(_)) {
        ctx.reject(command, RejectReason::Meditating);
        return None;
    }

    let rule_set = ctx.rule_set();
    match command {
        DuelCommand::Press(direction) if rule_set == RuleSet::Commit => {
            controller.press(direction, ctx)
        }
        DuelCommand::SetStance(direction) if rule_set == RuleSet::Commit => {
            controller.change_stance(direction, ctx);
            None
        }
        DuelCommand::Commit if rule_set == RuleSet::Commit => {
            if !ctx.state.can_act() {
                ctx.reject(command, RejectReason::Locked);
                return None;
            }
            controller.request_commit(ctx)
        }
        DuelCommand::SetAttackDirection(direction) if rule_set == RuleSet::Parry => {
            actions::set_attack_direction(ctx, direction);
            None
        }
        DuelCommand::SetDefenseDirection(direction) if rule_set == RuleSet::Parry => {
            actions::set_defense_direction(ctx, direction);
            None
        }
        DuelCommand::LightAttack | DuelCommand::HeavyAttack if rule_set == RuleSet::Parry => {
            if !ctx.state.can_act() {
                ctx.reject(command, RejectReason::Locked);
                return None;
            }
            actions::attack(ctx, command == DuelCommand::HeavyAttack)
        }
        DuelCommand::Parry if rule_set == RuleSet::Parry => {
            if !ctx.state.can_act() {
                ctx.reject(command, RejectReason::Locked);
                return None;
            }
            actions::parry(ctx);
            None
        }
        DuelCommand::Meditate(active) if rule_set == RuleSet::Parry => {
            if active && !ctx.state.can_act() {
                ctx.reject(command, RejectReason::Locked);
                return None;
            }
            actions::meditate(ctx, active);
            None
        }
        DuelCommand::Dodge => {
            if !ctx.state.can_act() {
                ctx.reject(command, RejectReason::Locked);
                return None;
            }
            actions::dodge(ctx);
            None
        }
        DuelCommand::Execute => {
            if !ctx.state.can_act() {
                ctx.reject(command, RejectReason::Locked);
                return None;
            }
            actions::execute(ctx, controller)
        }
        _ => {
            ctx.reject(command, RejectReason::WrongRuleSet);
            None
        }
    }
}
