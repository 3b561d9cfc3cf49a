//! The inbound action surface shared by human input and the AI.

use serde::{Deserialize, Serialize};

use crate::combat::Direction;

/// One discrete action request from a player or an AI.
///
/// `Press`, `SetStance` and `Commit` belong to Commit rules. `SetAttackDirection`,
/// `SetDefenseDirection`, `LightAttack`, `HeavyAttack`, `Parry` and `Meditate`
/// belong to Parry rules. `Dodge` and `Execute` work under both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuelCommand {
    /// A raw direction key press: stance change, or commit on double-tap.
    Press(Direction),
    SetStance(Direction),
    Commit,
    SetAttackDirection(Direction),
    SetDefenseDirection(Direction),
    LightAttack,
    HeavyAttack,
    Parry,
    Dodge,
    Meditate(bool),
    /// Finisher against an executable opponent.
    Execute,
}

impl DuelCommand {
    pub fn name(&self) -> &'static str {
        match self {
            DuelCommand::Press(_) => "press",
            DuelCommand::SetStance(_) => "set_stance",
            DuelCommand::Commit => "commit",
            DuelCommand::SetAttackDirection(_) => "set_attack_direction",
            DuelCommand::SetDefenseDirection(_) => "set_defense_direction",
            DuelCommand::LightAttack => "light_attack",
            DuelCommand::HeavyAttack => "heavy_attack",
            DuelCommand::Parry => "parry",
            DuelCommand::Dodge => "dodge",
            DuelCommand::Meditate(_) => "meditate",
            DuelCommand::Execute => "execute",
        }
    }
}

/// Why a command was refused. Rejections never touch focus or timers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    NoDirection,
    InsufficientFocus { needed: f32, available: f32 },
    Locked,
    Committed,
    Executable,
    Meditating,
    TargetNotExecutable,
    /// The command does not exist under the active rule set.
    WrongRuleSet,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::NoDirection => "no_direction",
            RejectReason::InsufficientFocus { .. } => "insufficient_focus",
            RejectReason::Locked => "locked",
            RejectReason::Committed => "committed",
            RejectReason::Executable => "executable",
            RejectReason::Meditating => "meditating",
            RejectReason::TargetNotExecutable => "target_not_executable",
            RejectReason::WrongRuleSet => "wrong_rule_set",
        }
    }
}
