//! Timed multi-step AI routines.
//!
//! A plan is a queue of steps, each with a delay measured from the step
//! before it. While a plan is running the AI makes no new decisions, so a
//! feint's stance changes and its commit cannot be interleaved with
//! anything else.

use std::collections::VecDeque;

use crate::combat::Direction;
use crate::input::DuelCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    Strike,
    Feint,
    Counter,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TimedStep {
    delay: f32,
    command: DuelCommand,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    kind: PlanKind,
    steps: VecDeque<TimedStep>,
}

impl Plan {
    pub fn new(kind: PlanKind) -> Self {
        Self {
            kind,
            steps: VecDeque::new(),
        }
    }

    pub fn then(mut self, delay: f32, command: DuelCommand) -> Self {
        self.steps.push_back(TimedStep {
            delay: delay.max(0.0),
            command,
        });
        self
    }

    /// Commit rules: decoy stance changes, the real stance, then commit.
    pub fn feint(decoys: &[Direction], target: Direction, step_delay: f32, commit_delay: f32) -> Self {
        let mut plan = Plan::new(PlanKind::Feint);
        for (i, decoy) in decoys.iter().enumerate() {
            let delay = if i == 0 { 0.0 } else { step_delay };
            plan = plan.then(delay, DuelCommand::SetStance(*decoy));
        }
        let target_delay = if decoys.is_empty() { 0.0 } else { step_delay };
        plan.then(target_delay, DuelCommand::SetStance(target))
            .then(commit_delay, DuelCommand::Commit)
    }

    pub fn kind(&self) -> PlanKind {
        self.kind
    }

    pub fn is_finished(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Advance by `dt` and return every step now due, in order.
    pub fn advance(&mut self, dt: f32) -> Vec<DuelCommand> {
        let mut due = Vec::new();
        if let Some(front) = self.steps.front_mut() {
            front.delay -= dt;
        }
        while let Some(front) = self.steps.front() {
            if front.delay > 0.0 {
                break;
            }
            if let Some(timed) = self.steps.pop_front() {
                due.push(timed.command);
            }
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_delay_steps_fire_together() {
        let mut plan = Plan::new(PlanKind::Strike)
            .then(0.0, DuelCommand::SetStance(Direction::Left))
            .then(0.3, DuelCommand::Commit);
        let first = plan.advance(0.016);
        assert_eq!(first, vec![DuelCommand::SetStance(Direction::Left)]);
        assert!(plan.advance(0.2).is_empty());
        assert!(plan.advance(0.2).len() == 1);
        assert!(plan.is_finished());
    }

    #[test]
    fn test_feint_sequence_shape() {
        let mut plan = Plan::feint(&[Direction::Down, Direction::Right], Direction::Left, 0.15, 0.2);
        assert_eq!(plan.kind(), PlanKind::Feint);
        assert_eq!(plan.len(), 4);
        let mut fired = Vec::new();
        for _ in 0..60 {
            fired.extend(plan.advance(1.0 / 60.0));
        }
        assert_eq!(
            fired,
            vec![
                DuelCommand::SetStance(Direction::Down),
                DuelCommand::SetStance(Direction::Right),
                DuelCommand::SetStance(Direction::Left),
                DuelCommand::Commit,
            ]
        );
    }
}
