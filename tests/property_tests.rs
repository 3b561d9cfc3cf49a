//! Property-based tests using proptest
//!
//! Invariants that must hold for ALL inputs:
//! - Focus: any sequence of use/gain stays inside [0, focus_max]
//! - Resolver: pure, dodge wins, executable defenders always take the hit
//! - Stance input: combo discount never drops below the floor
//! - Duel: arbitrary command streams are deterministic and keep focus bounded

use proptest::prelude::*;

use duel_core::combat::{
    AttackIntent, CombatResult, CombatantId, CombatantState, Direction, DirectionResolver,
    FocusEconomy, RuleSet,
};
use duel_core::config::DuelConfig;
use duel_core::duel::{Duel, DuelEvent, NoDamage};
use duel_core::input::DuelCommand;

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::Up),
        Just(Direction::Down),
        Just(Direction::Left),
        Just(Direction::Right),
    ]
}

fn rule_set() -> impl Strategy<Value = RuleSet> {
    prop_oneof![Just(RuleSet::Commit), Just(RuleSet::Parry)]
}

fn command() -> impl Strategy<Value = DuelCommand> {
    prop_oneof![
        direction().prop_map(DuelCommand::Press),
        direction().prop_map(DuelCommand::SetStance),
        Just(DuelCommand::Commit),
        direction().prop_map(DuelCommand::SetAttackDirection),
        direction().prop_map(DuelCommand::SetDefenseDirection),
        Just(DuelCommand::LightAttack),
        Just(DuelCommand::HeavyAttack),
        Just(DuelCommand::Parry),
        Just(DuelCommand::Dodge),
        any::<bool>().prop_map(DuelCommand::Meditate),
        Just(DuelCommand::Execute),
    ]
}

#[derive(Debug, Clone)]
enum FocusOp {
    Use(f32),
    Gain(f32),
}

fn focus_op() -> impl Strategy<Value = FocusOp> {
    let amount = prop_oneof![
        -50.0f32..250.0,
        Just(f32::NAN),
        Just(f32::INFINITY),
        Just(0.0f32),
    ];
    prop_oneof![
        amount.clone().prop_map(FocusOp::Use),
        amount.prop_map(FocusOp::Gain),
    ]
}

fn defender(guard: Direction, rules: RuleSet) -> CombatantState {
    let mut state = CombatantState::new(CombatantId::Opponent, 100.0);
    match rules {
        RuleSet::Commit => {
            state.set_stance(guard);
        }
        RuleSet::Parry => {
            state.set_defense_direction(guard);
        }
    }
    state
}

// ============================================================
// Focus economy
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_focus_stays_in_bounds(ops in prop::collection::vec(focus_op(), 1..60)) {
        let config = DuelConfig::commit_mode();
        let economy = FocusEconomy::new(config.focus.clone(), RuleSet::Commit);
        let mut state = CombatantState::new(CombatantId::Player, config.focus.focus_max);
        for op in ops {
            match op {
                FocusOp::Use(a) => { economy.use_focus(&mut state, a); }
                FocusOp::Gain(a) => { economy.gain_focus(&mut state, a); }
            }
            prop_assert!(state.focus() >= 0.0);
            prop_assert!(state.focus() <= state.focus_max());
            prop_assert!(state.focus().is_finite());
        }
    }

    #[test]
    fn prop_no_regen_once_executable(spend in 80.0f32..200.0, ticks in 1usize..600) {
        let config = DuelConfig::commit_mode();
        let economy = FocusEconomy::new(config.focus.clone(), RuleSet::Commit);
        let mut state = CombatantState::new(CombatantId::Player, 100.0);
        economy.use_focus(&mut state, spend);
        economy.check_executable(&mut state);
        prop_assert!(state.is_executable());
        let focus = state.focus();
        for _ in 0..ticks {
            prop_assert_eq!(economy.regen(&mut state, 1.0 / 60.0), 0.0);
        }
        prop_assert_eq!(state.focus(), focus);
    }
}

// ============================================================
// Direction resolver
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn prop_resolve_is_pure(
        attack in direction(),
        guard in direction(),
        parrying in any::<bool>(),
        heavy in any::<bool>(),
        rules in rule_set(),
    ) {
        let resolver = DirectionResolver::new(&DuelConfig::for_rule_set(rules));
        let mut state = defender(guard, rules);
        if parrying {
            state.activate_parry(0.25);
        }
        let mut intent = AttackIntent::new(CombatantId::Player, attack, 20.0, 6.0);
        intent.is_heavy = heavy;
        let first = resolver.resolve(&intent, &state);
        let second = resolver.resolve(&intent, &state);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_dodge_always_wins(
        attack in direction(),
        guard in direction(),
        parrying in any::<bool>(),
        heavy in any::<bool>(),
        rules in rule_set(),
    ) {
        let resolver = DirectionResolver::new(&DuelConfig::for_rule_set(rules));
        let mut state = defender(guard, rules);
        state.activate_dodge(0.4);
        if parrying {
            state.activate_parry(0.25);
        }
        let mut intent = AttackIntent::new(CombatantId::Player, attack, 25.0, 12.0);
        intent.is_heavy = heavy;
        let resolution = resolver.resolve(&intent, &state);
        prop_assert_eq!(resolution.result, CombatResult::Dodged);
        prop_assert!(!resolution.applies_damage);
        prop_assert_eq!(resolution.defender_focus_delta, 0.0);
    }

    #[test]
    fn prop_executable_defender_always_hit(
        attack in direction(),
        guard in direction(),
        dodging in any::<bool>(),
        parrying in any::<bool>(),
        rules in rule_set(),
    ) {
        let config = DuelConfig::for_rule_set(rules);
        let economy = FocusEconomy::new(config.focus.clone(), rules);
        let resolver = DirectionResolver::new(&config);
        let mut state = defender(guard, rules);
        economy.use_focus(&mut state, 100.0);
        economy.check_executable(&mut state);
        if dodging {
            state.activate_dodge(0.4);
        }
        if parrying {
            state.activate_parry(0.25);
        }
        let intent = AttackIntent::new(CombatantId::Player, attack, 20.0, 6.0);
        let resolution = resolver.resolve(&intent, &state);
        prop_assert_eq!(resolution.result, CombatResult::Hit);
        prop_assert!(resolution.applies_damage);
    }

    #[test]
    fn prop_commit_rules_match_means_block(attack in direction(), guard in direction(), heavy in any::<bool>()) {
        let resolver = DirectionResolver::new(&DuelConfig::commit_mode());
        let state = defender(guard, RuleSet::Commit);
        let mut intent = AttackIntent::new(CombatantId::Player, attack, 20.0, 20.0);
        intent.is_heavy = heavy;
        let resolution = resolver.resolve(&intent, &state);
        if attack == guard {
            prop_assert_eq!(resolution.result, CombatResult::Blocked);
            prop_assert!(resolution.defender_focus_delta > 0.0);
        } else {
            prop_assert_eq!(resolution.result, CombatResult::Hit);
            prop_assert!(resolution.defender_focus_delta < 0.0);
        }
    }
}

// ============================================================
// Stance input and the full duel
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_combo_discount_has_floor(changes in 1usize..20) {
        let config = DuelConfig::commit_mode();
        let base = config.costs.stance_change;
        let mut duel = Duel::new(config, NoDamage);
        let mut costs = Vec::new();
        for i in 0..changes {
            let target = if i % 2 == 0 { Direction::Left } else { Direction::Right };
            duel.submit(CombatantId::Player, DuelCommand::SetStance(target));
            for event in duel.tick(1.0 / 60.0).events {
                if let DuelEvent::StanceChanged { cost, .. } = event {
                    costs.push(cost);
                }
            }
        }
        prop_assert_eq!(costs.len(), changes);
        for (i, cost) in costs.iter().enumerate() {
            let n = (i + 1).min(5) as f32;
            let expected = base * (1.0 - 0.1 * n).max(0.5);
            prop_assert!((cost - expected).abs() < 1e-4, "change {}: {} vs {}", i + 1, cost, expected);
        }
    }

    #[test]
    fn prop_command_streams_are_deterministic(
        rules in rule_set(),
        seed in any::<u64>(),
        script in prop::collection::vec((any::<bool>(), command(), 0u32..20), 1..40),
    ) {
        let run = || {
            let mut duel = Duel::new(DuelConfig::for_rule_set(rules).with_seed(seed), NoDamage);
            let mut events = Vec::new();
            for (player, command, wait) in &script {
                let side = if *player { CombatantId::Player } else { CombatantId::Opponent };
                duel.submit(side, *command);
                for _ in 0..=*wait {
                    events.extend(duel.tick(1.0 / 60.0).events);
                    for id in CombatantId::BOTH {
                        let focus = duel.state(id).focus();
                        assert!((0.0..=100.0).contains(&focus), "focus out of bounds: {focus}");
                    }
                }
            }
            events
        };
        prop_assert_eq!(run(), run());
    }
}
