use bevy::prelude::*;
use std::sync::{Arc, RwLock};

use crate::ai::AiProfile;
use crate::combat::CombatantId;
use crate::config::DuelConfig;
use crate::duel::{Duel, DuelEvent, HealthLedger, TracingSink};
use crate::input::DuelCommand;

/// Runs one duel inside a Bevy app.
///
/// `DuelInput` events are queued as commands, the duel advances once per
/// `Update` by `Time::delta_secs`, and every event it produces is sent back
/// out as a `DuelEventMessage`.
pub struct DuelPlugin {
    pub config: DuelConfig,
    pub ai: [Option<AiProfile>; 2],
    pub max_health: f32,
}

impl DuelPlugin {
    pub fn new(config: DuelConfig) -> Self {
        Self {
            config,
            ai: [None, None],
            max_health: 100.0,
        }
    }

    pub fn with_ai(mut self, id: CombatantId, profile: AiProfile) -> Self {
        self.ai[id.index()] = Some(profile);
        self
    }
}

impl Plugin for DuelPlugin {
    fn build(&self, app: &mut App) {
        let mut duel = Duel::new(self.config.clone(), HealthLedger::new(self.max_health))
            .with_sink(Box::new(TracingSink));
        for id in CombatantId::BOTH {
            duel.set_ai(id, self.ai[id.index()].clone());
        }

        app.insert_resource(DuelResource(Arc::new(RwLock::new(duel))))
            .add_event::<DuelInput>()
            .add_event::<DuelEventMessage>()
            .add_systems(Update, (duel_input_system, duel_tick_system).chain());
    }
}

#[derive(Resource, Clone)]
pub struct DuelResource(pub Arc<RwLock<Duel<HealthLedger>>>);

/// A command from whoever drives one side (keyboard, network, script).
#[derive(Event, Debug, Clone, Copy)]
pub struct DuelInput {
    pub side: CombatantId,
    pub command: DuelCommand,
}

#[derive(Event, Debug, Clone)]
pub struct DuelEventMessage(pub DuelEvent);

fn duel_input_system(mut inputs: EventReader<DuelInput>, duel_res: Res<DuelResource>) {
    if let Ok(mut duel) = duel_res.0.write() {
        for input in inputs.read() {
            duel.submit(input.side, input.command);
        }
    }
}

fn duel_tick_system(
    time: Res<Time>,
    duel_res: Res<DuelResource>,
    mut out: EventWriter<DuelEventMessage>,
) {
    let report = match duel_res.0.write() {
        Ok(mut duel) => duel.tick(time.delta_secs()),
        Err(_) => return,
    };
    for event in report.events {
        out.send(DuelEventMessage(event));
    }
}
