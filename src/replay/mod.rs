//! Deterministic replays.
//!
//! Workflow:
//! 1. Wrap a `Duel` in a `RecordedDuel` and drive it as usual
//! 2. Every submitted command is stored with the tick that will process it
//! 3. Every produced event is folded into a sha3 digest
//! 4. `finish()` seals the frames, config and digest behind a recording hash
//! 5. `ReplayPlayback` rebuilds the duel from config + seed, re-submits the
//!    frames and checks the digest matches

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use tracing::{debug, info, warn};

use crate::ai::AiProfile;
use crate::combat::CombatantId;
use crate::config::{DuelConfig, RuleSet};
use crate::duel::{DamageSink, Duel, DuelEvent, TickReport};
use crate::error::ReplayError;
use crate::input::DuelCommand;

pub const REPLAY_VERSION: u32 = 1;

/// One externally submitted command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputFrame {
    /// The tick that processes this command (1-based).
    pub tick: u64,
    pub side: CombatantId,
    pub command: DuelCommand,
}

impl InputFrame {
    pub fn new(tick: u64, side: CombatantId, command: DuelCommand) -> Self {
        Self { tick, side, command }
    }

    pub fn hash(&self) -> u64 {
        let mut hasher = Sha3_256::new();
        hasher.update(self.tick.to_le_bytes());
        hasher.update([self.side.index() as u8]);
        // Serializing a plain enum cannot fail.
        hasher.update(serde_json::to_vec(&self.command).unwrap_or_default());
        first_u64(&hasher.finalize())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayHeader {
    pub version: u32,
    pub seed: u64,
    pub rule_set: RuleSet,
    pub tick_dt: f32,
    pub duration_ticks: u64,
    pub total_frames: usize,
    pub winner: Option<CombatantId>,
    /// Hex sha3 over every event the recorded run produced.
    pub event_digest: String,
}

/// Running sha3 over an event stream. Events are hashed as JSON.
#[derive(Clone, Default)]
pub struct EventDigest {
    hasher: Sha3_256,
    count: u64,
}

impl EventDigest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, event: &DuelEvent) {
        match serde_json::to_vec(event) {
            Ok(bytes) => {
                self.hasher.update((bytes.len() as u64).to_le_bytes());
                self.hasher.update(&bytes);
                self.count += 1;
            }
            Err(err) => warn!(error = %err, kind = event.kind(), "Event left out of digest"),
        }
    }

    pub fn extend<'a>(&mut self, events: impl IntoIterator<Item = &'a DuelEvent>) {
        for event in events {
            self.update(event);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn finish(self) -> String {
        self.hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

/// Everything needed to rebuild and verify a duel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayRecording {
    pub header: ReplayHeader,
    pub config: DuelConfig,
    pub ai: [Option<AiProfile>; 2],
    pub frames: Vec<InputFrame>,
    pub recording_hash: u64,
}

impl ReplayRecording {
    pub fn new(
        header: ReplayHeader,
        config: DuelConfig,
        ai: [Option<AiProfile>; 2],
        frames: Vec<InputFrame>,
    ) -> Self {
        let mut recording = Self {
            header,
            config,
            ai,
            frames,
            recording_hash: 0,
        };
        recording.recording_hash = recording.compute_hash();
        recording
    }

    fn compute_hash(&self) -> u64 {
        let mut hasher = Sha3_256::new();
        hasher.update(self.header.version.to_le_bytes());
        hasher.update(self.header.seed.to_le_bytes());
        hasher.update(self.header.rule_set.as_str().as_bytes());
        hasher.update(self.header.tick_dt.to_bits().to_le_bytes());
        hasher.update(self.header.duration_ticks.to_le_bytes());
        hasher.update((self.header.total_frames as u64).to_le_bytes());
        let winner: u8 = match self.header.winner {
            None => 0,
            Some(CombatantId::Player) => 1,
            Some(CombatantId::Opponent) => 2,
        };
        hasher.update([winner]);
        hasher.update(self.header.event_digest.as_bytes());
        hasher.update(ron::to_string(&self.config).unwrap_or_default().as_bytes());
        hasher.update(ron::to_string(&self.ai).unwrap_or_default().as_bytes());
        for frame in &self.frames {
            hasher.update(frame.hash().to_le_bytes());
        }
        first_u64(&hasher.finalize())
    }

    /// Version and integrity check. Does not replay anything.
    pub fn verify(&self) -> Result<(), ReplayError> {
        if self.header.version != REPLAY_VERSION {
            return Err(ReplayError::UnsupportedVersion(self.header.version));
        }
        let computed = self.compute_hash();
        if computed != self.recording_hash {
            return Err(ReplayError::IntegrityMismatch {
                stored: self.recording_hash,
                computed,
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ReplayError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A duel that records what is submitted to it.
pub struct RecordedDuel<D: DamageSink> {
    duel: Duel<D>,
    tick_dt: f32,
    frames: Vec<InputFrame>,
    digest: EventDigest,
}

impl<D: DamageSink> RecordedDuel<D> {
    /// Recording starts from the duel's current state, so pass a fresh one.
    pub fn new(duel: Duel<D>, tick_dt: f32) -> Self {
        info!(seed = duel.config().seed, tick_dt, "Replay recording started");
        Self {
            duel,
            tick_dt,
            frames: Vec::new(),
            digest: EventDigest::new(),
        }
    }

    pub fn duel(&self) -> &Duel<D> {
        &self.duel
    }

    pub fn submit(&mut self, side: CombatantId, command: DuelCommand) {
        self.frames
            .push(InputFrame::new(self.duel.ticks() + 1, side, command));
        self.duel.submit(side, command);
    }

    /// One fixed step.
    pub fn tick(&mut self) -> TickReport {
        let report = self.duel.tick(self.tick_dt);
        self.digest.extend(&report.events);
        report
    }

    pub fn finish(self) -> (ReplayRecording, Duel<D>) {
        let config = self.duel.config().clone();
        let header = ReplayHeader {
            version: REPLAY_VERSION,
            seed: config.seed,
            rule_set: config.rule_set,
            tick_dt: self.tick_dt,
            duration_ticks: self.duel.ticks(),
            total_frames: self.frames.len(),
            winner: self.duel.winner(),
            event_digest: self.digest.finish(),
        };
        let ai = [
            self.duel.ai_profile(CombatantId::Player).cloned(),
            self.duel.ai_profile(CombatantId::Opponent).cloned(),
        ];
        info!(
            ticks = header.duration_ticks,
            frames = header.total_frames,
            "Replay recording finished"
        );
        (ReplayRecording::new(header, config, ai, self.frames), self.duel)
    }
}

/// Steps a rebuilt duel through a recording one tick at a time.
pub struct ReplayPlayback<'r, D: DamageSink> {
    recording: &'r ReplayRecording,
    duel: Duel<D>,
    next_frame: usize,
    digest: EventDigest,
}

impl<'r, D: DamageSink> ReplayPlayback<'r, D> {
    /// `damage` must start in the same state as the recorded duel's sink.
    pub fn new(recording: &'r ReplayRecording, damage: D) -> Result<Self, ReplayError> {
        recording.verify()?;
        recording.config.validate()?;
        let mut duel = Duel::new(recording.config.clone(), damage);
        for id in CombatantId::BOTH {
            duel.set_ai(id, recording.ai[id.index()].clone());
        }
        Ok(Self {
            recording,
            duel,
            next_frame: 0,
            digest: EventDigest::new(),
        })
    }

    pub fn duel(&self) -> &Duel<D> {
        &self.duel
    }

    pub fn is_finished(&self) -> bool {
        self.duel.ticks() >= self.recording.header.duration_ticks
    }

    pub fn progress(&self) -> f32 {
        let total = self.recording.header.duration_ticks;
        if total == 0 {
            return 1.0;
        }
        (self.duel.ticks() as f32 / total as f32).clamp(0.0, 1.0)
    }

    /// Replay the next tick, or `None` once the recording is exhausted.
    pub fn step(&mut self) -> Option<TickReport> {
        if self.is_finished() {
            return None;
        }
        let tick = self.duel.ticks() + 1;
        while let Some(frame) = self.recording.frames.get(self.next_frame) {
            if frame.tick > tick {
                break;
            }
            self.duel.submit(frame.side, frame.command);
            self.next_frame += 1;
        }
        let report = self.duel.tick(self.recording.header.tick_dt);
        self.digest.extend(&report.events);
        Some(report)
    }

    /// Run to the end and compare digests.
    pub fn finish(mut self) -> Result<Duel<D>, ReplayError> {
        while self.step().is_some() {}
        let actual = self.digest.finish();
        if actual != self.recording.header.event_digest {
            warn!(
                expected = %self.recording.header.event_digest,
                actual = %actual,
                "Replay diverged"
            );
            return Err(ReplayError::Diverged {
                expected: self.recording.header.event_digest.clone(),
                actual,
            });
        }
        debug!(ticks = self.duel.ticks(), "Replay verified");
        Ok(self.duel)
    }
}

/// Replay a recording end to end and return the resulting duel.
pub fn verify_playback<D: DamageSink>(
    recording: &ReplayRecording,
    damage: D,
) -> Result<Duel<D>, ReplayError> {
    ReplayPlayback::new(recording, damage)?.finish()
}

fn first_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::Direction;
    use crate::duel::HealthLedger;

    const DT: f32 = 1.0 / 60.0;

    fn record_commit_exchange() -> ReplayRecording {
        let duel = Duel::new(DuelConfig::commit_mode().with_seed(9), HealthLedger::new(1000.0))
            .with_ai(CombatantId::Opponent, AiProfile::stance_duelist());
        let mut rec = RecordedDuel::new(duel, DT);
        for i in 0..240u32 {
            if i % 60 == 0 {
                rec.submit(CombatantId::Player, DuelCommand::Press(Direction::Left));
                rec.submit(CombatantId::Player, DuelCommand::Press(Direction::Left));
            }
            if i % 60 == 30 {
                rec.submit(CombatantId::Player, DuelCommand::SetStance(Direction::Up));
            }
            rec.tick();
        }
        rec.finish().0
    }

    #[test]
    fn test_frame_hash_deterministic() {
        let a = InputFrame::new(3, CombatantId::Player, DuelCommand::Commit);
        let b = InputFrame::new(3, CombatantId::Player, DuelCommand::Commit);
        let c = InputFrame::new(3, CombatantId::Opponent, DuelCommand::Commit);
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn test_recording_replays_identically() {
        let recording = record_commit_exchange();
        assert_eq!(recording.header.duration_ticks, 240);
        assert_eq!(recording.header.total_frames, 12);
        assert_eq!(recording.header.event_digest.len(), 64);
        let duel = verify_playback(&recording, HealthLedger::new(1000.0)).unwrap();
        assert_eq!(duel.ticks(), 240);
    }

    #[test]
    fn test_tampered_frames_fail_integrity() {
        let mut recording = record_commit_exchange();
        recording.frames[0].command = DuelCommand::Press(Direction::Right);
        assert!(matches!(
            recording.verify(),
            Err(ReplayError::IntegrityMismatch { .. })
        ));
    }

    #[test]
    fn test_swapped_ai_profile_fails_integrity() {
        let mut recording = record_commit_exchange();
        recording.ai[1] = Some(AiProfile::telegraphing_duelist());
        assert!(matches!(
            recording.verify(),
            Err(ReplayError::IntegrityMismatch { .. })
        ));
    }

    #[test]
    fn test_edited_header_fails_integrity() {
        let mut recording = record_commit_exchange();
        recording.header.winner = Some(CombatantId::Player);
        assert!(recording.verify().is_err());

        let mut recording = record_commit_exchange();
        recording.header.total_frames += 1;
        assert!(recording.verify().is_err());
    }

    #[test]
    fn test_resealed_tampering_diverges() {
        let original = record_commit_exchange();
        let mut frames = original.frames.clone();
        frames[0].command = DuelCommand::Press(Direction::Down);
        let forged = ReplayRecording::new(
            original.header.clone(),
            original.config.clone(),
            original.ai.clone(),
            frames,
        );
        assert!(forged.verify().is_ok());
        assert!(matches!(
            verify_playback(&forged, HealthLedger::new(1000.0)),
            Err(ReplayError::Diverged { .. })
        ));
    }

    #[test]
    fn test_json_roundtrip_keeps_integrity() {
        let recording = record_commit_exchange();
        let json = recording.to_json().unwrap();
        let back = ReplayRecording::from_json(&json).unwrap();
        assert!(back.verify().is_ok());
        let mut playback = ReplayPlayback::new(&back, HealthLedger::new(1000.0)).unwrap();
        assert_eq!(playback.progress(), 0.0);
        playback.step();
        assert!(playback.progress() > 0.0);
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut recording = record_commit_exchange();
        recording.header.version = 99;
        assert!(matches!(
            recording.verify(),
            Err(ReplayError::UnsupportedVersion(99))
        ));
    }
}
