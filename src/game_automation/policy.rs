//! Turn policy: match and round bookkeeping plus the per-round plan
//!
//! The classifier loop feeds detected signals in; the policy answers what the
//! own-round handler should do and hands back finished `MatchRecord`s to persist.

use super::actions::SlotBaseline;
use super::match_image::ShieldTarget;
use super::stats::{MatchRecord, RUN_ID_FORMAT};
use chrono::{DateTime, Local};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    NotInMatch,
    OwnTurnActive,
    PausedForShield,
}

/// Scripted sequence chosen for an own round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPlan {
    PlayAndAttack,
    PlayEvolveAttack,
    Forfeit,
}

impl RoundPlan {
    pub const FORFEIT_AFTER_ROUND: u32 = 12;

    pub fn for_round(round: u32) -> Self {
        match round {
            4..=8 => RoundPlan::PlayEvolveAttack,
            r if r > Self::FORFEIT_AFTER_ROUND => RoundPlan::Forfeit,
            _ => RoundPlan::PlayAndAttack,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchState {
    pub round: u32,
    pub started_at: DateTime<Local>,
    pub baseline: Option<Vec<SlotBaseline>>,
}

impl MatchState {
    fn starting_at(round: u32, started_at: DateTime<Local>) -> Self {
        Self {
            round,
            started_at,
            baseline: None,
        }
    }
}

/// Process-wide run state
#[derive(Debug, Clone)]
pub struct RunSession {
    pub started_at: DateTime<Local>,
    pub running: bool,
    pub paused: bool,
    pub matches_played: u32,
}

impl RunSession {
    pub fn new(started_at: DateTime<Local>) -> Self {
        Self {
            started_at,
            running: true,
            paused: false,
            matches_played: 0,
        }
    }

    /// Identifier stamped on every record written by this run
    pub fn run_id(&self) -> String {
        self.started_at.format(RUN_ID_FORMAT).to_string()
    }
}

/// What the own-round handler should do this tick
#[derive(Debug, Clone, PartialEq)]
pub enum OwnRoundDecision {
    /// End-round button seen outside a match; treat it like any other button
    NotInMatch,
    /// A shield on our own board; stop and wait for the operator
    PauseForShield(ShieldTarget),
    Play { round: u32, plan: RoundPlan },
}

#[derive(Debug)]
pub struct TurnPolicy {
    session: RunSession,
    current: Option<MatchState>,
    state: TurnState,
    // one-shot: consumed by an own round, re-armed by an enemy round
    round_latch_armed: bool,
}

impl TurnPolicy {
    pub fn new(started_at: DateTime<Local>) -> Self {
        Self {
            session: RunSession::new(started_at),
            current: None,
            state: TurnState::NotInMatch,
            round_latch_armed: true,
        }
    }

    /// Duel start: close any match in progress, then begin a fresh one at round 1
    pub fn on_match_start(&mut self, now: DateTime<Local>) -> Option<MatchRecord> {
        let finished = self.close_match(now);
        if finished.is_some() {
            log::info!("🔁 New match detected, previous match closed");
        }
        self.begin(MatchState::starting_at(1, now));
        log::info!(
            "⚔️ ===== New match started ===== (matches this run: {})",
            self.session.matches_played
        );
        finished
    }

    /// Start-up probe found a match already running
    pub fn resume_existing(&mut self, round: u32, now: DateTime<Local>) {
        self.begin(MatchState::starting_at(round, now));
        log::info!("⚔️ Already in a match at start-up, assuming round {}", round);
    }

    fn begin(&mut self, state: MatchState) {
        self.current = Some(state);
        self.state = TurnState::OwnTurnActive;
        self.round_latch_armed = true;
        self.session.matches_played += 1;
    }

    pub fn on_enemy_round(&mut self) {
        self.round_latch_armed = true;
    }

    /// Board colours are sampled once, on the first own round of a match
    pub fn needs_baseline(&self) -> bool {
        matches!(&self.current, Some(m) if m.round == 1 && m.baseline.is_none())
    }

    pub fn store_baseline(&mut self, baseline: Vec<SlotBaseline>) {
        if let Some(m) = self.current.as_mut() {
            m.baseline = Some(baseline);
        }
    }

    pub fn baseline(&self) -> Option<&[SlotBaseline]> {
        self.current.as_ref().and_then(|m| m.baseline.as_deref())
    }

    /// Decide the own-round action given the own-side shield scan, advancing the round at most once
    pub fn on_own_round(&mut self, own_shields: &[ShieldTarget]) -> OwnRoundDecision {
        let Some(current) = self.current.as_mut() else {
            return OwnRoundDecision::NotInMatch;
        };

        if let Some(best) = own_shields.first() {
            self.session.paused = true;
            self.state = TurnState::PausedForShield;
            log::warn!(
                "🛡️ Own shielded follower at ({}, {}) conf {:.2}, pausing",
                best.x,
                best.y,
                best.confidence
            );
            return OwnRoundDecision::PauseForShield(*best);
        }

        let round = current.round;
        if self.round_latch_armed {
            current.round += 1;
            self.round_latch_armed = false;
        }
        OwnRoundDecision::Play {
            round,
            plan: RoundPlan::for_round(round),
        }
    }

    /// Finish the current match, if any, and build its record
    pub fn close_match(&mut self, now: DateTime<Local>) -> Option<MatchRecord> {
        let finished = self.current.take()?;
        self.state = TurnState::NotInMatch;
        let elapsed = (now - finished.started_at).to_std().unwrap_or_default();
        Some(MatchRecord::new(
            now,
            finished.round,
            elapsed,
            &self.session.run_id(),
        ))
    }

    pub fn pause(&mut self) {
        self.session.paused = true;
    }

    pub fn resume(&mut self) {
        self.session.paused = false;
        if self.state == TurnState::PausedForShield {
            self.state = TurnState::OwnTurnActive;
        }
    }

    pub fn quit(&mut self) {
        self.session.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.session.running
    }

    pub fn is_paused(&self) -> bool {
        self.session.paused
    }

    pub fn in_match(&self) -> bool {
        self.current.is_some()
    }

    /// Current round, 0 outside a match
    pub fn round(&self) -> u32 {
        self.current.as_ref().map(|m| m.round).unwrap_or(0)
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn session(&self) -> &RunSession {
        &self.session
    }
}
