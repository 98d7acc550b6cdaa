use std::sync::Arc;

use crate::identity::IdentityProvider;
use crate::metrics::{compute_metrics, elapsed_minutes, LiveMetrics};
use crate::record::{QualityFloor, ResultRecord};
use crate::runtime::{Clock, SystemClock};
use crate::session::{DurationMode, Session, Status};
use crate::submit::ResultSink;
use crate::text_supply::{TextSource, INITIAL_WORD_COUNT, LOW_WATER_WORDS, REFILL_WORDS};
use crate::typing_policy::{exceeds_overtype, exceeds_target, is_printable, Keystroke};

/// What happened to the result of a completed session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Session not complete yet
    Pending,
    /// Handed to the result sink
    Submitted,
    /// Did not clear the quality floor
    BelowFloor,
    /// No user signed in
    SignedOut,
}

/// Drives one typing session at a time: keystrokes, ticks, scoring and
/// the hand-off of the final result.
pub struct SessionEngine {
    session: Session,
    metrics: LiveMetrics,
    submission: Submission,
    result: Option<ResultRecord>,
    source: Box<dyn TextSource>,
    sink: Box<dyn ResultSink>,
    identity: Arc<dyn IdentityProvider>,
    clock: Box<dyn Clock>,
    floor: QualityFloor,
}

impl SessionEngine {
    pub fn new(
        source: Box<dyn TextSource>,
        sink: Box<dyn ResultSink>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            session: Session::new("", DurationMode::default()),
            metrics: LiveMetrics::default(),
            submission: Submission::Pending,
            result: None,
            source,
            sink,
            identity,
            clock: Box::new(SystemClock),
            floor: QualityFloor::default(),
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_quality_floor(mut self, floor: QualityFloor) -> Self {
        self.floor = floor;
        self
    }

    /// Reset to an idle session over `target`
    pub fn start(&mut self, target: &str, mode: DurationMode) {
        self.session = Session::new(target, mode);
        self.metrics = LiveMetrics::default();
        self.submission = Submission::Pending;
        self.result = None;
        tracing::debug!(%mode, chars = self.session.target.len(), "session reset");
    }

    /// Reset with fresh text from the text source
    pub fn restart(&mut self, mode: DurationMode) {
        let words = self.source.generate(INITIAL_WORD_COUNT);
        self.start(&words.join(" "), mode);
    }

    /// Apply a keystroke. Returns whether it was accepted.
    pub fn on_keystroke(&mut self, key: Keystroke) -> bool {
        if self.session.status == Status::Complete || self.session.target.is_empty() {
            return false;
        }

        match key {
            Keystroke::Delete => {
                if self.session.typed.pop().is_none() {
                    return false;
                }
            }
            Keystroke::Char(c) => {
                if !is_printable(c) {
                    return false;
                }
                let word_len = self
                    .session
                    .target_word_len(self.session.current_word_index());
                if exceeds_overtype(self.session.current_word_len(), word_len, c)
                    || exceeds_target(self.session.typed.len(), self.session.target.len())
                {
                    return false;
                }
                self.session.typed.push(c);
            }
        }

        if self.session.status == Status::Idle {
            self.session.status = Status::Running;
            self.session.started_at = Some(self.clock.now());
            tracing::debug!(mode = %self.session.mode, "session running");
        }

        self.refill();
        self.metrics = self.compute_metrics();

        if self.session.is_text_finished() {
            self.complete();
        }
        true
    }

    /// One second of test time
    pub fn on_tick(&mut self) {
        if self.session.status != Status::Running {
            return;
        }
        self.session.seconds_remaining = self.session.seconds_remaining.saturating_sub(1);
        if self.session.seconds_remaining == 0 {
            self.complete();
        }
    }

    /// Metrics for the current state, without storing them
    pub fn compute_metrics(&self) -> LiveMetrics {
        let until = self.session.ended_at.unwrap_or_else(|| self.clock.now());
        let minutes = elapsed_minutes(
            self.session.started_at,
            until,
            self.session.mode.secs(),
            self.session.seconds_remaining,
        );
        compute_metrics(&self.session.target, &self.session.typed, minutes)
    }

    fn complete(&mut self) {
        self.session.ended_at = Some(self.clock.now());
        self.session.status = Status::Complete;
        self.metrics = self.compute_metrics();
        tracing::info!(
            wpm = self.metrics.wpm,
            accuracy = self.metrics.accuracy,
            score = self.metrics.score,
            mode = %self.session.mode,
            "session complete"
        );
        self.emit_result();
    }

    fn emit_result(&mut self) {
        if self.submission != Submission::Pending {
            return;
        }

        let Some(user) = self.identity.current_user() else {
            tracing::debug!("no signed-in user; result kept local");
            self.submission = Submission::SignedOut;
            return;
        };

        if !self.floor.accepts(&self.metrics) {
            tracing::debug!(floor = ?self.floor, "result below quality floor; not submitted");
            self.submission = Submission::BelowFloor;
            return;
        }

        let created_at = self.session.ended_at.unwrap_or_else(|| self.clock.now());
        let record = ResultRecord::new(&user, self.metrics, self.session.mode, created_at);
        self.result = Some(record.clone());
        self.submission = Submission::Submitted;
        self.sink.submit(record);
    }

    /// Keep enough untyped words queued
    fn refill(&mut self) {
        while self.session.untyped_word_count() < LOW_WATER_WORDS {
            let words = self.source.generate(REFILL_WORDS);
            if words.is_empty() {
                break;
            }
            if self.session.target.last().is_some_and(|c| *c != ' ') {
                self.session.target.push(' ');
            }
            self.session.target.extend(words.join(" ").chars());
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn metrics(&self) -> LiveMetrics {
        self.metrics
    }

    pub fn status(&self) -> Status {
        self.session.status
    }

    pub fn mode(&self) -> DurationMode {
        self.session.mode
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.session.seconds_remaining
    }

    pub fn submission(&self) -> Submission {
        self.submission
    }

    /// The record handed to the sink, if any
    pub fn result(&self) -> Option<&ResultRecord> {
        self.result.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.session.status == Status::Running
    }

    pub fn has_finished(&self) -> bool {
        self.session.has_finished()
    }
}
