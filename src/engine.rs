//! The typing engine: routes filtered key events into a [`Session`], keeps the
//! per-letter tallies and the sampled elapsed time, and derives character
//! states and [`TypingStats`] on demand.
//!
//! Completion statistics are finalized one turn after the keystroke that
//! completed the text (see [`TypingEngine::run_deferred`]). Everything the
//! finalization needs is captured by value at the moment the last keystroke is
//! handled, and the finalization is dropped if the session has been discarded
//! in between.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::key_filter::{KeyAction, KeyFilter, RawKeyEvent};
use crate::layout::{KeyboardLayoutMap, LayoutId};
use crate::script::fold;
use crate::session::{Session, SessionStatus};
use crate::stats::{LetterStats, TypingStats, MIN_ELAPSED_MS};

/// Callbacks for collaborators (games, achievements, dashboards)
pub trait EngineListener {
    /// Every forwarded character keystroke, right or wrong
    fn on_character_typed(&mut self, _typed: char, _correct: bool) {}
    /// Mismatched keystrokes, after `on_character_typed`
    fn on_error(&mut self, _typed: char, _expected: char) {}
    /// Exactly once per completed session
    fn on_complete(&mut self, _stats: &TypingStats) {}
    fn on_layout_mismatch(&mut self, _detected: LayoutId) {}
    /// The reset key combination was pressed
    fn on_reset(&mut self) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl EngineListener for NoopListener {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharStatus {
    Pending,
    Current,
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterState {
    pub ch: char,
    pub index: usize,
    pub status: CharStatus,
}

/// What a key event did to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Ignored,
    Typed {
        typed: char,
        expected: char,
        correct: bool,
    },
    Backspace,
    Enter,
    Escape,
    ResetCombo,
    LayoutMismatch(LayoutId),
}

/// Inputs of the completion snapshot, frozen when the last character lands
#[derive(Debug, Clone)]
struct PendingCompletion {
    epoch: u64,
    started_at: Instant,
    finished_at: Instant,
    paused_total: Duration,
    cursor: usize,
    errors: usize,
    total: usize,
    letters: LetterStats,
}

pub struct TypingEngine<L: EngineListener = NoopListener> {
    config: EngineConfig,
    filter: KeyFilter,
    session: Session,
    letters: LetterStats,
    clock: Arc<dyn Clock>,
    elapsed: Duration,
    ticking: bool,
    pending: Option<PendingCompletion>,
    final_stats: Option<TypingStats>,
    listener: L,
}

impl TypingEngine<NoopListener> {
    pub fn with_defaults(
        config: EngineConfig,
        layouts: Arc<KeyboardLayoutMap>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(config, layouts, clock, NoopListener)
    }
}

impl<L: EngineListener> TypingEngine<L> {
    pub fn new(
        config: EngineConfig,
        layouts: Arc<KeyboardLayoutMap>,
        clock: Arc<dyn Clock>,
        listener: L,
    ) -> Self {
        let filter = KeyFilter::new(layouts, config.allow_backspace, config.expected_layout);
        Self {
            config,
            filter,
            session: Session::new(),
            letters: LetterStats::new(),
            clock,
            elapsed: Duration::ZERO,
            ticking: false,
            pending: None,
            final_stats: None,
            listener,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn letter_stats(&self) -> &LetterStats {
        &self.letters
    }

    pub fn expected_char(&self) -> Option<char> {
        self.session.expected_char()
    }

    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    pub fn has_pending_completion(&self) -> bool {
        self.pending.is_some()
    }

    pub fn final_stats(&self) -> Option<&TypingStats> {
        self.final_stats.as_ref()
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    /// Load a fresh attempt
    pub fn set_target_text(&mut self, text: &str) {
        self.session.set_target_text(text);
        self.clear_progress();
        log::debug!("new target text ({} chars)", self.session.len());
    }

    /// Replace the text, keeping cursor, errors and timing. Text that does not
    /// reach past the cursor is ignored.
    pub fn update_target_text(&mut self, text: &str) -> bool {
        let replaced = self.session.update_target_text(text);
        if !replaced {
            log::debug!(
                "ignoring text update ({} chars) at cursor {}",
                text.chars().count(),
                self.session.cursor()
            );
        }
        replaced
    }

    /// Extend the text for endless practice
    pub fn append_text(&mut self, more: &str) {
        let mut text = self.session.target_text();
        text.push_str(more);
        self.update_target_text(&text);
    }

    pub fn start(&mut self) {
        if self.session.is_empty() || self.session.is_complete() {
            return;
        }
        self.session.start(self.clock.now());
        self.ticking = true;
        log::debug!("session started");
    }

    pub fn pause(&mut self) {
        if self.session.status() != SessionStatus::Running {
            return;
        }
        self.session.pause(self.clock.now());
        self.ticking = false;
        log::debug!("session paused at {:?}", self.elapsed);
    }

    pub fn resume(&mut self) {
        if self.session.status() != SessionStatus::Paused {
            return;
        }
        self.session.resume(self.clock.now());
        self.ticking = true;
    }

    /// Discard the attempt, optionally loading `new_text` right away.
    ///
    /// A completion still waiting in [`run_deferred`](Self::run_deferred)
    /// becomes a no-op.
    pub fn reset(&mut self, new_text: Option<&str>) {
        self.session.reset();
        self.clear_progress();
        log::debug!("session reset");
        if let Some(text) = new_text {
            self.set_target_text(text);
        }
    }

    fn clear_progress(&mut self) {
        self.pending = None;
        self.letters.clear();
        self.elapsed = Duration::ZERO;
        self.ticking = false;
        self.final_stats = None;
    }

    /// Elapsed-time sampling, driven by the host's periodic tick
    pub fn on_tick(&mut self) {
        if self.ticking && self.session.status() == SessionStatus::Running {
            self.elapsed = self.session.elapsed(self.clock.now());
        }
    }

    pub fn handle_key(&mut self, event: &RawKeyEvent) -> Dispatch {
        match self.filter.classify(event) {
            KeyAction::Character(c) => self.type_char(c),
            KeyAction::Backspace => {
                if self.session.is_complete() || self.session.cursor() == 0 {
                    return Dispatch::Ignored;
                }
                self.session.apply_backspace();
                Dispatch::Backspace
            }
            KeyAction::LayoutMismatch(detected) => {
                self.listener.on_layout_mismatch(detected);
                Dispatch::LayoutMismatch(detected)
            }
            KeyAction::ResetCombo => {
                self.listener.on_reset();
                Dispatch::ResetCombo
            }
            KeyAction::Enter => Dispatch::Enter,
            KeyAction::Escape => Dispatch::Escape,
            KeyAction::Ignored => Dispatch::Ignored,
        }
    }

    fn type_char(&mut self, typed: char) -> Dispatch {
        let Some(expected) = self.session.expected_char() else {
            return Dispatch::Ignored;
        };
        match self.session.status() {
            SessionStatus::Complete => return Dispatch::Ignored,
            SessionStatus::Idle => self.start(),
            SessionStatus::Paused => self.resume(),
            SessionStatus::Running => {}
        }

        let correct = self.matches(typed, expected);
        self.letters.record(expected, correct);

        let now = self.clock.now();
        let completes = self.session.cursor() + 1 == self.session.len();
        let started_at = self.session.started_at().unwrap_or(now);
        let paused_total = self.session.paused_total();

        self.session.apply_keystroke(correct, now);

        if completes {
            self.pending = Some(PendingCompletion {
                epoch: self.session.epoch(),
                started_at,
                finished_at: now,
                paused_total,
                cursor: self.session.cursor(),
                errors: self.session.error_count(),
                total: self.session.len(),
                letters: self.letters.clone(),
            });
        }

        self.listener.on_character_typed(typed, correct);
        if !correct {
            self.listener.on_error(typed, expected);
        }

        Dispatch::Typed {
            typed,
            expected,
            correct,
        }
    }

    fn matches(&self, typed: char, expected: char) -> bool {
        if self.config.case_sensitive {
            typed == expected
        } else {
            fold(typed) == fold(expected)
        }
    }

    /// Run work deferred to the next turn of the host loop. Returns true if a
    /// completion was finalized and reported.
    pub fn run_deferred(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        if self.session.is_empty_state() || self.session.epoch() != pending.epoch {
            log::debug!("dropping completion of a discarded session");
            return false;
        }

        let active = pending
            .finished_at
            .saturating_duration_since(pending.started_at)
            .saturating_sub(pending.paused_total);
        let floored = active.max(Duration::from_millis(MIN_ELAPSED_MS));

        let mut stats = TypingStats::compute(
            pending.cursor,
            pending.errors,
            pending.total,
            floored,
            &pending.letters,
        );
        stats.completed_at = Some(Local::now());

        self.elapsed = active;
        self.ticking = false;
        log::info!(
            "session complete: {} wpm, {}% accuracy, {} errors in {} ms",
            stats.wpm,
            stats.accuracy,
            stats.error_count,
            stats.elapsed_ms
        );
        self.listener.on_complete(&stats);
        self.final_stats = Some(stats);
        true
    }

    /// Per-character view of the target text
    pub fn characters(&self) -> Vec<CharacterState> {
        let cursor = self.session.cursor();
        let errors = self.session.errors();
        self.session
            .target()
            .iter()
            .enumerate()
            .map(|(index, &ch)| {
                let status = if index < cursor {
                    if errors.contains(&index) {
                        CharStatus::Incorrect
                    } else {
                        CharStatus::Correct
                    }
                } else if index == cursor {
                    CharStatus::Current
                } else {
                    CharStatus::Pending
                };
                CharacterState { ch, index, status }
            })
            .collect()
    }

    /// Elapsed time as the UI should show it
    pub fn elapsed(&self) -> Duration {
        if self.session.is_complete() {
            self.session.elapsed(self.clock.now())
        } else {
            self.elapsed
        }
    }

    /// Current statistics; the finalized snapshot once completion has run
    pub fn stats(&self) -> TypingStats {
        if let Some(stats) = &self.final_stats {
            return stats.clone();
        }
        TypingStats::compute(
            self.session.cursor(),
            self.session.error_count(),
            self.session.len(),
            self.elapsed(),
            &self.letters,
        )
    }
}
