use std::collections::BTreeSet;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Running,
    Paused,
    Complete,
}

/// One attempt at typing a target text.
///
/// Owned by whoever started the practice attempt. Every mutation keeps
/// `cursor <= target.len()` and `errors ⊆ [0, cursor)`; operations whose
/// preconditions do not hold are silent no-ops.
#[derive(Debug, Clone, Default)]
pub struct Session {
    target: Vec<char>,
    cursor: usize,
    errors: BTreeSet<usize>,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
    paused_at: Option<Instant>,
    paused_total: Duration,
    // bumped whenever the attempt is discarded or replaced
    epoch: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh attempt at `text`
    pub fn set_target_text(&mut self, text: &str) {
        let epoch = self.epoch + 1;
        *self = Self {
            target: text.chars().collect(),
            epoch,
            ..Self::default()
        };
    }

    /// Swap the text while keeping progress, for modes that stream in more
    /// material mid-run.
    ///
    /// The session only completes through a keystroke, so text that would
    /// leave nothing after the cursor is refused. Returns whether the text
    /// was replaced.
    pub fn update_target_text(&mut self, text: &str) -> bool {
        if self.is_complete() {
            return false;
        }
        let target: Vec<char> = text.chars().collect();
        if target.len() <= self.cursor {
            return false;
        }
        self.target = target;
        true
    }

    pub fn start(&mut self, now: Instant) {
        if self.is_complete() || self.target.is_empty() {
            return;
        }
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.resume(now);
    }

    pub fn pause(&mut self, now: Instant) {
        if self.status() == SessionStatus::Running {
            self.paused_at = Some(now);
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += now.saturating_duration_since(paused_at);
        }
    }

    pub fn apply_keystroke(&mut self, correct: bool, now: Instant) {
        if self.is_complete() || self.cursor >= self.target.len() {
            return;
        }
        if !correct {
            self.errors.insert(self.cursor);
        }
        self.cursor += 1;
        if self.is_complete() {
            self.resume(now);
            self.ended_at = Some(now);
        }
    }

    pub fn apply_backspace(&mut self) {
        if self.is_complete() || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        self.errors.remove(&self.cursor);
    }

    pub fn reset(&mut self) {
        let epoch = self.epoch + 1;
        *self = Self {
            epoch,
            ..Self::default()
        };
    }

    pub fn target(&self) -> &[char] {
        &self.target
    }

    pub fn target_text(&self) -> String {
        self.target.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn errors(&self) -> &BTreeSet<usize> {
        &self.errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn char_at(&self, idx: usize) -> Option<char> {
        self.target.get(idx).copied()
    }

    pub fn expected_char(&self) -> Option<char> {
        self.char_at(self.cursor)
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<Instant> {
        self.ended_at
    }

    pub fn paused_total(&self) -> Duration {
        self.paused_total
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_complete(&self) -> bool {
        !self.target.is_empty() && self.cursor == self.target.len()
    }

    /// Nothing loaded and nothing typed
    pub fn is_empty_state(&self) -> bool {
        self.target.is_empty() && self.cursor == 0
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_complete() {
            SessionStatus::Complete
        } else if self.started_at.is_none() {
            SessionStatus::Idle
        } else if self.is_paused() {
            SessionStatus::Paused
        } else {
            SessionStatus::Running
        }
    }

    /// Active typing time, excluding pauses. Fixed once the text is done.
    pub fn elapsed(&self, now: Instant) -> Duration {
        let Some(started) = self.started_at else {
            return Duration::ZERO;
        };
        let until = self.ended_at.or(self.paused_at).unwrap_or(now);
        until
            .saturating_duration_since(started)
            .saturating_sub(self.paused_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(text: &str) -> Session {
        let mut s = Session::new();
        s.set_target_text(text);
        s
    }

    #[test]
    fn new_session_is_idle_and_empty() {
        let s = Session::new();
        assert!(s.is_empty_state());
        assert_eq!(s.status(), SessionStatus::Idle);
        assert!(!s.is_complete());
    }

    #[test]
    fn incorrect_keystroke_still_advances() {
        let now = Instant::now();
        let mut s = session("hi");
        s.apply_keystroke(true, now);
        s.apply_keystroke(false, now);
        assert_eq!(s.cursor(), 2);
        assert_eq!(s.errors().iter().copied().collect::<Vec<_>>(), vec![1]);
        assert!(s.is_complete());
        assert_eq!(s.ended_at(), Some(now));
    }

    #[test]
    fn keystrokes_past_the_end_are_ignored() {
        let now = Instant::now();
        let mut s = session("a");
        s.apply_keystroke(true, now);
        s.apply_keystroke(false, now);
        assert_eq!(s.cursor(), 1);
        assert_eq!(s.error_count(), 0);
    }

    #[test]
    fn backspace_clears_error_at_that_index() {
        let now = Instant::now();
        let mut s = session("abc");
        s.apply_keystroke(false, now);
        assert_eq!(s.error_count(), 1);
        s.apply_backspace();
        assert_eq!(s.cursor(), 0);
        assert_eq!(s.error_count(), 0);
        s.apply_backspace();
        assert_eq!(s.cursor(), 0);
    }

    #[test]
    fn completion_is_terminal() {
        let now = Instant::now();
        let mut s = session("a");
        s.apply_keystroke(true, now);
        s.apply_backspace();
        assert!(!s.update_target_text("abc"));
        assert_eq!(s.cursor(), 1);
        assert_eq!(s.target_text(), "a");
        assert_eq!(s.status(), SessionStatus::Complete);
    }

    #[test]
    fn update_keeps_progress() {
        let now = Instant::now();
        let mut s = session("ab");
        s.start(now);
        s.apply_keystroke(false, now);
        assert!(s.update_target_text("ab cd"));
        assert_eq!(s.cursor(), 1);
        assert_eq!(s.error_count(), 1);
        assert_eq!(s.started_at(), Some(now));
        assert_eq!(s.len(), 5);
    }

    #[test]
    fn update_that_would_end_the_text_is_refused() {
        let now = Instant::now();
        let mut s = session("abcd");
        s.apply_keystroke(true, now);
        s.apply_keystroke(false, now);
        for text in ["ab", "a", ""] {
            assert!(!s.update_target_text(text), "{text:?}");
            assert_eq!(s.target_text(), "abcd");
            assert_eq!(s.cursor(), 2);
            assert_eq!(s.error_count(), 1);
            assert!(!s.is_complete());
            assert_eq!(s.ended_at(), None);
        }
        assert!(s.update_target_text("abc"));
        assert_eq!(s.len(), 3);
        assert_eq!(s.cursor(), 2);
    }

    #[test]
    fn set_target_text_starts_over() {
        let now = Instant::now();
        let mut s = session("ab");
        s.start(now);
        s.apply_keystroke(false, now);
        let epoch = s.epoch();
        s.set_target_text("xyz");
        assert_eq!(s.cursor(), 0);
        assert!(s.errors().is_empty());
        assert_eq!(s.started_at(), None);
        assert_eq!(s.status(), SessionStatus::Idle);
        assert!(s.epoch() > epoch);
    }

    #[test]
    fn pause_excludes_time() {
        let t0 = Instant::now();
        let mut s = session("abc");
        s.start(t0);
        s.pause(t0 + Duration::from_millis(1000));
        assert_eq!(s.status(), SessionStatus::Paused);
        assert_eq!(s.elapsed(t0 + Duration::from_millis(5000)), Duration::from_millis(1000));

        s.resume(t0 + Duration::from_millis(5000));
        assert_eq!(s.elapsed(t0 + Duration::from_millis(6000)), Duration::from_millis(2000));
    }

    #[test]
    fn pause_before_start_is_noop() {
        let now = Instant::now();
        let mut s = session("abc");
        s.pause(now);
        assert!(!s.is_paused());
        assert_eq!(s.status(), SessionStatus::Idle);
    }

    #[test]
    fn start_on_empty_or_complete_is_noop() {
        let now = Instant::now();
        let mut s = Session::new();
        s.start(now);
        assert_eq!(s.started_at(), None);

        let mut s = session("a");
        s.apply_keystroke(true, now);
        s.start(now + Duration::from_secs(1));
        assert_eq!(s.started_at(), None);
    }

    #[test]
    fn elapsed_is_frozen_after_completion() {
        let t0 = Instant::now();
        let mut s = session("a");
        s.start(t0);
        s.apply_keystroke(true, t0 + Duration::from_millis(300));
        assert_eq!(s.elapsed(t0 + Duration::from_secs(60)), Duration::from_millis(300));
    }

    #[test]
    fn reset_returns_to_empty() {
        let now = Instant::now();
        let mut s = session("ab");
        s.start(now);
        s.apply_keystroke(false, now);
        s.reset();
        assert!(s.is_empty_state());
        assert!(s.errors().is_empty());
        assert_eq!(s.started_at(), None);
    }
}
