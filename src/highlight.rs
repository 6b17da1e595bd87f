//! Finger guidance and key feedback for an on-screen keyboard.
//!
//! Nothing here affects the typing session: the module reads the expected
//! character, keeps a set of held keys, and holds short-lived flash markers.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::key_filter::{KeyEventKind, RawKeyEvent};
use crate::layout::{Finger, KeyboardLayoutMap, LayoutId};

pub const CORRECT_FLASH: Duration = Duration::from_millis(150);
pub const WRONG_FLASH: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHint {
    pub ch: char,
    pub physical_key: Option<String>,
    pub finger: Option<Finger>,
}

#[derive(Debug, Clone)]
struct Flash {
    key: String,
    expires_at: Instant,
}

impl Flash {
    fn live_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

pub struct KeyboardHighlight {
    layouts: Arc<KeyboardLayoutMap>,
    layout: LayoutId,
    clock: Arc<dyn Clock>,
    tracking: bool,
    pressed: BTreeSet<String>,
    correct: Option<Flash>,
    wrong: Option<Flash>,
}

impl KeyboardHighlight {
    pub fn new(layouts: Arc<KeyboardLayoutMap>, layout: LayoutId, clock: Arc<dyn Clock>) -> Self {
        Self {
            layouts,
            layout,
            clock,
            tracking: false,
            pressed: BTreeSet::new(),
            correct: None,
            wrong: None,
        }
    }

    pub fn layout(&self) -> LayoutId {
        self.layout
    }

    pub fn set_layout(&mut self, layout: LayoutId) {
        self.layout = layout;
    }

    pub fn highlighted_char(&self, target: &[char], cursor: usize) -> Option<char> {
        target.get(cursor).copied()
    }

    pub fn active_finger(&self, target: &[char], cursor: usize) -> Option<Finger> {
        self.highlighted_char(target, cursor)
            .and_then(|c| self.layouts.finger(self.layout, c))
    }

    pub fn hint(&self, target: &[char], cursor: usize) -> Option<KeyHint> {
        let ch = self.highlighted_char(target, cursor)?;
        let position = self.layouts.position(self.layout, ch);
        Some(KeyHint {
            ch,
            physical_key: position.map(|p| p.physical_key.clone()),
            finger: position.map(|p| p.finger),
        })
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Turn held-key tracking on or off. Turning it off forgets held keys.
    pub fn set_tracking(&mut self, enabled: bool) {
        self.tracking = enabled;
        if !enabled {
            self.pressed.clear();
        }
    }

    pub fn observe(&mut self, event: &RawKeyEvent) {
        if !self.tracking {
            return;
        }
        let label = event.key.to_lowercase();
        match event.kind {
            KeyEventKind::Press => {
                self.pressed.insert(label);
            }
            KeyEventKind::Release => {
                self.pressed.remove(&label);
            }
        }
    }

    pub fn pressed_keys(&self) -> &BTreeSet<String> {
        &self.pressed
    }

    pub fn is_pressed(&self, key: &str) -> bool {
        self.pressed.contains(&key.to_lowercase())
    }

    pub fn flash_correct(&mut self, key: &str) {
        self.correct = Some(self.flash(key, CORRECT_FLASH));
    }

    pub fn flash_wrong(&mut self, key: &str) {
        self.wrong = Some(self.flash(key, WRONG_FLASH));
    }

    fn flash(&self, key: &str, lasts: Duration) -> Flash {
        Flash {
            key: key.to_string(),
            expires_at: self.clock.now() + lasts,
        }
    }

    pub fn correct_flash(&self) -> Option<&str> {
        let now = self.clock.now();
        self.correct
            .as_ref()
            .filter(|f| f.live_at(now))
            .map(|f| f.key.as_str())
    }

    pub fn wrong_flash(&self) -> Option<&str> {
        let now = self.clock.now();
        self.wrong
            .as_ref()
            .filter(|f| f.live_at(now))
            .map(|f| f.key.as_str())
    }

    /// Drop expired flashes
    pub fn on_tick(&mut self) {
        let now = self.clock.now();
        if self.correct.as_ref().is_some_and(|f| !f.live_at(now)) {
            self.correct = None;
        }
        if self.wrong.as_ref().is_some_and(|f| !f.live_at(now)) {
            self.wrong = None;
        }
    }

    /// Cancel flashes and forget held keys
    pub fn clear(&mut self) {
        self.correct = None;
        self.wrong = None;
        self.pressed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn highlight(layout: LayoutId) -> (KeyboardHighlight, ManualClock) {
        let clock = ManualClock::new();
        let layouts = Arc::new(KeyboardLayoutMap::builtin().unwrap());
        (
            KeyboardHighlight::new(layouts, layout, Arc::new(clock.clone())),
            clock,
        )
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn next_key_and_finger() {
        let (h, _) = highlight(LayoutId::EnglishQwerty);
        let text = chars("hi");
        assert_eq!(h.highlighted_char(&text, 0), Some('h'));
        assert_eq!(h.active_finger(&text, 1), Some(Finger::RightMiddle));
        assert_eq!(h.highlighted_char(&text, 2), None);
        assert_eq!(h.active_finger(&text, 2), None);
    }

    #[test]
    fn hint_for_unmapped_char_has_no_finger() {
        let (h, _) = highlight(LayoutId::EnglishQwerty);
        let text = chars("€");
        let hint = h.hint(&text, 0).unwrap();
        assert_eq!(hint.ch, '€');
        assert_eq!(hint.finger, None);
        assert_eq!(hint.physical_key, None);
    }

    #[test]
    fn switching_layout_changes_guidance() {
        let (mut h, _) = highlight(LayoutId::EnglishQwerty);
        let text = chars("ש");
        assert_eq!(h.active_finger(&text, 0), None);
        h.set_layout(LayoutId::HebrewStandard);
        assert_eq!(h.active_finger(&text, 0), Some(Finger::LeftPinky));
        assert_eq!(h.hint(&text, 0).unwrap().physical_key.as_deref(), Some("KeyA"));
    }

    #[test]
    fn pressed_keys_are_case_folded() {
        let (mut h, _) = highlight(LayoutId::EnglishQwerty);
        h.set_tracking(true);
        h.observe(&RawKeyEvent::press("A"));
        assert!(h.pressed_keys().contains("a"));
        assert!(!h.pressed_keys().contains("A"));

        h.observe(&RawKeyEvent::release("a"));
        assert!(h.pressed_keys().is_empty());
    }

    #[test]
    fn tracking_is_opt_in() {
        let (mut h, _) = highlight(LayoutId::EnglishQwerty);
        h.observe(&RawKeyEvent::press("a"));
        assert!(h.pressed_keys().is_empty());

        h.set_tracking(true);
        h.observe(&RawKeyEvent::press("a"));
        h.set_tracking(false);
        assert!(!h.is_pressed("a"));
    }

    #[test]
    fn correct_flash_expires_on_its_own() {
        let (mut h, clock) = highlight(LayoutId::EnglishQwerty);
        h.flash_correct("h");
        assert_eq!(h.correct_flash(), Some("h"));
        clock.advance_ms(149);
        assert_eq!(h.correct_flash(), Some("h"));
        clock.advance_ms(1);
        assert_eq!(h.correct_flash(), None);
    }

    #[test]
    fn wrong_flash_lasts_longer() {
        let (mut h, clock) = highlight(LayoutId::EnglishQwerty);
        h.flash_wrong("x");
        clock.advance_ms(150);
        assert_eq!(h.wrong_flash(), Some("x"));
        clock.advance_ms(50);
        assert_eq!(h.wrong_flash(), None);
    }

    #[test]
    fn new_flash_supersedes_pending_one() {
        let (mut h, clock) = highlight(LayoutId::EnglishQwerty);
        h.flash_correct("a");
        clock.advance_ms(100);
        h.flash_correct("b");
        clock.advance_ms(100);
        // the first deadline has passed but the replacement is still live
        assert_eq!(h.correct_flash(), Some("b"));
        clock.advance_ms(50);
        assert_eq!(h.correct_flash(), None);
    }

    #[test]
    fn flash_kinds_are_independent() {
        let (mut h, clock) = highlight(LayoutId::EnglishQwerty);
        h.flash_correct("a");
        h.flash_wrong("s");
        clock.advance_ms(160);
        h.on_tick();
        assert_eq!(h.correct_flash(), None);
        assert_eq!(h.wrong_flash(), Some("s"));
        h.clear();
        assert_eq!(h.wrong_flash(), None);
    }
}
