//! Classification of raw key notifications into engine actions.
//!
//! The filter is stateless with respect to the typing session: it only
//! decides what a key press means, never whether it was correct.

use std::sync::Arc;

use crate::layout::{KeyboardLayoutMap, LayoutId};
use crate::script::letter_script;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Press,
    Release,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
    pub shift: bool,
}

impl Modifiers {
    /// Control, alt or meta held. Shift only changes the produced character.
    pub fn has_command(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

/// Where keyboard focus sat when the key was pressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FocusTarget {
    /// The practice surface itself
    #[default]
    Practice,
    /// An unrelated text-entry field (search box, form input)
    TextEntry,
    /// A non-text control such as a button
    Control,
    None,
}

/// A key notification as delivered by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawKeyEvent {
    pub key: String,
    pub kind: KeyEventKind,
    pub modifiers: Modifiers,
    pub focus: FocusTarget,
}

impl RawKeyEvent {
    pub fn new(key: impl Into<String>, kind: KeyEventKind) -> Self {
        Self {
            key: key.into(),
            kind,
            modifiers: Modifiers::default(),
            focus: FocusTarget::default(),
        }
    }

    pub fn press(key: impl Into<String>) -> Self {
        Self::new(key, KeyEventKind::Press)
    }

    pub fn release(key: impl Into<String>) -> Self {
        Self::new(key, KeyEventKind::Release)
    }

    pub fn with_ctrl(mut self) -> Self {
        self.modifiers.ctrl = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.modifiers.alt = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.modifiers.meta = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.modifiers.shift = true;
        self
    }

    pub fn with_focus(mut self, focus: FocusTarget) -> Self {
        self.focus = focus;
        self
    }

    /// The label as a single printable character, if it is one
    pub fn printable_char(&self) -> Option<char> {
        let mut chars = self.key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_control() => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Character(char),
    Backspace,
    Enter,
    Escape,
    ResetCombo,
    LayoutMismatch(LayoutId),
    Ignored,
}

#[derive(Debug, Clone)]
pub struct KeyFilter {
    layouts: Arc<KeyboardLayoutMap>,
    allow_backspace: bool,
    expected_layout: Option<LayoutId>,
}

impl KeyFilter {
    pub fn new(
        layouts: Arc<KeyboardLayoutMap>,
        allow_backspace: bool,
        expected_layout: Option<LayoutId>,
    ) -> Self {
        Self {
            layouts,
            allow_backspace,
            expected_layout,
        }
    }

    pub fn allow_backspace(&self) -> bool {
        self.allow_backspace
    }

    pub fn expected_layout(&self) -> Option<LayoutId> {
        self.expected_layout
    }

    pub fn classify(&self, event: &RawKeyEvent) -> KeyAction {
        if event.kind == KeyEventKind::Release {
            return KeyAction::Ignored;
        }
        if event.focus == FocusTarget::TextEntry {
            log::trace!("ignoring {:?}: focus is in a text field", event.key);
            return KeyAction::Ignored;
        }

        match event.key.as_str() {
            "Enter" => return KeyAction::Enter,
            "Escape" => return KeyAction::Escape,
            "Backspace" => {
                return if self.allow_backspace {
                    KeyAction::Backspace
                } else {
                    KeyAction::Ignored
                };
            }
            _ => {}
        }

        let mods = event.modifiers;
        if (mods.ctrl || mods.meta) && event.key.eq_ignore_ascii_case("r") {
            return KeyAction::ResetCombo;
        }
        if mods.has_command() {
            log::trace!("ignoring {:?}: modifier held", event.key);
            return KeyAction::Ignored;
        }

        let Some(c) = event.printable_char() else {
            log::trace!("ignoring non-printable key {:?}", event.key);
            return KeyAction::Ignored;
        };

        if let Some(detected) = self.mismatch(c) {
            log::debug!("layout mismatch: {c:?} belongs to {detected}");
            return KeyAction::LayoutMismatch(detected);
        }

        KeyAction::Character(c)
    }

    fn mismatch(&self, c: char) -> Option<LayoutId> {
        let expected = self.expected_layout?;
        let typed_script = letter_script(c)?;
        if self.layouts.script_of(expected) == Some(typed_script) {
            return None;
        }
        self.layouts.detect_layout(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn filter(allow_backspace: bool, expected: Option<LayoutId>) -> KeyFilter {
        let layouts = Arc::new(KeyboardLayoutMap::builtin().unwrap());
        KeyFilter::new(layouts, allow_backspace, expected)
    }

    #[test]
    fn plain_characters_pass_through() {
        let f = filter(false, None);
        assert_eq!(f.classify(&RawKeyEvent::press("a")), KeyAction::Character('a'));
        assert_eq!(f.classify(&RawKeyEvent::press(" ")), KeyAction::Character(' '));
        assert_eq!(
            f.classify(&RawKeyEvent::press("A").with_shift()),
            KeyAction::Character('A')
        );
    }

    #[test]
    fn text_entry_focus_is_inert() {
        let f = filter(true, None);
        for key in ["a", "Enter", "Escape", "Backspace"] {
            let ev = RawKeyEvent::press(key).with_focus(FocusTarget::TextEntry);
            assert_eq!(f.classify(&ev), KeyAction::Ignored, "{key}");
        }
    }

    #[test]
    fn enter_and_escape_ignore_modifiers() {
        let f = filter(false, None);
        assert_eq!(f.classify(&RawKeyEvent::press("Enter").with_ctrl()), KeyAction::Enter);
        assert_eq!(f.classify(&RawKeyEvent::press("Escape").with_alt()), KeyAction::Escape);
    }

    #[test]
    fn backspace_requires_opt_in() {
        assert_eq!(filter(false, None).classify(&RawKeyEvent::press("Backspace")), KeyAction::Ignored);
        assert_eq!(filter(true, None).classify(&RawKeyEvent::press("Backspace")), KeyAction::Backspace);
    }

    #[test]
    fn reset_combo_beats_modifier_filtering() {
        let f = filter(false, None);
        assert_eq!(f.classify(&RawKeyEvent::press("r").with_ctrl()), KeyAction::ResetCombo);
        assert_eq!(f.classify(&RawKeyEvent::press("R").with_meta()), KeyAction::ResetCombo);
        assert_eq!(f.classify(&RawKeyEvent::press("r").with_alt()), KeyAction::Ignored);
    }

    #[test]
    fn modifier_combos_are_dropped() {
        let f = filter(false, None);
        assert_eq!(f.classify(&RawKeyEvent::press("c").with_ctrl()), KeyAction::Ignored);
        assert_eq!(f.classify(&RawKeyEvent::press("x").with_meta()), KeyAction::Ignored);
    }

    #[test]
    fn non_printable_labels_are_dropped() {
        let f = filter(false, None);
        for key in ["ArrowLeft", "F5", "Shift", "Tab", "\t", ""] {
            assert_eq!(f.classify(&RawKeyEvent::press(key)), KeyAction::Ignored, "{key:?}");
        }
    }

    #[test]
    fn releases_are_not_classified() {
        let f = filter(false, None);
        assert_eq!(f.classify(&RawKeyEvent::release("a")), KeyAction::Ignored);
    }

    #[test]
    fn wrong_script_reports_detected_layout() {
        let f = filter(false, Some(LayoutId::EnglishQwerty));
        assert_matches!(
            f.classify(&RawKeyEvent::press("ש")),
            KeyAction::LayoutMismatch(LayoutId::HebrewStandard)
        );

        let f = filter(false, Some(LayoutId::HebrewStandard));
        assert_matches!(
            f.classify(&RawKeyEvent::press("a")),
            KeyAction::LayoutMismatch(LayoutId::EnglishQwerty)
        );
    }

    #[test]
    fn shared_characters_never_mismatch() {
        let f = filter(false, Some(LayoutId::HebrewStandard));
        for key in [" ", ".", "1", ","] {
            assert_matches!(f.classify(&RawKeyEvent::press(key)), KeyAction::Character(_));
        }
        assert_eq!(f.classify(&RawKeyEvent::press("א")), KeyAction::Character('א'));
    }
}
