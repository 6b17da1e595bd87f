use serde::{Deserialize, Serialize};

/// Writing systems whose base letters get per-letter tracking and layout checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Script {
    Latin,
    Hebrew,
}

// Inclusive base-letter ranges, matched against the case-folded character.
const BASE_LETTERS: &[(Script, char, char)] = &[
    (Script::Latin, 'a', 'z'),
    (Script::Hebrew, '\u{05D0}', '\u{05EA}'),
];

/// Lowercase fold used for every letter-keyed lookup
pub fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Script of a base letter, `None` for digits, punctuation, whitespace and
/// anything outside the supported letter ranges.
pub fn letter_script(c: char) -> Option<Script> {
    let folded = fold(c);
    BASE_LETTERS
        .iter()
        .find(|(_, lo, hi)| (*lo..=*hi).contains(&folded))
        .map(|(script, _, _)| *script)
}

pub fn is_base_letter(c: char) -> bool {
    letter_script(c).is_some()
}
