use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Local};
use itertools::Itertools;
use serde::Serialize;

use crate::script::{fold, is_base_letter};

/// Characters per word in every WPM figure
pub const CHARS_PER_WORD: f64 = 5.0;

/// Completion stats never divide by less than this
pub const MIN_ELAPSED_MS: u64 = 100;

pub fn correct_count(cursor: usize, errors: usize) -> usize {
    cursor.saturating_sub(errors)
}

/// Whole-number percentage of advanced positions that were typed right
pub fn accuracy(cursor: usize, errors: usize) -> u32 {
    if cursor == 0 {
        return 100;
    }
    (100.0 * correct_count(cursor, errors) as f64 / cursor as f64).round() as u32
}

/// Speed credited for correct characters only
pub fn gross_wpm(correct: usize, elapsed_ms: u64) -> u32 {
    if elapsed_ms == 0 {
        return 0;
    }
    let minutes = elapsed_ms as f64 / 60_000.0;
    ((correct as f64 / CHARS_PER_WORD) / minutes).round() as u32
}

/// Speed over everything typed, minus one word for each uncorrected error
pub fn net_wpm(typed: usize, errors: usize, elapsed_ms: u64) -> u32 {
    if elapsed_ms == 0 {
        return 0;
    }
    let minutes = elapsed_ms as f64 / 60_000.0;
    let words = typed as f64 / CHARS_PER_WORD - errors as f64;
    if words <= 0.0 {
        return 0;
    }
    (words / minutes).round() as u32
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LetterTally {
    pub correct: u32,
    pub total: u32,
}

impl LetterTally {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.correct as f64 / self.total as f64 * 100.0
    }
}

/// Attempts per base letter over a whole session.
///
/// Keyed by the case-folded expected letter. Counts only ever grow: a
/// backspaced mistake still counts as a missed attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LetterStats {
    letters: BTreeMap<char, LetterTally>,
}

impl LetterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, expected: char, correct: bool) {
        if !is_base_letter(expected) {
            return;
        }
        let tally = self.letters.entry(fold(expected)).or_default();
        tally.total += 1;
        if correct {
            tally.correct += 1;
        }
    }

    pub fn get(&self, letter: char) -> Option<&LetterTally> {
        self.letters.get(&fold(letter))
    }

    pub fn accuracy(&self, letter: char) -> Option<f64> {
        self.get(letter).map(LetterTally::accuracy)
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &LetterTally)> {
        self.letters.iter().map(|(c, t)| (*c, t))
    }

    /// Up to `n` letters with the lowest accuracy, most attempted first on ties.
    /// Letters without misses are never reported as weak.
    pub fn weakest(&self, n: usize) -> Vec<(char, LetterTally)> {
        self.letters
            .iter()
            .filter(|(_, t)| t.correct < t.total)
            .sorted_by(|(ca, a), (cb, b)| {
                a.accuracy()
                    .partial_cmp(&b.accuracy())
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(b.total.cmp(&a.total))
                    .then(ca.cmp(cb))
            })
            .take(n)
            .map(|(c, t)| (*c, *t))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    pub fn clear(&mut self) {
        self.letters.clear();
    }
}

/// Derived performance figures for a session snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypingStats {
    pub wpm: u32,
    pub net_wpm: u32,
    pub accuracy: u32,
    pub correct_count: usize,
    pub error_count: usize,
    pub elapsed_ms: u64,
    pub characters_typed: usize,
    pub total_characters: usize,
    pub letter_accuracy: LetterStats,
    pub completed_at: Option<DateTime<Local>>,
}

impl TypingStats {
    pub fn compute(
        cursor: usize,
        errors: usize,
        total_characters: usize,
        elapsed: Duration,
        letters: &LetterStats,
    ) -> Self {
        let elapsed_ms = elapsed.as_millis() as u64;
        let correct = correct_count(cursor, errors);
        Self {
            wpm: gross_wpm(correct, elapsed_ms),
            net_wpm: net_wpm(cursor, errors, elapsed_ms),
            accuracy: accuracy(cursor, errors),
            correct_count: correct,
            error_count: errors,
            elapsed_ms,
            characters_typed: cursor,
            total_characters,
            letter_accuracy: letters.clone(),
            completed_at: None,
        }
    }

    pub fn empty() -> Self {
        Self::compute(0, 0, 0, Duration::ZERO, &LetterStats::default())
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_formula() {
        assert_eq!(accuracy(0, 0), 100);
        assert_eq!(accuracy(2, 1), 50);
        assert_eq!(accuracy(3, 1), 67);
        assert_eq!(accuracy(10, 0), 100);
    }

    #[test]
    fn fifty_correct_in_a_minute_is_ten_wpm() {
        assert_eq!(gross_wpm(50, 60_000), 10);
    }

    #[test]
    fn gross_wpm_counts_correct_chars_only() {
        let typed = 60;
        let errors = 10;
        assert_eq!(gross_wpm(correct_count(typed, errors), 60_000), 10);
        assert_eq!(gross_wpm(10, 0), 0);
    }

    #[test]
    fn net_wpm_penalizes_errors() {
        assert_eq!(net_wpm(300, 0, 60_000), 60);
        assert_eq!(net_wpm(300, 10, 60_000), 50);
        let gross = gross_wpm(correct_count(300, 10), 60_000);
        assert!(net_wpm(300, 10, 60_000) < gross);
    }

    #[test]
    fn net_wpm_never_negative() {
        assert_eq!(net_wpm(10, 5, 60_000), 0);
        assert_eq!(net_wpm(10, 0, 0), 0);
    }

    #[test]
    fn letter_stats_fold_case_and_skip_non_letters() {
        let mut stats = LetterStats::new();
        stats.record('A', true);
        stats.record('a', false);
        stats.record(' ', false);
        stats.record('.', true);
        stats.record('7', true);
        stats.record('ש', true);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats.get('a'), Some(&LetterTally { correct: 1, total: 2 }));
        assert_eq!(stats.accuracy('A'), Some(50.0));
        assert_eq!(stats.accuracy('ש'), Some(100.0));
        assert_eq!(stats.get(' '), None);
    }

    #[test]
    fn weakest_orders_by_accuracy_then_attempts() {
        let mut stats = LetterStats::new();
        for (c, ok) in [('a', false), ('a', true), ('b', false), ('c', true), ('d', false), ('d', true)] {
            stats.record(c, ok);
        }
        let weakest: Vec<char> = stats.weakest(5).into_iter().map(|(c, _)| c).collect();
        assert_eq!(weakest, vec!['b', 'a', 'd']);
        assert_eq!(stats.weakest(1).len(), 1);
    }

    #[test]
    fn compute_snapshot() {
        let mut letters = LetterStats::new();
        letters.record('h', true);
        letters.record('i', false);
        let stats = TypingStats::compute(2, 1, 2, Duration::from_millis(1200), &letters);
        assert_eq!(stats.correct_count, 1);
        assert_eq!(stats.error_count, 1);
        assert_eq!(stats.accuracy, 50);
        assert_eq!(stats.characters_typed, 2);
        assert_eq!(stats.total_characters, 2);
        assert_eq!(stats.elapsed_ms, 1200);
        assert_eq!(stats.wpm, 10);
        assert_eq!(stats.letter_accuracy, letters);
        assert!(stats.completed_at.is_none());
    }

    #[test]
    fn snapshot_serializes_letter_map() {
        let mut letters = LetterStats::new();
        letters.record('q', false);
        let stats = TypingStats::compute(1, 1, 3, Duration::from_secs(1), &letters);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["letter_accuracy"]["q"]["total"], 1);
        assert_eq!(json["accuracy"], 0);
    }
}
