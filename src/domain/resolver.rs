//! Turns raw automaton output into an ordered, non-overlapping match list.

use super::Match;

/// Characters that separate whole words.
pub const WORD_DELIMITERS: &[char] = &[
    ' ', '\t', '/', '\\', '(', ')', '"', '\'', '-', ':', ',', '.', ';', '<', '>', '~', '!', '@',
    '#', '$', '%', '^', '&', '*', '|', '+', '=', '[', ']', '{', '}', '?', '\u{2502}',
];

/// Returns true if `c` ends a word.
pub fn is_word_delimiter(c: char) -> bool {
    WORD_DELIMITERS.contains(&c)
}

/// Resolution policy for overlapping, nested and partial-word matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchResolver {
    whole_word: bool,
}

impl MatchResolver {
    pub fn new(whole_word: bool) -> Self {
        Self { whole_word }
    }

    /// Resolves `matches` found in `text`.
    ///
    /// Matches are ordered by start ascending, then length descending, then
    /// key. Partial-word matches are dropped when whole-word mode is on, and
    /// any match starting inside the previously kept one is discarded, so the
    /// earliest start wins and the longest match wins among equal starts.
    pub fn resolve<'a>(&self, text: &str, mut matches: Vec<Match<'a>>) -> Vec<Match<'a>> {
        if matches.is_empty() {
            return matches;
        }

        matches.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| b.len.cmp(&a.len))
                .then_with(|| a.key.cmp(b.key))
        });

        if self.whole_word {
            let chars: Vec<char> = text.chars().collect();
            matches.retain(|m| is_whole_word(&chars, m));
        }

        let mut resolved: Vec<Match<'a>> = Vec::with_capacity(matches.len());
        for m in matches {
            match resolved.last() {
                Some(kept) if m.start < kept.end() => continue,
                _ => resolved.push(m),
            }
        }
        resolved
    }
}

fn is_whole_word(chars: &[char], m: &Match<'_>) -> bool {
    let before_ok = m.start == 0 || chars.get(m.start - 1).is_some_and(|&c| is_word_delimiter(c));
    let after_ok = chars.get(m.end()).map_or(true, |&c| is_word_delimiter(c));
    before_ok && after_ok
}
