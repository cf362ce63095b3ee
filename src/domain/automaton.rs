//! Aho-Corasick multi-pattern automaton.
//!
//! The automaton is a trie over the dictionary keys augmented with suffix
//! (failure) links. Every state also carries the full set of keys that end
//! there, including the ones inherited through its suffix-link chain, so a
//! single left-to-right scan reports every occurrence of every key, overlapping
//! ones included.

use std::collections::{HashMap, VecDeque};

use super::Match;
use crate::error::{ReplaceError, ReplaceResult};

const ROOT: usize = 0;

#[derive(Debug, Clone, Default)]
struct State {
    transitions: HashMap<char, usize>,
    suffix_link: usize,
    /// Indices into `Automaton::patterns`, sorted and deduplicated.
    outputs: Vec<usize>,
}

/// Immutable Aho-Corasick automaton over a fixed set of patterns.
///
/// Built once with [`Automaton::build`]; searching never mutates it, so a
/// single automaton can serve any number of threads at once.
#[derive(Debug, Clone)]
pub struct Automaton {
    states: Vec<State>,
    patterns: Vec<String>,
    /// Pattern text to its index in `patterns`.
    ids: HashMap<String, usize>,
    /// Pattern lengths in chars, parallel to `patterns`.
    lengths: Vec<usize>,
    case_sensitive: bool,
}

impl Automaton {
    /// Builds the automaton over `patterns`.
    ///
    /// Duplicate patterns are collapsed. In case-insensitive mode characters
    /// are folded for both construction and search, so `"Foo"` and `"foo"`
    /// share one trie path but are still reported as distinct keys.
    ///
    /// # Errors
    /// [`ReplaceError::EmptyPatternSet`] when `patterns` yields nothing.
    pub fn build<I, S>(patterns: I, case_sensitive: bool) -> ReplaceResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut automaton = Self {
            states: vec![State::default()],
            patterns: Vec::new(),
            ids: HashMap::new(),
            lengths: Vec::new(),
            case_sensitive,
        };

        for pattern in patterns {
            automaton.insert(pattern.as_ref());
        }

        if automaton.patterns.is_empty() {
            return Err(ReplaceError::EmptyPatternSet);
        }

        automaton.link_suffixes();

        tracing::debug!(
            patterns = automaton.patterns.len(),
            states = automaton.states.len(),
            case_sensitive,
            "automaton built"
        );

        Ok(automaton)
    }

    fn fold(&self, c: char) -> char {
        if self.case_sensitive {
            return c;
        }
        let mut upper = c.to_uppercase();
        match (upper.next(), upper.next()) {
            (Some(u), None) => u,
            // Multi-char expansions (e.g. 'ß' -> "SS") would change offsets.
            _ => c,
        }
    }

    fn insert(&mut self, pattern: &str) {
        // An empty key would match between every pair of characters.
        if pattern.is_empty() || self.ids.contains_key(pattern) {
            return;
        }

        let mut state = ROOT;
        for c in pattern.chars() {
            let c = self.fold(c);
            state = match self.states[state].transitions.get(&c) {
                Some(&next) => next,
                None => {
                    let next = self.states.len();
                    self.states.push(State::default());
                    self.states[state].transitions.insert(c, next);
                    next
                }
            };
        }

        let id = self.patterns.len();
        self.ids.insert(pattern.to_string(), id);
        self.patterns.push(pattern.to_string());
        self.lengths.push(pattern.chars().count());
        self.states[state].outputs.push(id);
    }

    /// Breadth-first suffix-link construction with output merging.
    fn link_suffixes(&mut self) {
        let mut queue = VecDeque::new();

        let root_children: Vec<usize> = self.states[ROOT].transitions.values().copied().collect();
        for child in root_children {
            self.states[child].suffix_link = ROOT;
            queue.push_back(child);
        }

        while let Some(parent) = queue.pop_front() {
            let edges: Vec<(char, usize)> = self.states[parent]
                .transitions
                .iter()
                .map(|(&c, &s)| (c, s))
                .collect();

            for (c, child) in edges {
                queue.push_back(child);

                let mut fallback = self.states[parent].suffix_link;
                let link = loop {
                    if let Some(&target) = self.states[fallback].transitions.get(&c) {
                        break target;
                    }
                    if fallback == ROOT {
                        break ROOT;
                    }
                    fallback = self.states[fallback].suffix_link;
                };

                self.states[child].suffix_link = link;

                if !self.states[link].outputs.is_empty() {
                    let inherited = self.states[link].outputs.clone();
                    let outputs = &mut self.states[child].outputs;
                    outputs.extend(inherited);
                    outputs.sort_unstable();
                    outputs.dedup();
                }
            }
        }
    }

    fn step(&self, mut state: usize, c: char) -> usize {
        loop {
            if let Some(&next) = self.states[state].transitions.get(&c) {
                return next;
            }
            if state == ROOT {
                return ROOT;
            }
            state = self.states[state].suffix_link;
        }
    }

    /// Returns a lazy iterator over every occurrence of every pattern in `text`.
    ///
    /// Matches are produced in scan order: grouped by end position, so they
    /// are not globally sorted by start offset.
    pub fn find_iter<'a, 't>(&'a self, text: &'t str) -> FindIter<'a, 't> {
        FindIter {
            automaton: self,
            chars: text.chars().enumerate(),
            state: ROOT,
            position: 0,
            pending: 0,
        }
    }

    /// Collects [`Automaton::find_iter`] into a vector.
    pub fn search(&self, text: &str) -> Vec<Match<'_>> {
        self.find_iter(text).collect()
    }

    /// Patterns in insertion order, duplicates removed.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }
}

/// Iterator returned by [`Automaton::find_iter`].
#[derive(Debug, Clone)]
pub struct FindIter<'a, 't> {
    automaton: &'a Automaton,
    chars: std::iter::Enumerate<std::str::Chars<'t>>,
    state: usize,
    /// Char index of the last consumed character.
    position: usize,
    /// Next output of `state` still to be reported.
    pending: usize,
}

impl<'a> Iterator for FindIter<'a, '_> {
    type Item = Match<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let automaton = self.automaton;
        loop {
            let outputs = &automaton.states[self.state].outputs;
            if let Some(&id) = outputs.get(self.pending) {
                self.pending += 1;
                let len = automaton.lengths[id];
                return Some(Match::new(
                    &automaton.patterns[id],
                    self.position + 1 - len,
                    len,
                ));
            }

            let (index, c) = self.chars.next()?;
            self.position = index;
            self.state = automaton.step(self.state, automaton.fold(c));
            self.pending = 0;
        }
    }
}
