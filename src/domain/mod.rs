//! Phrase matching and replacement core.
//!
//! This module contains everything that is independent of the document
//! format: the Aho-Corasick automaton, the policy that resolves overlapping
//! matches, replacement styling and the run splicing algorithm.

pub mod automaton;
pub mod resolver;
pub mod splice;
pub mod style;

pub use automaton::{Automaton, FindIter};
pub use resolver::{is_word_delimiter, MatchResolver, WORD_DELIMITERS};
pub use splice::{with_leading_case, ContentSplicer, Formatting, Segment, Splice};
pub use style::{HexColor, StyleSpec};

use std::collections::HashMap;

use crate::error::{ReplaceError, ReplaceResult};

/// One occurrence of a dictionary key. Offsets and lengths are in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Match<'a> {
    pub key: &'a str,
    pub start: usize,
    pub len: usize,
}

impl<'a> Match<'a> {
    pub fn new(key: &'a str, start: usize, len: usize) -> Self {
        Self { key, start, len }
    }

    /// Exclusive end offset.
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Search phrase to replacement mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    entries: HashMap<String, String>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a dictionary from `(find, replacement)` pairs. Later pairs
    /// overwrite earlier ones with the same key.
    pub fn from_pairs<I, K, V>(pairs: I) -> ReplaceResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut dictionary = Self::new();
        for (find, replacement) in pairs {
            dictionary.insert(find, replacement)?;
        }
        Ok(dictionary)
    }

    /// Adds or overwrites an entry.
    ///
    /// # Errors
    /// [`ReplaceError::InvalidInput`] if `find` is empty.
    pub fn insert(
        &mut self,
        find: impl Into<String>,
        replacement: impl Into<String>,
    ) -> ReplaceResult<()> {
        let find = find.into();
        if find.is_empty() {
            return Err(ReplaceError::InvalidInput {
                parameter: "find".to_string(),
                reason: "Search phrase cannot be empty".to_string(),
            });
        }
        self.entries.insert(find, replacement.into());
        Ok(())
    }

    pub fn get(&self, find: &str) -> Option<&str> {
        self.entries.get(find).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.entries
    }
}

/// Options controlling how phrases are matched and how replacements look.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceOptions {
    pub whole_word: bool,
    pub case_sensitive: bool,
    pub preserve_case: bool,
    pub style: StyleSpec,
}

impl ReplaceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_whole_word(mut self, whole_word: bool) -> Self {
        self.whole_word = whole_word;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_preserve_case(mut self, preserve_case: bool) -> Self {
        self.preserve_case = preserve_case;
        self
    }

    pub fn with_style(mut self, style: StyleSpec) -> Self {
        self.style = style;
        self
    }
}

/// The replacement engine: dictionary, automaton and splicing options.
///
/// Immutable once built and shared by every document of a batch.
#[derive(Debug, Clone)]
pub struct Replacer {
    dictionary: Dictionary,
    automaton: Automaton,
    resolver: MatchResolver,
    style: StyleSpec,
    preserve_case: bool,
}

impl Replacer {
    /// # Errors
    /// [`ReplaceError::EmptyPatternSet`] if the dictionary is empty.
    pub fn new(dictionary: Dictionary, options: &ReplaceOptions) -> ReplaceResult<Self> {
        let automaton = Automaton::build(dictionary.keys(), options.case_sensitive)?;
        Ok(Self {
            dictionary,
            automaton,
            resolver: MatchResolver::new(options.whole_word),
            style: options.style.clone(),
            preserve_case: options.preserve_case,
        })
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// The replacement style, if it changes anything.
    pub fn style(&self) -> Option<&StyleSpec> {
        Some(&self.style).filter(|s| s.is_effective())
    }

    /// Resolved matches in `text`.
    pub fn find<'r>(&'r self, text: &str) -> Vec<Match<'r>> {
        self.resolver.resolve(text, self.automaton.search(text))
    }

    pub fn splicer(&self) -> ContentSplicer<'_> {
        ContentSplicer::new(self.dictionary.as_map(), Some(&self.style), self.preserve_case)
    }

    /// Searches the concatenated text of `segments` and splices every match.
    pub fn splice<F: Formatting>(&self, segments: Vec<Segment<F>>) -> Splice<F> {
        let text: String = segments.iter().map(|s| s.text.as_str()).collect();
        let matches = self.find(&text);
        self.splicer().apply(segments, &matches)
    }

    /// Replaces every match in a single line of plain text.
    pub fn replace_line(&self, line: &str) -> (String, usize) {
        let splice = self.splice(vec![Segment::<()>::plain(line)]);
        (splice.text(), splice.match_count)
    }
}
