//! Splicing replacements into a sequence of formatted segments.
//!
//! A content unit (text line, document paragraph, spreadsheet string) is
//! modelled as an ordered list of [`Segment`]s whose concatenated text is the
//! unit's full text. The splicer never looks inside a segment's formatting;
//! it only clones it and, for styled replacements, overlays a [`StyleSpec`].

use std::collections::HashMap;
use std::iter;

use super::{Match, StyleSpec};

/// Formatting carried by a segment.
///
/// Implemented by each adapter for its native run properties.
pub trait Formatting: Clone + Default {
    /// Applies `style` on top of the current formatting.
    fn overlay(&mut self, style: &StyleSpec);
}

/// Unformatted text.
impl Formatting for () {
    fn overlay(&mut self, _style: &StyleSpec) {}
}

/// A span of text sharing one formatting value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<F> {
    pub text: String,
    pub format: F,
}

impl<F> Segment<F> {
    pub fn new(text: impl Into<String>, format: F) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }
}

impl<F: Default> Segment<F> {
    /// A segment with default formatting.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, F::default())
    }
}

/// Result of [`ContentSplicer::apply`].
#[derive(Debug, Clone)]
pub struct Splice<F> {
    pub segments: Vec<Segment<F>>,
    /// Number of replacements made.
    pub match_count: usize,
    /// For each output segment, the index of the input segment it came from.
    pub origins: Vec<usize>,
}

impl<F> Splice<F> {
    pub fn is_modified(&self) -> bool {
        self.match_count > 0
    }

    /// Concatenated text of all output segments.
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Applies resolved matches to segment lists.
#[derive(Debug, Clone, Copy)]
pub struct ContentSplicer<'d> {
    substitutions: &'d HashMap<String, String>,
    style: Option<&'d StyleSpec>,
    preserve_case: bool,
}

impl<'d> ContentSplicer<'d> {
    /// `style` is ignored unless it would change something; without it the
    /// replacement is merged into the segment holding the preceding text.
    pub fn new(
        substitutions: &'d HashMap<String, String>,
        style: Option<&'d StyleSpec>,
        preserve_case: bool,
    ) -> Self {
        Self {
            substitutions,
            style: style.filter(|s| s.is_effective()),
            preserve_case,
        }
    }

    /// Splices `matches` (ordered, non-overlapping, char offsets into the
    /// concatenated segment text) into `segments`.
    ///
    /// A match that runs past the end of the segment it starts in consumes
    /// the following text as well; its replacement takes the formatting of
    /// the starting segment.
    pub fn apply<F: Formatting>(&self, segments: Vec<Segment<F>>, matches: &[Match<'_>]) -> Splice<F> {
        if matches.is_empty() {
            let origins = (0..segments.len()).collect();
            return Splice {
                segments,
                match_count: 0,
                origins,
            };
        }

        let segments = if segments.is_empty() {
            vec![Segment::plain(String::new())]
        } else {
            segments
        };

        let text: String = segments.iter().map(|s| s.text.as_str()).collect();
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(iter::once(text.len()))
            .collect();
        let total = offsets.len() - 1;
        let slice = |from: usize, to: usize| &text[offsets[from]..offsets[to]];

        let mut bounds = Vec::with_capacity(segments.len() + 1);
        bounds.push(0);
        for segment in &segments {
            let last = bounds[bounds.len() - 1];
            bounds.push(last + segment.text.chars().count());
        }

        let mut out = Vec::new();
        let mut origins = Vec::new();
        let mut match_count = 0;
        let mut cursor = 0;
        let mut pending = matches.iter().peekable();

        for (index, segment) in segments.iter().enumerate() {
            let end = bounds[index + 1];

            while let Some(m) = pending.next_if(|m| m.start < end) {
                if m.start < cursor {
                    continue;
                }
                let match_end = m.end().min(total);
                let before = slice(cursor, m.start);
                let replacement = self.replacement_for(m.key, slice(m.start, match_end));

                match self.style {
                    None => {
                        out.push(Segment::new(
                            format!("{before}{replacement}"),
                            segment.format.clone(),
                        ));
                        origins.push(index);
                    }
                    Some(style) => {
                        if !before.is_empty() {
                            out.push(Segment::new(before, segment.format.clone()));
                            origins.push(index);
                        }
                        let mut format = segment.format.clone();
                        format.overlay(style);
                        out.push(Segment::new(replacement, format));
                        origins.push(index);
                    }
                }

                cursor = match_end;
                match_count += 1;
            }

            if cursor < end {
                out.push(Segment::new(slice(cursor, end), segment.format.clone()));
                origins.push(index);
                cursor = end;
            }
        }

        Splice {
            segments: out,
            match_count,
            origins,
        }
    }

    fn replacement_for(&self, key: &str, matched: &str) -> String {
        let replacement = self
            .substitutions
            .get(key)
            .map_or(matched, String::as_str);

        if !self.preserve_case {
            return replacement.to_string();
        }

        let upper = matched.chars().next().is_some_and(char::is_uppercase);
        with_leading_case(replacement, upper)
    }
}

/// Forces the first char of `text` to upper or lower case.
pub fn with_leading_case(text: &str, upper: bool) -> String {
    let mut chars = text.chars();
    match chars.next() {
        None => String::new(),
        Some(first) if upper => first.to_uppercase().chain(chars).collect(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}
