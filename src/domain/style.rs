//! Styling requested for replacement text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// A normalized 6-digit hex color: uppercase, no leading `#`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HexColor(String);

impl HexColor {
    fn pattern() -> &'static Regex {
        static PATTERN: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^#?[a-fA-F0-9]{6}$").expect("Valid hex color regex"));
        &PATTERN
    }

    /// Parses `"#a1b2c3"` or `"A1B2C3"`. Anything else yields `None`.
    pub fn parse(input: &str) -> Option<Self> {
        if !Self::pattern().is_match(input) {
            return None;
        }
        Some(Self(input.trim_start_matches('#').to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ARGB form used by spreadsheet colors (`FF` alpha prefix).
    pub fn argb(&self) -> String {
        format!("FF{}", self.0)
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Formatting overrides applied to replacement text.
///
/// Colors that fail to parse are treated as "off", never as black.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSpec {
    pub bold: bool,
    pub italics: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub highlight: Option<HexColor>,
    pub text_color: Option<HexColor>,
}

impl StyleSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bold(mut self, on: bool) -> Self {
        self.bold = on;
        self
    }

    pub fn italics(mut self, on: bool) -> Self {
        self.italics = on;
        self
    }

    pub fn underline(mut self, on: bool) -> Self {
        self.underline = on;
        self
    }

    pub fn strikethrough(mut self, on: bool) -> Self {
        self.strikethrough = on;
        self
    }

    pub fn highlight(mut self, color: &str) -> Self {
        self.highlight = HexColor::parse(color);
        self
    }

    pub fn text_color(mut self, color: &str) -> Self {
        self.text_color = HexColor::parse(color);
        self
    }

    /// True if applying this spec would change anything.
    pub fn is_effective(&self) -> bool {
        self.bold
            || self.italics
            || self.underline
            || self.strikethrough
            || self.highlight.is_some()
            || self.text_color.is_some()
    }
}
