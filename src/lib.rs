//! Multi-phrase find-and-replace for text, Word and Excel documents.
//!
//! This library finds every occurrence of a set of phrases with an
//! Aho-Corasick automaton and substitutes each with its replacement, keeping
//! the formatting of the surrounding text or applying a requested style.
//!
//! # Features
//!
//! - **Single pass matching**: all phrases are found in one scan per content unit
//! - **Deterministic overlap policy**: earliest start wins, then longest match
//! - **Formatting aware**: replacements land in the run they start in, split
//!   across runs without losing bold, fonts or colors
//! - **Spreadsheets**: shared strings are rewritten once, table headers follow,
//!   highlighted cells share one derived cell format per original format
//!
//! # Architecture
//!
//! - [`domain`]: Automaton, match resolution, styling and run splicing
//! - [`package`]: Zip container and XML tree for Office documents
//! - [`replace`]: Format adapters and the batch service
//! - [`error`]: Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use phraseswap::{Dictionary, ReplaceOptions, ReplaceService};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dictionary = Dictionary::from_pairs([("above-mentioned", "abv-mntnd")])?;
//! let service = ReplaceService::from_dictionary(dictionary, &ReplaceOptions::new())?;
//!
//! service.replace_file(Path::new("letter.docx"), Path::new("letter.out.docx"))?;
//! # Ok(())
//! # }
//! ```
//!
//! # Examples
//!
//! ## Replacing a line of text
//!
//! ```
//! use phraseswap::{Dictionary, ReplaceOptions, Replacer};
//!
//! let dictionary = Dictionary::from_pairs([("above-mentioned", "abv-mntnd")]).unwrap();
//! let options = ReplaceOptions::new().with_preserve_case(true);
//! let replacer = Replacer::new(dictionary, &options).unwrap();
//!
//! let (line, count) = replacer.replace_line("Above-mentioned parties");
//! assert_eq!(line, "Abv-mntnd parties");
//! assert_eq!(count, 1);
//! ```
//!
//! ## Searching with the automaton
//!
//! ```
//! use phraseswap::domain::{Automaton, MatchResolver};
//!
//! let automaton = Automaton::build(["there", "her"], true).unwrap();
//! let text = "over there";
//! let matches = MatchResolver::new(false).resolve(text, automaton.search(text));
//! assert_eq!(matches.len(), 1);
//! assert_eq!(matches[0].key, "there");
//! ```

pub mod domain;
pub mod error;
pub mod package;
pub mod replace;

pub use domain::{
    Automaton, ContentSplicer, Dictionary, Formatting, Match, MatchResolver, ReplaceOptions,
    Replacer, Segment, Splice, StyleSpec,
};
pub use error::{ReplaceError, ReplaceResult};
pub use replace::{
    BatchMode, Conversion, ConversionStrategy, FileKind, ReplaceService, ReplacementStatus,
    ReplacementSummary, SourceFile,
};
