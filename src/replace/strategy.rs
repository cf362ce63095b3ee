//! Conversion strategy trait and supporting types.
//!
//! Every supported (source, destination) pair is a [`Conversion`], and every
//! conversion is carried out by a [`ConversionStrategy`].

use std::fmt;
use std::path::{Path, PathBuf};

use crate::domain::Replacer;
use crate::error::{ReplaceError, ReplaceResult};

use super::docx::{DocxRewrite, DocxToText};
use super::text::{TextRewrite, TextToDocx};
use super::xlsx::XlsxRewrite;

/// Document format, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Plain text, including `.csv` and `.tsv`.
    Text,
    Docx,
    Xlsx,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("docx") => Self::Docx,
            Some("xlsx") => Self::Xlsx,
            _ => Self::Text,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Docx => "docx",
            Self::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A supported (source, destination) format pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    TextToText,
    TextToDocx,
    DocxToText,
    DocxToDocx,
    XlsxToXlsx,
}

impl Conversion {
    /// Checks the format pair without touching the filesystem.
    ///
    /// # Errors
    /// [`ReplaceError::UnsupportedConversion`] for pairs mixing spreadsheets
    /// with anything else.
    pub fn resolve(source: &Path, destination: &Path) -> ReplaceResult<Self> {
        let from = FileKind::from_path(source);
        let to = FileKind::from_path(destination);

        match (from, to) {
            (FileKind::Text, FileKind::Text) => Ok(Self::TextToText),
            (FileKind::Text, FileKind::Docx) => Ok(Self::TextToDocx),
            (FileKind::Docx, FileKind::Text) => Ok(Self::DocxToText),
            (FileKind::Docx, FileKind::Docx) => Ok(Self::DocxToDocx),
            (FileKind::Xlsx, FileKind::Xlsx) => Ok(Self::XlsxToXlsx),
            (FileKind::Xlsx, _) | (_, FileKind::Xlsx) => Err(ReplaceError::UnsupportedConversion {
                from: from.to_string(),
                to: to.to_string(),
                reason: "spreadsheets can only be converted to spreadsheets".to_string(),
            }),
        }
    }

    pub fn strategy(&self) -> Box<dyn ConversionStrategy> {
        match self {
            Self::TextToText => Box::new(TextRewrite),
            Self::TextToDocx => Box::new(TextToDocx),
            Self::DocxToText => Box::new(DocxToText),
            Self::DocxToDocx => Box::new(DocxRewrite),
            Self::XlsxToXlsx => Box::new(XlsxRewrite),
        }
    }
}

/// Outcome of processing one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplacementStatus {
    #[default]
    Pending,
    /// Processed; holds the number of replacements made.
    Completed(usize),
    Failed,
}

impl ReplacementStatus {
    pub fn replacements(&self) -> Option<usize> {
        match self {
            Self::Completed(count) => Some(*count),
            _ => None,
        }
    }
}

/// A file queued for replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub status: ReplacementStatus,
}

impl SourceFile {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            status: ReplacementStatus::Pending,
        }
    }
}

/// Statistics about one converted document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementSummary {
    /// Number of replacements made
    pub replacements: usize,

    /// Content units (lines, paragraphs, string cells) examined
    pub units_processed: usize,

    /// Content units with at least one replacement
    pub units_modified: usize,
}

impl ReplacementSummary {
    /// Creates a summary indicating nothing was replaced.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn has_replacements(&self) -> bool {
        self.replacements > 0
    }

    /// Counts one unit that received `replacements` replacements.
    pub fn record(&mut self, replacements: usize) {
        self.units_processed += 1;
        if replacements > 0 {
            self.units_modified += 1;
            self.replacements += replacements;
        }
    }
}

/// Strategy for reading one format and writing another.
pub trait ConversionStrategy: Send + Sync {
    /// Reads `source`, applies `replacer` and writes `destination`.
    fn convert(
        &self,
        source: &Path,
        destination: &Path,
        replacer: &Replacer,
    ) -> ReplaceResult<ReplacementSummary>;

    /// Returns a human-readable name for this strategy.
    fn name(&self) -> &str;
}
