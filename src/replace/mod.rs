//! Document replacement: format adapters and the batch service.
//!
//! Each supported format pair is handled by a [`ConversionStrategy`]; the
//! [`ReplaceService`] picks the strategy for every file of a batch and
//! applies the strict or tolerant failure policy.

pub mod docx;
pub mod strategy;
pub mod stylesheet;
pub mod text;
pub mod xlsx;

pub use docx::{DocxRewrite, DocxRunFormat, DocxToText};
pub use strategy::{
    Conversion, ConversionStrategy, FileKind, ReplacementStatus, ReplacementSummary, SourceFile,
};
pub use stylesheet::StyleSheet;
pub use text::{TextEncoding, TextRewrite, TextToDocx};
pub use xlsx::{XlsxRewrite, XlsxRunFormat};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::domain::{Dictionary, ReplaceOptions, Replacer};
use crate::error::{ReplaceError, ReplaceResult};

/// How a batch reacts to a failing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// Stop at the first failure and return its error.
    #[default]
    Strict,
    /// Mark the file as failed, clean up after it and continue.
    Tolerant,
}

/// Replacement service coordinating conversions over a batch of files.
pub struct ReplaceService {
    replacer: Replacer,
}

impl ReplaceService {
    pub fn new(replacer: Replacer) -> Self {
        Self { replacer }
    }

    /// Builds the matcher once for every file the service will process.
    pub fn from_dictionary(dictionary: Dictionary, options: &ReplaceOptions) -> ReplaceResult<Self> {
        Ok(Self::new(Replacer::new(dictionary, options)?))
    }

    pub fn replacer(&self) -> &Replacer {
        &self.replacer
    }

    /// Replaces phrases in one file.
    ///
    /// The format pair is validated before the source is opened.
    pub fn replace_file(&self, source: &Path, destination: &Path) -> ReplaceResult<ReplacementSummary> {
        let conversion = Conversion::resolve(source, destination)?;

        if !source.is_file() {
            return Err(ReplaceError::Io {
                path: source.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "Input file does not exist"),
            });
        }

        let strategy = conversion.strategy();
        tracing::debug!(
            source = %source.display(),
            destination = %destination.display(),
            strategy = strategy.name(),
            "converting"
        );

        let summary = strategy.convert(source, destination, &self.replacer)?;

        tracing::info!(
            source = %source.display(),
            replacements = summary.replacements,
            units = summary.units_processed,
            "file processed"
        );
        Ok(summary)
    }

    /// Processes every file, recording each outcome in its `status`.
    ///
    /// In strict mode every format pair is checked before any file is
    /// touched and the first failure is returned. In tolerant mode failures
    /// are logged and the batch continues. Returns true if every file
    /// completed.
    pub fn replace_all(&self, files: &mut [SourceFile], mode: BatchMode) -> ReplaceResult<bool> {
        if files.is_empty() {
            return Err(ReplaceError::InvalidInput {
                parameter: "files".to_string(),
                reason: "No files specified".to_string(),
            });
        }

        if mode == BatchMode::Strict {
            for file in files.iter() {
                Conversion::resolve(&file.source, &file.destination)?;
            }
        }

        let mut all_completed = true;
        for file in files.iter_mut() {
            match self.process(file) {
                Ok(count) => file.status = ReplacementStatus::Completed(count),
                Err(err) => {
                    file.status = ReplacementStatus::Failed;
                    all_completed = false;
                    match mode {
                        BatchMode::Strict => return Err(err),
                        BatchMode::Tolerant => tracing::warn!(
                            source = %file.source.display(),
                            error = %err,
                            "file failed, continuing"
                        ),
                    }
                }
            }
        }
        Ok(all_completed)
    }

    fn process(&self, file: &SourceFile) -> ReplaceResult<usize> {
        Conversion::resolve(&file.source, &file.destination)?;
        let created = create_parent_dirs(&file.destination)?;

        match self.replace_file(&file.source, &file.destination) {
            Ok(summary) => Ok(summary.replacements),
            Err(err) => {
                if let Some(dir) = created {
                    if let Err(cleanup) = fs::remove_dir_all(&dir) {
                        tracing::warn!(dir = %dir.display(), error = %cleanup, "cleanup failed");
                    }
                }
                Err(err)
            }
        }
    }
}

/// Creates the destination's parent directories. Returns the topmost
/// directory that did not exist before.
fn create_parent_dirs(destination: &Path) -> ReplaceResult<Option<PathBuf>> {
    let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(None);
    };

    let topmost = parent
        .ancestors()
        .take_while(|dir| !dir.as_os_str().is_empty() && !dir.exists())
        .last()
        .map(Path::to_path_buf);

    if topmost.is_some() {
        fs::create_dir_all(parent).map_err(|e| ReplaceError::io(parent, e))?;
    }
    Ok(topmost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service() -> ReplaceService {
        let dictionary = Dictionary::from_pairs([("cat", "dog")]).unwrap();
        ReplaceService::from_dictionary(dictionary, &ReplaceOptions::new()).unwrap()
    }

    #[test]
    fn test_empty_batch_rejected() {
        let result = service().replace_all(&mut [], BatchMode::Tolerant);
        assert!(matches!(result, Err(ReplaceError::InvalidInput { .. })));
    }

    #[test]
    fn test_unsupported_pair_rejected_before_io() {
        let dir = TempDir::new().unwrap();
        let result = service().replace_file(&dir.path().join("missing.xlsx"), &dir.path().join("out.txt"));
        assert!(matches!(result, Err(ReplaceError::UnsupportedConversion { .. })));
    }

    #[test]
    fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let result = service().replace_file(&dir.path().join("missing.txt"), &dir.path().join("out.txt"));
        assert!(matches!(result, Err(ReplaceError::Io { .. })));
    }

    #[test]
    fn test_create_parent_dirs_reports_topmost() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("a/b/c/out.txt");
        let created = create_parent_dirs(&destination).unwrap();
        assert_eq!(created, Some(dir.path().join("a")));
        assert!(dir.path().join("a/b/c").is_dir());

        assert_eq!(create_parent_dirs(&destination).unwrap(), None);
        assert_eq!(create_parent_dirs(Path::new("bare.txt")).unwrap(), None);
    }
}
