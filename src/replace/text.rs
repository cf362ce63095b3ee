//! Plain text sources (`.txt`, `.csv`, `.tsv` and anything else that is not
//! an Office document). Each line is one content unit.

use std::borrow::Cow;
use std::io::Write;
use std::path::Path;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};

use crate::domain::{Replacer, Segment};
use crate::error::{ReplaceError, ReplaceResult};
use crate::package::{read_file, write_atomic};

use super::docx::{self, DocxRunFormat};
use super::strategy::{ConversionStrategy, ReplacementSummary};

/// How far into a file to look for NUL bytes.
const BINARY_PROBE_CHARS: usize = 4000;
const BOM: char = '\u{feff}';

/// Replaces text line by line: text to text. The output keeps the source's
/// encoding and byte order mark.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRewrite;

impl ConversionStrategy for TextRewrite {
    fn convert(
        &self,
        source: &Path,
        destination: &Path,
        replacer: &Replacer,
    ) -> ReplaceResult<ReplacementSummary> {
        let (text, encoding) = read_text(source, destination)?;
        let (output, summary) = replace_text(&text, replacer);

        let (bytes, unmappable) = encoding.encode(&output);
        if unmappable {
            tracing::warn!(
                path = %destination.display(),
                encoding = encoding.name(),
                "replacement text not representable in the source encoding, written as character references"
            );
        }

        write_atomic(destination, |file| {
            file.write_all(&bytes)
                .map_err(|e| ReplaceError::io(destination, e))
        })?;
        Ok(summary)
    }

    fn name(&self) -> &str {
        "text"
    }
}

/// Builds a new document with one paragraph per line: text to `.docx`.
///
/// Without styling each line becomes a single run; styled replacements get
/// runs of their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextToDocx;

impl ConversionStrategy for TextToDocx {
    fn convert(
        &self,
        source: &Path,
        destination: &Path,
        replacer: &Replacer,
    ) -> ReplaceResult<ReplacementSummary> {
        let (text, _) = read_text(source, destination)?;
        let merged = replacer.style().is_none();

        let mut summary = ReplacementSummary::none();
        let paragraphs = text
            .lines()
            .map(|line| {
                let splice = replacer.splice(vec![Segment::<DocxRunFormat>::plain(line)]);
                summary.record(splice.match_count);
                if merged {
                    docx::paragraph(vec![Segment::plain(splice.text())])
                } else {
                    docx::paragraph(splice.segments)
                }
            })
            .collect();

        docx::new_document(destination, paragraphs).save(destination)?;
        Ok(summary)
    }

    fn name(&self) -> &str {
        "text-to-docx"
    }
}

/// Character encoding of a text source.
///
/// A byte order mark decides it when present. Otherwise the bytes are UTF-8
/// if they decode as such, and Windows-1252 if not; the latter maps every
/// byte, so untouched text is written back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding {
    encoding: &'static Encoding,
    bom: bool,
}

impl TextEncoding {
    /// Decodes `bytes`, dropping the byte order mark.
    pub fn decode(bytes: &[u8]) -> (String, Self) {
        if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
            let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
            return (text.into_owned(), Self { encoding, bom: true });
        }

        match UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
            Some(text) => (
                text.into_owned(),
                Self {
                    encoding: UTF_8,
                    bom: false,
                },
            ),
            None => {
                let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
                (
                    text.into_owned(),
                    Self {
                        encoding: WINDOWS_1252,
                        bom: false,
                    },
                )
            }
        }
    }

    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    pub fn has_bom(&self) -> bool {
        self.bom
    }

    /// Encodes `text` like the source, byte order mark included. The flag is
    /// true if some characters had no mapping in the encoding.
    pub fn encode(&self, text: &str) -> (Vec<u8>, bool) {
        let text: Cow<'_, str> = if self.bom {
            Cow::Owned(format!("{BOM}{text}"))
        } else {
            Cow::Borrowed(text)
        };

        // encoding_rs only encodes UTF-16 as UTF-8.
        if self.encoding == UTF_16LE || self.encoding == UTF_16BE {
            let little_endian = self.encoding == UTF_16LE;
            let bytes = text
                .encode_utf16()
                .flat_map(|unit| {
                    if little_endian {
                        unit.to_le_bytes()
                    } else {
                        unit.to_be_bytes()
                    }
                })
                .collect();
            return (bytes, false);
        }

        let (bytes, _, unmappable) = self.encoding.encode(&text);
        (bytes.into_owned(), unmappable)
    }
}

/// Reads and decodes `source`, rejecting binary content.
fn read_text(source: &Path, destination: &Path) -> ReplaceResult<(String, TextEncoding)> {
    let bytes = read_file(source)?;
    let (text, encoding) = TextEncoding::decode(&bytes);

    if is_binary(&text) {
        return Err(ReplaceError::UnsupportedConversion {
            from: "binary".to_string(),
            to: super::FileKind::from_path(destination).to_string(),
            reason: format!("'{}' does not look like a text file", source.display()),
        });
    }

    tracing::debug!(path = %source.display(), encoding = encoding.name(), "text decoded");
    Ok((text, encoding))
}

/// True if a NUL appears within the first few thousand chars.
pub fn is_binary(text: &str) -> bool {
    text.chars().take(BINARY_PROBE_CHARS).any(|c| c == '\0')
}

/// Replaces every line of `text`, keeping line terminators as they were.
pub fn replace_text(text: &str, replacer: &Replacer) -> (String, ReplacementSummary) {
    let mut summary = ReplacementSummary::none();
    let mut output = String::with_capacity(text.len());

    let text = match text.strip_prefix(BOM) {
        Some(rest) => {
            output.push(BOM);
            rest
        }
        None => text,
    };

    for line in text.split_inclusive('\n') {
        let content = line
            .strip_suffix("\r\n")
            .or_else(|| line.strip_suffix('\n'))
            .unwrap_or(line);
        let terminator = &line[content.len()..];

        let (replaced, count) = replacer.replace_line(content);
        summary.record(count);
        output.push_str(&replaced);
        output.push_str(terminator);
    }

    (output, summary)
}
