//! Zip-packaged OOXML documents.
//!
//! A [`Package`] holds every entry of the archive in memory, in the original
//! order. Parts are replaced wholesale; untouched entries are written back
//! byte for byte.

pub mod xml;

pub use xml::{local_name, XmlDocument, XmlElement, XmlError, XmlNode};

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{ReplaceError, ReplaceResult};

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    is_dir: bool,
}

/// A relationship from a part's `.rels` file with its target resolved to a
/// part name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

#[derive(Debug, Clone)]
pub struct Package {
    path: PathBuf,
    entries: Vec<Entry>,
}

impl Package {
    /// An empty package that will be written to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    /// Reads every entry of the archive at `path`.
    pub fn open(path: &Path) -> ReplaceResult<Self> {
        let file = File::open(path).map_err(|e| ReplaceError::io(path, e))?;
        let mut archive = ZipArchive::new(file).map_err(|e| ReplaceError::archive(path, e))?;

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive
                .by_index(index)
                .map_err(|e| ReplaceError::archive(path, e))?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| ReplaceError::io(path, e))?;
            entries.push(Entry {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                is_dir: file.is_dir(),
            });
        }

        tracing::debug!(path = %path.display(), entries = entries.len(), "package opened");

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.name.as_str())
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| !e.is_dir && e.name == name)
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entry(name).map(|e| e.data.as_slice())
    }

    /// Replaces the part `name`, adding it at the end if it is new.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|e| !e.is_dir && e.name == name) {
            Some(entry) => entry.data = data,
            None => self.entries.push(Entry {
                name: name.to_string(),
                data,
                compression: CompressionMethod::Deflated,
                is_dir: false,
            }),
        }
    }

    /// Parses the XML part `name`.
    ///
    /// # Errors
    /// [`ReplaceError::MalformedDocument`] if the part is missing or unparsable.
    pub fn xml_part(&self, name: &str) -> ReplaceResult<XmlDocument> {
        self.optional_xml_part(name)?
            .ok_or_else(|| ReplaceError::malformed(&self.path, format!("missing part '{name}'")))
    }

    pub fn optional_xml_part(&self, name: &str) -> ReplaceResult<Option<XmlDocument>> {
        let Some(data) = self.part(name) else {
            return Ok(None);
        };
        XmlDocument::parse(data)
            .map(Some)
            .map_err(|e| ReplaceError::malformed(&self.path, format!("part '{name}': {e}")))
    }

    pub fn set_xml_part(&mut self, name: &str, document: &XmlDocument) {
        self.set_part(name, document.to_bytes());
    }

    /// Relationships declared by `part` (`dir/_rels/file.rels`).
    pub fn relationships(&self, part: &str) -> ReplaceResult<Vec<Relationship>> {
        let (dir, file) = part.rsplit_once('/').unwrap_or(("", part));
        let rels_name = if dir.is_empty() {
            format!("_rels/{file}.rels")
        } else {
            format!("{dir}/_rels/{file}.rels")
        };

        let Some(rels) = self.optional_xml_part(&rels_name)? else {
            return Ok(Vec::new());
        };

        Ok(rels
            .root
            .children_named("Relationship")
            .filter(|r| r.attr("TargetMode") != Some("External"))
            .filter_map(|r| {
                Some(Relationship {
                    id: r.attr("Id")?.to_string(),
                    rel_type: r.attr("Type").unwrap_or_default().to_string(),
                    target: resolve_target(dir, r.attr("Target")?),
                })
            })
            .collect())
    }

    /// Writes the package to `destination` through a temporary file.
    pub fn save(&self, destination: &Path) -> ReplaceResult<()> {
        write_atomic(destination, |file| {
            let mut zip = ZipWriter::new(file);
            for entry in &self.entries {
                let method = match entry.compression {
                    CompressionMethod::Stored => CompressionMethod::Stored,
                    _ => CompressionMethod::Deflated,
                };
                let options = SimpleFileOptions::default().compression_method(method);

                if entry.is_dir {
                    zip.add_directory(entry.name.as_str(), options)
                        .map_err(|e| ReplaceError::archive(destination, e))?;
                    continue;
                }

                zip.start_file(entry.name.as_str(), options)
                    .map_err(|e| ReplaceError::archive(destination, e))?;
                zip.write_all(&entry.data)
                    .map_err(|e| ReplaceError::io(destination, e))?;
            }
            zip.finish()
                .map_err(|e| ReplaceError::archive(destination, e))?;
            Ok(())
        })?;

        tracing::debug!(path = %destination.display(), "package written");
        Ok(())
    }
}

/// Resolves a relationship target relative to the directory of its source.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Atomically writes `path`: `write` fills a temporary file in the same
/// directory, which then replaces the destination.
pub fn write_atomic<F>(path: &Path, write: F) -> ReplaceResult<()>
where
    F: FnOnce(&mut File) -> ReplaceResult<()>,
{
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| ReplaceError::io(parent, e))?;
    write(tmp.as_file_mut())?;
    tmp.as_file_mut()
        .flush()
        .map_err(|e| ReplaceError::io(path, e))?;
    tmp.persist(path).map_err(|e| ReplaceError::io(path, e.error))?;
    Ok(())
}

/// Reads a whole file, attaching the path to any error.
pub fn read_file(path: &Path) -> ReplaceResult<Vec<u8>> {
    fs::read(path).map_err(|e| ReplaceError::io(path, e))
}
