//! Custom assertions and readers for replacement testing.
//!
//! Provides domain-specific helpers that read produced documents back and
//! make tests more readable with better failure messages.

use phraseswap::package::{Package, XmlDocument, XmlElement};
use std::path::Path;

/// Reads and parses an XML part of a produced package.
///
/// # Panics
/// Panics if the package or part cannot be read.
pub fn read_xml_part(path: &Path, part: &str) -> XmlDocument {
    let package = Package::open(path)
        .unwrap_or_else(|e| panic!("Failed to open package '{}': {}", path.display(), e));
    package
        .xml_part(part)
        .unwrap_or_else(|e| panic!("Failed to read part '{}': {}", part, e))
}

/// All descendant elements of `element` with local name `local`, in
/// document order.
pub fn descendants<'a>(element: &'a XmlElement, local: &str) -> Vec<&'a XmlElement> {
    let mut found = Vec::new();
    collect(element, local, &mut found);
    found
}

fn collect<'a>(element: &'a XmlElement, local: &str, found: &mut Vec<&'a XmlElement>) {
    for child in element.elements() {
        if child.is(local) {
            found.push(child);
        }
        collect(child, local, found);
    }
}

/// Text of every paragraph in a document's body.
pub fn docx_paragraphs(path: &Path) -> Vec<String> {
    let document = read_xml_part(path, "word/document.xml");
    descendants(&document.root, "p")
        .into_iter()
        .map(|p| descendants(p, "t").iter().map(|t| t.text()).collect())
        .collect()
}

/// Text of every run in a document, grouped by paragraph.
pub fn docx_runs(path: &Path) -> Vec<Vec<String>> {
    let document = read_xml_part(path, "word/document.xml");
    descendants(&document.root, "p")
        .into_iter()
        .map(|p| descendants(p, "r").iter().map(|r| r.text()).collect())
        .collect()
}

/// Text of every shared-string item.
pub fn shared_strings(path: &Path) -> Vec<String> {
    let document = read_xml_part(path, "xl/sharedStrings.xml");
    document
        .root
        .children_named("si")
        .map(|si| descendants(si, "t").iter().map(|t| t.text()).collect())
        .collect()
}

/// Every cell of the first worksheet.
pub fn sheet_cells(path: &Path) -> Vec<XmlElement> {
    let document = read_xml_part(path, "xl/worksheets/sheet1.xml");
    descendants(&document.root, "c").into_iter().cloned().collect()
}

/// Asserts that two packages hold the same parts with identical bytes.
///
/// # Panics
/// Panics naming the first part that differs.
pub fn assert_same_parts(expected: &Path, actual: &Path) {
    let expected = Package::open(expected).expect("Failed to open expected package");
    let actual = Package::open(actual).expect("Failed to open actual package");

    let expected_names: Vec<&str> = expected.part_names().collect();
    let actual_names: Vec<&str> = actual.part_names().collect();
    assert_eq!(expected_names, actual_names, "Packages should hold the same parts");

    for name in expected_names {
        assert!(
            expected.part(name) == actual.part(name),
            "Part '{}' should be unchanged",
            name
        );
    }
}

/// Asserts that a text file holds exactly `expected`.
///
/// # Panics
/// Panics if the file cannot be read or differs.
pub fn assert_text_file(path: &Path, expected: &str) {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read '{}': {}", path.display(), e));
    assert_eq!(content, expected, "Unexpected content in '{}'", path.display());
}
