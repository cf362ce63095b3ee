//! Word-processing documents.
//!
//! Each `w:p` paragraph of the body is one content unit and its text runs
//! are the segments. Runs holding anything besides run properties and text
//! (tabs, breaks, drawings, field characters) are left exactly where they
//! are and contribute no text.

use std::path::Path;

use crate::domain::{Formatting, Replacer, Segment, StyleSpec};
use crate::error::{ReplaceError, ReplaceResult};
use crate::package::{write_atomic, Package, XmlDocument, XmlElement, XmlNode};

use super::strategy::{ConversionStrategy, ReplacementSummary};

const MAIN_DOCUMENT: &str = "word/document.xml";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";
const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Child order of `w:rPr`.
const RPR_ORDER: &[&str] = &[
    "rStyle", "rFonts", "b", "bCs", "i", "iCs", "caps", "smallCaps", "strike", "dstrike",
    "outline", "shadow", "emboss", "imprint", "noProof", "snapToGrid", "vanish", "webHidden",
    "color", "spacing", "w", "kern", "position", "sz", "szCs", "highlight", "u", "effect", "bdr",
    "shd", "fitText", "vertAlign", "rtl", "cs", "em", "lang", "eastAsianLayout", "specVanish",
    "oMath",
];

/// Run children that do not make a run opaque.
const TEXT_RUN_CHILDREN: &[&str] = &["rPr", "t", "lastRenderedPageBreak"];

/// Run properties (`w:rPr`) of a document run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocxRunFormat {
    pub properties: Option<XmlElement>,
    /// Qualified name for properties created by an overlay.
    name: String,
}

impl Default for DocxRunFormat {
    fn default() -> Self {
        Self {
            properties: None,
            name: "w:rPr".to_string(),
        }
    }
}

impl DocxRunFormat {
    /// Formatting of `run`, using its namespace prefix.
    pub fn of(run: &XmlElement) -> Self {
        Self {
            properties: run.child("rPr").cloned(),
            name: run.sibling_name("rPr"),
        }
    }

    fn properties(&mut self) -> &mut XmlElement {
        let name = &self.name;
        self.properties
            .get_or_insert_with(|| XmlElement::new(name.clone()))
    }
}

impl Formatting for DocxRunFormat {
    fn overlay(&mut self, style: &StyleSpec) {
        let rpr = self.properties();
        let val = rpr.sibling_name("val");

        for (on, local) in [
            (style.bold, "b"),
            (style.italics, "i"),
            (style.strikethrough, "strike"),
        ] {
            if on {
                rpr.ensure_child(local, RPR_ORDER).remove_attr(&val);
            }
        }

        if style.underline {
            rpr.ensure_child("u", RPR_ORDER).set_attr(val.clone(), "single");
        }

        if let Some(color) = &style.text_color {
            let names = ["themeColor", "themeShade", "themeTint"].map(|n| rpr.sibling_name(n));
            let element = rpr.ensure_child("color", RPR_ORDER);
            for name in &names {
                element.remove_attr(name);
            }
            element.set_attr(val.clone(), color.as_str());
        }

        if let Some(fill) = &style.highlight {
            let [color, fill_attr] = ["color", "fill"].map(|n| rpr.sibling_name(n));
            let shd = rpr.ensure_child("shd", RPR_ORDER);
            shd.set_attr(val.clone(), "clear");
            shd.set_attr(color, "auto");
            shd.set_attr(fill_attr, fill.as_str());
        }
    }
}

/// Rewrites a document in place: `.docx` to `.docx`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxRewrite;

impl ConversionStrategy for DocxRewrite {
    fn convert(
        &self,
        source: &Path,
        destination: &Path,
        replacer: &Replacer,
    ) -> ReplaceResult<ReplacementSummary> {
        let mut package = Package::open(source)?;
        let part = main_document_part(&package)?;
        let mut document = package.xml_part(&part)?;

        let mut summary = ReplacementSummary::none();
        let body = body_mut(&mut document, source)?;
        rewrite_paragraphs(body, replacer, &mut |_, count| summary.record(count));

        if summary.has_replacements() {
            package.set_xml_part(&part, &document);
        }
        package.save(destination)?;
        Ok(summary)
    }

    fn name(&self) -> &str {
        "docx"
    }
}

/// Extracts replaced paragraphs as lines: `.docx` to text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxToText;

impl ConversionStrategy for DocxToText {
    fn convert(
        &self,
        source: &Path,
        destination: &Path,
        replacer: &Replacer,
    ) -> ReplaceResult<ReplacementSummary> {
        let package = Package::open(source)?;
        let part = main_document_part(&package)?;
        let mut document = package.xml_part(&part)?;

        let mut summary = ReplacementSummary::none();
        let mut output = String::new();
        let body = body_mut(&mut document, source)?;
        rewrite_paragraphs(body, replacer, &mut |text, count| {
            summary.record(count);
            output.push_str(text);
            output.push('\n');
        });

        write_atomic(destination, |file| {
            use std::io::Write;
            file.write_all(output.as_bytes())
                .map_err(|e| ReplaceError::io(destination, e))
        })?;
        Ok(summary)
    }

    fn name(&self) -> &str {
        "docx-to-text"
    }
}

fn main_document_part(package: &Package) -> ReplaceResult<String> {
    let target = package
        .relationships("")?
        .into_iter()
        .find(|r| r.rel_type.ends_with(OFFICE_DOCUMENT_REL))
        .map(|r| r.target);
    Ok(target.unwrap_or_else(|| MAIN_DOCUMENT.to_string()))
}

fn body_mut<'d>(document: &'d mut XmlDocument, path: &Path) -> ReplaceResult<&'d mut XmlElement> {
    document
        .root
        .child_mut("body")
        .ok_or_else(|| ReplaceError::malformed(path, "document has no body"))
}

/// Replaces text in every paragraph under `container`, nested ones
/// included. `visit` receives each paragraph's resulting text and its
/// replacement count, in document order.
pub(crate) fn rewrite_paragraphs(
    container: &mut XmlElement,
    replacer: &Replacer,
    visit: &mut dyn FnMut(&str, usize),
) {
    for child in container.elements_mut() {
        if child.is("p") {
            let (text, count) = rewrite_paragraph(child, replacer);
            visit(&text, count);
        }
        rewrite_paragraphs(child, replacer, visit);
    }
}

fn rewrite_paragraph(paragraph: &mut XmlElement, replacer: &Replacer) -> (String, usize) {
    let mut runs = Vec::new();
    collect_runs(paragraph, &mut Vec::new(), &mut runs);

    if runs.is_empty() {
        return rewrite_runless(paragraph, replacer);
    }

    let text_runs: Vec<(Vec<usize>, &XmlElement)> = runs
        .into_iter()
        .filter_map(|path| {
            let run = element_at(paragraph, &path)?;
            is_text_run(run).then_some((path, run))
        })
        .collect();

    let segments: Vec<Segment<DocxRunFormat>> = text_runs
        .iter()
        .map(|(_, run)| Segment::new(run_text(run), DocxRunFormat::of(run)))
        .collect();

    let splice = replacer.splice(segments);
    let text = splice.text();
    if !splice.is_modified() {
        return (text, 0);
    }

    // Output runs grouped by the input run they came from.
    let mut replacements: Vec<Vec<XmlNode>> = vec![Vec::new(); text_runs.len()];
    for (segment, &origin) in splice.segments.into_iter().zip(&splice.origins) {
        if let Some(run) = derived_run(text_runs[origin].1, segment) {
            replacements[origin].push(XmlNode::Element(run));
        }
    }

    let paths: Vec<Vec<usize>> = text_runs.into_iter().map(|(path, _)| path).collect();
    for (path, nodes) in paths.iter().zip(replacements).rev() {
        replace_at(paragraph, path, nodes);
    }

    (text, splice.match_count)
}

/// A paragraph whose text lives outside any run. Its loose text nodes and
/// bare `w:t` children are spliced into synthetic runs placed where the
/// first of them was; every other child stays where it is.
fn rewrite_runless(paragraph: &mut XmlElement, replacer: &Replacer) -> (String, usize) {
    let loose: Vec<usize> = paragraph
        .children
        .iter()
        .enumerate()
        .filter(|(_, node)| is_loose_text(node))
        .map(|(index, _)| index)
        .collect();
    let original: String = loose
        .iter()
        .map(|&index| loose_text(&paragraph.children[index]))
        .collect();
    let Some(&first) = loose.first().filter(|_| !original.is_empty()) else {
        return (original, 0);
    };

    let template = XmlElement::new(paragraph.sibling_name("r"));
    let splice = replacer.splice(vec![Segment::new(original, DocxRunFormat::of(&template))]);
    let text = splice.text();
    if !splice.is_modified() {
        return (text, 0);
    }

    let runs: Vec<XmlNode> = splice
        .segments
        .into_iter()
        .filter_map(|segment| derived_run(&template, segment))
        .map(XmlNode::Element)
        .collect();
    for &index in loose.iter().rev() {
        paragraph.children.remove(index);
    }
    paragraph.children.splice(first..first, runs);
    (text, splice.match_count)
}

fn is_loose_text(node: &XmlNode) -> bool {
    match node {
        XmlNode::Text(_) | XmlNode::CData(_) => true,
        XmlNode::Element(element) => element.is("t"),
        _ => false,
    }
}

fn loose_text(node: &XmlNode) -> String {
    match node {
        XmlNode::Text(text) | XmlNode::CData(text) => text.clone(),
        XmlNode::Element(element) => element.text(),
        _ => String::new(),
    }
}

/// Child-index paths (relative to the paragraph) of every run in document
/// order. Nested paragraphs are not entered.
fn collect_runs(element: &XmlElement, path: &mut Vec<usize>, runs: &mut Vec<Vec<usize>>) {
    for (index, node) in element.children.iter().enumerate() {
        let XmlNode::Element(child) = node else { continue };
        path.push(index);
        if child.is("r") {
            runs.push(path.clone());
        } else if !child.is("p") && !child.is("pPr") {
            collect_runs(child, path, runs);
        }
        path.pop();
    }
}

fn element_at<'e>(root: &'e XmlElement, path: &[usize]) -> Option<&'e XmlElement> {
    path.iter()
        .try_fold(root, |element, &index| element.children.get(index)?.as_element())
}

/// Swaps the node at `path` for `nodes`.
fn replace_at(root: &mut XmlElement, path: &[usize], nodes: Vec<XmlNode>) {
    let Some((&last, parents)) = path.split_last() else { return };
    let mut parent = root;
    for &index in parents {
        match parent.children.get_mut(index).and_then(XmlNode::as_element_mut) {
            Some(next) => parent = next,
            None => return,
        }
    }
    if last < parent.children.len() {
        parent.children.splice(last..=last, nodes);
    }
}

fn is_text_run(run: &XmlElement) -> bool {
    run.elements().all(|e| TEXT_RUN_CHILDREN.contains(&e.local_name()))
}

fn run_text(run: &XmlElement) -> String {
    run.children_named("t").map(XmlElement::text).collect()
}

/// A run carrying `segment`, shaped like `origin`. Empty segments yield none.
fn derived_run(origin: &XmlElement, segment: Segment<DocxRunFormat>) -> Option<XmlElement> {
    if segment.text.is_empty() {
        return None;
    }

    let mut run = XmlElement::new(origin.name.clone());
    run.attributes = origin.attributes.clone();
    if let Some(rpr) = segment.format.properties {
        run.children.push(XmlNode::Element(rpr));
    }
    run.children.push(XmlNode::Element(
        XmlElement::new(origin.sibling_name("t"))
            .with_attr("xml:space", "preserve")
            .with_text(segment.text),
    ));
    Some(run)
}

/// A paragraph built from plain-text segments.
pub(crate) fn paragraph(segments: Vec<Segment<DocxRunFormat>>) -> XmlElement {
    let template = XmlElement::new("w:r");
    let mut paragraph = XmlElement::new("w:p");
    for segment in segments {
        if let Some(run) = derived_run(&template, segment) {
            paragraph.children.push(XmlNode::Element(run));
        }
    }
    paragraph
}

/// A new single-part document holding `paragraphs`.
pub(crate) fn new_document(path: &Path, paragraphs: Vec<XmlElement>) -> Package {
    let mut body = XmlElement::new("w:body");
    body.children
        .extend(paragraphs.into_iter().map(XmlNode::Element));
    let root = XmlElement::new("w:document")
        .with_attr("xmlns:w", WORDML_NS)
        .with_child(body);

    let mut package = Package::new(path);
    package.set_part("[Content_Types].xml", CONTENT_TYPES.as_bytes().to_vec());
    package.set_part("_rels/.rels", ROOT_RELS.as_bytes().to_vec());
    package.set_xml_part(MAIN_DOCUMENT, &XmlDocument::new(root));
    package
}

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"</Types>"#,
);

const ROOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    r#"</Relationships>"#,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Dictionary, ReplaceOptions};

    fn replacer(pairs: &[(&str, &str)], options: ReplaceOptions) -> Replacer {
        Replacer::new(Dictionary::from_pairs(pairs.iter().copied()).unwrap(), &options).unwrap()
    }

    fn parse(xml: &str) -> XmlElement {
        XmlDocument::parse(xml.as_bytes()).unwrap().root
    }

    fn run_texts(paragraph: &XmlElement) -> Vec<String> {
        let mut runs = Vec::new();
        collect_runs(paragraph, &mut Vec::new(), &mut runs);
        runs.iter()
            .filter_map(|p| element_at(paragraph, p))
            .map(run_text)
            .collect()
    }

    #[test]
    fn test_match_across_runs_keeps_formatting() {
        let mut p = parse(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>say hel</w:t></w:r><w:r><w:t xml:space="preserve">lo world</w:t></w:r></w:p>"#,
        );
        let r = replacer(&[("hello", "bye")], ReplaceOptions::new());
        let (text, count) = rewrite_paragraph(&mut p, &r);

        assert_eq!(count, 1);
        assert_eq!(text, "say bye world");
        assert_eq!(run_texts(&p), vec!["say bye", " world"]);
        let first = p.child("r").unwrap();
        assert!(first.child("rPr").unwrap().child("b").is_some());
    }

    #[test]
    fn test_opaque_runs_stay_in_place() {
        let mut p = parse(
            r#"<w:p><w:r><w:t>a cat</w:t></w:r><w:r><w:tab/></w:r><w:r><w:t>cat</w:t></w:r></w:p>"#,
        );
        let r = replacer(&[("cat", "dog")], ReplaceOptions::new());
        let (_, count) = rewrite_paragraph(&mut p, &r);

        assert_eq!(count, 2);
        let kinds: Vec<bool> = p.children_named("r").map(|r| r.child("tab").is_some()).collect();
        assert_eq!(kinds, vec![false, true, false]);
        assert_eq!(run_texts(&p), vec!["a dog", "", "dog"]);
    }

    #[test]
    fn test_runs_in_hyperlinks_are_searched() {
        let mut p = parse(
            r#"<w:p><w:hyperlink><w:r><w:t>click here</w:t></w:r></w:hyperlink></w:p>"#,
        );
        let r = replacer(&[("here", "there")], ReplaceOptions::new());
        rewrite_paragraph(&mut p, &r);
        let link = p.child("hyperlink").unwrap();
        assert_eq!(link.child("r").unwrap().text(), "click there");
    }

    #[test]
    fn test_styled_replacement_gets_own_run() {
        let mut p = parse(r#"<w:p><w:r><w:rPr><w:color w:val="000000" w:themeColor="text1"/></w:rPr><w:t>a cat</w:t></w:r></w:p>"#);
        let style = StyleSpec::new()
            .bold(true)
            .underline(true)
            .highlight("#ffff00")
            .text_color("ff0000");
        let r = replacer(&[("cat", "dog")], ReplaceOptions::new().with_style(style));
        rewrite_paragraph(&mut p, &r);

        let runs: Vec<&XmlElement> = p.children_named("r").collect();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text(), "a ");
        let rpr = runs[1].child("rPr").unwrap();
        assert!(rpr.child("b").is_some());
        assert_eq!(rpr.child("u").unwrap().attr("w:val"), Some("single"));
        let color = rpr.child("color").unwrap();
        assert_eq!(color.attr("w:val"), Some("FF0000"));
        assert_eq!(color.attr("w:themeColor"), None);
        let shd = rpr.child("shd").unwrap();
        assert_eq!(shd.attr("w:fill"), Some("FFFF00"));
        assert_eq!(shd.attr("w:val"), Some("clear"));

        let order: Vec<&str> = rpr.elements().map(|e| e.local_name()).collect();
        assert_eq!(order, vec!["b", "color", "u", "shd"]);

        // The untouched prefix keeps the original color.
        let prefix = runs[0].child("rPr").unwrap().child("color").unwrap();
        assert_eq!(prefix.attr("w:themeColor"), Some("text1"));
    }

    #[test]
    fn test_unmatched_paragraph_untouched() {
        let xml = r#"<w:p><w:r><w:t>nothing</w:t></w:r><w:r><w:t>here</w:t></w:r></w:p>"#;
        let mut p = parse(xml);
        let before = p.clone();
        let r = replacer(&[("zzz", "y")], ReplaceOptions::new());
        assert_eq!(rewrite_paragraph(&mut p, &r), ("nothinghere".to_string(), 0));
        assert_eq!(p, before);
    }

    #[test]
    fn test_nested_paragraphs_visited() {
        let mut body = parse(
            r#"<w:body><w:p><w:r><w:t>cat</w:t></w:r></w:p><w:tbl><w:tr><w:tc><w:p><w:r><w:t>cat</w:t></w:r></w:p></w:tc></w:tr></w:tbl></w:body>"#,
        );
        let r = replacer(&[("cat", "dog")], ReplaceOptions::new());
        let mut seen = Vec::new();
        rewrite_paragraphs(&mut body, &r, &mut |text, count| seen.push((text.to_string(), count)));
        assert_eq!(seen, vec![("dog".to_string(), 1), ("dog".to_string(), 1)]);
    }

    #[test]
    fn test_runless_paragraph_keeps_other_children() {
        let mut p = parse(
            r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:bookmarkStart w:id="0" w:name="intro"/><w:t>the cat</w:t><w:bookmarkEnd w:id="0"/></w:p>"#,
        );
        let r = replacer(&[("cat", "dog")], ReplaceOptions::new());
        let (text, count) = rewrite_paragraph(&mut p, &r);

        assert_eq!((text.as_str(), count), ("the dog", 1));
        let names: Vec<&str> = p.elements().map(|e| e.local_name()).collect();
        assert_eq!(names, vec!["pPr", "bookmarkStart", "r", "bookmarkEnd"]);
        assert_eq!(run_texts(&p), vec!["the dog"]);
        assert_eq!(p.child("bookmarkStart").unwrap().attr("w:name"), Some("intro"));
    }

    #[test]
    fn test_runless_paragraph_without_match_untouched() {
        let mut p = parse(r#"<w:p><w:bookmarkStart w:id="1"/><w:t>plain</w:t></w:p>"#);
        let before = p.clone();
        let r = replacer(&[("cat", "dog")], ReplaceOptions::new());
        assert_eq!(rewrite_paragraph(&mut p, &r), ("plain".to_string(), 0));
        assert_eq!(p, before);
    }

    #[test]
    fn test_overlay_uses_run_prefix() {
        let mut format = DocxRunFormat::of(&parse(r#"<x:r xmlns:x="urn:w"><x:t>a</x:t></x:r>"#));
        format.overlay(&StyleSpec::new().italics(true));
        let rpr = format.properties.unwrap();
        assert_eq!(rpr.name, "x:rPr");
        assert_eq!(rpr.elements().next().unwrap().name, "x:i");
    }

    #[test]
    fn test_bold_off_value_is_cleared() {
        let mut format = DocxRunFormat::of(&parse(r#"<w:r><w:rPr><w:b w:val="0"/></w:rPr></w:r>"#));
        format.overlay(&StyleSpec::new().bold(true));
        let rpr = format.properties.unwrap();
        assert_eq!(rpr.child("b").unwrap().attr("w:val"), None);
    }
}
