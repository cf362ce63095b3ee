//! Spreadsheets.
//!
//! Content units are shared-string items (cells with `t="s"`), inline
//! strings (`t="inlineStr"`) and cached formula strings (`t="str"`). A shared string is rewritten once; every other
//! cell pointing at it reuses the cached result, and still counts its
//! replacements and gets highlighted. Table column names that equal a
//! rewritten shared string are renamed along with it.

use std::collections::HashMap;
use std::path::Path;

use crate::domain::{Formatting, Replacer, Segment, StyleSpec};
use crate::error::{ReplaceError, ReplaceResult};
use crate::package::{Package, XmlDocument, XmlElement, XmlNode};

use super::stylesheet::StyleSheet;
use super::strategy::{ConversionStrategy, ReplacementSummary};

const WORKBOOK: &str = "xl/workbook.xml";
const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const STYLES: &str = "xl/styles.xml";

const OFFICE_DOCUMENT_REL: &str = "/officeDocument";
const SHARED_STRINGS_REL: &str = "/sharedStrings";
const STYLES_REL: &str = "/styles";
const TABLE_REL: &str = "/table";

/// Child order used when adding run properties.
const RPR_ORDER: &[&str] = &[
    "rFont", "charset", "family", "b", "i", "strike", "outline", "shadow", "condense", "extend",
    "color", "sz", "u", "vertAlign", "scheme",
];

/// Run properties (`rPr`) of a rich-text run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XlsxRunFormat {
    pub properties: Option<XmlElement>,
    /// Qualified name for properties created by an overlay.
    name: String,
}

impl Default for XlsxRunFormat {
    fn default() -> Self {
        Self {
            properties: None,
            name: "rPr".to_string(),
        }
    }
}

impl XlsxRunFormat {
    /// Formatting of `element` (a run, or a string item without runs),
    /// using its namespace prefix.
    pub fn of(element: &XmlElement) -> Self {
        Self {
            properties: element.child("rPr").cloned(),
            name: element.sibling_name("rPr"),
        }
    }
}

impl Formatting for XlsxRunFormat {
    fn overlay(&mut self, style: &StyleSpec) {
        let name = &self.name;
        let rpr = self
            .properties
            .get_or_insert_with(|| XmlElement::new(name.clone()));

        for (on, local) in [
            (style.bold, "b"),
            (style.italics, "i"),
            (style.strikethrough, "strike"),
        ] {
            if on {
                rpr.ensure_child(local, RPR_ORDER).remove_attr("val");
            }
        }

        if style.underline {
            rpr.ensure_child("u", RPR_ORDER).set_attr("val", "single");
        }

        if let Some(color) = &style.text_color {
            let element = rpr.ensure_child("color", RPR_ORDER);
            element.attributes.clear();
            element.set_attr("rgb", color.argb());
        }
    }
}

/// Rewrites a workbook: `.xlsx` to `.xlsx`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxRewrite;

impl ConversionStrategy for XlsxRewrite {
    fn convert(
        &self,
        source: &Path,
        destination: &Path,
        replacer: &Replacer,
    ) -> ReplaceResult<ReplacementSummary> {
        let mut package = Package::open(source)?;
        let workbook_part = package
            .relationships("")?
            .into_iter()
            .find(|r| r.rel_type.ends_with(OFFICE_DOCUMENT_REL))
            .map_or_else(|| WORKBOOK.to_string(), |r| r.target);

        let workbook = package.xml_part(&workbook_part)?;
        let sheets = workbook
            .root
            .child("sheets")
            .ok_or_else(|| ReplaceError::malformed(source, "workbook has no sheets"))?;

        let workbook_rels = package.relationships(&workbook_part)?;
        let related = |suffix: &str, fallback: &str| {
            workbook_rels
                .iter()
                .find(|r| r.rel_type.ends_with(suffix))
                .map_or_else(|| fallback.to_string(), |r| r.target.clone())
        };
        let shared_strings_part = related(SHARED_STRINGS_REL, SHARED_STRINGS);
        let styles_part = related(STYLES_REL, STYLES);

        let mut context = WorkbookContext::new(source, replacer);
        context.shared_strings = package
            .optional_xml_part(&shared_strings_part)?
            .map(SharedStrings::new);
        if let Some(highlight) = replacer.style().and_then(|s| s.highlight.clone()) {
            match package.optional_xml_part(&styles_part)? {
                Some(document) => context.styles = Some(StyleSheet::new(document, highlight)),
                None => tracing::warn!(
                    path = %source.display(),
                    "workbook has no stylesheet, cells will not be highlighted"
                ),
            }
        }

        let mut sheet_parts = Vec::new();
        for sheet in sheets.children_named("sheet") {
            let Some(target) = sheet
                .attr("r:id")
                .and_then(|id| workbook_rels.iter().find(|r| r.id == id))
                .map(|r| r.target.clone())
            else {
                continue;
            };
            sheet_parts.push(target);
        }

        for part in sheet_parts {
            let mut sheet = package.xml_part(&part)?;
            let tables: Vec<String> = package
                .relationships(&part)?
                .into_iter()
                .filter(|r| r.rel_type.ends_with(TABLE_REL))
                .map(|r| r.target)
                .collect();
            for table in &tables {
                context.load_table(&package, table)?;
            }

            if context.process_sheet(&mut sheet, &tables)? {
                package.set_xml_part(&part, &sheet);
            }
        }

        context.write_back(&mut package, &shared_strings_part, &styles_part);
        package.save(destination)?;
        Ok(context.summary)
    }

    fn name(&self) -> &str {
        "xlsx"
    }
}

/// Cached result of rewriting one shared string.
#[derive(Debug, Clone)]
struct SharedStringEdit {
    match_count: usize,
    old_text: String,
    new_text: String,
}

#[derive(Debug)]
struct SharedStrings {
    document: XmlDocument,
    /// Child index in the root of each `si`, by shared-string id.
    items: Vec<usize>,
    modified: bool,
}

impl SharedStrings {
    fn new(document: XmlDocument) -> Self {
        let items = document
            .root
            .children
            .iter()
            .enumerate()
            .filter(|(_, node)| matches!(node, XmlNode::Element(e) if e.is("si")))
            .map(|(index, _)| index)
            .collect();
        Self {
            document,
            items,
            modified: false,
        }
    }

    fn item_mut(&mut self, id: usize) -> Option<&mut XmlElement> {
        let index = *self.items.get(id)?;
        self.document.root.children.get_mut(index)?.as_element_mut()
    }
}

#[derive(Debug)]
struct TablePart {
    document: XmlDocument,
    modified: bool,
}

/// Per-workbook state, discarded once the workbook is written.
struct WorkbookContext<'r> {
    path: &'r Path,
    replacer: &'r Replacer,
    shared_strings: Option<SharedStrings>,
    edits: HashMap<usize, SharedStringEdit>,
    styles: Option<StyleSheet>,
    tables: HashMap<String, TablePart>,
    summary: ReplacementSummary,
}

impl<'r> WorkbookContext<'r> {
    fn new(path: &'r Path, replacer: &'r Replacer) -> Self {
        Self {
            path,
            replacer,
            shared_strings: None,
            edits: HashMap::new(),
            styles: None,
            tables: HashMap::new(),
            summary: ReplacementSummary::none(),
        }
    }

    fn load_table(&mut self, package: &Package, part: &str) -> ReplaceResult<()> {
        if self.tables.contains_key(part) {
            return Ok(());
        }
        if let Some(document) = package.optional_xml_part(part)? {
            self.tables.insert(
                part.to_string(),
                TablePart {
                    document,
                    modified: false,
                },
            );
        }
        Ok(())
    }

    /// Processes every string cell of `sheet`. Returns true if the sheet
    /// itself changed.
    fn process_sheet(&mut self, sheet: &mut XmlDocument, tables: &[String]) -> ReplaceResult<bool> {
        let Some(data) = sheet.root.child_mut("sheetData") else {
            return Ok(false);
        };

        let mut modified = false;
        for row in data.elements_mut().filter(|e| e.is("row")) {
            for cell in row.elements_mut().filter(|e| e.is("c")) {
                modified |= self.process_cell(cell, tables)?;
            }
        }
        Ok(modified)
    }

    fn process_cell(&mut self, cell: &mut XmlElement, tables: &[String]) -> ReplaceResult<bool> {
        let kind = cell.attr("t").map(str::to_string);
        let shared = kind.as_deref() == Some("s");
        let count = match kind.as_deref() {
            Some("s") => {
                let Some(id) = cell.child("v").and_then(|v| v.text().trim().parse().ok()) else {
                    return Ok(false);
                };
                let edit = self.shared_string(id)?;
                if edit.match_count > 0 {
                    self.rename_columns(tables, &edit.old_text, &edit.new_text);
                }
                edit.match_count
            }
            Some("inlineStr") => match cell.child_mut("is") {
                Some(item) => rewrite_string_item(item, self.replacer).0,
                None => return Ok(false),
            },
            // Cached string result of a formula.
            Some("str") => match cell.child_mut("v") {
                Some(value) => rewrite_value(value, self.replacer),
                None => return Ok(false),
            },
            _ => return Ok(false),
        };

        self.summary.record(count);
        if count == 0 {
            return Ok(false);
        }

        let Some(styles) = self.styles.as_mut() else {
            // Inline and formula strings live in the sheet itself.
            return Ok(!shared);
        };
        let style = cell.attr("s").and_then(|s| s.parse().ok()).unwrap_or(0);
        cell.set_attr("s", styles.highlighted(style).to_string());
        Ok(true)
    }

    /// Rewrites shared string `id` on first use and returns the cached edit.
    fn shared_string(&mut self, id: usize) -> ReplaceResult<SharedStringEdit> {
        if let Some(edit) = self.edits.get(&id) {
            return Ok(edit.clone());
        }

        let item = self
            .shared_strings
            .as_mut()
            .and_then(|strings| strings.item_mut(id))
            .ok_or_else(|| {
                ReplaceError::malformed(self.path, format!("shared string {id} does not exist"))
            })?;

        let old_text = string_item_text(item);
        let (match_count, new_text) = rewrite_string_item(item, self.replacer);
        if match_count > 0 {
            if let Some(strings) = self.shared_strings.as_mut() {
                strings.modified = true;
            }
        }

        let edit = SharedStringEdit {
            match_count,
            old_text,
            new_text,
        };
        self.edits.insert(id, edit.clone());
        Ok(edit)
    }

    fn rename_columns(&mut self, tables: &[String], old_text: &str, new_text: &str) {
        for part in tables {
            let Some(table) = self.tables.get_mut(part) else { continue };
            let Some(columns) = table.document.root.child_mut("tableColumns") else {
                continue;
            };
            for column in columns.elements_mut().filter(|e| e.is("tableColumn")) {
                if column.attr("name") == Some(old_text) {
                    column.set_attr("name", new_text);
                    table.modified = true;
                }
            }
        }
    }

    fn write_back(&self, package: &mut Package, shared_strings_part: &str, styles_part: &str) {
        if let Some(strings) = self.shared_strings.as_ref().filter(|s| s.modified) {
            package.set_xml_part(shared_strings_part, &strings.document);
        }
        if let Some(styles) = self.styles.as_ref().filter(|s| s.is_modified()) {
            package.set_xml_part(styles_part, styles.document());
        }
        for (part, table) in &self.tables {
            if table.modified {
                package.set_xml_part(part, &table.document);
            }
        }

        tracing::debug!(
            path = %self.path.display(),
            shared_strings = self.edits.len(),
            replacements = self.summary.replacements,
            "workbook processed"
        );
    }
}

/// Text of a shared-string item or inline string, phonetic runs excluded.
fn string_item_text(item: &XmlElement) -> String {
    item.elements()
        .filter_map(|child| match child.local_name() {
            "t" => Some(child.text()),
            "r" => child.child("t").map(XmlElement::text),
            _ => None,
        })
        .collect()
}

/// Splices a shared-string item or inline string in place. Returns the
/// replacement count and the resulting text.
fn rewrite_string_item(item: &mut XmlElement, replacer: &Replacer) -> (usize, String) {
    let runs: Vec<&XmlElement> = item.children_named("r").collect();
    let rich = !runs.is_empty();

    let segments: Vec<Segment<XlsxRunFormat>> = if rich {
        runs.iter()
            .map(|run| {
                let text = run.child("t").map(XmlElement::text).unwrap_or_default();
                Segment::new(text, XlsxRunFormat::of(run))
            })
            .collect()
    } else {
        vec![Segment::new(string_item_text(item), XlsxRunFormat::of(item))]
    };

    let splice = replacer.splice(segments);
    let text = splice.text();
    if !splice.is_modified() {
        return (0, text);
    }

    let t_name = item.sibling_name("t");
    let r_name = item.sibling_name("r");
    item.children.retain(|node| match node {
        XmlNode::Element(e) => !matches!(e.local_name(), "t" | "r" | "rPh"),
        _ => true,
    });

    let mut nodes: Vec<XmlNode> = Vec::new();
    if !rich && replacer.style().is_none() {
        nodes.push(XmlNode::Element(text_element(&t_name, text.clone())));
    } else {
        for segment in splice.segments.into_iter().filter(|s| !s.text.is_empty()) {
            let mut run = XmlElement::new(r_name.clone());
            if let Some(rpr) = segment.format.properties {
                run.children.push(XmlNode::Element(rpr));
            }
            run.children
                .push(XmlNode::Element(text_element(&t_name, segment.text)));
            nodes.push(XmlNode::Element(run));
        }
        if nodes.is_empty() {
            nodes.push(XmlNode::Element(text_element(&t_name, String::new())));
        }
    }

    item.children.splice(0..0, nodes);
    (splice.match_count, text)
}

/// Replaces the text of a plain `v` value. Returns the replacement count.
fn rewrite_value(value: &mut XmlElement, replacer: &Replacer) -> usize {
    let (text, count) = replacer.replace_line(&value.text());
    if count > 0 {
        value.children = vec![XmlNode::Text(text)];
    }
    count
}

fn text_element(name: &str, text: String) -> XmlElement {
    let element = XmlElement::new(name).with_attr("xml:space", "preserve");
    if text.is_empty() {
        element
    } else {
        element.with_text(text)
    }
}
