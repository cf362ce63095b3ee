//! Cell highlighting through the workbook stylesheet.
//!
//! Highlighting a cell means pointing it at a cell format (`xf`) that is a
//! copy of its current one with a solid fill. The fill is created once per
//! workbook and each original format gets exactly one highlighted copy, no
//! matter how many cells use it.

use std::collections::HashMap;

use crate::domain::HexColor;
use crate::package::{XmlDocument, XmlElement, XmlNode};

/// Child order of `styleSheet`.
const STYLESHEET_ORDER: &[&str] = &[
    "numFmts", "fonts", "fills", "borders", "cellStyleXfs", "cellXfs", "cellStyles", "dxfs",
    "tableStyles", "colors", "extLst",
];

#[derive(Debug)]
pub struct StyleSheet {
    document: XmlDocument,
    highlight: HexColor,
    fill_id: Option<usize>,
    /// Original `xf` index to its highlighted copy.
    derived: HashMap<usize, usize>,
    modified: bool,
}

impl StyleSheet {
    pub fn new(document: XmlDocument, highlight: HexColor) -> Self {
        Self {
            document,
            highlight,
            fill_id: None,
            derived: HashMap::new(),
            modified: false,
        }
    }

    /// The highlighted counterpart of cell format `style`.
    pub fn highlighted(&mut self, style: usize) -> usize {
        if let Some(&derived) = self.derived.get(&style) {
            return derived;
        }

        let fill_id = self.fill();
        let cell_xfs = self.cell_xfs();

        let mut xf = cell_xfs
            .children_named("xf")
            .nth(style)
            .cloned()
            .unwrap_or_else(|| default_xf(cell_xfs));
        xf.set_attr("fillId", fill_id.to_string());
        xf.set_attr("applyFill", "1");

        let index = append_counted(cell_xfs, xf);
        self.derived.insert(style, index);
        self.modified = true;

        tracing::debug!(style, derived = index, "highlighted cell format added");
        index
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn document(&self) -> &XmlDocument {
        &self.document
    }

    /// Derived formats created so far.
    pub fn derived_count(&self) -> usize {
        self.derived.len()
    }

    /// Id of the highlight fill, created on first use.
    fn fill(&mut self) -> usize {
        if let Some(id) = self.fill_id {
            return id;
        }

        let root = &mut self.document.root;
        if root.child("fills").is_none() {
            let mut fills = XmlElement::new(root.sibling_name("fills"));
            for pattern in ["none", "gray125"] {
                let fill = XmlElement::new(root.sibling_name("fill")).with_child(
                    XmlElement::new(root.sibling_name("patternFill")).with_attr("patternType", pattern),
                );
                append_counted(&mut fills, fill);
            }
            root.insert_ordered(fills, STYLESHEET_ORDER);
        }

        let fill = XmlElement::new(root.sibling_name("fill")).with_child(
            XmlElement::new(root.sibling_name("patternFill"))
                .with_attr("patternType", "solid")
                .with_child(
                    XmlElement::new(root.sibling_name("fgColor"))
                        .with_attr("rgb", self.highlight.argb()),
                )
                .with_child(XmlElement::new(root.sibling_name("bgColor")).with_attr("indexed", "64")),
        );

        let id = match root.child_mut("fills") {
            Some(fills) => append_counted(fills, fill),
            None => 0,
        };
        self.fill_id = Some(id);
        self.modified = true;
        id
    }

    /// `cellXfs`, created with one default format if missing.
    fn cell_xfs(&mut self) -> &mut XmlElement {
        let root = &mut self.document.root;
        if root.child("cellXfs").is_none() {
            let mut cell_xfs = XmlElement::new(root.sibling_name("cellXfs"));
            let xf = default_xf(&cell_xfs);
            append_counted(&mut cell_xfs, xf);
            root.insert_ordered(cell_xfs, STYLESHEET_ORDER);
        }
        root.ensure_child("cellXfs", STYLESHEET_ORDER)
    }
}

fn default_xf(parent: &XmlElement) -> XmlElement {
    XmlElement::new(parent.sibling_name("xf"))
        .with_attr("numFmtId", "0")
        .with_attr("fontId", "0")
        .with_attr("fillId", "0")
        .with_attr("borderId", "0")
        .with_attr("xfId", "0")
}

/// Appends `child` to a counted collection and returns its index.
fn append_counted(collection: &mut XmlElement, child: XmlElement) -> usize {
    let local = child.local_name().to_string();
    let index = collection.children_named(&local).count();
    collection.children.push(XmlNode::Element(child));
    collection.set_attr("count", (index + 1).to_string());
    index
}
