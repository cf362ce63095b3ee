//! Test fixtures and document builders.
//!
//! Provides builders that write real `.docx` and `.xlsx` packages with
//! specific content, following the Builder pattern for clean test setup.

use anyhow::Result;
use quick_xml::escape::escape;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CONTENT_TYPES_DOCX: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS_DOCX: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const CONTENT_TYPES_XLSX: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/xl/tables/table1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.table+xml"/></Types>"#;

const ROOT_RELS_XLSX: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const SHEET_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/table" Target="../tables/table1.xml"/></Relationships>"#;

/// Two cell formats: 0 is the default, 1 is bold with a date format.
pub const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="1" fillId="0" borderId="0" xfId="0" applyNumberFormat="1" applyFont="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

/// Writes `parts` as a zip archive at `path`.
pub fn write_zip(path: &Path, parts: &[(&str, String)]) -> Result<PathBuf> {
    let mut zip = ZipWriter::new(File::create(path)?);
    let options = SimpleFileOptions::default();
    for (name, content) in parts {
        zip.start_file(*name, options)?;
        zip.write_all(content.as_bytes())?;
    }
    zip.finish()?;
    Ok(path.to_path_buf())
}

/// Escapes text for inclusion in XML content or attributes.
pub fn xml_escape(text: &str) -> String {
    escape(text).into_owned()
}

/// A run in a test paragraph.
#[derive(Debug, Clone)]
pub struct TestRun {
    pub text: String,
    /// Inner XML of `w:rPr`, if any.
    pub properties: Option<String>,
}

/// Builder for test word-processing documents.
///
/// # Example
///
/// ```no_run
/// # use anyhow::Result;
/// # fn main() -> Result<()> {
/// let path = TestDocxBuilder::new()
///     .with_paragraph("Plain paragraph")
///     .with_runs(&[("bold ", Some("<w:b/>")), ("plain", None)])
///     .build(std::path::Path::new("/tmp/test.docx"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct TestDocxBuilder {
    body: Vec<String>,
}

impl TestDocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a paragraph with a single unformatted run.
    pub fn with_paragraph(self, text: &str) -> Self {
        self.with_runs(&[(text, None)])
    }

    /// Adds a paragraph made of the given runs.
    pub fn with_runs(mut self, runs: &[(&str, Option<&str>)]) -> Self {
        let runs: Vec<TestRun> = runs
            .iter()
            .map(|(text, properties)| TestRun {
                text: text.to_string(),
                properties: properties.map(str::to_string),
            })
            .collect();
        self.body.push(paragraph_xml(&runs));
        self
    }

    /// Adds raw body XML, e.g. a table.
    pub fn with_raw(mut self, xml: &str) -> Self {
        self.body.push(xml.to_string());
        self
    }

    /// The `word/document.xml` content.
    pub fn document_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr/></w:body></w:document>"#,
            self.body.concat()
        )
    }

    /// Builds the document and writes it to `path`.
    pub fn build(&self, path: &Path) -> Result<PathBuf> {
        write_zip(
            path,
            &[
                ("[Content_Types].xml", CONTENT_TYPES_DOCX.to_string()),
                ("_rels/.rels", ROOT_RELS_DOCX.to_string()),
                ("word/document.xml", self.document_xml()),
            ],
        )
    }
}

/// Paragraph XML for `runs`.
pub fn paragraph_xml(runs: &[TestRun]) -> String {
    let mut xml = String::from("<w:p>");
    for run in runs {
        xml.push_str("<w:r>");
        if let Some(properties) = &run.properties {
            xml.push_str(&format!("<w:rPr>{}</w:rPr>", properties));
        }
        xml.push_str(&format!(
            r#"<w:t xml:space="preserve">{}</w:t></w:r>"#,
            xml_escape(&run.text)
        ));
    }
    xml.push_str("</w:p>");
    xml
}

/// A cell value in a test worksheet.
#[derive(Debug, Clone)]
pub enum TestCell {
    /// Index into the shared-string table, with a cell format index.
    Shared(usize, Option<usize>),
    Inline(String),
    /// A formula with its cached string result.
    FormulaString(String),
    Number(f64),
}

/// Builder for test workbooks with one sheet.
#[derive(Debug, Clone, Default)]
pub struct TestXlsxBuilder {
    shared_strings: Vec<String>,
    rows: Vec<Vec<TestCell>>,
    table_columns: Option<Vec<String>>,
}

impl TestXlsxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plain shared string.
    pub fn with_shared_string(mut self, text: &str) -> Self {
        self.shared_strings
            .push(format!(r#"<si><t xml:space="preserve">{}</t></si>"#, xml_escape(text)));
        self
    }

    /// Adds a rich shared string; each run has optional `rPr` inner XML.
    pub fn with_rich_shared_string(mut self, runs: &[(&str, Option<&str>)]) -> Self {
        let mut xml = String::from("<si>");
        for (text, properties) in runs {
            xml.push_str("<r>");
            if let Some(properties) = properties {
                xml.push_str(&format!("<rPr>{}</rPr>", properties));
            }
            xml.push_str(&format!(r#"<t xml:space="preserve">{}</t></r>"#, xml_escape(text)));
        }
        xml.push_str("</si>");
        self.shared_strings.push(xml);
        self
    }

    pub fn with_row(mut self, cells: Vec<TestCell>) -> Self {
        self.rows.push(cells);
        self
    }

    /// Adds a table over the first columns of the sheet.
    pub fn with_table(mut self, columns: &[&str]) -> Self {
        self.table_columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    fn sheet_xml(&self) -> String {
        let mut rows = String::new();
        for (r, cells) in self.rows.iter().enumerate() {
            rows.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, cell) in cells.iter().enumerate() {
                let reference = format!("{}{}", column_name(c), r + 1);
                rows.push_str(&match cell {
                    TestCell::Shared(id, Some(style)) => {
                        format!(r#"<c r="{reference}" s="{style}" t="s"><v>{id}</v></c>"#)
                    }
                    TestCell::Shared(id, None) => {
                        format!(r#"<c r="{reference}" t="s"><v>{id}</v></c>"#)
                    }
                    TestCell::Inline(text) => format!(
                        r#"<c r="{reference}" t="inlineStr"><is><t>{}</t></is></c>"#,
                        xml_escape(text)
                    ),
                    TestCell::FormulaString(text) => format!(
                        r#"<c r="{reference}" t="str"><f>CONCAT("x")</f><v>{}</v></c>"#,
                        xml_escape(text)
                    ),
                    TestCell::Number(n) => format!(r#"<c r="{reference}"><v>{n}</v></c>"#),
                });
            }
            rows.push_str("</row>");
        }

        let table_parts = if self.table_columns.is_some() {
            r#"<tableParts count="1"><tablePart r:id="rId1"/></tableParts>"#
        } else {
            ""
        };

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheetData>{rows}</sheetData>{table_parts}</worksheet>"#
        )
    }

    fn shared_strings_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">{1}</sst>"#,
            self.shared_strings.len(),
            self.shared_strings.concat()
        )
    }

    fn table_xml(&self, columns: &[String]) -> String {
        let last = format!("{}{}", column_name(columns.len().saturating_sub(1)), self.rows.len().max(1));
        let columns_xml: String = columns
            .iter()
            .enumerate()
            .map(|(i, name)| format!(r#"<tableColumn id="{}" name="{}"/>"#, i + 1, xml_escape(name)))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><table xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" id="1" name="Table1" displayName="Table1" ref="A1:{last}" totalsRowShown="0"><autoFilter ref="A1:{last}"/><tableColumns count="{}">{columns_xml}</tableColumns><tableStyleInfo name="TableStyleMedium2" showRowStripes="1"/></table>"#,
            columns.len()
        )
    }

    /// Builds the workbook and writes it to `path`.
    pub fn build(&self, path: &Path) -> Result<PathBuf> {
        let mut parts = vec![
            ("[Content_Types].xml", CONTENT_TYPES_XLSX.to_string()),
            ("_rels/.rels", ROOT_RELS_XLSX.to_string()),
            ("xl/workbook.xml", WORKBOOK.to_string()),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
            ("xl/worksheets/sheet1.xml", self.sheet_xml()),
            ("xl/sharedStrings.xml", self.shared_strings_xml()),
            ("xl/styles.xml", STYLES.to_string()),
        ];
        if let Some(columns) = &self.table_columns {
            parts.push(("xl/worksheets/_rels/sheet1.xml.rels", SHEET_RELS.to_string()));
            parts.push(("xl/tables/table1.xml", self.table_xml(columns)));
        }
        write_zip(path, &parts)
    }
}

/// Spreadsheet column letters for a zero-based index.
pub fn column_name(index: usize) -> String {
    let mut name = String::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        name.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    name
}

/// Writes a text file and returns its path.
pub fn write_text(path: &Path, content: &str) -> Result<PathBuf> {
    fs::write(path, content)?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape(r#"a<b & "c""#), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn test_column_name() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
    }
}
