//! Spreadsheet export of the report table.
//!
//! Produces a minimal XLSX workbook (a zip of SpreadsheetML parts) with one
//! worksheet. Priority rows get a solid yellow fill.

use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::report::{FunnelStage, VacancyFunnelRow};
use crate::{Error, Result};

pub const SHEET_NAME: &str = "Candidate funnel";
pub const DOWNLOAD_FILE_NAME: &str = "hiring_funnel_report.xlsx";
pub const CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const VACANCY_HEADER: &str = "vacancy name";
const COMMENT_HEADER: &str = "comment";
const PRIORITY_FILL: &str = "FFFF99";

// Style indexes into `cellXfs` of styles.xml.
const STYLE_HEADER: u32 = 1;
const STYLE_PRIORITY: u32 = 2;

/// Header row: vacancy name, every stage in funnel order, comment.
pub fn header_row() -> Vec<String> {
    std::iter::once(VACANCY_HEADER.to_string())
        .chain(FunnelStage::ALL.iter().map(|s| s.column_name().to_string()))
        .chain(std::iter::once(COMMENT_HEADER.to_string()))
        .collect()
}

/// Cell values of one data row; stage cells read `"{total} ({current})"`.
pub fn row_cells(row: &VacancyFunnelRow) -> Vec<String> {
    std::iter::once(row.vacancy_name.clone())
        .chain(row.stage_counts.iter().map(|(_, count)| count.to_string()))
        .chain(std::iter::once(row.comment.clone()))
        .collect()
}

/// Build the workbook, or `None` when there is nothing to export.
pub fn build_workbook(rows: &[VacancyFunnelRow]) -> Result<Option<Vec<u8>>> {
    if rows.is_empty() {
        return Ok(None);
    }

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("xl/workbook.xml", workbook_xml()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/styles.xml", styles_xml()),
        ("xl/worksheets/sheet1.xml", sheet_xml(rows)),
    ];

    let mut cursor = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut cursor);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, body) in parts {
        zip.start_file(name, options)
            .map_err(|e| Error::Export(format!("Failed to add {name}: {e}")))?;
        zip.write_all(body.as_bytes())
            .map_err(|e| Error::Export(format!("Failed to write {name}: {e}")))?;
    }

    zip.finish()
        .map_err(|e| Error::Export(format!("Failed to finish workbook: {e}")))?;

    Ok(Some(cursor.into_inner()))
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

fn workbook_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        escape_xml(SHEET_NAME)
    )
}

fn styles_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="3"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill><fill><patternFill patternType="solid"><fgColor rgb="FF{PRIORITY_FILL}"/><bgColor indexed="64"/></patternFill></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/><xf numFmtId="0" fontId="0" fillId="2" borderId="0" xfId="0" applyFill="1"/></cellXfs></styleSheet>"#
    )
}

fn sheet_xml(rows: &[VacancyFunnelRow]) -> String {
    let mut data = String::new();
    push_row(&mut data, 1, &header_row(), Some(STYLE_HEADER));
    for (i, row) in rows.iter().enumerate() {
        let style = row.is_priority.then_some(STYLE_PRIORITY);
        push_row(&mut data, i as u32 + 2, &row_cells(row), style);
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{data}</sheetData></worksheet>"#
    )
}

fn push_row(out: &mut String, number: u32, cells: &[String], style: Option<u32>) {
    out.push_str(&format!(r#"<row r="{number}">"#));
    for (col, value) in cells.iter().enumerate() {
        let reference = format!("{}{number}", column_letter(col));
        let style_attr = style.map(|s| format!(r#" s="{s}""#)).unwrap_or_default();
        out.push_str(&format!(
            r#"<c r="{reference}" t="inlineStr"{style_attr}><is><t xml:space="preserve">{}</t></is></c>"#,
            escape_xml(value)
        ));
    }
    out.push_str("</row>");
}

/// Zero-based column index to spreadsheet letters (0 -> A, 26 -> AA).
fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().map(|b| *b as char).collect()
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            // Illegal in XML 1.0.
            '\u{0}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}
