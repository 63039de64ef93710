use std::borrow::Cow;
use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rust_xlsxwriter::{Format, FormatAlign, Workbook, XlsxError};
use serde::Serialize;
use zip::ZipArchive;

use crate::domain::{DisplayColumn, FormattedRow};
use crate::error::TrialsError;

/// Longest text a spreadsheet cell holds, in characters.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Column widths in display-column order.
const COLUMN_WIDTHS: [f64; 12] = [
    60.0, 12.0, 40.0, 16.0, 16.0, 16.0, 36.0, 30.0, 20.0, 14.0, 22.0, 18.0,
];

/// Rows destined for one worksheet.
#[derive(Debug, Clone)]
pub struct SheetRows {
    pub name: String,
    pub rows: Vec<FormattedRow>,
}

impl SheetRows {
    pub fn new(name: impl Into<String>, rows: Vec<FormattedRow>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkbookSummary {
    pub sheets: Vec<SheetSummary>,
}

impl WorkbookSummary {
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetSummary> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetSummary {
    pub name: String,
    pub header: Vec<String>,
    /// Rows below the header, blank cells as empty strings.
    pub rows: Vec<Vec<String>>,
}

impl SheetSummary {
    pub fn data_rows(&self) -> usize {
        self.rows.len()
    }

    /// Text of `column` in the data row at `index` (0 is the first row under
    /// the header).
    pub fn cell(&self, index: usize, column: DisplayColumn) -> Option<&str> {
        let row = self.rows.get(index)?;
        Some(row.get(column.index()).map(String::as_str).unwrap_or(""))
    }
}

/// Writes every sheet into one workbook and returns the finished document.
///
/// Each sheet starts with the bold header row followed by its rows in order.
/// An empty collection gives a header-only sheet. Text longer than a cell can
/// hold is cut at [`MAX_CELL_CHARS`].
pub fn export_workbook(sheets: &[SheetRows]) -> Result<Vec<u8>, TrialsError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let body_format = Format::new().set_align(FormatAlign::Top);

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name).map_err(export_error)?;

        for column in DisplayColumn::ALL {
            let col = column.index() as u16;
            worksheet
                .write_string_with_format(0, col, column.header(), &header_format)
                .map_err(export_error)?;
            worksheet
                .set_column_width(col, COLUMN_WIDTHS[column.index()])
                .map_err(export_error)?;
        }
        worksheet.set_freeze_panes(1, 0).map_err(export_error)?;

        for (index, row) in sheet.rows.iter().enumerate() {
            let row_num = u32::try_from(index + 1)
                .map_err(|_| TrialsError::Export(format!("too many rows for {}", sheet.name)))?;
            for column in DisplayColumn::ALL {
                let col = column.index() as u16;
                let text = row.get(column);
                // Blank cells keep the row in the sheet even when every field is empty.
                if text.is_empty() {
                    worksheet
                        .write_blank(row_num, col, &body_format)
                        .map_err(export_error)?;
                    continue;
                }
                let text = fit_cell(text);
                if let Cow::Owned(_) = text {
                    tracing::warn!(
                        sheet = %sheet.name,
                        row = row_num,
                        column = column.header(),
                        "cell text truncated to {MAX_CELL_CHARS} characters"
                    );
                }
                worksheet
                    .write_string_with_format(row_num, col, text.as_ref(), &body_format)
                    .map_err(export_error)?;
            }
        }
    }

    workbook.save_to_buffer().map_err(export_error)
}

fn fit_cell(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((cut, _)) => Cow::Owned(text[..cut].to_string()),
        None => Cow::Borrowed(text),
    }
}

/// Reads a workbook produced by [`export_workbook`] back: sheet names in
/// workbook order, then the header row and the cell text of every other row.
pub fn inspect_workbook(bytes: &[u8]) -> Result<WorkbookSummary, TrialsError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| TrialsError::Export(format!("not a workbook: {err}")))?;

    let workbook_xml = read_entry(&mut archive, "xl/workbook.xml")?
        .ok_or_else(|| TrialsError::Export("workbook.xml missing".to_string()))?;
    let shared_strings = match read_entry(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let mut sheets = Vec::new();
    for (index, name) in parse_sheet_names(&workbook_xml)?.into_iter().enumerate() {
        let entry = format!("xl/worksheets/sheet{}.xml", index + 1);
        let sheet_xml = read_entry(&mut archive, &entry)?
            .ok_or_else(|| TrialsError::Export(format!("{entry} missing")))?;

        let mut rows = parse_sheet_rows(&sheet_xml, &shared_strings)?.into_iter();
        let header = rows.next().unwrap_or_default();
        sheets.push(SheetSummary {
            name,
            header,
            rows: rows.collect(),
        });
    }

    Ok(WorkbookSummary { sheets })
}

fn read_entry(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<String>, TrialsError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(TrialsError::Export(err.to_string())),
    };
    let mut text = String::new();
    entry
        .read_to_string(&mut text)
        .map_err(|err| TrialsError::Export(format!("read {name}: {err}")))?;
    Ok(Some(text))
}

fn parse_sheet_names(xml: &str) -> Result<Vec<String>, TrialsError> {
    let mut reader = Reader::from_str(xml);
    let mut names = Vec::new();
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attribute(&e, "name")?
                    .ok_or_else(|| TrialsError::Export("sheet without a name".to_string()))?;
                names.push(name);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(names)
}

/// Shared-string table in index order. Phonetic runs are not part of the
/// cell text.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>, TrialsError> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut in_phonetic = false;
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"rPh" => in_phonetic = true,
                b"t" => in_text = !in_phonetic,
                _ => {}
            },
            Event::Text(e) if in_text => current.push_str(&e.unescape().map_err(xml_error)?),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

/// The cell currently being read from a worksheet.
struct OpenCell {
    row: usize,
    col: usize,
    shared: bool,
    text: String,
}

/// Every row of a worksheet, top to bottom, indexed by the `r` references so
/// missing rows and cells come back empty.
fn parse_sheet_rows(xml: &str, shared: &[String]) -> Result<Vec<Vec<String>>, TrialsError> {
    let mut reader = Reader::from_str(xml);
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row = 0usize;
    let mut next_col = 0usize;
    let mut cell: Option<OpenCell> = None;
    let mut in_value = false;

    loop {
        let event = reader.read_event().map_err(xml_error)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"row" => {
                row = match attribute(e, "r")? {
                    Some(r) => r
                        .parse::<usize>()
                        .ok()
                        .filter(|r| *r > 0)
                        .map(|r| r - 1)
                        .ok_or_else(|| TrialsError::Export(format!("bad row number {r}")))?,
                    None => rows.len(),
                };
                next_col = 0;
                if rows.len() <= row {
                    rows.resize(row + 1, Vec::new());
                }
            }
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"c" => {
                let (cell_row, col) = match attribute(e, "r")? {
                    Some(reference) => cell_position(&reference)?,
                    None => (row, next_col),
                };
                next_col = col + 1;
                place(&mut rows, cell_row, col, String::new());
                if matches!(event, Event::Start(_)) {
                    cell = Some(OpenCell {
                        row: cell_row,
                        col,
                        shared: attribute(e, "t")?.as_deref() == Some("s"),
                        text: String::new(),
                    });
                }
            }
            Event::Start(ref e) if matches!(e.local_name().as_ref(), b"v" | b"t") => {
                in_value = cell.is_some();
            }
            Event::Text(ref e) if in_value => {
                if let Some(open) = cell.as_mut() {
                    open.text.push_str(&e.unescape().map_err(xml_error)?);
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(open) = cell.take() {
                        let text = if open.shared {
                            open.text
                                .trim()
                                .parse::<usize>()
                                .ok()
                                .and_then(|idx| shared.get(idx).cloned())
                                .ok_or_else(|| {
                                    TrialsError::Export(format!(
                                        "bad shared string index {}",
                                        open.text
                                    ))
                                })?
                        } else {
                            open.text
                        };
                        place(&mut rows, open.row, open.col, text);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rows)
}

fn place(rows: &mut Vec<Vec<String>>, row: usize, col: usize, text: String) {
    if rows.len() <= row {
        rows.resize(row + 1, Vec::new());
    }
    let cells = &mut rows[row];
    if cells.len() <= col {
        cells.resize(col + 1, String::new());
    }
    cells[col] = text;
}

/// `"L2"` to zero-based `(row, column)`, here `(1, 11)`.
fn cell_position(reference: &str) -> Result<(usize, usize), TrialsError> {
    let bad = || TrialsError::Export(format!("bad cell reference {reference}"));
    let split = reference
        .find(|c: char| c.is_ascii_digit())
        .filter(|split| *split > 0)
        .ok_or_else(bad)?;
    let (letters, digits) = reference.split_at(split);

    let mut col = 0usize;
    for letter in letters.bytes() {
        if !letter.is_ascii_uppercase() {
            return Err(bad());
        }
        col = col * 26 + usize::from(letter - b'A' + 1);
    }
    let row = digits
        .parse::<usize>()
        .ok()
        .filter(|row| *row > 0)
        .ok_or_else(bad)?;
    Ok((row - 1, col - 1))
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, TrialsError> {
    element
        .try_get_attribute(name)
        .map_err(xml_error)?
        .map(|attr| {
            attr.unescape_value()
                .map(Cow::into_owned)
                .map_err(xml_error)
        })
        .transpose()
}

fn xml_error<E: std::fmt::Display>(err: E) -> TrialsError {
    TrialsError::Export(format!("unreadable workbook xml: {err}"))
}

fn export_error(err: XlsxError) -> TrialsError {
    TrialsError::Export(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_strings_decode_entities_and_skip_phonetics() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
<si><t>ATL1 &amp; REEP1 &lt;study&gt;</t></si>
<si><r><t xml:space="preserve">Parkinson&#39;s </t></r><r><t>&#x41;LS2</t></r></si>
<si><t>SPAST</t><rPh sb="0" eb="1"><t>ignored</t></rPh></si>
</sst>"#;
        assert_eq!(
            parse_shared_strings(xml).unwrap(),
            ["ATL1 & REEP1 <study>", "Parkinson's ALS2", "SPAST"]
        );
    }

    #[test]
    fn rows_follow_references_whatever_the_attribute_order() {
        let xml = r#"<worksheet><sheetData>
<row spans="1:3" r="1"><c t="s" r="A1"><v>0</v></c><c r="C1" t="s"><v>1</v></c></row>
<row r="3"><c r="B3"><v>24</v></c><c r="C3" s="1"/></row>
</sheetData></worksheet>"#;
        let shared = vec!["Trial Name".to_string(), "Drug".to_string()];
        let rows = parse_sheet_rows(xml, &shared).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], ["Trial Name", "", "Drug"]);
        assert!(rows[1].is_empty());
        assert_eq!(rows[2], ["", "24", ""]);
    }

    #[test]
    fn cell_references_map_to_positions() {
        assert_eq!(cell_position("A1").unwrap(), (0, 0));
        assert_eq!(cell_position("L2").unwrap(), (1, 11));
        assert_eq!(cell_position("AA10").unwrap(), (9, 26));
        assert!(cell_position("12").is_err());
        assert!(cell_position("B").is_err());
    }

    #[test]
    fn long_text_is_cut_at_cell_limit() {
        let long = "é".repeat(MAX_CELL_CHARS + 5);
        let fitted = fit_cell(&long);
        assert_eq!(fitted.chars().count(), MAX_CELL_CHARS);
        assert!(matches!(fit_cell("short"), Cow::Borrowed("short")));
    }
}
