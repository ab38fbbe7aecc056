use crate::error::LoadError;
use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

static EMPTY: Data = Data::Empty;

pub struct Workbook {
    path: PathBuf,
    sheets: Sheets<BufReader<File>>,
}

impl Workbook {
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let sheets = open_workbook_auto(path).map_err(|source| LoadError::Open {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self {
            path: path.to_owned(),
            sheets,
        })
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheets.sheet_names().iter().any(|sheet| sheet == name)
    }

    pub fn sheet(&mut self, name: &str) -> Result<Sheet, LoadError> {
        if !self.has_sheet(name) {
            return Err(LoadError::MissingSheet {
                path: self.path.clone(),
                sheet: name.to_owned(),
            });
        }
        let range = self
            .sheets
            .worksheet_range(name)
            .map_err(|source| LoadError::Read {
                sheet: name.to_owned(),
                source,
            })?;
        let sheet = Sheet::from_range(name, &range);
        debug!(sheet = name, records = sheet.records().len(), "Read sheet");
        Ok(sheet)
    }

    pub fn first_sheet(&mut self) -> Result<Sheet, LoadError> {
        let name = self
            .sheets
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| LoadError::NoSheets {
                path: self.path.clone(),
            })?;
        self.sheet(&name)
    }
}

/// A sheet read as a header row of trimmed column names followed by records.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    header: Vec<String>,
    records: Vec<Record>,
}

/// One non-empty row below the header.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 1-based row number as shown by spreadsheet programs
    pub line: usize,
    cells: Vec<Data>,
}

impl Record {
    pub fn get(&self, column: usize) -> &Data {
        self.cells.get(column).unwrap_or(&EMPTY)
    }
}

impl Sheet {
    fn from_range(name: &str, range: &Range<Data>) -> Self {
        let first_row = range.start().map_or(0, |(row, _)| row as usize);
        Self::from_rows(name, first_row, range.rows().map(<[Data]>::to_vec))
    }

    /// Builds a sheet from raw rows, the first being the header. `first_row` is the
    /// 0-based position of the header in the sheet.
    pub fn from_rows<I>(name: &str, first_row: usize, rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<Data>>,
    {
        let mut rows = rows.into_iter();
        let header = rows
            .next()
            .map(|cells| {
                cells
                    .iter()
                    .map(|cell| cell_text(cell).unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();
        let records = rows
            .enumerate()
            .filter(|(_, cells)| cells.iter().any(|cell| !cell_is_empty(cell)))
            .map(|(index, cells)| Record {
                line: first_row + index + 2,
                cells,
            })
            .collect();
        Self {
            name: name.to_owned(),
            header,
            records,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn column(&self, name: &str) -> Result<usize, LoadError> {
        self.header
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| LoadError::MissingColumn {
                sheet: self.name.clone(),
                column: name.to_owned(),
            })
    }

    /// First record whose `column` holds `value` (compared trimmed).
    pub fn find(&self, column: usize, value: &str) -> Option<&Record> {
        self.records
            .iter()
            .find(|record| cell_text(record.get(column)).as_deref() == Some(value))
    }
}

/// Trimmed text shown for a cell, `None` for empty cells.
///
/// Integral floats show without a fraction, so a year typed as `2025` stays `2025`.
pub fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.trim().to_owned(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_owned(),
    };
    if text.is_empty() { None } else { Some(text) }
}

pub fn cell_is_empty(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
pub(crate) fn text(s: &str) -> Data {
    Data::String(s.to_owned())
}

#[cfg(test)]
mod workbook_tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn header_is_trimmed_and_lines_are_spreadsheet_rows() -> Result<()> {
        let sheet = Sheet::from_rows(
            "Gebuehren",
            0,
            vec![
                vec![text(" Kind_Nr "), text("Betrag\t")],
                vec![Data::Float(1.0), Data::Float(100.0)],
                vec![Data::Empty, text("  ")],
                vec![Data::Int(2), Data::Float(80.0)],
            ],
        );
        assert_eq!(sheet.column("Kind_Nr")?, 0);
        assert_eq!(sheet.column("Betrag")?, 1);
        let lines: Vec<usize> = sheet.records().iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![2, 4]);
        assert_eq!(sheet.records()[1].get(7), &Data::Empty);
        Ok(())
    }

    #[test]
    fn missing_column() {
        let sheet = Sheet::from_rows("Beitraege", 0, vec![vec![text("Posten")]]);
        let err = sheet.column("Betrag").unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { ref column, .. } if column == "Betrag"));
        assert_eq!(
            err.to_string(),
            "Column 'Betrag' not found in sheet 'Beitraege'"
        );
    }

    #[test]
    fn find_compares_trimmed_text() -> Result<()> {
        let sheet = Sheet::from_rows(
            "Konfiguration",
            2,
            vec![
                vec![text("Eigenschaft"), text("Wert")],
                vec![text("Ort"), text("Berlin")],
                vec![text(" Schuljahr "), Data::Float(2025.0)],
            ],
        );
        let record = sheet.find(0, "Schuljahr").expect("row present");
        assert_eq!(record.line, 5);
        assert_eq!(cell_text(record.get(1)).as_deref(), Some("2025"));
        assert!(sheet.find(0, "Fehlt").is_none());
        Ok(())
    }

    #[test]
    fn cell_texts() {
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&text("   ")), None);
        assert_eq!(cell_text(&text(" Anna ")).as_deref(), Some("Anna"));
        assert_eq!(cell_text(&Data::Float(2.5)).as_deref(), Some("2.5"));
        assert_eq!(cell_text(&Data::Int(7)).as_deref(), Some("7"));
    }
}
