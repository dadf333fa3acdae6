//! Table loading from CSV files and spreadsheets

use crate::error::{Error, Result};
use crate::table::{CellValue, Column, Row, Table};
use calamine::{open_workbook_auto, Data, Reader};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Load the input table, picking the reader from the file name
///
/// Any path containing `.csv` is read as CSV; everything else goes through
/// the spreadsheet reader and only its first sheet is used.
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    if path.to_string_lossy().contains(".csv") {
        debug!("reading {} as CSV", path.display());
        parse_csv(path)
    } else {
        debug!("reading {} as spreadsheet", path.display());
        parse_spreadsheet(path)
    }
}

/// Parse a CSV file into a Table
pub fn parse_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    read_csv(BufReader::new(file), path.to_path_buf())
}

/// Parse CSV from a string (useful for testing)
pub fn parse_csv_str(content: &str, source_name: &str) -> Result<Table> {
    read_csv(content.as_bytes(), PathBuf::from(source_name))
}

fn read_csv<R: Read>(reader: R, path: PathBuf) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // Allow varying number of fields
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(|e| Error::Csv {
        path: path.clone(),
        source: e,
    })?;

    let columns: Vec<Column> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| Column::new(name.to_string(), i))
        .collect();

    if columns.is_empty() {
        return Err(Error::CsvParse {
            path,
            message: "no columns found in CSV".to_string(),
        });
    }

    let mut rows = Vec::new();
    for (row_idx, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| Error::Csv {
            path: path.clone(),
            source: e,
        })?;

        let cells: Vec<CellValue> = record.iter().map(CellValue::parse).collect();
        rows.push(fit_row(cells, columns.len(), row_idx, &path));
    }

    Ok(Table {
        columns,
        rows,
        source_path: path,
    })
}

/// Parse the first sheet of a spreadsheet (xlsx, xls, xlsb, ods) into a Table
pub fn parse_spreadsheet<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let spreadsheet_err = |e: calamine::Error| Error::Spreadsheet {
        path: path.to_path_buf(),
        source: e,
    };

    let mut workbook = open_workbook_auto(path).map_err(spreadsheet_err)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::EmptySheet {
            path: path.to_path_buf(),
        })?
        .map_err(spreadsheet_err)?;

    let mut sheet_rows = range.rows();
    let header = sheet_rows.next().ok_or_else(|| Error::EmptySheet {
        path: path.to_path_buf(),
    })?;

    let columns: Vec<Column> = header
        .iter()
        .enumerate()
        .map(|(i, data)| Column::new(data.to_string().trim().to_string(), i))
        .collect();

    let rows = sheet_rows
        .enumerate()
        .map(|(row_idx, data)| {
            let cells = data.iter().map(cell_from_data).collect();
            fit_row(cells, columns.len(), row_idx, path)
        })
        .collect();

    Ok(Table {
        columns,
        rows,
        source_path: path.to_path_buf(),
    })
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(i) => CellValue::Integer(*i),
        // Spreadsheets store every number as a float
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            CellValue::Integer(*f as i64)
        }
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                CellValue::Empty
            } else {
                CellValue::String(trimmed.to_string())
            }
        }
        other => CellValue::parse(&other.to_string()),
    }
}

/// Pad a short row with empty cells, truncate a long one to the header width
fn fit_row(mut cells: Vec<CellValue>, width: usize, row_idx: usize, path: &Path) -> Row {
    if cells.len() < width {
        cells.resize(width, CellValue::Empty);
    }

    if cells.len() > width {
        warn!(
            "row {} in {} has more cells than columns, truncating",
            row_idx + 1,
            path.display()
        );
        cells.truncate(width);
    }

    Row::new(cells)
}

/// Indices of the columns every input table must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressColumns {
    pub street: usize,
    pub city: usize,
    pub state: usize,
    /// Required by the schema, passed through untouched
    pub zip: usize,
}

impl AddressColumns {
    pub const STREET: &'static str = "Street";
    pub const CITY: &'static str = "City";
    pub const STATE: &'static str = "State";
    pub const ZIP: &'static str = "Zip";

    /// Look up the required columns, failing on the first one that is missing
    pub fn resolve(table: &Table) -> Result<Self> {
        let find = |name: &str| {
            table
                .find_column(name)
                .map(|c| c.index)
                .ok_or_else(|| Error::MissingColumn {
                    column: name.to_string(),
                    path: table.source_path.clone(),
                })
        };

        Ok(Self {
            street: find(Self::STREET)?,
            city: find(Self::CITY)?,
            state: find(Self::STATE)?,
            zip: find(Self::ZIP)?,
        })
    }
}
