//! CSV output for annotated tables

use crate::error::{Error, Result};
use crate::table::Table;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Write `table` to `path` as UTF-8 CSV
///
/// The first column is an unnamed 0-based row index, followed by every
/// table column in order.
pub fn write_csv<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    write_csv_to(table, file).map_err(|e| match e {
        Error::Io(source) => Error::FileWrite {
            path: path.to_path_buf(),
            source,
        },
        Error::Csv { source, .. } => Error::Csv {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

/// Write `table` as CSV to any writer
pub fn write_csv_to<W: Write>(table: &Table, writer: W) -> Result<()> {
    let csv_err = |e: csv::Error| Error::Csv {
        path: table.source_path.clone(),
        source: e,
    };
    let mut csv_writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);

    let header = std::iter::once("").chain(table.columns.iter().map(|c| c.name.as_str()));
    csv_writer.write_record(header).map_err(csv_err)?;

    for (index, row) in table.rows.iter().enumerate() {
        let record = std::iter::once(index.to_string())
            .chain(row.cells.iter().map(|c| c.to_string_value()));
        csv_writer.write_record(record).map_err(csv_err)?;
    }

    csv_writer.flush()?;
    Ok(())
}
