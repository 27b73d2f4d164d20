// Primitives for reading CSV files.

use log::debug;
use snafu::prelude::*;

use crate::session::{io_common::ParsedTable, CsvLineParseSnafu, CsvOpenSnafu, SessionResult};

pub fn read_csv_table(path: String) -> SessionResult<ParsedTable> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(&path)
        .context(CsvOpenSnafu { path: path.clone() })?;
    let mut records = rdr.into_records();

    let headers: Vec<String> = match records.next() {
        Some(line_r) => line_r
            .context(CsvLineParseSnafu { path: path.clone() })?
            .iter()
            .map(|s| s.trim().to_string())
            .collect(),
        None => whatever!("CSV file {:?} is empty", path),
    };

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let lineno = idx + 2;
        debug!("read_csv_table: {:?} {:?}", lineno, line_r);
        let line = line_r.context(CsvLineParseSnafu { path: path.clone() })?;
        rows.push(line.iter().map(|s| s.trim().to_string()).collect());
    }
    Ok(ParsedTable {
        path,
        headers,
        rows,
    })
}
