// Primitives for reading Excel workbooks.

use calamine::{open_workbook, Reader, Xlsx};
use log::debug;
use snafu::prelude::*;

use crate::session::{io_common::ParsedTable, EmptyExcelSnafu, OpeningExcelSnafu, SessionResult};

pub fn read_excel_table(path: String, worksheet_name: &Option<String>) -> SessionResult<ParsedTable> {
    let mut workbook: Xlsx<_> =
        open_workbook(path.clone()).context(OpeningExcelSnafu { path: path.clone() })?;
    let wrange = match worksheet_name {
        Some(name) => workbook
            .worksheet_range(name.as_str())
            .context(EmptyExcelSnafu { path: path.clone() })?
            .context(OpeningExcelSnafu { path: path.clone() })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path: path.clone() })?
            .context(OpeningExcelSnafu { path: path.clone() })?,
    };

    let mut iter = wrange.rows();
    let header = iter.next().context(EmptyExcelSnafu { path: path.clone() })?;
    debug!("read_excel_table: header: {:?}", header);
    let headers: Vec<String> = header
        .iter()
        .map(read_cell_calamine)
        .collect::<SessionResult<_>>()?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for row in iter {
        debug!("read_excel_table: row: {:?}", row);
        let values: Vec<String> = row
            .iter()
            .map(read_cell_calamine)
            .collect::<SessionResult<_>>()?;
        rows.push(values);
    }
    Ok(ParsedTable {
        path,
        headers,
        rows,
    })
}

fn read_cell_calamine(cell: &calamine::DataType) -> SessionResult<String> {
    match cell {
        calamine::DataType::String(s) => Ok(s.trim().to_string()),
        calamine::DataType::Empty => Ok("".to_string()),
        calamine::DataType::Float(f) => Ok(f.to_string()),
        calamine::DataType::Int(i) => Ok(i.to_string()),
        calamine::DataType::Bool(b) => Ok(if *b { "Yes" } else { "No" }.to_string()),
        _ => whatever!("read_cell_calamine: could not understand cell {:?}", cell),
    }
}
