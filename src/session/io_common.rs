use snafu::OptionExt;

use crate::session::{MissingColumnSnafu, MissingValueSnafu, SessionResult};

/// A tabular file after provider-specific parsing: a trimmed header row
/// plus string-valued data rows. Typing the values is left to the
/// session layer.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedTable {
    pub path: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ParsedTable {
    /// The index of a column, matched exactly against the header row.
    pub fn column(&self, name: &str) -> SessionResult<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .context(MissingColumnSnafu {
                column: name,
                path: self.path.as_str(),
            })
    }

    /// The value of one cell. Rows are numbered from 2 in error
    /// messages, matching the line numbers of the source file.
    pub fn cell(&self, row: usize, col: usize, column: &str) -> SessionResult<&str> {
        self.rows[row]
            .get(col)
            .map(|s| s.as_str())
            .context(MissingValueSnafu {
                column,
                lineno: row + 2,
                path: self.path.as_str(),
            })
    }
}
