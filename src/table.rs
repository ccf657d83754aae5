//! Generic string table handed to the normalizer.
//!
//! Spreadsheet parsing proper belongs to the caller. This type is the
//! neutral hand-off: a header row plus data rows of raw cell text. A CSV
//! adapter is provided for the command-line front end.

use std::io::Read;
use std::path::Path;

use crate::error::Result;

/// Raw tabular input: headers plus rows of untyped cell text.
///
/// Rows may be ragged; a cell beyond the end of a row reads as empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Builds a table from anything string-like.
    ///
    /// # Examples
    ///
    /// ```
    /// use cpk_analytics::table::RawTable;
    ///
    /// let table = RawTable::new(["SN", "Value"], vec![vec!["A1", "10.0"]]);
    /// assert_eq!(table.len(), 1);
    /// assert_eq!(table.cell(0, 1), "10.0");
    /// ```
    pub fn new<H, R, C>(headers: H, rows: Vec<R>) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Reads a headed CSV stream. Every field is trimmed and rows may have
    /// differing lengths.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.iter().map(str::to_owned).collect();
        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_owned).collect());
        }
        Ok(Self { headers, rows })
    }

    /// Reads a headed CSV file from disk.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_csv_reader(file)
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell text at (`row`, `column`), or `""` when the row is short.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map_or("", String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn csv_reader_trims_fields() {
        let data = " Type , SN ,Value\n X , 1 , 10.5 \n";
        let table = RawTable::from_csv_reader(data.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["Type", "SN", "Value"]);
        assert_eq!(table.rows, vec![vec!["X", "1", "10.5"]]);
    }

    #[test]
    fn csv_reader_accepts_ragged_rows() {
        let data = "A,B,C\n1,2\n";
        let table = RawTable::from_csv_reader(data.as_bytes()).unwrap();
        assert_eq!(table.cell(0, 1), "2");
        assert_eq!(table.cell(0, 2), "");
        assert_eq!(table.cell(5, 0), "");
    }

    #[test]
    fn csv_path_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Type,SN").unwrap();
        writeln!(file, "X,1").unwrap();
        writeln!(file, "Y,2").unwrap();
        file.flush().unwrap();

        let table = RawTable::from_csv_path(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert!(!table.is_empty());
    }

    #[test]
    fn csv_path_missing_file_is_io_error() {
        let err = RawTable::from_csv_path("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, crate::error::CpkError::Io(_)));
    }
}
