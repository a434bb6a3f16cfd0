//! CSV input reading.

use std::path::Path;

use worldsync_core::InputRow;

use crate::error::{CliError, CliResult};

/// UTF-8 BOM bytes.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

fn strip_utf8_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

/// Read every record of a CSV file.
///
/// No row is treated as a header here; header skipping is a per-category
/// setting applied by the import run. Rows may have differing lengths.
pub fn read_rows(path: &Path) -> CliResult<Vec<InputRow>> {
    let data = std::fs::read(path)
        .map_err(|e| CliError::Input(format!("cannot read {}: {e}", path.display())))?;
    parse_rows(&data)
}

pub fn parse_rows(data: &[u8]) -> CliResult<Vec<InputRow>> {
    let data = strip_utf8_bom(data);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map_or(index + 1, |position| position.line() as usize);
        rows.push(InputRow::new(line, record.iter()));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_rows_keeps_every_record() {
        let rows = parse_rows(b"user,world,role\nalice,phys-101,Student\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].field(0), Some("user"));
        assert_eq!(rows[1].field(2), Some("Student"));
        assert_eq!(rows[1].line, 2);
    }

    #[test]
    fn test_parse_rows_strips_bom() {
        let rows = parse_rows(b"\xEF\xBB\xBFalice,phys-101,Student\n").unwrap();
        assert_eq!(rows[0].field(0), Some("alice"));
    }

    #[test]
    fn test_parse_rows_allows_ragged_records() {
        let rows = parse_rows(b"a,b,c\nd,e\n\"f, g\",h,i,j\n").unwrap();
        let lengths: Vec<usize> = rows.iter().map(InputRow::len).collect();
        assert_eq!(lengths, vec![3, 2, 4]);
        assert_eq!(rows[2].field(0), Some("f, g"));
    }

    #[test]
    fn test_read_rows_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alice,phys-101,Student").unwrap();
        writeln!(file, "bob,phys-101,Instructor").unwrap();

        let rows = read_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].field(0), Some("bob"));
    }

    #[test]
    fn test_read_rows_missing_file() {
        let err = read_rows(Path::new("/nonexistent/members.csv")).unwrap_err();
        assert!(matches!(err, CliError::Input(_)));
    }
}
