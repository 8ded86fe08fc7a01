//! CSV writer for converted tables.
//!
//! Semicolon separated, double quotes only where a cell needs them, header
//! row first, UTF-8 without BOM.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::models::InvoiceTable;
use crate::parser::{DELIMITER, QUOTE};

/// Suffix appended to the input stem.
pub const OUTPUT_SUFFIX: &str = "_arreglado";

/// Record terminator of the output file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTerminator {
    #[default]
    Crlf,
    Lf,
}

impl LineTerminator {
    fn as_csv(&self) -> csv::Terminator {
        match self {
            LineTerminator::Crlf => csv::Terminator::CRLF,
            LineTerminator::Lf => csv::Terminator::Any(b'\n'),
        }
    }
}

/// Serialize `table` into any writer.
pub fn write_table<W: Write>(table: &InvoiceTable, out: W, terminator: LineTerminator) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .quote(QUOTE)
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(terminator.as_csv())
        .from_writer(out);

    writer.write_record(table.headers())?;
    for row in table.rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Serialize `table` into a byte buffer.
pub fn table_to_bytes(table: &InvoiceTable, terminator: LineTerminator) -> Result<Vec<u8>, csv::Error> {
    let mut buf = Vec::new();
    write_table(table, &mut buf, terminator)?;
    Ok(buf)
}

/// `<output_dir>/<stem>_arreglado.csv` for an input path.
pub fn output_path_for(input: &Path, output_dir: &Path) -> PipelineResult<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PipelineError::InvalidInputPath(input.to_path_buf()))?;
    Ok(output_dir.join(format!("{stem}{OUTPUT_SUFFIX}.csv")))
}

/// Write `table` to `path`, replacing any existing file.
///
/// Every I/O failure, including a failed final flush, names `path`.
pub fn write_file(table: &InvoiceTable, path: &Path, terminator: LineTerminator) -> PipelineResult<()> {
    let write_error = |source: io::Error| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(write_error)?;
    let mut out = BufWriter::new(file);
    write_table(table, &mut out, terminator).map_err(|e| write_error(csv_io_error(e)))?;
    out.flush().map_err(write_error)?;
    Ok(())
}

fn csv_io_error(err: csv::Error) -> io::Error {
    match err.into_kind() {
        csv::ErrorKind::Io(e) => e,
        other => io::Error::new(io::ErrorKind::Other, format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> InvoiceTable {
        InvoiceTable::new(
            vec!["Fecha de emision".into(), "denominacion emisor".into(), "IVA".into()],
            vec![
                vec!["2024-01-10".into(), "ACME; SA".into(), "210,00".into()],
                vec!["2024-01-11".into(), "Dice \"hola\"".into(), "0".into()],
            ],
        )
    }

    #[test]
    fn test_crlf_and_minimal_quoting() {
        let bytes = table_to_bytes(&table(), LineTerminator::Crlf).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "Fecha de emision;denominacion emisor;IVA\r\n\
             2024-01-10;\"ACME; SA\";210,00\r\n\
             2024-01-11;\"Dice \"\"hola\"\"\";0\r\n"
        );
    }

    #[test]
    fn test_lf_terminator() {
        let bytes = table_to_bytes(&table(), LineTerminator::Lf).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("Fecha de emision;denominacion emisor;IVA\n2024-01-10"));
        assert!(!text.contains('\r'));
    }

    #[test]
    fn test_output_path_uses_stem() {
        let dir = Path::new("/tmp/out");
        let path = output_path_for(Path::new("/data/comprobantes_202510 (pesos).csv"), dir).unwrap();
        assert_eq!(path, dir.join("comprobantes_202510 (pesos)_arreglado.csv"));

        let bare = output_path_for(Path::new("compras"), dir).unwrap();
        assert_eq!(bare, dir.join("compras_arreglado.csv"));

        assert!(output_path_for(Path::new("/"), dir).is_err());
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x_arreglado.csv");
        write_file(&table(), &path, LineTerminator::Crlf).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Fecha de emision;"));
    }

    #[test]
    fn test_failed_flush_names_output_path() {
        let path = Path::new("/dev/full");
        if !path.exists() {
            return;
        }
        let err = write_file(&table(), path, LineTerminator::Crlf).unwrap_err();
        assert!(matches!(err, PipelineError::Write { .. }));
        assert!(err.to_string().contains("/dev/full"));
    }

    #[test]
    fn test_write_file_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("x.csv");
        let err = write_file(&table(), &path, LineTerminator::Crlf).unwrap_err();
        assert!(matches!(err, PipelineError::Write { .. }));
    }
}
