//! Zip bundle for multi-file uploads.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

/// Download name of a multi-file conversion.
pub const ARCHIVE_NAME: &str = "comprobantes_arreglados.zip";

/// Entry listing the uploads that could not be converted.
pub const ERRORS_ENTRY: &str = "errores.txt";

/// Pack converted files, plus an error listing when `errors` is not empty.
///
/// Repeated names get a ` (2)`, ` (3)`... suffix before the extension.
pub fn bundle(files: &[(String, Vec<u8>)], errors: &[String]) -> zip::result::ZipResult<Vec<u8>> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let mut taken = HashSet::new();

    for (name, bytes) in files {
        zip.start_file(unique_name(name, &mut taken), entry_options())?;
        zip.write_all(bytes)?;
    }

    if !errors.is_empty() {
        zip.start_file(unique_name(ERRORS_ENTRY, &mut taken), entry_options())?;
        for line in errors {
            zip.write_all(line.as_bytes())?;
            zip.write_all(b"\r\n")?;
        }
    }

    Ok(zip.finish()?.into_inner())
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn unique_name(name: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{ext}")),
        None => (name, String::new()),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{stem} ({n}){ext}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn read_entry(archive: &mut zip::ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
        let mut content = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_bundle_dedupes_names_and_lists_errors() {
        let files = vec![
            ("a_arreglado.csv".to_string(), b"x;y\r\n".to_vec()),
            ("a_arreglado.csv".to_string(), b"z\r\n".to_vec()),
        ];
        let errors = vec!["b.csv: CSV file is empty".to_string()];

        let bytes = bundle(&files, &errors).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();

        assert_eq!(archive.len(), 3);
        assert_eq!(read_entry(&mut archive, "a_arreglado.csv"), "x;y\r\n");
        assert_eq!(read_entry(&mut archive, "a_arreglado (2).csv"), "z\r\n");
        assert_eq!(read_entry(&mut archive, ERRORS_ENTRY), "b.csv: CSV file is empty\r\n");
    }

    #[test]
    fn test_bundle_without_errors_has_no_listing() {
        let files = vec![("a_arreglado.csv".to_string(), b"x\r\n".to_vec())];
        let bytes = bundle(&files, &[]).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);
    }
}
