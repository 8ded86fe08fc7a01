//! Column catalog: the static data that drives the conversion.
//!
//! A catalog says which columns to drop, which to derive, how to rename the
//! survivors, the exact output order and the value fixups applied at the end.
//! The built-in [`ColumnCatalog::afip`] covers the Comprobantes export; other
//! layouts can be loaded from JSON without touching the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use super::operations::Operation;
use crate::error::{PipelineError, PipelineResult, TransformError, TransformResult};
use crate::parser::Encoding;

/// Everything the pipeline needs to know about a source layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnCatalog {
    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Encodings to try, in order
    #[serde(default = "default_encodings")]
    pub candidate_encodings: Vec<Encoding>,

    /// Columns removed when present (normalized names)
    #[serde(default)]
    pub drop_columns: Vec<String>,

    /// Columns added before renaming
    #[serde(default)]
    pub derived_columns: Vec<DerivedColumn>,

    /// Source name → target name, applied in order
    #[serde(default)]
    pub renames: Vec<Rename>,

    /// Exact output layout
    pub output_columns: Vec<String>,

    /// Value operations applied after projection
    #[serde(default)]
    pub fixups: Vec<ColumnFixup>,
}

fn default_encodings() -> Vec<Encoding> {
    Encoding::DEFAULT_CANDIDATES.to_vec()
}

/// A column added to the table: a copy of another column or a constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedColumn {
    pub name: String,

    /// Column to copy (mutually exclusive with `constant`)
    #[serde(default)]
    pub source: Option<String>,

    /// Value for every row (mutually exclusive with `source`)
    #[serde(default)]
    pub constant: Option<String>,
}

impl DerivedColumn {
    pub fn copy_of(name: &str, source: &str) -> Self {
        Self {
            name: name.to_string(),
            source: Some(source.to_string()),
            constant: None,
        }
    }

    pub fn constant(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            source: None,
            constant: Some(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

/// Operations for one output column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFixup {
    pub column: String,
    pub operations: Vec<Operation>,
}

impl ColumnCatalog {
    /// Catalog for AFIP "Mis Comprobantes" exports.
    pub fn afip() -> Self {
        let drop_columns = [
            "Credito Fiscal Computable",
            "Importe de Per. o Pagos a Cta. de Otros Imp. Nac.",
            "Importe de Percepciones de Ingresos Brutos",
            "Importe de Impuestos Municipales",
            "Importe de Percepciones o Pagos a Cuenta de IVA",
            "Importe de Impuestos Internos",
            "Neto Gravado IVA 0%",
            "Neto Gravado IVA 2,5%",
            "Importe IVA 2,5%",
            "Neto Gravado IVA 5%",
            "Importe IVA 5%",
            "Neto Gravado IVA 10,5%",
            "Importe IVA 10,5%",
            "Neto Gravado IVA 21%",
            "Importe IVA 21%",
            "Neto Gravado IVA 27%",
            "Importe IVA 27%",
        ];

        let renames = [
            ("Fecha de Emision", "Fecha de emision"),
            ("Punto de Venta", "punto de venta"),
            ("Tipo Doc. Vendedor", "tipo doc. emisor"),
            ("Nro. Doc. Vendedor", "nro. doc. emisor"),
            ("Denominacion Vendedor", "denominacion emisor"),
            ("Importe Total", "Imp. Total"),
            ("Importe No Gravado", "imp neto no gravado"),
            ("Importe Exento", "importe OpExcento"),
            ("Importe Otros Tributos", "otros tributos"),
            ("Moneda Original", "Moneda"),
            ("Total IVA", "IVA"),
            ("Numero de Comprobante", "numero desde"),
        ];

        let output_columns = [
            "Fecha de emision",
            "Tipo de Comprobante",
            "punto de venta",
            "numero desde",
            "numero hasta",
            "Cod Autorizacion",
            "tipo doc. emisor",
            "nro. doc. emisor",
            "denominacion emisor",
            "Tipo de Cambio",
            "Moneda",
            "Total Neto Gravado",
            "imp neto no gravado",
            "importe OpExcento",
            "otros tributos",
            "IVA",
            "Imp. Total",
        ];

        let strip_sign = |column: &str| ColumnFixup {
            column: column.to_string(),
            operations: vec![Operation::StripChar { char: '-' }],
        };

        Self {
            description: "AFIP Mis Comprobantes export".to_string(),
            candidate_encodings: default_encodings(),
            drop_columns: drop_columns.iter().map(|s| s.to_string()).collect(),
            derived_columns: vec![
                DerivedColumn::copy_of("numero hasta", "Numero de Comprobante"),
                DerivedColumn::constant("Cod Autorizacion", "0"),
            ],
            renames: renames
                .iter()
                .map(|(from, to)| Rename {
                    from: from.to_string(),
                    to: to.to_string(),
                })
                .collect(),
            output_columns: output_columns.iter().map(|s| s.to_string()).collect(),
            fixups: vec![
                strip_sign("Imp. Total"),
                strip_sign("Total Neto Gravado"),
                strip_sign("IVA"),
                ColumnFixup {
                    column: "Tipo de Comprobante".to_string(),
                    operations: vec![Operation::MapValue {
                        from: "81".to_string(),
                        to: "83".to_string(),
                    }],
                },
            ],
        }
    }

    /// Parse a catalog from JSON and check it.
    pub fn from_json(json: &str) -> TransformResult<Self> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load a catalog file.
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::CatalogRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| PipelineError::Catalog {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject catalogs the pipeline could never satisfy.
    pub fn validate(&self) -> TransformResult<()> {
        if self.output_columns.is_empty() {
            return Err(TransformError::InvalidCatalog(
                "output_columns is empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.output_columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(TransformError::InvalidCatalog(format!(
                "duplicate output column '{dup}'"
            )));
        }

        for derived in &self.derived_columns {
            if derived.source.is_some() == derived.constant.is_some() {
                return Err(TransformError::InvalidCatalog(format!(
                    "derived column '{}' needs exactly one of source or constant",
                    derived.name
                )));
            }
        }

        if self.candidate_encodings.is_empty() {
            return Err(TransformError::InvalidCatalog(
                "candidate_encodings is empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Source-side names the input must carry to fill every output column.
    ///
    /// Output columns are mapped back through the renames; derived columns
    /// contribute their source instead of themselves. The reader uses this
    /// list to tell a correct decode from mojibake.
    pub fn expected_source_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        };

        for output in &self.output_columns {
            if let Some(derived) = self.derived_columns.iter().find(|d| &d.name == output) {
                if let Some(ref source) = derived.source {
                    push(source);
                }
                continue;
            }
            match self.renames.iter().find(|r| &r.to == output) {
                Some(rename) => push(&rename.from),
                None => push(output),
            }
        }

        columns
    }

    /// Output columns that no input column, rename or derivation provides.
    pub fn missing_output_columns(&self, headers: &[String]) -> Vec<String> {
        self.expected_source_columns()
            .into_iter()
            .filter(|c| !headers.iter().any(|h| h == c))
            .collect()
    }
}

impl Default for ColumnCatalog {
    fn default() -> Self {
        Self::afip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_afip_catalog_shape() {
        let catalog = ColumnCatalog::afip();
        assert_eq!(catalog.drop_columns.len(), 17);
        assert_eq!(catalog.renames.len(), 12);
        assert_eq!(catalog.output_columns.len(), 17);
        assert_eq!(catalog.output_columns[0], "Fecha de emision");
        assert_eq!(catalog.output_columns[16], "Imp. Total");
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn test_expected_source_columns() {
        let expected = ColumnCatalog::afip().expected_source_columns();
        assert_eq!(expected.len(), 15);
        assert_eq!(expected[0], "Fecha de Emision");
        assert!(expected.contains(&"Numero de Comprobante".to_string()));
        assert!(expected.contains(&"Tipo de Cambio".to_string()));
        assert!(!expected.contains(&"Cod Autorizacion".to_string()));
        assert!(!expected.contains(&"numero hasta".to_string()));
    }

    #[test]
    fn test_catalog_json_round_trip() {
        let catalog = ColumnCatalog::afip();
        let json = catalog.to_json().unwrap();
        assert!(json.contains("\"latin-1\""));
        assert!(json.contains("strip_char"));
        let parsed = ColumnCatalog::from_json(&json).unwrap();
        assert_eq!(parsed, catalog);
    }

    #[test]
    fn test_minimal_catalog_uses_defaults() {
        let parsed = ColumnCatalog::from_json(r#"{"output_columns": ["a", "b"]}"#).unwrap();
        assert_eq!(parsed.candidate_encodings, Encoding::DEFAULT_CANDIDATES.to_vec());
        assert!(parsed.drop_columns.is_empty());
        assert_eq!(parsed.expected_source_columns(), vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_catalogs_are_rejected() {
        assert!(matches!(
            ColumnCatalog::from_json(r#"{"output_columns": []}"#),
            Err(TransformError::InvalidCatalog(_))
        ));
        assert!(matches!(
            ColumnCatalog::from_json(r#"{"output_columns": ["a", "a"]}"#),
            Err(TransformError::InvalidCatalog(_))
        ));
        let both = r#"{
            "output_columns": ["x"],
            "derived_columns": [{"name": "x", "source": "a", "constant": "0"}]
        }"#;
        assert!(matches!(
            ColumnCatalog::from_json(both),
            Err(TransformError::InvalidCatalog(_))
        ));
        assert!(matches!(
            ColumnCatalog::from_json(r#"{"drop_columns": "x"}"#),
            Err(TransformError::CatalogFormat(_))
        ));
    }

    #[test]
    fn test_catalog_encodings_accept_aliases() {
        let parsed = ColumnCatalog::from_json(
            r#"{"output_columns": ["a"], "candidate_encodings": ["windows-1252", "utf8"]}"#,
        )
        .unwrap();
        assert_eq!(parsed.candidate_encodings, vec![Encoding::Cp1252, Encoding::Utf8]);

        let err = ColumnCatalog::from_json(
            r#"{"output_columns": ["a"], "candidate_encodings": ["ebcdic"]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unknown encoding: ebcdic"));
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = ColumnCatalog::load(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Catalog { .. }));
        assert!(err.to_string().contains("catalog.json"));

        let err = ColumnCatalog::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, PipelineError::CatalogRead { .. }));
        assert!(err.to_string().contains("missing.json"));
    }
}
