//! Stage executor
//!
//! Runs the fixed stage sequence over an [`InvoiceTable`]:
//! prune → derive → rename → project → fixups. Every stage takes the table
//! by value and hands it to the next one; nothing here touches the disk.

use crate::api::logs::{log_info, log_warning};
use crate::error::{TransformError, TransformResult};
use crate::models::InvoiceTable;

use super::catalog::ColumnCatalog;
use super::operations::Operation;

/// Result of running every stage on one table
#[derive(Debug, Clone)]
pub struct ExecuteResult {
    /// Final table, laid out exactly as the catalog's output columns
    pub table: InvoiceTable,
    /// Column names left after pruning
    pub remaining_columns: Vec<String>,
    /// Drop-list entries that were present and removed
    pub dropped: Vec<String>,
}

/// Remove every drop-list column that is present. Absent ones are ignored.
pub fn prune_columns(mut table: InvoiceTable, drop_columns: &[String]) -> (InvoiceTable, Vec<String>) {
    let dropped = drop_columns
        .iter()
        .filter(|name| table.drop_column(name))
        .cloned()
        .collect();
    (table, dropped)
}

/// Add the catalog's derived columns.
///
/// Copies are taken from the source column as it stands now, before any
/// rename changes its name.
pub fn derive_columns(mut table: InvoiceTable, catalog: &ColumnCatalog) -> TransformResult<InvoiceTable> {
    for derived in &catalog.derived_columns {
        let values: Vec<String> = match (&derived.source, &derived.constant) {
            (Some(source), _) => table
                .column(source)
                .ok_or_else(|| missing(source, &table))?
                .into_iter()
                .map(str::to_string)
                .collect(),
            (None, Some(constant)) => vec![constant.clone(); table.row_count()],
            (None, None) => {
                return Err(TransformError::InvalidCatalog(format!(
                    "derived column '{}' has neither source nor constant",
                    derived.name
                )))
            }
        };
        table.set_column(&derived.name, values);
    }
    Ok(table)
}

/// Apply the renames in order. A rename whose source is absent does nothing.
pub fn rename_columns(mut table: InvoiceTable, catalog: &ColumnCatalog) -> InvoiceTable {
    for rename in &catalog.renames {
        if !table.rename_column(&rename.from, &rename.to) {
            log_warning(format!("Column '{}' not found, not renamed", rename.from));
        }
    }
    table
}

/// Keep exactly the output columns, in order.
pub fn project_columns(table: &InvoiceTable, output_columns: &[String]) -> TransformResult<InvoiceTable> {
    table.select(output_columns)
}

/// Run each fixup's operations over its column.
pub fn apply_fixups(mut table: InvoiceTable, catalog: &ColumnCatalog) -> TransformResult<InvoiceTable> {
    for fixup in &catalog.fixups {
        let found = table.map_column(&fixup.column, |v| Operation::apply_all(&fixup.operations, v));
        if !found {
            return Err(missing(&fixup.column, &table));
        }
    }
    Ok(table)
}

fn missing(column: &str, table: &InvoiceTable) -> TransformError {
    TransformError::MissingColumn {
        column: column.to_string(),
        available: table.headers().to_vec(),
    }
}

/// Execute every stage of `catalog` on `table`.
///
/// # Arguments
/// * `table` - Parsed table with normalized column names
/// * `catalog` - Column catalog to apply
pub fn execute(table: InvoiceTable, catalog: &ColumnCatalog) -> TransformResult<ExecuteResult> {
    let (table, dropped) = prune_columns(table, &catalog.drop_columns);
    let remaining_columns = table.headers().to_vec();
    log_info(format!("Remaining columns: {}", remaining_columns.join(", ")));

    let table = derive_columns(table, catalog)?;
    let table = rename_columns(table, catalog);
    let table = project_columns(&table, &catalog.output_columns)?;
    let table = apply_fixups(table, catalog)?;

    Ok(ExecuteResult {
        table,
        remaining_columns,
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_headers() -> Vec<String> {
        [
            "Fecha de Emision",
            "Tipo de Comprobante",
            "Punto de Venta",
            "Numero de Comprobante",
            "Tipo Doc. Vendedor",
            "Nro. Doc. Vendedor",
            "Denominacion Vendedor",
            "Tipo de Cambio",
            "Moneda Original",
            "Total Neto Gravado",
            "Importe No Gravado",
            "Importe Exento",
            "Importe Otros Tributos",
            "Total IVA",
            "Importe Total",
            "Neto Gravado IVA 21%",
            "Importe IVA 21%",
            "Credito Fiscal Computable",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn example_row() -> Vec<String> {
        [
            "2024-01-10", "81", "3", "1050", "80", "30111222333", "ACME SA", "1", "PES",
            "-1000.00", "0", "0", "0", "-210.00", "-1210.00", "-1000.00", "-210.00", "-210.00",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn example_table() -> InvoiceTable {
        InvoiceTable::new(input_headers(), vec![example_row()])
    }

    #[test]
    fn test_end_to_end_example_row() {
        let catalog = ColumnCatalog::afip();
        let result = execute(example_table(), &catalog).unwrap();

        assert_eq!(result.table.headers(), catalog.output_columns.as_slice());
        assert_eq!(
            result.table.rows()[0],
            vec![
                "2024-01-10", "83", "3", "1050", "1050", "0", "80", "30111222333", "ACME SA",
                "1", "PES", "1000.00", "0", "0", "0", "210.00", "1210.00",
            ]
        );
        assert_eq!(result.dropped.len(), 3);
        assert!(!result.remaining_columns.contains(&"Importe IVA 21%".to_string()));
    }

    #[test]
    fn test_output_layout_ignores_input_order() {
        let catalog = ColumnCatalog::afip();
        let mut headers = input_headers();
        let mut row = example_row();
        headers.reverse();
        row.reverse();

        let result = execute(InvoiceTable::new(headers, vec![row]), &catalog).unwrap();
        assert_eq!(result.table.headers(), catalog.output_columns.as_slice());
        assert_eq!(result.table.rows()[0][0], "2024-01-10");
        assert_eq!(result.table.rows()[0][16], "1210.00");
    }

    #[test]
    fn test_prune_tolerates_missing_columns() {
        let headers: Vec<String> = input_headers().into_iter().take(15).collect();
        let row: Vec<String> = example_row().into_iter().take(15).collect();
        let (table, dropped) = prune_columns(
            InvoiceTable::new(headers.clone(), vec![row]),
            &ColumnCatalog::afip().drop_columns,
        );
        assert!(dropped.is_empty());
        assert_eq!(table.headers(), headers.as_slice());
    }

    #[test]
    fn test_numero_hasta_copies_starting_number() {
        let catalog = ColumnCatalog::afip();
        let mut second = example_row();
        second[3] = "1051".to_string();
        let table = InvoiceTable::new(input_headers(), vec![example_row(), second]);

        let table = derive_columns(table, &catalog).unwrap();
        assert_eq!(table.column("numero hasta").unwrap(), vec!["1050", "1051"]);
        assert_eq!(table.column("Cod Autorizacion").unwrap(), vec!["0", "0"]);
    }

    #[test]
    fn test_category_remap_is_exclusive() {
        let catalog = ColumnCatalog::afip();
        let codes = ["81", "1", "83", "6", "811", "8"];
        let rows = codes
            .iter()
            .map(|c| {
                let mut r = example_row();
                r[1] = c.to_string();
                r
            })
            .collect();

        let result = execute(InvoiceTable::new(input_headers(), rows), &catalog).unwrap();
        let out = result.table.column("Tipo de Comprobante").unwrap();
        assert_eq!(out, vec!["83", "1", "83", "6", "811", "8"]);
        assert!(!out.contains(&"81"));
    }

    #[test]
    fn test_missing_column_fails_at_projection() {
        let catalog = ColumnCatalog::afip();
        let table = example_table();
        let idx = table.column_index("Tipo de Cambio").unwrap();
        let headers: Vec<String> = table
            .headers()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, h)| h.clone())
            .collect();
        let mut row = example_row();
        row.remove(idx);

        let err = execute(InvoiceTable::new(headers, vec![row]), &catalog).unwrap_err();
        match err {
            TransformError::MissingColumn { column, available } => {
                assert_eq!(column, "Tipo de Cambio");
                assert!(available.contains(&"Fecha de emision".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_derivation_source_fails() {
        let catalog = ColumnCatalog::afip();
        let table = InvoiceTable::new(vec!["Fecha de Emision".into()], vec![vec!["x".into()]]);
        let err = derive_columns(table, &catalog).unwrap_err();
        assert!(err.to_string().contains("Numero de Comprobante"));
    }

    #[test]
    fn test_alternate_catalog() {
        let catalog = ColumnCatalog::from_json(
            r#"{
                "drop_columns": ["basura"],
                "derived_columns": [{"name": "copia", "source": "nro"}],
                "renames": [{"from": "nro", "to": "numero"}],
                "output_columns": ["copia", "numero"],
                "fixups": [{"column": "numero", "operations": [{"type": "strip_char", "char": "."}]}]
            }"#,
        )
        .unwrap();
        let table = InvoiceTable::new(
            vec!["basura".into(), "nro".into()],
            vec![vec!["x".into(), "1.000".into()]],
        );

        let result = execute(table, &catalog).unwrap();
        assert_eq!(result.table.headers(), &["copia", "numero"]);
        assert_eq!(result.table.rows()[0], vec!["1.000", "1000"]);
        assert_eq!(result.dropped, vec!["basura"]);
    }

    #[test]
    fn test_header_only_table() {
        let result = execute(InvoiceTable::new(input_headers(), vec![]), &ColumnCatalog::afip()).unwrap();
        assert_eq!(result.table.row_count(), 0);
        assert_eq!(result.table.headers().len(), 17);
    }
}
