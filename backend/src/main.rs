//! Arreglar CLI - Normalize AFIP Comprobantes CSV exports
//!
//! # Main Commands
//!
//! ```bash
//! arreglar convert a.csv b.csv         # Write a_arreglado.csv, b_arreglado.csv
//! arreglar serve                       # Start the upload server (port 3000)
//! ```
//!
//! # Diagnostic Commands
//!
//! ```bash
//! arreglar detect input.csv            # Show encoding, columns and row count
//! arreglar catalog                     # Print the active column catalog
//! arreglar operations                  # Show available value operations
//! ```

use arreglar::{
    convert_batch, operations_description, parse_file, server::AppState, ColumnCatalog,
    ConvertOptions, LineTerminator,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Environment variable naming the default catalog file.
const CATALOG_ENV: &str = "ARREGLAR_CATALOG";

const DEFAULT_PORT: u16 = 3000;

#[derive(Parser)]
#[command(name = "arreglar")]
#[command(about = "Convert AFIP Comprobantes CSV exports to the import layout", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert CSV files, writing <name>_arreglado.csv for each
    Convert {
        /// Input CSV files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory for converted files (default: current directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Catalog JSON file (default: $ARREGLAR_CATALOG or built-in AFIP)
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Write LF line endings instead of CRLF
        #[arg(long)]
        lf: bool,

        /// Stop at the first file that fails
        #[arg(long)]
        fail_fast: bool,
    },

    /// Show how a CSV file would be read
    Detect {
        /// Input CSV file
        file: PathBuf,

        /// Catalog JSON file
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },

    /// Print the active column catalog as JSON
    Catalog {
        /// Catalog JSON file
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },

    /// Show available value operations
    Operations,

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: $PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Catalog JSON file
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            files,
            output_dir,
            catalog,
            lf,
            fail_fast,
        } => cmd_convert(&files, output_dir, catalog.as_deref(), lf, fail_fast),

        Commands::Detect { file, catalog } => cmd_detect(&file, catalog.as_deref()),

        Commands::Catalog { catalog } => cmd_catalog(catalog.as_deref()),

        Commands::Operations => cmd_operations(),

        Commands::Serve { port, catalog } => cmd_serve(port, catalog.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

/// `--catalog`, then `$ARREGLAR_CATALOG`, then the built-in AFIP catalog.
fn resolve_catalog(path: Option<&Path>) -> Result<ColumnCatalog, Box<dyn std::error::Error>> {
    let from_env = std::env::var_os(CATALOG_ENV).map(PathBuf::from);
    match path.map(Path::to_path_buf).or(from_env) {
        Some(path) => {
            eprintln!("📋 Catalog: {}", path.display());
            Ok(ColumnCatalog::load(&path)?)
        }
        None => Ok(ColumnCatalog::afip()),
    }
}

fn cmd_convert(
    files: &[PathBuf],
    output_dir: Option<PathBuf>,
    catalog: Option<&Path>,
    lf: bool,
    fail_fast: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = resolve_catalog(catalog)?;
    let line_terminator = if lf { LineTerminator::Lf } else { LineTerminator::Crlf };

    let options = ConvertOptions {
        output_dir: output_dir.unwrap_or_else(|| PathBuf::from(".")),
        line_terminator,
        fail_fast,
    };
    let report = convert_batch(files, &catalog, &options)?;

    for converted in &report.converted {
        println!(
            "✅ {} → {} ({})",
            converted.input.display(),
            converted.output.display(),
            converted.csv_info.encoding
        );
    }

    if !report.is_ok() {
        eprintln!("\n❌ {} file(s) failed:", report.failed.len());
        for failed in &report.failed {
            eprintln!("   - {}: {}", failed.input.display(), failed.error);
        }
        return Err(report.summary().into());
    }

    Ok(())
}

fn cmd_detect(file: &Path, catalog: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = resolve_catalog(catalog)?;
    eprintln!("📄 Reading: {}", file.display());

    let parsed = parse_file(
        file,
        &catalog.candidate_encodings,
        &catalog.expected_source_columns(),
    )?;

    println!("Encoding: {}", parsed.encoding);
    println!("Rows: {}", parsed.table.row_count());
    println!("Columns:");
    for header in parsed.table.headers() {
        println!("  - {}", header);
    }

    let missing = catalog.missing_output_columns(parsed.table.headers());
    if missing.is_empty() {
        println!("✅ All columns needed for the output are present");
    } else {
        println!("⚠️  Missing columns: {}", missing.join(" | "));
    }

    Ok(())
}

fn cmd_catalog(catalog: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = resolve_catalog(catalog)?;
    println!("{}", catalog.to_json()?);
    Ok(())
}

fn cmd_operations() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", operations_description());
    Ok(())
}

async fn cmd_serve(port: Option<u16>, catalog: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let port = match port {
        Some(port) => port,
        None => match std::env::var("PORT") {
            Ok(value) => value.parse()?,
            Err(_) => DEFAULT_PORT,
        },
    };
    let catalog = resolve_catalog(catalog)?;
    arreglar::server::start_server(port, AppState::new(catalog)).await?;
    Ok(())
}
