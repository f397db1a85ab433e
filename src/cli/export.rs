use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::config::OneiroConfig;
use crate::dreams::types::Dream;
use crate::store::MemoryStore;

/// Bound on a whole-store export scan, matching the repository's list page.
const EXPORT_PAGE: usize = 2222;

/// Which rendering `oneiro export` writes.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ExportFormat {
    Json,
    Txt,
    Pdf,
}

/// Export dreams to a file (or stdout for the text formats).
///
/// Exports every dream in the store; pass `--email` to restrict to one owner.
pub fn export(
    config: &OneiroConfig,
    format: ExportFormat,
    out: Option<&Path>,
    email: Option<&str>,
) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let provider = crate::embedding::create_provider(&config.completion, &config.embedding)?;
    let store = crate::store::sqlite::SqliteStore::new(conn, Arc::from(provider));

    let records = store.list("dreams", EXPORT_PAGE)?;
    let dreams: Vec<Dream> = records
        .iter()
        .filter_map(Dream::from_record)
        .filter(|d| email.map_or(true, |owner| d.owner_email == owner))
        .collect();

    match format {
        ExportFormat::Json => {
            let json = crate::export::export_json(&dreams)?;
            write_output(out, json.as_bytes())?;
        }
        ExportFormat::Txt => {
            let text = crate::export::export_text(&dreams);
            write_output(out, text.as_bytes())?;
        }
        ExportFormat::Pdf => {
            let Some(path) = out else {
                bail!("pdf export requires --out <path>");
            };
            let bytes = crate::export::export_pdf(&dreams)?;
            std::fs::write(path, bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
    }

    eprintln!("Exported {} dreams.", dreams.len());
    Ok(())
}

fn write_output(out: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, bytes)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            use std::io::Write;
            std::io::stdout().write_all(bytes).context("failed to write stdout")
        }
    }
}
