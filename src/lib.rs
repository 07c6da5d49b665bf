//! fiomatch - Conviction list XML to check-report reconciliation
//!
//! This crate turns a `List/Document/RequestInfo/ConvictionPerson` XML export into
//! delimited name/birth-date text, and cross-references the same XML against a
//! tabular check report (XLS/XLSX/ODS, or an HTML table saved as `.xls`),
//! writing a two-sheet XLSX report that highlights rows with positive flags.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // One line per identity variant: surname;name;patronymic;year;month;day
//!     let text = fiomatch::parse_to_delimited_text("export.xml")?;
//!     print!("{}", text);
//!
//!     // Cross-reference a check report against the same XML
//!     let rows = fiomatch::load_tabular_file("ibd-f.xls")?;
//!     let xml = std::fs::read("export.xml")?;
//!     let rows = fiomatch::match_against_xml(&xml, rows)?;
//!     let output = fiomatch::write_report("ibd-f.xls", &rows)?;
//!     println!("Report written to {}", output.display());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use fiomatch::{IngestMode, ReconcilerBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reconciler = ReconcilerBuilder::new()
//!         .with_ingest_mode(IngestMode::Auto)
//!         .with_positive_marker("ДА")
//!         .with_output_prefix("check_")
//!         .build()?;
//!
//!     let summary = reconciler.run("export.xml", "ibd-f.xls")?;
//!     println!(
//!         "{} rows, {} matched, {} positive -> {}",
//!         summary.rows,
//!         summary.matched,
//!         summary.positive,
//!         summary.output_path.display()
//!     );
//!     Ok(())
//! }
//! ```

mod api;
mod builder;
mod error;
mod format;
mod ingest;
mod matcher;
mod parser;
mod report;
mod security;
mod types;

use std::path::{Path, PathBuf};

// 公開API
pub use api::{IngestMode, IngestStrategy};
pub use builder::{
    parse_person_records, parse_xml_to_lines, Reconciler, ReconcilerBuilder, RunSummary,
};
pub use error::{FioMatchError, WriteError};
pub use ingest::LoadedTable;
pub use matcher::MatchIndex;
pub use report::{ReportOutcome, REPORT_COLUMN_COUNT, REPORT_HEADERS};
pub use types::{BirthDate, IdentityKey, PersonRecord, TabularRow, TABULAR_FIELD_COUNT};

/// デフォルト設定の`Reconciler`
fn default_reconciler() -> Reconciler {
    Reconciler::new(builder::ReconcileConfig::default())
}

/// XMLファイルを区切り文字付きテキストに変換する（デフォルト設定）
pub fn parse_to_delimited_text(path: impl AsRef<Path>) -> Result<String, FioMatchError> {
    default_reconciler().parse_to_delimited_text(path)
}

/// 表形式ファイルを読み込む（デフォルト設定）
pub fn load_tabular_file(path: impl AsRef<Path>) -> Result<Vec<TabularRow>, FioMatchError> {
    default_reconciler().load_tabular_file(path)
}

/// XMLバイト列と照合する（デフォルト設定）
pub fn match_against_xml(
    xml: &[u8],
    rows: Vec<TabularRow>,
) -> Result<Vec<TabularRow>, FioMatchError> {
    default_reconciler().match_against_xml(xml, rows)
}

/// レポートを書き出す（デフォルト設定）
pub fn write_report(path: impl AsRef<Path>, rows: &[TabularRow]) -> Result<PathBuf, FioMatchError> {
    default_reconciler().write_report(path, rows)
}
