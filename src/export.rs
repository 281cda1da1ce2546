//! CSV serialisation of the check history.

use crate::model::ResultRecord;
use anyhow::{Context, Result};
use std::path::Path;

/// Default file name for a downloaded export.
pub const CSV_FILE_NAME: &str = "results.csv";

/// Content type advertised for the export artifact.
pub const CSV_CONTENT_TYPE: &str = "text/csv;charset=utf-8;";

const CSV_HEADER: &str = "prompt,mentioned,position";

/// Wrap a field in double quotes, doubling any embedded quote.
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn csv_row(record: &ResultRecord) -> String {
    let position = record
        .position()
        .map(|p| p.to_string())
        .unwrap_or_default();
    [
        quote(record.prompt()),
        quote(if record.mentioned() { "true" } else { "false" }),
        quote(&position),
    ]
    .join(",")
}

/// Render records as CSV in the order given.
///
/// The header is unquoted; every data field is quoted. `error` is not part of
/// the export. Lines are `\n`-separated with no trailing newline.
pub fn to_csv<'a>(records: impl IntoIterator<Item = &'a ResultRecord>) -> String {
    std::iter::once(CSV_HEADER.to_string())
        .chain(records.into_iter().map(csv_row))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write the CSV rendering of `records` to `path`.
pub fn write_csv<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a ResultRecord>,
) -> Result<()> {
    let body = to_csv(records);
    std::fs::write(path, body.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    tracing::info!(path = %path.display(), content_type = CSV_CONTENT_TYPE, "wrote CSV export");
    Ok(())
}
