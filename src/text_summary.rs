//! Text summary builder for CLI output.

use crate::ledger::HistoryLedger;
use crate::model::ResultRecord;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn record_lines(index: usize, record: &ResultRecord, lines: &mut Vec<String>) {
    lines.push(format!("[{index}] Prompt: {}", record.prompt()));
    lines.push(format!(
        "    Mentioned: {}",
        if record.mentioned() { "yes" } else { "no" }
    ));
    let position = record
        .position()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".into());
    lines.push(format!("    Position: {position}"));
    if let Some(err) = record.error() {
        lines.push(format!("    Error: {err}"));
    }
}

/// Build a text summary of the whole ledger, newest first.
pub(crate) fn build_text_summary(
    brand: &str,
    ledger: &HistoryLedger,
    banner: Option<&str>,
) -> TextSummary {
    let mut lines = vec![format!("Brand: {brand}")];
    let mentioned = ledger.iter().filter(|r| r.mentioned()).count();
    lines.push(format!("Checks: {} (mentioned in {})", ledger.len(), mentioned));

    for (i, record) in ledger.iter().enumerate() {
        record_lines(i, record, &mut lines);
    }

    if let Some(banner) = banner {
        lines.push(format!("Last error: {banner}"));
    }

    TextSummary { lines }
}
