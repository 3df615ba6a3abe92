use anyhow::Result;
use std::path::Path;

use crate::ingest::RunSummary;

/// Plain-text run report.
pub fn render_summary(summary: &RunSummary, input: &Path) -> String {
    let mut out = format!(
        "Extracted {} plan(s) from {} line(s) of {} (sink: {})\n",
        summary.plans,
        summary.lines,
        input.display(),
        summary.sink
    );
    let rows = [
        ("written", summary.written),
        ("duplicates", summary.duplicates),
        ("malformed markers skipped", summary.malformed),
        ("empty plans skipped", summary.skipped_empty),
    ];
    for (label, count) in rows {
        out.push_str(&format!("  {label:<26} {count}\n"));
    }
    out
}

pub fn render_summary_json(summary: &RunSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}
