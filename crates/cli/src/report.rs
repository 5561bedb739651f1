use flatref_fetcher::BatchSummary;
use flatref_indexer::{CategoryCount, DumpReport};

pub fn render_category_counts(counts: &[CategoryCount]) -> String {
    let mut out = String::from("== Category counts ==");
    for entry in counts {
        out.push_str(&format!("\n{:20} {}", entry.category, entry.count));
    }
    out
}

pub fn render_dump_report(report: &DumpReport) -> String {
    let mut lines: Vec<String> = report
        .written
        .iter()
        .map(|w| format!("Wrote {}  ({} refs)", w.path.display(), w.refs))
        .collect();
    if lines.is_empty() {
        lines.push("No ref lists written".to_string());
    }
    lines.join("\n")
}

pub fn render_batch_summary(summary: &BatchSummary) -> String {
    let mut out = String::from("\n== Summary ==\n");
    out.push_str(&format!("Successful: {}\n", summary.succeeded));
    out.push_str(&format!("Failed:     {}", summary.failed));
    if !summary.skipped_sources.is_empty() {
        out.push_str(&format!(
            "\nSkipped sources: {}",
            summary.skipped_sources.len()
        ));
    }
    if summary.limit_reached {
        out.push_str("\nStopped at --limit");
    }
    out
}
