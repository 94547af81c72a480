use anyhow::Context;
use leafguard_core::models::{HistoryEntry, HistoryStats, Notice, NoticeLevel};
use leafguard_services::Notifier;
use serde::Serialize;
use std::fmt::Write;

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Prints notices on stderr so stdout stays machine-readable.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notice: Notice) {
        eprintln!("{}", format_notice(&notice));
    }
}

pub fn format_notice(notice: &Notice) -> String {
    let tag = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "ok",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    };
    format!("[{}] {}: {}", tag, notice.title, notice.description)
}

pub fn render_history_table(entries: &[HistoryEntry]) -> String {
    let mut out = String::new();
    if entries.is_empty() {
        out.push_str("No diagnosis history yet.\n");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<32} {:<30} {:>10} {:<8} {:<10} {:>19}",
        "ID", "Disease", "Confidence", "Severity", "Status", "Date"
    );
    let _ = writeln!(out, "{}", "-".repeat(114));

    for entry in entries {
        let _ = writeln!(
            out,
            "{:<32} {:<30} {:>10} {:<8} {:<10} {:>19}",
            truncate_string(&entry.id, 32),
            truncate_string(entry.result.disease_name(), 30),
            entry.result.confidence().format_percent(1),
            entry.result.severity_label(),
            entry.status.to_string(),
            entry.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
    }
    out
}

pub fn render_stats(stats: &HistoryStats) -> String {
    format!(
        "Total: {}\nTreated: {}\nMonitoring: {}\nUntreated: {}\nHealthy: {}\n",
        stats.total, stats.treated, stats.monitoring, stats.untreated, stats.healthy
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use leafguard_core::models::{Confidence, DiagnosisResult, Severity};

    fn entry(id: &str, disease: &str) -> HistoryEntry {
        let result = DiagnosisResult::builder(disease, Confidence::from_fraction(0.873).unwrap())
            .severity(Some(Severity::Medium))
            .build();
        let mut entry = HistoryEntry::from_result(
            result,
            "leaf.jpg",
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 15, 0).unwrap(),
        );
        entry.id = id.to_string();
        entry
    }

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
    }

    #[test]
    fn truncate_string_counts_chars_not_bytes() {
        assert_eq!(truncate_string("Mildiou de la pomme de terre", 10), "Mildiou...");
        assert_eq!(truncate_string("Rouille brûlée", 9), "Rouill...");
    }

    #[test]
    fn notice_format_has_level_tag() {
        let notice = Notice::warning("History cleared locally", "Server records were kept.");
        assert_eq!(
            format_notice(&notice),
            "[warning] History cleared locally: Server records were kept."
        );
    }

    #[test]
    fn history_table_lists_entries() {
        let table = render_history_table(&[entry("diag_1714558500000_abcde", "Apple Scab")]);
        let lines: Vec<_> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[2].contains("Apple Scab"));
        assert!(lines[2].contains("87.3%"));
        assert!(lines[2].contains("Medium"));
        assert!(lines[2].contains("untreated"));
        assert!(lines[2].ends_with("2024-05-01 10:15:00"));
    }

    #[test]
    fn history_table_empty() {
        assert_eq!(render_history_table(&[]), "No diagnosis history yet.\n");
    }

    #[test]
    fn stats_render() {
        let stats = HistoryStats::from_entries(&[entry("a", "Apple Scab"), entry("b", "Healthy")]);
        let text = render_stats(&stats);
        assert!(text.starts_with("Total: 2\n"));
        assert!(text.contains("Healthy: 1"));
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
