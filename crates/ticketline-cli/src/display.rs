//! Terminal rendering: group overview table and per-cohort summary cards.

use ticketline_core::GroupStat;

use crate::pipeline::{CohortReport, RunStats, SummarySource};

const LABEL_WIDTH: usize = 12;

// ── Group overview ──

pub fn print_group_stats(stats: &[GroupStat]) {
    if stats.is_empty() {
        println!("No ticket groups found.");
        return;
    }
    let width = stats
        .iter()
        .map(|s| s.customer.len())
        .max()
        .unwrap_or(0)
        .max("Customer".len());

    println!("{:<width$}  {:<10} {:>7}", "Customer", "Product", "Tickets");
    println!("{}", "-".repeat(width + 20));
    for s in stats {
        println!("{:<width$}  {:<10} {:>7}", s.customer, s.product.as_str(), s.ticket_count);
    }
    let total: usize = stats.iter().map(|s| s.ticket_count).sum();
    println!();
    println!("{} groups, {total} tickets", stats.len());
}

// ── Summary cards ──

/// Print one cohort's summary as a vertical card, one block per section.
pub fn print_report_card(report: &CohortReport) {
    println!("=== Customer {} - {} ===", report.customer, report.product);
    println!(
        "{} tickets | {} | {}",
        report.record_count,
        source_label(report.source),
        short_fingerprint(report.fingerprint.as_str()),
    );
    println!();

    for (event, (name, section)) in report.timeline.events.iter().zip(report.summary.sections()) {
        let date = event.start_date;
        println!("{name} [{:04}-{:02}-{:02}]", date.year, date.month, date.day);
        println!("  {:<LABEL_WIDTH$} {}", "Timeframe", section.timeframe);
        if !section.ticket_numbers.is_empty() {
            println!("  {:<LABEL_WIDTH$} {}", "Tickets", section.ticket_numbers.join(", "));
        }
        print_narrative(&section.narrative);
        println!();
    }
}

pub fn print_tally(stats: &RunStats) {
    println!(
        "Done in {:.1}s: {} cached, {} generated, {} failed",
        stats.elapsed_secs, stats.cached, stats.generated, stats.failed
    );
}

fn print_narrative(narrative: &str) {
    let mut lines = narrative.lines();
    let first = lines.next().unwrap_or_default();
    println!("  {:<LABEL_WIDTH$} {first}", "Narrative");
    for line in lines {
        println!("  {:<LABEL_WIDTH$} {line}", "");
    }
}

fn source_label(source: SummarySource) -> String {
    match source {
        SummarySource::Cache => "cached".to_string(),
        SummarySource::Generated { backend, attempts } => {
            format!("generated by {backend} ({})", plural(attempts, "attempt"))
        }
        SummarySource::Failed { backend, attempts } => {
            format!("FAILED on {backend} ({})", plural(attempts, "attempt"))
        }
    }
}

fn plural(n: u32, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn short_fingerprint(hex: &str) -> &str {
    hex.get(..12).unwrap_or(hex)
}
