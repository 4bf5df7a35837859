//! Shared helper functions for CLI commands.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use dhc_case_status::CaseRecord;

/// Spinner on stderr for a long-running step.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(template);
    }
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Human label for a record field name.
fn field_label(name: &str) -> String {
    let mut label = name.replace('_', " ");
    if let Some(first) = label.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    label
}

pub fn print_record(record: &CaseRecord) {
    println!(
        "\n{}",
        style(format!("{} {}", record.case_type, record.case_number)).bold()
    );

    for (name, value) in record.scalar_fields().iter().skip(2) {
        if let Some(value) = value {
            println!("  {:<18} {}", style(field_label(name)).dim(), value);
        }
    }

    if !record.pdf_links.is_empty() {
        println!("\n  {}", style("Documents").bold());
        for link in &record.pdf_links {
            let date = link.date.as_deref().unwrap_or("-");
            println!("  {} {} ({})", style("•").cyan(), link.title, date);
            println!("    {}", style(&link.url).dim());
        }
    }

    if !record.case_history.is_empty() {
        println!("\n  {}", style("History").bold());
        for entry in &record.case_history {
            println!("  {:<12} {}", entry.date, entry.description);
            if let Some(order) = &entry.order {
                println!("  {:<12} {}", "", style(order).dim());
            }
        }
    }
}

/// File name for a downloaded order, taken from the URL path.
pub fn pdf_file_name(url: &str, index: usize) -> String {
    let name = url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("order-{}.pdf", index + 1));

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.to_ascii_lowercase().ends_with(".pdf") {
        sanitized
    } else {
        format!("{}.pdf", sanitized)
    }
}
