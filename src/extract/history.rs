//! Hearing history table rows.

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use super::element_text;
use crate::models::HistoryEntry;

static ROWS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELLS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

/// Read `date | description | order` rows.
///
/// Header rows (`th` only) and rows without a date are skipped.
pub fn read_history(table: ElementRef<'_>) -> Vec<HistoryEntry> {
    table
        .select(&ROWS)
        .filter_map(|row| {
            let cells: Vec<String> = row.select(&CELLS).map(|c| element_text(&c)).collect();
            if cells.len() < 2 || cells[0].is_empty() {
                return None;
            }
            Some(HistoryEntry {
                date: cells[0].clone(),
                description: cells[1].clone(),
                order: cells.get(2).filter(|o| !o.is_empty()).cloned(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_read_history() {
        let html = Html::parse_fragment(
            r#"<table class="case-history">
                <tr><th>Date</th><th>Proceedings</th><th>Order</th></tr>
                <tr><td>15/01/2024</td><td>Notice issued</td><td>Issue notice</td></tr>
                <tr><td>20/02/2024</td><td>Adjourned</td><td></td></tr>
                <tr><td></td><td>stray</td></tr>
            </table>"#,
        );
        let table = html
            .select(&Selector::parse("table").unwrap())
            .next()
            .unwrap();
        let entries = read_history(table);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date, "15/01/2024");
        assert_eq!(entries[0].order.as_deref(), Some("Issue notice"));
        assert_eq!(entries[1].description, "Adjourned");
        assert!(entries[1].order.is_none());
    }
}
