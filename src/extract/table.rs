//! Label/value rows of the case details table.

use scraper::{ElementRef, Selector};
use std::sync::LazyLock;

use super::element_text;
use crate::models::CaseRecord;

static ROWS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELLS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th, td").unwrap());

/// Record field a row label maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    CaseNumber,
    CaseType,
    Title,
    Petitioner,
    Respondent,
    FilingDate,
    NextHearingDate,
    Status,
    Judge,
    CourtHall,
    LastOrderDate,
    LatestOrder,
}

/// Known label spellings, already normalized with [`normalize_label`].
const SYNONYMS: &[(&str, Field)] = &[
    ("case no", Field::CaseNumber),
    ("case number", Field::CaseNumber),
    ("diary no", Field::CaseNumber),
    ("case type", Field::CaseType),
    ("case title", Field::Title),
    ("title", Field::Title),
    ("parties", Field::Title),
    ("case name", Field::Title),
    ("party name", Field::Title),
    ("petitioner vs respondent", Field::Title),
    ("petitioner", Field::Petitioner),
    ("petitioner name", Field::Petitioner),
    ("petitioner(s)", Field::Petitioner),
    ("appellant", Field::Petitioner),
    ("appellant(s)", Field::Petitioner),
    ("plaintiff", Field::Petitioner),
    ("respondent", Field::Respondent),
    ("respondent name", Field::Respondent),
    ("respondent(s)", Field::Respondent),
    ("defendant", Field::Respondent),
    ("filing date", Field::FilingDate),
    ("date of filing", Field::FilingDate),
    ("filed on", Field::FilingDate),
    ("registration date", Field::FilingDate),
    ("date of registration", Field::FilingDate),
    ("next date", Field::NextHearingDate),
    ("next hearing date", Field::NextHearingDate),
    ("next date of hearing", Field::NextHearingDate),
    ("next listing date", Field::NextHearingDate),
    ("listing date", Field::NextHearingDate),
    ("next hearing", Field::NextHearingDate),
    ("status", Field::Status),
    ("case status", Field::Status),
    ("stage", Field::Status),
    ("judge", Field::Judge),
    ("judge name", Field::Judge),
    ("coram", Field::Judge),
    ("bench", Field::Judge),
    ("hon'ble judge", Field::Judge),
    ("court no", Field::CourtHall),
    ("court number", Field::CourtHall),
    ("court hall", Field::CourtHall),
    ("court room", Field::CourtHall),
    ("court room no", Field::CourtHall),
    ("court", Field::CourtHall),
    ("last order date", Field::LastOrderDate),
    ("date of last order", Field::LastOrderDate),
    ("last date", Field::LastOrderDate),
    ("order date", Field::LastOrderDate),
    ("latest order", Field::LatestOrder),
    ("last order", Field::LatestOrder),
    ("order", Field::LatestOrder),
];

/// Lowercase, collapse whitespace, drop trailing `:`/`.`/`-`.
pub fn normalize_label(label: &str) -> String {
    let collapsed = label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .trim_end_matches(|c: char| matches!(c, ':' | '.' | '-') || c.is_whitespace())
        .to_string()
}

/// Map a row label onto a record field.
pub fn match_label(label: &str) -> Option<Field> {
    let key = normalize_label(label);
    SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == key)
        .map(|(_, field)| *field)
}

/// Placeholder values the portal prints for missing data.
fn clean_value(value: String) -> Option<String> {
    match value.trim() {
        "" | "-" | "--" | "N/A" | "NA" | "n/a" => None,
        _ => Some(value),
    }
}

/// Read `(field, value)` pairs from the first two cells of each row.
///
/// Rows with fewer cells or an unknown label are skipped.
pub fn read_rows(table: ElementRef<'_>) -> Vec<(Field, String)> {
    let mut pairs = Vec::new();
    for row in table.select(&ROWS) {
        let mut cells = row.select(&CELLS);
        let (Some(label), Some(value)) = (cells.next(), cells.next()) else {
            continue;
        };
        let Some(field) = match_label(&element_text(&label)) else {
            continue;
        };
        if let Some(value) = clean_value(element_text(&value)) {
            pairs.push((field, value));
        }
    }
    pairs
}

/// Write a value into the record. The first value seen for a field wins.
pub fn assign(record: &mut CaseRecord, field: Field, value: String) {
    let slot = match field {
        Field::CaseNumber => {
            if record.case_number.is_empty() {
                record.case_number = value;
            }
            return;
        }
        Field::CaseType => {
            if record.case_type.is_empty() {
                record.case_type = value;
            }
            return;
        }
        Field::Title => &mut record.case_title,
        Field::Petitioner => &mut record.petitioner_name,
        Field::Respondent => &mut record.respondent_name,
        Field::FilingDate => &mut record.filing_date,
        Field::NextHearingDate => &mut record.next_hearing_date,
        Field::Status => &mut record.case_status,
        Field::Judge => &mut record.judge_name,
        Field::CourtHall => &mut record.court_hall,
        Field::LastOrderDate => &mut record.last_order_date,
        Field::LatestOrder => &mut record.latest_order,
    };
    if slot.is_none() {
        *slot = Some(value);
    }
}
