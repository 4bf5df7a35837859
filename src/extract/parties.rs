//! Splitting "A vs B" case titles into parties.

use std::sync::LazyLock;

use regex::Regex;

static VERSUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:vs\.?|v/s|versus|v\.)\s+").unwrap());

/// Split a title on its first "vs"-style separator.
///
/// Returns `None` when there is no separator or either side is empty.
pub fn split_parties(title: &str) -> Option<(String, String)> {
    let m = VERSUS.find(title)?;
    let petitioner = title[..m.start()].trim();
    let respondent = title[m.end()..].trim();
    if petitioner.is_empty() || respondent.is_empty() {
        return None;
    }
    Some((petitioner.to_string(), respondent.to_string()))
}
