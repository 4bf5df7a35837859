//! Case lookup queries and the portal's case type catalogue.

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Unsupported case type: {0}")]
    UnsupportedCaseType(String),

    #[error("Invalid case number: {0:?} (expected digits only)")]
    InvalidCaseNumber(String),

    #[error("Invalid filing year: {0:?} (expected a four digit year)")]
    InvalidFilingYear(String),
}

/// Case types accepted by the case-status portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseType {
    WritPetitionCivil,
    WritPetitionCriminal,
    CriminalAppeal,
    FirstAppealFromOrder,
    FirstAppealOriginalSide,
    CriminalMiscApplication,
    MatrimonialAppeal,
    CompanyAppeal,
    CivilSuitOriginalSide,
    InterlocutoryApplication,
    CriminalRevisionPetition,
    ArbitrationPetitionInterim,
    RegularFirstAppeal,
    ArbitrationAppeal,
    BailApplication,
    MotorAccidentClaimsAppeal,
    CivilRevisionPetition,
}

impl CaseType {
    pub const ALL: &'static [CaseType] = &[
        CaseType::WritPetitionCivil,
        CaseType::WritPetitionCriminal,
        CaseType::CriminalAppeal,
        CaseType::FirstAppealFromOrder,
        CaseType::FirstAppealOriginalSide,
        CaseType::CriminalMiscApplication,
        CaseType::MatrimonialAppeal,
        CaseType::CompanyAppeal,
        CaseType::CivilSuitOriginalSide,
        CaseType::InterlocutoryApplication,
        CaseType::CriminalRevisionPetition,
        CaseType::ArbitrationPetitionInterim,
        CaseType::RegularFirstAppeal,
        CaseType::ArbitrationAppeal,
        CaseType::BailApplication,
        CaseType::MotorAccidentClaimsAppeal,
        CaseType::CivilRevisionPetition,
    ];

    /// Label as it appears in the portal's case type dropdown.
    pub fn site_label(&self) -> &'static str {
        match self {
            Self::WritPetitionCivil => "W.P.(C)",
            Self::WritPetitionCriminal => "W.P.(CRL)",
            Self::CriminalAppeal => "CRL.A.",
            Self::FirstAppealFromOrder => "FAO",
            Self::FirstAppealOriginalSide => "FAO(OS)",
            Self::CriminalMiscApplication => "CRL.M.A.",
            Self::MatrimonialAppeal => "MAT.APP.",
            Self::CompanyAppeal => "CO.APP.",
            Self::CivilSuitOriginalSide => "CS(OS)",
            Self::InterlocutoryApplication => "I.A.",
            Self::CriminalRevisionPetition => "CRL.REV.P.",
            Self::ArbitrationPetitionInterim => "O.M.P.(I)",
            Self::RegularFirstAppeal => "RFA",
            Self::ArbitrationAppeal => "ARB.A.",
            Self::BailApplication => "BAIL APPLN.",
            Self::MotorAccidentClaimsAppeal => "MAC.APP.",
            Self::CivilRevisionPetition => "C.R.P.",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::WritPetitionCivil => "Writ Petition (Civil)",
            Self::WritPetitionCriminal => "Writ Petition (Criminal)",
            Self::CriminalAppeal => "Criminal Appeal",
            Self::FirstAppealFromOrder => "First Appeal from Order",
            Self::FirstAppealOriginalSide => "First Appeal from Order (Original Side)",
            Self::CriminalMiscApplication => "Criminal Miscellaneous Application",
            Self::MatrimonialAppeal => "Matrimonial Appeal",
            Self::CompanyAppeal => "Company Appeal",
            Self::CivilSuitOriginalSide => "Civil Suit (Original Side)",
            Self::InterlocutoryApplication => "Interlocutory Application",
            Self::CriminalRevisionPetition => "Criminal Revision Petition",
            Self::ArbitrationPetitionInterim => "Arbitration Petition (Interim Measures)",
            Self::RegularFirstAppeal => "Regular First Appeal",
            Self::ArbitrationAppeal => "Arbitration Appeal",
            Self::BailApplication => "Bail Application",
            Self::MotorAccidentClaimsAppeal => "Motor Accident Claims Appeal",
            Self::CivilRevisionPetition => "Civil Revision Petition",
        }
    }

    /// Label with trailing separator punctuation removed.
    ///
    /// The portal is inconsistent about trailing dots on option text, so
    /// both dropdown matching and fixture keys go through this form.
    pub fn code(&self) -> String {
        normalize_case_type_label(self.site_label())
    }

    /// Resolve user input ("crl.a", "W.P.(C).", "WP(C)") to a known case type.
    pub fn parse(input: &str) -> Option<Self> {
        let wanted = comparison_key(input);
        if wanted.is_empty() {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|t| comparison_key(t.site_label()) == wanted)
    }
}

impl std::fmt::Display for CaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.site_label())
    }
}

/// Strip surrounding whitespace and trailing separator punctuation, then
/// uppercase. `"W.P.(C)."` and `"w.p.(c)"` both become `"W.P.(C)"`.
pub fn normalize_case_type_label(label: &str) -> String {
    label
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '-') || c.is_whitespace())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

fn comparison_key(label: &str) -> String {
    normalize_case_type_label(label)
        .chars()
        .filter(|c| *c != '.' && !c.is_whitespace())
        .collect()
}

/// A validated case lookup. Fields are private so a query cannot be
/// mutated after validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CaseQuery {
    case_type: CaseType,
    case_number: String,
    filing_year: String,
}

impl CaseQuery {
    pub fn new(case_type: CaseType, case_number: &str, filing_year: &str) -> Result<Self, QueryError> {
        let case_number = case_number.trim();
        if case_number.is_empty()
            || case_number.len() > 8
            || !case_number.chars().all(|c| c.is_ascii_digit())
        {
            return Err(QueryError::InvalidCaseNumber(case_number.to_string()));
        }

        let filing_year = filing_year.trim();
        let year_ok = filing_year.len() == 4
            && filing_year.chars().all(|c| c.is_ascii_digit())
            && filing_year
                .parse::<i32>()
                .is_ok_and(|y| (1900..=Local::now().year()).contains(&y));
        if !year_ok {
            return Err(QueryError::InvalidFilingYear(filing_year.to_string()));
        }

        Ok(Self {
            case_type,
            case_number: case_number.to_string(),
            filing_year: filing_year.to_string(),
        })
    }

    /// Build a query from raw form strings.
    pub fn parse(case_type: &str, case_number: &str, filing_year: &str) -> Result<Self, QueryError> {
        let parsed = CaseType::parse(case_type)
            .ok_or_else(|| QueryError::UnsupportedCaseType(case_type.trim().to_string()))?;
        Self::new(parsed, case_number, filing_year)
    }

    pub fn case_type(&self) -> CaseType {
        self.case_type
    }

    pub fn case_number(&self) -> &str {
        &self.case_number
    }

    pub fn filing_year(&self) -> &str {
        &self.filing_year
    }

    /// Composite key used by fixture lookups, e.g. `W.P.(C).1234.2024`.
    pub fn lookup_key(&self) -> String {
        format!(
            "{}.{}.{}",
            self.case_type.code(),
            self.case_number,
            self.filing_year
        )
    }

    /// Case number as the portal displays it, e.g. `1234/2024`.
    pub fn display_number(&self) -> String {
        format!("{}/{}", self.case_number, self.filing_year)
    }
}

impl std::fmt::Display for CaseQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}/{}",
            self.case_type.site_label(),
            self.case_number,
            self.filing_year
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_trailing_separators() {
        assert_eq!(normalize_case_type_label("W.P.(C)."), "W.P.(C)");
        assert_eq!(normalize_case_type_label(" w.p.(c) "), "W.P.(C)");
        assert_eq!(normalize_case_type_label("CRL.A."), "CRL.A");
        assert_eq!(normalize_case_type_label("BAIL   APPLN."), "BAIL APPLN");
    }

    #[test]
    fn test_parse_case_type_variants() {
        assert_eq!(CaseType::parse("W.P.(C)"), Some(CaseType::WritPetitionCivil));
        assert_eq!(CaseType::parse("W.P.(C)."), Some(CaseType::WritPetitionCivil));
        assert_eq!(CaseType::parse("wp(c)"), Some(CaseType::WritPetitionCivil));
        assert_eq!(CaseType::parse("crl.a"), Some(CaseType::CriminalAppeal));
        assert_eq!(CaseType::parse("FAO"), Some(CaseType::FirstAppealFromOrder));
        assert_eq!(CaseType::parse("FAO(OS)"), Some(CaseType::FirstAppealOriginalSide));
        assert_eq!(CaseType::parse("XYZ"), None);
        assert_eq!(CaseType::parse("  "), None);
    }

    #[test]
    fn test_every_label_round_trips() {
        for t in CaseType::ALL {
            assert_eq!(CaseType::parse(t.site_label()), Some(*t));
        }
    }

    #[test]
    fn test_query_validation() {
        assert!(CaseQuery::parse("W.P.(C)", "1234", "2024").is_ok());
        assert_eq!(
            CaseQuery::parse("NOPE", "1", "2024"),
            Err(QueryError::UnsupportedCaseType("NOPE".to_string()))
        );
        assert!(matches!(
            CaseQuery::parse("RFA", "12a", "2024"),
            Err(QueryError::InvalidCaseNumber(_))
        ));
        assert!(matches!(
            CaseQuery::parse("RFA", "", "2024"),
            Err(QueryError::InvalidCaseNumber(_))
        ));
        assert!(matches!(
            CaseQuery::parse("RFA", "12", "24"),
            Err(QueryError::InvalidFilingYear(_))
        ));
        assert!(matches!(
            CaseQuery::parse("RFA", "12", "1850"),
            Err(QueryError::InvalidFilingYear(_))
        ));
    }

    #[test]
    fn test_lookup_key_ignores_trailing_dot() {
        let a = CaseQuery::parse("W.P.(C).", "1234", "2024").unwrap();
        let b = CaseQuery::parse("W.P.(C)", "1234", "2024").unwrap();
        assert_eq!(a.lookup_key(), b.lookup_key());
        assert_eq!(a.lookup_key(), "W.P.(C).1234.2024");

        let crl = CaseQuery::parse("CRL.A.", "567", "2023").unwrap();
        assert_eq!(crl.lookup_key(), "CRL.A.567.2023");
    }

    #[test]
    fn test_trims_whitespace() {
        let q = CaseQuery::parse("RFA", " 98 ", " 2022").unwrap();
        assert_eq!(q.case_number(), "98");
        assert_eq!(q.filing_year(), "2022");
        assert_eq!(q.display_number(), "98/2022");
    }
}
