//! Case search query intake and validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Earliest filing year the court search form accepts.
pub const MIN_FILING_YEAR: i32 = 1990;

/// Latest filing year the court search form accepts.
pub const MAX_FILING_YEAR: i32 = 2030;

/// Rejection reasons for a search request, rendered as user-facing messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill in all required fields.")]
    MissingField,
    #[error("Case number and filing year must be valid numbers.")]
    NotNumeric,
    #[error("Case number must be a positive number.")]
    NonPositiveCaseNumber,
    #[error("Please enter a valid filing year (1990-2030).")]
    YearOutOfRange,
}

/// A validated case lookup. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    case_type: String,
    case_number: u64,
    filing_year: i32,
}

impl SearchQuery {
    /// Build a query from raw form input.
    ///
    /// Surrounding whitespace is trimmed before validation.
    pub fn parse(
        case_type: &str,
        case_number: &str,
        filing_year: &str,
    ) -> Result<Self, ValidationError> {
        let case_type = case_type.trim();
        let case_number = case_number.trim();
        let filing_year = filing_year.trim();

        if case_type.is_empty() || case_number.is_empty() || filing_year.is_empty() {
            return Err(ValidationError::MissingField);
        }

        let number: i64 = case_number
            .parse()
            .map_err(|_| ValidationError::NotNumeric)?;
        let year: i32 = filing_year
            .parse()
            .map_err(|_| ValidationError::NotNumeric)?;

        Self::new(case_type, number, year)
    }

    /// Build a query from already-typed values.
    pub fn new(case_type: &str, case_number: i64, filing_year: i32) -> Result<Self, ValidationError> {
        let case_type = case_type.trim();
        if case_type.is_empty() {
            return Err(ValidationError::MissingField);
        }
        if case_number <= 0 {
            return Err(ValidationError::NonPositiveCaseNumber);
        }
        if !(MIN_FILING_YEAR..=MAX_FILING_YEAR).contains(&filing_year) {
            return Err(ValidationError::YearOutOfRange);
        }

        Ok(Self {
            case_type: case_type.to_string(),
            case_number: case_number as u64,
            filing_year,
        })
    }

    pub fn case_type(&self) -> &str {
        &self.case_type
    }

    pub fn case_number(&self) -> u64 {
        self.case_number
    }

    pub fn filing_year(&self) -> i32 {
        self.filing_year
    }
}

impl std::fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.case_type, self.case_number, self.filing_year)
    }
}
