//! Pure text-to-field heuristics for the dialogue.
//!
//! Each method scans one utterance for one field and returns what it found,
//! nothing else: no messages, no persistence, no state. Absence of a match is
//! the only failure mode, so a smarter parser can replace this module without
//! touching the state machine.

use regex::Regex;
use rust_decimal::Decimal;

use crate::domain::request::Currency;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectInfo {
    pub name: Option<String>,
    pub number: Option<String>,
}

#[derive(Clone, Debug)]
pub struct FieldExtractor {
    project_number: Regex,
    project_name: Regex,
    amount: Regex,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor {
    pub fn new() -> Self {
        Self {
            // First digit run, optionally carrying a PRJ-/P project prefix.
            project_number: Regex::new(r"(?i)\b(?:PRJ-|P)?\d+\b")
                .expect("project number pattern compiles"),
            // First plain token; a literal leading "project " word is skipped
            // so "project alpha" names the project "alpha".
            project_name: Regex::new(r"(?i)(?:project\s+)?([A-Za-z0-9_-]+)")
                .expect("project name pattern compiles"),
            // Integer or decimal with up to two fractional digits, optionally
            // followed by a currency token from the closed set.
            amount: Regex::new(r"(?i)\b(\d+(?:\.\d{1,2})?)\s*(usd|eur|gbp|dollars|euros|pounds)?\b")
                .expect("amount pattern compiles"),
        }
    }

    /// Scans for a project number and a project name independently. The two
    /// scans may overlap or disagree (the name scan happily picks up the same
    /// digits the number scan found); that ambiguity is accepted as-is.
    pub fn project_info(&self, text: &str) -> ProjectInfo {
        let number = self.project_number.find(text).map(|found| found.as_str().to_string());
        let name = self
            .project_name
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|token| token.as_str().to_string());

        ProjectInfo { name, number }
    }

    /// Scans for the first monetary amount. A bare number defaults to USD; no
    /// number at all yields `None`.
    pub fn amount(&self, text: &str) -> Option<(Decimal, Currency)> {
        let captures = self.amount.captures(text)?;
        let amount = captures.get(1)?.as_str().parse::<Decimal>().ok()?;
        let currency = captures
            .get(2)
            .and_then(|token| Currency::from_token(token.as_str()))
            .unwrap_or_default();

        Some((amount, currency))
    }
}
