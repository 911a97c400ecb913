use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[cfg(test)]
mod tests {
    use super::DomainError;

    #[test]
    fn invariant_violation_reads_well_in_logs() {
        let error = DomainError::InvariantViolation("unknown request status `Archived`".to_owned());
        assert_eq!(
            error.to_string(),
            "domain invariant violation: unknown request status `Archived`"
        );
    }
}
