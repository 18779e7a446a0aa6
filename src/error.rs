/// Failures raised by the pairing and result-application core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PairingError {
    #[error("invalid round configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("no eligible students remain after excluding absences")]
    EmptyRoster,

    #[error("invalid result data in row {row}: {reason}")]
    InvalidResultData { row: usize, reason: String },
}

impl PairingError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    pub fn result_row(row: usize, reason: impl Into<String>) -> Self {
        Self::InvalidResultData {
            row,
            reason: reason.into(),
        }
    }
}
