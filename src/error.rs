use crate::entry::AccountingMethod;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinancialReportError {
    #[error("Invalid argument '{field}' = {value}: {reason}")]
    InvalidArgument {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("No normalized entries for company {company_id} ({method})")]
    NotFound {
        company_id: u32,
        method: AccountingMethod,
    },

    #[error("Company identifier not found in dataset: {0}")]
    UnknownCompany(String),

    #[error("Invalid raw field '{field}': {value}")]
    InvalidRawField { field: &'static str, value: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FinancialReportError {
    pub(crate) fn invalid_argument(
        field: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FinancialReportError>;
