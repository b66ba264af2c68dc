use thiserror::Error;

use crate::datetime::DateTokenError;
use crate::recurrence::RuleError;
use crate::timezone::ConversionError;

/// Calendar grammar and expansion errors
#[derive(Error, Debug)]
pub enum RfcError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    DateToken(#[from] DateTokenError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

pub type RfcResult<T> = std::result::Result<T, RfcError>;
