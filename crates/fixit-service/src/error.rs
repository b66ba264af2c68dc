use thiserror::Error;

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    RfcError(#[from] fixit_rfc::error::RfcError),

    #[error("Malformed event key {key:?}: {reason}")]
    MalformedEventKey { key: String, reason: String },

    #[error("Invalid descriptor {id}: {reason}")]
    InvalidDescriptor { id: String, reason: String },
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
