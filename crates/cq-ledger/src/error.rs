use cq_store::StoreError;
use cq_types::TypeError;

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The object store could not be reached, rejected the credentials or
    /// did not answer within the operation timeout.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("insufficient points: required {required}, available {available}")]
    InsufficientPoints { required: u64, available: u64 },

    /// A stored document exists but does not parse.
    #[error("malformed document {key}: {reason}")]
    MalformedDocument { key: String, reason: String },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("unknown prize {0:?}")]
    UnknownPrize(String),

    #[error("duplicate prize id {0:?} in catalog")]
    DuplicatePrize(String),

    #[error("invalid user: {0}")]
    InvalidUser(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        LedgerError::StorageUnavailable(e.to_string())
    }
}

impl From<TypeError> for LedgerError {
    fn from(e: TypeError) -> Self {
        match e {
            TypeError::InsufficientPoints {
                required,
                available,
            } => LedgerError::InsufficientPoints {
                required,
                available,
            },
            TypeError::ZeroPoints | TypeError::PointsOverflow => {
                LedgerError::InvalidAmount(e.to_string())
            }
            TypeError::InvalidUserId(_) => LedgerError::InvalidUser(e.to_string()),
            TypeError::InvalidCoordinate { .. } | TypeError::Serialization(_) => {
                LedgerError::Serialization(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_errors_map_to_ledger_kinds() {
        assert_eq!(
            LedgerError::from(TypeError::InsufficientPoints {
                required: 1000,
                available: 100
            }),
            LedgerError::InsufficientPoints {
                required: 1000,
                available: 100
            }
        );
        assert!(matches!(
            LedgerError::from(TypeError::ZeroPoints),
            LedgerError::InvalidAmount(_)
        ));
        assert!(matches!(
            LedgerError::from(TypeError::PointsOverflow),
            LedgerError::InvalidAmount(_)
        ));
    }

    #[test]
    fn store_errors_are_storage_unavailable() {
        let err = LedgerError::from(StoreError::PermissionDenied("HTTP 403".into()));
        assert_eq!(
            err.to_string(),
            "storage unavailable: permission denied: HTTP 403"
        );
    }
}
