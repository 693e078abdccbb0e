use thiserror::Error;

/// Errors produced by type construction and state transitions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid user id {0:?}")]
    InvalidUserId(String),

    #[error("invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate { latitude: String, longitude: String },

    #[error("points amount must be greater than zero")]
    ZeroPoints,

    #[error("points balance would overflow")]
    PointsOverflow,

    #[error("insufficient points: required {required}, available {available}")]
    InsufficientPoints { required: u64, available: u64 },

    #[error("serialization error: {0}")]
    Serialization(String),
}
