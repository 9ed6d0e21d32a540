//! Identity map errors
//!
//! Both variants indicate that the caller's bookkeeping disagrees with the
//! edit history the map has seen; neither is retried.

use thiserror::Error;

/// Result type for identity map operations
pub type IdMapResult<T> = Result<T, IdMapError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdMapError {
    /// The identifier was never registered or its node was deleted
    #[error("identifier not found: {0}")]
    IdentifierNotFound(u64),

    /// The position lies outside the document
    #[error("position {position} out of range (document length {len})")]
    PositionOutOfRange { position: u64, len: u64 },
}

impl IdMapError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            IdMapError::IdentifierNotFound(_) => "XS_IDMAP_ID_NOT_FOUND",
            IdMapError::PositionOutOfRange { .. } => "XS_IDMAP_POSITION_OUT_OF_RANGE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            IdMapError::IdentifierNotFound(7).to_string(),
            "identifier not found: 7"
        );
        assert_eq!(
            IdMapError::PositionOutOfRange { position: 9, len: 3 }.to_string(),
            "position 9 out of range (document length 3)"
        );
    }

    #[test]
    fn test_codes() {
        assert_eq!(IdMapError::IdentifierNotFound(0).code(), "XS_IDMAP_ID_NOT_FOUND");
        assert_eq!(
            IdMapError::PositionOutOfRange { position: 0, len: 0 }.code(),
            "XS_IDMAP_POSITION_OUT_OF_RANGE"
        );
    }
}
