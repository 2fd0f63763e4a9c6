//! Error types for hamming2nn.

use thiserror::Error;

/// Errors that can occur while preparing or running a matching invocation.
///
/// There is no partial success: when an invocation returns an error, every
/// slot of the output buffer must be treated as undefined.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Storage for descriptors or results could not be reserved.
    #[error("allocation failed: could not reserve {bytes} bytes for {what}")]
    Allocation { what: &'static str, bytes: usize },

    /// Raw descriptor buffer is not a whole number of records.
    #[error("descriptor buffer of {len} bytes is not a multiple of 64-byte records")]
    Layout { len: usize },

    /// Moving raw records in or out of a descriptor set failed.
    #[error("descriptor transfer failed: {0}")]
    Transfer(#[from] std::io::Error),

    /// Invalid invocation configuration (parameters, worker pool, set sizes).
    #[error("invalid launch configuration: {0}")]
    Launch(String),

    /// Output buffer does not hold exactly one slot per query.
    #[error("result buffer holds {actual} slots, expected {expected}")]
    ResultLength { expected: usize, actual: usize },

    /// A worker faulted during the sweep or the merge.
    #[error("compute fault: {0}")]
    Compute(String),
}

impl MatchError {
    pub(crate) fn launch(msg: impl Into<String>) -> Self {
        Self::Launch(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, MatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_message_names_record_size() {
        let err = MatchError::Layout { len: 100 };
        assert_eq!(
            err.to_string(),
            "descriptor buffer of 100 bytes is not a multiple of 64-byte records"
        );
    }

    #[test]
    fn io_errors_become_transfer_failures() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: MatchError = io.into();
        assert!(matches!(err, MatchError::Transfer(_)));
        assert!(err.to_string().contains("short read"));
    }
}
