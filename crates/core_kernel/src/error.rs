//! Kernel error type

use thiserror::Error;

/// Errors raised by kernel types
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input that is neither a bare UUID nor a prefixed identifier
    #[error("'{input}' is not a valid {kind} identifier")]
    InvalidIdentifier {
        kind: &'static str,
        input: String,
        #[source]
        source: uuid::Error,
    },
}
