pub mod identity;
pub mod money;
pub mod payment;

pub use identity::{Caller, Role};
pub use money::Cents;

/// Error taxonomy shared by every operation in the core.
///
/// Domain crates keep their own error enums and classify them into one of
/// these through `From`, so the HTTP edge only has to know these outcomes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Malformed or missing input. Rejected before any mutation.
    #[error("Validation failed: {0}")]
    Validation(String),
    /// The request contradicts current state. State is unchanged and the caller
    /// should refresh before retrying.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// A collaborator (payment provider) failed. Nothing was recorded.
    #[error("Upstream failure: {0}")]
    Upstream(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        CoreError::Conflict(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CoreError::NotFound { entity, id: id.to_string() }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        CoreError::Forbidden(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        CoreError::Upstream(msg.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Rejects empty or whitespace-only text, naming the offending field.
pub fn require_text(field: &str, value: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::not_found("Job", "abc");
        assert_eq!(err.to_string(), "Job not found: abc");

        let err = CoreError::validation("note must not be empty");
        assert_eq!(err.to_string(), "Validation failed: note must not be empty");
    }

    #[test]
    fn test_require_text() {
        assert!(require_text("note", "moved to staging").is_ok());
        assert_eq!(
            require_text("note", "   "),
            Err(CoreError::Validation("note must not be empty".to_string()))
        );
    }
}
