//! Component-layer error types.

/// Errors that can occur when converting between typed values and
/// [`Component`](crate::Component) records.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// The value did not serialise to a record of named fields.
    #[error("component must serialise to an object, got {0}")]
    NotAnObject(&'static str),

    /// Serialising or deserialising the record failed.
    #[error("component conversion failed: {0}")]
    Serde(#[from] serde_json::Error),
}
