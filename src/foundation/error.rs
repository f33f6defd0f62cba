/// Convenience result type used across the exporter.
pub type ExportResult<T> = Result<T, ExportError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    /// Codec, stream or muxer allocation failed, or the container header could not be written.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A pixel conversion context could not be built for a (format, size) pair.
    #[error("conversion context error: {0}")]
    ConversionContext(String),

    /// Frame submission, packet retrieval, packet write or finalization failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Command-line arguments did not match any accepted form.
    #[error("usage error: {0}")]
    Usage(String),

    /// Invalid user-provided values (buffer geometry, rates, crop rectangles).
    #[error("validation error: {0}")]
    Validation(String),

    /// Frame indices supplied out of their non-decreasing order.
    #[error("sequence error: {0}")]
    Sequence(String),

    /// Lifecycle call made in the wrong state.
    #[error("state error: {0}")]
    State(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExportError {
    /// Build an [`ExportError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build an [`ExportError::ConversionContext`] value.
    pub fn conversion_context(msg: impl Into<String>) -> Self {
        Self::ConversionContext(msg.into())
    }

    /// Build an [`ExportError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build an [`ExportError::Usage`] value.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Build an [`ExportError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build an [`ExportError::Sequence`] value.
    pub fn sequence(msg: impl Into<String>) -> Self {
        Self::Sequence(msg.into())
    }

    /// Build an [`ExportError::State`] value.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Return `true` for errors caused by how the program was invoked.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
