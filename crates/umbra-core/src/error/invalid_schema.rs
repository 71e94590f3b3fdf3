use super::Error;

/// Error when a schema fails verification.
#[derive(Debug)]
pub(super) struct InvalidSchemaError {
    pub(super) message: String,
}

impl std::error::Error for InvalidSchemaError {}

impl core::fmt::Display for InvalidSchemaError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid schema: {}", self.message)
    }
}

impl Error {
    /// Creates an error describing a schema that failed verification.
    pub fn invalid_schema(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidSchema(InvalidSchemaError {
            message: message.into(),
        }))
    }

    /// Returns `true` if this error is a schema verification error.
    pub fn is_invalid_schema(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::InvalidSchema(_))
    }
}
