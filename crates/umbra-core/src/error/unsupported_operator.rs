use super::Error;

/// Error when an operator is applied to a column that cannot support it.
#[derive(Debug)]
pub(super) struct UnsupportedOperatorError {
    pub(super) operator: &'static str,
    pub(super) column: String,
}

impl std::error::Error for UnsupportedOperatorError {}

impl core::fmt::Display for UnsupportedOperatorError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "operator `{}` is not supported for `{}`",
            self.operator, self.column
        )
    }
}

impl Error {
    /// Creates an error for an operator/column kind mismatch.
    pub fn unsupported_operator(operator: &'static str, column: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::UnsupportedOperator(
            UnsupportedOperatorError {
                operator,
                column: column.into(),
            },
        ))
    }

    /// Returns `true` if this error is an operator/column kind mismatch.
    pub fn is_unsupported_operator(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::UnsupportedOperator(_))
    }
}
