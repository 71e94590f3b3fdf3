use super::Error;

/// Error when a query descriptor cannot be turned into SQL.
#[derive(Debug)]
pub(super) struct QueryCompileError {
    pub(super) message: String,
}

impl std::error::Error for QueryCompileError {}

impl core::fmt::Display for QueryCompileError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "cannot compile query: {}", self.message)
    }
}

impl Error {
    /// Creates an error describing a query that failed to compile.
    pub fn query_compile(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::QueryCompile(QueryCompileError {
            message: message.into(),
        }))
    }

    /// Returns `true` if this error is a query compilation error.
    pub fn is_query_compile(&self) -> bool {
        matches!(
            self.kind(),
            super::ErrorKind::QueryCompile(_) | super::ErrorKind::UnsupportedOperator(_)
        )
    }
}
