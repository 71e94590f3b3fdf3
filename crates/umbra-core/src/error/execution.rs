use super::Error;

/// Error from the underlying database connection.
#[derive(Debug)]
pub(super) struct ExecutionError {
    pub(super) inner: Box<dyn std::error::Error + Send + Sync>,
}

impl std::error::Error for ExecutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl core::fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        // Display the error and walk its source chain
        core::fmt::Display::fmt(&self.inner, f)?;
        let mut source = self.inner.source();
        while let Some(err) = source {
            write!(f, ": {}", err)?;
            source = err.source();
        }
        Ok(())
    }
}

impl Error {
    /// Creates an error from a failed statement execution.
    ///
    /// This is the way connection adapters convert their native errors
    /// (rusqlite errors and the like) into umbra errors.
    pub fn execution(err: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error::from(super::ErrorKind::Execution(ExecutionError {
            inner: Box::new(err),
        }))
    }

    /// Returns `true` if this error originated in the connection.
    pub fn is_execution(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Execution(_))
    }
}
