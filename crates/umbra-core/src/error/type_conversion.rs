use super::Error;
use crate::stmt::Value;

/// Error when a value cannot be converted to the requested type.
#[derive(Debug)]
pub(super) struct TypeConversionError {
    pub(super) variant: &'static str,
    pub(super) target: &'static str,
}

impl std::error::Error for TypeConversionError {}

impl core::fmt::Display for TypeConversionError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "cannot convert {} to {}", self.variant, self.target)
    }
}

impl Error {
    /// Creates an error describing a failed value conversion.
    pub fn type_conversion(value: &Value, target: &'static str) -> Error {
        Error::from(super::ErrorKind::TypeConversion(TypeConversionError {
            variant: value.variant_name(),
            target,
        }))
    }

    /// Returns `true` if this error is a value conversion error.
    pub fn is_type_conversion(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::TypeConversion(_))
    }
}
