use thiserror::Error;

/// Errors raised while decoding wire values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// The value does not have the required hex shape (or is not a string at all)
    #[error("malformed wire value: {value}")]
    MalformedWireValue { value: String },

    /// A required object field is absent
    #[error("missing field '{field}'")]
    MissingField { field: String },

    /// A field is present but has the wrong primitive type
    #[error("field '{field}' has the wrong type, expected {expected}")]
    WrongFieldType {
        field: String,
        expected: &'static str,
    },
}

impl WireError {
    pub(crate) fn malformed(value: impl Into<String>) -> Self {
        Self::MalformedWireValue {
            value: value.into(),
        }
    }
}

/// Result type for wire decoding
pub type Result<T> = std::result::Result<T, WireError>;
