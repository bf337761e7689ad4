pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Invalid SVG document: {message}")]
    InvalidDocument { message: String },

    #[error("Malformed document: {message}")]
    MalformedDocument { message: String },

    #[error("Measurement failed: {message}")]
    MeasurementFailure { message: String },

    #[error("No document loaded")]
    NotLoaded,
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            message: message.into(),
        }
    }

    pub fn measurement(message: impl Into<String>) -> Self {
        Self::MeasurementFailure {
            message: message.into(),
        }
    }
}
