use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Missing or invalid credentials / settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The spreadsheet could not be opened, read or written.
    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    /// A sheet does not carry the columns a reader needs.
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("{0}")]
    NotFound(String),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource(message.into())
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            Error::configuration("SPREADSHEET_URL is required").to_string(),
            "Configuration error: SPREADSHEET_URL is required"
        );
        assert_eq!(
            Error::NotFound("No rows found in the worksheet".to_string()).to_string(),
            "No rows found in the worksheet"
        );
    }

    #[test]
    fn test_from_url_error() {
        let err: Error = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
