//! Error taxonomy shared by the prompt pipeline and the provider gateway.

/// Failures raised by the comic pipeline.
///
/// Each variant carries a human-readable message that is handed back to the
/// caller verbatim. The HTTP layer decides the status code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComicError {
    /// Missing or invalid credential, or an out-of-range parameter.
    #[error("{0}")]
    Config(String),
    /// Transport failure, non-2xx status or empty envelope from a model provider.
    #[error("{0}")]
    Provider(String),
    /// JSON could not be extracted or parsed from model text.
    #[error("JSON parsing failed: {0}")]
    MalformedResponse(String),
    /// Structural schema mismatch; carries the first violation only.
    #[error("{0}")]
    Validation(String),
    /// The provider answered but produced nothing usable.
    #[error("{0}")]
    EmptyResult(String),
}

impl ComicError {
    /// Prefixes the message with the failing operation, keeping the variant.
    pub fn context(self, operation: &str) -> Self {
        match self {
            ComicError::Config(message) => ComicError::Config(format!("{operation}: {message}")),
            ComicError::Provider(message) => {
                ComicError::Provider(format!("{operation}: {message}"))
            }
            ComicError::MalformedResponse(message) => {
                ComicError::MalformedResponse(format!("{operation}: {message}"))
            }
            ComicError::Validation(message) => {
                ComicError::Validation(format!("{operation}: {message}"))
            }
            ComicError::EmptyResult(message) => {
                ComicError::EmptyResult(format!("{operation}: {message}"))
            }
        }
    }
}

impl From<serde_json::Error> for ComicError {
    fn from(err: serde_json::Error) -> Self {
        ComicError::MalformedResponse(err.to_string())
    }
}

pub type ComicResult<T> = Result<T, ComicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_the_variant() {
        let err = ComicError::Provider("status 502".to_string()).context("Title generation failed");
        assert_eq!(
            err,
            ComicError::Provider("Title generation failed: status 502".to_string())
        );
    }

    #[test]
    fn parser_errors_become_malformed_responses() {
        let err: ComicError = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        assert!(matches!(err, ComicError::MalformedResponse(_)));
        assert!(err.to_string().starts_with("JSON parsing failed: "));
    }
}
