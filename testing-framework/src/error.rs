// File: testing-framework/src/error.rs
//
// Error taxonomy shared by the environment, the clients and the registry.

use lk_common::{api::ApiError, CryptoError};
use thiserror::Error;

/// Errors raised by the framework
///
/// Every failure of an external call is reported through one of these
/// variants. Only the [`crate::registry::TestRegistry`] turns them into a
/// failed test result.
#[derive(Error, Debug)]
pub enum TestError {
    /// Malformed input, missing file or unparsable output
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// A blocking external call exceeded its deadline
    #[error("timeout: {0}")]
    TimeOut(String),

    /// Nonzero process exit or a malformed response
    #[error("bad result: {0}")]
    BadResult(String),

    /// An assertion inside a test body failed
    #[error("check failed: {0}")]
    CheckFailed(String),

    /// An internal invariant was violated
    #[error("logic error: {0}")]
    Logic(String),

    /// Filesystem or process I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Key, address or signature failure
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Result type used across the framework
pub type Result<T> = std::result::Result<T, TestError>;

impl From<ApiError> for TestError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Crypto(e) => TestError::InvalidArguments(e.to_string()),
            ApiError::InvalidField { .. } => TestError::InvalidArguments(err.to_string()),
            ApiError::Status { .. } | ApiError::MissingResult(_) => {
                TestError::BadResult(err.to_string())
            }
        }
    }
}

impl From<regex::Error> for TestError {
    fn from(err: regex::Error) -> Self {
        TestError::InvalidArguments(format!("invalid pattern: {}", err))
    }
}

impl TestError {
    /// Short name of the variant, printed next to failed tests
    pub fn kind(&self) -> &'static str {
        match self {
            TestError::InvalidArguments(_) => "InvalidArguments",
            TestError::TimeOut(_) => "TimeOut",
            TestError::BadResult(_) => "BadResult",
            TestError::CheckFailed(_) => "CheckFailed",
            TestError::Logic(_) => "Logic",
            TestError::Io(_) => "Io",
            TestError::Json(_) => "Json",
            TestError::Crypto(_) => "Crypto",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_errors_map_to_taxonomy() {
        let status: TestError = ApiError::Status {
            status: "error".into(),
            message: "no such account".into(),
        }
        .into();
        assert!(matches!(status, TestError::BadResult(ref m) if m.contains("no such account")));

        let field: TestError = ApiError::InvalidField {
            field: "status_code",
            value: "42".into(),
        }
        .into();
        assert_eq!(field.kind(), "InvalidArguments");
    }

    #[test]
    fn test_regex_error_is_invalid_arguments() {
        let err: TestError = regex::Regex::new("(").unwrap_err().into();
        assert!(matches!(err, TestError::InvalidArguments(_)));
    }
}
