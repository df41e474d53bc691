//! Error types for the build/run/publish harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    /// A broken test environment: missing solution marker, malformed
    /// fixture project file, unexpected publish output. Never retried.
    #[error("Fixture setup error: {0}")]
    Setup(String),

    #[error("`dotnet {step}` exited with code {exit_code}:\n{output}")]
    Toolchain {
        step: String,
        exit_code: i32,
        output: String,
    },

    #[error("no new output from `dotnet {step}` within the idle timeout:\n{output}")]
    OutputTimeout { step: String, output: String },

    #[error("Assertion failed: expected `{expected}`, actual `{actual}`")]
    AssertionFailed { expected: String, actual: String },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<chromiumoxide::error::CdpError> for E2eError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        E2eError::Browser(e.to_string())
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
