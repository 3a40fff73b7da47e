//! Gateway error types.

/// Kinds of failures a gateway request can run into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum GatewayErrorKind {
    /// Request rejected before reaching upstream
    #[display("Invalid request: {}", _0)]
    Validation(String),
    /// Upstream could not be reached or its body could not be read
    #[display("{}", _0)]
    Upstream(String),
    /// Upstream answered with a non-success status
    #[display("upstream returned status {}: {}", status, body)]
    UpstreamStatus {
        /// HTTP status code returned by upstream
        status: u16,
        /// Response body text returned by upstream
        body: String,
    },
    /// Upstream body was not the JSON we expected
    #[display("invalid upstream JSON: {}", _0)]
    Json(String),
}

impl GatewayErrorKind {
    /// Whether this failure originates upstream (as opposed to the caller).
    ///
    /// # Examples
    ///
    /// ```
    /// use velatura_error::GatewayErrorKind;
    ///
    /// assert!(GatewayErrorKind::Upstream("connection refused".into()).is_upstream());
    /// assert!(!GatewayErrorKind::Validation("prompt must not be empty".into()).is_upstream());
    /// ```
    pub fn is_upstream(&self) -> bool {
        !matches!(self, GatewayErrorKind::Validation(_))
    }
}

/// Gateway error with location tracking.
///
/// # Examples
///
/// ```
/// use velatura_error::{GatewayError, GatewayErrorKind};
///
/// let err = GatewayError::new(GatewayErrorKind::UpstreamStatus {
///     status: 404,
///     body: "model not found".to_string(),
/// });
/// assert!(format!("{}", err).contains("model not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Gateway Error: {} at line {} in {}", kind, line, file)]
pub struct GatewayError {
    kind: GatewayErrorKind,
    line: u32,
    file: &'static str,
}

impl GatewayError {
    /// Create a new gateway error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GatewayErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &GatewayErrorKind {
        &self.kind
    }
}

impl<T> From<T> for GatewayError
where
    T: Into<GatewayErrorKind>,
{
    #[track_caller]
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
