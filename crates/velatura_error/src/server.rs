//! Errors raised while supervising the local inference server.

/// Inference server supervision failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ServerErrorKind {
    /// The server binary could not be spawned
    #[display("Failed to spawn server: {}", _0)]
    Spawn(String),
    /// The server did not become ready in time
    #[display("Server not ready: {}", _0)]
    NotReady(String),
    /// A helper command (list, pull) failed
    #[display("Command failed: {}", _0)]
    Command(String),
    /// Invalid supervisor configuration
    #[display("Configuration error: {}", _0)]
    Configuration(String),
    /// I/O failure while talking to the child process
    #[display("I/O error: {}", _0)]
    Io(String),
}

/// Inference server error with location tracking.
///
/// # Examples
///
/// ```
/// use velatura_error::{ServerError, ServerErrorKind};
///
/// let err = ServerError::new(ServerErrorKind::Spawn("ollama: not found".to_string()));
/// assert!(format!("{}", err).contains("not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Server Error: {} at line {} in {}", kind, line, file)]
pub struct ServerError {
    /// The kind of error that occurred
    pub kind: ServerErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ServerError {
    /// Create a new server error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ServerErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

impl From<std::io::Error> for ServerError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::new(ServerErrorKind::Io(err.to_string()))
    }
}
