//! Error types for the Velatura gateway.
//!
//! Every error records the file and line where it was created. Crate-local
//! errors fold into [`VelaturaError`] at the binary boundary.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod gateway;
mod server;

pub use config::ConfigError;
pub use gateway::{GatewayError, GatewayErrorKind, GatewayResult};
pub use server::{ServerError, ServerErrorKind};

/// Crate-level error variants.
#[derive(Debug, derive_more::From)]
pub enum VelaturaErrorKind {
    /// Configuration error
    Config(ConfigError),
    /// Gateway request error
    Gateway(GatewayError),
    /// Inference server supervision error
    Server(ServerError),
}

impl std::fmt::Display for VelaturaErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VelaturaErrorKind::Config(e) => write!(f, "{}", e),
            VelaturaErrorKind::Gateway(e) => write!(f, "{}", e),
            VelaturaErrorKind::Server(e) => write!(f, "{}", e),
        }
    }
}

/// Velatura error with kind discrimination.
#[derive(Debug)]
pub struct VelaturaError(Box<VelaturaErrorKind>);

impl VelaturaError {
    /// Create a new error from a kind.
    pub fn new(kind: VelaturaErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &VelaturaErrorKind {
        &self.0
    }
}

impl std::fmt::Display for VelaturaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Velatura Error: {}", self.0)
    }
}

impl std::error::Error for VelaturaError {}

impl<T> From<T> for VelaturaError
where
    T: Into<VelaturaErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Velatura operations.
pub type VelaturaResult<T> = std::result::Result<T, VelaturaError>;
