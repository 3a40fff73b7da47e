//! Core data types for the Velatura Ollama gateway.
//!
//! This crate holds the wire types shared by the gateway and its tests, the
//! reasoning-markup filter, and tracing setup.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod filter;
mod observability;
mod request;

pub use filter::{MarkupFilter, Markers, THINK_CLOSE, THINK_OPEN, strip_markup};
pub use observability::init_tracing;
pub use request::{GenerateRequest, GenerateResponse, UpstreamFragment, UpstreamRequest};
