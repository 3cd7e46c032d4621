//! HTTP transport for the Messages API.

pub mod http;

pub use http::{HttpTransport, TransportError};
