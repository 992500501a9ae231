//! HTTP transport for the Goinfer API.
//!
//! The transport only knows about URLs, the bearer token and timeouts. Endpoint
//! semantics (what a 202 means, which body shape an error has) live in the client.

mod http;

pub use http::{HttpTransport, Reply, TransportConfig, TransportError};
