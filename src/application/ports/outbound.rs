//! Outbound port: sending OCHP envelopes to partner endpoints
//!
//! [`OchpTransport`] decouples the direct router from the HTTP client.
//! The transport only moves SOAP text; encoding and decoding stay in the
//! codec.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::EndpointRegistration;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Failed to send to {url}: {reason}")]
    SendFailed { url: String, reason: String },

    #[error("No response from {0} in time")]
    Timeout(String),

    #[error("Endpoint {url} answered with HTTP {status}")]
    HttpStatus { url: String, status: u16 },
}

/// Delivers one SOAP envelope and returns the peer's reply envelope.
///
/// Implementations authenticate with the registration's access token.
#[async_trait]
pub trait OchpTransport: Send + Sync {
    async fn send(
        &self,
        endpoint: &EndpointRegistration,
        envelope: String,
    ) -> Result<String, TransportError>;
}
