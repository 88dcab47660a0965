//! Error types for the RFB client.

use std::io;
use thiserror::Error;

/// Errors that can end an RFB session.
///
/// Decoder and protocol errors are fatal: once a handler has consumed the
/// wrong bytes the stream cannot be resynchronized. Only transport errors
/// are retryable, and only for connections that were fully established.
#[derive(Debug, Error)]
pub enum RfbError {
    /// Transport-level error (connect, read, write) or connection loss.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// No supported protocol version overlaps with the server's.
    #[error("unsupported protocol version {0}")]
    ProtocolVersion(String),

    /// The server refused the connection during the security handshake.
    #[error("connection refused by server: {0}")]
    ConnectionRefused(String),

    /// The server offered only security types we do not implement.
    #[error("no supported security type offered (server offered {0:?})")]
    UnsupportedSecurity(Vec<u8>),

    /// The server named a security type outside the protocol.
    #[error("unknown security type {0}")]
    UnknownSecurityType(u32),

    /// Authentication failed; retrying needs new credentials.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The server is refusing further authentication attempts.
    #[error("too many authentication attempts")]
    AuthTooManyTries,

    /// A message violated the wire format.
    #[error("malformed {context}: {detail}")]
    MalformedMessage {
        context: &'static str,
        detail: String,
    },

    /// An encoding decoder failed; the byte stream is unsynchronized.
    #[error("decode error: {0:#}")]
    Decode(#[from] anyhow::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RfbError {
    /// Whether a reconnect can reasonably be attempted after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_split() {
        assert!(RfbError::Transport(io::Error::from(io::ErrorKind::ConnectionReset))
            .is_retryable());

        assert!(!RfbError::AuthFailed("bad password".into()).is_retryable());
        assert!(!RfbError::AuthTooManyTries.is_retryable());
        assert!(!RfbError::ProtocolVersion("2.0".into()).is_retryable());
        assert!(!RfbError::Decode(anyhow::anyhow!("bad tile")).is_retryable());
    }

    #[test]
    fn test_display_includes_reason() {
        let err = RfbError::AuthFailed("wrong password".into());
        assert_eq!(err.to_string(), "authentication failed: wrong password");
    }
}
