use std::io;
use thiserror::Error;

/// Errors raised while performing an RTMP handshake.  All of them are fatal to
/// the connection; the only fallback the protocol allows is retrying digest
/// validation with the second offset scheme, and that happens internally.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The first byte of the handshake was not a known protocol version
    #[error("Peer requested unsupported handshake version {version}")]
    BadVersionId { version: u8 },

    /// The peer's 1536 byte block did not carry a valid HMAC-SHA256 digest
    /// under either offset scheme
    #[error("Peer handshake digest did not validate under either scheme")]
    DigestMismatch,

    /// The Diffie-Hellman public key embedded in the peer's block was not a
    /// valid group element
    #[error("Peer sent a malformed Diffie-Hellman public key")]
    InvalidDhPublicKey,

    #[error("{0}")]
    Io(#[from] io::Error),
}
