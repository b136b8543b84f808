//! Session abstractions that drive protocol workflows on top of the chunk and
//! message layers.
//!
//! A session consumes the post-handshake byte stream, reacts to control and
//! command messages with packets that must be sent to the peer in order, and
//! raises events for the things only the surrounding application can decide
//! (media payloads, unknown commands, flow control notifications).

mod server;

pub use self::server::{
    ServerSession, ServerSessionConfig, ServerSessionError, ServerSessionEvent,
    ServerSessionResult,
};
