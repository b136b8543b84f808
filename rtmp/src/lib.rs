//! Protocol engine for the RTMP chunk stream format.
//!
//! The crate is layered the way the protocol is: the [`handshake`] module runs
//! the one-time byte exchange (including the digest validating variant and the
//! RC4 encrypted variant), [`chunk_io`] multiplexes logical messages over the
//! single byte stream, [`messages`] encodes and decodes the individual message
//! payloads, and [`sessions`] drives the server side command workflow on top of
//! all three.
//!
//! Everything here is sans-IO: bytes come in as slices, responses come out as
//! byte vectors, and the caller owns the socket.

#[cfg(test)]
#[macro_use]
mod test_utils;

pub mod chunk_io;
pub mod handshake;
pub mod messages;
pub mod sessions;
pub mod time;
