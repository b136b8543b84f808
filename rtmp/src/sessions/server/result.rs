use super::events::ServerSessionEvent;
use crate::chunk_io::Packet;
use crate::messages::MessagePayload;

/// A single result produced while a server session processes input bytes.
#[derive(Debug, PartialEq)]
pub enum ServerSessionResult {
    /// A packet to be sent to the peer, always in the order it was produced.
    /// Skipping or reordering packets will corrupt the peer's chunk header
    /// state.
    OutboundResponse(Packet),

    /// An event for the application to act on
    RaisedEvent(ServerSessionEvent),

    /// A message the session recognizes but does not interpret, surfaced for
    /// logging or custom handling
    UnhandleableMessageReceived(MessagePayload),
}
