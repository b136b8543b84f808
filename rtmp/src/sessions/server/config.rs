/// The configuration options that govern how a server session behaves.
#[derive(Clone)]
pub struct ServerSessionConfig {
    /// Server version string advertised in the `connect` reply
    pub fms_version: String,

    /// Outbound chunk size adopted once a client starts playback
    pub playback_chunk_size: u32,

    /// Window size sent to the peer in the `SetPeerBandwidth` reply
    pub peer_bandwidth: u32,

    /// How many received bytes we allow before expecting to acknowledge them,
    /// announced via `WindowAckSize` on connect
    pub window_ack_size: u32,
}

impl ServerSessionConfig {
    pub fn new() -> ServerSessionConfig {
        ServerSessionConfig {
            fms_version: "FMS/3,0,1,123".to_string(),
            playback_chunk_size: 1_048_576,
            peer_bandwidth: 2_500_000,
            window_ack_size: 2_500_000,
        }
    }
}
