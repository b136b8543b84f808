//! Implements the RTMP handshake, including the undocumented digest validating
//! variant that Flash era clients require and the RC4 encrypted variant
//! negotiated with version byte 6.
//!
//! The exchange is C0/C1 from the client, S0/S1/S2 from the server, then C2
//! from the client (which the server reads and discards).  Each 1536 byte
//! block hides a 32 byte HMAC-SHA256 digest and a 128 byte Diffie-Hellman
//! public key at offsets derived from the block's own contents.  The offset
//! scheme is never announced: the server validates the client digest under
//! scheme 0 first, then scheme 1, and mirrors whichever matched.

mod crypto;
mod errors;

pub use self::crypto::Rc4Keystream;
pub use self::crypto::ValidationScheme;
pub use self::errors::HandshakeError;

use self::crypto::{
    compute_digest, derive_keystreams, detect_scheme, dh_offset, digest_offset, hmac_sha256,
    DhKeyExchange, BLOCK_SIZE, DH_KEY_SIZE, DIGEST_SIZE, FMS_DIGEST_KEY_LENGTH,
    FP_DIGEST_KEY_LENGTH, GENUINE_FMS_KEY, GENUINE_FP_KEY,
};
use rand::RngCore;
use std::mem;

/// Version byte requesting a plaintext session
pub const RTMP_VERSION_PLAIN: u8 = 3;

/// Version byte requesting RC4 encrypted chunk traffic
pub const RTMP_VERSION_ENCRYPTED: u8 = 6;

/// Which end of the handshake this instance is performing.
#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub enum PeerType {
    Server,
    Client,
}

#[derive(Eq, PartialEq, Debug, Clone)]
enum Stage {
    WaitingForVersion,
    WaitingForFirstBlock,
    WaitingForSecondBlock,
    Complete,
}

/// The traffic ciphers negotiated by a completed handshake.  Both directions
/// are `None` for a plaintext session.
pub struct SessionCrypto {
    pub incoming: Option<Rc4Keystream>,
    pub outgoing: Option<Rc4Keystream>,
}

impl SessionCrypto {
    pub fn plaintext() -> SessionCrypto {
        SessionCrypto {
            incoming: None,
            outgoing: None,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.incoming.is_some()
    }
}

/// The outcome of feeding bytes into the handshake.
pub enum HandshakeProcessResult {
    /// More bytes are required; anything in `response_bytes` must be sent to
    /// the peer before reading further
    InProgress { response_bytes: Vec<u8> },

    /// The handshake finished.  `remaining_bytes` is any chunk traffic that
    /// arrived bundled behind the final handshake block
    Completed {
        response_bytes: Vec<u8>,
        remaining_bytes: Vec<u8>,
        crypto: SessionCrypto,
    },
}

/// A single connection's handshake state machine.
///
/// The handshake owns no socket.  Callers read from their connection and push
/// the bytes through [`process_bytes`](Handshake::process_bytes) until a
/// `Completed` result comes back; short reads are fine at any point.
pub struct Handshake {
    peer_type: PeerType,
    current_stage: Stage,
    buffer: Vec<u8>,
    peer_version: u8,
    detected_scheme: Option<ValidationScheme>,
    crypto: Option<SessionCrypto>,
}

impl Handshake {
    pub fn new(peer_type: PeerType) -> Handshake {
        Handshake {
            peer_type,
            current_stage: Stage::WaitingForVersion,
            buffer: Vec::new(),
            peer_version: RTMP_VERSION_PLAIN,
            detected_scheme: None,
            crypto: None,
        }
    }

    /// Which digest offset scheme the peer's block validated under, known
    /// once the first block has been processed.
    pub fn validation_scheme(&self) -> Option<ValidationScheme> {
        self.detected_scheme
    }

    /// Creates the C0 and C1 bytes a client sends to open the exchange.  Only
    /// meaningful for `PeerType::Client`; servers speak strictly second.
    pub fn generate_outbound_p0_and_p1(&mut self) -> Result<Vec<u8>, HandshakeError> {
        let mut block = [0_u8; BLOCK_SIZE];
        block[4..8].copy_from_slice(&[9, 0, 124, 2]); // nonzero version marker
        rand::thread_rng().fill_bytes(&mut block[8..]);

        // Clients always embed under scheme 0
        let exchange = DhKeyExchange::new();
        let dh_position = dh_offset(&block, ValidationScheme::Scheme0);
        block[dh_position..dh_position + DH_KEY_SIZE].copy_from_slice(exchange.public_key());

        let digest_position = digest_offset(&block, ValidationScheme::Scheme0);
        let digest = compute_digest(
            &block,
            digest_position,
            &GENUINE_FP_KEY[..FP_DIGEST_KEY_LENGTH],
        );
        block[digest_position..digest_position + DIGEST_SIZE].copy_from_slice(&digest);

        let mut response = Vec::with_capacity(1 + BLOCK_SIZE);
        response.push(RTMP_VERSION_PLAIN);
        response.extend_from_slice(&block);
        Ok(response)
    }

    /// Consumes bytes read off the connection, producing response bytes and
    /// eventually the completed session crypto.
    pub fn process_bytes(&mut self, data: &[u8]) -> Result<HandshakeProcessResult, HandshakeError> {
        self.buffer.extend_from_slice(data);

        if self.current_stage == Stage::Complete {
            return Ok(HandshakeProcessResult::InProgress {
                response_bytes: Vec::new(),
            });
        }

        let mut response_bytes = Vec::new();
        loop {
            let buffered_before = self.buffer.len();
            match self.current_stage {
                Stage::WaitingForVersion => self.process_version()?,
                Stage::WaitingForFirstBlock => self.process_first_block(&mut response_bytes)?,
                Stage::WaitingForSecondBlock => self.process_second_block(),
                Stage::Complete => {}
            }

            if self.current_stage == Stage::Complete {
                let remaining_bytes = mem::take(&mut self.buffer);
                let crypto = self
                    .crypto
                    .take()
                    .unwrap_or_else(SessionCrypto::plaintext);

                return Ok(HandshakeProcessResult::Completed {
                    response_bytes,
                    remaining_bytes,
                    crypto,
                });
            }

            if self.buffer.len() == buffered_before {
                return Ok(HandshakeProcessResult::InProgress { response_bytes });
            }
        }
    }

    fn process_version(&mut self) -> Result<(), HandshakeError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let version = self.buffer.remove(0);
        match (self.peer_type, version) {
            (PeerType::Server, RTMP_VERSION_PLAIN) | (PeerType::Server, RTMP_VERSION_ENCRYPTED) => {
            }
            // The server echoes the version we requested
            (PeerType::Client, RTMP_VERSION_PLAIN) => {}
            _ => return Err(HandshakeError::BadVersionId { version }),
        }

        self.peer_version = version;
        self.current_stage = Stage::WaitingForFirstBlock;
        Ok(())
    }

    fn process_first_block(&mut self, response: &mut Vec<u8>) -> Result<(), HandshakeError> {
        match self.peer_type {
            PeerType::Server => self.process_client_block(response),
            PeerType::Client => self.process_server_blocks(response),
        }
    }

    /// Server side: validate C1, reply with S0 + S1 + S2 in one write.
    fn process_client_block(&mut self, response: &mut Vec<u8>) -> Result<(), HandshakeError> {
        if self.buffer.len() < BLOCK_SIZE {
            return Ok(());
        }

        let client_block: Vec<u8> = self.buffer.drain(..BLOCK_SIZE).collect();
        let scheme = detect_scheme(&client_block, &GENUINE_FP_KEY[..FP_DIGEST_KEY_LENGTH])
            .ok_or(HandshakeError::DigestMismatch)?;
        self.detected_scheme = Some(scheme);
        log::debug!("Client handshake digest validated under {:?}", scheme);

        // S1 and S2 are built as one 3072 byte buffer: time zero, the server
        // version marker, then random data
        let mut server_block = [0_u8; BLOCK_SIZE * 2];
        server_block[4..8].copy_from_slice(&[1, 2, 3, 4]);
        rand::thread_rng().fill_bytes(&mut server_block[8..]);

        let exchange = DhKeyExchange::new();
        let server_dh_position = dh_offset(&server_block[..BLOCK_SIZE], scheme);
        server_block[server_dh_position..server_dh_position + DH_KEY_SIZE]
            .copy_from_slice(exchange.public_key());

        if self.peer_version == RTMP_VERSION_ENCRYPTED {
            let client_dh_position = dh_offset(&client_block, scheme);
            let peer_public = &client_block[client_dh_position..client_dh_position + DH_KEY_SIZE];
            let secret = exchange.shared_secret(peer_public)?;
            let (incoming, outgoing) =
                derive_keystreams(&secret, peer_public, exchange.public_key());

            self.crypto = Some(SessionCrypto {
                incoming: Some(incoming),
                outgoing: Some(outgoing),
            });
        }

        // Sign S1 after the public key is in place, the digest covers it
        let digest_position = digest_offset(&server_block[..BLOCK_SIZE], scheme);
        let digest = compute_digest(
            &server_block[..BLOCK_SIZE],
            digest_position,
            &GENUINE_FMS_KEY[..FMS_DIGEST_KEY_LENGTH],
        );
        server_block[digest_position..digest_position + DIGEST_SIZE].copy_from_slice(&digest);

        // S2's trailing 32 bytes bind it to the client's digest: an
        // intermediate hash of the client digest keyed by the full FMS
        // constant, then a hash of the rest of S2 keyed by that
        let client_digest_position = digest_offset(&client_block, scheme);
        let challenge_key = hmac_sha256(
            &GENUINE_FMS_KEY,
            &client_block[client_digest_position..client_digest_position + DIGEST_SIZE],
        );
        let signature = hmac_sha256(
            &challenge_key,
            &server_block[BLOCK_SIZE..BLOCK_SIZE * 2 - DIGEST_SIZE],
        );
        server_block[BLOCK_SIZE * 2 - DIGEST_SIZE..].copy_from_slice(&signature);

        response.push(self.peer_version);
        response.extend_from_slice(&server_block);
        self.current_stage = Stage::WaitingForSecondBlock;
        Ok(())
    }

    /// Client side: S1 and S2 arrive together; reply with C2 and finish.
    fn process_server_blocks(&mut self, response: &mut Vec<u8>) -> Result<(), HandshakeError> {
        if self.buffer.len() < BLOCK_SIZE * 2 {
            return Ok(());
        }

        let blocks: Vec<u8> = self.buffer.drain(..BLOCK_SIZE * 2).collect();

        // The server never inspects C2 beyond its length, echo S1 back
        response.extend_from_slice(&blocks[..BLOCK_SIZE]);
        self.current_stage = Stage::Complete;
        Ok(())
    }

    /// Server side: read and discard C2.
    fn process_second_block(&mut self) {
        if self.buffer.len() < BLOCK_SIZE {
            return;
        }

        let _ = self.buffer.drain(..BLOCK_SIZE);
        self.current_stage = Stage::Complete;
    }
}
