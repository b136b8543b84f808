//! Cryptographic primitives for the validating ("digest") RTMP handshake: the
//! well known Adobe HMAC constants, the scheme dependent offset arithmetic,
//! the 1024 bit Diffie-Hellman exchange and the RC4 keystream derivation used
//! by the encrypted handshake variant.

use super::errors::HandshakeError;
use hmac::{Hmac, Mac};
use num_bigint::BigUint;
use rand::RngCore;
use rc4::consts::U16;
use rc4::{KeyInit, Rc4, StreamCipher};
use sha2::Sha256;

pub const BLOCK_SIZE: usize = 1536;
pub const DIGEST_SIZE: usize = 32;
pub const DH_KEY_SIZE: usize = 128;

/// "Genuine Adobe Flash Media Server 001" followed by 32 fixed bytes.  Servers
/// sign their own block with the first 36 bytes and key the S2 response with
/// the whole constant.
pub const GENUINE_FMS_KEY: [u8; 68] = [
    0x47, 0x65, 0x6e, 0x75, 0x69, 0x6e, 0x65, 0x20, 0x41, 0x64, 0x6f, 0x62, 0x65, 0x20, 0x46,
    0x6c, 0x61, 0x73, 0x68, 0x20, 0x4d, 0x65, 0x64, 0x69, 0x61, 0x20, 0x53, 0x65, 0x72, 0x76,
    0x65, 0x72, 0x20, 0x30, 0x30, 0x31, 0xf0, 0xee, 0xc2, 0x4a, 0x80, 0x68, 0xbe, 0xe8, 0x2e,
    0x00, 0xd0, 0xd1, 0x02, 0x9e, 0x7e, 0x57, 0x6e, 0xec, 0x5d, 0x2d, 0x29, 0x80, 0x6f, 0xab,
    0x93, 0xb8, 0xe6, 0x36, 0xcf, 0xeb, 0x31, 0xae,
];

/// "Genuine Adobe Flash Player 001" followed by the same 32 fixed bytes.
/// Clients sign their block with the first 30 bytes.
pub const GENUINE_FP_KEY: [u8; 62] = [
    0x47, 0x65, 0x6e, 0x75, 0x69, 0x6e, 0x65, 0x20, 0x41, 0x64, 0x6f, 0x62, 0x65, 0x20, 0x46,
    0x6c, 0x61, 0x73, 0x68, 0x20, 0x50, 0x6c, 0x61, 0x79, 0x65, 0x72, 0x20, 0x30, 0x30, 0x31,
    0xf0, 0xee, 0xc2, 0x4a, 0x80, 0x68, 0xbe, 0xe8, 0x2e, 0x00, 0xd0, 0xd1, 0x02, 0x9e, 0x7e,
    0x57, 0x6e, 0xec, 0x5d, 0x2d, 0x29, 0x80, 0x6f, 0xab, 0x93, 0xb8, 0xe6, 0x36, 0xcf, 0xeb,
    0x31, 0xae,
];

pub const FMS_DIGEST_KEY_LENGTH: usize = 36;
pub const FP_DIGEST_KEY_LENGTH: usize = 30;

/// The fixed 1024 bit prime (RFC 2409 second Oakley group) used with
/// generator 2 for the encrypted handshake key agreement.
const DH_PRIME_1024: [u8; 128] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xc9, 0x0f, 0xda, 0xa2, 0x21, 0x68, 0xc2,
    0x34, 0xc4, 0xc6, 0x62, 0x8b, 0x80, 0xdc, 0x1c, 0xd1, 0x29, 0x02, 0x4e, 0x08, 0x8a, 0x67,
    0xcc, 0x74, 0x02, 0x0b, 0xbe, 0xa6, 0x3b, 0x13, 0x9b, 0x22, 0x51, 0x4a, 0x08, 0x79, 0x8e,
    0x34, 0x04, 0xdd, 0xef, 0x95, 0x19, 0xb3, 0xcd, 0x3a, 0x43, 0x1b, 0x30, 0x2b, 0x0a, 0x6d,
    0xf2, 0x5f, 0x14, 0x37, 0x4f, 0xe1, 0x35, 0x6d, 0x6d, 0x51, 0xc2, 0x45, 0xe4, 0x85, 0xb5,
    0x76, 0x62, 0x5e, 0x7e, 0xc6, 0xf4, 0x4c, 0x42, 0xe9, 0xa6, 0x37, 0xed, 0x6b, 0x0b, 0xff,
    0x5c, 0xb6, 0xf4, 0x06, 0xb7, 0xed, 0xee, 0x38, 0x6b, 0xfb, 0x5a, 0x89, 0x9f, 0xa5, 0xae,
    0x9f, 0x24, 0x11, 0x7c, 0x4b, 0x1f, 0xe6, 0x49, 0x28, 0x66, 0x51, 0xec, 0xe6, 0x53, 0x81,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
];

/// Which of the two undocumented offset schemes a peer used for its digest and
/// public key placement.  The scheme is never announced, it can only be
/// detected by validating the digest under each in turn.
#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub enum ValidationScheme {
    Scheme0,
    Scheme1,
}

pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    // Hmac accepts keys of any length, so this cannot actually fail
    let mut mac =
        <Hmac<Sha256> as Mac>::new_from_slice(key).expect("hmac accepts keys of any length");
    mac.update(data);

    let mut output = [0_u8; 32];
    output.copy_from_slice(&mac.finalize().into_bytes());
    output
}

/// Where the 32 byte digest lives inside a 1536 byte handshake block.
pub fn digest_offset(block: &[u8], scheme: ValidationScheme) -> usize {
    let (base, fixed) = match scheme {
        ValidationScheme::Scheme0 => (8, 12),
        ValidationScheme::Scheme1 => (772, 776),
    };

    let sum = block[base] as usize
        + block[base + 1] as usize
        + block[base + 2] as usize
        + block[base + 3] as usize;

    (sum % 728) + fixed
}

/// Where the 128 byte Diffie-Hellman public key lives inside a block.
pub fn dh_offset(block: &[u8], scheme: ValidationScheme) -> usize {
    let (base, fixed) = match scheme {
        ValidationScheme::Scheme0 => (1532, 772),
        ValidationScheme::Scheme1 => (768, 8),
    };

    let sum = block[base] as usize
        + block[base + 1] as usize
        + block[base + 2] as usize
        + block[base + 3] as usize;

    (sum % 632) + fixed
}

/// Computes the digest of a block with its own 32 digest bytes excised.
pub fn compute_digest(block: &[u8], offset: usize, key: &[u8]) -> [u8; 32] {
    let mut excised = Vec::with_capacity(BLOCK_SIZE - DIGEST_SIZE);
    excised.extend_from_slice(&block[..offset]);
    excised.extend_from_slice(&block[offset + DIGEST_SIZE..]);

    hmac_sha256(key, &excised)
}

/// Checks whether a peer's block carries a valid digest under the given scheme.
pub fn validate_digest(block: &[u8], scheme: ValidationScheme, key: &[u8]) -> bool {
    let offset = digest_offset(block, scheme);
    let expected = compute_digest(block, offset, key);

    block[offset..offset + DIGEST_SIZE] == expected
}

/// Tries scheme 0 first, then scheme 1, returning whichever validates.
pub fn detect_scheme(block: &[u8], key: &[u8]) -> Option<ValidationScheme> {
    if validate_digest(block, ValidationScheme::Scheme0, key) {
        return Some(ValidationScheme::Scheme0);
    }

    if validate_digest(block, ValidationScheme::Scheme1, key) {
        return Some(ValidationScheme::Scheme1);
    }

    None
}

/// One side of the fixed-prime generator-2 Diffie-Hellman exchange.
pub struct DhKeyExchange {
    private_key: BigUint,
    public_key: [u8; DH_KEY_SIZE],
}

impl DhKeyExchange {
    pub fn new() -> DhKeyExchange {
        let prime = BigUint::from_bytes_be(&DH_PRIME_1024);

        let mut exponent_bytes = [0_u8; DH_KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut exponent_bytes);
        exponent_bytes[DH_KEY_SIZE - 1] |= 1; // keep the exponent nonzero

        let private_key = BigUint::from_bytes_be(&exponent_bytes) % &prime;
        let public_key = BigUint::from(2_u32).modpow(&private_key, &prime);

        DhKeyExchange {
            private_key,
            public_key: to_fixed_key(&public_key),
        }
    }

    pub fn public_key(&self) -> &[u8; DH_KEY_SIZE] {
        &self.public_key
    }

    /// Computes the 128 byte shared secret from the peer's public key.
    pub fn shared_secret(&self, peer_public: &[u8]) -> Result<[u8; DH_KEY_SIZE], HandshakeError> {
        let prime = BigUint::from_bytes_be(&DH_PRIME_1024);
        let peer = BigUint::from_bytes_be(peer_public);

        if peer <= BigUint::from(1_u32) || peer >= prime {
            return Err(HandshakeError::InvalidDhPublicKey);
        }

        let secret = peer.modpow(&self.private_key, &prime);
        Ok(to_fixed_key(&secret))
    }
}

fn to_fixed_key(value: &BigUint) -> [u8; DH_KEY_SIZE] {
    // Left pad to the group size, big endian
    let bytes = value.to_bytes_be();
    let mut fixed = [0_u8; DH_KEY_SIZE];
    fixed[DH_KEY_SIZE - bytes.len()..].copy_from_slice(&bytes);
    fixed
}

/// One direction of negotiated RC4 traffic encryption.
pub struct Rc4Keystream {
    cipher: Rc4<U16>,
}

impl Rc4Keystream {
    fn new(key: &[u8; 16]) -> Rc4Keystream {
        let mut cipher: Rc4<U16> = Rc4::new(key.into());

        // Both sides burn the first 1536 bytes of keystream before any
        // chunk traffic flows
        let mut burn = [0_u8; BLOCK_SIZE];
        cipher.apply_keystream(&mut burn);

        Rc4Keystream { cipher }
    }

    /// Encrypts or decrypts bytes in place, advancing the keystream.
    pub fn apply(&mut self, data: &mut [u8]) {
        self.cipher.apply_keystream(data);
    }
}

/// Derives the two RC4 keystreams from the shared secret and both public keys.
///
/// The outgoing key is the HMAC of the *peer's* public key, the incoming key
/// the HMAC of our own, so the two sides of a connection derive mirrored pairs.
pub fn derive_keystreams(
    shared_secret: &[u8; DH_KEY_SIZE],
    peer_public: &[u8],
    own_public: &[u8],
) -> (Rc4Keystream, Rc4Keystream) {
    let outgoing_digest = hmac_sha256(shared_secret, peer_public);
    let incoming_digest = hmac_sha256(shared_secret, own_public);

    let mut outgoing_key = [0_u8; 16];
    outgoing_key.copy_from_slice(&outgoing_digest[..16]);
    let mut incoming_key = [0_u8; 16];
    incoming_key.copy_from_slice(&incoming_digest[..16]);

    (
        Rc4Keystream::new(&incoming_key),
        Rc4Keystream::new(&outgoing_key),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_offset_stays_within_block_for_both_schemes() {
        let mut block = [0xff_u8; BLOCK_SIZE];
        assert!(digest_offset(&block, ValidationScheme::Scheme0) + DIGEST_SIZE <= BLOCK_SIZE);
        assert!(digest_offset(&block, ValidationScheme::Scheme1) + DIGEST_SIZE <= BLOCK_SIZE);

        block = [0_u8; BLOCK_SIZE];
        assert_eq!(digest_offset(&block, ValidationScheme::Scheme0), 12);
        assert_eq!(digest_offset(&block, ValidationScheme::Scheme1), 776);
    }

    #[test]
    fn dh_offset_stays_within_block_for_both_schemes() {
        let block = [0xff_u8; BLOCK_SIZE];
        assert!(dh_offset(&block, ValidationScheme::Scheme0) + DH_KEY_SIZE <= BLOCK_SIZE);
        assert!(dh_offset(&block, ValidationScheme::Scheme1) + DH_KEY_SIZE <= BLOCK_SIZE);
    }

    #[test]
    fn embedded_digest_validates_under_its_own_scheme_only() {
        let mut block = [0_u8; BLOCK_SIZE];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut block);

        let offset = digest_offset(&block, ValidationScheme::Scheme1);
        let digest = compute_digest(&block, offset, &GENUINE_FP_KEY[..FP_DIGEST_KEY_LENGTH]);
        block[offset..offset + DIGEST_SIZE].copy_from_slice(&digest);

        assert_eq!(
            detect_scheme(&block, &GENUINE_FP_KEY[..FP_DIGEST_KEY_LENGTH]),
            Some(ValidationScheme::Scheme1)
        );
    }

    #[test]
    fn both_sides_agree_on_dh_shared_secret() {
        let alice = DhKeyExchange::new();
        let bob = DhKeyExchange::new();

        let secret1 = alice.shared_secret(bob.public_key()).unwrap();
        let secret2 = bob.shared_secret(alice.public_key()).unwrap();

        assert_eq!(&secret1[..], &secret2[..]);
    }

    #[test]
    fn degenerate_peer_public_key_is_rejected() {
        let exchange = DhKeyExchange::new();

        let zero = [0_u8; DH_KEY_SIZE];
        assert!(exchange.shared_secret(&zero).is_err(), "zero key accepted");

        let one_more_than_prime = [0xff_u8; DH_KEY_SIZE];
        assert!(
            exchange.shared_secret(&one_more_than_prime).is_err(),
            "out of group key accepted"
        );
    }

    #[test]
    fn mirrored_keystreams_decrypt_each_other() {
        let server = DhKeyExchange::new();
        let client = DhKeyExchange::new();
        let secret = server.shared_secret(client.public_key()).unwrap();

        let (_, mut server_outgoing) =
            derive_keystreams(&secret, client.public_key(), server.public_key());
        let (mut client_incoming, _) =
            derive_keystreams(&secret, server.public_key(), client.public_key());

        let mut data = b"interleaved chunk traffic".to_vec();
        server_outgoing.apply(&mut data);
        assert_ne!(&data[..], b"interleaved chunk traffic".as_ref());

        client_incoming.apply(&mut data);
        assert_eq!(&data[..], b"interleaved chunk traffic".as_ref());
    }
}
