//! Cryptographic utilities for the key exchange
//!
//! This module provides:
//! - SHA-256 / HASH160 digests and Base58Check encoding
//! - secp256k1 key management (server identity, ephemeral channel keys)
//! - Sealed envelopes for the request/response channel
//! - Scoped buffers that zero secret bytes on every exit path

pub mod envelope;
pub mod hash;
pub mod keys;
pub mod sensitive;

pub use envelope::{EciesSealer, EnvelopeError, Sealer};
pub use hash::{base58check, double_sha256, hash160, sha256};
pub use keys::{
    parse_public_key, public_key_from_hex, EphemeralChannelKey, KeyError, KeyPair,
    ServerIdentity, COMPRESSED_PUBLIC_KEY_LEN, UNCOMPRESSED_PUBLIC_KEY_LEN,
};
pub use sensitive::SensitiveBuffer;
