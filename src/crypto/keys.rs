//! secp256k1 key management for the exchange channel
//!
//! Provides key pair generation, the long-lived server identity and the
//! single-use ephemeral keys clients attach to each request.

use rand::rngs::OsRng;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use std::fmt;
use thiserror::Error;

/// Length of a SEC1 compressed public key
pub const COMPRESSED_PUBLIC_KEY_LEN: usize = 33;

/// Length of a SEC1 uncompressed public key
pub const UNCOMPRESSED_PUBLIC_KEY_LEN: usize = 65;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid public key encoding")]
    InvalidEncoding,
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(#[from] secp256k1::Error),
}

/// A key pair consisting of a private key and its corresponding public key
pub struct KeyPair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.secret_key.non_secure_erase();
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// The server's envelope key, generated once at startup.
///
/// The private half stays in process memory and is never persisted or
/// exposed. The value is immutable, so sharing it behind an `Arc` needs no
/// lock.
#[derive(Debug)]
pub struct ServerIdentity {
    keys: KeyPair,
}

impl ServerIdentity {
    /// Generate a fresh identity for this process
    pub fn generate() -> Self {
        Self {
            keys: KeyPair::generate(),
        }
    }

    /// Build an identity from a known key pair
    pub fn from_key_pair(keys: KeyPair) -> Self {
        Self { keys }
    }

    pub fn public_key(&self) -> &PublicKey {
        self.keys.public_key()
    }

    /// Compressed public key as lower-case hex
    pub fn public_key_hex(&self) -> String {
        self.keys.public_key_hex()
    }

    pub(crate) fn secret_key(&self) -> &SecretKey {
        self.keys.secret_key()
    }
}

/// A client key pair that serves as the return address for exactly one
/// response.
///
/// Opening a response consumes the key, so it cannot decrypt a second
/// payload.
#[derive(Debug)]
pub struct EphemeralChannelKey {
    keys: KeyPair,
}

impl EphemeralChannelKey {
    pub fn generate() -> Self {
        Self {
            keys: KeyPair::generate(),
        }
    }

    /// The 33-byte compressed public key sent to the server
    pub fn public_key_bytes(&self) -> [u8; COMPRESSED_PUBLIC_KEY_LEN] {
        self.keys.public_key().serialize()
    }

    /// Give up the key pair for a single decryption
    pub(crate) fn into_key_pair(self) -> KeyPair {
        self.keys
    }
}

/// Parse a public key from raw SEC1 bytes (compressed or uncompressed)
pub fn parse_public_key(bytes: &[u8]) -> Result<PublicKey, KeyError> {
    Ok(PublicKey::from_slice(bytes)?)
}

/// Parse a public key from hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key.trim()).map_err(|_| KeyError::InvalidEncoding)?;
    parse_public_key(&bytes)
}
