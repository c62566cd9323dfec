//! Sealed envelopes addressed to a secp256k1 public key
//!
//! An envelope can only be opened by the holder of the recipient's private
//! key. The default [`EciesSealer`] combines an ephemeral-static ECDH
//! exchange, HKDF-SHA256 and ChaCha20-Poly1305.
//!
//! Wire layout:
//!
//! ```text
//! version (1) || sender ephemeral pubkey, compressed (33) || nonce (12) || ciphertext || tag (16)
//! ```

use crate::crypto::keys::COMPRESSED_PUBLIC_KEY_LEN;
use crate::crypto::sensitive::SensitiveBuffer;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::ecdh::SharedSecret;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

/// Envelope format version
const ENVELOPE_VERSION: u8 = 1;

/// HKDF info string binding keys to this envelope format
const HKDF_INFO: &[u8] = b"addrgen-envelope-v1";

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = 1 + COMPRESSED_PUBLIC_KEY_LEN + NONCE_LEN;

/// Errors raised while sealing or opening an envelope
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("Envelope too short: {0} bytes")]
    Truncated(usize),
    #[error("Unsupported envelope version: {0}")]
    UnsupportedVersion(u8),
    #[error("Invalid sender key in envelope")]
    InvalidSenderKey,
    #[error("Envelope authentication failed")]
    AuthenticationFailed,
    #[error("Key derivation failed")]
    KeyDerivation,
    #[error("Encryption failed")]
    Encryption,
}

/// Capability to seal bytes for a recipient and open bytes as a recipient
pub trait Sealer: Send + Sync {
    /// Encrypt `plaintext` so that only the holder of the private key
    /// matching `recipient` can read it
    fn seal(&self, recipient: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>, EnvelopeError>;

    /// Decrypt and authenticate an envelope with the recipient's private key
    fn open(&self, recipient: &SecretKey, envelope: &[u8]) -> Result<SensitiveBuffer, EnvelopeError>;
}

/// ECDH + HKDF-SHA256 + ChaCha20-Poly1305 sealer
#[derive(Debug, Default, Clone, Copy)]
pub struct EciesSealer;

impl EciesSealer {
    pub fn new() -> Self {
        Self
    }
}

/// Derive the symmetric key from the ECDH shared point, salted with both
/// public keys so an envelope cannot be replayed under another recipient
fn derive_envelope_key(
    shared: &SharedSecret,
    sender: &PublicKey,
    recipient: &PublicKey,
) -> Result<Zeroizing<[u8; 32]>, EnvelopeError> {
    let mut salt = [0u8; COMPRESSED_PUBLIC_KEY_LEN * 2];
    salt[..COMPRESSED_PUBLIC_KEY_LEN].copy_from_slice(&sender.serialize());
    salt[COMPRESSED_PUBLIC_KEY_LEN..].copy_from_slice(&recipient.serialize());

    let ikm = Zeroizing::new(shared.secret_bytes());
    let hk = Hkdf::<Sha256>::new(Some(&salt[..]), &ikm[..]);

    let mut key = Zeroizing::new([0u8; 32]);
    hk.expand(HKDF_INFO, &mut key[..])
        .map_err(|_| EnvelopeError::KeyDerivation)?;
    Ok(key)
}

impl Sealer for EciesSealer {
    fn seal(&self, recipient: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        let secp = Secp256k1::new();
        let (mut ephemeral_secret, ephemeral_public) = secp.generate_keypair(&mut OsRng);

        let shared = SharedSecret::new(recipient, &ephemeral_secret);
        ephemeral_secret.non_secure_erase();
        let key = derive_envelope_key(&shared, &ephemeral_public, recipient)?;

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let cipher = ChaCha20Poly1305::new_from_slice(&key[..])
            .map_err(|_| EnvelopeError::Encryption)?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| EnvelopeError::Encryption)?;

        let mut envelope = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        envelope.push(ENVELOPE_VERSION);
        envelope.extend_from_slice(&ephemeral_public.serialize());
        envelope.extend_from_slice(&nonce);
        envelope.extend_from_slice(&ciphertext);
        Ok(envelope)
    }

    fn open(&self, recipient: &SecretKey, envelope: &[u8]) -> Result<SensitiveBuffer, EnvelopeError> {
        if envelope.len() < HEADER_LEN + TAG_LEN {
            return Err(EnvelopeError::Truncated(envelope.len()));
        }
        if envelope[0] != ENVELOPE_VERSION {
            return Err(EnvelopeError::UnsupportedVersion(envelope[0]));
        }

        let sender_bytes = &envelope[1..1 + COMPRESSED_PUBLIC_KEY_LEN];
        let nonce = &envelope[1 + COMPRESSED_PUBLIC_KEY_LEN..HEADER_LEN];
        let ciphertext = &envelope[HEADER_LEN..];

        let sender =
            PublicKey::from_slice(sender_bytes).map_err(|_| EnvelopeError::InvalidSenderKey)?;
        let secp = Secp256k1::new();
        let recipient_public = PublicKey::from_secret_key(&secp, recipient);

        let shared = SharedSecret::new(&sender, recipient);
        let key = derive_envelope_key(&shared, &sender, &recipient_public)?;

        let cipher = ChaCha20Poly1305::new_from_slice(&key[..])
            .map_err(|_| EnvelopeError::AuthenticationFailed)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| EnvelopeError::AuthenticationFailed)?;

        Ok(SensitiveBuffer::new(plaintext))
    }
}
