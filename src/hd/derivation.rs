//! SegWit public key derivation
//!
//! Turns a seed and an `account / chain / address` path into the compressed
//! public key at `m / account' / chain / address` and its mainnet P2WPKH
//! address. The account level is always hardened; the chain and address
//! levels never are.

use super::address::{AddressEncoder, AddressError, MainnetEncoder};
use super::extended_key::{Bip32Deriver, KeyDeriver, HARDENED_OFFSET};
use crate::crypto::sensitive::SensitiveBuffer;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

/// Errors from the derivation chain
#[derive(Error, Debug)]
pub enum DerivationError {
    #[error("Seed is not valid hex")]
    InvalidSeedEncoding,
    #[error("Seed must be 16 to 64 bytes, got {0}")]
    InvalidSeedLength(usize),
    #[error("Derived master key is invalid")]
    InvalidMasterKey,
    #[error("Path index {0} does not fit in 31 bits")]
    IndexOutOfRange(u32),
    #[error("Child key at index {0} is invalid")]
    InvalidChildKey(u32),
    #[error("Maximum derivation depth exceeded")]
    DepthExceeded,
    #[error("Address encoding failed: {0}")]
    Address(#[from] AddressError),
}

impl DerivationError {
    /// True when the failure is a malformed seed encoding rather than a
    /// failed derivation step
    pub fn is_decode_error(&self) -> bool {
        matches!(self, DerivationError::InvalidSeedEncoding)
    }
}

/// `m / account' / chain / address`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Zeroize)]
pub struct DerivationPath {
    #[serde(rename = "ACCOUNT")]
    pub account: u32,
    #[serde(rename = "CHAIN")]
    pub chain: u32,
    #[serde(rename = "ADDRESS")]
    pub address_index: u32,
}

impl DerivationPath {
    pub fn new(account: u32, chain: u32, address_index: u32) -> Self {
        Self {
            account,
            chain,
            address_index,
        }
    }

    /// Every index must be below 2^31 before the hardened offset is applied
    pub fn validate(&self) -> Result<(), DerivationError> {
        for index in [self.account, self.chain, self.address_index] {
            if index >= HARDENED_OFFSET {
                return Err(DerivationError::IndexOutOfRange(index));
            }
        }
        Ok(())
    }

    /// Account index with the hardened offset applied
    pub fn hardened_account(&self) -> u32 {
        self.account | HARDENED_OFFSET
    }
}

impl std::fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m/{}'/{}/{}", self.account, self.chain, self.address_index)
    }
}

/// Public key and SegWit address at a derivation path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationResult {
    pub public_key: [u8; 33],
    pub segwit_address: String,
}

impl DerivationResult {
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key)
    }
}

/// Derivation chain over pluggable key-tree and address capabilities
pub struct DerivationEngine<D = Bip32Deriver, A = MainnetEncoder> {
    deriver: D,
    encoder: A,
}

impl DerivationEngine {
    /// secp256k1 BIP-32 derivation with mainnet addresses
    pub fn mainnet() -> Self {
        Self::new(Bip32Deriver::new(), MainnetEncoder)
    }
}

impl Default for DerivationEngine {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl<D: KeyDeriver, A: AddressEncoder> DerivationEngine<D, A> {
    pub fn new(deriver: D, encoder: A) -> Self {
        Self { deriver, encoder }
    }

    /// Derive from a hex-encoded seed.
    ///
    /// The hex string is wiped before this returns, whatever the outcome.
    pub fn derive_from_hex(
        &self,
        seed_hex: &mut String,
        path: &DerivationPath,
    ) -> Result<DerivationResult, DerivationError> {
        let decoded = SensitiveBuffer::from_hex(seed_hex.trim());
        seed_hex.zeroize();
        let mut seed = decoded.map_err(|_| DerivationError::InvalidSeedEncoding)?;
        self.derive_segwit_public_key(&mut seed, path)
    }

    /// Derive the compressed public key and P2WPKH address at `path`.
    ///
    /// `seed` is scrubbed as soon as the master key exists, and on every
    /// early return. Intermediate private keys are dropped (and erased) as
    /// soon as their child has been computed. No partial result is returned
    /// when any step fails.
    pub fn derive_segwit_public_key(
        &self,
        seed: &mut SensitiveBuffer,
        path: &DerivationPath,
    ) -> Result<DerivationResult, DerivationError> {
        let master = match path.validate() {
            Ok(()) => seed.expose(|bytes| self.deriver.master(bytes)),
            Err(e) => Err(e),
        };
        seed.scrub();
        let master = master?;

        let account = self.deriver.child(&master, path.hardened_account());
        drop(master);
        let account = account?;

        let chain = self.deriver.child(&account, path.chain);
        drop(account);
        let chain = chain?;

        let address = self.deriver.child(&chain, path.address_index);
        drop(chain);
        let address = address?;

        let public = self.deriver.neuter(&address);
        drop(address);

        let public_key = self.deriver.serialize_compressed(&public);
        let segwit_address = self.encoder.p2wpkh(&public_key)?;

        Ok(DerivationResult {
            public_key,
            segwit_address,
        })
    }
}
