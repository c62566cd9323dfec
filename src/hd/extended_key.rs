//! BIP-32 extended keys
//!
//! Master key generation and private child derivation come from
//! `bitcoin::bip32`. [`ExtendedPrivKey`] wraps an [`Xpriv`] so the private
//! key and chain code are erased when it is dropped.

use super::derivation::DerivationError;
use bitcoin::bip32::{ChainCode, ChildNumber, Xpriv, Xpub};
use bitcoin::secp256k1::{All, Secp256k1};
use bitcoin::NetworkKind;
use std::fmt;

/// Index offset for hardened children: 2^31
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Seed length bounds accepted for master key generation
pub const MIN_SEED_LEN: usize = 16;
pub const MAX_SEED_LEN: usize = 64;

/// Capability to walk a BIP-32 style key tree.
///
/// The derivation engine only talks to this trait, so it can be exercised
/// with fakes and is independent of the curve library.
pub trait KeyDeriver: Send + Sync {
    /// Extended private key; implementations erase secret bytes on drop
    type Private;
    /// Public-only extended key
    type Public;

    /// Master extended key from seed bytes
    fn master(&self, seed: &[u8]) -> Result<Self::Private, DerivationError>;

    /// Child at `index`, hardened when `index >= 2^31`
    fn child(&self, parent: &Self::Private, index: u32) -> Result<Self::Private, DerivationError>;

    /// Strip the private component
    fn neuter(&self, key: &Self::Private) -> Self::Public;

    /// 33-byte compressed public key of a public extended key
    fn serialize_compressed(&self, key: &Self::Public) -> [u8; 33];
}

/// Extended private key (xprv), erased on drop
pub struct ExtendedPrivKey {
    inner: Xpriv,
}

/// Extended public key (xpub)
pub type ExtendedPubKey = Xpub;

impl ExtendedPrivKey {
    pub fn depth(&self) -> u8 {
        self.inner.depth
    }

    pub fn chain_code(&self) -> &[u8] {
        self.inner.chain_code.as_ref()
    }

    pub fn is_hardened(&self) -> bool {
        self.inner.child_number.is_hardened()
    }
}

impl Drop for ExtendedPrivKey {
    fn drop(&mut self) {
        self.inner.private_key.non_secure_erase();
        self.inner.chain_code = ChainCode::from([0u8; 32]);
    }
}

impl fmt::Debug for ExtendedPrivKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedPrivKey")
            .field("depth", &self.inner.depth)
            .field("child_number", &self.inner.child_number)
            .finish_non_exhaustive()
    }
}

/// Mainnet BIP-32 implementation of [`KeyDeriver`] over `bitcoin::bip32`
pub struct Bip32Deriver {
    secp: Secp256k1<All>,
}

impl Bip32Deriver {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }
}

impl Default for Bip32Deriver {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDeriver for Bip32Deriver {
    type Private = ExtendedPrivKey;
    type Public = ExtendedPubKey;

    fn master(&self, seed: &[u8]) -> Result<ExtendedPrivKey, DerivationError> {
        if !(MIN_SEED_LEN..=MAX_SEED_LEN).contains(&seed.len()) {
            return Err(DerivationError::InvalidSeedLength(seed.len()));
        }

        let inner = Xpriv::new_master(NetworkKind::Main, seed)
            .map_err(|_| DerivationError::InvalidMasterKey)?;
        Ok(ExtendedPrivKey { inner })
    }

    fn child(&self, parent: &ExtendedPrivKey, index: u32) -> Result<ExtendedPrivKey, DerivationError> {
        if parent.inner.depth == u8::MAX {
            return Err(DerivationError::DepthExceeded);
        }

        let inner = parent
            .inner
            .derive_priv(&self.secp, &[ChildNumber::from(index)])
            .map_err(|_| DerivationError::InvalidChildKey(index))?;
        Ok(ExtendedPrivKey { inner })
    }

    fn neuter(&self, key: &ExtendedPrivKey) -> ExtendedPubKey {
        Xpub::from_priv(&self.secp, &key.inner)
    }

    fn serialize_compressed(&self, key: &ExtendedPubKey) -> [u8; 33] {
        key.public_key.serialize()
    }
}
