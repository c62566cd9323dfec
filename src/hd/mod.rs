//! Hierarchical-deterministic key derivation
//!
//! BIP-32 extended keys, mainnet address encoding and the derivation engine
//! that ties them together.

pub mod address;
pub mod derivation;
pub mod extended_key;

pub use address::{AddressEncoder, AddressError, MainnetEncoder, P2SH_VERSION_MAINNET};
pub use derivation::{DerivationEngine, DerivationError, DerivationPath, DerivationResult};
pub use extended_key::{
    Bip32Deriver, ExtendedPrivKey, ExtendedPubKey, KeyDeriver, HARDENED_OFFSET,
};
