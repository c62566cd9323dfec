//! Bitcoin address generator
//!
//! Two services behind one small HTTP API:
//! - Remote BIP-32 derivation of a native SegWit (P2WPKH) address. The
//!   client seals its seed and derivation path for the server's public key;
//!   the server derives `m/account'/chain/address` and seals the public key
//!   and address back to a per-request channel key. The seed never crosses
//!   the wire in the clear.
//! - M-of-N multisig redeem scripts and their P2SH addresses.
//!
//! # Example
//!
//! ```rust
//! use bitcoin_address_generator::hd::{DerivationEngine, DerivationPath};
//! use bitcoin_address_generator::multisig::standardness_cost;
//!
//! let engine = DerivationEngine::mainnet();
//! let mut seed = "000102030405060708090a0b0c0d0e0f".to_string();
//! let result = engine
//!     .derive_from_hex(&mut seed, &DerivationPath::new(0, 0, 0))
//!     .unwrap();
//! assert!(result.segwit_address.starts_with("bc1q"));
//! assert!(seed.is_empty());
//!
//! assert_eq!(standardness_cost(2, 3), 344);
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod exchange;
pub mod hd;
pub mod multisig;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use config::{ClientConfig, ServerConfig};
pub use crypto::{EciesSealer, KeyPair, SensitiveBuffer, Sealer, ServerIdentity};
pub use exchange::{ApiClient, ExchangeService, KeyParams};
pub use hd::{DerivationEngine, DerivationPath, DerivationResult};
pub use multisig::{generate_address, MultisigAddress, MultisigSpec, Standardness};
