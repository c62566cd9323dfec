//! M-of-N multisig redeem scripts
//!
//! Builds bare CHECKMULTISIG redeem scripts from uncompressed public keys
//! and derives their mainnet P2SH addresses. Scripts whose spending input
//! would exceed relay policy are still returned, flagged as non-standard.
//!
//! # Example
//!
//! ```ignore
//! use bitcoin_address_generator::multisig::generate_address;
//!
//! let result = generate_address(2, 3, "04a8…cd,046c…87,0411…83")?;
//! println!("{}", result.p2sh_address);
//! if let Some(warning) = result.standardness.warning() {
//!     println!("{}", warning);
//! }
//! ```

pub mod script;

pub use script::{
    build_redeem_script, derive_p2sh_address, generate_address, parse_public_keys,
    standardness_cost, BuiltScript, KeyDefect, MultisigAddress, MultisigError, MultisigSpec,
    RedeemScript, Standardness, StandardnessWarning, MAX_MULTISIG_KEYS,
    STANDARD_SCRIPT_SIG_LIMIT,
};
