//! Mainnet address encoding
//!
//! - P2WPKH: bech32, witness version 0, program = HASH160(compressed pubkey)
//! - P2SH: Base58Check with version byte 0x05 over HASH160(redeem script)

use crate::crypto::hash::{base58check, hash160};
use bech32::{hrp, segwit};
use thiserror::Error;

/// Base58Check version byte for mainnet P2SH addresses
pub const P2SH_VERSION_MAINNET: u8 = 0x05;

/// Errors from address encoding
#[derive(Error, Debug)]
pub enum AddressError {
    #[error("Bech32 encoding failed: {0}")]
    Bech32(#[from] segwit::EncodeError),
}

/// Capability to turn keys and scripts into address strings
pub trait AddressEncoder: Send + Sync {
    /// Native SegWit v0 address for a compressed public key
    fn p2wpkh(&self, compressed_pubkey: &[u8; 33]) -> Result<String, AddressError>;

    /// Pay-to-script-hash address for a redeem script
    fn p2sh(&self, script: &[u8]) -> String;
}

/// Bitcoin mainnet encoder (`bc1…` and `3…` addresses)
#[derive(Debug, Default, Clone, Copy)]
pub struct MainnetEncoder;

impl AddressEncoder for MainnetEncoder {
    fn p2wpkh(&self, compressed_pubkey: &[u8; 33]) -> Result<String, AddressError> {
        let program = hash160(compressed_pubkey);
        Ok(segwit::encode_v0(hrp::BC, &program)?)
    }

    fn p2sh(&self, script: &[u8]) -> String {
        base58check(P2SH_VERSION_MAINNET, &hash160(script))
    }
}
