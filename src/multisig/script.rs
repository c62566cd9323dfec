//! M-of-N multisig redeem scripts and their P2SH addresses
//!
//! Script layout:
//!
//! ```text
//! OP_m <push 65> <pubkey 1> ... <push 65> <pubkey n> OP_n OP_CHECKMULTISIG
//! ```
//!
//! Keys are emitted in the caller's order; reordering them yields a
//! different script and address.

use crate::crypto::keys::UNCOMPRESSED_PUBLIC_KEY_LEN;
use crate::hd::address::{AddressEncoder, MainnetEncoder};
use std::fmt;
use thiserror::Error;

/// Largest N accepted for a standard bare CHECKMULTISIG
pub const MAX_MULTISIG_KEYS: usize = 7;

/// OP_1 is 0x51, so OP_k = 0x50 + k
const OP_N_BASE: u8 = 0x50;

pub const OP_CHECKMULTISIG: u8 = 0xae;

/// Leading byte of an uncompressed SEC1 public key
const UNCOMPRESSED_KEY_PREFIX: u8 = 0x04;

/// Relay policy bound on m*73 + n*66 for the spending script
pub const STANDARD_SCRIPT_SIG_LIMIT: usize = 496;

/// Why a public key was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDefect {
    Empty,
    WrongLength(usize),
    WrongPrefix(u8),
}

impl fmt::Display for KeyDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyDefect::Empty => write!(f, "public key cannot be empty"),
            KeyDefect::WrongLength(len) => write!(
                f,
                "public key should be {} bytes long, provided key is {} bytes long",
                UNCOMPRESSED_PUBLIC_KEY_LEN, len
            ),
            KeyDefect::WrongPrefix(byte) => write!(
                f,
                "public key first byte should be 0x04, provided key first byte is 0x{:02x}",
                byte
            ),
        }
    }
}

/// Errors related to multisig parameters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisigError {
    #[error("N must be between 1 and 7 (inclusive) for a standard P2SH multisig, got {n}")]
    InvalidKeyCount { n: usize },
    #[error("M must be between 1 and N (inclusive), got M={m} N={n}")]
    InvalidThreshold { m: usize, n: usize },
    #[error("Need exactly {n} public keys for a {m}-of-{n} multisig, {provided} provided")]
    KeyCountMismatch { m: usize, n: usize, provided: usize },
    #[error("Invalid public key {key_hex}: {defect}")]
    InvalidPublicKey { key_hex: String, defect: KeyDefect },
    #[error("Public key is not valid hex: {0}")]
    InvalidKeyEncoding(String),
    #[error("Invalid number for {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Validated-on-build parameters for an M-of-N script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigSpec {
    pub m: usize,
    pub n: usize,
    pub public_keys: Vec<Vec<u8>>,
}

/// Serialized redeem script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemScript(Vec<u8>);

impl RedeemScript {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Attached to scripts whose spending input exceeds relay policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardnessWarning {
    pub m: usize,
    pub n: usize,
}

impl StandardnessWarning {
    pub fn cost(&self) -> usize {
        standardness_cost(self.m, self.n)
    }
}

impl fmt::Display for StandardnessWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WARNING: {m}-of-{n} multisig is valid but non-standard: m*73 + n*66 = {cost} exceeds {limit}. \
             Transactions spending from this address may take a very long time (possibly forever) to be \
             relayed and mined. Choose m and n such that m*73 + n*66 <= {limit}.",
            m = self.m,
            n = self.n,
            cost = self.cost(),
            limit = STANDARD_SCRIPT_SIG_LIMIT
        )
    }
}

/// Relay-policy classification of a built script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Standardness {
    Standard,
    NonStandard(StandardnessWarning),
}

impl Standardness {
    pub fn warning(&self) -> Option<&StandardnessWarning> {
        match self {
            Standardness::Standard => None,
            Standardness::NonStandard(warning) => Some(warning),
        }
    }

    pub fn is_standard(&self) -> bool {
        matches!(self, Standardness::Standard)
    }
}

/// A redeem script together with its standardness classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltScript {
    pub script: RedeemScript,
    pub standardness: Standardness,
}

/// Everything returned for a multisig address request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigAddress {
    pub p2sh_address: String,
    pub redeem_script: RedeemScript,
    pub standardness: Standardness,
}

/// Upper bound on signature bytes (73 each) plus key bytes (66 each)
pub fn standardness_cost(m: usize, n: usize) -> usize {
    m * 73 + n * 66
}

fn check_public_key(key: &[u8]) -> Result<(), MultisigError> {
    let defect = if key.is_empty() {
        Some(KeyDefect::Empty)
    } else if key.len() != UNCOMPRESSED_PUBLIC_KEY_LEN {
        Some(KeyDefect::WrongLength(key.len()))
    } else if key[0] != UNCOMPRESSED_KEY_PREFIX {
        Some(KeyDefect::WrongPrefix(key[0]))
    } else {
        None
    };

    match defect {
        Some(defect) => Err(MultisigError::InvalidPublicKey {
            key_hex: hex::encode(key),
            defect,
        }),
        None => Ok(()),
    }
}

impl MultisigSpec {
    pub fn new(m: usize, n: usize, public_keys: Vec<Vec<u8>>) -> Self {
        Self { m, n, public_keys }
    }

    /// Checks run in order; the first failure is returned
    pub fn validate(&self) -> Result<(), MultisigError> {
        if self.n < 1 || self.n > MAX_MULTISIG_KEYS {
            return Err(MultisigError::InvalidKeyCount { n: self.n });
        }
        if self.m < 1 || self.m > self.n {
            return Err(MultisigError::InvalidThreshold {
                m: self.m,
                n: self.n,
            });
        }
        if self.public_keys.len() != self.n {
            return Err(MultisigError::KeyCountMismatch {
                m: self.m,
                n: self.n,
                provided: self.public_keys.len(),
            });
        }
        for key in &self.public_keys {
            check_public_key(key)?;
        }
        Ok(())
    }

    /// Validate and emit the redeem script
    pub fn build(&self) -> Result<BuiltScript, MultisigError> {
        self.validate()?;

        let mut script =
            Vec::with_capacity(3 + self.n * (1 + UNCOMPRESSED_PUBLIC_KEY_LEN));
        script.push(OP_N_BASE + self.m as u8);
        for key in &self.public_keys {
            script.push(key.len() as u8);
            script.extend_from_slice(key);
        }
        script.push(OP_N_BASE + self.n as u8);
        script.push(OP_CHECKMULTISIG);

        let standardness = if standardness_cost(self.m, self.n) > STANDARD_SCRIPT_SIG_LIMIT {
            Standardness::NonStandard(StandardnessWarning {
                m: self.m,
                n: self.n,
            })
        } else {
            Standardness::Standard
        };

        Ok(BuiltScript {
            script: RedeemScript(script),
            standardness,
        })
    }
}

/// Build an M-of-N redeem script from raw public keys
pub fn build_redeem_script(
    m: usize,
    n: usize,
    public_keys: &[Vec<u8>],
) -> Result<BuiltScript, MultisigError> {
    MultisigSpec::new(m, n, public_keys.to_vec()).build()
}

/// Mainnet P2SH address of a redeem script
pub fn derive_p2sh_address(script: &RedeemScript) -> String {
    MainnetEncoder.p2sh(script.as_bytes())
}

/// Split a comma-separated key list into hex-decoded keys.
///
/// Entries may be wrapped in single or double quotes; surrounding
/// whitespace is ignored. Commas inside quotes do not split.
pub fn parse_public_keys(list: &str) -> Result<Vec<Vec<u8>>, MultisigError> {
    let list = list.trim();
    if list.is_empty() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in list.chars() {
        match c {
            '\'' | '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => entries.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    entries.push(current);

    entries
        .iter()
        .map(|entry| {
            let entry = entry.trim();
            hex::decode(entry).map_err(|_| MultisigError::InvalidKeyEncoding(entry.to_string()))
        })
        .collect()
}

/// Parse the key list, build the script and derive its address
pub fn generate_address(
    m: usize,
    n: usize,
    public_keys: &str,
) -> Result<MultisigAddress, MultisigError> {
    let keys = parse_public_keys(public_keys)?;
    let built = MultisigSpec::new(m, n, keys).build()?;
    let p2sh_address = derive_p2sh_address(&built.script);

    Ok(MultisigAddress {
        p2sh_address,
        redeem_script: built.script,
        standardness: built.standardness,
    })
}
