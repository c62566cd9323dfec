//! JSON documents exchanged between client and server
//!
//! Field names follow the established wire format, so a few of them are
//! upper-case (`SEED`, `PATH`) or camelCase.

use crate::hd::{DerivationPath, DerivationResult};
use crate::multisig::{MultisigAddress, MultisigError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Errors decoding or encoding protocol documents
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed JSON: {0}")]
    Json(String),
    #[error("Field {0} is not valid hex")]
    Hex(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Summarise a serde_json error without echoing any input.
///
/// serde_json messages can quote offending values, which for a seed
/// document would leak secret material into logs.
pub fn describe_json_error(e: &serde_json::Error) -> String {
    format!("{:?} error at line {} column {}", e.classify(), e.line(), e.column())
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::Json(describe_json_error(&e))
    }
}

/// The seed document: `{"SEED": "<hex>", "PATH": {"ACCOUNT": 0, "CHAIN": 0, "ADDRESS": 0}}`.
///
/// Read from a local file by the client and carried inside the sealed
/// request. The seed string is wiped on drop and never printed.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyParams {
    #[serde(rename = "SEED")]
    pub seed: String,
    #[serde(rename = "PATH")]
    pub path: DerivationPath,
}

impl KeyParams {
    pub fn new(seed: String, path: DerivationPath) -> Self {
        Self { seed, path }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Load a seed document from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProtocolError> {
        let contents = Zeroizing::new(fs::read(path)?);
        Self::from_slice(&contents)
    }

    /// Serialize into a buffer that is wiped on drop
    pub fn to_vec(&self) -> Result<Zeroizing<Vec<u8>>, ProtocolError> {
        Ok(Zeroizing::new(serde_json::to_vec(self)?))
    }
}

impl fmt::Debug for KeyParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyParams")
            .field("seed", &"<redacted>")
            .field("path", &self.path)
            .finish()
    }
}

/// Body of `POST /deriveAddress`: the sealed request as hex
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeriveRequest {
    pub data: String,
}

impl DeriveRequest {
    pub fn from_envelope(envelope: &[u8]) -> Self {
        Self {
            data: hex::encode(envelope),
        }
    }

    pub fn envelope(&self) -> Result<Vec<u8>, ProtocolError> {
        hex::decode(self.data.trim()).map_err(|_| ProtocolError::Hex("data"))
    }
}

/// Plaintext of the sealed `/deriveAddress` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeriveResponse {
    pub public_key: String,
    pub segwit_address: String,
}

impl From<&DerivationResult> for DeriveResponse {
    fn from(result: &DerivationResult) -> Self {
        Self {
            public_key: result.public_key_hex(),
            segwit_address: result.segwit_address.clone(),
        }
    }
}

/// Body of the `/serverPublicKey` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerKeyResponse {
    pub public_key: String,
}

/// Body of `POST /multisigAddress`; counts arrive as decimal strings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigRequest {
    pub n: String,
    pub m: String,
    pub public_keys: String,
}

fn parse_count(field: &'static str, value: &str) -> Result<usize, MultisigError> {
    value
        .trim()
        .parse()
        .map_err(|_| MultisigError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

impl MultisigRequest {
    pub fn new(m: usize, n: usize, public_keys: impl Into<String>) -> Self {
        Self {
            n: n.to_string(),
            m: m.to_string(),
            public_keys: public_keys.into(),
        }
    }

    /// `(m, n)` as integers
    pub fn counts(&self) -> Result<(usize, usize), MultisigError> {
        Ok((parse_count("m", &self.m)?, parse_count("n", &self.n)?))
    }

    /// `(m, n)` as read by `/v1` clients, which send the threshold in `n`
    /// and the key count in `m`
    pub fn legacy_counts(&self) -> Result<(usize, usize), MultisigError> {
        Ok((parse_count("n", &self.n)?, parse_count("m", &self.m)?))
    }
}

/// Body of a successful `/multisigAddress` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigResponse {
    pub p2sh_address: String,
    pub redeem_script_hex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<&MultisigAddress> for MultisigResponse {
    fn from(address: &MultisigAddress) -> Self {
        Self {
            p2sh_address: address.p2sh_address.clone(),
            redeem_script_hex: address.redeem_script.to_hex(),
            warning: address.standardness.warning().map(|w| w.to_string()),
        }
    }
}

/// `/v1` multisig response: the current fields plus the `ps2hAddress`
/// key that older clients read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyMultisigResponse {
    #[serde(rename = "ps2hAddress")]
    pub ps2h_address: String,
    #[serde(flatten)]
    pub response: MultisigResponse,
}

impl From<MultisigResponse> for LegacyMultisigResponse {
    fn from(response: MultisigResponse) -> Self {
        Self {
            ps2h_address: response.p2sh_address.clone(),
            response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SEED_JSON: &str = r#"{"SEED":"000102030405060708090a0b0c0d0e0f","PATH":{"ACCOUNT":1,"CHAIN":0,"ADDRESS":7}}"#;

    #[test]
    fn test_key_params_field_names() {
        let params = KeyParams::from_slice(SEED_JSON.as_bytes()).unwrap();
        assert_eq!(params.seed, "000102030405060708090a0b0c0d0e0f");
        assert_eq!(params.path, DerivationPath::new(1, 0, 7));

        let encoded = params.to_vec().unwrap();
        assert_eq!(encoded.as_slice(), SEED_JSON.as_bytes());
    }

    #[test]
    fn test_key_params_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SEED_JSON.as_bytes()).unwrap();

        let params = KeyParams::from_file(file.path()).unwrap();
        assert_eq!(params.path.address_index, 7);

        let missing = KeyParams::from_file(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ProtocolError::Io(_))));
    }

    #[test]
    fn test_key_params_debug_and_errors_hide_seed() {
        let params = KeyParams::from_slice(SEED_JSON.as_bytes()).unwrap();
        assert!(!format!("{:?}", params).contains("0001020304"));

        // A seed in the wrong position would be quoted by serde_json's own message
        let bad = r#"{"SEED":"00aa","PATH":"deadbeefcafe"}"#;
        let err = KeyParams::from_slice(bad.as_bytes()).unwrap_err();
        assert!(!err.to_string().contains("deadbeefcafe"));
        assert!(err.to_string().contains("Data"));
    }

    #[test]
    fn test_key_params_zeroize_clears_seed() {
        let mut params = KeyParams::from_slice(SEED_JSON.as_bytes()).unwrap();
        params.zeroize();
        assert!(params.seed.is_empty());
        assert_eq!(params.path, DerivationPath::default());
    }

    #[test]
    fn test_derive_request_hex() {
        let request = DeriveRequest::from_envelope(&[0xde, 0xad]);
        assert_eq!(request.data, "dead");
        assert_eq!(request.envelope().unwrap(), vec![0xde, 0xad]);

        let bad = DeriveRequest {
            data: "xyz".to_string(),
        };
        assert!(matches!(bad.envelope(), Err(ProtocolError::Hex("data"))));
    }

    #[test]
    fn test_response_field_names() {
        let response = DeriveResponse {
            public_key: "02ab".to_string(),
            segwit_address: "bc1q".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"publicKey":"02ab","segwitAddress":"bc1q"}"#
        );

        let multisig = MultisigResponse {
            p2sh_address: "3abc".to_string(),
            redeem_script_hex: "51ae".to_string(),
            warning: None,
        };
        assert_eq!(
            serde_json::to_string(&multisig).unwrap(),
            r#"{"p2shAddress":"3abc","redeemScriptHex":"51ae"}"#
        );
    }

    #[test]
    fn test_legacy_response_carries_both_address_keys() {
        let legacy = LegacyMultisigResponse::from(MultisigResponse {
            p2sh_address: "3abc".to_string(),
            redeem_script_hex: "51ae".to_string(),
            warning: None,
        });
        let json: serde_json::Value = serde_json::to_value(&legacy).unwrap();
        assert_eq!(json["ps2hAddress"], "3abc");
        assert_eq!(json["p2shAddress"], "3abc");
        assert_eq!(json["redeemScriptHex"], "51ae");
    }

    #[test]
    fn test_multisig_request_counts() {
        let request: MultisigRequest =
            serde_json::from_str(r#"{"n":"3","m":" 2 ","publicKeys":"'04aa'"}"#).unwrap();
        assert_eq!(request.counts().unwrap(), (2, 3));

        let legacy: MultisigRequest =
            serde_json::from_str(r#"{"n":"2","m":"3","publicKeys":""}"#).unwrap();
        assert_eq!(legacy.legacy_counts().unwrap(), (2, 3));

        let bad = MultisigRequest {
            n: "three".to_string(),
            m: "2".to_string(),
            public_keys: String::new(),
        };
        assert_eq!(
            bad.counts().unwrap_err(),
            MultisigError::InvalidNumber {
                field: "n",
                value: "three".to_string()
            }
        );
    }
}
