//! Server side of the exchange
//!
//! [`ExchangeService`] owns the server identity and composes the envelope,
//! derivation and multisig components. It holds no mutable state, so one
//! instance is shared by every request handler.

use super::protocol::{
    describe_json_error, DeriveRequest, DeriveResponse, KeyParams, LegacyMultisigResponse,
    MultisigRequest, MultisigResponse, ServerKeyResponse,
};
use crate::crypto::envelope::{EciesSealer, EnvelopeError, Sealer};
use crate::crypto::keys::{parse_public_key, KeyError, ServerIdentity, COMPRESSED_PUBLIC_KEY_LEN};
use crate::hd::{AddressEncoder, Bip32Deriver, DerivationEngine, DerivationError, KeyDeriver, MainnetEncoder};
use crate::multisig::{generate_address, MultisigError};
use thiserror::Error;
use zeroize::Zeroize;

/// Terminal failures of a derivation request.
///
/// Messages never include seed material; they are meant for the server
/// log only and are not returned to the caller.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Decryption error: {0}")]
    Decryption(EnvelopeError),
    #[error("Invalid client key: {0}")]
    InvalidKey(#[from] KeyError),
    #[error("Derivation error: {0}")]
    Derivation(DerivationError),
    #[error("Encode error: {0}")]
    Encode(String),
    #[error("Encryption error: {0}")]
    Encryption(EnvelopeError),
}

impl ExchangeError {
    /// Name of the step that failed
    pub fn step(&self) -> &'static str {
        match self {
            ExchangeError::Decode(_) => "decode",
            ExchangeError::Decryption(_) => "open",
            ExchangeError::InvalidKey(_) => "client key",
            ExchangeError::Derivation(_) => "derive",
            ExchangeError::Encode(_) => "encode",
            ExchangeError::Encryption(_) => "seal",
        }
    }
}

impl From<DerivationError> for ExchangeError {
    fn from(e: DerivationError) -> Self {
        if e.is_decode_error() {
            ExchangeError::Decode(e.to_string())
        } else {
            ExchangeError::Derivation(e)
        }
    }
}

pub struct ExchangeService<S = EciesSealer, D = Bip32Deriver, A = MainnetEncoder> {
    identity: ServerIdentity,
    sealer: S,
    engine: DerivationEngine<D, A>,
}

impl ExchangeService {
    /// ECIES envelopes and mainnet BIP-32 derivation
    pub fn new(identity: ServerIdentity) -> Self {
        Self::with_parts(identity, EciesSealer::new(), DerivationEngine::mainnet())
    }
}

impl<S: Sealer, D: KeyDeriver, A: AddressEncoder> ExchangeService<S, D, A> {
    pub fn with_parts(identity: ServerIdentity, sealer: S, engine: DerivationEngine<D, A>) -> Self {
        Self {
            identity,
            sealer,
            engine,
        }
    }

    pub fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    pub fn server_public_key(&self) -> ServerKeyResponse {
        ServerKeyResponse {
            public_key: self.identity.public_key_hex(),
        }
    }

    /// Handle a `/deriveAddress` body (`{"data": "<hex>"}`)
    pub fn handle_derive_body(&self, body: &[u8]) -> Result<Vec<u8>, ExchangeError> {
        let request: DeriveRequest = serde_json::from_slice(body)
            .map_err(|e| ExchangeError::Decode(describe_json_error(&e)))?;
        let envelope = request
            .envelope()
            .map_err(|e| ExchangeError::Decode(e.to_string()))?;
        self.handle_sealed_request(&envelope)
    }

    /// Open a sealed request, derive, and seal the result for the caller.
    ///
    /// Every failure is terminal and nothing derived is returned once a
    /// later step fails. Plaintext buffers and the decoded seed are wiped
    /// on all paths.
    pub fn handle_sealed_request(&self, envelope: &[u8]) -> Result<Vec<u8>, ExchangeError> {
        let mut plaintext = self
            .sealer
            .open(self.identity.secret_key(), envelope)
            .map_err(ExchangeError::Decryption)?;

        let (client_key, mut encoded_params) = plaintext
            .split_at(COMPRESSED_PUBLIC_KEY_LEN)
            .ok_or_else(|| {
                ExchangeError::Decode(format!(
                    "plaintext shorter than {} byte client key",
                    COMPRESSED_PUBLIC_KEY_LEN
                ))
            })?;

        let decoded = encoded_params.expose(KeyParams::from_slice);
        encoded_params.scrub();
        let mut params = decoded.map_err(|e| ExchangeError::Decode(e.to_string()))?;

        let derived = self.engine.derive_from_hex(&mut params.seed, &params.path);
        params.zeroize();
        let result = derived?;

        let payload = serde_json::to_vec(&DeriveResponse::from(&result))
            .map_err(|e| ExchangeError::Encode(describe_json_error(&e)))?;

        let client_key = client_key.expose(parse_public_key)?;

        self.sealer
            .seal(&client_key, &payload)
            .map_err(ExchangeError::Encryption)
    }

    /// Handle a `/multisigAddress` request. No secrets are involved, so
    /// validation errors are meant to be shown to the caller.
    pub fn handle_multisig_request(
        &self,
        request: &MultisigRequest,
    ) -> Result<MultisigResponse, MultisigError> {
        let (m, n) = request.counts()?;
        let address = generate_address(m, n, &request.public_keys)?;
        Ok(MultisigResponse::from(&address))
    }

    /// Handle a `/v1/genMultiSigP2SHAddress` request, where the threshold
    /// arrives in `n` and the key count in `m`
    pub fn handle_legacy_multisig_request(
        &self,
        request: &MultisigRequest,
    ) -> Result<LegacyMultisigResponse, MultisigError> {
        let (m, n) = request.legacy_counts()?;
        let address = generate_address(m, n, &request.public_keys)?;
        Ok(MultisigResponse::from(&address).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::EphemeralChannelKey;
    use crate::crypto::sensitive::SensitiveBuffer;
    use crate::exchange::client::{open_response, seal_request};
    use crate::hd::DerivationPath;
    use secp256k1::{PublicKey, SecretKey};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SEED_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn params(seed: &str) -> KeyParams {
        KeyParams::new(seed.to_string(), DerivationPath::default())
    }

    fn derive_body(service: &ExchangeService, params: &KeyParams) -> (EphemeralChannelKey, Vec<u8>) {
        let sealer = EciesSealer::new();
        let (channel, envelope) =
            seal_request(&sealer, service.identity().public_key(), params).unwrap();
        let body = serde_json::to_vec(&DeriveRequest::from_envelope(&envelope)).unwrap();
        (channel, body)
    }

    #[test]
    fn test_derive_round_trip_known_vector() {
        let service = ExchangeService::new(ServerIdentity::generate());
        let (channel, body) = derive_body(&service, &params(SEED_HEX));

        let sealed = service.handle_derive_body(&body).unwrap();
        let response = open_response(&EciesSealer::new(), channel, &sealed).unwrap();

        assert_eq!(
            response.public_key,
            "022985dcb2c05a814f16ed871c929d4413962061ee9d604cfbfe8532cff3aa7a7d"
        );
        assert_eq!(
            response.segwit_address,
            "bc1qgv78gvkpztfn2djm4quw0pc5ud7rtx9gnczqfu"
        );
    }

    #[test]
    fn test_response_only_opens_with_channel_key() {
        let service = ExchangeService::new(ServerIdentity::generate());
        let (_channel, body) = derive_body(&service, &params(SEED_HEX));
        let sealed = service.handle_derive_body(&body).unwrap();

        let stranger = EphemeralChannelKey::generate();
        assert!(open_response(&EciesSealer::new(), stranger, &sealed).is_err());
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        let service = ExchangeService::new(ServerIdentity::generate());
        assert!(matches!(
            service.handle_derive_body(b"not json"),
            Err(ExchangeError::Decode(_))
        ));
        assert!(matches!(
            service.handle_derive_body(br#"{"data":"zz"}"#),
            Err(ExchangeError::Decode(_))
        ));
    }

    #[test]
    fn test_request_for_other_server_is_decryption_error() {
        let service = ExchangeService::new(ServerIdentity::generate());
        let other = ExchangeService::new(ServerIdentity::generate());
        let (_channel, body) = derive_body(&other, &params(SEED_HEX));

        assert!(matches!(
            service.handle_derive_body(&body),
            Err(ExchangeError::Decryption(EnvelopeError::AuthenticationFailed))
        ));
    }

    #[test]
    fn test_bad_seed_errors() {
        let service = ExchangeService::new(ServerIdentity::generate());

        let (_c, body) = derive_body(&service, &params("not hex at all"));
        assert!(matches!(
            service.handle_derive_body(&body),
            Err(ExchangeError::Decode(_))
        ));

        let (_c, body) = derive_body(&service, &params("00ff"));
        assert!(matches!(
            service.handle_derive_body(&body),
            Err(ExchangeError::Derivation(DerivationError::InvalidSeedLength(2)))
        ));
    }

    /// Passes plaintext through unchanged and counts seal calls
    #[derive(Default)]
    struct PassThroughSealer {
        seals: AtomicUsize,
    }

    impl Sealer for PassThroughSealer {
        fn seal(&self, _recipient: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
            self.seals.fetch_add(1, Ordering::SeqCst);
            Ok(plaintext.to_vec())
        }

        fn open(&self, _recipient: &SecretKey, envelope: &[u8]) -> Result<SensitiveBuffer, EnvelopeError> {
            Ok(SensitiveBuffer::new(envelope.to_vec()))
        }
    }

    fn pass_through_service() -> ExchangeService<PassThroughSealer> {
        ExchangeService::with_parts(
            ServerIdentity::generate(),
            PassThroughSealer::default(),
            DerivationEngine::mainnet(),
        )
    }

    fn plaintext(client_key: &[u8], params_json: &str) -> Vec<u8> {
        let mut bytes = client_key.to_vec();
        bytes.extend_from_slice(params_json.as_bytes());
        bytes
    }

    #[test]
    fn test_short_plaintext_is_decode_error() {
        let service = pass_through_service();
        assert!(matches!(
            service.handle_sealed_request(&[0x02; 10]),
            Err(ExchangeError::Decode(_))
        ));
    }

    #[test]
    fn test_malformed_params_is_decode_error() {
        let service = pass_through_service();
        let key = EphemeralChannelKey::generate().public_key_bytes();
        let request = plaintext(&key, r#"{"SEED":"00"#);

        assert!(matches!(
            service.handle_sealed_request(&request),
            Err(ExchangeError::Decode(_))
        ));
        assert_eq!(service.sealer.seals.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_client_key_checked_after_derivation() {
        let service = pass_through_service();
        let mut bad_key = [0xffu8; COMPRESSED_PUBLIC_KEY_LEN];
        bad_key[0] = 0x02;
        let json = format!(
            r#"{{"SEED":"{}","PATH":{{"ACCOUNT":0,"CHAIN":0,"ADDRESS":0}}}}"#,
            SEED_HEX
        );

        assert!(matches!(
            service.handle_sealed_request(&plaintext(&bad_key, &json)),
            Err(ExchangeError::InvalidKey(_))
        ));
        assert_eq!(service.sealer.seals.load(Ordering::SeqCst), 0);

        // A derivation failure wins over a bad client key
        let json = r#"{"SEED":"00","PATH":{"ACCOUNT":0,"CHAIN":0,"ADDRESS":0}}"#;
        assert!(matches!(
            service.handle_sealed_request(&plaintext(&bad_key, json)),
            Err(ExchangeError::Derivation(_))
        ));
    }

    #[test]
    fn test_pass_through_response_payload() {
        let service = pass_through_service();
        let key = EphemeralChannelKey::generate().public_key_bytes();
        let json = format!(
            r#"{{"SEED":"{}","PATH":{{"ACCOUNT":0,"CHAIN":0,"ADDRESS":1}}}}"#,
            SEED_HEX
        );

        let payload = service.handle_sealed_request(&plaintext(&key, &json)).unwrap();
        let response: DeriveResponse = serde_json::from_slice(&payload).unwrap();
        assert_eq!(
            response.segwit_address,
            "bc1qzm5856y4gusvzcdlqm95yww27zg0tfk3mfdt9m"
        );
        assert_eq!(service.sealer.seals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_error_steps_keep_encode_apart_from_decode() {
        assert_eq!(ExchangeError::Encode("x".to_string()).step(), "encode");
        assert_eq!(ExchangeError::Decode("x".to_string()).step(), "decode");
        assert_eq!(
            ExchangeError::Decryption(EnvelopeError::AuthenticationFailed).step(),
            "open"
        );
        assert!(ExchangeError::Encode("x".to_string())
            .to_string()
            .starts_with("Encode error"));
    }

    #[test]
    fn test_server_public_key_is_compressed_hex() {
        let service = ExchangeService::new(ServerIdentity::generate());
        let response = service.server_public_key();
        assert_eq!(response.public_key.len(), 66);
        assert_eq!(response.public_key, service.identity().public_key_hex());
    }

    #[test]
    fn test_multisig_request_uses_named_threshold() {
        let service = ExchangeService::new(ServerIdentity::generate());
        let keys = [
            "04a882d414e478039cd5b52a92ffb13dd5e6bd4515497439dffd691a0f12af9575fa349b5694ed3155b136f09e63975a1700c9f4d4df849323dac06cf3bd6458cd",
            "046ce31db9bdd543e72fe3039a1f1c047dab87037c36a669ff90e28da1848f640de68c2fe913d363a51154a0c62d7adea1b822d05035077418267b1a1379790187",
            "0411ffd36c70776538d079fbae117dc38effafb33304af83ce4894589747aee1ef992f63280567f52f5ba870678b4ab4ff6c8ea600bd217870a8b4f1f09f3a8e83",
        ]
        .join(",");

        let response = service
            .handle_multisig_request(&MultisigRequest::new(2, 3, keys))
            .unwrap();
        assert_eq!(response.p2sh_address, "347N1Thc213QqfYCz3PZkjoJpNv5b14kBd");
        assert!(response.redeem_script_hex.starts_with("52"));
        assert!(response.warning.is_none());

        let bad = MultisigRequest {
            n: "3".to_string(),
            m: "x".to_string(),
            public_keys: String::new(),
        };
        assert!(matches!(
            service.handle_multisig_request(&bad),
            Err(MultisigError::InvalidNumber { field: "m", .. })
        ));
    }

    #[test]
    fn test_legacy_multisig_reads_threshold_from_n() {
        let service = ExchangeService::new(ServerIdentity::generate());
        let body = format!(
            r#"{{"n":"2","m":"3","publicKeys":"{}"}}"#,
            [
                "04a882d414e478039cd5b52a92ffb13dd5e6bd4515497439dffd691a0f12af9575fa349b5694ed3155b136f09e63975a1700c9f4d4df849323dac06cf3bd6458cd",
                "046ce31db9bdd543e72fe3039a1f1c047dab87037c36a669ff90e28da1848f640de68c2fe913d363a51154a0c62d7adea1b822d05035077418267b1a1379790187",
                "0411ffd36c70776538d079fbae117dc38effafb33304af83ce4894589747aee1ef992f63280567f52f5ba870678b4ab4ff6c8ea600bd217870a8b4f1f09f3a8e83",
            ]
            .join(",")
        );
        let request: MultisigRequest = serde_json::from_str(&body).unwrap();

        let legacy = service.handle_legacy_multisig_request(&request).unwrap();
        assert_eq!(legacy.ps2h_address, "347N1Thc213QqfYCz3PZkjoJpNv5b14kBd");
        assert_eq!(legacy.response.p2sh_address, legacy.ps2h_address);

        // The same body on the current endpoint means 3-of-2
        assert!(matches!(
            service.handle_multisig_request(&request),
            Err(MultisigError::InvalidThreshold { m: 3, n: 2 })
        ));
    }
}
