//! Client side of the exchange
//!
//! The free functions build and open envelopes without any I/O; [`ApiClient`]
//! wraps them in HTTP calls against a running server.

use super::protocol::{
    DeriveRequest, DeriveResponse, KeyParams, MultisigRequest, MultisigResponse, ProtocolError,
    ServerKeyResponse,
};
use crate::api::handlers::ApiError;
use crate::config::ClientConfig;
use crate::crypto::envelope::{EciesSealer, EnvelopeError, Sealer};
use crate::crypto::keys::{public_key_from_hex, EphemeralChannelKey, KeyError};
use secp256k1::PublicKey;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("Invalid server key: {0}")]
    Key(#[from] KeyError),
    #[error("Envelope error: {0}")]
    Envelope(#[from] EnvelopeError),
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Seal `params` for the server under a fresh channel key.
///
/// Returns the channel key, which is needed once to open the response,
/// and the raw envelope.
pub fn seal_request<S: Sealer>(
    sealer: &S,
    server_key: &PublicKey,
    params: &KeyParams,
) -> Result<(EphemeralChannelKey, Vec<u8>), ClientError> {
    let channel = EphemeralChannelKey::generate();
    let encoded = params.to_vec()?;

    let mut plaintext = Zeroizing::new(Vec::with_capacity(33 + encoded.len()));
    plaintext.extend_from_slice(&channel.public_key_bytes());
    plaintext.extend_from_slice(&encoded);

    let envelope = sealer.seal(server_key, &plaintext)?;
    Ok((channel, envelope))
}

/// Open a sealed derive response. Consumes the channel key.
pub fn open_response<S: Sealer>(
    sealer: &S,
    channel: EphemeralChannelKey,
    sealed: &[u8],
) -> Result<DeriveResponse, ClientError> {
    let keys = channel.into_key_pair();
    let opened = sealer.open(keys.secret_key(), sealed);
    drop(keys);

    let plaintext = opened?;
    let response = plaintext.expose(|bytes| serde_json::from_slice::<DeriveResponse>(bytes));
    Ok(response.map_err(ProtocolError::from)?)
}

/// HTTP client for the address server
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    sealer: EciesSealer,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            sealer: EciesSealer::new(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.base_url())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET /serverPublicKey
    pub async fn server_public_key(&self) -> Result<PublicKey, ClientError> {
        let response = self.http.get(self.url("/serverPublicKey")).send().await?;
        let body: ServerKeyResponse = check_status(response).await?.json().await?;
        Ok(public_key_from_hex(&body.public_key)?)
    }

    /// POST /deriveAddress
    pub async fn derive_address(
        &self,
        server_key: &PublicKey,
        params: &KeyParams,
    ) -> Result<DeriveResponse, ClientError> {
        let (channel, envelope) = seal_request(&self.sealer, server_key, params)?;
        log::debug!("sealed derive request ({} bytes)", envelope.len());

        let response = self
            .http
            .post(self.url("/deriveAddress"))
            .json(&DeriveRequest::from_envelope(&envelope))
            .send()
            .await?;
        let sealed = check_status(response).await?.bytes().await?;
        open_response(&self.sealer, channel, &sealed)
    }

    /// POST /multisigAddress
    pub async fn multisig_address(
        &self,
        request: &MultisigRequest,
    ) -> Result<MultisigResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/multisigAddress"))
            .json(request)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<ApiError>()
        .await
        .map(|e| e.error)
        .unwrap_or_default();
    Err(ClientError::Rejected {
        status: status.as_u16(),
        message,
    })
}
