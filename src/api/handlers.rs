//! REST API handlers for address generation

use crate::exchange::{
    ExchangeService, LegacyMultisigResponse, MultisigRequest, MultisigResponse, ServerKeyResponse,
};
use crate::multisig::MultisigError;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<ExchangeService>,
}

impl ApiState {
    pub fn new(service: Arc<ExchangeService>) -> Self {
        Self { service }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

fn internal_error(error: String) -> (StatusCode, Json<ApiError>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiError { error }))
}

/// GET /health - Health check
pub async fn health_check() -> &'static str {
    "OK"
}

/// ANY /serverPublicKey - Server's compressed public key
pub async fn server_public_key(State(state): State<ApiState>) -> Json<ServerKeyResponse> {
    Json(state.service.server_public_key())
}

/// POST /deriveAddress - Sealed derivation request
///
/// Success is the raw sealed response. Any failure is a 500 with an empty
/// body; the cause is only logged here.
pub async fn derive_address(State(state): State<ApiState>, body: Bytes) -> Response {
    match state.service.handle_derive_body(&body) {
        Ok(sealed) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            sealed,
        )
            .into_response(),
        Err(e) => {
            log::error!("deriveAddress failed at {} step: {}", e.step(), e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn parse_multisig_request(body: &[u8]) -> Result<MultisigRequest, (StatusCode, Json<ApiError>)> {
    serde_json::from_slice(body).map_err(|e| {
        log::warn!("multisig request rejected: malformed request: {}", e);
        internal_error(format!("Malformed request: {}", e))
    })
}

fn multisig_rejection(e: MultisigError) -> (StatusCode, Json<ApiError>) {
    log::warn!("multisig request rejected: {}", e);
    internal_error(e.to_string())
}

fn log_warning(response: &MultisigResponse) {
    if let Some(warning) = &response.warning {
        log::warn!("{}", warning);
    }
}

/// POST /multisigAddress - Build an M-of-N redeem script and P2SH address
pub async fn multisig_address(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<MultisigResponse>, (StatusCode, Json<ApiError>)> {
    let request = parse_multisig_request(&body)?;
    let response = state
        .service
        .handle_multisig_request(&request)
        .map_err(multisig_rejection)?;
    log_warning(&response);
    Ok(Json(response))
}

/// POST /v1/genMultiSigP2SHAddress - Older clients send the threshold in `n`
/// and read `ps2hAddress`
pub async fn legacy_multisig_address(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<LegacyMultisigResponse>, (StatusCode, Json<ApiError>)> {
    let request = parse_multisig_request(&body)?;
    let response = state
        .service
        .handle_legacy_multisig_request(&request)
        .map_err(multisig_rejection)?;
    log_warning(&response.response);
    Ok(Json(response))
}
