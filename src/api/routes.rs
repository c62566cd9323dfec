//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use axum::{
    routing::{any, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/serverPublicKey", any(handlers::server_public_key))
        .route("/deriveAddress", post(handlers::derive_address))
        .route("/multisigAddress", post(handlers::multisig_address))
        // Paths used by older clients
        .route("/v1/serverPublicKeys", any(handlers::server_public_key))
        .route(
            "/v1/genPublicKeyAndSegWitAddress",
            post(handlers::derive_address),
        )
        .route(
            "/v1/genMultiSigP2SHAddress",
            post(handlers::legacy_multisig_address),
        )
        .with_state(state)
        .layer(cors)
}
