//! REST API module
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `ANY /serverPublicKey` - Server public key (`{"publicKey": hex}`)
//! - `POST /deriveAddress` - Sealed derivation request, raw sealed response
//! - `POST /multisigAddress` - M-of-N redeem script and P2SH address
//!
//! The `/v1/...` paths of earlier releases are routed to the same handlers.

pub mod handlers;
pub mod routes;

pub use handlers::{ApiError, ApiState};
pub use routes::create_router;
