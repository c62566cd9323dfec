//! Encrypted derivation exchange
//!
//! A derivation request travels as
//!
//! ```text
//! client                                   server
//!   seal(server_pk, channel_pk || {SEED, PATH})  ──▶  open, derive
//!   open(channel_sk, response)               ◀──  seal(channel_pk, {publicKey, segwitAddress})
//! ```
//!
//! The channel key is generated per request and discarded after the
//! response is opened.

pub mod client;
pub mod protocol;
pub mod service;

pub use client::{open_response, seal_request, ApiClient, ClientError};
pub use protocol::{
    DeriveRequest, DeriveResponse, KeyParams, LegacyMultisigResponse, MultisigRequest,
    MultisigResponse, ProtocolError, ServerKeyResponse,
};
pub use service::{ExchangeError, ExchangeService};
