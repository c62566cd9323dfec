//! CLI commands for the address generator
//!
//! Implements all command handlers for the CLI interface.

use crate::api::{create_router, ApiState};
use crate::config::{ClientConfig, ServerConfig};
use crate::crypto::keys::{public_key_from_hex, ServerIdentity};
use crate::exchange::{
    ApiClient, DeriveResponse, ExchangeService, KeyParams, MultisigRequest, MultisigResponse,
};
use crate::multisig::generate_address;
use std::path::Path;
use std::sync::Arc;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Run the address server until Ctrl+C
pub async fn cmd_serve(config: &ServerConfig) -> CliResult<()> {
    let addr = config.socket_addr()?;

    // Identity exists before the listener accepts anything
    let identity = ServerIdentity::generate();
    let key_hex = identity.public_key_hex();
    let state = ApiState::new(Arc::new(ExchangeService::new(identity)));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on {}", listener.local_addr()?);
    log::info!("Server public key {}", key_hex);

    println!("🚀 Address server starting on http://{}", addr);
    println!("   🔑 Server public key: {}", key_hex);
    println!();
    println!("📖 Available endpoints:");
    println!("   GET  /health            - Health check");
    println!("   ANY  /serverPublicKey   - Server public key");
    println!("   POST /deriveAddress     - Sealed SegWit derivation");
    println!("   POST /multisigAddress   - M-of-N P2SH address");
    println!();

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            println!("\n📴 Shutting down address server...");
        })
        .await?;

    Ok(())
}

/// Fetch and print the server's public key
pub async fn cmd_server_key(config: &ClientConfig) -> CliResult<()> {
    let client = ApiClient::from_config(config);
    let key = client.server_public_key().await?;

    println!("🔑 Server public key at {}", client.base_url());
    println!("   {}", hex::encode(key.serialize()));

    Ok(())
}

/// Derive a SegWit address remotely from a local seed file
pub async fn cmd_derive(
    config: &ClientConfig,
    server_key: Option<&str>,
    seed_file: &Path,
) -> CliResult<DeriveResponse> {
    let params = KeyParams::from_file(seed_file)?;
    let client = ApiClient::from_config(config);

    let server_key = match server_key {
        Some(hex_key) => public_key_from_hex(hex_key)?,
        None => {
            log::info!("Fetching server public key from {}", client.base_url());
            client.server_public_key().await?
        }
    };

    log::info!("Requesting derivation at {}", params.path);
    let response = client.derive_address(&server_key, &params).await?;
    drop(params);

    println!("🔐 Derived address ({})", client.base_url());
    println!("   🔑 Public key: {}", response.public_key);
    println!("   📍 SegWit address: {}", response.segwit_address);

    Ok(response)
}

fn print_multisig(m: usize, n: usize, response: &MultisigResponse) {
    println!("🔏 {}-of-{} multisig", m, n);
    println!("   📍 P2SH address: {}", response.p2sh_address);
    println!("   📜 Redeem script: {}", response.redeem_script_hex);
    if let Some(warning) = &response.warning {
        println!("\n   ⚠️  {}", warning);
    }
}

/// Build a multisig address locally
pub fn cmd_multisig(m: usize, n: usize, public_keys: &str) -> CliResult<MultisigResponse> {
    let address = generate_address(m, n, public_keys)?;
    let response = MultisigResponse::from(&address);
    print_multisig(m, n, &response);
    Ok(response)
}

/// Build a multisig address on the server
pub async fn cmd_remote_multisig(
    config: &ClientConfig,
    m: usize,
    n: usize,
    public_keys: &str,
) -> CliResult<MultisigResponse> {
    let client = ApiClient::from_config(config);
    let response = client
        .multisig_address(&MultisigRequest::new(m, n, public_keys))
        .await?;
    print_multisig(m, n, &response);
    Ok(response)
}
