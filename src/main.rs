//! Bitcoin address generator CLI
//!
//! Runs the address server or talks to one.

use bitcoin_address_generator::cli;
use bitcoin_address_generator::config::{ClientConfig, ServerConfig, DEFAULT_PORT};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "addrgen")]
#[command(version = "0.1.0")]
#[command(about = "Remote HD SegWit derivation and multisig P2SH addresses", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Server location for client commands
#[derive(Args)]
struct ServerTarget {
    /// Server host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

impl ServerTarget {
    fn config(&self) -> Result<ClientConfig, Box<dyn std::error::Error>> {
        Ok(ClientConfig::new(self.host.as_str(), self.port)?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the address server
    Serve {
        /// Interface to listen on
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,

        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },

    /// Print a server's public key
    ServerKey {
        #[command(flatten)]
        target: ServerTarget,
    },

    /// Derive a SegWit address from a seed file via the server
    Derive {
        #[command(flatten)]
        target: ServerTarget,

        /// Server public key (hex); fetched from the server when omitted
        #[arg(long)]
        server_key: Option<String>,

        /// JSON file with {"SEED": hex, "PATH": {...}}
        #[arg(short, long)]
        seed_file: PathBuf,
    },

    /// Build an M-of-N P2SH address locally
    Multisig {
        /// Required signatures
        #[arg(short)]
        m: usize,

        /// Total keys
        #[arg(short)]
        n: usize,

        /// Comma-separated uncompressed public keys (hex)
        #[arg(long)]
        public_keys: String,
    },

    /// Build an M-of-N P2SH address on the server
    RemoteMultisig {
        #[command(flatten)]
        target: ServerTarget,

        /// Required signatures
        #[arg(short)]
        m: usize,

        /// Total keys
        #[arg(short)]
        n: usize,

        /// Comma-separated uncompressed public keys (hex)
        #[arg(long)]
        public_keys: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    run(Cli::parse())
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        match cli.command {
            Commands::Serve { bind, port } => {
                cli::cmd_serve(&ServerConfig::new(bind, port)).await?;
            }

            Commands::ServerKey { target } => {
                cli::cmd_server_key(&target.config()?).await?;
            }

            Commands::Derive {
                target,
                server_key,
                seed_file,
            } => {
                cli::cmd_derive(&target.config()?, server_key.as_deref(), &seed_file).await?;
            }

            Commands::Multisig { m, n, public_keys } => {
                cli::cmd_multisig(m, n, &public_keys)?;
            }

            Commands::RemoteMultisig {
                target,
                m,
                n,
                public_keys,
            } => {
                cli::cmd_remote_multisig(&target.config()?, m, n, &public_keys).await?;
            }
        }

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}
