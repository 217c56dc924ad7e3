//! CLI parser
use clap::Parser;
use std::num::NonZeroU16;

use crate::constants::DEFAULT_BASE_URL;

#[derive(Parser, Debug, Clone)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "PROMPTMINT_DEBUG")]
    /// Enable debug logging. Env: PROMPTMINT_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "3000", env = "PROMPTMINT_PORT")]
    /// http listener, defaults to `3000`.
    /// Env: PROMPTMINT_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "PROMPTMINT_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: PROMPTMINT_LISTEN_ADDRESS
    pub listen_address: String,
    #[clap(long, short, default_value = DEFAULT_BASE_URL, env = "NEXT_PUBLIC_BASE_URL")]
    /// Base URL relative image paths are resolved against.
    /// Env: NEXT_PUBLIC_BASE_URL
    pub base_url: String,

    #[clap(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    /// OpenAI API key. Generation requests fail without it.
    /// Env: OPENAI_API_KEY
    pub openai_api_key: Option<String>,

    #[clap(long, env = "THIRDWEB_CLIENT_ID")]
    /// thirdweb storage client id. Env: THIRDWEB_CLIENT_ID
    pub thirdweb_client_id: Option<String>,
    #[clap(long, env = "THIRDWEB_SECRET_KEY", hide_env_values = true)]
    /// thirdweb storage secret key. Env: THIRDWEB_SECRET_KEY
    pub thirdweb_secret_key: Option<String>,

    #[clap(long, env = "RPC_URL")]
    /// JSON-RPC endpoint of the chain. Env: RPC_URL
    pub rpc_url: Option<String>,
    #[clap(long, env = "PRIVATE_KEY", hide_env_values = true)]
    /// Private key of the minting wallet. Env: PRIVATE_KEY
    pub private_key: Option<String>,
    #[clap(long, env = "CONTRACT_ADDRESS")]
    /// Address of the NFT contract. Env: CONTRACT_ADDRESS
    pub contract_address: Option<String>,
    #[clap(long, env = "MINTER_ADDRESS")]
    /// Address that receives minted tokens. Env: MINTER_ADDRESS
    pub minter_address: Option<String>,
}
