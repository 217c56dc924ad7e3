//! Minting through the NFT contract over JSON-RPC.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use crate::constants::MINT_QUANTITY;

mod bindings {
    #![allow(missing_docs)]

    alloy::sol! {
        #[sol(rpc)]
        interface PromptMintNft {
            function mint(address account, uint256 id, uint256 amount, string memory tokenUri) external;
        }
    }
}

use bindings::PromptMintNft;

/// A failed mint.
#[derive(Debug)]
pub enum ChainError {
    /// The signer key could not be parsed
    InvalidKey(String),
    /// Sending the transaction failed
    Send(String),
    /// Waiting for the receipt failed
    Confirm(String),
    /// The transaction was mined but reverted
    Reverted(String),
}

impl std::fmt::Display for ChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey(msg) => write!(f, "Invalid signer key: {msg}"),
            Self::Send(msg) => write!(f, "Failed to send mint transaction: {msg}"),
            Self::Confirm(msg) => write!(f, "Failed to confirm mint transaction: {msg}"),
            Self::Reverted(hash) => write!(f, "Mint transaction {hash} reverted"),
        }
    }
}

impl std::error::Error for ChainError {}

/// Something that can mint a token for a metadata URI.
#[async_trait]
pub trait Minter: Send + Sync {
    /// Mints `token_id` with the given metadata URI, waits for confirmation
    /// and returns the 0x-prefixed transaction hash.
    async fn mint(&self, token_id: u64, metadata_uri: &str) -> Result<String, ChainError>;
}

/// Connection details for the contract, validated at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct ChainConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: Url,
    /// Hex private key of the signing wallet.
    pub private_key: String,
    /// Deployed NFT contract.
    pub contract_address: Address,
    /// Every token is minted to this address.
    pub recipient: Address,
}

impl std::fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainConfig")
            .field("rpc_url", &self.rpc_url.as_str())
            .field("private_key", &"<redacted>")
            .field("contract_address", &self.contract_address)
            .field("recipient", &self.recipient)
            .finish()
    }
}

/// [Minter] backed by one process-wide signer and contract binding.
pub struct ContractMinter {
    contract: PromptMintNft::PromptMintNftInstance<DynProvider>,
    recipient: Address,
    // One in-flight transaction at a time, so nonces are never handed out twice.
    send_lock: Mutex<()>,
}

impl ContractMinter {
    /// Builds the signer, provider and contract binding.
    pub fn connect(config: &ChainConfig) -> Result<Self, ChainError> {
        let signer: PrivateKeySigner = config
            .private_key
            .trim()
            .parse()
            .map_err(|err| ChainError::InvalidKey(format!("{err}")))?;
        info!("Minting from wallet {}", signer.address());
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(config.rpc_url.clone())
            .erased();
        Ok(Self {
            contract: PromptMintNft::new(config.contract_address, provider),
            recipient: config.recipient,
            send_lock: Mutex::new(()),
        })
    }
}

/// Arguments of the contract's `mint`: recipient, token id, quantity, metadata URI.
fn mint_call(recipient: Address, token_id: u64, metadata_uri: &str) -> PromptMintNft::mintCall {
    PromptMintNft::mintCall {
        account: recipient,
        id: U256::from(token_id),
        amount: U256::from(MINT_QUANTITY),
        tokenUri: metadata_uri.to_string(),
    }
}

#[async_trait]
impl Minter for ContractMinter {
    async fn mint(&self, token_id: u64, metadata_uri: &str) -> Result<String, ChainError> {
        let _guard = self.send_lock.lock().await;
        info!("Minting NFT {token_id} to: {}", self.recipient);
        let call = mint_call(self.recipient, token_id, metadata_uri);
        let pending = self
            .contract
            .call_builder(&call)
            .send()
            .await
            .map_err(|err| ChainError::Send(err.to_string()))?;
        debug!("Mint transaction sent: {}", pending.tx_hash());
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|err| ChainError::Confirm(err.to_string()))?;
        let hash = receipt.transaction_hash.to_string();
        if !receipt.status() {
            return Err(ChainError::Reverted(hash));
        }
        info!("NFT minted, tx hash: {hash}");
        Ok(hash)
    }
}
