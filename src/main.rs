use std::sync::Arc;

use clap::Parser;
use promptmint::chain::ContractMinter;
use promptmint::config::{base_url, chain_config, openai_api_key, setup_logging};
use promptmint::generation::{GenerationProvider, OpenAiProvider};
use promptmint::storage::ThirdwebStorage;
use promptmint::web::AppState;
use tracing::{error, warn};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = promptmint::cli::CliOptions::parse();

    let _ = setup_logging(cli.debug);

    let chain = match chain_config(&cli) {
        Ok(chain) => chain,
        Err(err) => {
            error!("Refusing to start: {}", err);
            std::process::exit(1);
        }
    };
    let minter = match ContractMinter::connect(&chain) {
        Ok(minter) => minter,
        Err(err) => {
            error!("Refusing to start: {}", err);
            std::process::exit(1);
        }
    };
    let base_url = match base_url(&cli) {
        Ok(url) => url,
        Err(err) => {
            error!("Refusing to start: {}", err);
            std::process::exit(1);
        }
    };

    let http = reqwest::Client::new();
    let provider = match openai_api_key(&cli) {
        Some(key) => {
            Some(Arc::new(OpenAiProvider::new(http.clone(), key)) as Arc<dyn GenerationProvider>)
        }
        None => {
            warn!("OPENAI_API_KEY is not set, /api/generate will fail");
            None
        }
    };
    let storage = ThirdwebStorage::new(
        http.clone(),
        cli.thirdweb_client_id.clone(),
        cli.thirdweb_secret_key.clone(),
    );

    let state = AppState::new(
        http,
        base_url,
        provider,
        Arc::new(storage),
        Arc::new(minter),
    );

    if let Err(err) =
        promptmint::web::setup_server(&cli.listen_address, cli.port, state).await
    {
        error!("Application error: {}", err);
        std::process::exit(1);
    }
}
