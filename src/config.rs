//! Config handling

use alloy::primitives::Address;
use tracing::log::LevelFilter;
use url::Url;

use crate::chain::ChainConfig;
use crate::cli::CliOptions;

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("alloy_transport_http", LevelFilter::Info)
            .with_module_level("alloy_rpc_client", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// Problems with the startup configuration.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Required settings that were not provided
    Missing(Vec<&'static str>),
    /// A setting that was provided but could not be parsed
    Invalid(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(names) => write!(f, "Missing one of: {}", names.join(", ")),
            Self::Invalid(name, err) => write!(f, "Invalid {name}: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn required(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_address(name: &'static str, value: &str) -> Result<Address, ConfigError> {
    value
        .parse::<Address>()
        .map_err(|err| ConfigError::Invalid(name, err.to_string()))
}

/// Pulls the chain settings out of the CLI options. All four are required.
pub fn chain_config(options: &CliOptions) -> Result<ChainConfig, ConfigError> {
    let rpc_url = required(options.rpc_url.as_ref());
    let private_key = required(options.private_key.as_ref());
    let contract_address = required(options.contract_address.as_ref());
    let minter_address = required(options.minter_address.as_ref());

    let (Some(rpc_url), Some(private_key), Some(contract_address), Some(minter_address)) =
        (rpc_url, private_key, contract_address, minter_address)
    else {
        let missing = [
            ("RPC_URL", rpc_url.is_none()),
            ("PRIVATE_KEY", private_key.is_none()),
            ("CONTRACT_ADDRESS", contract_address.is_none()),
            ("MINTER_ADDRESS", minter_address.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();
        return Err(ConfigError::Missing(missing));
    };

    Ok(ChainConfig {
        rpc_url: Url::parse(rpc_url)
            .map_err(|err| ConfigError::Invalid("RPC_URL", err.to_string()))?,
        private_key: private_key.to_string(),
        contract_address: parse_address("CONTRACT_ADDRESS", contract_address)?,
        recipient: parse_address("MINTER_ADDRESS", minter_address)?,
    })
}

/// Parses the base URL used for relative image paths.
pub fn base_url(options: &CliOptions) -> Result<Url, ConfigError> {
    Url::parse(options.base_url.trim())
        .map_err(|err| ConfigError::Invalid("NEXT_PUBLIC_BASE_URL", err.to_string()))
}

/// The OpenAI key, if one was configured.
pub fn openai_api_key(options: &CliOptions) -> Option<String> {
    required(options.openai_api_key.as_ref()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
    const RECIPIENT: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn options(args: &[&str]) -> CliOptions {
        let mut argv = vec!["promptmint"];
        argv.extend_from_slice(args);
        CliOptions::try_parse_from(argv).expect("parse cli")
    }

    #[test]
    fn reports_every_missing_chain_setting() {
        let opts = options(&["--rpc-url", "http://127.0.0.1:8545"]);
        let Err(ConfigError::Missing(missing)) = chain_config(&opts) else {
            panic!("expected missing settings");
        };
        assert_eq!(
            missing,
            vec!["PRIVATE_KEY", "CONTRACT_ADDRESS", "MINTER_ADDRESS"]
        );
    }

    #[test]
    fn blank_values_count_as_missing() {
        let opts = options(&[
            "--rpc-url",
            "http://127.0.0.1:8545",
            "--private-key",
            "  ",
            "--contract-address",
            CONTRACT,
            "--minter-address",
            RECIPIENT,
        ]);
        assert_eq!(
            chain_config(&opts),
            Err(ConfigError::Missing(vec!["PRIVATE_KEY"]))
        );
    }

    #[test]
    fn rejects_malformed_addresses() {
        let opts = options(&[
            "--rpc-url",
            "http://127.0.0.1:8545",
            "--private-key",
            "0x01",
            "--contract-address",
            "not-an-address",
            "--minter-address",
            RECIPIENT,
        ]);
        assert!(matches!(
            chain_config(&opts),
            Err(ConfigError::Invalid("CONTRACT_ADDRESS", _))
        ));
    }

    #[test]
    fn builds_chain_config() {
        let opts = options(&[
            "--rpc-url",
            "http://127.0.0.1:8545",
            "--private-key",
            "0x01",
            "--contract-address",
            CONTRACT,
            "--minter-address",
            RECIPIENT,
        ]);
        let config = chain_config(&opts).expect("config");
        assert_eq!(config.recipient, parse_address("x", RECIPIENT).expect("addr"));
        assert_eq!(config.rpc_url.port(), Some(8545));
    }

    #[test]
    fn base_url_defaults_to_localhost() {
        let opts = options(&[]);
        let url = base_url(&opts).expect("base url");
        assert_eq!(url.as_str(), "http://localhost:3000/");
    }
}
