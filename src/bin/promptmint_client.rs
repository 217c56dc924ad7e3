use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use promptmint::config::setup_logging;
use promptmint::countdown::Countdown;
use promptmint::history::{FileHistoryStore, History};
use promptmint::models::{
    ErrorBody, GenerateRequest, GenerationResult, MintRequest, MintResponse,
};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Drive a promptmint server from the terminal.
///
/// Minimal UX:
///   promptmint_client generate "a fox reading a newspaper"
///   promptmint_client mint 0
#[derive(Parser, Debug)]
#[command(name = "promptmint_client")]
#[command(about = "Generate images, download them and mint them as NFTs via a promptmint server")]
struct Args {
    /// Base URL of the promptmint server
    #[arg(long, default_value = "http://localhost:3000", env = "PROMPTMINT_SERVER")]
    server: Url,

    /// History file, defaults to ~/.promptmint/history.json
    #[arg(long, env = "PROMPTMINT_HISTORY")]
    history_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an image, title and description from a prompt
    Generate {
        /// The prompt, words are joined with spaces
        #[arg(required = true)]
        prompt: Vec<String>,
    },
    /// Download a history entry's image through the server proxy
    Download {
        /// Position in the history, 0 is the newest
        index: usize,
        /// Where to write the file
        #[arg(long, short, default_value = "downloaded-image.png")]
        out: PathBuf,
    },
    /// Pin a history entry on IPFS and mint it
    Mint {
        /// Position in the history, 0 is the newest
        index: usize,
        /// Token id, random when omitted
        #[arg(long)]
        token_id: Option<u64>,
    },
    /// List, delete or clear past generations
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },
    /// Count down to the expiry of a history entry's image link
    Countdown {
        /// Position in the history, 0 is the newest
        index: usize,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// Delete one entry
    Delete {
        /// Position in the history
        index: usize,
    },
    /// Delete every entry
    Clear,
}

// -----------------------------
// Server calls
// -----------------------------

async fn error_message(resp: reqwest::Response) -> String {
    let status = resp.status();
    match resp.json::<ErrorBody>().await {
        Ok(body) => format!("{status}: {}", body.error),
        Err(_) => format!("{status}: something went wrong"),
    }
}

async fn generate(client: &reqwest::Client, server: &Url, prompt: String) -> Result<GenerationResult> {
    let resp = client
        .post(server.join("/api/generate")?)
        .json(&GenerateRequest { prompt })
        .send()
        .await
        .context("Request to /api/generate failed")?;
    if !resp.status().is_success() {
        bail!("Generation failed, {}", error_message(resp).await);
    }
    resp.json()
        .await
        .context("Failed to parse /api/generate response")
}

async fn download(
    client: &reqwest::Client,
    server: &Url,
    entry: &GenerationResult,
    out: &Path,
) -> Result<usize> {
    let url = Url::parse_with_params(
        server.join("/api/proxy-image")?.as_str(),
        &[("url", entry.image_url.as_str())],
    )?;
    let resp = client
        .get(url)
        .send()
        .await
        .context("Request to /api/proxy-image failed")?;
    if !resp.status().is_success() {
        bail!("Download failed, {}", error_message(resp).await);
    }
    let bytes = resp
        .bytes()
        .await
        .context("Failed reading downloaded image")?;
    fs::write(out, &bytes).with_context(|| format!("Failed to write {}", out.display()))?;
    Ok(bytes.len())
}

async fn mint(
    client: &reqwest::Client,
    server: &Url,
    entry: &GenerationResult,
    token_id: Option<u64>,
) -> Result<MintResponse> {
    let request = MintRequest {
        url: Some(entry.image_url.clone()),
        title: Some(entry.title.clone()),
        description: Some(entry.description.clone()),
        token_id,
    };
    let resp = client
        .post(server.join("/api/mint")?)
        .json(&request)
        .send()
        .await
        .context("Request to /api/mint failed")?;
    if !resp.status().is_success() {
        bail!("Minting failed, {}", error_message(resp).await);
    }
    resp.json().await.context("Failed to parse /api/mint response")
}

// -----------------------------
// Main
// -----------------------------

fn print_entry(index: usize, entry: &GenerationResult) {
    println!("[{index}] {}", entry.title);
    println!("    {}", entry.description);
    println!("    {}", entry.image_url);
    if let Some(token_id) = entry.token_id {
        println!("    minted as token {token_id}");
    }
    if let Some(created_at) = entry.created_at {
        println!("    created {}", created_at.to_rfc3339());
    }
}

fn entry(history: &History<FileHistoryStore>, index: usize) -> Result<GenerationResult> {
    history
        .get(index)
        .cloned()
        .ok_or_else(|| anyhow!("No history entry at index {index}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _ = setup_logging(args.debug);

    let store = FileHistoryStore::new(
        args.history_file
            .clone()
            .unwrap_or_else(FileHistoryStore::default_path),
    );
    let mut history = History::load(store);
    let client = reqwest::Client::new();

    match args.command {
        Command::Generate { prompt } => {
            let mut result = generate(&client, &args.server, prompt.join(" ")).await?;
            result.created_at = Some(Utc::now());
            print_entry(0, &result);
            history.record(result).context("Failed to save history")?;
        }
        Command::Download { index, out } => {
            let entry = entry(&history, index)?;
            let written = download(&client, &args.server, &entry, &out).await?;
            eprintln!("Saved: {} ({written} bytes)", out.display());
        }
        Command::Mint { index, token_id } => {
            let entry = entry(&history, index)?;
            let minted = mint(&client, &args.server, &entry, token_id).await?;
            println!("{}", minted.message);
            println!("Transaction: {}", minted.transaction_hash);
            println!("Token id: {}", minted.token_id);
            history
                .set_token_id(index, minted.token_id)
                .context("Failed to save history")?;
        }
        Command::History { action: None } => {
            if history.entries().is_empty() {
                println!("No generations yet.");
            }
            for (index, entry) in history.entries().iter().enumerate() {
                print_entry(index, entry);
            }
        }
        Command::History {
            action: Some(HistoryAction::Delete { index }),
        } => match history.remove(index).context("Failed to save history")? {
            Some(removed) => println!("Deleted \"{}\"", removed.title),
            None => bail!("No history entry at index {index}"),
        },
        Command::History {
            action: Some(HistoryAction::Clear),
        } => {
            history.clear().context("Failed to clear history")?;
            println!("History cleared.");
        }
        Command::Countdown { index } => {
            let entry = entry(&history, index)?;
            let countdown = Countdown::from_url(&entry.image_url);
            countdown
                .run(Utc::now, |state| println!("{state}"))
                .await;
        }
    }
    Ok(())
}
