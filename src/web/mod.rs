//! HTTP surface: generation, minting and the download proxy.

use std::num::NonZeroU16;
use std::sync::Arc;

use axum::Router;
use tracing::{error, info};
use url::Url;

use crate::chain::Minter;
use crate::generation::GenerationProvider;
use crate::storage::StorageClient;

mod api;
mod images;
mod prelude;

use api::{generate_handler, mint_handler};
use images::proxy_image_handler;

/// Shared handler state. The collaborators are trait objects so tests can
/// swap in fakes.
#[derive(Clone)]
pub struct AppState {
    http: reqwest::Client,
    base_url: Url,
    provider: Option<Arc<dyn GenerationProvider>>,
    storage: Arc<dyn StorageClient>,
    minter: Arc<dyn Minter>,
}

impl AppState {
    /// `provider` is `None` when no API key was configured; generation
    /// requests then fail without touching the network.
    pub fn new(
        http: reqwest::Client,
        base_url: Url,
        provider: Option<Arc<dyn GenerationProvider>>,
        storage: Arc<dyn StorageClient>,
        minter: Arc<dyn Minter>,
    ) -> Self {
        Self {
            http,
            base_url,
            provider,
            storage,
            minter,
        }
    }
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/generate", axum::routing::post(generate_handler))
        .route("/api/mint", axum::routing::post(mint_handler))
        .route("/api/proxy-image", axum::routing::get(proxy_image_handler))
}

/// Binds the listener and serves until the process is stopped.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    state: AppState,
) -> Result<(), anyhow::Error> {
    let app = create_router().with_state(state);

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", err);
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::constants::MAX_RANDOM_TOKEN_ID;
    use crate::generation::ProviderError;
    use crate::generation::tests::FakeProvider;
    use crate::minting::tests::{FakeMinter, FakeStorage};
    use crate::models::{GenerationResult, MintResponse, NftMetadata};

    const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-image";

    struct Harness {
        provider: Option<Arc<FakeProvider>>,
        storage: Arc<FakeStorage>,
        minter: Arc<FakeMinter>,
        base_url: Url,
    }

    impl Harness {
        fn new(provider: Option<FakeProvider>) -> Self {
            Self {
                provider: provider.map(Arc::new),
                storage: Arc::new(FakeStorage::default()),
                minter: Arc::new(FakeMinter::default()),
                base_url: Url::parse("http://127.0.0.1:9").expect("base url"),
            }
        }

        fn app(&self) -> Router {
            let provider = self
                .provider
                .clone()
                .map(|provider| provider as Arc<dyn GenerationProvider>);
            let state = AppState::new(
                reqwest::Client::new(),
                self.base_url.clone(),
                provider,
                self.storage.clone(),
                self.minter.clone(),
            );
            create_router().with_state(state)
        }
    }

    /// Serves `/images/fox.png` and a failing `/broken.png` on an ephemeral port.
    async fn spawn_upstream() -> String {
        let router = Router::new()
            .route(
                "/images/fox.png",
                get(|| async { ([(CONTENT_TYPE, "image/png")], PNG_BYTES) }),
            )
            .route(
                "/raw",
                get(|| async { Body::from("raw-bytes") }),
            )
            .route(
                "/broken.png",
                get(|| async { StatusCode::NOT_FOUND }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind upstream");
        let addr = listener.local_addr().expect("upstream addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{addr}")
    }

    async fn read_bytes(response: axum::response::Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes()
            .to_vec()
    }

    async fn read_json<T: for<'de> serde::Deserialize<'de>>(
        response: axum::response::Response,
    ) -> T {
        serde_json::from_slice(&read_bytes(response).await).expect("json body")
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_uri(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn generate_returns_complete_result() {
        let harness = Harness::new(Some(FakeProvider::succeeding(
            "https://img.example/fox.png?se=2030-01-01T00%3A00%3A00Z",
        )));
        let response = harness
            .app()
            .oneshot(post_json("/api/generate", serde_json::json!({"prompt": "a fox"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: GenerationResult = read_json(response).await;
        assert!(!body.image_url.is_empty());
        assert_eq!(body.description, "A generated text");
        assert_eq!(body.title, "A generated text");
    }

    #[tokio::test]
    async fn generate_without_api_key_is_a_server_error() {
        let harness = Harness::new(None);
        let response = harness
            .app()
            .oneshot(post_json("/api/generate", serde_json::json!({"prompt": "a fox"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = read_json(response).await;
        assert_eq!(body["error"], "API key is missing");
    }

    #[tokio::test]
    async fn generate_gives_up_after_three_server_errors() {
        let harness = Harness::new(Some(FakeProvider::new(
            Some("text"),
            vec![Err(ProviderError::status(
                StatusCode::INTERNAL_SERVER_ERROR,
                "overloaded",
            ))],
        )));
        let response = harness
            .app()
            .oneshot(post_json("/api/generate", serde_json::json!({"prompt": "a fox"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = read_json(response).await;
        assert_eq!(body["error"], "Server error. Please try again later.");
        let provider = harness.provider.as_ref().expect("provider");
        assert_eq!(provider.image_calls(), 3);
    }

    #[tokio::test]
    async fn generate_fails_fast_on_client_errors() {
        let harness = Harness::new(Some(FakeProvider::new(
            Some("text"),
            vec![Err(ProviderError::status(
                StatusCode::BAD_REQUEST,
                "content policy",
            ))],
        )));
        let response = harness
            .app()
            .oneshot(post_json("/api/generate", serde_json::json!({"prompt": "a fox"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = read_json(response).await;
        assert_eq!(body["error"], "Something went wrong.");
        assert!(!body["error"].as_str().unwrap_or_default().contains("policy"));
        let provider = harness.provider.as_ref().expect("provider");
        assert_eq!(provider.image_calls(), 1);
    }

    #[tokio::test]
    async fn mint_without_title_touches_nothing() {
        let harness = Harness::new(None);
        let response = harness
            .app()
            .oneshot(post_json(
                "/api/mint",
                serde_json::json!({"url": "/images/fox.png", "description": "a fox"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = read_json(response).await;
        assert_eq!(body["error"], "Missing required fields");
        assert_eq!(harness.storage.upload_count(), 0);
        assert_eq!(harness.minter.call_count(), 0);
    }

    #[tokio::test]
    async fn mint_uploads_then_mints_with_supplied_token_id() {
        let upstream = spawn_upstream().await;
        let mut harness = Harness::new(None);
        harness.base_url = Url::parse(&upstream).expect("upstream url");

        let response = harness
            .app()
            .oneshot(post_json(
                "/api/mint",
                serde_json::json!({
                    "url": "/images/fox.png",
                    "title": "Fox",
                    "description": "a fox",
                    "tokenId": 42
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: MintResponse = read_json(response).await;
        assert_eq!(body.token_id, 42);
        assert!(body.transaction_hash.starts_with("0x"));
        assert_eq!(body.message, "NFT minted successfully");

        let uploads = harness.storage.uploads.lock().expect("lock").clone();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].name, "fox.png");
        assert_eq!(uploads[0].content_type, "image/png");
        assert_eq!(uploads[0].bytes, PNG_BYTES);

        let metadata: NftMetadata = serde_json::from_slice(&uploads[1].bytes).expect("metadata");
        assert_eq!(uploads[1].name, "42.json");
        assert_eq!(metadata.image, "ipfs://QmFake/fox.png");
        assert_eq!(metadata.name, "Fox");
        assert_eq!(metadata.properties.token_id, 42);

        let calls = harness.minter.calls.lock().expect("lock").clone();
        assert_eq!(calls, vec![(42, "ipfs://QmFake/42.json".to_string())]);
    }

    #[tokio::test]
    async fn mint_picks_a_random_token_id() {
        let upstream = spawn_upstream().await;
        let harness = Harness::new(None);

        let response = harness
            .app()
            .oneshot(post_json(
                "/api/mint",
                serde_json::json!({
                    "url": format!("{upstream}/images/fox.png"),
                    "title": "Fox",
                    "description": "a fox"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: MintResponse = read_json(response).await;
        assert!(body.token_id < MAX_RANDOM_TOKEN_ID);
        let calls = harness.minter.calls.lock().expect("lock").clone();
        assert_eq!(calls[0].0, body.token_id);
    }

    #[tokio::test]
    async fn mint_chain_failure_is_generic_and_keeps_uploads() {
        let upstream = spawn_upstream().await;
        let mut harness = Harness::new(None);
        harness.minter = Arc::new(FakeMinter::failing());

        let response = harness
            .app()
            .oneshot(post_json(
                "/api/mint",
                serde_json::json!({
                    "url": format!("{upstream}/images/fox.png"),
                    "title": "Fox",
                    "description": "a fox"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = read_json(response).await;
        assert_eq!(body["error"], "Something went wrong during minting.");
        assert_eq!(harness.storage.upload_count(), 2);
        assert_eq!(harness.minter.call_count(), 1);
    }

    #[tokio::test]
    async fn mint_upload_failure_never_reaches_the_chain() {
        let upstream = spawn_upstream().await;
        let mut harness = Harness::new(None);
        harness.storage = Arc::new(FakeStorage::failing());

        let response = harness
            .app()
            .oneshot(post_json(
                "/api/mint",
                serde_json::json!({
                    "url": format!("{upstream}/images/fox.png"),
                    "title": "Fox",
                    "description": "a fox"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = read_json(response).await;
        assert_eq!(body["error"], "Something went wrong during minting.");
        assert_eq!(harness.minter.call_count(), 0);
    }

    #[tokio::test]
    async fn proxy_returns_upstream_bytes_as_attachment() {
        let upstream = spawn_upstream().await;
        let harness = Harness::new(None);

        let response = harness
            .app()
            .oneshot(get_uri(&format!(
                "/api/proxy-image?url={upstream}/images/fox.png"
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "image/png");
        assert_eq!(
            response.headers().get(CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"downloaded-image.png\""
        );
        assert_eq!(read_bytes(response).await, PNG_BYTES);
    }

    #[tokio::test]
    async fn proxy_defaults_content_type() {
        let upstream = spawn_upstream().await;
        let harness = Harness::new(None);

        let response = harness
            .app()
            .oneshot(get_uri(&format!("/api/proxy-image?url={upstream}/raw")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/octet-stream"
        );
        assert_eq!(read_bytes(response).await, b"raw-bytes");
    }

    #[tokio::test]
    async fn proxy_without_url_is_a_bad_request() {
        let harness = Harness::new(None);
        let response = harness
            .app()
            .oneshot(get_uri("/api/proxy-image"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = read_json(response).await;
        assert_eq!(body["error"], "Missing image URL");
    }

    #[tokio::test]
    async fn proxy_upstream_failure_is_a_server_error() {
        let upstream = spawn_upstream().await;
        let harness = Harness::new(None);

        let response = harness
            .app()
            .oneshot(get_uri(&format!(
                "/api/proxy-image?url={upstream}/broken.png"
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = read_json(response).await;
        assert_eq!(body["error"], "Failed to fetch image");
    }

    #[tokio::test]
    async fn mint_with_mistyped_fields_answers_json_error() {
        for body in [
            serde_json::json!({"url": "/a.png", "title": "t", "description": "d", "tokenId": "42"}),
            serde_json::json!({"url": "/a.png", "title": "t", "description": "d", "tokenId": -1}),
            serde_json::json!({"url": 5, "title": "t", "description": "d"}),
        ] {
            let harness = Harness::new(None);
            let response = harness
                .app()
                .oneshot(post_json("/api/mint", body))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(
                response.headers().get(CONTENT_TYPE).unwrap(),
                "application/json"
            );
            let body: serde_json::Value = read_json(response).await;
            assert_eq!(body["error"], "Something went wrong during minting.");
            assert_eq!(harness.storage.upload_count(), 0);
            assert_eq!(harness.minter.call_count(), 0);
        }
    }

    #[tokio::test]
    async fn generate_with_unreadable_body_answers_json_error() {
        let harness = Harness::new(Some(FakeProvider::succeeding(
            "https://img.example/fox.png",
        )));
        let request = Request::builder()
            .method("POST")
            .uri("/api/generate")
            .body(Body::from("not json"))
            .unwrap();
        let response = harness.app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body: serde_json::Value = read_json(response).await;
        assert_eq!(body["error"], "Invalid request body");
        let provider = harness.provider.as_ref().expect("provider");
        assert_eq!(provider.image_calls(), 0);
    }
}
