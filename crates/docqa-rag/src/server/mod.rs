//! HTTP server for the document QA pipeline

pub mod routes;
pub mod state;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use state::AppState;

/// Document QA HTTP server
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    /// Create a server with the backends selected in `config`
    pub fn new(config: RagConfig) -> Result<Self> {
        let pipeline = Pipeline::from_config(config.clone())?;
        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Create a server around an existing pipeline
    pub fn with_pipeline(config: RagConfig, pipeline: Pipeline) -> Self {
        Self {
            config,
            state: AppState::new(pipeline),
        }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/health", get(health_check))
            .nest("/api", routes::api_routes(self.config.server.max_upload_size))
            .with_state(self.state.clone())
            // Applied bottom to top
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new());

        if self.config.server.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router.layer(cors)
        } else {
            router
        }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.build_router();

        tracing::info!("Starting document QA server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingBackend;
    use crate::providers::{AnswerComposer, HashEmbedder};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "docqa-test-boundary";

    struct EchoComposer;

    #[async_trait]
    impl AnswerComposer for EchoComposer {
        async fn compose(&self, prompt: &str) -> Result<String> {
            Ok(format!("{} chars of prompt", prompt.chars().count()))
        }

        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-1"
        }
    }

    fn router(dir: &TempDir) -> Router {
        let mut config = RagConfig::default();
        config.storage.root = dir.path().to_path_buf();
        config.embeddings.backend = EmbeddingBackend::Hash;
        config.embeddings.dimensions = 64;

        let pipeline = Pipeline::new(
            config.clone(),
            Arc::new(HashEmbedder::new(64).unwrap()),
            Arc::new(EchoComposer),
        )
        .unwrap();
        RagServer::with_pipeline(config, pipeline).build_router()
    }

    /// Files as `(filename, content type, content)`
    fn multipart_body(files: &[(&str, &str, &str)]) -> Body {
        let mut body = String::new();
        for (name, mime, content) in files {
            body.push_str(&format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{n}\"\r\nContent-Type: {m}\r\n\r\n{c}\r\n",
                b = BOUNDARY,
                n = name,
                m = mime,
                c = content
            ));
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));
        Body::from(body)
    }

    fn upload(uri: &str, files: &[(&str, &str, &str)]) -> Request<Body> {
        Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(multipart_body(files))
            .unwrap()
    }

    fn ask(store: &str, question: &str) -> Request<Body> {
        Request::post(format!("/api/stores/{}/ask", store))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "question": question }).to_string(),
            ))
            .unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let response = router(&dir)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ask_before_ingest_is_not_found() {
        let dir = TempDir::new().unwrap();
        let response = router(&dir).oneshot(ask("demo", "Anything?")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json(response).await;
        assert_eq!(body["error"]["type"], "index_unavailable");
        assert_eq!(body["error"]["hint"], "please ingest documents first");
    }

    #[tokio::test]
    async fn test_ingest_then_ask() {
        let dir = TempDir::new().unwrap();
        let app = router(&dir);

        let response = app
            .clone()
            .oneshot(upload(
                "/api/stores/demo/ingest",
                &[(
                    "alice.txt",
                    "text/plain",
                    "Alice works at Acme as a data engineer.",
                )],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let report = json(response).await;
        assert_eq!(report["chunks_indexed"], 1);
        assert_eq!(report["persisted"], true);

        let response = app.oneshot(ask("demo", "Where does Alice work?")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let answer = json(response).await;
        assert!(answer["answer"].as_str().unwrap().ends_with("chars of prompt"));
        assert_eq!(answer["sources"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_rejected() {
        let dir = TempDir::new().unwrap();
        let response = router(&dir)
            .oneshot(upload("/api/stores/demo/ingest", &[("archive.zip", "application/zip", "PK")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_info() {
        let dir = TempDir::new().unwrap();
        let response = router(&dir)
            .oneshot(Request::get("/api/info").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["settings"]["top_k"], 4);
        assert_eq!(body["settings"]["prompt_profile"], "document-qa/v1");
    }
}
