use axum::extract::State;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::ClientResult;

pub mod error;
pub mod pages;

/// Static page server for the browser client.
pub struct Server {
    addr: SocketAddr,
    static_root: PathBuf,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Server {
    /// Binds `config.host:config.port` (port 0 picks a free port) and starts
    /// serving in the background.
    pub async fn start(config: &ServerConfig) -> ClientResult<Self> {
        let static_root = config.static_root.canonicalize()?;
        let state = Arc::new(ServerState {
            static_root: static_root.clone(),
        });
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let mut app = Router::new().route("/health", get(health));
        for page in pages::PAGE_ROUTES {
            app = app.route(
                &format!("/{page}"),
                get(move |State(state): State<Arc<ServerState>>| async move {
                    pages::serve_page(&state, page).await
                }),
            );
        }
        let app = app
            .fallback(pages::serve_static)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(cors);

        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            match result {
                Ok(()) => tracing::info!(addr = %addr, "page server stopped"),
                Err(error) => tracing::warn!(addr = %addr, "page server failed: {error}"),
            }
        });

        tracing::info!(addr = %addr, root = %static_root.display(), "page server listening");
        Ok(Server {
            addr,
            static_root,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn static_root(&self) -> &Path {
        &self.static_root
    }

    /// Signals graceful shutdown. Calling it again is a no-op.
    pub fn shutdown(&mut self) {
        if let Some(sender) = self.shutdown.take() {
            if sender.send(()).is_err() {
                tracing::debug!(addr = %self.addr, "page server already stopped");
            }
        }
    }

    /// Signals shutdown and waits for in-flight requests to finish.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn health() -> &'static str {
    "ok"
}

pub(crate) struct ServerState {
    pub(crate) static_root: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::fetcher::{ContentFetcher, HttpFetcher};
    use tempfile::{tempdir, TempDir};

    fn site() -> TempDir {
        let dir = tempdir().expect("tempdir");
        let root = dir.path();
        std::fs::create_dir_all(root.join("pages")).expect("pages");
        std::fs::create_dir_all(root.join("data")).expect("data");
        std::fs::write(root.join("index.html"), "<h1>Multiverse</h1>").expect("index");
        std::fs::write(root.join("pages/characters.html"), "<h1>Characters</h1>").expect("page");
        std::fs::write(
            root.join("data/character.json"),
            r#"{ "id": 1, "name": "Rick Sanchez" }"#,
        )
        .expect("json");
        dir
    }

    async fn start(root: &Path) -> Server {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            static_root: root.to_path_buf(),
        };
        Server::start(&config).await.expect("start")
    }

    #[tokio::test]
    async fn start_binds_random_port() {
        let dir = site();
        let mut server = start(dir.path()).await;
        assert_ne!(server.addr().port(), 0);

        let body = reqwest::get(format!("http://{}/health", server.addr()))
            .await
            .expect("health")
            .text()
            .await
            .expect("body");
        assert_eq!(body, "ok");
        server.shutdown();
        server.shutdown();
    }

    #[tokio::test]
    async fn clean_routes_serve_page_files() {
        let dir = site();
        let server = start(dir.path()).await;
        let base = format!("http://{}", server.addr());

        let response = reqwest::get(format!("{base}/characters")).await.expect("page");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response.headers()[reqwest::header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        assert_eq!(response.text().await.expect("body"), "<h1>Characters</h1>");

        let index = reqwest::get(format!("{base}/")).await.expect("index");
        assert_eq!(index.text().await.expect("body"), "<h1>Multiverse</h1>");
        server.stop().await;
    }

    #[tokio::test]
    async fn missing_page_is_plain_text_not_found() {
        let dir = site();
        let server = start(dir.path()).await;

        let response = reqwest::get(format!("http://{}/episodes", server.addr()))
            .await
            .expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[reqwest::header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(response.text().await.expect("body"), "page not found: episodes");
        server.stop().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn page_linked_outside_root_is_refused() {
        let outside = tempdir().expect("outside");
        std::fs::write(outside.path().join("secret.html"), "secret").expect("secret");
        let dir = site();
        std::os::unix::fs::symlink(
            outside.path().join("secret.html"),
            dir.path().join("pages/episodes.html"),
        )
        .expect("symlink");
        let server = start(dir.path()).await;

        let response = reqwest::get(format!("http://{}/episodes", server.addr()))
            .await
            .expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
        server.stop().await;
    }

    #[tokio::test]
    async fn missing_static_root_fails_to_start() {
        let dir = tempdir().expect("tempdir");
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            static_root: dir.path().join("absent"),
        };
        assert!(Server::start(&config).await.is_err());
    }

    #[tokio::test]
    async fn http_fetcher_maps_responses_from_live_server() {
        let dir = site();
        let server = start(dir.path()).await;
        let base = format!("http://{}", server.addr());
        let fetcher = HttpFetcher::new(None).expect("fetcher");

        let value = fetcher
            .fetch(&format!("{base}/data/character.json"))
            .await
            .expect("json");
        assert_eq!(value["name"], "Rick Sanchez");

        let missing = fetcher
            .fetch(&format!("{base}/data/absent.json"))
            .await
            .expect_err("404");
        assert!(matches!(missing, FetchError::Status { status: 404, .. }));

        let html = fetcher
            .fetch(&format!("{base}/characters"))
            .await
            .expect_err("not json");
        assert!(matches!(html, FetchError::Parse { .. }));
        server.stop().await;
    }
}
