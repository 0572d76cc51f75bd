pub mod api;
pub mod auth;
pub mod bridge;
pub mod cleanup;
pub mod cli;
pub mod client;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod session;
pub mod validation;
pub mod web;

use api::create_api_router;
use axum::Router;
use client::ApiClient;
use db::Database;
use jwt::JwtConfig;
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use url::Url;
use web::WebState;

/// API root used when the configuration does not name one.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Where the pages reach the JSON API. `None` means [`DEFAULT_API_URL`],
    /// or this server's own `/api` when started through [`start_server`].
    pub api_base_url: Option<Url>,
}

#[derive(Debug)]
pub enum ServerError {
    Io(std::io::Error),
    /// The outbound HTTP client could not be built.
    Client(reqwest::Error),
    /// The default API root did not parse.
    ApiUrl(url::ParseError),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Io(e) => write!(f, "I/O error: {}", e),
            ServerError::Client(e) => write!(f, "Failed to build HTTP client: {}", e),
            ServerError::ApiUrl(e) => write!(f, "Invalid API URL: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(e: std::io::Error) -> Self {
        ServerError::Io(e)
    }
}

impl From<reqwest::Error> for ServerError {
    fn from(e: reqwest::Error) -> Self {
        ServerError::Client(e)
    }
}

impl From<url::ParseError> for ServerError {
    fn from(e: url::ParseError) -> Self {
        ServerError::ApiUrl(e)
    }
}

/// Create the application router: the JSON API under `/api` and the pages at the root.
pub fn create_app(config: &ServerConfig) -> Result<Router, ServerError> {
    let jwt = Arc::new(JwtConfig::new(&config.jwt_secret));
    let rate_limit_config = Arc::new(RateLimitConfig::new());

    let api_router = create_api_router(config.db.clone(), jwt, rate_limit_config);

    let api_base = match &config.api_base_url {
        Some(url) => url.clone(),
        None => Url::parse(DEFAULT_API_URL)?,
    };
    let web_state = WebState {
        db: config.db.clone(),
        api: ApiClient::new(api_base)?,
        secure_cookies: config.secure_cookies,
    };

    Ok(Router::new()
        .nest("/api", api_router)
        .merge(web::router(web_state)))
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(db: &Database) {
    cleanup::run_cleanup(db).await;
    cleanup::spawn_cleanup_scheduler(db.clone());
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), ServerError> {
    let app = create_app(&config)?;
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await?;
    Ok(())
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    mut config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), ServerError> {
    // Run cleanup tasks on startup
    init_cleanup(&config.db).await;

    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    if config.api_base_url.is_none() {
        config.api_base_url = Url::parse(&format!("http://{}/api", local_addr)).ok();
    }

    // Build before spawning so configuration errors reach the caller
    let app = create_app(&config)?;
    let handle = tokio::spawn(async move {
        let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
        if let Err(e) = axum::serve(listener, make_service).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
