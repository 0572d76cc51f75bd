//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use clap::Parser;
use tracing::{error, info};
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "snapfeed", about = "Photo sharing with a JSON API and server-rendered pages")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "SNAPFEED_PORT", default_value = "8000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "SNAPFEED_DATABASE", default_value = "snapfeed.db")]
    pub database: String,

    /// Base URL the pages use to reach the JSON API [default: http://127.0.0.1:{port}/api]
    #[arg(long, env = "SNAPFEED_API_URL", value_parser = validate_api_url)]
    pub api_url: Option<Url>,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Set the Secure flag on the session cookie (serve over HTTPS)
    #[arg(long, env = "SNAPFEED_SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn validate_api_url(s: &str) -> Result<Url, String> {
    let url = Url::parse(s).map_err(|e| format!("Invalid API URL {}: {}", s, e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("API URL must use http or https: {}", s));
    }
    Ok(url)
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// The API URL the pages call when none was given.
pub fn default_api_url(port: u16) -> Option<Url> {
    let raw = format!("http://127.0.0.1:{}/api", port);
    match Url::parse(&raw) {
        Ok(url) => Some(url),
        Err(e) => {
            error!(url = %raw, error = %e, "Invalid default API URL");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    jwt_secret: String,
    secure_cookies: bool,
    api_base_url: Url,
) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        secure_cookies,
        api_base_url: Some(api_base_url),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["snapfeed"]).unwrap();
        assert_eq!(args.port, 8000);
        assert_eq!(args.database, "snapfeed.db");
        assert!(args.api_url.is_none());
        assert!(!args.secure_cookies);
    }

    #[test]
    fn test_api_url_validation() {
        assert!(validate_api_url("http://localhost:8000/api").is_ok());
        assert!(validate_api_url("ftp://localhost/api").is_err());
        assert!(validate_api_url("not a url").is_err());
    }

    #[test]
    fn test_default_api_url() {
        assert_eq!(
            default_api_url(9000).unwrap().as_str(),
            "http://127.0.0.1:9000/api"
        );
    }
}
