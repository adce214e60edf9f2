use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Public site origin used in caption attribution links.
    pub base_url: String,
    pub db_path: PathBuf,
    pub fetch_timeout_seconds: u64,
    pub max_image_bytes: usize,
    pub max_in_flight_requests: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_u16("PORT", 8080);
        let base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "https://createspot.app".to_string())
            .trim_end_matches('/')
            .to_string();
        let db_path =
            PathBuf::from(env::var("DB_PATH").unwrap_or_else(|_| "data/spot.db".to_string()));
        let fetch_timeout_seconds = parse_u64("FETCH_TIMEOUT_SECONDS", 30);
        let max_image_bytes = parse_usize("MAX_IMAGE_BYTES", 20 * 1024 * 1024);
        let max_in_flight_requests = parse_usize("MAX_IN_FLIGHT_REQUESTS", 64);
        Ok(Self {
            host,
            port,
            base_url,
            db_path,
            fetch_timeout_seconds,
            max_image_bytes,
            max_in_flight_requests,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            base_url: "https://example.com".to_string(),
            db_path: PathBuf::from(":memory:"),
            fetch_timeout_seconds: 5,
            max_image_bytes: 20 * 1024 * 1024,
            max_in_flight_requests: 8,
        }
    }
}

fn parse_u16(key: &str, default: u16) -> u16 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
