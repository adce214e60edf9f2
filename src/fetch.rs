use crate::config::Config;
use anyhow::{Context, Result};
use bytes::Bytes;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Retrieves stored raster assets from remote object storage. One client is
/// built at startup and shared; no retries — callers decide whether a failed
/// fetch is fatal (GIF frames) or skippable (archive entries, variants).
#[derive(Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

#[derive(Debug, Error)]
pub enum ImageFetchError {
    #[error("invalid image url: {url}")]
    InvalidUrl { url: String },
    #[error("image too large from {url}")]
    TooLarge { url: String },
    #[error("image fetch failed from {url}: {status}")]
    UpstreamStatus { status: StatusCode, url: String },
    #[error("image fetch failed from {url}")]
    Upstream {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ImageFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_seconds))
            .user_agent("spot-export/0.1")
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            client,
            max_bytes: config.max_image_bytes,
        })
    }

    pub async fn fetch(&self, url: &str) -> Result<Bytes, ImageFetchError> {
        let parsed = Url::parse(url).map_err(|_| ImageFetchError::InvalidUrl {
            url: url.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ImageFetchError::InvalidUrl {
                url: url.to_string(),
            });
        }
        let response =
            self.client
                .get(parsed)
                .send()
                .await
                .map_err(|source| ImageFetchError::Upstream {
                    url: url.to_string(),
                    source,
                })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageFetchError::UpstreamStatus {
                status,
                url: url.to_string(),
            });
        }
        if let Some(length) = response.content_length() {
            if length > self.max_bytes as u64 {
                return Err(ImageFetchError::TooLarge {
                    url: url.to_string(),
                });
            }
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ImageFetchError::Upstream {
                url: url.to_string(),
                source,
            })?;
        if bytes.len() > self.max_bytes {
            return Err(ImageFetchError::TooLarge {
                url: url.to_string(),
            });
        }
        Ok(bytes)
    }
}
