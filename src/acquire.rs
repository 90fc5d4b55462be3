//! Image acquisition as an ordered chain of strategies.
//!
//! Each strategy turns the caller's URL into one [`FetchRequest`]; the chain
//! stops at the first request that yields an image. Every failure is logged
//! and swallowed, so the only visible outcome of a fully failed chain is
//! `None`.

use crate::config::ExtractorConfig;
use crate::error::AcquireError;
use bytes::Bytes;
use futures::future::{Either, select};
use futures_timer::Delay;
use image::DynamicImage;
use std::time::Duration;
use url::Url;

/// One attempt at fetching image data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    /// Ask for readable pixels (`cors` mode in a browser). Without it the image
    /// may load but its pixels stay unreadable.
    pub cross_origin: bool,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// What a fetcher hands back.
#[derive(Debug, Clone)]
pub enum LoadedImage {
    /// Encoded bytes (PNG, JPEG, ...) still to be decoded.
    Encoded(Bytes),
    /// Already decoded pixels.
    Decoded(DynamicImage),
    /// Displayable but pixel access is denied.
    Opaque,
}

/// Capability to fetch image data. Implemented by [`crate::HttpFetcher`] for
/// real traffic; tests supply their own.
#[allow(async_fn_in_trait)]
pub trait ImageFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<LoadedImage, AcquireError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionStrategy {
    /// Load the URL asking for readable pixels.
    Direct,
    /// Load the URL without asking for cross-origin access.
    NoCors,
    /// Load a small copy through the resize relay. Remote URLs only.
    Proxy,
}

impl AcquisitionStrategy {
    pub const CHAIN: [AcquisitionStrategy; 3] = [
        AcquisitionStrategy::Direct,
        AcquisitionStrategy::NoCors,
        AcquisitionStrategy::Proxy,
    ];

    /// The request this strategy would issue for `url`, or `None` when the
    /// strategy does not apply.
    pub fn request(self, url: &str, config: &ExtractorConfig) -> Option<FetchRequest> {
        let timeout = config.load_timeout();
        match self {
            AcquisitionStrategy::Direct => Some(FetchRequest {
                url: url.to_string(),
                cross_origin: true,
                timeout,
            }),
            AcquisitionStrategy::NoCors => Some(FetchRequest {
                url: url.to_string(),
                cross_origin: false,
                timeout,
            }),
            AcquisitionStrategy::Proxy => {
                if !config.use_proxy || !is_remote_url(url) {
                    return None;
                }
                proxy_url(&config.proxy_endpoint, url, config.proxy_size).map(|url| FetchRequest {
                    url,
                    cross_origin: true,
                    timeout,
                })
            }
        }
    }
}

/// `true` for absolute http(s) URLs that do not point at the local machine.
/// Relative paths, `data:`, `blob:` and `file:` URLs are local.
pub fn is_remote_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    match parsed.host_str() {
        Some(host) => !matches!(host, "localhost" | "127.0.0.1" | "[::1]" | "0.0.0.0"),
        None => false,
    }
}

/// Relay URL asking for `url` resized to `size`×`size`.
pub fn proxy_url(endpoint: &str, url: &str, size: u32) -> Option<String> {
    let size = size.to_string();
    let size = size.as_str();
    Url::parse_with_params(endpoint, &[("url", url), ("w", size), ("h", size)])
        .ok()
        .map(String::from)
}

/// One attempt, abandoned once `request.timeout` elapses whatever the
/// fetcher does.
async fn attempt<F: ImageFetcher>(
    fetcher: &F,
    request: &FetchRequest,
) -> Result<LoadedImage, AcquireError> {
    let fetch = std::pin::pin!(fetcher.fetch(request));
    match select(fetch, Delay::new(request.timeout)).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => Err(AcquireError::Timeout(request.timeout_ms())),
    }
}

/// Run the strategy chain for `url`.
pub async fn load_image<F: ImageFetcher>(
    fetcher: &F,
    url: &str,
    config: &ExtractorConfig,
) -> Option<LoadedImage> {
    for strategy in AcquisitionStrategy::CHAIN {
        let Some(request) = strategy.request(url, config) else {
            continue;
        };
        match attempt(fetcher, &request).await {
            Ok(image) => {
                tracing::debug!(url, ?strategy, "image acquired");
                return Some(image);
            }
            Err(err) => {
                tracing::debug!(url, ?strategy, error = %err, "acquisition attempt failed");
            }
        }
    }
    None
}
