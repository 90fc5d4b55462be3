use thiserror::Error;

/// Why a single acquisition attempt produced no image.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error("browser fetch failed: {0}")]
    Browser(String),

    #[error("empty response body")]
    EmptyBody,

    #[error("malformed data URL: {0}")]
    DataUrl(String),

    #[error("unable to read {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid URL `{0}`")]
    InvalidUrl(String),

    #[error("unsupported URL scheme `{0}`")]
    UnsupportedScheme(String),
}

/// Why a loaded image yielded no readable pixels.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("unable to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("pixel data is not readable for a cross-origin image")]
    Tainted,

    #[error("image has no pixels")]
    Empty,
}

/// Failure of the engine itself rather than of one image.
#[derive(Debug, Error)]
pub enum PaletteError {
    #[error("extraction cache lock poisoned")]
    CachePoisoned,
}
