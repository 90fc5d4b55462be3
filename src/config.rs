use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the whole extraction pipeline.
///
/// The three distance thresholds serve different purposes and are kept apart:
/// `merge_threshold` folds the same surface seen across images together,
/// `strict_distance` and `relaxed_distance` guard distinctness of the final
/// palette in the first and second selection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Longest side of the sampled image, in pixels. Images are never upscaled.
    pub max_side: u32,
    /// Edge length of a quantization cell in Lab units.
    pub bin_size: f64,
    /// Pixels with alpha below this are ignored.
    pub alpha_cutoff: u8,
    pub merge_threshold: f64,
    pub strict_distance: f64,
    pub relaxed_distance: f64,
    pub max_colors: usize,
    /// Per-attempt timeout for each acquisition strategy.
    pub load_timeout_ms: u64,
    /// Image resize relay, queried with `url`, `w` and `h`.
    pub proxy_endpoint: String,
    pub proxy_size: u32,
    pub use_proxy: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_side: 100,
            bin_size: 8.0,
            alpha_cutoff: 128,
            merge_threshold: 12.0,
            strict_distance: 20.0,
            relaxed_distance: 18.0,
            max_colors: 5,
            load_timeout_ms: 5_000,
            proxy_endpoint: "https://images.weserv.nl/".to_string(),
            proxy_size: 100,
            use_proxy: true,
        }
    }
}

impl ExtractorConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Parse a JSON object; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
