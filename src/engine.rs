//! Top-level entry point: URLs in, hex palette out.
//!
//! Per-image sampling results are memoized per engine instance so repeated
//! analysis of the same photos skips the network entirely.

use crate::acquire::{ImageFetcher, load_image};
use crate::config::ExtractorConfig;
use crate::error::PaletteError;
use crate::sampling::{LabBucket, bucket_pixels, read_pixels};
use crate::select::palette_from_buckets;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// URL -> pre-merge buckets of that image. Only non-empty results are stored;
/// entries live until [`ExtractionCache::clear`].
#[derive(Debug, Default)]
pub struct ExtractionCache {
    entries: Mutex<HashMap<String, Arc<Vec<LabBucket>>>>,
}

impl ExtractionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Result<Option<Arc<Vec<LabBucket>>>, PaletteError> {
        let entries = self.entries.lock().map_err(|_| PaletteError::CachePoisoned)?;
        Ok(entries.get(url).cloned())
    }

    pub fn insert(&self, url: &str, buckets: Arc<Vec<LabBucket>>) -> Result<(), PaletteError> {
        if buckets.is_empty() {
            return Ok(());
        }
        let mut entries = self.entries.lock().map_err(|_| PaletteError::CachePoisoned)?;
        entries.insert(url.to_string(), buckets);
        Ok(())
    }

    pub fn contains(&self, url: &str) -> bool {
        matches!(self.get(url), Ok(Some(_)))
    }

    /// Entry count, also readable from a poisoned store.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Also recovers a poisoned store.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.entries.clear_poison();
    }
}

/// Counts overlapping `extract_from_images` calls for [`PaletteEngine::is_extracting`].
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct PaletteEngine<F> {
    fetcher: F,
    config: ExtractorConfig,
    cache: ExtractionCache,
    in_flight: AtomicUsize,
}

impl<F: ImageFetcher> PaletteEngine<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_config(fetcher, ExtractorConfig::default())
    }

    pub fn with_config(fetcher: F, config: ExtractorConfig) -> Self {
        Self {
            fetcher,
            config,
            cache: ExtractionCache::new(),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn cache(&self) -> &ExtractionCache {
        &self.cache
    }

    /// `true` while any `extract_from_images` call is running.
    pub fn is_extracting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Load and sample one image. Every failure is logged and yields no
    /// buckets.
    pub async fn extract_colors_from_image(&self, url: &str) -> Vec<LabBucket> {
        let Some(loaded) = load_image(&self.fetcher, url, &self.config).await else {
            tracing::warn!(url, "image could not be loaded, skipping");
            return Vec::new();
        };
        let pixels = match read_pixels(&loaded, self.config.max_side) {
            Ok(pixels) => pixels,
            Err(err) => {
                tracing::warn!(url, error = %err, "pixel data unavailable, skipping");
                return Vec::new();
            }
        };
        let buckets = bucket_pixels(&pixels, self.config.bin_size, self.config.alpha_cutoff);
        tracing::debug!(
            url,
            width = pixels.width(),
            height = pixels.height(),
            buckets = buckets.len(),
            "image sampled"
        );
        buckets
    }

    /// Up to `max_colors` uppercase `#RRGGBB` strings summarizing `urls`.
    ///
    /// Never fails: images that cannot be loaded or read contribute nothing,
    /// and an unexpected engine failure is logged and yields an empty palette.
    pub async fn extract_from_images<S: AsRef<str>>(&self, urls: &[S]) -> Vec<String> {
        if urls.is_empty() {
            return Vec::new();
        }
        let _guard = InFlight::enter(&self.in_flight);

        match self.try_extract(urls).await {
            Ok(colors) => {
                tracing::info!(images = urls.len(), ?colors, "palette extracted");
                colors
            }
            Err(err) => {
                tracing::error!(error = %err, "palette extraction failed");
                Vec::new()
            }
        }
    }

    async fn try_extract<S: AsRef<str>>(&self, urls: &[S]) -> Result<Vec<String>, PaletteError> {
        let mut resolved: HashMap<&str, Arc<Vec<LabBucket>>> = HashMap::new();
        let mut pending: Vec<&str> = Vec::new();

        for url in urls {
            let url = url.as_ref();
            if resolved.contains_key(url) || pending.contains(&url) {
                continue;
            }
            match self.cache.get(url)? {
                Some(buckets) if !buckets.is_empty() => {
                    tracing::debug!(url, "extraction cache hit");
                    resolved.insert(url, buckets);
                }
                _ => pending.push(url),
            }
        }

        let fresh = join_all(pending.iter().map(|url| self.extract_colors_from_image(url))).await;
        for (url, buckets) in pending.into_iter().zip(fresh) {
            let buckets = Arc::new(buckets);
            self.cache.insert(url, Arc::clone(&buckets))?;
            resolved.insert(url, buckets);
        }

        let combined: Vec<LabBucket> = urls
            .iter()
            .filter_map(|url| resolved.get(url.as_ref()))
            .flat_map(|buckets| buckets.iter().copied())
            .collect();

        Ok(palette_from_buckets(&combined, &self.config))
    }
}
