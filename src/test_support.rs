use crate::acquire::{FetchRequest, ImageFetcher, LoadedImage};
use crate::error::AcquireError;
use image::{DynamicImage, RgbaImage};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// In-memory fetcher that records every request it sees.
#[derive(Default)]
pub(crate) struct MockFetcher {
    images: HashMap<String, DynamicImage>,
    opaque: HashSet<String>,
    stall_cross_origin: bool,
    calls: Mutex<Vec<FetchRequest>>,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_image(mut self, url: &str, image: DynamicImage) -> Self {
        self.images.insert(url.to_string(), image);
        self
    }

    /// Loads only without cross-origin access, and then only as an opaque image.
    pub(crate) fn with_opaque(mut self, url: &str) -> Self {
        self.opaque.insert(url.to_string());
        self
    }

    /// Never answers cross-origin requests, like a host that hangs on CORS.
    pub(crate) fn stalling_cross_origin(mut self) -> Self {
        self.stall_cross_origin = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<FetchRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.url == url).count()
    }
}

impl ImageFetcher for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<LoadedImage, AcquireError> {
        self.calls.lock().unwrap().push(request.clone());
        if self.stall_cross_origin && request.cross_origin {
            futures::future::pending::<()>().await;
        }
        if let Some(image) = self.images.get(&request.url) {
            return Ok(LoadedImage::Decoded(image.clone()));
        }
        if !request.cross_origin && self.opaque.contains(&request.url) {
            return Ok(LoadedImage::Opaque);
        }
        Err(AcquireError::Status {
            url: request.url.clone(),
            status: 404,
        })
    }
}

pub(crate) fn solid_image(width: u32, height: u32, rgba: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, image::Rgba(rgba)))
}

/// Left half `left`, right half `right`.
pub(crate) fn split_image(width: u32, height: u32, left: [u8; 4], right: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            image::Rgba(left)
        } else {
            image::Rgba(right)
        }
    }))
}
