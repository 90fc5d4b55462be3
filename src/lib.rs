//! Palette suggestions from room photos.
//!
//! Given image URLs, the engine samples every photo in CIE Lab, merges the
//! same surfaces seen across photos and returns up to five distinct
//! `#RRGGBB` colors, favoring large neutral surfaces (walls, floors,
//! cabinetry) over small saturated accents.
//!
//! The crate builds for the browser (`PaletteExtractor`, via `wasm-bindgen`)
//! and natively (`PaletteEngine` plus the `palette-cli` binary).

mod acquire;
mod color_space;
mod config;
mod engine;
mod error;
mod fetch;
mod merge;
mod sampling;
mod select;
#[cfg(test)]
mod test_support;
#[cfg(target_arch = "wasm32")]
mod wasm;

pub use acquire::{
    AcquisitionStrategy, FetchRequest, ImageFetcher, LoadedImage, is_remote_url, load_image,
    proxy_url,
};
pub use color_space::{
    LabColor, chroma, delta_e, lab_to_hex, lab_to_rgb, lab_to_xyz, linear_to_srgb, rgb_to_hex,
    rgb_to_lab, rgb_to_xyz, srgb_to_linear, xyz_to_lab, xyz_to_rgb,
};
pub use config::ExtractorConfig;
pub use engine::{ExtractionCache, PaletteEngine};
pub use error::{AcquireError, PaletteError, ReadError};
pub use fetch::{HttpFetcher, decode_data_url};
pub use merge::merge_similar_buckets;
pub use sampling::{LabBucket, bucket_pixels, downscaled_size, quantize_key, read_pixels};
pub use select::{ScoredBucket, palette_from_buckets, score_bucket, select_palette};
#[cfg(target_arch = "wasm32")]
pub use wasm::PaletteExtractor;

#[cfg(not(target_arch = "wasm32"))]
use anyhow::Result;

/// Palette of a single image already held in memory.
///
/// Runs the same sampling, merge and selection as [`PaletteEngine`] but skips
/// acquisition and caching. Unlike the engine, undecodable input is an error.
#[cfg(not(target_arch = "wasm32"))]
pub fn extract_palette_bytes(input: &[u8], config: &ExtractorConfig) -> Result<Vec<String>> {
    let img = image::load_from_memory(input)?;
    let pixels = read_pixels(&LoadedImage::Decoded(img), config.max_side)?;
    let buckets = bucket_pixels(&pixels, config.bin_size, config.alpha_cutoff);
    Ok(palette_from_buckets(&buckets, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::split_image;
    use image::ImageFormat;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn palette_from_encoded_bytes() {
        let img = split_image(80, 40, [255, 255, 255, 255], [0, 0, 0, 255]);
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("png encode");

        let mut colors =
            extract_palette_bytes(&buf, &ExtractorConfig::default()).expect("decodable");
        colors.sort();

        assert_eq!(colors.len(), 2);
        assert_eq!(colors[0], "#000000");
        assert_eq!(colors[1], "#FFFFFF");
    }

    #[test]
    fn undecodable_bytes_are_an_error() {
        assert!(extract_palette_bytes(b"definitely not a png", &ExtractorConfig::default()).is_err());
    }
}
