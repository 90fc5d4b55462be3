use crate::acquire::LoadedImage;
use crate::color_space::{LabColor, rgb_to_lab};
use crate::error::ReadError;
use image::{DynamicImage, GenericImageView, RgbaImage, imageops::FilterType};
use palette::{Lab, Srgb};
use std::collections::BTreeMap;

/// A `{lab, count}` record: the centroid of `count` pixels (or of several
/// merged buckets).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabBucket {
    pub lab: LabColor,
    pub count: u64,
}

impl LabBucket {
    pub fn new(l: f64, a: f64, b: f64, count: u64) -> Self {
        Self {
            lab: Lab::new(l, a, b),
            count,
        }
    }
}

/// Running accumulator for one quantization cell. Lives only inside
/// [`bucket_pixels`].
#[derive(Default)]
struct ColorBucket {
    lab_sum: [f64; 3],
    count: u64,
}

impl ColorBucket {
    fn add(&mut self, lab: &LabColor) {
        self.lab_sum[0] += lab.l;
        self.lab_sum[1] += lab.a;
        self.lab_sum[2] += lab.b;
        self.count += 1;
    }

    fn finish(self) -> Option<LabBucket> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(LabBucket::new(
            self.lab_sum[0] / n,
            self.lab_sum[1] / n,
            self.lab_sum[2] / n,
            self.count,
        ))
    }
}

// ------------------------------------------------------------
// Downscaling
// ------------------------------------------------------------

/// Size with the longest side at most `max_side`, aspect ratio kept, never
/// upscaled.
pub fn downscaled_size(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_side || longest == 0 {
        return (width, height);
    }
    let ratio = max_side as f32 / longest as f32;
    let w = ((width as f32) * ratio).round().max(1.0) as u32;
    let h = ((height as f32) * ratio).round().max(1.0) as u32;
    (w.min(max_side), h.min(max_side))
}

/// Decode `loaded` and return its RGBA pixels at sampling size.
///
/// Fails for opaque (cross-origin) images, undecodable bytes and empty
/// images.
pub fn read_pixels(loaded: &LoadedImage, max_side: u32) -> Result<RgbaImage, ReadError> {
    match loaded {
        LoadedImage::Opaque => Err(ReadError::Tainted),
        LoadedImage::Decoded(img) => downscale(img, max_side),
        LoadedImage::Encoded(bytes) => {
            let img = image::load_from_memory(bytes.as_ref())?;
            downscale(&img, max_side)
        }
    }
}

fn downscale(img: &DynamicImage, max_side: u32) -> Result<RgbaImage, ReadError> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(ReadError::Empty);
    }
    let (out_w, out_h) = downscaled_size(w, h, max_side);
    if (out_w, out_h) == (w, h) {
        return Ok(img.to_rgba8());
    }
    Ok(image::imageops::resize(img, out_w, out_h, FilterType::Triangle))
}

// ------------------------------------------------------------
// Quantization
// ------------------------------------------------------------

/// Grid cell of `lab` for cells of edge `bin_size`. `a` and `b` are offset
/// by 128 so cells line up with the `-128..128` range.
pub fn quantize_key(lab: &LabColor, bin_size: f64) -> (i64, i64, i64) {
    (
        (lab.l / bin_size).floor() as i64,
        ((lab.a + 128.0) / bin_size).floor() as i64,
        ((lab.b + 128.0) / bin_size).floor() as i64,
    )
}

/// Group the opaque pixels of `pixels` into Lab cells and return each
/// non-empty cell's centroid and pixel count.
pub fn bucket_pixels(pixels: &RgbaImage, bin_size: f64, alpha_cutoff: u8) -> Vec<LabBucket> {
    let mut cells: BTreeMap<(i64, i64, i64), ColorBucket> = BTreeMap::new();

    for pixel in pixels.pixels() {
        let [r, g, b, a] = pixel.0;
        if a < alpha_cutoff {
            continue;
        }
        let lab = rgb_to_lab(Srgb::new(r, g, b));
        cells
            .entry(quantize_key(&lab, bin_size))
            .or_default()
            .add(&lab);
    }

    cells.into_values().filter_map(ColorBucket::finish).collect()
}
