use crate::{ExtractorConfig, HttpFetcher, PaletteEngine};
use js_sys::{Array, Promise};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

/// Browser handle around one [`PaletteEngine`]. Create one per consuming
/// component so each gets its own extraction cache.
#[wasm_bindgen]
pub struct PaletteExtractor {
    engine: Rc<PaletteEngine<HttpFetcher>>,
}

#[wasm_bindgen]
impl PaletteExtractor {
    /// `config_json` is an optional JSON object overriding any
    /// [`ExtractorConfig`] field.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<PaletteExtractor, JsValue> {
        let config = match config_json {
            Some(json) => ExtractorConfig::from_json(&json)
                .map_err(|e| JsValue::from_str(&format!("Invalid extractor config: {e}")))?,
            None => ExtractorConfig::default(),
        };
        Ok(Self {
            engine: Rc::new(PaletteEngine::with_config(HttpFetcher::new(), config)),
        })
    }

    /// Resolves to an array of up to five `#RRGGBB` strings. The promise never
    /// rejects; unusable images simply contribute no colors.
    #[wasm_bindgen(js_name = extractFromImages)]
    pub fn extract_from_images(&self, urls: Array) -> Promise {
        let urls: Vec<String> = urls
            .iter()
            .filter_map(|value| {
                let url = value.as_string();
                if url.is_none() {
                    tracing::warn!("ignoring non-string image URL");
                }
                url
            })
            .collect();
        let engine = Rc::clone(&self.engine);

        future_to_promise(async move {
            let colors = engine.extract_from_images(&urls).await;
            let palette_js = Array::new();
            for hex in colors {
                palette_js.push(&JsValue::from_str(&hex));
            }
            Ok(palette_js.into())
        })
    }

    #[wasm_bindgen(getter, js_name = isExtracting)]
    pub fn is_extracting(&self) -> bool {
        self.engine.is_extracting()
    }

    #[wasm_bindgen(js_name = clearCache)]
    pub fn clear_cache(&self) {
        self.engine.clear_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use wasm_bindgen_futures::JsFuture;
    use wasm_bindgen_test::wasm_bindgen_test;

    fn png_data_url(rgba: [u8; 4]) -> String {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba(rgba)));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("png encode");
        format!("data:image/png;base64,{}", STANDARD.encode(buf))
    }

    async fn resolve(promise: Promise) -> Vec<String> {
        let value = JsFuture::from(promise).await.expect("never rejects");
        Array::from(&value)
            .iter()
            .map(|hex| hex.as_string().expect("hex string"))
            .collect()
    }

    #[wasm_bindgen_test]
    fn rejects_malformed_config() {
        assert!(PaletteExtractor::new(Some("{ not json".to_string())).is_err());
        assert!(PaletteExtractor::new(Some(r#"{"max_colors": 3}"#.to_string())).is_ok());
        assert!(PaletteExtractor::new(None).is_ok());
    }

    #[wasm_bindgen_test]
    async fn empty_array_resolves_to_empty_palette() {
        let extractor = PaletteExtractor::new(None).expect("default config");

        assert!(resolve(extractor.extract_from_images(Array::new())).await.is_empty());
        assert!(!extractor.is_extracting());
    }

    #[wasm_bindgen_test]
    async fn resolves_to_hex_strings_and_skips_non_strings() {
        let extractor = PaletteExtractor::new(None).expect("default config");
        let url = png_data_url([0, 0, 255, 255]);
        let urls = Array::new();
        urls.push(&JsValue::from_f64(42.0));
        urls.push(&JsValue::from_str(&url));
        urls.push(&JsValue::NULL);

        let colors = resolve(extractor.extract_from_images(urls)).await;

        assert_eq!(colors, vec!["#0000FF".to_string()]);
        assert!(!extractor.is_extracting());
        assert!(extractor.engine.cache().contains(&url));

        extractor.clear_cache();
        assert!(extractor.engine.cache().is_empty());
    }

    #[wasm_bindgen_test]
    async fn unusable_image_resolves_instead_of_rejecting() {
        let extractor = PaletteExtractor::new(None).expect("default config");
        let urls = Array::of1(&JsValue::from_str("data:image/png;base64,AAAA"));

        assert!(resolve(extractor.extract_from_images(urls)).await.is_empty());
    }
}
