use crate::acquire::{FetchRequest, ImageFetcher, LoadedImage};
use crate::error::AcquireError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use url::Url;

/// Production [`ImageFetcher`].
///
/// - `http`/`https`: `reqwest`. In a browser, requests without
///   `cross_origin` go straight to `fetch` in `no-cors` mode and may come
///   back opaque.
/// - `data:`: inline base64 payloads.
/// - `file:`: local files, native builds only.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch_http(&self, request: &FetchRequest) -> Result<LoadedImage, AcquireError> {
        // reqwest cannot represent an opaque browser response.
        #[cfg(target_arch = "wasm32")]
        if !request.cross_origin {
            return browser::fetch_no_cors(&request.url).await;
        }

        let builder = self.client.get(request.url.as_str());
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(request.timeout);

        let timeout_ms = request.timeout_ms();
        let response = builder
            .send()
            .await
            .map_err(|err| classify(err, timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquireError::Status {
                url: request.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| classify(err, timeout_ms))?;
        if body.is_empty() {
            return Err(AcquireError::EmptyBody);
        }
        Ok(LoadedImage::Encoded(body))
    }

    #[cfg(not(target_arch = "wasm32"))]
    async fn fetch_file(&self, url: &Url) -> Result<LoadedImage, AcquireError> {
        let path = url
            .to_file_path()
            .map_err(|()| AcquireError::InvalidUrl(url.to_string()))?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|source| AcquireError::File {
                path: path.display().to_string(),
                source,
            })?;
        if data.is_empty() {
            return Err(AcquireError::EmptyBody);
        }
        Ok(LoadedImage::Encoded(Bytes::from(data)))
    }

    #[cfg(target_arch = "wasm32")]
    async fn fetch_file(&self, _url: &Url) -> Result<LoadedImage, AcquireError> {
        Err(AcquireError::UnsupportedScheme("file".to_string()))
    }
}

impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<LoadedImage, AcquireError> {
        if let Some(payload) = request.url.strip_prefix("data:") {
            return decode_data_url(payload).map(LoadedImage::Encoded);
        }

        let parsed =
            Url::parse(&request.url).map_err(|_| AcquireError::InvalidUrl(request.url.clone()))?;
        match parsed.scheme() {
            "http" | "https" => self.fetch_http(request).await,
            "file" => self.fetch_file(&parsed).await,
            other => Err(AcquireError::UnsupportedScheme(other.to_string())),
        }
    }
}

fn classify(err: reqwest::Error, timeout_ms: u64) -> AcquireError {
    if err.is_timeout() {
        AcquireError::Timeout(timeout_ms)
    } else {
        AcquireError::Http(err)
    }
}

/// What a `no-cors` response allows. `Ok(None)` means the body is readable
/// and still has to be read.
#[cfg(any(target_arch = "wasm32", test))]
fn no_cors_outcome(
    url: &str,
    opaque: bool,
    status: u16,
) -> Result<Option<LoadedImage>, AcquireError> {
    if opaque {
        return Ok(Some(LoadedImage::Opaque));
    }
    if !(200..300).contains(&status) {
        return Err(AcquireError::Status {
            url: url.to_string(),
            status,
        });
    }
    Ok(None)
}

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::no_cors_outcome;
    use crate::acquire::LoadedImage;
    use crate::error::AcquireError;
    use bytes::Bytes;
    use js_sys::{Promise, Uint8Array};
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Request, RequestInit, RequestMode, Response, ResponseType};

    #[wasm_bindgen]
    extern "C" {
        // Global `fetch`, present in windows and workers alike.
        #[wasm_bindgen(js_name = fetch)]
        fn fetch_with_request(request: &Request) -> Promise;
    }

    pub(super) async fn fetch_no_cors(url: &str) -> Result<LoadedImage, AcquireError> {
        let init = RequestInit::new();
        init.set_method("GET");
        init.set_mode(RequestMode::NoCors);
        let request = Request::new_with_str_and_init(url, &init).map_err(js_error)?;

        let response: Response = JsFuture::from(fetch_with_request(&request))
            .await
            .and_then(|value| value.dyn_into())
            .map_err(js_error)?;
        let opaque = response.type_() == ResponseType::Opaque;
        if let Some(image) = no_cors_outcome(url, opaque, response.status())? {
            return Ok(image);
        }

        let buffer = JsFuture::from(response.array_buffer().map_err(js_error)?)
            .await
            .map_err(js_error)?;
        let body = Uint8Array::new(&buffer).to_vec();
        if body.is_empty() {
            return Err(AcquireError::EmptyBody);
        }
        Ok(LoadedImage::Encoded(Bytes::from(body)))
    }

    fn js_error(value: JsValue) -> AcquireError {
        AcquireError::Browser(
            value
                .as_string()
                .unwrap_or_else(|| format!("{value:?}")),
        )
    }
}

/// Decode the part of a `data:` URL after the scheme. Only base64 payloads
/// are accepted; raster images are never sent as plain text.
pub fn decode_data_url(payload: &str) -> Result<Bytes, AcquireError> {
    let (meta, data) = payload
        .split_once(',')
        .ok_or_else(|| AcquireError::DataUrl("missing `,` separator".to_string()))?;
    if !meta.ends_with(";base64") {
        return Err(AcquireError::DataUrl("payload is not base64 encoded".to_string()));
    }
    let decoded = STANDARD
        .decode(data.trim())
        .map_err(|err| AcquireError::DataUrl(err.to_string()))?;
    if decoded.is_empty() {
        return Err(AcquireError::EmptyBody);
    }
    Ok(Bytes::from(decoded))
}
