use js_sys::Uint8Array;
use ring_core::assets::{AssetLoader, LoadFuture};
use ring_core::RingError;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

use crate::model;

/// Fetches models over HTTP relative to `base_url` and decodes them as glTF.
pub struct FetchLoader {
    base_url: String,
}

impl FetchLoader {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl AssetLoader for FetchLoader {
    fn load(&self, path: &str) -> LoadFuture {
        let url = format!("{}{}", self.base_url, path);
        let path = path.to_string();
        Box::pin(async move {
            let bytes = fetch_bytes(&url).await.map_err(|reason| RingError::AssetLoad {
                path: path.clone(),
                reason,
            })?;
            model::decode_model(&path, &bytes)
        })
    }
}

async fn fetch_bytes(url: &str) -> Result<Vec<u8>, String> {
    let window = web::window().ok_or_else(|| "no window".to_string())?;
    let resp = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| format!("fetch failed: {:?}", e))?;
    let resp: web::Response = resp
        .dyn_into()
        .map_err(|e| format!("not a response: {:?}", e))?;
    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }
    let buf = resp
        .array_buffer()
        .map_err(|e| format!("array_buffer: {:?}", e))?;
    let buf = JsFuture::from(buf)
        .await
        .map_err(|e| format!("body read failed: {:?}", e))?;
    Ok(Uint8Array::new(&buf).to_vec())
}
