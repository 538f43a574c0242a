use glam::Vec2;
use wasm_bindgen::JsCast;
use web_sys as web;

use crate::constants::MAX_DEVICE_PIXEL_RATIO;

#[inline]
pub fn window_document() -> Option<web::Document> {
    web::window().and_then(|w| w.document())
}

pub fn canvas_by_id(document: &web::Document, id: &str) -> anyhow::Result<web::HtmlCanvasElement> {
    let el = document
        .get_element_by_id(id)
        .ok_or_else(|| anyhow::anyhow!("missing #{id}"))?;
    el.dyn_into::<web::HtmlCanvasElement>()
        .map_err(|e| anyhow::anyhow!(format!("#{id} is not a canvas: {:?}", e)))
}

/// Match the canvas backing store to its CSS size, with the device pixel
/// ratio capped.
pub fn sync_canvas_backing_size(canvas: &web::HtmlCanvasElement) {
    if let Some(w) = web::window() {
        let dpr = w.device_pixel_ratio().min(MAX_DEVICE_PIXEL_RATIO);
        let rect = canvas.get_bounding_client_rect();
        let w_px = (rect.width() * dpr) as u32;
        let h_px = (rect.height() * dpr) as u32;
        canvas.set_width(w_px.max(1));
        canvas.set_height(h_px.max(1));
    }
}

/// Layout viewport in CSS pixels.
pub fn viewport_size(window: &web::Window) -> Vec2 {
    let w = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    let h = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    Vec2::new(w as f32, h as f32)
}

/// `(scroll_y, document_height, viewport_height)` in CSS pixels.
pub fn scroll_metrics(window: &web::Window) -> (f32, f32, f32) {
    let scroll_y = window.scroll_y().unwrap_or(0.0);
    let doc_height = window
        .document()
        .and_then(|d| d.document_element())
        .map(|el| el.scroll_height() as f64)
        .unwrap_or(0.0);
    let viewport = viewport_size(window);
    (scroll_y as f32, doc_height as f32, viewport.y)
}

/// Smoothly scroll the page to its end.
pub fn scroll_to_end(window: &web::Window) {
    let (_, doc_height, viewport_height) = scroll_metrics(window);
    let max_scroll = (doc_height - viewport_height).max(0.0);
    let opts = web::ScrollToOptions::new();
    opts.set_top(max_scroll as f64);
    opts.set_behavior(web::ScrollBehavior::Smooth);
    window.scroll_to_with_scroll_to_options(&opts);
}
