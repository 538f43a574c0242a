use std::cell::RefCell;
use std::rc::Rc;

use ring_core::interaction::scroll_fraction;
use ring_core::Experience;
use wasm_bindgen::JsCast;
use web_sys as web;

use crate::dom;

/// Feed the page's scroll position to the ring. Crossing the sequence limit
/// also carries the page the rest of the way down.
pub fn sync_scroll(window: &web::Window, experience: &Rc<RefCell<Experience>>) {
    let (scroll_y, doc_height, viewport_height) = dom::scroll_metrics(window);
    let fraction = scroll_fraction(scroll_y, doc_height, viewport_height);
    let update = experience.borrow_mut().on_scroll(fraction);
    if update.crossfade_started {
        log::info!("[scroll] cross-fade started at {:.3}", update.fraction);
        dom::scroll_to_end(window);
    } else if update.crossfade_cancelled {
        log::info!("[scroll] cross-fade cancelled at {:.3}", update.fraction);
    }
}

pub fn wire_scroll_handler(experience: Rc<RefCell<Experience>>) {
    let closure = wasm_bindgen::closure::Closure::wrap(Box::new(move || {
        if let Some(wnd) = web::window() {
            sync_scroll(&wnd, &experience);
        }
    }) as Box<dyn FnMut()>);
    if let Some(wnd) = web::window() {
        _ = wnd.add_event_listener_with_callback("scroll", closure.as_ref().unchecked_ref());
    }
    closure.forget();
}
