use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use ring_core::{Experience, Release};
use wasm_bindgen::JsCast;
use web_sys as web;

use crate::dom;
use crate::gesture::{self, DragGesture};
use crate::trail::Trail;

#[derive(Clone)]
pub struct InputWiring {
    pub canvas: web::HtmlCanvasElement,
    pub experience: Rc<RefCell<Experience>>,
    pub gesture: Rc<RefCell<DragGesture>>,
    pub trail: Rc<RefCell<Trail>>,
}

pub fn wire_input_handlers(w: InputWiring) {
    wire_pointerdown(&w);
    wire_pointermove(&w);
    wire_pointerup(&w, "pointerup");
    wire_pointerup(&w, "pointercancel");
    wire_mousemove(&w);
}

#[inline]
fn client_pos(ev: &web::MouseEvent) -> Vec2 {
    Vec2::new(ev.client_x() as f32, ev.client_y() as f32)
}

fn wire_pointerdown(w: &InputWiring) {
    let w = w.clone();
    let canvas_for_listener = w.canvas.clone();

    let closure = wasm_bindgen::closure::Closure::wrap(Box::new(move |ev: web::PointerEvent| {
        let Some(input) = w.gesture.borrow_mut().press(ev.pointer_id(), client_pos(&ev)) else {
            return;
        };
        w.experience.borrow_mut().on_drag(input);
        _ = w.canvas.set_pointer_capture(ev.pointer_id());
    }) as Box<dyn FnMut(_)>);
    _ = canvas_for_listener
        .add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref());
    closure.forget();
}

fn wire_pointermove(w: &InputWiring) {
    let w = w.clone();

    let closure = wasm_bindgen::closure::Closure::wrap(Box::new(move |ev: web::PointerEvent| {
        let Some(input) = w.gesture.borrow_mut().motion(ev.pointer_id(), client_pos(&ev)) else {
            return;
        };
        w.experience.borrow_mut().on_drag(input);
    }) as Box<dyn FnMut(_)>);

    if let Some(wnd) = web::window() {
        _ = wnd.add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref());
    }
    closure.forget();
}

fn wire_pointerup(w: &InputWiring, event: &str) {
    let w = w.clone();

    let closure = wasm_bindgen::closure::Closure::wrap(Box::new(move |ev: web::PointerEvent| {
        let Some(input) = w.gesture.borrow_mut().release(ev.pointer_id(), client_pos(&ev)) else {
            return;
        };
        let mut exp = w.experience.borrow_mut();
        exp.on_drag(input);
        match exp.on_drag_end() {
            Release::Snap { tile_index } => log::info!("[input] snapped to tile {tile_index}"),
            Release::Click { tile: None } => log::debug!("[input] click on empty space"),
            Release::Click { tile: Some(_) } | Release::Ignored => {}
        }
    }) as Box<dyn FnMut(_)>);

    if let Some(wnd) = web::window() {
        _ = wnd.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
    }
    closure.forget();
}

/// Hover input: camera sway, click picking position and the distortion trail.
fn wire_mousemove(w: &InputWiring) {
    let w = w.clone();

    let closure = wasm_bindgen::closure::Closure::wrap(Box::new(move |ev: web::MouseEvent| {
        let Some(wnd) = web::window() else {
            return;
        };
        let viewport = dom::viewport_size(&wnd);
        let pos = client_pos(&ev);
        w.trail
            .borrow_mut()
            .add_point(gesture::client_to_uv(pos, viewport));
        w.experience
            .borrow_mut()
            .on_pointer_move(gesture::client_to_ndc(pos, viewport));
    }) as Box<dyn FnMut(_)>);

    if let Some(wnd) = web::window() {
        _ = wnd.add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
    }
    closure.forget();
}
