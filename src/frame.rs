use std::cell::RefCell;
use std::rc::Rc;

use instant::Instant;
use ring_core::{Experience, LoadedTile, ModelAsset, SequenceEvent};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

use crate::constants::{MAX_FRAME_DELTA_SEC, TRAIL_TEXTURE_SIZE};
use crate::dom;
use crate::render;
use crate::trail::Trail;

/// Finished loads waiting to be attached on the next frame.
pub type TileQueue = Rc<RefCell<Vec<LoadedTile>>>;
pub type ClimberSlot = Rc<RefCell<Option<ring_core::Result<ModelAsset>>>>;

pub struct FrameContext<'a> {
    pub canvas: web::HtmlCanvasElement,
    pub experience: Rc<RefCell<Experience>>,
    pub tile_queue: TileQueue,
    pub climber_slot: ClimberSlot,
    pub trail: Rc<RefCell<Trail>>,
    pub gpu: Option<render::GpuState<'a>>,
    pub last_instant: Instant,
}

impl<'a> FrameContext<'a> {
    pub fn frame(&mut self) {
        let now = Instant::now();
        let dt_sec = (now - self.last_instant)
            .as_secs_f32()
            .min(MAX_FRAME_DELTA_SEC);
        self.last_instant = now;

        self.attach_finished_loads();

        let report = match self.experience.borrow_mut().update(dt_sec) {
            Ok(r) => r,
            Err(e) => {
                log::error!("[frame] update failed: {e}");
                return;
            }
        };
        for ev in &report.events {
            match ev {
                SequenceEvent::StartSecondFade => log::info!("[frame] second fade started"),
                SequenceEvent::RevealTileCharacter => log::info!("[frame] tile character revealed"),
            }
        }
        if report.crossfade_started {
            if let Some(w) = web::window() {
                dom::scroll_to_end(&w);
            }
        }

        let trail_dirty = self.trail.borrow_mut().update(dt_sec);

        let Some(gpu) = &mut self.gpu else {
            return;
        };
        if trail_dirty {
            gpu.upload_trail(&self.trail.borrow());
        }

        let (w, h) = (self.canvas.width(), self.canvas.height());
        if (w, h) != gpu.size() {
            gpu.resize_if_needed(w, h);
            self.experience
                .borrow_mut()
                .resize(w.max(1) as f32 / h.max(1) as f32);
        }

        match gpu.render(&self.experience.borrow()) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                gpu.reconfigure();
            }
            Err(e) => log::error!("[gpu] render error: {:?}", e),
        }
    }

    fn attach_finished_loads(&mut self) {
        let tiles: Vec<LoadedTile> = self.tile_queue.borrow_mut().drain(..).collect();
        let mut exp = self.experience.borrow_mut();
        for tile in tiles {
            let index = tile.index;
            if let Err(e) = exp.attach_tile(tile) {
                log::error!("[frame] tile {index} not attached: {e}");
            }
        }
        if let Some(climber) = self.climber_slot.borrow_mut().take() {
            if let Err(e) = exp.attach_climber(climber) {
                log::error!("[frame] climber not attached: {e}");
            }
        }
    }
}

pub async fn init_gpu(
    canvas: &web::HtmlCanvasElement,
    bloom_levels: u32,
) -> Option<render::GpuState<'static>> {
    // leak a canvas clone to satisfy 'static lifetime for surface
    let leaked_canvas = Box::leak(Box::new(canvas.clone()));
    match render::GpuState::new(leaked_canvas, bloom_levels, TRAIL_TEXTURE_SIZE).await {
        Ok(g) => Some(g),
        Err(e) => {
            log::error!("WebGPU init error: {:?}", e);
            None
        }
    }
}

fn request_frame(tick: &Rc<RefCell<Option<Closure<dyn FnMut()>>>>) {
    if let (Some(w), Some(cb)) = (web::window(), tick.borrow().as_ref()) {
        _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
    }
}

pub fn start_loop(frame_ctx: Rc<RefCell<FrameContext<'static>>>) {
    let tick: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let tick_clone = tick.clone();
    let frame_ctx_tick = frame_ctx.clone();
    *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        frame_ctx_tick.borrow_mut().frame();
        request_frame(&tick_clone);
    }) as Box<dyn FnMut()>));
    request_frame(&tick);
}
