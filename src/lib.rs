#![cfg(target_arch = "wasm32")]
use std::cell::RefCell;
use std::rc::Rc;

use instant::Instant;
use ring_core::content::{load_climber, load_tile_assets};
use ring_core::{
    AssetContext, AssetPaths, BloomSettings, CameraSettings, CompositorSettings,
    DistortionSettings, Experience, RingConfig,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

mod constants;
mod core;
mod dom;
mod events;
mod frame;
mod gesture;
mod loader;
mod model;
mod render;
mod trail;

use constants::*;
use gesture::DragGesture;
use loader::FetchLoader;
use trail::{Trail, TrailSettings};

fn wire_canvas_resize(canvas: &web::HtmlCanvasElement) {
    dom::sync_canvas_backing_size(canvas);
    let canvas_resize = canvas.clone();
    let resize_closure = Closure::wrap(Box::new(move || {
        dom::sync_canvas_backing_size(&canvas_resize);
    }) as Box<dyn FnMut()>);
    if let Some(window) = web::window() {
        _ = window
            .add_event_listener_with_callback("resize", resize_closure.as_ref().unchecked_ref());
    }
    resize_closure.forget();
}

/// Start every model fetch. Results land in the frame queues and are
/// attached on the next frame, in whatever order they finish.
fn spawn_loads(config: &RingConfig, tile_queue: &frame::TileQueue, climber_slot: &frame::ClimberSlot) {
    let ctx = AssetContext::new(Rc::new(FetchLoader::new(ASSET_BASE_URL)));
    let paths = AssetPaths::default();

    for index in 0..config.num_tiles {
        let ctx = ctx.clone();
        let paths = paths.clone();
        let queue = tile_queue.clone();
        spawn_local(async move {
            let loaded = load_tile_assets(&ctx, &paths, index).await;
            queue.borrow_mut().push(loaded);
        });
    }

    let slot = climber_slot.clone();
    spawn_local(async move {
        let climber = load_climber(&ctx, &paths).await;
        *slot.borrow_mut() = Some(climber);
    });
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("tile-ring starting");

    spawn_local(async move {
        if let Err(e) = init().await {
            log::error!("init error: {:?}", e);
        }
    });
    Ok(())
}

async fn init() -> anyhow::Result<()> {
    let window = web::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| anyhow::anyhow!("no document"))?;
    let canvas = dom::canvas_by_id(&document, CANVAS_ID)?;

    // Maintain canvas internal pixel size to match CSS size * devicePixelRatio
    wire_canvas_resize(&canvas);

    let config = RingConfig::default();
    let bloom = BloomSettings::default();
    let aspect = canvas.width().max(1) as f32 / canvas.height().max(1) as f32;
    let experience = Experience::new(
        config.clone(),
        CameraSettings::default(),
        CompositorSettings::with_distortion(bloom, DistortionSettings::default()),
        aspect,
    )?;
    let experience = Rc::new(RefCell::new(experience));

    let tile_queue: frame::TileQueue = Rc::new(RefCell::new(Vec::new()));
    let climber_slot: frame::ClimberSlot = Rc::new(RefCell::new(None));
    spawn_loads(&config, &tile_queue, &climber_slot);

    let trail = Rc::new(RefCell::new(Trail::new(TrailSettings {
        size: TRAIL_TEXTURE_SIZE,
        max_points: TRAIL_MAX_POINTS,
        max_age: TRAIL_MAX_AGE_SEC,
        radius: TRAIL_RADIUS,
        speed_scale: TRAIL_SPEED_SCALE,
    })));

    events::wire_input_handlers(events::InputWiring {
        canvas: canvas.clone(),
        experience: experience.clone(),
        gesture: Rc::new(RefCell::new(DragGesture::default())),
        trail: trail.clone(),
    });
    events::wire_scroll_handler(experience.clone());
    // The page may have been restored mid-scroll
    events::sync_scroll(&window, &experience);

    let gpu = frame::init_gpu(&canvas, bloom.levels).await;

    let frame_ctx = Rc::new(RefCell::new(frame::FrameContext {
        canvas,
        experience,
        tile_queue,
        climber_slot,
        trail,
        gpu,
        last_instant: Instant::now(),
    }));
    frame::start_loop(frame_ctx);

    Ok(())
}
