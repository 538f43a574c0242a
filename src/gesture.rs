use glam::Vec2;
use ring_core::DragInput;

/// Turns raw pointer press/move/release into the `{delta, dragging}` samples
/// the ring consumes. Only the pointer that started the gesture is tracked.
#[derive(Default, Clone, Copy, Debug)]
pub struct DragGesture {
    pointer_id: Option<i32>,
    last: Vec2,
    moved: bool,
}

impl DragGesture {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.pointer_id.is_some()
    }

    #[inline]
    pub fn has_moved(&self) -> bool {
        self.moved
    }

    /// First sample of a gesture: no movement yet, so not dragging.
    pub fn press(&mut self, pointer_id: i32, pos: Vec2) -> Option<DragInput> {
        if self.pointer_id.is_some() {
            return None;
        }
        self.pointer_id = Some(pointer_id);
        self.last = pos;
        self.moved = false;
        Some(DragInput {
            delta: Vec2::ZERO,
            dragging: false,
        })
    }

    pub fn motion(&mut self, pointer_id: i32, pos: Vec2) -> Option<DragInput> {
        if self.pointer_id != Some(pointer_id) {
            return None;
        }
        let delta = pos - self.last;
        if delta == Vec2::ZERO {
            return None;
        }
        self.last = pos;
        self.moved = true;
        Some(DragInput {
            delta,
            dragging: true,
        })
    }

    /// Last sample of a gesture. Carries any movement since the previous
    /// sample; the caller follows it with a drag-end.
    pub fn release(&mut self, pointer_id: i32, pos: Vec2) -> Option<DragInput> {
        if self.pointer_id != Some(pointer_id) {
            return None;
        }
        let delta = pos - self.last;
        self.pointer_id = None;
        self.last = pos;
        Some(DragInput {
            delta,
            dragging: false,
        })
    }
}

// ---------------- Viewport mapping ----------------

/// Client (CSS pixel) position to normalized device coordinates, `y` up.
#[inline]
pub fn client_to_ndc(client: Vec2, viewport: Vec2) -> Vec2 {
    if viewport.x <= 0.0 || viewport.y <= 0.0 {
        return Vec2::ZERO;
    }
    Vec2::new(
        client.x / viewport.x * 2.0 - 1.0,
        -(client.y / viewport.y) * 2.0 + 1.0,
    )
}

/// Client position to `[0, 1]` uv with `v` growing downwards.
#[inline]
pub fn client_to_uv(client: Vec2, viewport: Vec2) -> Vec2 {
    if viewport.x <= 0.0 || viewport.y <= 0.0 {
        return Vec2::splat(0.5);
    }
    (client / viewport).clamp(Vec2::ZERO, Vec2::ONE)
}
