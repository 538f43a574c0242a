//! Drag, click and scroll interpretation.
//!
//! A press starts `Dragging` and arms a timer on the frame clock. Releasing
//! before the timer fires is a click; releasing after it snaps the ring to
//! the nearest tile and the controller sits in `Snapping` until the damped
//! rotation settles.

use std::f32::consts::{PI, TAU};

use glam::Vec2;

use crate::config::RingConfig;

/// One sample of the drag gesture stream.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DragInput {
    /// Pointer movement since the previous sample, in CSS pixels.
    pub delta: Vec2,
    /// Pointer is down and has moved.
    pub dragging: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Dragging,
    Snapping,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragEnd {
    /// No gesture was in progress.
    Ignored,
    /// Short press: the caller should raycast at the pointer.
    Click,
    /// Long drag: the ring will settle on `tile_index`.
    Snap { tile_index: i32, target_yaw: f32 },
}

/// Pitch/yaw the ring rotates toward.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RotationTarget {
    pub pitch: f32,
    pub yaw: f32,
}

/// Nearest tile to `yaw`, taking the short way round.
pub fn snap_to_nearest_tile(yaw: f32, num_tiles: usize) -> (i32, f32) {
    let n = num_tiles.max(1) as i32;
    let increment = TAU / n as f32;
    let mut closest = (yaw / increment).round() as i32;
    let mut target = closest as f32 * increment;
    if (target - yaw).abs() > PI {
        if target > yaw {
            closest -= n;
        } else {
            closest += n;
        }
        target = closest as f32 * increment;
    }
    (closest, target)
}

/// Fraction of the page scrolled. Pages that cannot scroll report 0.
pub fn scroll_fraction(scroll_y: f32, document_height: f32, viewport_height: f32) -> f32 {
    let range = document_height - viewport_height;
    if !(range > 0.0) || !scroll_y.is_finite() {
        return 0.0;
    }
    (scroll_y / range).clamp(0.0, 1.0)
}

#[derive(Clone, Debug)]
pub struct InteractionController {
    phase: GesturePhase,
    press_elapsed: f32,
    timer_fired: bool,
    is_dragging: bool,
    target: RotationTarget,
    num_tiles: usize,
    click_threshold: f32,
    sensitivity: f32,
    max_pitch: f32,
}

impl InteractionController {
    pub fn new(config: &RingConfig) -> Self {
        Self {
            phase: GesturePhase::Idle,
            press_elapsed: 0.0,
            timer_fired: false,
            is_dragging: false,
            target: RotationTarget::default(),
            num_tiles: config.num_tiles,
            click_threshold: config.click_threshold_sec,
            sensitivity: config.drag_sensitivity,
            max_pitch: config.max_pitch,
        }
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    pub fn target(&self) -> RotationTarget {
        self.target
    }

    /// Content anchors use their drag positions while this is set.
    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    pub fn timer_fired(&self) -> bool {
        self.timer_fired
    }

    pub fn on_drag(&mut self, input: DragInput) {
        self.on_press(input);
        self.target.yaw -= input.delta.x * self.sensitivity;
        self.target.pitch = (self.target.pitch - input.delta.y * self.sensitivity)
            .clamp(-self.max_pitch, self.max_pitch);
    }

    /// Track the gesture and click timer without rotating.
    pub fn on_press(&mut self, input: DragInput) {
        if self.phase != GesturePhase::Dragging {
            self.phase = GesturePhase::Dragging;
            self.press_elapsed = 0.0;
            self.timer_fired = false;
        }
        self.is_dragging = input.dragging;
    }

    /// Advance the click timer.
    pub fn tick(&mut self, delta: f32) {
        if self.phase == GesturePhase::Dragging && !self.timer_fired {
            self.press_elapsed += delta.max(0.0);
            if self.press_elapsed >= self.click_threshold {
                self.timer_fired = true;
            }
        }
    }

    pub fn on_drag_end(&mut self) -> DragEnd {
        if self.phase != GesturePhase::Dragging {
            return DragEnd::Ignored;
        }
        self.is_dragging = false;
        if !self.timer_fired {
            self.phase = GesturePhase::Idle;
            return DragEnd::Click;
        }
        let (tile_index, target_yaw) = snap_to_nearest_tile(self.target.yaw, self.num_tiles);
        self.target.yaw = target_yaw;
        self.phase = GesturePhase::Snapping;
        DragEnd::Snap {
            tile_index,
            target_yaw,
        }
    }

    /// Leave `Snapping` once the damped yaw has reached its target.
    pub fn settle(&mut self, current_yaw: f32, epsilon: f32) {
        if self.phase == GesturePhase::Snapping && (current_yaw - self.target.yaw).abs() <= epsilon
        {
            self.phase = GesturePhase::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> InteractionController {
        InteractionController::new(&RingConfig::default())
    }

    #[test]
    fn quick_release_is_a_click() {
        let mut c = controller();
        c.on_drag(DragInput {
            delta: Vec2::new(3.0, 0.0),
            dragging: true,
        });
        c.tick(0.2);
        assert_eq!(c.on_drag_end(), DragEnd::Click);
        assert_eq!(c.phase(), GesturePhase::Idle);
    }

    #[test]
    fn long_drag_snaps() {
        let mut c = controller();
        c.on_drag(DragInput {
            delta: Vec2::new(-300.0, 0.0),
            dragging: true,
        });
        c.tick(0.5);
        c.tick(0.5);
        match c.on_drag_end() {
            DragEnd::Snap { target_yaw, .. } => assert_eq!(c.target().yaw, target_yaw),
            other => panic!("expected snap, got {other:?}"),
        }
        assert_eq!(c.phase(), GesturePhase::Snapping);
        let yaw = c.target().yaw;
        c.settle(yaw, 1e-3);
        assert_eq!(c.phase(), GesturePhase::Idle);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut c = controller();
        c.on_drag(DragInput {
            delta: Vec2::new(0.0, -10_000.0),
            dragging: true,
        });
        assert!((c.target().pitch - 15f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn press_without_rotation_still_clicks() {
        let mut c = controller();
        c.on_press(DragInput {
            delta: Vec2::new(250.0, 40.0),
            dragging: true,
        });
        assert_eq!(c.phase(), GesturePhase::Dragging);
        assert_eq!(c.target(), RotationTarget::default());
        c.tick(0.1);
        assert_eq!(c.on_drag_end(), DragEnd::Click);
    }

    #[test]
    fn release_without_press_is_ignored() {
        assert_eq!(controller().on_drag_end(), DragEnd::Ignored);
    }
}
