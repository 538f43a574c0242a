//! Perspective camera plus the rig that sways it with the pointer and
//! zooms it on tile clicks.

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

use crate::config::CameraSettings;
use crate::damp::{Damped, DampedVec3};
use crate::scene::Ray;

/// Right-handed camera looking down its local -Z.
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Vec3,
    /// Euler pitch (x) and yaw (y), applied in XYZ order.
    pub rotation: Vec2,
    pub aspect: f32,
    pub fovy_radians: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, 0.0)
    }

    /// Compute the clip-space projection matrix (depth in `[0, 1]`).
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy_radians, self.aspect, self.znear, self.zfar)
    }

    /// Compute the view matrix that transforms world to view space.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation(), self.position).inverse()
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space ray through a point in normalized device coordinates
    /// (`x` right, `y` up, both in `[-1, 1]`).
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inv = self.view_proj().inverse();
        let near = inv.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inv.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Ray::new(near, far - near)
    }
}

/// Camera state with damped sway and zoom.
#[derive(Clone, Debug)]
pub struct CameraRig {
    camera: Camera,
    settings: CameraSettings,
    position: DampedVec3,
    pitch: Damped,
    yaw: Damped,
    sway_target: Vec2,
    zoomed: bool,
}

impl CameraRig {
    pub fn new(settings: CameraSettings, aspect: f32) -> Self {
        let camera = Camera {
            position: settings.position,
            rotation: Vec2::ZERO,
            aspect: sanitize_aspect(aspect),
            fovy_radians: settings.fov_y,
            znear: settings.near,
            zfar: settings.far,
        };
        Self {
            position: DampedVec3::new(settings.position),
            camera,
            settings,
            pitch: Damped::new(0.0),
            yaw: Damped::new(0.0),
            sway_target: Vec2::ZERO,
            zoomed: false,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn is_zoomed(&self) -> bool {
        self.zoomed
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.camera.aspect = sanitize_aspect(aspect);
    }

    /// Pointer position in NDC sets the sway target.
    pub fn on_pointer_move(&mut self, ndc: Vec2) {
        let ndc = ndc.clamp(Vec2::splat(-1.0), Vec2::splat(1.0));
        self.sway_target = Vec2::new(
            ndc.y * self.settings.sway_max_pitch,
            ndc.x * self.settings.sway_max_yaw,
        );
    }

    /// Flip between the base position and the pushed-back one.
    pub fn toggle_zoom(&mut self) -> bool {
        self.zoomed = !self.zoomed;
        self.zoomed
    }

    fn target_position(&self) -> Vec3 {
        if self.zoomed {
            self.settings.position + Vec3::Z * self.settings.zoom_offset
        } else {
            self.settings.position
        }
    }

    pub fn update(&mut self, delta: f32) {
        let sway = self.settings.sway_smooth_time;
        self.pitch.damp(self.sway_target.x, sway, delta);
        self.yaw.damp(self.sway_target.y, sway, delta);
        let target = self.target_position();
        self.position
            .damp(target, self.settings.zoom_smooth_time, delta);
        self.camera.rotation = Vec2::new(self.pitch.value, self.yaw.value);
        self.camera.position = self.position.value();
    }
}

#[inline]
fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}
