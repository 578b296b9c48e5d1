//! # Camera — Per-Frame Transforms
//!
//! The camera never moves: it sits at `(0, 0, 6)` looking at the origin with
//! +Y up. Only the model spins, at 10° per second clockwise seen from above
//! (a negative angle about +Y). The frame transforms are therefore a pure
//! function of wall-clock time and the viewport aspect, which makes them
//! easy to test by pinning `time_secs`.
//!
//! ```text
//! model      = rotY(-10° · t)
//! view       = lookAt(eye, origin, +Y)
//! projection = perspective(45°, aspect, 0.1, 100)
//! mvp        = projection · view · model
//! ```
//!
//! `glam`'s `perspective_rh` maps depth to `[0, 1]`, the clip-space
//! convention wgpu uses.

use glam::{Mat4, Vec3};

use super::vertex::SceneUniform;

pub const EYE: Vec3 = Vec3::new(0.0, 0.0, 6.0);
pub const TARGET: Vec3 = Vec3::ZERO;
pub const UP: Vec3 = Vec3::Y;
pub const FOV_Y_DEGREES: f32 = 45.0;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 100.0;
/// Model spin rate about +Y, degrees per second.
pub const SPIN_DEGREES_PER_SEC: f64 = -10.0;

/// Matrices and camera position for a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransforms {
    pub mvp: Mat4,
    pub model: Mat4,
    pub camera_pos: Vec3,
}

impl FrameTransforms {
    /// The uniform block written to binding 0 each frame.
    pub fn uniform(&self) -> SceneUniform {
        SceneUniform {
            mvp: self.mvp.to_cols_array_2d(),
            model: self.model.to_cols_array_2d(),
            camera_pos: self.camera_pos.to_array(),
            _padding: 0.0,
        }
    }
}

/// Fixed perspective camera. Only the aspect ratio can change (on resize).
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    aspect: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            aspect: aspect_ratio(width, height),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Update the aspect ratio after the viewport changed size.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(EYE, TARGET, UP)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), self.aspect, Z_NEAR, Z_FAR)
    }

    /// Compute the frame transforms at `time_secs` since startup.
    pub fn compute_frame(&self, time_secs: f64) -> FrameTransforms {
        // Angle in f64 so long sessions keep sub-degree precision before the
        // periodic trig folds it back.
        let angle = (SPIN_DEGREES_PER_SEC * time_secs).to_radians() as f32;
        let model = Mat4::from_rotation_y(angle);
        let view_model = self.view() * model;
        FrameTransforms {
            mvp: self.projection() * view_model,
            model,
            camera_pos: EYE,
        }
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}
