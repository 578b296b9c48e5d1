//! # Relief — Displacement-Mapped Sphere Viewer
//!
//! Renders a UV sphere with wgpu, displaced and shaded from five material
//! maps (diffuse, displacement, normal, roughness, ambient occlusion), lit by
//! a single point light with Blinn-Phong shading.
//!
//! Material sets load on background threads and swap in atomically; layers
//! can be switched off one by one, falling back to neutral 1×1 textures.
//!
//! Start with [`Viewer`] and a [`ViewerConfig`]. The building blocks (mesh
//! generation, vertex packing, the camera, the material manager) live in
//! [`render3d`] and work without a GPU.

pub mod app;
#[cfg(feature = "hot-reload")]
pub mod asset;
pub mod config;
pub mod error;
pub mod input;
pub mod render;
pub mod render3d;
pub mod time;
mod window;

pub use app::{Viewer, init_logger};
pub use config::ViewerConfig;
pub use error::{ConfigError, InitError, LoadError};
