//! # Render3d — Displacement-Mapped Sphere Rendering
//!
//! One object, one light, one pipeline. A UV sphere is generated once,
//! packed into an interleaved vertex buffer and drawn every frame with five
//! material maps that displace its surface and shade it Blinn-Phong style.
//!
//! ## Architecture
//!
//! ```text
//!   shapes::generate_sphere ──► vertex::pack ──► GpuMesh (immutable)
//!                                                     │
//!   MaterialLoader (worker threads)                   │
//!        │ LoadOutcome                                │
//!        ▼                                            ▼
//!   MaterialManager ── resolve(channel, enabled) ─► bind group ──► draw
//!        ▲                                            ▲
//!   LayerState (1..5 toggles)              Camera::compute_frame(t)
//!                                           → 144-byte uniform
//! ```
//!
//! ## Bind Group
//!
//! A single group 0 holds everything:
//!
//! | Binding | Content | Visibility |
//! |---------|---------|------------|
//! | 0 | scene uniform (mvp, model, camera position) | vertex + fragment |
//! | 1 | linear/repeat sampler | vertex + fragment |
//! | 2 | diffuse | fragment |
//! | 3 | displacement | vertex + fragment |
//! | 4 | normal | fragment |
//! | 5 | roughness | fragment |
//! | 6 | ambient occlusion | fragment |
//!
//! The group is rebuilt only when the material generation or the layer
//! state changes (see [`draw::BindingTracker`]).
//!
//! ## Shading
//!
//! `shader.wgsl` displaces each vertex along its normal by the red channel
//! of the displacement map (scale 0.1), perturbs the world normal with the
//! normal map without a tangent frame, and lights the result with a point
//! light at `(5, 5, 5)`. Roughness drives both the specular exponent and its
//! strength; AO scales the ambient term.

pub mod camera;
pub mod draw;
pub mod loader;
pub mod material;
pub(crate) mod mesh;
pub(crate) mod pipeline;
pub mod shapes;
pub mod texture;
pub mod vertex;

pub use camera::{Camera, FrameTransforms};
pub use draw::{BindingKey, BindingTracker, RenderOrchestrator};
pub use loader::{FsImageSource, ImageSource, MaterialLoader, decode_image, fetch_set};
pub use material::{
    Channel, ChannelMap, DecodedSet, LayerState, LoadOutcome, LoadStatus, MaterialManager, MaterialSet,
    MaterialSetDescriptor, RequestId,
};
pub use mesh::Mesh;
pub use shapes::generate_sphere;
pub use texture::{PixelBuffer, TextureHandle, TextureUpload};
pub use vertex::{MeshVertex, SceneUniform, pack, unpack};
