//! # Vertex — GPU Byte Layouts
//!
//! Two structs cross the CPU/GPU boundary, and both layouts are part of the
//! contract with `shader.wgsl`. Nothing validates them at runtime: a field in
//! the wrong place simply renders garbage.
//!
//! ## Interleaved Vertex
//!
//! ```text
//! MeshVertex (32 bytes)
//! ┌──────────────┬──────────────┬──────────────┐
//! │ position     │ normal       │ uv           │
//! │ [f32; 3]     │ [f32; 3]     │ [f32; 2]     │
//! │ offset 0     │ offset 12    │ offset 24    │
//! │ location(0)  │ location(1)  │ location(2)  │
//! └──────────────┴──────────────┴──────────────┘
//! ```
//!
//! [`pack`] turns a [`Mesh`] (one attribute stream per field) into this
//! interleaved form, one `MeshVertex` per mesh vertex, in mesh order.
//!
//! ## Scene Uniform
//!
//! ```text
//! SceneUniform (144 bytes, binding 0)
//! ┌────────────────────┬────────────────────┬─────────────────────┐
//! │ mvp: mat4x4        │ model: mat4x4      │ camera_pos + pad    │
//! │ offset 0           │ offset 64          │ offset 128          │
//! └────────────────────┴────────────────────┴─────────────────────┘
//! ```
//!
//! Matrices are column-major, the order `glam::Mat4::to_cols_array_2d`
//! produces and WGSL expects.

use bytemuck::{Pod, Zeroable};

use super::mesh::Mesh;

/// Per-vertex data: position, surface normal, texture UV.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position: vec3<f32>
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal: vec3<f32>
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv: vec2<f32>
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };
}

/// Per-frame uniform block consumed by both shader stages.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SceneUniform {
    pub mvp: [[f32; 4]; 4],   // 64 bytes
    pub model: [[f32; 4]; 4], // 64 bytes
    pub camera_pos: [f32; 3], // 12 bytes
    pub _padding: f32,        // 4 bytes → total 144
}

/// Size of [`SceneUniform`] on the GPU.
pub const SCENE_UNIFORM_SIZE: u64 = std::mem::size_of::<SceneUniform>() as u64;

/// Interleave a mesh's attribute streams into the 32-byte vertex layout.
pub fn interleave(mesh: &Mesh) -> Vec<MeshVertex> {
    mesh.positions
        .iter()
        .zip(&mesh.normals)
        .zip(&mesh.uvs)
        .map(|((p, n), uv)| MeshVertex {
            position: p.to_array(),
            normal: n.to_array(),
            uv: uv.to_array(),
        })
        .collect()
}

/// Pack a mesh into GPU-ready vertex bytes (stride 32).
pub fn pack(mesh: &Mesh) -> Vec<u8> {
    bytemuck::cast_slice(&interleave(mesh)).to_vec()
}

/// Read vertex `index` back out of a packed buffer.
///
/// Returns `None` when the buffer is too short to hold that vertex.
pub fn unpack(bytes: &[u8], index: usize) -> Option<MeshVertex> {
    let stride = std::mem::size_of::<MeshVertex>();
    let start = index.checked_mul(stride)?;
    let chunk = bytes.get(start..start + stride)?;
    Some(bytemuck::pod_read_unaligned(chunk))
}
