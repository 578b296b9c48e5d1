//! # Mesh — CPU Geometry and Its GPU Upload
//!
//! A [`Mesh`] keeps one stream per attribute (positions, normals, UVs) plus a
//! 16-bit index list. Keeping streams separate makes the generator and its
//! tests read naturally; [`pack`](super::vertex::pack) interleaves them right
//! before upload.
//!
//! A [`GpuMesh`] is the uploaded form: an immutable vertex buffer, an
//! immutable index buffer and the index count for `draw_indexed`. Both
//! buffers live as long as the renderer.

use glam::{Vec2, Vec3};
use wgpu::util::DeviceExt;

use super::vertex;
use crate::render::GpuContext;

/// Largest vertex count addressable with `u16` indices.
pub const MAX_U16_VERTICES: usize = u16::MAX as usize + 1;

/// Indexed triangle mesh with per-vertex position, normal and UV.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    /// Three entries per triangle, counter-clockwise seen from outside.
    pub indices: Vec<u16>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// A mesh that has been uploaded to GPU buffers.
pub(crate) struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub const INDEX_FORMAT: wgpu::IndexFormat = wgpu::IndexFormat::Uint16;

    /// Pack and upload a mesh.
    pub fn upload(gpu: &GpuContext, mesh: &Mesh) -> Self {
        let vertex_bytes = vertex::pack(mesh);
        let vertex_buffer = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sphere vertex buffer"),
            contents: &vertex_bytes,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sphere index buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }
}
