//! # Pipeline — Render Pipeline and Long-Lived GPU Resources
//!
//! Everything here is created once at startup and reused every frame:
//!
//! - **One bind group layout** with seven entries, matching the slots the
//!   shader declares (uniform, sampler, then the five maps in channel order).
//!   The uniform, the sampler and the displacement map are visible to the
//!   vertex stage as well, since displacement happens per vertex.
//!
//! - **Depth buffer** in `Depth24Plus`, cleared to 1.0 each frame and tested
//!   with `Less`. It is the only resource that gets recreated, on resize.
//!
//! - **Backface culling** with counter-clockwise front faces, the winding
//!   the sphere generator emits.
//!
//! - **Sampler** with linear min/mag/mip filtering and `Repeat` addressing
//!   on both axes, so UVs that land a hair outside `[0, 1]` at the seam wrap
//!   instead of clamping to an edge texel.

use wgpu::util::DeviceExt;

use super::material::{Channel, ChannelMap};
use super::vertex::{MeshVertex, SCENE_UNIFORM_SIZE, SceneUniform};
use crate::render::GpuContext;

/// Depth texture format used by the renderer.
pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Bind-group slot of the scene uniform.
pub(crate) const UNIFORM_BINDING: u32 = 0;
/// Bind-group slot of the shared sampler.
pub(crate) const SAMPLER_BINDING: u32 = 1;

/// Pipeline, layout, uniform buffer, sampler and depth target.
pub(crate) struct SphereRenderer {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub uniform_buffer: wgpu::Buffer,
    pub sampler: wgpu::Sampler,
    pub depth_texture: wgpu::TextureView,
    pub depth_size: (u32, u32),
}

impl SphereRenderer {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        // ── Shader ──────────────────────────────────────────────────────
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("relief shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        // ── Bind group layout ───────────────────────────────────────────
        let mut entries = vec![
            wgpu::BindGroupLayoutEntry {
                binding: UNIFORM_BINDING,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(SCENE_UNIFORM_SIZE),
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: SAMPLER_BINDING,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ];
        entries.extend(Channel::ALL.map(|channel| wgpu::BindGroupLayoutEntry {
            binding: channel.binding(),
            visibility: if channel == Channel::Displacement {
                wgpu::ShaderStages::VERTEX_FRAGMENT
            } else {
                wgpu::ShaderStages::FRAGMENT
            },
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        }));
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("relief bind group layout"),
            entries: &entries,
        });

        // ── Pipeline layout ─────────────────────────────────────────────
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("relief pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        // ── Render pipeline ─────────────────────────────────────────────
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("relief pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[MeshVertex::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.surface_format(),
                    blend: None, // opaque only
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // ── Uniform buffer ──────────────────────────────────────────────
        let initial = SceneUniform {
            mvp: glam::Mat4::IDENTITY.to_cols_array_2d(),
            model: glam::Mat4::IDENTITY.to_cols_array_2d(),
            camera_pos: [0.0; 3],
            _padding: 0.0,
        };
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("relief scene uniform"),
            contents: bytemuck::bytes_of(&initial),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        // ── Sampler ─────────────────────────────────────────────────────
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("relief sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // ── Depth texture ───────────────────────────────────────────────
        let (w, h) = gpu.surface_size();
        let depth_texture = create_depth_texture(device, w, h);

        Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
            sampler,
            depth_texture,
            depth_size: (w, h),
        }
    }

    /// Recreate the depth texture if the surface size changed.
    pub fn resize_depth_if_needed(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if (width, height) != self.depth_size && width > 0 && height > 0 {
            self.depth_texture = create_depth_texture(device, width, height);
            self.depth_size = (width, height);
        }
    }

    /// Write the per-frame uniform block at offset 0.
    pub fn write_uniform(&self, queue: &wgpu::Queue, uniform: &SceneUniform) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniform));
    }

    /// Bind the uniform, the sampler and one view per channel into a single group.
    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        views: ChannelMap<&wgpu::TextureView>,
    ) -> wgpu::BindGroup {
        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: UNIFORM_BINDING,
                resource: self.uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: SAMPLER_BINDING,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            },
        ];
        entries.extend(views.iter().map(|(channel, view)| wgpu::BindGroupEntry {
            binding: channel.binding(),
            resource: wgpu::BindingResource::TextureView(*view),
        }));

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("relief material bind group"),
            layout: &self.bind_group_layout,
            entries: &entries,
        })
    }
}

/// Create a depth texture at the given dimensions.
fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("relief depth texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
