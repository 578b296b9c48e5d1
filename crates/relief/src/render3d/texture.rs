//! # Texture — Decoded Pixels and GPU Texture Storage
//!
//! Same handle-based pattern as a mesh store: callers hold a cheap, copyable
//! [`TextureHandle`] and the [`TextureStore`] owns the `wgpu::TextureView`s.
//! Handles index a slot vector; released slots are recycled, so swapping
//! material sets back and forth doesn't grow the store.
//!
//! The diffuse map is colour and is stored as [`COLOR_FORMAT`], so sampling
//! decodes it to linear before shading and the sRGB surface encodes it once on
//! store. The other four maps carry data (heights, normals, roughness, AO) and
//! are stored as [`DATA_FORMAT`], sampled as written.
//!
//! Uploads larger than the device's 2D texture limit are never attempted;
//! [`TextureUpload::max_dimension`] lets the caller reject them first.
//!
//! ## The Upload Seam
//!
//! [`TextureUpload`] is the only way the material manager touches the GPU.
//! The renderer implements it with [`GpuTextureUploader`]; tests implement it
//! with an in-memory fake, so material bookkeeping runs without a device.

use wgpu::util::DeviceExt;

use crate::render::GpuContext;

/// Handle to a texture in the [`TextureStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) usize);

/// Format for colour maps (diffuse).
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Format for data maps (displacement, normal, roughness, AO).
pub const DATA_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// A decoded image, tightly packed RGBA8 rows, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl PixelBuffer {
    /// Whether both sides fit within `max` texels.
    pub fn fits_within(&self, max: u32) -> bool {
        self.width <= max && self.height <= max
    }

    /// A 1×1 image of a single colour.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: rgba.to_vec(),
        }
    }
}

/// Something that can turn decoded pixels into bindable textures.
pub trait TextureUpload {
    /// Largest width or height a single upload may have.
    fn max_dimension(&self) -> u32;

    fn upload_rgba8(&mut self, label: &str, image: &PixelBuffer, format: wgpu::TextureFormat) -> TextureHandle;

    /// Drop a texture that is no longer referenced by any material.
    fn release(&mut self, handle: TextureHandle);
}

/// Internal entry for a loaded GPU texture.
pub(crate) struct TextureEntry {
    pub view: wgpu::TextureView,
    /// Bytes of RGBA8 data uploaded.
    pub bytes: usize,
}

/// Stores all live GPU textures.
#[derive(Default)]
pub(crate) struct TextureStore {
    entries: Vec<Option<TextureEntry>>,
    free: Vec<usize>,
}

impl TextureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the view for a handle, or `None` if it was released.
    pub fn view(&self, handle: TextureHandle) -> Option<&wgpu::TextureView> {
        self.entries
            .get(handle.0)
            .and_then(Option::as_ref)
            .map(|entry| &entry.view)
    }

    /// Number of live textures.
    pub fn len(&self) -> usize {
        self.entries.len() - self.free.len()
    }

    /// Total texel bytes held by live textures.
    pub fn resident_bytes(&self) -> usize {
        self.entries.iter().flatten().map(|entry| entry.bytes).sum()
    }

    fn insert(&mut self, entry: TextureEntry) -> TextureHandle {
        match self.free.pop() {
            Some(slot) => {
                self.entries[slot] = Some(entry);
                TextureHandle(slot)
            }
            None => {
                self.entries.push(Some(entry));
                TextureHandle(self.entries.len() - 1)
            }
        }
    }

    fn remove(&mut self, handle: TextureHandle) {
        if let Some(slot) = self.entries.get_mut(handle.0) {
            if slot.take().is_some() {
                self.free.push(handle.0);
            }
        }
    }
}

/// [`TextureUpload`] implementation that creates real GPU textures.
pub(crate) struct GpuTextureUploader<'a> {
    pub gpu: &'a GpuContext,
    pub store: &'a mut TextureStore,
}

impl TextureUpload for GpuTextureUploader<'_> {
    fn max_dimension(&self) -> u32 {
        self.gpu.device.limits().max_texture_dimension_2d
    }

    fn upload_rgba8(&mut self, label: &str, image: &PixelBuffer, format: wgpu::TextureFormat) -> TextureHandle {
        let texture = self.gpu.device.create_texture_with_data(
            &self.gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: image.width,
                    height: image.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &image.rgba,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.store.insert(TextureEntry {
            view,
            bytes: image.rgba.len(),
        })
    }

    fn release(&mut self, handle: TextureHandle) {
        self.store.remove(handle);
    }
}
