//! # Material — Texture Sets, Fallbacks, and Layer Resolution
//!
//! The sphere is shaded from five maps, one per [`Channel`]. A *material set*
//! supplies all five at once; the [`MaterialManager`] decides, per channel,
//! which texture actually gets bound.
//!
//! ## Resolution Rule
//!
//! ```text
//! resolve(channel, enabled)
//!   enabled && a set is active  →  active set's texture
//!   otherwise                   →  channel's 1×1 fallback
//! ```
//!
//! Fallbacks are neutral for their channel, so disabling a layer removes its
//! contribution rather than blanking the sphere:
//!
//! | Channel      | Fallback RGBA        | Effect                    |
//! |--------------|----------------------|---------------------------|
//! | diffuse      | (128, 128, 128, 255) | mid grey albedo           |
//! | displacement | (0, 0, 0, 255)       | no displacement           |
//! | normal       | (128, 128, 255, 255) | flat (0, 0, 1) offset     |
//! | roughness    | (128, 128, 128, 255) | medium highlight          |
//! | ambient occ. | (255, 255, 255, 255) | unoccluded                |
//!
//! ## Atomic Replacement
//!
//! A set is either installed whole or not at all. Decoding happens off the
//! render thread (see [`loader`](super::loader)); only once all five images
//! decoded does [`MaterialManager::finish_load`] upload them and swap the
//! set in. A failed load uploads nothing and leaves the active set alone;
//! that includes a set with any map larger than the device can hold.
//!
//! ## Request Ordering
//!
//! Loads are tagged with increasing [`RequestId`]s. A result is applied only
//! if its id is newer than the last applied one, so a slow early request can
//! never overwrite a fast later one.
//!
//! Every applied set bumps [`MaterialManager::generation`], which the
//! renderer folds into its bind-group staleness key.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use super::texture::{COLOR_FORMAT, DATA_FORMAT, PixelBuffer, TextureHandle, TextureUpload};
use crate::error::LoadError;

/// One of the five material maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Diffuse = 0,
    Displacement = 1,
    Normal = 2,
    Roughness = 3,
    AmbientOcclusion = 4,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Diffuse,
        Channel::Displacement,
        Channel::Normal,
        Channel::Roughness,
        Channel::AmbientOcclusion,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Bind-group slot of this channel's texture (0 is the uniform, 1 the sampler).
    pub fn binding(self) -> u32 {
        2 + self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Diffuse => "diffuse",
            Channel::Displacement => "displacement",
            Channel::Normal => "normal",
            Channel::Roughness => "roughness",
            Channel::AmbientOcclusion => "ambient occlusion",
        }
    }

    /// Diffuse is colour and decodes from sRGB; the rest are raw data.
    pub fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            Channel::Diffuse => COLOR_FORMAT,
            _ => DATA_FORMAT,
        }
    }

    /// Neutral 1×1 texel used when the layer is disabled or nothing is loaded.
    pub fn fallback_rgba(self) -> [u8; 4] {
        match self {
            Channel::Diffuse => [128, 128, 128, 255],
            Channel::Displacement => [0, 0, 0, 255],
            Channel::Normal => [128, 128, 255, 255],
            Channel::Roughness => [128, 128, 128, 255],
            Channel::AmbientOcclusion => [255, 255, 255, 255],
        }
    }
}

/// One value per [`Channel`], indexable by channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMap<T>(pub [T; 5]);

impl<T> ChannelMap<T> {
    pub fn from_fn(f: impl FnMut(Channel) -> T) -> Self {
        Self(Channel::ALL.map(f))
    }

    /// Build from a fallible function, stopping at the first error in channel order.
    pub fn try_from_fn<E>(mut f: impl FnMut(Channel) -> Result<T, E>) -> Result<Self, E> {
        let [a, b, c, d, e] = Channel::ALL;
        Ok(Self([f(a)?, f(b)?, f(c)?, f(d)?, f(e)?]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, &T)> {
        Channel::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T> Index<Channel> for ChannelMap<T> {
    type Output = T;

    fn index(&self, channel: Channel) -> &T {
        &self.0[channel.index()]
    }
}

impl<T> IndexMut<Channel> for ChannelMap<T> {
    fn index_mut(&mut self, channel: Channel) -> &mut T {
        &mut self.0[channel.index()]
    }
}

/// Which of the five layers are switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerState {
    enabled: ChannelMap<bool>,
}

impl LayerState {
    pub fn all_enabled() -> Self {
        Self {
            enabled: ChannelMap([true; 5]),
        }
    }

    pub fn is_enabled(&self, channel: Channel) -> bool {
        self.enabled[channel]
    }

    pub fn set(&mut self, channel: Channel, enabled: bool) {
        self.enabled[channel] = enabled;
    }

    /// Flip one layer, returning its new state.
    pub fn toggle(&mut self, channel: Channel) -> bool {
        self.enabled[channel] = !self.enabled[channel];
        self.enabled[channel]
    }
}

impl Default for LayerState {
    fn default() -> Self {
        Self::all_enabled()
    }
}

/// Where to find the five images of a material set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialSetDescriptor {
    pub id: String,
    pub diffuse: String,
    pub displacement: String,
    pub normal: String,
    pub roughness: String,
    pub ambient_occlusion: String,
}

impl MaterialSetDescriptor {
    pub fn location(&self, channel: Channel) -> &str {
        match channel {
            Channel::Diffuse => &self.diffuse,
            Channel::Displacement => &self.displacement,
            Channel::Normal => &self.normal,
            Channel::Roughness => &self.roughness,
            Channel::AmbientOcclusion => &self.ambient_occlusion,
        }
    }
}

/// All five maps of a set, decoded and ready for upload.
pub type DecodedSet = ChannelMap<PixelBuffer>;

/// An installed material set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialSet {
    pub id: String,
    pub textures: ChannelMap<TextureHandle>,
}

/// Identifies one load request. Later requests compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

/// What a loader reports when a request completes.
#[derive(Debug)]
pub struct LoadOutcome {
    pub request: RequestId,
    pub set_id: String,
    pub result: Result<DecodedSet, LoadError>,
}

/// How a successful load was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// The set is now active.
    Applied,
    /// A newer request was already applied; this result was discarded.
    Superseded,
}

/// Owns the active material set and the fallback textures.
#[derive(Debug)]
pub struct MaterialManager {
    fallback: ChannelMap<TextureHandle>,
    active: Option<MaterialSet>,
    generation: u64,
    next_request: u64,
    newest_applied: Option<RequestId>,
}

impl MaterialManager {
    /// Create the manager and upload the five fallback textures.
    pub fn new(uploader: &mut impl TextureUpload) -> Self {
        let fallback = ChannelMap::from_fn(|channel| {
            let label = format!("fallback {}", channel.name());
            uploader.upload_rgba8(
                &label,
                &PixelBuffer::solid(channel.fallback_rgba()),
                channel.texture_format(),
            )
        });
        Self {
            fallback,
            active: None,
            generation: 0,
            next_request: 1,
            newest_applied: None,
        }
    }

    /// Allocate the id for a new load request.
    pub fn begin_load(&mut self) -> RequestId {
        let id = RequestId(self.next_request);
        self.next_request += 1;
        id
    }

    /// Install a completed load if it's successful and not stale.
    ///
    /// On `Err` nothing is uploaded and the active set is unchanged.
    pub fn finish_load(
        &mut self,
        outcome: LoadOutcome,
        uploader: &mut impl TextureUpload,
    ) -> Result<LoadStatus, LoadError> {
        let decoded = outcome.result?;

        let max = uploader.max_dimension();
        if let Some((channel, image)) = decoded.iter().find(|(_, image)| !image.fits_within(max)) {
            return Err(LoadError::TooLarge {
                set_id: outcome.set_id,
                channel: channel.name(),
                width: image.width,
                height: image.height,
                max,
            });
        }

        if self.newest_applied.is_some_and(|newest| outcome.request <= newest) {
            return Ok(LoadStatus::Superseded);
        }

        let textures = ChannelMap::from_fn(|channel| {
            let label = format!("{} {}", outcome.set_id, channel.name());
            uploader.upload_rgba8(&label, &decoded[channel], channel.texture_format())
        });

        let previous = self.active.replace(MaterialSet {
            id: outcome.set_id,
            textures,
        });
        if let Some(previous) = previous {
            for (_, &handle) in previous.textures.iter() {
                uploader.release(handle);
            }
        }

        self.newest_applied = Some(outcome.request);
        self.generation += 1;
        Ok(LoadStatus::Applied)
    }

    /// The texture to bind for `channel`.
    pub fn resolve(&self, channel: Channel, enabled: bool) -> TextureHandle {
        match &self.active {
            Some(set) if enabled => set.textures[channel],
            _ => self.fallback[channel],
        }
    }

    /// Resolve every channel against a layer state.
    pub fn resolve_all(&self, layers: LayerState) -> ChannelMap<TextureHandle> {
        ChannelMap::from_fn(|channel| self.resolve(channel, layers.is_enabled(channel)))
    }

    pub fn fallback(&self, channel: Channel) -> TextureHandle {
        self.fallback[channel]
    }

    pub fn active(&self) -> Option<&MaterialSet> {
        self.active.as_ref()
    }

    /// Bumped every time a new set is installed.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
