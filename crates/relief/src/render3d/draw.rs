//! # Draw — The Render Orchestrator
//!
//! [`RenderOrchestrator`] owns every GPU object the sphere needs and runs the
//! per-frame sequence. The window layer calls [`render_frame`] once per
//! redraw; everything else (loads, layer toggles, resizes) only changes state
//! that the next frame picks up.
//!
//! ## Per-Frame Flow
//!
//! ```text
//! render_frame(gpu, t)
//!   │
//!   ├─ 1. Poll loads ─── finish_load() each completed request
//!   │     applied / superseded / failed, logged
//!   │
//!   ├─ 2. Depth check ─── recreate depth texture if resized
//!   │
//!   ├─ 3. Transforms ─── camera.compute_frame(t) → 144-byte uniform
//!   │
//!   ├─ 4. Staleness ─── BindingTracker::prepare(key)
//!   │     key differs from the last built one → resolve 5 channels, rebuild
//!   │     rebuild failed → key not recorded, retried next frame
//!   │
//!   ├─ 5. Render pass
//!   │     Clear color + depth
//!   │     Nothing built yet → nothing drawn
//!   │     Otherwise one draw_indexed over the whole sphere
//!   │
//!   └─ 6. Submit + present
//! ```
//!
//! Polling comes first, so a load that completed since the last frame is
//! always rebuilt into the bind group before the next draw.
//!
//! [`render_frame`]: RenderOrchestrator::render_frame

use std::sync::Arc;

use super::camera::Camera;
use super::loader::{ImageSource, MaterialLoader};
use super::material::{Channel, ChannelMap, LayerState, LoadStatus, MaterialManager, MaterialSetDescriptor, RequestId};
use super::mesh::GpuMesh;
use super::pipeline::SphereRenderer;
use super::shapes::generate_sphere;
use super::texture::{GpuTextureUploader, TextureStore};
use crate::config::ViewerConfig;
use crate::render::{ClearColor, GpuContext, begin_scene_pass};

/// Everything the bind group depends on. Compared by value each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingKey {
    /// [`MaterialManager::generation`] at the time of the build.
    pub generation: u64,
    pub layers: LayerState,
}

/// Decides when the bind group must be rebuilt, and whether to draw.
///
/// Starts from a baseline key that doesn't count as a change. After that,
/// each distinct key asks for a rebuild until one succeeds; only a
/// successful rebuild moves the recorded key forward.
#[derive(Debug)]
pub struct BindingTracker {
    current: BindingKey,
    built: bool,
}

impl BindingTracker {
    pub fn new(baseline: BindingKey) -> Self {
        Self {
            current: baseline,
            built: false,
        }
    }

    /// Whether `key` differs from the key of the current bind group.
    pub fn needs_rebuild(&self, key: BindingKey) -> bool {
        self.current != key
    }

    /// Note that a bind group now exists for `key`.
    pub fn mark_built(&mut self, key: BindingKey) {
        self.current = key;
        self.built = true;
    }

    /// Whether any bind group has been built. Draws are skipped until then.
    pub fn has_built(&self) -> bool {
        self.built
    }

    /// Staleness step of a frame. Calls `rebuild` if `key` is stale and
    /// records the key only if it reports success. Returns whether to draw.
    pub fn prepare(&mut self, key: BindingKey, rebuild: impl FnOnce() -> bool) -> bool {
        if self.needs_rebuild(key) && rebuild() {
            self.mark_built(key);
        }
        self.has_built()
    }
}

/// Owns the pipeline, mesh, textures, materials and bind group, and draws
/// one frame at a time.
pub struct RenderOrchestrator {
    renderer: SphereRenderer,
    mesh: GpuMesh,
    textures: TextureStore,
    materials: MaterialManager,
    loader: MaterialLoader,
    tracker: BindingTracker,
    bind_group: Option<wgpu::BindGroup>,
    layers: LayerState,
    camera: Camera,
    clear_color: ClearColor,
}

impl RenderOrchestrator {
    /// Build the sphere, upload it, create the pipeline and the fallbacks.
    pub fn new(gpu: &GpuContext, config: &ViewerConfig, source: Arc<dyn ImageSource>) -> Self {
        let sphere = &config.sphere;
        let mesh = generate_sphere(sphere.radius, sphere.width_segments, sphere.height_segments);
        log::info!(
            "Sphere mesh: radius {}, {}x{} segments, {} vertices, {} indices",
            sphere.radius,
            sphere.width_segments,
            sphere.height_segments,
            mesh.vertex_count(),
            mesh.index_count(),
        );
        let mesh = GpuMesh::upload(gpu, &mesh);

        let renderer = SphereRenderer::new(gpu);
        let mut textures = TextureStore::new();
        let materials = MaterialManager::new(&mut GpuTextureUploader {
            gpu,
            store: &mut textures,
        });

        let layers = LayerState::all_enabled();
        let tracker = BindingTracker::new(BindingKey {
            generation: materials.generation(),
            layers,
        });

        let (w, h) = gpu.surface_size();
        Self {
            renderer,
            mesh,
            textures,
            materials,
            loader: MaterialLoader::new(source),
            tracker,
            bind_group: None,
            layers,
            camera: Camera::new(w, h),
            clear_color: ClearColor(config.clear_color),
        }
    }

    /// Start loading a material set in the background.
    pub fn request_set(&mut self, descriptor: &MaterialSetDescriptor) -> RequestId {
        let request = self.materials.begin_load();
        log::info!("Loading material set '{}' (request {})", descriptor.id, request.0);
        self.loader.spawn(request, descriptor.clone());
        request
    }

    pub fn layers(&self) -> LayerState {
        self.layers
    }

    pub fn set_layers(&mut self, layers: LayerState) {
        self.layers = layers;
    }

    /// Flip one layer, returning its new state.
    pub fn toggle_layer(&mut self, channel: Channel) -> bool {
        self.layers.toggle(channel)
    }

    /// Id of the set currently bound, if any has loaded.
    pub fn active_set_id(&self) -> Option<&str> {
        self.materials.active().map(|set| set.id.as_str())
    }

    /// Number of requested loads that haven't reported back yet.
    pub fn loads_in_flight(&self) -> usize {
        self.loader.in_flight()
    }

    /// Follow a viewport resize: new aspect and a matching depth target.
    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        self.camera.set_viewport(width, height);
        self.renderer.resize_depth_if_needed(&gpu.device, width, height);
    }

    /// Run one frame at `time_secs` seconds of wall-clock time.
    pub fn render_frame(&mut self, gpu: &GpuContext, time_secs: f64) -> Result<(), wgpu::SurfaceError> {
        // ── 1. Poll loads ───────────────────────────────────────────────
        self.apply_completed_loads(gpu);

        // ── 2. Depth check ──────────────────────────────────────────────
        let (sw, sh) = gpu.surface_size();
        self.renderer.resize_depth_if_needed(&gpu.device, sw, sh);

        // ── 3. Transforms ───────────────────────────────────────────────
        let frame = self.camera.compute_frame(time_secs);
        self.renderer.write_uniform(&gpu.queue, &frame.uniform());

        // ── 4. Staleness ────────────────────────────────────────────────
        let key = BindingKey {
            generation: self.materials.generation(),
            layers: self.layers,
        };
        let (renderer, materials, textures) = (&self.renderer, &self.materials, &self.textures);
        let bind_group = &mut self.bind_group;
        let draw = self.tracker.prepare(key, || match build_bind_group(gpu, renderer, materials, textures, key.layers) {
            Some(built) => {
                *bind_group = Some(built);
                true
            }
            None => false,
        });

        // ── 5. Render pass ──────────────────────────────────────────────
        let output = gpu.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("relief frame encoder"),
            });

        {
            let mut pass = begin_scene_pass(
                &mut encoder,
                &view,
                &self.renderer.depth_texture,
                self.clear_color,
            );

            if let Some(bind_group) = self.bind_group.as_ref().filter(|_| draw) {
                pass.set_pipeline(&self.renderer.pipeline);
                pass.set_bind_group(0, bind_group, &[]);
                pass.set_vertex_buffer(0, self.mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(self.mesh.index_buffer.slice(..), GpuMesh::INDEX_FORMAT);
                pass.draw_indexed(0..self.mesh.index_count, 0, 0..1);
            }
        }

        // ── 6. Submit + present ─────────────────────────────────────────
        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn apply_completed_loads(&mut self, gpu: &GpuContext) {
        for outcome in self.loader.poll() {
            let request = outcome.request;
            let set_id = outcome.set_id.clone();
            let mut uploader = GpuTextureUploader {
                gpu,
                store: &mut self.textures,
            };
            match self.materials.finish_load(outcome, &mut uploader) {
                Ok(LoadStatus::Applied) => {
                    log::info!(
                        "Material set '{set_id}' applied (request {}); {} textures, {} KiB resident",
                        request.0,
                        self.textures.len(),
                        self.textures.resident_bytes() / 1024
                    );
                }
                Ok(LoadStatus::Superseded) => {
                    log::info!(
                        "Material set '{set_id}' finished after a newer request; discarded (request {})",
                        request.0
                    );
                }
                Err(e) => {
                    log::warn!("Failed to load material set '{set_id}': {e}. Keeping the current set.");
                }
            }
        }
    }
}

/// Resolve the five channels and build a bind group from their views.
/// `None` if any resolved handle has no live texture.
fn build_bind_group(
    gpu: &GpuContext,
    renderer: &SphereRenderer,
    materials: &MaterialManager,
    textures: &TextureStore,
    layers: LayerState,
) -> Option<wgpu::BindGroup> {
    let handles = materials.resolve_all(layers);
    match ChannelMap::try_from_fn(|channel| textures.view(handles[channel]).ok_or(channel)) {
        Ok(views) => {
            log::debug!(
                "Rebuilt material bind group (generation {}, layers {layers:?})",
                materials.generation()
            );
            Some(renderer.create_bind_group(&gpu.device, views))
        }
        Err(channel) => {
            log::error!("No live texture for the {} channel; bind group not rebuilt", channel.name());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render3d::material::LoadOutcome;
    use crate::render3d::material::tests::{FakeUploader, decoded_set};

    fn key(generation: u64, layers: LayerState) -> BindingKey {
        BindingKey { generation, layers }
    }

    /// Run `frames` staleness steps with an always-succeeding rebuild;
    /// returns how many rebuilds happened.
    fn run_frames(tracker: &mut BindingTracker, key: BindingKey, frames: usize) -> usize {
        let mut rebuilds = 0;
        for _ in 0..frames {
            tracker.prepare(key, || {
                rebuilds += 1;
                true
            });
        }
        rebuilds
    }

    #[test]
    fn baseline_is_not_stale() {
        let layers = LayerState::all_enabled();
        let mut tracker = BindingTracker::new(key(0, layers));
        assert_eq!(run_frames(&mut tracker, key(0, layers), 3), 0);
        assert!(!tracker.prepare(key(0, layers), || true), "nothing drawn until a first build");
    }

    #[test]
    fn layer_toggle_triggers_exactly_one_rebuild() {
        let mut layers = LayerState::all_enabled();
        let mut tracker = BindingTracker::new(key(1, layers));

        layers.toggle(Channel::Normal);
        assert_eq!(run_frames(&mut tracker, key(1, layers), 10), 1);
        assert!(tracker.has_built());
    }

    #[test]
    fn new_generation_triggers_one_rebuild() {
        let layers = LayerState::all_enabled();
        let mut tracker = BindingTracker::new(key(0, layers));

        assert_eq!(run_frames(&mut tracker, key(1, layers), 3), 1, "first load applied");
        assert_eq!(run_frames(&mut tracker, key(2, layers), 3), 1, "second load applied");
    }

    #[test]
    fn toggling_back_still_counts_as_a_change() {
        let mut layers = LayerState::all_enabled();
        let mut tracker = BindingTracker::new(key(1, layers));

        layers.toggle(Channel::Roughness);
        assert_eq!(run_frames(&mut tracker, key(1, layers), 1), 1);
        layers.toggle(Channel::Roughness);
        assert_eq!(run_frames(&mut tracker, key(1, layers), 2), 1);
    }

    #[test]
    fn failed_rebuild_is_retried_next_frame() {
        let layers = LayerState::all_enabled();
        let mut tracker = BindingTracker::new(key(0, layers));

        assert!(!tracker.prepare(key(1, layers), || false), "no bind group, no draw");
        assert!(tracker.needs_rebuild(key(1, layers)));

        let mut attempts = 0;
        let draw = tracker.prepare(key(1, layers), || {
            attempts += 1;
            true
        });
        assert_eq!(attempts, 1);
        assert!(draw);
        assert!(!tracker.needs_rebuild(key(1, layers)));
    }

    #[test]
    fn failed_rebuild_keeps_drawing_the_previous_bind_group() {
        let layers = LayerState::all_enabled();
        let mut tracker = BindingTracker::new(key(0, layers));
        run_frames(&mut tracker, key(1, layers), 1);

        assert!(tracker.prepare(key(2, layers), || false));
        assert!(tracker.needs_rebuild(key(2, layers)));
    }

    #[test]
    fn load_applied_before_staleness_check_is_drawn_that_frame() {
        let mut up = FakeUploader::default();
        let mut materials = MaterialManager::new(&mut up);
        let layers = LayerState::all_enabled();
        let mut tracker = BindingTracker::new(key(materials.generation(), layers));

        // Startup frame: nothing loaded, nothing drawn.
        assert!(!tracker.prepare(key(materials.generation(), layers), || true));

        // Poll step applies a completed load, then the same frame checks staleness.
        let request = materials.begin_load();
        let outcome = LoadOutcome {
            request,
            set_id: "rock".into(),
            result: Ok(decoded_set(1)),
        };
        materials.finish_load(outcome, &mut up).unwrap();

        let mut bound = None;
        let draw = tracker.prepare(key(materials.generation(), layers), || {
            bound = Some(materials.resolve_all(layers));
            true
        });
        assert!(draw);
        let set = materials.active().unwrap();
        assert_eq!(bound, Some(set.textures));
    }
}
