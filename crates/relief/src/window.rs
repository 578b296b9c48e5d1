//! Window management via winit.
//!
//! Implements [`winit::application::ApplicationHandler`] to drive the event
//! loop: window and GPU creation, keyboard input, resize, and the continuous
//! redraw loop.

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use crate::config::ViewerConfig;
use crate::error::InitError;
use crate::input::{Input, KeyCode, ViewerAction, actions};
use crate::render::GpuContext;
use crate::render3d::draw::RenderOrchestrator;
use crate::render3d::loader::FsImageSource;
use crate::time::Time;

/// Window and GPU state. Created on the first `resumed`.
struct Surface {
    window: Arc<Window>,
    gpu: GpuContext,
    orchestrator: RenderOrchestrator,
}

/// The application state that winit drives.
pub(crate) struct ViewerApp {
    config: ViewerConfig,
    source: Arc<FsImageSource>,
    surface: Option<Surface>,
    keys: Input<KeyCode>,
    time: Time,
    /// Index into `config.material_sets` of the last requested set.
    selected: Option<usize>,
    #[cfg(feature = "hot-reload")]
    watcher: Option<crate::asset::MaterialWatcher>,
    /// Startup failure, handed back to the caller once the loop exits.
    pub init_error: Option<InitError>,
}

impl ViewerApp {
    pub fn new(config: ViewerConfig) -> Self {
        let source = Arc::new(FsImageSource::new(config.asset_root.clone()));
        #[cfg(feature = "hot-reload")]
        let watcher = config.hot_reload.then(crate::asset::MaterialWatcher::new);
        Self {
            selected: config.initial_index(),
            config,
            source,
            surface: None,
            keys: Input::new(),
            time: Time::new(),
            #[cfg(feature = "hot-reload")]
            watcher,
            init_error: None,
        }
    }

    fn init_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<Surface, InitError> {
        let attrs = Window::default_attributes()
            .with_title(&self.config.window.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = Arc::new(event_loop.create_window(attrs)?);
        let gpu = GpuContext::new(window.clone())?;
        let orchestrator = RenderOrchestrator::new(&gpu, &self.config, self.source.clone());
        Ok(Surface {
            window,
            gpu,
            orchestrator,
        })
    }

    /// Request the currently selected set, if there is one.
    fn request_selected(&mut self) {
        let (Some(index), Some(surface)) = (self.selected, self.surface.as_mut()) else {
            return;
        };
        if let Some(descriptor) = self.config.material_sets.get(index) {
            surface.orchestrator.request_set(descriptor);
        }
    }

    fn handle_action(&mut self, action: ViewerAction, event_loop: &ActiveEventLoop) {
        match action {
            ViewerAction::ToggleLayer(channel) => {
                if let Some(surface) = &mut self.surface {
                    let enabled = surface.orchestrator.toggle_layer(channel);
                    log::info!("{} layer {}", channel.name(), if enabled { "on" } else { "off" });
                }
            }
            ViewerAction::NextSet | ViewerAction::PreviousSet => {
                let count = self.config.material_sets.len();
                let forward = action == ViewerAction::NextSet;
                let Some(next) = step_selection(self.selected, count, forward) else {
                    log::info!("No material sets configured");
                    return;
                };
                self.selected = Some(next);
                log::info!("Selected material set '{}'", self.config.material_sets[next].id);
                self.request_selected();
            }
            ViewerAction::Reload => self.request_selected(),
            ViewerAction::Exit => {
                log::info!("Escape pressed, exiting.");
                event_loop.exit();
            }
        }
    }

    /// Keep the watch list on the active set and re-request it when its
    /// files settle after a change.
    #[cfg(feature = "hot-reload")]
    fn poll_hot_reload(&mut self) {
        let (Some(watcher), Some(surface)) = (self.watcher.as_mut(), self.surface.as_mut()) else {
            return;
        };

        let active = surface.orchestrator.active_set_id();
        if active.is_some() && active != watcher.watched_set() {
            if let Some(descriptor) = active.and_then(|id| self.config.set_index(id)).map(|i| &self.config.material_sets[i]) {
                let paths = crate::render3d::material::Channel::ALL
                    .map(|channel| self.source.resolve_path(descriptor.location(channel)));
                watcher.watch_set(&descriptor.id, paths);
            }
        }

        if let Some(set_id) = watcher.poll(std::time::Instant::now()) {
            match hot_reload_target(&self.config, self.selected, &set_id) {
                Some(index) => {
                    log::info!("Reloading material set '{set_id}' after a file change");
                    surface.orchestrator.request_set(&self.config.material_sets[index]);
                }
                None => log::debug!("Ignoring file change in '{set_id}'; another set is selected"),
            }
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.time.update();

        for action in actions(&self.keys) {
            self.handle_action(action, event_loop);
        }
        self.keys.clear_just();

        #[cfg(feature = "hot-reload")]
        self.poll_hot_reload();

        let Some(surface) = &mut self.surface else {
            return;
        };

        match surface.orchestrator.render_frame(&surface.gpu, self.time.elapsed_secs_f64()) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                surface.gpu.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of GPU memory!");
                event_loop.exit();
            }
            Err(e) => {
                log::warn!("Surface error: {e:?}");
            }
        }

        if self.time.frame_count() % 600 == 0 {
            log::debug!(
                "frame {}: {:.1} fps, {} loads in flight",
                self.time.frame_count(),
                self.time.fps(),
                surface.orchestrator.loads_in_flight()
            );
        }

        surface.window.request_redraw();
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surface.is_some() {
            return;
        }

        match self.init_surface(event_loop) {
            Ok(surface) => {
                surface.window.request_redraw();
                self.surface = Some(surface);
                self.request_selected();
            }
            Err(e) => {
                log::error!("Startup failed: {e}");
                self.init_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Window close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(surface) = &mut self.surface {
                    surface.gpu.resize(size.width, size.height);
                    surface
                        .orchestrator
                        .resize(&surface.gpu, size.width, size.height);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.keys.press(key_code),
                        ElementState::Released => self.keys.release(key_code),
                    }
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}

/// The set index one step forward or back from `current`, wrapping.
/// With nothing selected yet, forward starts at the first set and back at
/// the last.
fn step_selection(current: Option<usize>, count: usize, forward: bool) -> Option<usize> {
    if count == 0 {
        return None;
    }
    Some(match (current, forward) {
        (None, true) => 0,
        (None, false) => count - 1,
        (Some(i), true) => (i + 1) % count,
        (Some(i), false) => (i + count - 1) % count,
    })
}

/// The set to reload after `changed_set`'s files changed: only the selected
/// set, so a file change never overrides a newer selection.
#[cfg(feature = "hot-reload")]
fn hot_reload_target(config: &ViewerConfig, selected: Option<usize>, changed_set: &str) -> Option<usize> {
    selected.filter(|&index| {
        config
            .material_sets
            .get(index)
            .is_some_and(|set| set.id == changed_set)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_wraps_both_ways() {
        assert_eq!(step_selection(Some(2), 3, true), Some(0));
        assert_eq!(step_selection(Some(0), 3, false), Some(2));
        assert_eq!(step_selection(Some(1), 3, true), Some(2));
    }

    #[test]
    fn selection_starts_at_an_end() {
        assert_eq!(step_selection(None, 4, true), Some(0));
        assert_eq!(step_selection(None, 4, false), Some(3));
    }

    #[test]
    fn selection_with_no_sets() {
        assert_eq!(step_selection(None, 0, true), None);
        assert_eq!(step_selection(Some(0), 0, false), None);
    }

    #[test]
    fn single_set_stays_put() {
        assert_eq!(step_selection(Some(0), 1, true), Some(0));
        assert_eq!(step_selection(Some(0), 1, false), Some(0));
    }

    #[cfg(feature = "hot-reload")]
    #[test]
    fn file_change_only_reloads_the_selected_set() {
        let config = ViewerConfig::from_json(
            r#"{ "material_sets": [
                { "id": "rock", "diffuse": "a", "displacement": "b", "normal": "c", "roughness": "d", "ambient_occlusion": "e" },
                { "id": "bark", "diffuse": "a", "displacement": "b", "normal": "c", "roughness": "d", "ambient_occlusion": "e" }
            ] }"#,
        )
        .unwrap();

        assert_eq!(hot_reload_target(&config, Some(0), "rock"), Some(0));
        // User moved on to "bark" while "rock" was still bound.
        assert_eq!(hot_reload_target(&config, Some(1), "rock"), None);
        assert_eq!(hot_reload_target(&config, None, "rock"), None);
        assert_eq!(hot_reload_target(&config, Some(1), "bark"), Some(1));
    }
}
