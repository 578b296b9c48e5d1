//! The viewer entry point.
//!
//! ```ignore
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     relief::init_logger();
//!     let config = relief::ViewerConfig::load("assets/materials.json")?;
//!     relief::Viewer::new(config).run()?;
//!     Ok(())
//! }
//! ```

use winit::event_loop::{ControlFlow, EventLoop};

use crate::config::ViewerConfig;
use crate::error::InitError;
use crate::window::ViewerApp;

/// Opens a window and renders the sphere until it's closed.
pub struct Viewer {
    config: ViewerConfig,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Run the event loop until the window closes or Esc is pressed.
    ///
    /// Returns an error if the window or GPU couldn't be brought up.
    pub fn run(self) -> Result<(), InitError> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        log::info!(
            "Starting viewer with {} material set(s), asset root '{}'",
            self.config.material_sets.len(),
            self.config.asset_root.display()
        );

        let mut app = ViewerApp::new(self.config);
        event_loop.run_app(&mut app)?;

        match app.init_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Install an `env_logger` backend. `RUST_LOG` is honoured; without it,
/// `info` and above are shown. Safe to call more than once.
pub fn init_logger() {
    let result = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();

    if result.is_err() {
        eprintln!("[relief] Warning: a logger is already set.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logger_twice_is_harmless() {
        init_logger();
        init_logger();
        log::info!("logger initialised");
    }

    #[test]
    fn viewer_keeps_its_config() {
        let config = ViewerConfig::default();
        assert_eq!(Viewer::new(config.clone()).config(), &config);
    }
}
