//! Spinning, displacement-mapped sphere.
//!
//! ```text
//! cargo run --example viewer -- [path/to/materials.json]
//! ```
//!
//! Defaults to `assets/materials.json` in this crate. Keys `1`..`5` toggle
//! layers, arrows switch material sets, `R` reloads, `Esc` quits.

use relief::{Viewer, ViewerConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    relief::init_logger();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| concat!(env!("CARGO_MANIFEST_DIR"), "/assets/materials.json").to_owned());
    let config = ViewerConfig::load(&path)?;

    Viewer::new(config).run()?;
    Ok(())
}
