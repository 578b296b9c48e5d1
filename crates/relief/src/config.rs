//! Viewer configuration.
//!
//! Loaded from JSON with [`ViewerConfig::load`], or built in code from
//! [`ViewerConfig::default`]. Every section has defaults, so a config file
//! only needs to list what it changes:
//!
//! ```json
//! {
//!   "sphere": { "width_segments": 64, "height_segments": 32 },
//!   "asset_root": "textures",
//!   "material_sets": [
//!     {
//!       "id": "rock",
//!       "diffuse": "rock/diffuse.png",
//!       "displacement": "rock/displacement.png",
//!       "normal": "rock/normal.png",
//!       "roughness": "rock/roughness.png",
//!       "ambient_occlusion": "rock/ao.png"
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::render3d::material::MaterialSetDescriptor;
use crate::render3d::mesh::MAX_U16_VERTICES;
use crate::render3d::shapes::sphere_vertex_count;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: String::from("relief"),
            width: 1280,
            height: 720,
        }
    }
}

/// Sphere tessellation. Vertex count grows with `width × height`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereConfig {
    pub radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
}

impl Default for SphereConfig {
    fn default() -> Self {
        Self {
            radius: 2.0,
            width_segments: 128,
            height_segments: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub sphere: SphereConfig,
    pub clear_color: [f64; 4],
    /// Directory relative texture locations resolve against.
    pub asset_root: PathBuf,
    pub material_sets: Vec<MaterialSetDescriptor>,
    /// Set loaded at startup. `None` means the first configured set.
    pub initial_set: Option<String>,
    /// Watch the active set's files and reload on change.
    pub hot_reload: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            sphere: SphereConfig::default(),
            clear_color: [0.1, 0.1, 0.1, 1.0],
            asset_root: PathBuf::from("."),
            material_sets: Vec::new(),
            initial_set: None,
            hot_reload: true,
        }
    }
}

impl ViewerConfig {
    /// Read, parse and validate a JSON config file.
    ///
    /// A relative `asset_root` is taken relative to the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json(&text)?;
        if config.asset_root.is_relative() {
            if let Some(dir) = path.parent() {
                config.asset_root = dir.join(&config.asset_root);
            }
        }
        Ok(config)
    }

    /// Parse and validate a JSON string. `asset_root` is left as written.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sphere = &self.sphere;
        if !(sphere.radius.is_finite() && sphere.radius > 0.0) {
            return Err(invalid(format!("sphere radius must be positive, got {}", sphere.radius)));
        }
        if sphere.width_segments < 3 {
            return Err(invalid(format!(
                "sphere width_segments must be at least 3, got {}",
                sphere.width_segments
            )));
        }
        if sphere.height_segments < 2 {
            return Err(invalid(format!(
                "sphere height_segments must be at least 2, got {}",
                sphere.height_segments
            )));
        }
        let vertices = sphere_vertex_count(sphere.width_segments, sphere.height_segments);
        if vertices > MAX_U16_VERTICES {
            return Err(invalid(format!(
                "{}x{} segments need {vertices} vertices, more than 16-bit indices can address ({MAX_U16_VERTICES})",
                sphere.width_segments, sphere.height_segments
            )));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        let mut seen = HashSet::new();
        for set in &self.material_sets {
            if !seen.insert(set.id.as_str()) {
                return Err(invalid(format!("duplicate material set id '{}'", set.id)));
            }
        }

        if let Some(initial) = &self.initial_set {
            if self.set_index(initial).is_none() {
                return Err(invalid(format!("initial_set '{initial}' is not a configured material set")));
            }
        }

        Ok(())
    }

    /// Position of the set with id `id` in `material_sets`.
    pub fn set_index(&self, id: &str) -> Option<usize> {
        self.material_sets.iter().position(|set| set.id == id)
    }

    /// Index of the set to load at startup, if any sets are configured.
    pub fn initial_index(&self) -> Option<usize> {
        match &self.initial_set {
            Some(id) => self.set_index(id),
            None if self.material_sets.is_empty() => None,
            None => Some(0),
        }
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(id: &str) -> MaterialSetDescriptor {
        MaterialSetDescriptor {
            id: id.to_owned(),
            diffuse: format!("{id}/d.png"),
            displacement: format!("{id}/h.png"),
            normal: format!("{id}/n.png"),
            roughness: format!("{id}/r.png"),
            ambient_occlusion: format!("{id}/ao.png"),
        }
    }

    fn assert_invalid(config: &ViewerConfig, needle: &str) {
        match config.validate() {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains(needle), "'{msg}' should mention '{needle}'"),
            other => panic!("expected Invalid mentioning '{needle}', got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        let config = ViewerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.sphere.radius, 2.0);
        assert_eq!((config.window.width, config.window.height), (1280, 720));
        assert_eq!(config.clear_color, [0.1, 0.1, 0.1, 1.0]);
        assert_eq!(config.initial_index(), None);
    }

    #[test]
    fn empty_json_uses_defaults() {
        assert_eq!(ViewerConfig::from_json("{}").unwrap(), ViewerConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = ViewerConfig::from_json(r#"{ "sphere": { "width_segments": 16 } }"#).unwrap();
        assert_eq!(config.sphere.width_segments, 16);
        assert_eq!(config.sphere.height_segments, 64);
        assert_eq!(config.window.title, "relief");
    }

    #[test]
    fn rejects_bad_geometry() {
        let mut config = ViewerConfig::default();
        config.sphere.radius = 0.0;
        assert_invalid(&config, "radius");

        config.sphere.radius = f32::NAN;
        assert_invalid(&config, "radius");

        config = ViewerConfig::default();
        config.sphere.width_segments = 2;
        assert_invalid(&config, "width_segments");

        config = ViewerConfig::default();
        config.sphere.height_segments = 1;
        assert_invalid(&config, "height_segments");
    }

    #[test]
    fn enforces_sixteen_bit_index_range() {
        let mut config = ViewerConfig::default();
        config.sphere.width_segments = 255;
        config.sphere.height_segments = 255;
        config.validate().unwrap();

        config.sphere.height_segments = 256;
        assert_invalid(&config, "16-bit");
    }

    #[test]
    fn rejects_zero_window() {
        let mut config = ViewerConfig::default();
        config.window.height = 0;
        assert_invalid(&config, "window size");
    }

    #[test]
    fn rejects_duplicate_ids_and_unknown_initial_set() {
        let mut config = ViewerConfig {
            material_sets: vec![set("rock"), set("rock")],
            ..Default::default()
        };
        assert_invalid(&config, "duplicate");

        config.material_sets = vec![set("rock"), set("moss")];
        config.initial_set = Some("lava".into());
        assert_invalid(&config, "lava");

        config.initial_set = Some("moss".into());
        config.validate().unwrap();
        assert_eq!(config.initial_index(), Some(1));
    }

    #[test]
    fn first_set_is_initial_by_default() {
        let config = ViewerConfig {
            material_sets: vec![set("rock"), set("moss")],
            ..Default::default()
        };
        assert_eq!(config.initial_index(), Some(0));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(ViewerConfig::from_json("{ nope"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_resolves_asset_root_next_to_the_file() {
        let dir = std::env::temp_dir().join(format!("relief-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("viewer.json");
        std::fs::write(&path, r#"{ "asset_root": "textures" }"#).unwrap();

        let config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config.asset_root, dir.join("textures"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ViewerConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
