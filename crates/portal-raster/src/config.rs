//! Renderer configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::Projection;
use crate::error::ConfigError;
use crate::math::{MAX_SCREEN_ROWS, ScreenSize};

/// Settings for a [`RenderContext`](crate::RenderContext).
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub screen_width: u32,
    pub screen_height: u32,
    /// Horizontal field of view in degrees.
    pub field_of_view: f32,
    /// Depth of the near clipping plane in world units.
    pub near_plane: f32,
    /// Cells in the per-frame scratch arena.
    pub arena_capacity: usize,
    /// Largest portal polygon the traversal accepts.
    pub max_polygon_vertices: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            screen_width: 320,
            screen_height: 200,
            field_of_view: 90.0,
            near_plane: 1.0,
            arena_capacity: 64 * 1024,
            max_polygon_vertices: 32,
        }
    }
}

impl RenderConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Pretty-printed JSON holding every field.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the config as JSON, e.g. to start a custom config from the
    /// defaults.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = self.to_json_string()?;
        fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.screen_width == 0 || self.screen_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "screen size {}x{} is empty",
                self.screen_width, self.screen_height
            )));
        }
        if self.screen_height > MAX_SCREEN_ROWS as u32 {
            return Err(ConfigError::Invalid(format!(
                "screen height {} exceeds {MAX_SCREEN_ROWS} rows",
                self.screen_height
            )));
        }
        if !(self.field_of_view > 0.0 && self.field_of_view < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "field of view {} must lie strictly between 0 and 180 degrees",
                self.field_of_view
            )));
        }
        if !(self.near_plane > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "near plane {} must be positive",
                self.near_plane
            )));
        }
        // Room for the screen region plus one region drawn through it.
        let minimum = 4 * self.screen_height as usize;
        if self.arena_capacity < minimum {
            return Err(ConfigError::Invalid(format!(
                "arena capacity {} is below the {minimum} cells two screen-high regions need",
                self.arena_capacity
            )));
        }
        if self.max_polygon_vertices < 3 {
            return Err(ConfigError::Invalid(format!(
                "max polygon vertices {} is below 3",
                self.max_polygon_vertices
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn screen(&self) -> ScreenSize {
        ScreenSize::new(self.screen_width, self.screen_height)
    }

    pub fn projection(&self) -> Projection {
        Projection::from_fov(self.screen(), self.field_of_view, self.near_plane)
    }
}
