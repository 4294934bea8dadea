// config.rs — renderer options
//
// Options come from code, a JSON document, or both; a couple of debugging
// switches can be flipped from the environment:
// - PANORAMA_GL_DUMP_SHADERS=1   log generated shader sources at debug level
// - PANORAMA_GL_NPOT=0|1         override non-power-of-two texture support

use crate::error::{RendererError, Result};
use crate::shader::GlslVersion;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const FOV_MIN_DEGREES: f32 = 20.0;
pub const FOV_MAX_DEGREES: f32 = 150.0;
pub const FOV_DEFAULT_DEGREES: f32 = 80.0;

pub const ENV_DUMP_SHADERS: &str = "PANORAMA_GL_DUMP_SHADERS";
pub const ENV_NPOT: &str = "PANORAMA_GL_NPOT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererOptions {
    /// Textures may have non-power-of-two sizes.
    pub supports_npot: bool,
    pub dump_shaders: bool,
    pub glsl_version: GlslVersion,
    /// Legal horizontal field of view, degrees.
    pub fov_min: f32,
    pub fov_max: f32,
    /// Horizontal field of view before the first `set_viewpoint`.
    pub fov_default: f32,
    pub clear_color: [f32; 4],
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            supports_npot: true,
            dump_shaders: false,
            glsl_version: GlslVersion::default(),
            fov_min: FOV_MIN_DEGREES,
            fov_max: FOV_MAX_DEGREES,
            fov_default: FOV_DEFAULT_DEGREES,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl RendererOptions {
    pub fn validate(&self) -> Result<()> {
        let finite = self.fov_min.is_finite() && self.fov_max.is_finite();
        if !finite || self.fov_min <= 0.0 || self.fov_min >= self.fov_max {
            return Err(RendererError::InvalidArgument(format!(
                "fov range [{}, {}] is empty",
                self.fov_min, self.fov_max
            )));
        }
        // tan(fov / 2) diverges at 180°
        if self.fov_max >= 180.0 {
            return Err(RendererError::InvalidArgument(format!(
                "fov_max {} must stay below 180",
                self.fov_max
            )));
        }
        if !(self.fov_min..=self.fov_max).contains(&self.fov_default) {
            return Err(RendererError::InvalidArgument(format!(
                "fov_default {} outside [{}, {}]",
                self.fov_default, self.fov_min, self.fov_max
            )));
        }
        Ok(())
    }

    /// Parses and validates a JSON document; missing fields keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let options: RendererOptions = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn with_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`; unparsable values are ignored.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup(ENV_DUMP_SHADERS).as_deref().and_then(parse_flag) {
            self.dump_shaders = v;
        }
        if let Some(v) = lookup(ENV_NPOT).as_deref().and_then(parse_flag) {
            self.supports_npot = v;
        }
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
