// interop.rs — texture upload and color conversion collaborators

use crate::error::BoxError;
use crate::gl::{GlApi, ShaderStage, TextureTarget};
use crate::planes::{PlaneArray, PlaneRatio, TextureSize};
use crate::shader::GlslVersion;
use glam::Mat4;
use std::fmt::Write;

/// One plane of a decoded picture.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PicturePlane {
    pub pixels: Vec<u8>,
    /// Bytes per line.
    pub pitch: usize,
    pub lines: usize,
}

/// A decoded picture handed to `Renderer::prepare`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Picture {
    pub planes: Vec<PicturePlane>,
}

/// Turns decoded pictures into bound plane textures.
///
/// The plane count and subsampling ratios are fixed for the lifetime of the
/// renderer that owns the interop.
pub trait Interop<A: GlApi> {
    fn plane_count(&self) -> usize;

    fn plane_ratio(&self, plane: usize) -> PlaneRatio;

    fn texture_target(&self) -> TextureTarget {
        TextureTarget::Texture2d
    }

    /// When true the interop creates, owns and deletes its textures. The
    /// renderer then starts with an empty texture array that `update_textures`
    /// fills with whatever should be bound.
    fn handles_textures(&self) -> bool {
        false
    }

    /// Creates one texture per plane at the given sizes. Ownership goes to
    /// the renderer, which deletes them on teardown.
    fn generate_textures(
        &mut self,
        gl: &A,
        sizes: &PlaneArray<TextureSize>,
    ) -> Result<PlaneArray<A::Texture>, BoxError>;

    fn update_textures(
        &mut self,
        gl: &A,
        textures: &mut PlaneArray<A::Texture>,
        sizes: &PlaneArray<TextureSize>,
        picture: &Picture,
    ) -> Result<(), BoxError>;

    /// Extra texture-space transform, e.g. for surfaces stored upside down.
    fn transform_matrix(&self) -> Option<Mat4> {
        None
    }

    /// Releases whatever the interop still holds. Called once, before the
    /// program is deleted.
    fn release(&mut self, _gl: &A) {}
}

/// Generates the fragment stage for a pixel format.
pub trait ColorConversion<A: GlApi> {
    /// Returns a compiled (not necessarily successfully) fragment shader
    /// reading `TexCoord0..plane_count`.
    fn build_fragment_shader(
        &mut self,
        gl: &A,
        plane_count: usize,
        target: TextureTarget,
        version: GlslVersion,
    ) -> Result<A::Shader, BoxError>;

    fn fetch_locations(&mut self, gl: &A, program: A::Program) -> Result<(), BoxError>;

    /// Uploads per-frame uniforms. Called with the program in use.
    fn prepare_uniforms(&self, gl: &A, sizes: &PlaneArray<TextureSize>, alpha: f32);
}

/// Samples a single packed RGBA plane as is.
#[derive(Debug)]
pub struct RgbaConversion<A: GlApi> {
    target: TextureTarget,
    texture: Option<A::UniformLocation>,
    size: Option<A::UniformLocation>,
    alpha: Option<A::UniformLocation>,
}

impl<A: GlApi> Default for RgbaConversion<A> {
    fn default() -> Self {
        Self {
            target: TextureTarget::Texture2d,
            texture: None,
            size: None,
            alpha: None,
        }
    }
}

impl<A: GlApi> RgbaConversion<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fragment_source(target: TextureTarget, version: GlslVersion) -> String {
        let legacy = version.is_legacy();
        let (sampler, lookup) = match (target, legacy) {
            (TextureTarget::Texture2d, true) => ("sampler2D", "texture2D"),
            (TextureTarget::Texture2d, false) => ("sampler2D", "texture"),
            (TextureTarget::Rectangle, true) => ("sampler2DRect", "texture2DRect"),
            (TextureTarget::Rectangle, false) => ("sampler2DRect", "texture"),
        };
        let coord = match target {
            TextureTarget::Texture2d => "TexCoord0",
            TextureTarget::Rectangle => "TexCoord0 * TexSize0",
        };

        let mut src = version.header();
        let _ = writeln!(src, "uniform {sampler} Texture0;");
        if target == TextureTarget::Rectangle {
            src.push_str("uniform vec2 TexSize0;\n");
        }
        src.push_str("uniform float Alpha;\n");
        if legacy {
            src.push_str("varying vec2 TexCoord0;\n");
        } else {
            src.push_str("in vec2 TexCoord0;\nout vec4 FragColor;\n");
        }
        let out = if legacy { "gl_FragColor" } else { "FragColor" };
        src.push_str("void main() {\n");
        let _ = writeln!(src, " vec4 c = {lookup}(Texture0, {coord});");
        let _ = writeln!(src, " {out} = vec4(c.rgb, c.a * Alpha);");
        src.push_str("}\n");
        src
    }
}

impl<A: GlApi> ColorConversion<A> for RgbaConversion<A> {
    fn build_fragment_shader(
        &mut self,
        gl: &A,
        plane_count: usize,
        target: TextureTarget,
        version: GlslVersion,
    ) -> Result<A::Shader, BoxError> {
        if plane_count != 1 {
            return Err(format!("rgba expects 1 plane, got {plane_count}").into());
        }
        self.target = target;
        let src = Self::fragment_source(target, version);
        Ok(gl.create_shader(ShaderStage::Fragment, &src)?)
    }

    fn fetch_locations(&mut self, gl: &A, program: A::Program) -> Result<(), BoxError> {
        self.texture = Some(
            gl.uniform_location(program, "Texture0")
                .ok_or("missing uniform Texture0")?,
        );
        self.alpha = Some(
            gl.uniform_location(program, "Alpha")
                .ok_or("missing uniform Alpha")?,
        );
        if self.target == TextureTarget::Rectangle {
            self.size = Some(
                gl.uniform_location(program, "TexSize0")
                    .ok_or("missing uniform TexSize0")?,
            );
        }
        Ok(())
    }

    fn prepare_uniforms(&self, gl: &A, sizes: &PlaneArray<TextureSize>, alpha: f32) {
        if let Some(loc) = &self.texture {
            gl.uniform_i32(loc, 0);
        }
        if let Some(loc) = &self.alpha {
            gl.uniform_f32(loc, alpha);
        }
        if let (Some(loc), Some(size)) = (&self.size, sizes.get(0)) {
            gl.uniform_vec2(loc, size.width as f32, size.height as f32);
        }
    }
}
