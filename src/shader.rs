// shader.rs — vertex shader generation and program linking

use crate::config::RendererOptions;
use crate::error::{RendererError, Result};
use crate::gl::{GlApi, ShaderStage, TextureTarget};
use crate::interop::ColorConversion;
use crate::planes::MAX_PLANES;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Shading language dialect of the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlslVersion {
    pub version: u32,
    /// OpenGL ES / WebGL.
    pub es: bool,
}

impl Default for GlslVersion {
    fn default() -> Self {
        Self::DESKTOP_120
    }
}

impl GlslVersion {
    pub const DESKTOP_120: GlslVersion = GlslVersion { version: 120, es: false };
    pub const ES_100: GlslVersion = GlslVersion { version: 100, es: true };

    /// `attribute`/`varying` rather than `in`/`out`.
    pub fn is_legacy(self) -> bool {
        if self.es {
            self.version < 300
        } else {
            self.version < 130
        }
    }

    /// The `#version` line and, on ES, the default float precision.
    pub fn header(self) -> String {
        let mut out = if self.es && self.version >= 300 {
            format!("#version {} es\n", self.version)
        } else {
            format!("#version {}\n", self.version)
        };
        if self.es {
            out.push_str("precision highp float;\n");
        }
        out
    }
}

pub const TRANSFORM_MATRIX: &str = "TransformMatrix";
pub const ORIENTATION_MATRIX: &str = "OrientationMatrix";
pub const PROJECTION_MATRIX: &str = "ProjectionMatrix";
pub const VIEW_MATRIX: &str = "ViewMatrix";
pub const ZOOM_MATRIX: &str = "ZoomMatrix";
pub const VERTEX_POSITION: &str = "VertexPosition";

pub fn multi_tex_coord(plane: usize) -> String {
    format!("MultiTexCoord{plane}")
}

/// Vertex stage shared by every pixel format.
///
/// Each plane K gets an input `MultiTexCoordK` and an output `TexCoordK`
/// consumed by the fragment stage.
pub fn vertex_shader_source(plane_count: usize, version: GlslVersion) -> String {
    let (attribute, varying) = if version.is_legacy() {
        ("attribute", "varying")
    } else {
        ("in", "out")
    };

    let mut src = version.header();
    for k in 0..plane_count {
        let _ = writeln!(src, "{varying} vec2 TexCoord{k};");
        let _ = writeln!(src, "{attribute} vec4 MultiTexCoord{k};");
    }
    let _ = writeln!(src, "{attribute} vec3 {VERTEX_POSITION};");
    for name in [
        TRANSFORM_MATRIX,
        ORIENTATION_MATRIX,
        PROJECTION_MATRIX,
        ZOOM_MATRIX,
        VIEW_MATRIX,
    ] {
        let _ = writeln!(src, "uniform mat4 {name};");
    }

    src.push_str("void main() {\n");
    for k in 0..plane_count {
        let _ = writeln!(
            src,
            " TexCoord{k} = vec4({TRANSFORM_MATRIX} * {ORIENTATION_MATRIX} * MultiTexCoord{k}).st;"
        );
    }
    let _ = writeln!(
        src,
        " gl_Position = {PROJECTION_MATRIX} * {ZOOM_MATRIX} * {VIEW_MATRIX} * vec4({VERTEX_POSITION}, 1.0);"
    );
    src.push_str("}\n");
    src
}

#[derive(Debug, Clone)]
pub struct UniformLocations<L> {
    pub transform: L,
    pub orientation: L,
    pub projection: L,
    pub view: L,
    pub zoom: L,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttribLocations {
    pub vertex_position: u32,
    /// `None` past the plane count.
    pub multi_tex_coord: [Option<u32>; MAX_PLANES],
}

/// A linked program with every location the draw path needs.
#[derive(Debug)]
pub struct ShaderProgram<A: GlApi> {
    pub program: A::Program,
    pub uniforms: UniformLocations<A::UniformLocation>,
    pub attribs: AttribLocations,
}

impl<A: GlApi> ShaderProgram<A> {
    /// Compiles the vertex stage, links it with the converter's fragment
    /// stage and resolves all locations.
    ///
    /// Nothing is left allocated on failure.
    pub fn build(
        gl: &A,
        converter: &mut dyn ColorConversion<A>,
        plane_count: usize,
        target: TextureTarget,
        options: &RendererOptions,
    ) -> Result<Self> {
        let version = options.glsl_version;
        let vertex_src = vertex_shader_source(plane_count, version);
        if options.dump_shaders {
            log::debug!("\n=== Vertex shader ===\n{vertex_src}");
        }

        let vertex = gl
            .create_shader(ShaderStage::Vertex, &vertex_src)
            .map_err(|e| RendererError::ShaderBuild(format!("vertex shader: {e}")))?;

        let fragment = match converter.build_fragment_shader(gl, plane_count, target, version) {
            Ok(shader) => shader,
            Err(e) => {
                gl.delete_shader(vertex);
                return Err(RendererError::ShaderBuild(format!("fragment shader: {e}")));
            }
        };

        for (stage, shader) in [("vertex", vertex), ("fragment", fragment)] {
            let info = gl.shader_info_log(shader);
            if !info.trim().is_empty() {
                log::error!("{stage} shader info log: {info}");
            }
        }

        let program = match gl.create_program() {
            Ok(p) => p,
            Err(e) => {
                gl.delete_shader(vertex);
                gl.delete_shader(fragment);
                return Err(RendererError::ResourceAcquisition(format!("program: {e}")));
            }
        };
        gl.attach_shader(program, vertex);
        gl.attach_shader(program, fragment);
        let linked = gl.link_program(program);

        // the program keeps the compiled stages alive
        gl.delete_shader(vertex);
        gl.delete_shader(fragment);

        let info = gl.program_info_log(program);
        if !info.trim().is_empty() {
            log::error!("shader program info log: {info}");
        }
        if !linked {
            log::error!("unable to link the shader program");
            gl.delete_program(program);
            return Err(RendererError::ShaderBuild("link failed".into()));
        }

        let resolved = Self::resolve_locations(gl, program, plane_count).and_then(|(u, a)| {
            converter
                .fetch_locations(gl, program)
                .map_err(|e| RendererError::ShaderBuild(format!("color conversion: {e}")))?;
            Ok((u, a))
        });

        match resolved {
            Ok((uniforms, attribs)) => Ok(Self {
                program,
                uniforms,
                attribs,
            }),
            Err(e) => {
                log::error!("{e}");
                gl.delete_program(program);
                Err(e)
            }
        }
    }

    fn resolve_locations(
        gl: &A,
        program: A::Program,
        plane_count: usize,
    ) -> Result<(UniformLocations<A::UniformLocation>, AttribLocations)> {
        let uniform = |name: &str| {
            gl.uniform_location(program, name)
                .ok_or_else(|| RendererError::ShaderBuild(format!("missing uniform {name}")))
        };
        let attrib = |name: &str| {
            gl.attrib_location(program, name)
                .ok_or_else(|| RendererError::ShaderBuild(format!("missing attribute {name}")))
        };

        let uniforms = UniformLocations {
            transform: uniform(TRANSFORM_MATRIX)?,
            orientation: uniform(ORIENTATION_MATRIX)?,
            projection: uniform(PROJECTION_MATRIX)?,
            view: uniform(VIEW_MATRIX)?,
            zoom: uniform(ZOOM_MATRIX)?,
        };

        let mut attribs = AttribLocations {
            vertex_position: attrib(VERTEX_POSITION)?,
            multi_tex_coord: [None; MAX_PLANES],
        };
        for k in 0..plane_count.min(MAX_PLANES) {
            attribs.multi_tex_coord[k] = Some(attrib(&multi_tex_coord(k))?);
        }

        Ok((uniforms, attribs))
    }

    pub fn delete(&self, gl: &A) {
        gl.delete_program(self.program);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_versions() {
        assert!(GlslVersion::DESKTOP_120.is_legacy());
        assert!(GlslVersion::ES_100.is_legacy());
        assert!(!GlslVersion { version: 330, es: false }.is_legacy());
        assert!(!GlslVersion { version: 300, es: true }.is_legacy());
    }

    #[test]
    fn header_per_dialect() {
        assert_eq!(GlslVersion::DESKTOP_120.header(), "#version 120\n");
        assert_eq!(
            GlslVersion::ES_100.header(),
            "#version 100\nprecision highp float;\n"
        );
        assert_eq!(
            GlslVersion { version: 300, es: true }.header(),
            "#version 300 es\nprecision highp float;\n"
        );
    }

    #[test]
    fn declares_one_coordinate_pair_per_plane() {
        let src = vertex_shader_source(3, GlslVersion::DESKTOP_120);
        for k in 0..3 {
            assert!(src.contains(&format!("varying vec2 TexCoord{k};")));
            assert!(src.contains(&format!("attribute vec4 MultiTexCoord{k};")));
            assert!(src.contains(&format!(
                "TexCoord{k} = vec4(TransformMatrix * OrientationMatrix * MultiTexCoord{k}).st;"
            )));
        }
        assert!(!src.contains("MultiTexCoord3"));
    }

    #[test]
    fn single_plane_has_no_extra_coordinates() {
        let src = vertex_shader_source(1, GlslVersion::DESKTOP_120);
        assert!(src.contains("MultiTexCoord0"));
        assert!(!src.contains("MultiTexCoord1"));
    }

    #[test]
    fn declares_matrices_and_position() {
        let src = vertex_shader_source(1, GlslVersion::ES_100);
        for name in [
            "TransformMatrix",
            "OrientationMatrix",
            "ProjectionMatrix",
            "ZoomMatrix",
            "ViewMatrix",
        ] {
            assert!(src.contains(&format!("uniform mat4 {name};")), "{name}");
        }
        assert!(src.contains("attribute vec3 VertexPosition;"));
        assert!(src.contains("gl_Position = ProjectionMatrix * ZoomMatrix * ViewMatrix"));
        assert!(src.starts_with("#version 100\nprecision highp float;\n"));
    }

    #[test]
    fn modern_glsl_uses_in_out() {
        let src = vertex_shader_source(2, GlslVersion { version: 330, es: false });
        assert!(src.contains("out vec2 TexCoord1;"));
        assert!(src.contains("in vec4 MultiTexCoord1;"));
        assert!(src.contains("in vec3 VertexPosition;"));
        assert!(!src.contains("attribute"));
        assert!(!src.contains("varying"));
    }
}
