// gl.rs — graphics context entry points and the glow adapter

use glow::HasContext;
use std::cell::Cell;
use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    /// Per-vertex attributes (positions, texture coordinates).
    Vertex,
    /// Triangle indices.
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Sampler target of the plane textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureTarget {
    #[default]
    Texture2d,
    /// Non-normalized coordinates; sizes are still passed to the fragment stage.
    Rectangle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Blend,
    DepthTest,
    CullFace,
}

/// The subset of a GL context the renderer drives.
///
/// Calls are only valid while the context is current on the calling thread.
pub trait GlApi {
    type Buffer: Copy + Debug + PartialEq;
    type Texture: Copy + Debug + PartialEq;
    type Shader: Copy + Debug + PartialEq;
    type Program: Copy + Debug + PartialEq;
    type UniformLocation: Clone + Debug;

    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    fn delete_buffer(&self, buffer: Self::Buffer);
    fn bind_buffer(&self, target: BufferTarget, buffer: Self::Buffer);
    /// Binds `buffer` to `target` and replaces its store with `data` (static draw).
    fn upload_buffer(&self, target: BufferTarget, buffer: Self::Buffer, data: &[u8]);

    /// Creates and compiles a shader. A compile failure is not an error here;
    /// it surfaces in the info log and at link time.
    fn create_shader(&self, stage: ShaderStage, source: &str) -> Result<Self::Shader, String>;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    /// Links and returns the link status.
    fn link_program(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&self, program: Self::Program);
    fn use_program(&self, program: Self::Program);

    fn uniform_location(&self, program: Self::Program, name: &str)
        -> Option<Self::UniformLocation>;
    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    /// Column-major, not transposed.
    fn uniform_matrix4(&self, location: &Self::UniformLocation, value: &[f32; 16]);
    fn uniform_i32(&self, location: &Self::UniformLocation, value: i32);
    fn uniform_f32(&self, location: &Self::UniformLocation, value: f32);
    fn uniform_vec2(&self, location: &Self::UniformLocation, x: f32, y: f32);

    fn create_texture(&self) -> Result<Self::Texture, String>;
    fn delete_texture(&self, texture: Self::Texture);
    /// Selects texture unit `unit` and binds `texture` on it.
    fn bind_texture(&self, unit: u32, target: TextureTarget, texture: Self::Texture);

    /// Enables attribute `index` and points it at tightly packed f32 tuples
    /// in the bound vertex buffer.
    fn vertex_attrib_f32(&self, index: u32, components: i32);

    fn enable(&self, cap: Capability);
    fn disable(&self, cap: Capability);
    fn depth_mask(&self, enabled: bool);
    fn clear_color(&self, rgba: [f32; 4]);
    fn clear(&self);

    /// Makes a vertex array object current. Only core profiles need one.
    fn bind_vertex_array(&self) -> Result<(), String> {
        Ok(())
    }

    /// Indexed triangle list from the bound index buffer, `u16` indices.
    fn draw_triangles_u16(&self, count: usize);
}

/// `GlApi` over a `glow::Context`.
pub struct GlowApi {
    gl: glow::Context,
    vertex_array: Cell<Option<glow::VertexArray>>,
}

impl GlowApi {
    /// # Safety
    ///
    /// `gl` must stay current on this thread for the lifetime of the adapter
    /// and of every renderer built on it.
    pub unsafe fn new(gl: glow::Context) -> Self {
        Self {
            gl,
            vertex_array: Cell::new(None),
        }
    }

    /// Raw context, for interops that upload pixels themselves.
    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

impl Drop for GlowApi {
    fn drop(&mut self) {
        if let Some(vao) = self.vertex_array.take() {
            unsafe { self.gl.delete_vertex_array(vao) }
        }
    }
}

fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Vertex => glow::ARRAY_BUFFER,
        BufferTarget::Index => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn texture_target(target: TextureTarget) -> u32 {
    match target {
        TextureTarget::Texture2d => glow::TEXTURE_2D,
        TextureTarget::Rectangle => glow::TEXTURE_RECTANGLE,
    }
}

fn capability(cap: Capability) -> u32 {
    match cap {
        Capability::Blend => glow::BLEND,
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::CullFace => glow::CULL_FACE,
    }
}

impl GlApi for GlowApi {
    type Buffer = <glow::Context as glow::HasContext>::Buffer;
    type Texture = <glow::Context as glow::HasContext>::Texture;
    type Shader = <glow::Context as glow::HasContext>::Shader;
    type Program = <glow::Context as glow::HasContext>::Program;
    type UniformLocation = <glow::Context as glow::HasContext>::UniformLocation;

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        unsafe { self.gl.create_buffer() }
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Self::Buffer) {
        unsafe { self.gl.bind_buffer(buffer_target(target), Some(buffer)) }
    }

    fn upload_buffer(&self, target: BufferTarget, buffer: Self::Buffer, data: &[u8]) {
        let target = buffer_target(target);
        unsafe {
            self.gl.bind_buffer(target, Some(buffer));
            self.gl.buffer_data_u8_slice(target, data, glow::STATIC_DRAW);
        }
    }

    fn create_shader(&self, stage: ShaderStage, source: &str) -> Result<Self::Shader, String> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe {
            let shader = self.gl.create_shader(kind)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            Ok(shader)
        }
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.delete_shader(shader) }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { self.gl.create_program() }
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.attach_shader(program, shader) }
    }

    fn link_program(&self, program: Self::Program) -> bool {
        unsafe {
            self.gl.link_program(program);
            self.gl.get_program_link_status(program)
        }
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn use_program(&self, program: Self::Program) {
        unsafe { self.gl.use_program(Some(program)) }
    }

    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32> {
        unsafe { self.gl.get_attrib_location(program, name) }
    }

    fn uniform_matrix4(&self, location: &Self::UniformLocation, value: &[f32; 16]) {
        unsafe {
            self.gl
                .uniform_matrix_4_f32_slice(Some(location), false, value)
        }
    }

    fn uniform_i32(&self, location: &Self::UniformLocation, value: i32) {
        unsafe { self.gl.uniform_1_i32(Some(location), value) }
    }

    fn uniform_f32(&self, location: &Self::UniformLocation, value: f32) {
        unsafe { self.gl.uniform_1_f32(Some(location), value) }
    }

    fn uniform_vec2(&self, location: &Self::UniformLocation, x: f32, y: f32) {
        unsafe { self.gl.uniform_2_f32(Some(location), x, y) }
    }

    fn create_texture(&self) -> Result<Self::Texture, String> {
        unsafe { self.gl.create_texture() }
    }

    fn delete_texture(&self, texture: Self::Texture) {
        unsafe { self.gl.delete_texture(texture) }
    }

    fn bind_texture(&self, unit: u32, target: TextureTarget, texture: Self::Texture) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(texture_target(target), Some(texture));
        }
    }

    fn vertex_attrib_f32(&self, index: u32, components: i32) {
        unsafe {
            self.gl.enable_vertex_attrib_array(index);
            self.gl
                .vertex_attrib_pointer_f32(index, components, glow::FLOAT, false, 0, 0);
        }
    }

    fn enable(&self, cap: Capability) {
        unsafe { self.gl.enable(capability(cap)) }
    }

    fn disable(&self, cap: Capability) {
        unsafe { self.gl.disable(capability(cap)) }
    }

    fn depth_mask(&self, enabled: bool) {
        unsafe { self.gl.depth_mask(enabled) }
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        unsafe { self.gl.clear_color(rgba[0], rgba[1], rgba[2], rgba[3]) }
    }

    fn clear(&self) {
        unsafe { self.gl.clear(glow::COLOR_BUFFER_BIT) }
    }

    fn bind_vertex_array(&self) -> Result<(), String> {
        // one per context, shared by every renderer on it
        let vao = match self.vertex_array.get() {
            Some(vao) => vao,
            None => {
                let vao = unsafe { self.gl.create_vertex_array()? };
                self.vertex_array.set(Some(vao));
                vao
            }
        };
        unsafe { self.gl.bind_vertex_array(Some(vao)) };
        Ok(())
    }

    fn draw_triangles_u16(&self, count: usize) {
        unsafe {
            self.gl
                .draw_elements(glow::TRIANGLES, count as i32, glow::UNSIGNED_SHORT, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_map_to_gl_constants() {
        assert_eq!(buffer_target(BufferTarget::Vertex), glow::ARRAY_BUFFER);
        assert_eq!(buffer_target(BufferTarget::Index), glow::ELEMENT_ARRAY_BUFFER);
        assert_eq!(texture_target(TextureTarget::Texture2d), glow::TEXTURE_2D);
        assert_eq!(texture_target(TextureTarget::Rectangle), glow::TEXTURE_RECTANGLE);
        assert_eq!(capability(Capability::Blend), glow::BLEND);
        assert_eq!(capability(Capability::DepthTest), glow::DEPTH_TEST);
        assert_eq!(capability(Capability::CullFace), glow::CULL_FACE);
    }

    // Calling into glow needs a current context; these only pin the signatures.
    #[test]
    fn glow_adapter_surface() {
        let _context: fn(&GlowApi) -> &glow::Context = GlowApi::context;
        let _bind: fn(&GlowApi) -> Result<(), String> = <GlowApi as GlApi>::bind_vertex_array;
    }
}
