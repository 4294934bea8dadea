// common/mod.rs — recording GL context and scripted collaborators

#![allow(dead_code)]

use glam::Mat4;
use panorama_gl::gl::{BufferTarget, Capability, GlApi, ShaderStage, TextureTarget};
use panorama_gl::{
    BoxError, ColorConversion, GlslVersion, Interop, Picture, PlaneArray, PlaneRatio, TextureSize,
};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateBuffer(u32),
    DeleteBuffer(u32),
    BindBuffer(BufferTarget, u32),
    UploadBuffer(BufferTarget, u32, usize),
    CreateShader(ShaderStage, u32),
    DeleteShader(u32),
    CreateProgram(u32),
    AttachShader(u32, u32),
    LinkProgram(u32),
    DeleteProgram(u32),
    UseProgram(u32),
    UniformMatrix4(String, [f32; 16]),
    UniformI32(String, i32),
    UniformF32(String, f32),
    UniformVec2(String, f32, f32),
    CreateTexture(u32),
    DeleteTexture(u32),
    BindTexture(u32, TextureTarget, u32),
    VertexAttrib(u32, i32),
    Enable(Capability),
    Disable(Capability),
    DepthMask(bool),
    ClearColor([f32; 4]),
    Clear,
    BindVertexArray,
    DrawTriangles(usize),
    /// Event recorded by a mock collaborator.
    Mark(String),
}

/// Failure knobs for `MockGl`.
#[derive(Debug, Clone, Default)]
pub struct MockGlConfig {
    pub fail_link: bool,
    pub fail_vertex_array: bool,
    /// Names reported as missing even when the shaders declare them.
    pub hidden_names: Vec<String>,
    /// `create_buffer` fails once this many buffers exist.
    pub buffer_limit: Option<usize>,
    pub shader_log: String,
    pub program_log: String,
}

/// `GlApi` that records every call and hands out integer handles.
///
/// Uniform and attribute names resolve only if some shader linked into the
/// program mentions them.
#[derive(Debug, Default)]
pub struct MockGl {
    pub config: MockGlConfig,
    next_id: Cell<u32>,
    calls: RefCell<Vec<Call>>,
    live: RefCell<HashSet<u32>>,
    buffers_created: Cell<usize>,
    shader_sources: RefCell<HashMap<u32, String>>,
    attached: RefCell<HashMap<u32, Vec<u32>>>,
    linked_sources: RefCell<HashMap<u32, String>>,
    attribs: RefCell<HashMap<String, u32>>,
    uploads: RefCell<HashMap<u32, Vec<u8>>>,
}

impl MockGl {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn with_config(config: MockGlConfig) -> Rc<Self> {
        Rc::new(Self {
            config,
            ..Self::default()
        })
    }

    fn alloc(&self) -> u32 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.live.borrow_mut().insert(id);
        id
    }

    fn free(&self, id: u32) {
        self.live.borrow_mut().remove(&id);
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    pub fn mark(&self, what: &str) {
        self.record(Call::Mark(what.to_string()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    /// GL objects created and not yet deleted.
    pub fn live_objects(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn uploaded(&self, buffer: u32) -> Vec<u8> {
        self.uploads.borrow().get(&buffer).cloned().unwrap_or_default()
    }

    /// Last value uploaded to the named matrix uniform.
    pub fn last_matrix(&self, name: &str) -> Option<[f32; 16]> {
        self.calls.borrow().iter().rev().find_map(|c| match c {
            Call::UniformMatrix4(n, m) if n == name => Some(*m),
            _ => None,
        })
    }

    fn resolvable(&self, program: u32, name: &str) -> bool {
        if self.config.hidden_names.iter().any(|n| n == name) {
            return false;
        }
        self.linked_sources
            .borrow()
            .get(&program)
            .is_some_and(|src| src.contains(name))
    }
}

impl GlApi for MockGl {
    type Buffer = u32;
    type Texture = u32;
    type Shader = u32;
    type Program = u32;
    type UniformLocation = String;

    fn bind_vertex_array(&self) -> Result<(), String> {
        if self.config.fail_vertex_array {
            return Err("vertex arrays unsupported".into());
        }
        self.record(Call::BindVertexArray);
        Ok(())
    }

    fn create_buffer(&self) -> Result<u32, String> {
        if let Some(limit) = self.config.buffer_limit {
            if self.buffers_created.get() >= limit {
                return Err("out of buffer names".into());
            }
        }
        self.buffers_created.set(self.buffers_created.get() + 1);
        let id = self.alloc();
        self.record(Call::CreateBuffer(id));
        Ok(id)
    }

    fn delete_buffer(&self, buffer: u32) {
        self.free(buffer);
        self.record(Call::DeleteBuffer(buffer));
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: u32) {
        self.record(Call::BindBuffer(target, buffer));
    }

    fn upload_buffer(&self, target: BufferTarget, buffer: u32, data: &[u8]) {
        self.uploads.borrow_mut().insert(buffer, data.to_vec());
        self.record(Call::UploadBuffer(target, buffer, data.len()));
    }

    fn create_shader(&self, stage: ShaderStage, source: &str) -> Result<u32, String> {
        let id = self.alloc();
        self.shader_sources.borrow_mut().insert(id, source.to_string());
        self.record(Call::CreateShader(stage, id));
        Ok(id)
    }

    fn shader_info_log(&self, _shader: u32) -> String {
        self.config.shader_log.clone()
    }

    fn delete_shader(&self, shader: u32) {
        self.free(shader);
        self.record(Call::DeleteShader(shader));
    }

    fn create_program(&self) -> Result<u32, String> {
        let id = self.alloc();
        self.record(Call::CreateProgram(id));
        Ok(id)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        self.attached.borrow_mut().entry(program).or_default().push(shader);
        self.record(Call::AttachShader(program, shader));
    }

    fn link_program(&self, program: u32) -> bool {
        self.record(Call::LinkProgram(program));
        let sources = self.shader_sources.borrow();
        let linked: String = self
            .attached
            .borrow()
            .get(&program)
            .map(|shaders| {
                shaders
                    .iter()
                    .filter_map(|s| sources.get(s).cloned())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();
        self.linked_sources.borrow_mut().insert(program, linked);
        !self.config.fail_link
    }

    fn program_info_log(&self, _program: u32) -> String {
        self.config.program_log.clone()
    }

    fn delete_program(&self, program: u32) {
        self.free(program);
        self.record(Call::DeleteProgram(program));
    }

    fn use_program(&self, program: u32) {
        self.record(Call::UseProgram(program));
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<String> {
        self.resolvable(program, name).then(|| name.to_string())
    }

    fn attrib_location(&self, program: u32, name: &str) -> Option<u32> {
        if !self.resolvable(program, name) {
            return None;
        }
        let mut attribs = self.attribs.borrow_mut();
        let next = attribs.len() as u32;
        Some(*attribs.entry(name.to_string()).or_insert(next))
    }

    fn uniform_matrix4(&self, location: &String, value: &[f32; 16]) {
        self.record(Call::UniformMatrix4(location.clone(), *value));
    }

    fn uniform_i32(&self, location: &String, value: i32) {
        self.record(Call::UniformI32(location.clone(), value));
    }

    fn uniform_f32(&self, location: &String, value: f32) {
        self.record(Call::UniformF32(location.clone(), value));
    }

    fn uniform_vec2(&self, location: &String, x: f32, y: f32) {
        self.record(Call::UniformVec2(location.clone(), x, y));
    }

    fn create_texture(&self) -> Result<u32, String> {
        let id = self.alloc();
        self.record(Call::CreateTexture(id));
        Ok(id)
    }

    fn delete_texture(&self, texture: u32) {
        self.free(texture);
        self.record(Call::DeleteTexture(texture));
    }

    fn bind_texture(&self, unit: u32, target: TextureTarget, texture: u32) {
        self.record(Call::BindTexture(unit, target, texture));
    }

    fn vertex_attrib_f32(&self, index: u32, components: i32) {
        self.record(Call::VertexAttrib(index, components));
    }

    fn enable(&self, cap: Capability) {
        self.record(Call::Enable(cap));
    }

    fn disable(&self, cap: Capability) {
        self.record(Call::Disable(cap));
    }

    fn depth_mask(&self, enabled: bool) {
        self.record(Call::DepthMask(enabled));
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        self.record(Call::ClearColor(rgba));
    }

    fn clear(&self) {
        self.record(Call::Clear);
    }

    fn draw_triangles_u16(&self, count: usize) {
        self.record(Call::DrawTriangles(count));
    }
}

/// Interop with scripted planes and failures.
#[derive(Debug, Clone)]
pub struct MockInterop {
    pub planes: Vec<PlaneRatio>,
    pub target: TextureTarget,
    pub handles_textures: bool,
    pub fail_generate: bool,
    /// Flip at any time to make the next `update_textures` fail.
    pub fail_update: Rc<Cell<bool>>,
    pub transform: Option<Mat4>,
    owned: Vec<u32>,
}

impl MockInterop {
    pub fn rgba() -> Self {
        Self::with_planes(vec![PlaneRatio::FULL])
    }

    pub fn yuv420() -> Self {
        Self::with_planes(vec![
            PlaneRatio::FULL,
            PlaneRatio::CHROMA_420,
            PlaneRatio::CHROMA_420,
        ])
    }

    pub fn with_planes(planes: Vec<PlaneRatio>) -> Self {
        Self {
            planes,
            target: TextureTarget::Texture2d,
            handles_textures: false,
            fail_generate: false,
            fail_update: Rc::new(Cell::new(false)),
            transform: None,
            owned: Vec::new(),
        }
    }
}

impl Interop<MockGl> for MockInterop {
    fn plane_count(&self) -> usize {
        self.planes.len()
    }

    fn plane_ratio(&self, plane: usize) -> PlaneRatio {
        self.planes[plane]
    }

    fn texture_target(&self) -> TextureTarget {
        self.target
    }

    fn handles_textures(&self) -> bool {
        self.handles_textures
    }

    fn generate_textures(
        &mut self,
        gl: &MockGl,
        sizes: &PlaneArray<TextureSize>,
    ) -> Result<PlaneArray<u32>, BoxError> {
        gl.mark("generate_textures");
        if self.fail_generate {
            return Err("no texture memory".into());
        }
        let mut out = PlaneArray::new();
        for _ in sizes.iter() {
            let _ = out.push(gl.create_texture()?);
        }
        Ok(out)
    }

    fn update_textures(
        &mut self,
        gl: &MockGl,
        textures: &mut PlaneArray<u32>,
        _sizes: &PlaneArray<TextureSize>,
        _picture: &Picture,
    ) -> Result<(), BoxError> {
        gl.mark("update_textures");
        if self.fail_update.get() {
            return Err("decoder surface lost".into());
        }
        if self.handles_textures && textures.is_empty() {
            for _ in 0..self.planes.len() {
                let t = gl.create_texture()?;
                self.owned.push(t);
                let _ = textures.push(t);
            }
        }
        Ok(())
    }

    fn transform_matrix(&self) -> Option<Mat4> {
        self.transform
    }

    fn release(&mut self, gl: &MockGl) {
        gl.mark("interop_release");
        for t in self.owned.drain(..) {
            gl.delete_texture(t);
        }
    }
}

/// Fragment stage sampling `Texture0..N`, with scripted failures.
#[derive(Debug, Clone, Default)]
pub struct MockConverter {
    pub fail_build: bool,
    pub fail_fetch: bool,
}

impl ColorConversion<MockGl> for MockConverter {
    fn build_fragment_shader(
        &mut self,
        gl: &MockGl,
        plane_count: usize,
        _target: TextureTarget,
        version: GlslVersion,
    ) -> Result<u32, BoxError> {
        if self.fail_build {
            return Err("unsupported chroma".into());
        }
        let mut src = version.header();
        for k in 0..plane_count {
            src.push_str(&format!("uniform sampler2D Texture{k};\nvarying vec2 TexCoord{k};\n"));
        }
        src.push_str("void main() { gl_FragColor = texture2D(Texture0, TexCoord0); }\n");
        Ok(gl.create_shader(ShaderStage::Fragment, &src)?)
    }

    fn fetch_locations(&mut self, _gl: &MockGl, _program: u32) -> Result<(), BoxError> {
        if self.fail_fetch {
            return Err("missing Texture0".into());
        }
        Ok(())
    }

    fn prepare_uniforms(&self, gl: &MockGl, _sizes: &PlaneArray<TextureSize>, _alpha: f32) {
        gl.mark("prepare_uniforms");
    }
}

pub fn assert_close(a: f32, b: f32) {
    assert!((a - b).abs() < 1e-5, "{a} != {b}");
}
