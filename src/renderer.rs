// renderer.rs — GL renderer: geometry, camera state and per-frame draw

use crate::config::RendererOptions;
use crate::error::{RendererError, Result};
use crate::gl::{BufferTarget, Capability, GlApi, TextureTarget};
use crate::interop::{ColorConversion, Interop, Picture};
use crate::matrix::{self, TransformSet};
use crate::mesh::{CubePadding, Mesh, MeshBuilder};
use crate::panorama::{VideoFormat, Viewpoint, VisibleRegion};
use crate::planes::{sampling_rect, texture_size, PlaneArray, PlaneRatio, TextureSize, MAX_PLANES};
use crate::shader::ShaderProgram;
use glam::Mat4;
use std::rc::Rc;

/// Smallest horizontal FOV change (radians) that recomputes fov_y and zoom.
pub const FOV_EPSILON: f32 = 0.001;

struct Buffers<A: GlApi> {
    vertex: A::Buffer,
    index: A::Buffer,
    tex_coords: PlaneArray<A::Buffer>,
}

impl<A: GlApi> Buffers<A> {
    /// All or nothing: buffers created before a failure are deleted.
    fn create(gl: &A, plane_count: usize) -> Result<Self> {
        let acquire = |what: &str| {
            gl.create_buffer()
                .map_err(|e| RendererError::ResourceAcquisition(format!("{what} buffer: {e}")))
        };

        gl.bind_vertex_array()
            .map_err(|e| RendererError::ResourceAcquisition(format!("vertex array: {e}")))?;

        let vertex = acquire("vertex")?;
        let index = match acquire("index") {
            Ok(b) => b,
            Err(e) => {
                gl.delete_buffer(vertex);
                return Err(e);
            }
        };
        match PlaneArray::try_from_fn(plane_count, |_| acquire("texture coordinate")) {
            Ok(tex_coords) => Ok(Self {
                vertex,
                index,
                tex_coords,
            }),
            Err((created, e)) => {
                gl.delete_buffer(vertex);
                gl.delete_buffer(index);
                for b in created.iter() {
                    gl.delete_buffer(*b);
                }
                Err(e)
            }
        }
    }

    fn delete(&self, gl: &A) {
        gl.delete_buffer(self.vertex);
        gl.delete_buffer(self.index);
        for b in self.tex_coords.iter() {
            gl.delete_buffer(*b);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    /// Nothing prepared yet.
    Empty,
    Ready,
    /// The last `prepare` failed; textures may hold anything.
    Failed,
}

/// Draws one video format through a linked program.
///
/// Created once per format; `destroy` (or drop) releases every GL object,
/// the interop included. The context behind `gl` must be current for every call.
pub struct Renderer<A: GlApi> {
    gl: Rc<A>,
    interop: Box<dyn Interop<A>>,
    converter: Box<dyn ColorConversion<A>>,
    program: ShaderProgram<A>,

    format: VideoFormat,
    options: RendererOptions,
    target: TextureTarget,

    buffers: Buffers<A>,
    textures: PlaneArray<A::Texture>,
    tex_sizes: PlaneArray<TextureSize>,
    plane_ratios: PlaneArray<PlaneRatio>,

    mesh: Option<Mesh>,
    build_mesh: MeshBuilder,
    last_source: Option<VisibleRegion>,
    frame: FrameState,

    // camera; angles in radians, viewpoint stored reversed
    viewpoint: Viewpoint,
    fov_x: f32,
    fov_y: f32,
    sar: f32,
    z: f32,
    transforms: TransformSet,
}

impl<A: GlApi> Renderer<A> {
    pub fn new(
        gl: Rc<A>,
        mut interop: Box<dyn Interop<A>>,
        mut converter: Box<dyn ColorConversion<A>>,
        format: VideoFormat,
        options: RendererOptions,
    ) -> Result<Self> {
        let plane_count = interop.plane_count();
        let checked = options.validate().and_then(|()| {
            if plane_count == 0 || plane_count > MAX_PLANES {
                return Err(RendererError::InvalidArgument(format!(
                    "plane count {plane_count} outside 1..={MAX_PLANES}"
                )));
            }
            Ok(())
        });
        if let Err(e) = checked {
            interop.release(&*gl);
            return Err(e);
        }

        let target = interop.texture_target();
        let program =
            match ShaderProgram::build(&*gl, converter.as_mut(), plane_count, target, &options) {
                Ok(p) => p,
                Err(e) => {
                    interop.release(&*gl);
                    return Err(e);
                }
            };

        let plane_ratios = PlaneArray::from_fn(plane_count, |j| interop.plane_ratio(j));
        let tex_sizes = plane_ratios.map(|ratio| {
            texture_size(
                format.visible.width,
                format.visible.height,
                *ratio,
                options.supports_npot,
            )
        });

        let textures = if interop.handles_textures() {
            PlaneArray::new()
        } else {
            match Self::generate_textures(&*gl, interop.as_mut(), &tex_sizes) {
                Ok(t) => t,
                Err(e) => {
                    interop.release(&*gl);
                    program.delete(&*gl);
                    return Err(e);
                }
            }
        };

        gl.disable(Capability::Blend);
        gl.disable(Capability::DepthTest);
        gl.depth_mask(false);
        gl.enable(Capability::CullFace);
        gl.clear_color(options.clear_color);
        gl.clear();

        let buffers = match Buffers::create(&*gl, plane_count) {
            Ok(b) => b,
            Err(e) => {
                if !interop.handles_textures() {
                    for t in textures.iter() {
                        gl.delete_texture(*t);
                    }
                }
                interop.release(&*gl);
                program.delete(&*gl);
                return Err(e);
            }
        };

        let fov_x = options.fov_default.to_radians();
        let sar = 1.0;
        let fov_y = matrix::vertical_fov(fov_x, sar);
        let z = matrix::zoom_distance(fov_x, fov_y, options.fov_max);
        let viewpoint = Viewpoint {
            fov: options.fov_default,
            ..Viewpoint::default()
        }
        .reversed();

        let mut renderer = Self {
            gl,
            interop,
            converter,
            program,
            format,
            options,
            target,
            buffers,
            textures,
            tex_sizes,
            plane_ratios,
            mesh: None,
            build_mesh: Mesh::build,
            last_source: None,
            frame: FrameState::Empty,
            viewpoint,
            fov_x,
            fov_y,
            sar,
            z,
            transforms: TransformSet {
                orientation: matrix::orientation(format.orientation),
                ..TransformSet::default()
            },
        };
        renderer.update_viewpoint_matrices();

        log::debug!(
            "renderer ready: {:?}, {} plane(s), textures {:?}",
            renderer.format.projection,
            plane_count,
            renderer.tex_sizes
        );
        Ok(renderer)
    }

    fn generate_textures(
        gl: &A,
        interop: &mut dyn Interop<A>,
        sizes: &PlaneArray<TextureSize>,
    ) -> Result<PlaneArray<A::Texture>> {
        let textures = interop
            .generate_textures(gl, sizes)
            .map_err(|e| RendererError::ResourceAcquisition(format!("textures: {e}")))?;
        if textures.len() != sizes.len() {
            for t in textures.iter() {
                gl.delete_texture(*t);
            }
            return Err(RendererError::ResourceAcquisition(format!(
                "interop generated {} texture(s) for {} plane(s)",
                textures.len(),
                sizes.len()
            )));
        }
        Ok(textures)
    }

    /// Points the camera. Fails without side effects when the FOV is outside
    /// the configured range or an angle is not finite.
    pub fn set_viewpoint(&mut self, vp: &Viewpoint) -> Result<()> {
        if !(self.options.fov_min..=self.options.fov_max).contains(&vp.fov) {
            return Err(RendererError::InvalidArgument(format!(
                "fov {} outside [{}, {}]",
                vp.fov, self.options.fov_min, self.options.fov_max
            )));
        }
        if !(vp.yaw.is_finite() && vp.pitch.is_finite() && vp.roll.is_finite()) {
            return Err(RendererError::InvalidArgument(format!(
                "non-finite viewpoint {vp:?}"
            )));
        }

        self.viewpoint = vp.reversed();

        let fov_x = vp.fov.to_radians();
        if (fov_x - self.fov_x).abs() >= FOV_EPSILON {
            self.fov_x = fov_x;
            self.update_fov_y();
            self.update_z();
        }
        self.update_viewpoint_matrices();
        Ok(())
    }

    /// Window width / height.
    pub fn set_window_aspect_ratio(&mut self, sar: f32) -> Result<()> {
        if !(sar.is_finite() && sar > 0.0) {
            return Err(RendererError::InvalidArgument(format!(
                "aspect ratio {sar} must be positive"
            )));
        }
        self.sar = sar;
        self.update_fov_y();
        self.update_z();
        self.update_viewpoint_matrices();
        Ok(())
    }

    fn update_fov_y(&mut self) {
        self.fov_y = matrix::vertical_fov(self.fov_x, self.sar);
    }

    fn update_z(&mut self) {
        self.z = matrix::zoom_distance(self.fov_x, self.fov_y, self.options.fov_max);
    }

    fn update_viewpoint_matrices(&mut self) {
        let (projection, zoom, view) = matrix::viewpoint_matrices(
            self.format.projection,
            self.sar,
            self.fov_y,
            self.z,
            &self.viewpoint,
        );
        self.transforms.projection = projection;
        self.transforms.zoom = zoom;
        self.transforms.view = view;
    }

    /// Uploads `picture` into the plane textures.
    pub fn prepare(&mut self, picture: &Picture) -> Result<()> {
        let gl = &*self.gl;
        match self
            .interop
            .update_textures(gl, &mut self.textures, &self.tex_sizes, picture)
        {
            Ok(()) => {
                self.frame = FrameState::Ready;
                Ok(())
            }
            Err(e) => {
                log::warn!("texture update failed: {e}");
                self.frame = FrameState::Failed;
                Err(RendererError::Upstream(e))
            }
        }
    }

    /// Draws the last prepared picture, showing `source` of it.
    ///
    /// Geometry is rebuilt only when `source` differs from the previous draw.
    pub fn draw(&mut self, source: &VisibleRegion) -> Result<()> {
        if self.frame != FrameState::Ready {
            return Err(RendererError::StaleFrame);
        }

        let gl = Rc::clone(&self.gl);
        let gl = &*gl;

        gl.clear();
        gl.use_program(self.program.program);

        if self.last_source != Some(*source) {
            self.rebuild_geometry(gl, source)?;
        }
        let index_count = self.index_count();

        self.converter.prepare_uniforms(gl, &self.tex_sizes, 1.0);

        for j in 0..self.plane_count() {
            if let Some(texture) = self.textures.get(j) {
                gl.bind_texture(j as u32, self.target, *texture);
            }
            gl.bind_buffer(BufferTarget::Vertex, self.buffers.tex_coords[j]);
            if let Some(loc) = self.program.attribs.multi_tex_coord[j] {
                gl.vertex_attrib_f32(loc, 2);
            }
        }

        gl.bind_buffer(BufferTarget::Vertex, self.buffers.vertex);
        gl.vertex_attrib_f32(self.program.attribs.vertex_position, 3);
        gl.bind_buffer(BufferTarget::Index, self.buffers.index);

        let transform = self.interop.transform_matrix().unwrap_or(Mat4::IDENTITY);
        let u = &self.program.uniforms;
        gl.uniform_matrix4(&u.transform, &transform.to_cols_array());
        gl.uniform_matrix4(&u.orientation, &self.transforms.orientation.to_cols_array());
        gl.uniform_matrix4(&u.projection, &self.transforms.projection.to_cols_array());
        gl.uniform_matrix4(&u.view, &self.transforms.view.to_cols_array());
        gl.uniform_matrix4(&u.zoom, &self.transforms.zoom.to_cols_array());

        gl.draw_triangles_u16(index_count);
        log::trace!("drew {index_count} indices");
        Ok(())
    }

    /// On failure the previous geometry and region stay in place.
    fn rebuild_geometry(&mut self, gl: &A, source: &VisibleRegion) -> Result<()> {
        let multiview = self.format.multiview;
        let rects = PlaneArray::from_fn(self.plane_count(), |j| {
            sampling_rect(source, self.plane_ratios[j], self.tex_sizes[j]).stereo_crop(multiview)
        });
        let (horizontal, vertical) = self.format.cubemap_padding_fraction();
        let padding = CubePadding {
            horizontal,
            vertical,
        };

        let mesh = (self.build_mesh)(self.format.projection, &rects, padding).map_err(|e| {
            log::error!("geometry rebuild failed: {e}");
            e
        })?;

        for (j, uv) in mesh.uvs.iter().enumerate() {
            gl.upload_buffer(
                BufferTarget::Vertex,
                self.buffers.tex_coords[j],
                bytemuck::cast_slice(uv.as_slice()),
            );
        }
        gl.upload_buffer(
            BufferTarget::Vertex,
            self.buffers.vertex,
            bytemuck::cast_slice(mesh.positions.as_slice()),
        );
        gl.upload_buffer(
            BufferTarget::Index,
            self.buffers.index,
            bytemuck::cast_slice(mesh.indices.as_slice()),
        );

        log::debug!(
            "rebuilt {:?} geometry for {:?}: {} vertices, {} indices",
            self.format.projection,
            source,
            mesh.vertex_count(),
            mesh.index_count()
        );
        self.mesh = Some(mesh);
        self.last_source = Some(*source);
        Ok(())
    }

    /// Releases every GL object and the interop.
    pub fn destroy(self) {
        drop(self);
    }

    /// The viewpoint as last set, not reversed.
    pub fn viewpoint(&self) -> Viewpoint {
        self.viewpoint.reversed()
    }

    /// Horizontal field of view, radians.
    pub fn fov_x(&self) -> f32 {
        self.fov_x
    }

    /// Vertical field of view, radians.
    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn zoom(&self) -> f32 {
        self.z
    }

    pub fn window_aspect_ratio(&self) -> f32 {
        self.sar
    }

    pub fn transforms(&self) -> &TransformSet {
        &self.transforms
    }

    pub fn plane_count(&self) -> usize {
        self.plane_ratios.len()
    }

    pub fn texture_sizes(&self) -> &PlaneArray<TextureSize> {
        &self.tex_sizes
    }

    pub fn textures(&self) -> &PlaneArray<A::Texture> {
        &self.textures
    }

    /// Indices of the current geometry; 0 before the first draw.
    pub fn index_count(&self) -> usize {
        self.mesh.as_ref().map_or(0, Mesh::index_count)
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    /// Replaces the geometry builder, used from the next region change on.
    pub fn set_mesh_builder(&mut self, builder: MeshBuilder) {
        self.build_mesh = builder;
    }

    pub fn format(&self) -> &VideoFormat {
        &self.format
    }

    pub fn options(&self) -> &RendererOptions {
        &self.options
    }
}

impl<A: GlApi> Drop for Renderer<A> {
    fn drop(&mut self) {
        let gl = &*self.gl;
        self.buffers.delete(gl);
        if !self.interop.handles_textures() {
            for t in self.textures.iter() {
                gl.delete_texture(*t);
            }
        }
        self.interop.release(gl);
        self.program.delete(gl);
        log::debug!("renderer destroyed");
    }
}
