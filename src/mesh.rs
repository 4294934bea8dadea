// mesh.rs — rectangle / sphere / cube geometry with per-plane texture coordinates

use crate::error::Result;
use crate::matrix::SPHERE_RADIUS;
use crate::panorama::ProjectionMode;
use crate::planes::{PlaneArray, PlaneRect};

pub const SPHERE_LAT_BANDS: usize = 128;
pub const SPHERE_LON_BANDS: usize = 128;

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub positions: Vec<[f32; 3]>,
    /// One coordinate per vertex, for each texture plane.
    pub uvs: PlaneArray<Vec<[f32; 2]>>,
    pub indices: Vec<u16>,
}

/// Geometry builder used by the renderer; `Mesh::build` unless replaced.
pub type MeshBuilder = fn(ProjectionMode, &PlaneArray<PlaneRect>, CubePadding) -> Result<Mesh>;

/// Inward padding of each cube face, in normalized texture units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CubePadding {
    pub horizontal: f32,
    pub vertical: f32,
}

impl Mesh {
    /// Geometry for `mode`, one UV set per entry of `rects`.
    pub fn build(
        mode: ProjectionMode,
        rects: &PlaneArray<PlaneRect>,
        padding: CubePadding,
    ) -> Result<Mesh> {
        match mode {
            ProjectionMode::Rectangular => build_rectangle(rects),
            ProjectionMode::Equirectangular => build_sphere(rects),
            ProjectionMode::CubemapStandard => build_cube(rects, padding),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

fn alloc<T>(len: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    Ok(v)
}

/// Reserves every array up front so a failure leaves nothing half-built.
fn alloc_mesh(planes: usize, vertices: usize, indices: usize) -> Result<Mesh> {
    let positions = alloc(vertices)?;
    let uvs = PlaneArray::try_from_fn(planes, |_| alloc(vertices)).map_err(|(_, e)| e)?;
    let indices = alloc(indices)?;
    Ok(Mesh {
        positions,
        uvs,
        indices,
    })
}

pub fn build_rectangle(rects: &PlaneArray<PlaneRect>) -> Result<Mesh> {
    let mut mesh = alloc_mesh(rects.len(), 4, 6)?;

    mesh.positions.extend_from_slice(&[
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, -1.0],
        [1.0, 1.0, -1.0],
        [1.0, -1.0, -1.0],
    ]);

    for (uv, r) in mesh.uvs.iter_mut().zip(rects.iter()) {
        uv.extend_from_slice(&[
            [r.left, r.top],
            [r.left, r.bottom],
            [r.right, r.top],
            [r.right, r.bottom],
        ]);
    }

    mesh.indices.extend_from_slice(&[0, 1, 2, 2, 1, 3]);

    Ok(mesh)
}

pub fn build_sphere(rects: &PlaneArray<PlaneRect>) -> Result<Mesh> {
    let lat = SPHERE_LAT_BANDS;
    let lon = SPHERE_LON_BANDS;
    let mut mesh = alloc_mesh(rects.len(), (lat + 1) * (lon + 1), lat * lon * 6)?;

    for i in 0..=lat {
        let theta = std::f32::consts::PI * (i as f32) / (lat as f32);
        let (sin_t, cos_t) = theta.sin_cos();

        for j in 0..=lon {
            let phi = 2.0 * std::f32::consts::PI * (j as f32) / (lon as f32);
            let (sin_p, cos_p) = phi.sin_cos();

            mesh.positions.push([
                SPHERE_RADIUS * cos_p * sin_t,
                SPHERE_RADIUS * cos_t,
                SPHERE_RADIUS * sin_p * sin_t,
            ]);

            // the j == lon column repeats the j == 0 meridian with u at the far edge
            for (uv, r) in mesh.uvs.iter_mut().zip(rects.iter()) {
                let u = (j as f32) / (lon as f32) * r.width();
                let v = (i as f32) / (lat as f32) * r.height();
                uv.push([u, v]);
            }
        }
    }

    for i in 0..lat {
        for j in 0..lon {
            let first = (i * (lon + 1) + j) as u16;
            let second = first + (lon + 1) as u16;

            mesh.indices.extend_from_slice(&[
                first, second, first + 1,
                second, second + 1, first + 1,
            ]);
        }
    }

    Ok(mesh)
}

#[rustfmt::skip]
const CUBE_POSITIONS: [[f32; 3]; 24] = [
    [-1.0,  1.0, -1.0], // front
    [-1.0, -1.0, -1.0],
    [ 1.0,  1.0, -1.0],
    [ 1.0, -1.0, -1.0],

    [-1.0,  1.0,  1.0], // back
    [-1.0, -1.0,  1.0],
    [ 1.0,  1.0,  1.0],
    [ 1.0, -1.0,  1.0],

    [-1.0,  1.0, -1.0], // left
    [-1.0, -1.0, -1.0],
    [-1.0,  1.0,  1.0],
    [-1.0, -1.0,  1.0],

    [ 1.0,  1.0, -1.0], // right
    [ 1.0, -1.0, -1.0],
    [ 1.0,  1.0,  1.0],
    [ 1.0, -1.0,  1.0],

    [-1.0, -1.0,  1.0], // bottom
    [-1.0, -1.0, -1.0],
    [ 1.0, -1.0,  1.0],
    [ 1.0, -1.0, -1.0],

    [-1.0,  1.0,  1.0], // top
    [-1.0,  1.0, -1.0],
    [ 1.0,  1.0,  1.0],
    [ 1.0,  1.0, -1.0],
];

#[rustfmt::skip]
const CUBE_INDICES: [u16; 36] = [
    0, 1, 2,       2, 1, 3,    // front
    6, 7, 4,       4, 7, 5,    // back
    10, 11, 8,     8, 11, 9,   // left
    12, 13, 14,    14, 13, 15, // right
    18, 19, 16,    16, 19, 17, // bottom
    20, 21, 22,    22, 21, 23, // top
];

/// Face layout in the source atlas (3 columns x 2 rows):
///
/// ```text
///   right | left  | top
///   bottom| front | back
/// ```
pub fn build_cube(rects: &PlaneArray<PlaneRect>, padding: CubePadding) -> Result<Mesh> {
    let mut mesh = alloc_mesh(rects.len(), 24, 36)?;

    mesh.positions.extend_from_slice(&CUBE_POSITIONS);

    let pw = padding.horizontal;
    let ph = padding.vertical;

    for (uv, r) in mesh.uvs.iter_mut().zip(rects.iter()) {
        let width = r.width();
        let height = r.height();

        let col = [
            r.left,
            r.left + width * 1.0 / 3.0,
            r.left + width * 2.0 / 3.0,
            r.left + width,
        ];
        let row = [r.top, r.top + height * 1.0 / 2.0, r.top + height];

        #[rustfmt::skip]
        let tex: [[f32; 2]; 24] = [
            [col[1] + pw, row[1] + ph], // front
            [col[1] + pw, row[2] - ph],
            [col[2] - pw, row[1] + ph],
            [col[2] - pw, row[2] - ph],

            [col[3] - pw, row[1] + ph], // back
            [col[3] - pw, row[2] - ph],
            [col[2] + pw, row[1] + ph],
            [col[2] + pw, row[2] - ph],

            [col[2] - pw, row[0] + ph], // left
            [col[2] - pw, row[1] - ph],
            [col[1] + pw, row[0] + ph],
            [col[1] + pw, row[1] - ph],

            [col[0] + pw, row[0] + ph], // right
            [col[0] + pw, row[1] - ph],
            [col[1] - pw, row[0] + ph],
            [col[1] - pw, row[1] - ph],

            [col[0] + pw, row[2] - ph], // bottom
            [col[0] + pw, row[1] + ph],
            [col[1] - pw, row[2] - ph],
            [col[1] - pw, row[1] + ph],

            [col[2] + pw, row[0] + ph], // top
            [col[2] + pw, row[1] - ph],
            [col[3] - pw, row[0] + ph],
            [col[3] - pw, row[1] - ph],
        ];

        uv.extend_from_slice(&tex);
    }

    mesh.indices.extend_from_slice(&CUBE_INDICES);

    Ok(mesh)
}
