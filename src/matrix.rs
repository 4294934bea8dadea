// matrix.rs — projection / zoom / view / orientation transforms
//
// All matrices are column-major, uploaded with transpose = false.

use crate::panorama::{Orientation, ProjectionMode, Viewpoint};
use glam::{Mat4, Vec4};
use std::f32::consts::{FRAC_PI_2, PI};

pub const Z_NEAR: f32 = 0.01;
pub const Z_FAR: f32 = 1000.0;

pub const SPHERE_RADIUS: f32 = 1.0;

/// Horizontal FOV (degrees) above which the camera backs away from the sphere centre.
pub const ZOOM_THRESHOLD_DEGREES: f32 = 90.0;

/// The four transforms fed to the vertex shader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSet {
    pub projection: Mat4,
    pub zoom: Mat4,
    pub view: Mat4,
    pub orientation: Mat4,
}

impl Default for TransformSet {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            zoom: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            orientation: Mat4::IDENTITY,
        }
    }
}

/// gluPerspective with fixed clip planes.
pub fn projection(aspect_ratio: f32, fov_y: f32) -> Mat4 {
    Mat4::perspective_rh_gl(fov_y, aspect_ratio, Z_NEAR, Z_FAR)
}

/// Translation along the view axis.
pub fn zoom(z: f32) -> Mat4 {
    Mat4::from_translation(glam::Vec3::new(0.0, 0.0, z))
}

/// World transform for an already reversed viewpoint: roll * pitch * yaw.
pub fn view(reversed: &Viewpoint) -> Mat4 {
    let yaw = reversed.yaw.to_radians() + FRAC_PI_2;
    let pitch = reversed.pitch.to_radians();
    let roll = reversed.roll.to_radians();

    Mat4::from_rotation_z(roll) * Mat4::from_rotation_x(pitch) * Mat4::from_rotation_y(yaw)
}

/// Fixed rotation/flip of the [0,1] texture space for a source orientation.
///
/// The translation column moves the flipped square back onto [0,1].
pub fn orientation(orientation: Orientation) -> Mat4 {
    const COS_PI: f32 = -1.0;
    const COS_PI_2: f32 = 0.0;
    const COS_N_PI_2: f32 = 0.0;
    const SIN_PI: f32 = 0.0;
    const SIN_PI_2: f32 = 1.0;
    const SIN_N_PI_2: f32 = -1.0;

    let (c0, c1, c2, c3) = match orientation {
        Orientation::Normal => return Mat4::IDENTITY,
        Orientation::Rotated90 => (
            Vec4::new(COS_PI_2, -SIN_PI_2, 0.0, 0.0),
            Vec4::new(SIN_PI_2, COS_PI_2, 0.0, 0.0),
            Vec4::Z,
            Vec4::new(0.0, 1.0, 0.0, 1.0),
        ),
        Orientation::Rotated180 => (
            Vec4::new(COS_PI, -SIN_PI, 0.0, 0.0),
            Vec4::new(SIN_PI, COS_PI, 0.0, 0.0),
            Vec4::Z,
            Vec4::new(1.0, 1.0, 0.0, 1.0),
        ),
        Orientation::Rotated270 => (
            Vec4::new(COS_N_PI_2, -SIN_N_PI_2, 0.0, 0.0),
            Vec4::new(SIN_N_PI_2, COS_N_PI_2, 0.0, 0.0),
            Vec4::Z,
            Vec4::new(1.0, 0.0, 0.0, 1.0),
        ),
        Orientation::HFlipped => (
            Vec4::new(-1.0, 0.0, 0.0, 0.0),
            Vec4::Y,
            Vec4::Z,
            Vec4::new(1.0, 0.0, 0.0, 1.0),
        ),
        Orientation::VFlipped => (
            Vec4::X,
            Vec4::new(0.0, -1.0, 0.0, 0.0),
            Vec4::Z,
            Vec4::new(0.0, 1.0, 0.0, 1.0),
        ),
        Orientation::Transposed => (
            Vec4::new(0.0, 1.0, 0.0, 0.0),
            Vec4::new(1.0, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 0.0, -1.0, 0.0),
            Vec4::W,
        ),
        Orientation::AntiTransposed => (
            Vec4::new(0.0, -1.0, 0.0, 0.0),
            Vec4::new(-1.0, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 0.0, -1.0, 0.0),
            Vec4::new(1.0, 1.0, 0.0, 1.0),
        ),
    };

    Mat4::from_cols(c0, c1, c2, c3)
}

/// Projection, zoom and view for the current camera state.
///
/// Flat video is drawn without a camera: all three are identity.
pub fn viewpoint_matrices(
    mode: ProjectionMode,
    aspect_ratio: f32,
    fov_y: f32,
    z: f32,
    reversed: &Viewpoint,
) -> (Mat4, Mat4, Mat4) {
    if !mode.is_immersive() {
        return (Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY);
    }
    (projection(aspect_ratio, fov_y), zoom(z), view(reversed))
}

/// Vertical FOV matching a horizontal FOV on a window of the given aspect ratio.
pub fn vertical_fov(fov_x: f32, aspect_ratio: f32) -> f32 {
    2.0 * ((fov_x / 2.0).tan() / aspect_ratio).atan()
}

/// Smallest (most negative) z that keeps the frustum corners inside the sphere.
pub fn min_zoom(fov_x: f32, fov_y: f32) -> f32 {
    let tan_fovx_2 = (fov_x / 2.0).tan();
    let tan_fovy_2 = (fov_y / 2.0).tan();
    -SPHERE_RADIUS / (tan_fovx_2 * tan_fovx_2 + tan_fovy_2 * tan_fovy_2).sqrt().atan().sin()
}

/// Camera distance for a field of view, `fov_max_degrees` being the widest legal FOV.
///
/// Up to the threshold the camera stays at the centre; beyond it, z moves
/// linearly towards `min_zoom` and never past it.
pub fn zoom_distance(fov_x: f32, fov_y: f32, fov_max_degrees: f32) -> f32 {
    let threshold = ZOOM_THRESHOLD_DEGREES * PI / 180.0;
    if fov_x <= threshold {
        return 0.0;
    }

    let z_min = min_zoom(fov_x, fov_y);
    let f = z_min / ((fov_max_degrees - ZOOM_THRESHOLD_DEGREES) * PI / 180.0);
    let z = f * fov_x - f * threshold;
    z.max(z_min)
}
