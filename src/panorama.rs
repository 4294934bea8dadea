// panorama.rs — viewpoint, projection mode and source video format

use serde::{Deserialize, Serialize};

/// Surface the video is mapped onto before camera projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectionMode {
    #[default]
    Rectangular, // flat quad, no camera transform
    Equirectangular, // 360° sphere
    CubemapStandard, // 3x2 cube atlas
}

impl ProjectionMode {
    /// Spherical and cubemap sources are looked at through a perspective camera.
    pub fn is_immersive(self) -> bool {
        matches!(
            self,
            ProjectionMode::Equirectangular | ProjectionMode::CubemapStandard
        )
    }
}

/// Stereo packing of the source frame. Only the left eye is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MultiviewMode {
    #[default]
    None,
    StereoTopBottom,
    StereoSideBySide,
}

/// Pixel orientation of the decoded source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Normal,
    Rotated90,
    Rotated180,
    Rotated270,
    HFlipped,
    VFlipped,
    Transposed,
    AntiTransposed,
}

impl Orientation {
    pub const ALL: [Orientation; 8] = [
        Orientation::Normal,
        Orientation::Rotated90,
        Orientation::Rotated180,
        Orientation::Rotated270,
        Orientation::HFlipped,
        Orientation::VFlipped,
        Orientation::Transposed,
        Orientation::AntiTransposed,
    ];
}

/// User-facing viewpoint, angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewpoint {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub fov: f32,
}

impl Default for Viewpoint {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            fov: 80.0,
        }
    }
}

impl Viewpoint {
    pub fn new(yaw: f32, pitch: f32, roll: f32, fov: f32) -> Self {
        Self {
            yaw,
            pitch,
            roll,
            fov,
        }
    }

    /// The inverse camera rotation, used as a world transform. The field of view is kept.
    pub fn reversed(&self) -> Self {
        Self {
            yaw: -self.yaw,
            pitch: -self.pitch,
            roll: -self.roll,
            fov: self.fov,
        }
    }

    /// Applies a pointer drag of `dx`/`dy` pixels over a `width`x`height` window.
    ///
    /// One window width of drag turns the view by the horizontal field of view,
    /// so the scene follows the pointer. Pitch stops at the poles.
    pub fn drag(&mut self, dx: f32, dy: f32, width: f32, height: f32) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }

        let h_f = self.fov.to_radians();
        let aspect = width / height;
        let v_f = 2.0 * ((h_f / 2.0).tan() / aspect).atan();

        let yaw_per_px_deg = (h_f / width).to_degrees();
        let pitch_per_px_deg = (v_f / height).to_degrees();

        self.yaw -= dx * yaw_per_px_deg;
        self.pitch = (self.pitch - dy * pitch_per_px_deg).clamp(-90.0, 90.0);
    }
}

/// Visible crop of the source frame, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VisibleRegion {
    pub x_offset: u32,
    pub y_offset: u32,
    pub width: u32,
    pub height: u32,
}

/// Description of the video the renderer is built for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoFormat {
    /// Full decoded size in pixels.
    pub width: u32,
    pub height: u32,
    pub visible: VisibleRegion,
    pub orientation: Orientation,
    pub projection: ProjectionMode,
    pub multiview: MultiviewMode,
    /// Padding in pixels around each cube face in the source atlas.
    pub cubemap_padding: u32,
}

impl VideoFormat {
    /// A fully visible flat video of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            visible: VisibleRegion {
                x_offset: 0,
                y_offset: 0,
                width,
                height,
            },
            orientation: Orientation::Normal,
            projection: ProjectionMode::Rectangular,
            multiview: MultiviewMode::None,
            cubemap_padding: 0,
        }
    }

    pub fn with_projection(mut self, projection: ProjectionMode) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_multiview(mut self, multiview: MultiviewMode) -> Self {
        self.multiview = multiview;
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_cubemap_padding(mut self, padding: u32) -> Self {
        self.cubemap_padding = padding;
        self
    }

    /// Cube face padding in normalized texture units, (horizontal, vertical).
    pub fn cubemap_padding_fraction(&self) -> (f32, f32) {
        if self.width == 0 || self.height == 0 {
            return (0.0, 0.0);
        }
        (
            self.cubemap_padding as f32 / self.width as f32,
            self.cubemap_padding as f32 / self.height as f32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_negates_angles_and_keeps_fov() {
        let vp = Viewpoint::new(30.0, -10.0, 5.0, 90.0);
        let r = vp.reversed();
        assert_eq!(r, Viewpoint::new(-30.0, 10.0, -5.0, 90.0));
        assert_eq!(r.reversed(), vp);
    }

    #[test]
    fn drag_full_width_turns_by_horizontal_fov() {
        let mut vp = Viewpoint::new(0.0, 0.0, 0.0, 90.0);
        vp.drag(-1000.0, 0.0, 1000.0, 500.0);
        assert!((vp.yaw - 90.0).abs() < 1e-3);
        assert_eq!(vp.pitch, 0.0);
    }

    #[test]
    fn drag_clamps_pitch_at_poles() {
        let mut vp = Viewpoint::default();
        vp.drag(0.0, -100_000.0, 800.0, 600.0);
        assert_eq!(vp.pitch, 90.0);
        vp.drag(0.0, 100_000.0, 800.0, 600.0);
        assert_eq!(vp.pitch, -90.0);
    }

    #[test]
    fn drag_ignores_empty_window() {
        let mut vp = Viewpoint::default();
        vp.drag(10.0, 10.0, 0.0, 600.0);
        assert_eq!(vp, Viewpoint::default());
    }

    #[test]
    fn only_sphere_and_cube_are_immersive() {
        assert!(!ProjectionMode::Rectangular.is_immersive());
        assert!(ProjectionMode::Equirectangular.is_immersive());
        assert!(ProjectionMode::CubemapStandard.is_immersive());
    }

    #[test]
    fn cubemap_padding_is_relative_to_full_size() {
        let fmt = VideoFormat::new(3000, 2000).with_cubemap_padding(30);
        assert_eq!(fmt.cubemap_padding_fraction(), (0.01, 0.015));
        assert_eq!(VideoFormat::new(0, 0).cubemap_padding_fraction(), (0.0, 0.0));
    }
}
