// lib.rs — OpenGL video renderer for flat, 360° and cubemap sources

pub mod config;
pub mod error;
pub mod gl;
pub mod interop;
pub mod logging;
pub mod matrix;
pub mod mesh;
pub mod panorama;
pub mod planes;
pub mod renderer;
pub mod shader;

pub use config::RendererOptions;
pub use error::{BoxError, RendererError, Result};
pub use gl::{GlApi, GlowApi};
pub use interop::{ColorConversion, Interop, Picture, PicturePlane, RgbaConversion};
pub use logging::{init_logging, LoggingConfig};
pub use matrix::TransformSet;
pub use mesh::{CubePadding, Mesh, MeshBuilder};
pub use panorama::{MultiviewMode, Orientation, ProjectionMode, VideoFormat, Viewpoint, VisibleRegion};
pub use planes::{PlaneArray, PlaneRatio, PlaneRect, Ratio, TextureSize, MAX_PLANES};
pub use renderer::Renderer;
pub use shader::{GlslVersion, ShaderProgram};
