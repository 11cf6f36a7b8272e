//! contour
//!
//! A wgpu renderer for OBJ scenes with shadow mapping, a cube-mapped sky and
//! silhouette edges. Silhouettes are found per triangle in the vertex stage
//! from an adjacency index buffer built on the CPU by
//! [`gfx::geometry::build_adjacency`].

pub mod app;
pub mod config;
pub mod error;
pub mod gfx;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::ContourApp;
pub use error::{ContourError, Result};
