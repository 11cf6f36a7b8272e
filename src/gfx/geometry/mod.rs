//! # Geometry
//!
//! CPU-side geometry: triangle adjacency construction and the procedural
//! shapes the scene needs without model files.
//!
//! ## Contents
//!
//! - [`adjacency`] - Rebuilds per-edge neighbour vertices for silhouette rendering
//! - **Plane**: Flat floor plane with repeating texture coordinates
//! - **Closed cube**: Eight-vertex cube with shared corners (skybox)
//!
//! ## Usage
//!
//! ```rust
//! use contour::gfx::geometry::{generate_closed_cube, generate_plane};
//!
//! let cube = generate_closed_cube(1.0);
//! assert_eq!(cube.triangle_count(), 12);
//!
//! let floor = generate_plane(20.0, 20.0, 1, 1, 4.0);
//! assert_eq!(floor.vertex_count(), 4);
//! ```

pub mod adjacency;
pub mod primitives;

pub use adjacency::{build_adjacency, build_adjacency_with_stats, AdjacencyStats, EdgeKey};
pub use primitives::*;

use crate::gfx::scene::vertex::Vertex3D;

/// Generated geometry data ready to become a [`Mesh`](crate::gfx::scene::Mesh)
#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    /// Vertex positions (x, y, z)
    pub vertices: Vec<[f32; 3]>,
    /// Texture coordinates (u, v)
    pub tex_coords: Vec<[f32; 2]>,
    /// Normal vectors (x, y, z)
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (counter-clockwise winding)
    pub indices: Vec<u32>,
}

impl GeometryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Interleaves positions, normals and texture coordinates.
    ///
    /// Missing normals default to +Y and missing texture coordinates to zero.
    pub fn to_vertices(&self) -> Vec<Vertex3D> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, &position)| Vertex3D {
                position,
                normal: self.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                tex_coords: self.tex_coords.get(i).copied().unwrap_or([0.0, 0.0]),
            })
            .collect()
    }
}
