//! # Graphics Module
//!
//! - **Geometry** ([`geometry`]) - Adjacency reconstruction and procedural shapes
//! - **Camera System** ([`camera`]) - Animated orbit camera with mouse controls
//! - **Scene Management** ([`scene`]) - Meshes, objects and the OBJ loader
//! - **Resource Management** ([`resources`]) - Materials, textures and global uniforms
//! - **Rendering Pipeline** ([`rendering`]) - Shadow, sky and outline passes

pub mod camera;
pub mod geometry;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use camera::orbit_camera::OrbitCamera;
pub use rendering::render_engine::RenderEngine;
