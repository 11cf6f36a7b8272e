//! # Scene Module
//!
//! Everything that describes what is drawn: meshes with their adjacency
//! buffers, placed objects, the OBJ loader and the [`Scene`] that ties them
//! to the camera, light and sky.
//!
//! ```no_run
//! use contour::{config::SceneConfig, gfx::scene::Scene};
//!
//! let config = SceneConfig::load("demos/scene.ron")?;
//! let scene = Scene::from_config(&config, 4.0 / 3.0)?;
//! println!("{:?}", scene.get_statistics());
//! # Ok::<(), contour::error::ContourError>(())
//! ```

pub mod loader;
pub mod object;
pub mod scene;
pub mod vertex;

// Re-export main types
pub use loader::ModelLoader;
pub use object::{DrawObject, Mesh, Object};
pub use scene::{Scene, SceneStatistics};
pub use vertex::Vertex3D;
