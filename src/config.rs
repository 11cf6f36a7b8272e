//! Scene configuration
//!
//! A scene is described by a RON file listing the window, camera, light,
//! edge effect, optional skybox and floor, and the models to load with their
//! placement. Relative asset paths are resolved against the directory the
//! configuration file lives in.
//!
//! ```ron
//! (
//!     camera: (distance: 75.0),
//!     models: [
//!         (path: "Goku.obj", translation: (-20.0, -40.0, 0.0), scale: 1.6,
//!          rotation_axis: (0.0, 1.0, 0.0), rotation_degrees: 90.0),
//!     ],
//! )
//! ```

use std::path::{Path, PathBuf};

use cgmath::{Deg, InnerSpace, Matrix4, SquareMatrix, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{ContourError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub edges: EdgeConfig,
    pub clear_color: [f32; 3],
    pub skybox: Option<SkyboxConfig>,
    pub floor: Option<FloorConfig>,
    pub models: Vec<ModelConfig>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            light: LightConfig::default(),
            edges: EdgeConfig::default(),
            clear_color: [0.2, 0.3, 0.3],
            skybox: None,
            floor: None,
            models: Vec::new(),
        }
    }
}

impl SceneConfig {
    /// Reads and parses a scene file, resolving asset paths next to it
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ContourError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let config = Self::from_ron_str(&source, base_dir).map_err(|source| {
            ContourError::SceneConfig {
                path: path.to_path_buf(),
                source,
            }
        })?;

        log::info!(
            "Loaded scene {} ({} models, skybox: {}, floor: {})",
            path.display(),
            config.models.len(),
            config.skybox.is_some(),
            config.floor.is_some()
        );
        Ok(config)
    }

    /// Parses a scene from RON text, resolving relative paths against `base_dir`
    pub fn from_ron_str(
        source: &str,
        base_dir: &Path,
    ) -> std::result::Result<Self, ron::error::SpannedError> {
        let mut config: SceneConfig = ron::from_str(source)?;
        config.resolve_paths(base_dir);
        Ok(config)
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        };

        for model in &mut self.models {
            resolve(&mut model.path);
        }
        if let Some(skybox) = &mut self.skybox {
            for face in skybox.faces_mut() {
                resolve(face);
            }
        }
        if let Some(texture) = self.floor.as_mut().and_then(|f| f.texture.as_mut()) {
            resolve(texture);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            title: "contour".to_string(),
            vsync: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Distance from the orbit target
    pub distance: f32,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Orbit animation speed in radians per second
    pub orbit_speed: f32,
    /// Start with the orbit animation running
    pub animate: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            distance: 75.0,
            fov_y_degrees: 55.0,
            near: 0.1,
            far: 500.0,
            orbit_speed: 0.3,
            animate: false,
        }
    }
}

/// Directional light; `position` is a point on the light's axis, which
/// always points at the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub position: [f32; 3],
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    /// Half-size of the orthographic shadow volume
    pub shadow_extent: f32,
    pub shadow_map_size: u32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: [-75.0, 75.0, -75.0],
            ambient: [0.45, 0.45, 0.45],
            diffuse: [1.0, 1.0, 1.0],
            specular: [0.5, 0.5, 0.5],
            shadow_extent: 80.0,
            shadow_map_size: 2048,
        }
    }
}

/// Silhouette edge appearance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Line width in pixels
    pub width: f32,
    /// Offset of every vertex along its normal, in world units
    pub extend: f32,
    pub color: [f32; 3],
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            width: 1.5,
            extend: 0.0,
            color: [0.0, 0.0, 0.0],
        }
    }
}

/// The six cube map faces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyboxConfig {
    pub positive_x: PathBuf,
    pub negative_x: PathBuf,
    pub positive_y: PathBuf,
    pub negative_y: PathBuf,
    pub positive_z: PathBuf,
    pub negative_z: PathBuf,
}

impl SkyboxConfig {
    /// Faces in cube map layer order (+X, -X, +Y, -Y, +Z, -Z)
    pub fn faces(&self) -> [&Path; 6] {
        [
            &self.positive_x,
            &self.negative_x,
            &self.positive_y,
            &self.negative_y,
            &self.positive_z,
            &self.negative_z,
        ]
    }

    fn faces_mut(&mut self) -> [&mut PathBuf; 6] {
        [
            &mut self.positive_x,
            &mut self.negative_x,
            &mut self.positive_y,
            &mut self.negative_y,
            &mut self.positive_z,
            &mut self.negative_z,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorConfig {
    pub texture: Option<PathBuf>,
    pub color: [f32; 3],
    pub half_extent: f32,
    /// Texture repetitions across the whole floor
    pub uv_repeat: f32,
    pub height: f32,
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            texture: None,
            color: [0.8, 0.8, 0.8],
            half_extent: 10000.0,
            uv_repeat: 600.0,
            height: -40.0,
        }
    }
}

/// A model file and where to put it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub translation: [f32; 3],
    pub scale: f32,
    pub rotation_axis: [f32; 3],
    pub rotation_degrees: f32,
    /// Reverse the winding of every triangle on import
    pub flip_winding: bool,
    pub cast_shadow: bool,
    /// Draw silhouette edges on this model
    pub outline: bool,
    /// Multiplier on the light's specular term
    pub specular_scale: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            translation: [0.0; 3],
            scale: 1.0,
            rotation_axis: [0.0, 1.0, 0.0],
            rotation_degrees: 0.0,
            flip_winding: false,
            cast_shadow: true,
            outline: true,
            specular_scale: 1.0,
        }
    }
}

impl ModelConfig {
    /// Placement matrix: translate, then scale, then rotate (T * S * R)
    pub fn transform(&self) -> Matrix4<f32> {
        let t = Matrix4::from_translation(Vector3::from(self.translation));
        let s = Matrix4::from_scale(self.scale);
        let axis = Vector3::from(self.rotation_axis);
        let r = if axis.magnitude2() > f32::EPSILON {
            Matrix4::from_axis_angle(axis.normalize(), Deg(self.rotation_degrees))
        } else {
            Matrix4::identity()
        };
        t * s * r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector4;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = SceneConfig::from_ron_str("()", Path::new("")).unwrap();
        assert_eq!(config, SceneConfig::default());
        assert_eq!(config.camera.distance, 75.0);
        assert!(config.models.is_empty());
    }

    #[test]
    fn test_model_paths_resolve_against_config_dir() {
        let source = r#"(
            models: [
                (path: "models/goku.obj", scale: 1.6),
                (path: "/abs/vegeta.obj", flip_winding: true),
            ],
            floor: Some((texture: Some("floor.bmp"))),
        )"#;
        let config = SceneConfig::from_ron_str(source, Path::new("assets")).unwrap();

        assert_eq!(config.models[0].path, PathBuf::from("assets/models/goku.obj"));
        assert_eq!(config.models[0].scale, 1.6);
        assert!(config.models[0].cast_shadow);
        assert_eq!(config.models[1].path, PathBuf::from("/abs/vegeta.obj"));
        assert!(config.models[1].flip_winding);

        let floor = config.floor.unwrap();
        assert_eq!(floor.texture, Some(PathBuf::from("assets/floor.bmp")));
        assert_eq!(floor.height, -40.0);
    }

    #[test]
    fn test_skybox_faces_in_layer_order() {
        let source = r#"(
            skybox: Some((
                positive_x: "px.bmp", negative_x: "nx.bmp",
                positive_y: "py.bmp", negative_y: "ny.bmp",
                positive_z: "pz.bmp", negative_z: "nz.bmp",
            )),
        )"#;
        let config = SceneConfig::from_ron_str(source, Path::new("sky")).unwrap();
        let skybox = config.skybox.unwrap();
        let faces = skybox.faces();

        assert_eq!(faces[0], Path::new("sky/px.bmp"));
        assert_eq!(faces[3], Path::new("sky/ny.bmp"));
        assert_eq!(faces[5], Path::new("sky/nz.bmp"));
    }

    #[test]
    fn test_malformed_document_is_rejected() {
        assert!(SceneConfig::from_ron_str("(models: [ (path: 3) ])", Path::new("")).is_err());
        assert!(SceneConfig::from_ron_str("(unknown_field: 1", Path::new("")).is_err());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = SceneConfig::load("does/not/exist.ron").unwrap_err();
        match err {
            ContourError::Io { path, .. } => assert_eq!(path, PathBuf::from("does/not/exist.ron")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_model_transform_order() {
        let model = ModelConfig {
            translation: [-20.0, -40.0, 0.0],
            scale: 2.0,
            rotation_axis: [0.0, 1.0, 0.0],
            rotation_degrees: 90.0,
            ..Default::default()
        };

        // +X rotates to -Z, scales by 2, then moves
        let p = model.transform() * Vector4::new(1.0, 0.0, 0.0, 1.0);
        let expected = Vector4::new(-20.0, -40.0, -2.0, 1.0);
        assert!((p - expected).magnitude() < 1e-5, "got {p:?}");
    }

    #[test]
    fn test_zero_axis_skips_rotation() {
        let model = ModelConfig {
            rotation_axis: [0.0, 0.0, 0.0],
            rotation_degrees: 45.0,
            ..Default::default()
        };
        assert_eq!(model.transform(), Matrix4::identity());
    }

    #[test]
    fn test_demo_scene_parses() {
        let config =
            SceneConfig::from_ron_str(include_str!("../demos/scene.ron"), Path::new("demos")).unwrap();

        assert_eq!(config.models.len(), 3);
        assert!(config.models[1].flip_winding);
        assert!(!config.models[2].outline);
        assert_eq!(config.skybox.unwrap().positive_y, PathBuf::from("demos/up.bmp"));
        assert_eq!(config.light.shadow_map_size, 2048);
    }
}
