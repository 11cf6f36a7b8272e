use std::rc::Rc;

use cgmath::{Matrix4, Vector3};

use crate::{
    config::{EdgeConfig, FloorConfig, LightConfig, SceneConfig},
    error::Result,
    gfx::{
        camera::{camera_controller::CameraController, camera_utils::CameraManager, OrbitCamera},
        geometry::generate_plane,
        resources::{material::Material, texture_resource::TextureImage},
    },
};

use super::{
    loader::ModelLoader,
    object::{Mesh, Object},
};

/// Main scene containing the placed models, the environment and the camera
pub struct Scene {
    pub camera_manager: CameraManager,
    pub objects: Vec<Object>,
    /// Decoded sky faces in cube layer order, uploaded by the render engine
    pub skybox_faces: Option<Vec<Rc<TextureImage>>>,
    pub light: LightConfig,
    pub edges: EdgeConfig,
    pub clear_color: [f32; 3],
    texture_count: usize,
}

impl Scene {
    /// Creates an empty scene with the given camera manager
    pub fn new(camera_manager: CameraManager) -> Self {
        Self {
            camera_manager,
            objects: Vec::new(),
            skybox_faces: None,
            light: LightConfig::default(),
            edges: EdgeConfig::default(),
            clear_color: [0.2, 0.3, 0.3],
            texture_count: 0,
        }
    }

    /// Loads every model, the floor and the sky faces named by `config`
    ///
    /// Nothing touches the GPU here; call
    /// [`crate::gfx::rendering::RenderEngine::prepare_scene`] afterwards.
    pub fn from_config(config: &SceneConfig, aspect: f32) -> Result<Self> {
        let camera = OrbitCamera::new(&config.camera, aspect);
        let mut scene = Self::new(CameraManager::new(camera, CameraController::default()));
        scene.light = config.light;
        scene.edges = config.edges;
        scene.clear_color = config.clear_color;

        let mut loader = ModelLoader::new();

        if let Some(floor) = &config.floor {
            scene.objects.push(build_floor(floor, &mut loader)?);
        }

        for model in &config.models {
            let meshes = loader.load(model)?;
            let name = model
                .path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("model_{}", scene.objects.len()));

            let mut object = Object::new(&name, meshes).with_transform(model.transform());
            object.cast_shadow = model.cast_shadow;
            object.outline = model.outline;
            object.specular_scale = model.specular_scale;
            scene.objects.push(object);
        }

        if let Some(skybox) = &config.skybox {
            let faces = skybox
                .faces()
                .into_iter()
                .map(|path| loader.load_texture(path))
                .collect::<Result<Vec<_>>>()?;
            scene.skybox_faces = Some(faces);
        }

        scene.texture_count = loader.cached_textures();

        let stats = scene.get_statistics();
        log::info!(
            "Scene ready: {} objects, {} triangles, {} vertices, {} textures",
            stats.object_count,
            stats.total_triangles,
            stats.total_vertices,
            stats.texture_count
        );
        Ok(scene)
    }

    /// Advances the camera animation by `dt` seconds
    pub fn update(&mut self, dt: f32) {
        self.camera_manager.update(dt);
    }

    pub fn get_object(&self, name: &str) -> Option<&Object> {
        self.objects.iter().find(|obj| obj.name == name)
    }

    /// Objects rendered into the shadow map
    pub fn shadow_casters(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter().filter(|obj| obj.cast_shadow)
    }

    /// Gets statistics about the scene
    pub fn get_statistics(&self) -> SceneStatistics {
        SceneStatistics {
            object_count: self.objects.len(),
            total_triangles: self.objects.iter().map(Object::triangle_count).sum(),
            total_vertices: self.objects.iter().map(Object::vertex_count).sum(),
            boundary_edges: self
                .objects
                .iter()
                .flat_map(|obj| &obj.meshes)
                .map(|mesh| mesh.adjacency_stats().boundary_edges)
                .sum(),
            texture_count: self.texture_count,
        }
    }
}

fn build_floor(config: &FloorConfig, loader: &mut ModelLoader) -> Result<Object> {
    let size = config.half_extent * 2.0;
    let geometry = generate_plane(size, size, 1, 1, config.uv_repeat);

    let [r, g, b] = config.color;
    let mut material = Material::new("floor", [r, g, b, 1.0]);
    if let Some(path) = &config.texture {
        material = material.with_texture(loader.load_texture(path)?);
    }

    let mut floor = Object::new("floor", vec![Mesh::from_geometry(&geometry, material)])
        .with_transform(Matrix4::from_translation(Vector3::new(0.0, config.height, 0.0)));
    // A flat plane has no silhouette and receives, but never casts, shadows
    floor.cast_shadow = false;
    floor.outline = false;
    Ok(floor)
}

/// Scene statistics for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneStatistics {
    pub object_count: usize,
    pub total_triangles: u32,
    pub total_vertices: u32,
    pub boundary_edges: usize,
    pub texture_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelConfig, SkyboxConfig};
    use std::{
        fs,
        path::{Path, PathBuf},
    };

    const TETRAHEDRON: &[u8] = b"v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\n\
f 1 3 2\nf 1 2 4\nf 1 4 3\nf 2 3 4\n";

    struct ScratchDir(PathBuf);

    impl ScratchDir {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!("contour-scene-{}-{}", name, std::process::id()));
            fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }

        fn path(&self, file: &str) -> PathBuf {
            self.0.join(file)
        }
    }

    impl Drop for ScratchDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn test_empty_config_gives_empty_scene() {
        let scene = Scene::from_config(&SceneConfig::default(), 4.0 / 3.0).unwrap();
        let stats = scene.get_statistics();

        assert!(scene.objects.is_empty());
        assert!(scene.skybox_faces.is_none());
        assert_eq!(stats.total_triangles, 0);
        assert_eq!(scene.clear_color, [0.2, 0.3, 0.3]);
    }

    #[test]
    fn test_floor_is_flat_and_never_casts() {
        let config = SceneConfig {
            floor: Some(FloorConfig {
                half_extent: 10.0,
                height: -40.0,
                ..Default::default()
            }),
            ..Default::default()
        };
        let scene = Scene::from_config(&config, 1.0).unwrap();
        let floor = scene.get_object("floor").unwrap();

        assert_eq!(floor.triangle_count(), 2);
        assert!(!floor.cast_shadow);
        assert!(!floor.outline);
        assert_eq!(floor.transform.w.y, -40.0);
        assert_eq!(scene.shadow_casters().count(), 0);
        assert_eq!(scene.get_statistics().boundary_edges, 4);
    }

    #[test]
    fn test_models_keep_their_placement_and_flags() {
        let dir = ScratchDir::new("models");
        let obj = dir.path("tetra.obj");
        fs::write(&obj, TETRAHEDRON).unwrap();

        let config = SceneConfig {
            models: vec![
                ModelConfig {
                    path: obj.clone(),
                    translation: [20.0, -40.0, 0.0],
                    ..Default::default()
                },
                ModelConfig {
                    path: obj,
                    cast_shadow: false,
                    outline: false,
                    specular_scale: 0.5,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let scene = Scene::from_config(&config, 1.0).unwrap();

        assert_eq!(scene.objects.len(), 2);
        assert_eq!(scene.objects[0].name, "tetra");
        assert_eq!(scene.objects[0].transform.w.x, 20.0);
        assert_eq!(scene.objects[1].uniform().params[..2], [0.5, 0.0]);
        assert_eq!(scene.shadow_casters().count(), 1);

        let stats = scene.get_statistics();
        assert_eq!(stats.total_triangles, 8);
        assert_eq!(stats.boundary_edges, 0);
    }

    #[test]
    fn test_skybox_faces_share_decoded_images() {
        let dir = ScratchDir::new("sky");
        let side = dir.path("side.png");
        let up = dir.path("up.png");
        image::RgbaImage::new(4, 4).save(&side).unwrap();
        image::RgbaImage::new(4, 4).save(&up).unwrap();

        let config = SceneConfig {
            skybox: Some(SkyboxConfig {
                positive_x: side.clone(),
                negative_x: side.clone(),
                positive_y: up.clone(),
                negative_y: up,
                positive_z: side.clone(),
                negative_z: side,
            }),
            ..Default::default()
        };
        let scene = Scene::from_config(&config, 1.0).unwrap();
        let faces = scene.skybox_faces.as_ref().unwrap();

        assert_eq!(faces.len(), 6);
        assert!(Rc::ptr_eq(&faces[0], &faces[5]));
        assert_eq!(scene.get_statistics().texture_count, 2);
    }

    #[test]
    fn test_missing_model_aborts_loading() {
        let config = SceneConfig {
            models: vec![ModelConfig {
                path: Path::new("missing/model.obj").to_path_buf(),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(Scene::from_config(&config, 1.0).is_err());
    }
}
