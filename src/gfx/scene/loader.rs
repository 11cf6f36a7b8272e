//! OBJ/MTL model import
//!
//! Models are triangulated and re-indexed to a single index stream by
//! `tobj`, then turned into [`Mesh`]es (one per OBJ object/group), each
//! of which builds its adjacency buffer on construction.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::{
    config::ModelConfig,
    error::{ContourError, Result},
    gfx::resources::{material::Material, texture_resource::TextureImage},
};

use super::{object::Mesh, vertex::Vertex3D};

/// Loads model files, sharing decoded textures between everything it loads
#[derive(Default)]
pub struct ModelLoader {
    texture_cache: HashMap<PathBuf, Rc<TextureImage>>,
}

impl ModelLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct texture files decoded so far
    pub fn cached_textures(&self) -> usize {
        self.texture_cache.len()
    }

    /// Decodes `path` once; later requests for the same path share the image
    pub fn load_texture(&mut self, path: &Path) -> Result<Rc<TextureImage>> {
        if let Some(texture) = self.texture_cache.get(path) {
            return Ok(texture.clone());
        }
        let texture = Rc::new(TextureImage::load(path)?);
        self.texture_cache
            .insert(path.to_path_buf(), texture.clone());
        Ok(texture)
    }

    /// Loads every mesh of the model file named by `config`
    pub fn load(&mut self, config: &ModelConfig) -> Result<Vec<Mesh>> {
        let path = config.path.as_path();
        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|source| ContourError::ModelLoad {
            path: path.to_path_buf(),
            source,
        })?;

        let materials = materials.unwrap_or_else(|err| {
            log::warn!(
                "No usable material library for {} ({}), using defaults",
                path.display(),
                err
            );
            Vec::new()
        });

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let mut loaded_materials = Vec::with_capacity(materials.len());
        for (i, mtl) in materials.iter().enumerate() {
            loaded_materials.push(self.convert_material(mtl, i, base_dir)?);
        }

        let mut meshes = Vec::with_capacity(models.len());
        for model in models {
            let mesh = model.mesh;
            if mesh.indices.len() < 3 {
                log::debug!("Skipping empty group '{}' in {}", model.name, path.display());
                continue;
            }

            let mut indices = mesh.indices;
            if config.flip_winding {
                flip_winding(&mut indices);
            }

            let normals = if !mesh.normals.is_empty() && mesh.normals.len() == mesh.positions.len()
            {
                mesh.normals
            } else {
                smooth_normals(&mesh.positions, &indices)
            };

            let mut tex_coords = mesh.texcoords;
            flip_v(&mut tex_coords);

            let vertices = interleave(&mesh.positions, &normals, &tex_coords);
            let material = mesh
                .material_id
                .and_then(|id| loaded_materials.get(id))
                .cloned()
                .unwrap_or_default();

            let mesh = Mesh::new(vertices, &indices, material);
            let stats = mesh.adjacency_stats();
            log::debug!(
                "'{}': {} triangles, {} edges, {} boundary, {} dropped",
                model.name,
                stats.triangles,
                stats.edges,
                stats.boundary_edges,
                stats.dropped_contributions
            );
            if stats.dropped_contributions > 0 {
                log::warn!(
                    "'{}' in {} is not manifold: {} edge contributions ignored",
                    model.name,
                    path.display(),
                    stats.dropped_contributions
                );
            }
            meshes.push(mesh);
        }

        if meshes.is_empty() {
            return Err(ContourError::EmptyModel(path.to_path_buf()));
        }

        log::info!(
            "Loaded {} ({} meshes, {} triangles)",
            path.display(),
            meshes.len(),
            meshes.iter().map(Mesh::triangle_count).sum::<u32>()
        );
        Ok(meshes)
    }

    fn convert_material(
        &mut self,
        mtl: &tobj::Material,
        index: usize,
        base_dir: &Path,
    ) -> Result<Material> {
        let name = if mtl.name.is_empty() {
            format!("material_{}", index)
        } else {
            mtl.name.clone()
        };

        let texture = match mtl.diffuse_texture.as_deref() {
            Some(file) if !file.trim().is_empty() => {
                Some(self.load_texture(&base_dir.join(file.trim()))?)
            }
            _ => None,
        };

        // Kd tints the texture; without one a textured material shows it unmodified
        let default_diffuse = if texture.is_some() { [1.0; 3] } else { [0.8; 3] };
        let [r, g, b] = mtl.diffuse.unwrap_or(default_diffuse);
        let alpha = mtl.dissolve.unwrap_or(1.0);

        let material = Material::new(&name, [r, g, b, alpha]);
        Ok(match texture {
            Some(texture) => material.with_texture(texture),
            None => material,
        })
    }
}

/// Reverses every full triangle by swapping its last two indices
pub fn flip_winding(indices: &mut [u32]) {
    for tri in indices.chunks_exact_mut(3) {
        tri.swap(1, 2);
    }
}

/// Converts texture coordinates from bottom-left to top-left origin
pub fn flip_v(tex_coords: &mut [f32]) {
    for uv in tex_coords.chunks_exact_mut(2) {
        uv[1] = 1.0 - uv[1];
    }
}

/// Area-weighted vertex normals for a counter-clockwise triangle list
///
/// Vertices not used by any triangle, or only by degenerate ones, get +Y.
pub fn smooth_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    let mut normals = vec![0.0f32; vertex_count * 3];
    let position = |i: usize| [positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]];

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if i0.max(i1).max(i2) >= vertex_count {
            continue;
        }
        let (v0, v1, v2) = (position(i0), position(i1), position(i2));
        let e1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
        let e2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];

        // Unnormalised cross product: length is twice the triangle area
        let face = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];

        for i in [i0, i1, i2] {
            normals[i * 3] += face[0];
            normals[i * 3 + 1] += face[1];
            normals[i * 3 + 2] += face[2];
        }
    }

    for n in normals.chunks_exact_mut(3) {
        let length = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if length > f32::EPSILON {
            n.iter_mut().for_each(|c| *c /= length);
        } else {
            n.copy_from_slice(&[0.0, 1.0, 0.0]);
        }
    }

    normals
}

/// Zips flat attribute arrays into vertices; missing texture coordinates are zero
pub fn interleave(positions: &[f32], normals: &[f32], tex_coords: &[f32]) -> Vec<Vertex3D> {
    positions
        .chunks_exact(3)
        .enumerate()
        .map(|(i, p)| Vertex3D {
            position: [p[0], p[1], p[2]],
            normal: normals
                .get(i * 3..i * 3 + 3)
                .map(|n| [n[0], n[1], n[2]])
                .unwrap_or([0.0, 1.0, 0.0]),
            tex_coords: tex_coords
                .get(i * 2..i * 2 + 2)
                .map(|t| [t[0], t[1]])
                .unwrap_or([0.0, 0.0]),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, io::Write};

    const SQUARE: [f32; 12] = [
        0.0, 0.0, 0.0, //
        1.0, 0.0, 0.0, //
        1.0, 0.0, -1.0, //
        0.0, 0.0, -1.0,
    ];

    /// A scratch directory under the system temp dir, removed on drop
    struct ScratchDir(PathBuf);

    impl ScratchDir {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!("contour-{}-{}", name, std::process::id()));
            fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }

        fn write(&self, file: &str, contents: &[u8]) -> PathBuf {
            let path = self.0.join(file);
            fs::File::create(&path).unwrap().write_all(contents).unwrap();
            path
        }
    }

    impl Drop for ScratchDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    fn model(path: PathBuf) -> ModelConfig {
        ModelConfig {
            path,
            ..Default::default()
        }
    }

    #[test]
    fn test_flip_winding_swaps_last_two() {
        let mut indices = vec![0, 1, 2, 3, 4, 5, 6];
        flip_winding(&mut indices);
        assert_eq!(indices, vec![0, 2, 1, 3, 5, 4, 6]);
    }

    #[test]
    fn test_flip_v() {
        let mut uv = vec![0.25, 0.0, 0.5, 0.75];
        flip_v(&mut uv);
        assert_eq!(uv, vec![0.25, 1.0, 0.5, 0.25]);
    }

    #[test]
    fn test_smooth_normals_face_up_for_ccw_square() {
        let normals = smooth_normals(&SQUARE, &[0, 1, 2, 0, 2, 3]);
        for n in normals.chunks_exact(3) {
            assert!((n[1] - 1.0).abs() < 1e-6, "normal {n:?}");
        }

        let mut flipped = [0, 1, 2, 0, 2, 3];
        flip_winding(&mut flipped);
        let normals = smooth_normals(&SQUARE, &flipped);
        assert!(normals.chunks_exact(3).all(|n| (n[1] + 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_smooth_normals_unit_length_on_corner() {
        // Three faces meeting at the origin corner of a cube
        let positions = [
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0,
        ];
        let normals = smooth_normals(&positions, &[0, 2, 1, 0, 3, 2, 0, 1, 3]);
        let corner = &normals[0..3];
        let length = corner.iter().map(|c| c * c).sum::<f32>().sqrt();
        assert!((length - 1.0).abs() < 1e-5);
        assert!(corner.iter().all(|&c| c < 0.0));
    }

    #[test]
    fn test_unused_vertex_gets_default_normal() {
        let normals = smooth_normals(&[0.0; 9], &[0, 0, 0]);
        assert_eq!(normals, vec![0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_interleave_fills_missing_attributes() {
        let vertices = interleave(&SQUARE, &[], &[0.5, 0.5]);
        assert_eq!(vertices.len(), 4);
        assert_eq!(vertices[0].tex_coords, [0.5, 0.5]);
        assert_eq!(vertices[1].tex_coords, [0.0, 0.0]);
        assert_eq!(vertices[3].normal, [0.0, 1.0, 0.0]);
        assert_eq!(vertices[2].position, [1.0, 0.0, -1.0]);
    }

    #[test]
    fn test_load_obj_without_material_library() {
        let dir = ScratchDir::new("plain");
        let path = dir.write(
            "square.obj",
            b"v 0 0 0\nv 1 0 0\nv 1 0 -1\nv 0 0 -1\nvt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nf 1/1 2/2 3/3 4/4\n",
        );

        let meshes = ModelLoader::new().load(&model(path)).unwrap();
        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.adjacency().len(), 12);
        // generated normals face up, texture rows flipped
        assert!(mesh.vertices().iter().all(|v| (v.normal[1] - 1.0).abs() < 1e-6));
        assert!(mesh.vertices().iter().any(|v| v.tex_coords == [0.0, 1.0]));
        assert!(mesh.material.diffuse_texture.is_none());
    }

    #[test]
    fn test_load_obj_with_texture_shares_decoded_image() {
        let dir = ScratchDir::new("textured");
        let image = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]));
        image.save(dir.0.join("skin.png")).unwrap();
        dir.write("skin.mtl", b"newmtl skin\nKd 0.5 0.5 0.5\nmap_Kd skin.png\n");
        let obj = b"mtllib skin.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\n\
o a\nusemtl skin\nf 1 2 3\no b\nusemtl skin\nf 1 3 4\n";
        let path = dir.write("pair.obj", obj);

        let mut loader = ModelLoader::new();
        let meshes = loader.load(&model(path.clone())).unwrap();
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[0].material.base_color, [0.5, 0.5, 0.5, 1.0]);
        let a = meshes[0].material.diffuse_texture.as_ref().unwrap();
        let b = meshes[1].material.diffuse_texture.as_ref().unwrap();
        assert!(Rc::ptr_eq(a, b));

        // loading the same model again reuses the cached image
        loader.load(&model(path)).unwrap();
        assert_eq!(loader.cached_textures(), 1);
    }

    #[test]
    fn test_missing_texture_is_an_error() {
        let dir = ScratchDir::new("missing-texture");
        dir.write("m.mtl", b"newmtl m\nmap_Kd nowhere.png\n");
        let path = dir.write("m.obj", b"mtllib m.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl m\nf 1 2 3\n");

        let Err(err) = ModelLoader::new().load(&model(path)) else {
            panic!("texture failure should fail the model");
        };
        assert!(matches!(err, ContourError::Image { .. }), "got {err}");
    }

    #[test]
    fn test_model_without_faces_is_rejected() {
        let dir = ScratchDir::new("empty");
        let path = dir.write("points.obj", b"v 0 0 0\nv 1 0 0\n");

        let Err(err) = ModelLoader::new().load(&model(path)) else {
            panic!("a model without faces should be rejected");
        };
        assert!(matches!(err, ContourError::EmptyModel(_)), "got {err}");
    }

    #[test]
    fn test_missing_model_file() {
        let Err(err) = ModelLoader::new().load(&model(PathBuf::from("no/such/model.obj"))) else {
            panic!("missing file should not load");
        };
        assert!(matches!(err, ContourError::ModelLoad { .. }), "got {err}");
    }
}
