use cgmath::{Matrix, Matrix4, SquareMatrix};
use wgpu::Device;

use super::vertex::Vertex3D;
use crate::{
    gfx::{
        geometry::{build_adjacency_with_stats, AdjacencyStats, GeometryData},
        resources::material::{Material, MaterialManager},
    },
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::{create_storage_buffer, UniformBuffer},
    },
};

/// Per-object uniform data
///
/// MUST match the `ObjectData` struct in the shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    /// x: specular scale, y: 1.0 when outlines are drawn
    pub params: [f32; 4],
}

pub type ObjectUBO = UniformBuffer<ObjectUniform>;

/// Layout of the per-mesh bind group (slot 1)
///
/// Binding 0 is the owning object's uniform, bindings 1 and 2 the mesh's
/// vertex and adjacency storage buffers.
pub fn create_mesh_bind_group_layout(device: &Device) -> BindGroupLayoutWithDesc {
    BindGroupLayoutBuilder::new()
        .next_binding_rendering(binding_types::uniform())
        .next_binding_vertex(binding_types::storage_buffer_read_only())
        .next_binding_vertex(binding_types::storage_buffer_read_only())
        .create(device, "Mesh Bind Group Layout")
}

struct MeshGpuResources {
    _vertex_buffer: wgpu::Buffer,
    _adjacency_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Triangle mesh carrying its adjacency index buffer
///
/// The adjacency buffer replaces the plain index list: six entries per
/// triangle, see [`crate::gfx::geometry::adjacency`].
pub struct Mesh {
    vertices: Vec<Vertex3D>,
    adjacency: Vec<u32>,
    triangle_count: u32,
    stats: AdjacencyStats,
    pub material: Material,
    gpu_resources: Option<MeshGpuResources>,
}

impl Mesh {
    /// Builds a mesh from a vertex list and a flat triangle index list.
    ///
    /// `indices` must be a non-empty multiple of three with every entry
    /// inside `vertices`; this is only checked in debug builds.
    pub fn new(vertices: Vec<Vertex3D>, indices: &[u32], material: Material) -> Self {
        debug_assert!(
            !indices.is_empty() && indices.len() % 3 == 0,
            "index count {} is not a positive multiple of 3",
            indices.len()
        );
        debug_assert!(
            indices.iter().all(|&i| (i as usize) < vertices.len()),
            "index out of range for {} vertices",
            vertices.len()
        );

        let (adjacency, stats) = build_adjacency_with_stats(indices);

        Self {
            vertices,
            triangle_count: (adjacency.len() / 6) as u32,
            adjacency,
            stats,
            material,
            gpu_resources: None,
        }
    }

    pub fn from_geometry(geometry: &GeometryData, material: Material) -> Self {
        Self::new(geometry.to_vertices(), &geometry.indices, material)
    }

    pub fn vertices(&self) -> &[Vertex3D] {
        &self.vertices
    }

    /// The six-per-triangle adjacency index buffer
    pub fn adjacency(&self) -> &[u32] {
        &self.adjacency
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn triangle_count(&self) -> u32 {
        self.triangle_count
    }

    pub fn adjacency_stats(&self) -> &AdjacencyStats {
        &self.stats
    }

    fn init_gpu_resources(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        layout: &BindGroupLayoutWithDesc,
        object_ubo: &ObjectUBO,
        materials: &mut MaterialManager,
    ) {
        let vertex_buffer = create_storage_buffer(device, "Mesh Vertices", &self.vertices);
        let adjacency_buffer = create_storage_buffer(device, "Mesh Adjacency", &self.adjacency);

        let bind_group = BindGroupBuilder::new(layout)
            .resource(object_ubo.binding_resource())
            .resource(vertex_buffer.as_entire_binding())
            .resource(adjacency_buffer.as_entire_binding())
            .create(device, "Mesh Bind Group");

        materials.upload(device, queue, &mut self.material);

        self.gpu_resources = Some(MeshGpuResources {
            _vertex_buffer: vertex_buffer,
            _adjacency_buffer: adjacency_buffer,
            bind_group,
        });
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.gpu_resources.as_ref().map(|res| &res.bind_group)
    }
}

/// A placed model: one or more meshes sharing a transform
pub struct Object {
    pub name: String,
    pub meshes: Vec<Mesh>,
    pub transform: Matrix4<f32>, // cgmath 4x4 transformation matrix
    pub cast_shadow: bool,
    /// Draw silhouette edges
    pub outline: bool,
    pub specular_scale: f32,
    ubo: Option<ObjectUBO>, // None until init_gpu_resources called
}

impl Object {
    /// Create a new Object with identity transformation
    pub fn new(name: &str, meshes: Vec<Mesh>) -> Self {
        Self {
            name: name.to_string(),
            meshes,
            transform: Matrix4::identity(),
            cast_shadow: true,
            outline: true,
            specular_scale: 1.0,
            ubo: None,
        }
    }

    pub fn with_transform(mut self, transform: Matrix4<f32>) -> Self {
        self.transform = transform;
        self
    }

    pub fn uniform(&self) -> ObjectUniform {
        // inverse-transpose keeps normals perpendicular under non-uniform scale
        let normal_matrix = self
            .transform
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(Matrix4::identity);

        ObjectUniform {
            model: self.transform.into(),
            normal_matrix: normal_matrix.into(),
            params: [
                self.specular_scale,
                if self.outline { 1.0 } else { 0.0 },
                0.0,
                0.0,
            ],
        }
    }

    pub fn triangle_count(&self) -> u32 {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    pub fn vertex_count(&self) -> u32 {
        self.meshes.iter().map(Mesh::vertex_count).sum()
    }

    pub fn is_uploaded(&self) -> bool {
        self.ubo.is_some()
    }

    /// Sync the uniform (transform and flags) to the GPU if uploaded
    pub fn update_transform(&mut self, queue: &wgpu::Queue) {
        let uniform = self.uniform();
        if let Some(ubo) = &mut self.ubo {
            ubo.update_content(queue, uniform);
        }
    }

    pub fn init_gpu_resources(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        layout: &BindGroupLayoutWithDesc,
        materials: &mut MaterialManager,
    ) {
        let ubo = ObjectUBO::new_with_data(device, &self.uniform());
        for mesh in &mut self.meshes {
            mesh.init_gpu_resources(device, queue, layout, &ubo, materials);
        }
        log::debug!(
            "Uploaded '{}': {} meshes, {} triangles",
            self.name,
            self.meshes.len(),
            self.triangle_count()
        );
        self.ubo = Some(ubo);
    }
}

/// Draw calls for meshes whose vertices are pulled from storage buffers
///
/// Every triangle expands to three vertex invocations; the shader maps
/// `vertex_index` to the triangle's slot in the adjacency buffer.
pub trait DrawObject {
    fn draw_mesh(&mut self, mesh: &Mesh);
    /// Binds each mesh's material (slot 2) and draws it
    fn draw_object(&mut self, object: &Object);
    /// Geometry only, for depth passes without materials
    fn draw_object_depth(&mut self, object: &Object);
}

impl DrawObject for wgpu::RenderPass<'_> {
    fn draw_mesh(&mut self, mesh: &Mesh) {
        let Some(bind_group) = mesh.bind_group() else {
            return; // Skip drawing if not uploaded
        };
        self.set_bind_group(1, bind_group, &[]);
        self.draw(0..mesh.triangle_count * 3, 0..1);
    }

    fn draw_object(&mut self, object: &Object) {
        for mesh in &object.meshes {
            if let Some(material) = mesh.material.get_bind_group() {
                self.set_bind_group(2, material, &[]);
                self.draw_mesh(mesh);
            }
        }
    }

    fn draw_object_depth(&mut self, object: &Object) {
        for mesh in &object.meshes {
            self.draw_mesh(mesh);
        }
    }
}
