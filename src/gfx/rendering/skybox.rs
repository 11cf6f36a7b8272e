//! Cube-mapped sky drawn behind the scene
//!
//! The cube follows the camera's rotation but not its translation, and is
//! drawn first with depth testing off so every later draw covers it.

use wgpu::util::DeviceExt;

use crate::{
    error::Result,
    gfx::{
        geometry::generate_closed_cube,
        resources::texture_resource::{TextureImage, TextureResource},
    },
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
    },
};

const SKY_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

/// Layout of the sky's position-only vertex buffer
pub fn sky_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &SKY_ATTRIBUTES,
    }
}

/// Slot 1 layout of the sky pipeline: cube texture and its sampler
pub fn create_sky_bind_group_layout(device: &wgpu::Device) -> BindGroupLayoutWithDesc {
    BindGroupLayoutBuilder::new()
        .next_binding_fragment(binding_types::texture_cube())
        .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
        .create(device, "Skybox Bind Group Layout")
}

pub struct Skybox {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    _cube_map: TextureResource,
    bind_group: wgpu::BindGroup,
}

impl Skybox {
    /// Uploads six faces in +X, -X, +Y, -Y, +Z, -Z order
    pub fn new<F: AsRef<TextureImage>>(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &BindGroupLayoutWithDesc,
        faces: &[F],
    ) -> Result<Self> {
        let cube_map = TextureResource::create_cube_map(device, queue, faces, "Skybox Cube Map")?;

        let cube = generate_closed_cube(1.0);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Skybox Vertices"),
            contents: bytemuck::cast_slice(&cube.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Skybox Indices"),
            contents: bytemuck::cast_slice(&cube.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let bind_group = BindGroupBuilder::new(layout)
            .texture(&cube_map.view)
            .sampler(&cube_map.sampler)
            .create(device, "Skybox Bind Group");

        log::debug!("Skybox uploaded ({} faces)", faces.len());
        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: cube.indices.len() as u32,
            _cube_map: cube_map,
            bind_group,
        })
    }

    /// Draws the cube; the caller has set the sky pipeline and slot 0
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_bind_group(1, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_matches_cube_positions() {
        let layout = sky_vertex_layout();
        let cube = generate_closed_cube(1.0);

        assert_eq!(layout.array_stride, 12);
        assert_eq!(layout.attributes.len(), 1);
        assert_eq!(layout.attributes[0].format, wgpu::VertexFormat::Float32x3);
        assert_eq!(
            bytemuck::cast_slice::<[f32; 3], u8>(&cube.vertices).len(),
            cube.vertex_count() * layout.array_stride as usize
        );
        assert_eq!(cube.indices.len(), 36);
    }
}
