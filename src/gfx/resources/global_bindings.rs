//! Global uniform bindings for camera, light and edge data
//!
//! Everything shared by all draws in a frame lives in one uniform buffer
//! bound to slot 0 of every pipeline.

use cgmath::{InnerSpace, Matrix4, Point3, Vector3};

use crate::{
    config::{EdgeConfig, LightConfig},
    gfx::camera::{orbit_camera::OPENGL_TO_WGPU_MATRIX, Camera, OrbitCamera},
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// Global uniform buffer content structure
///
/// MUST match the `Globals` struct in the shaders exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUBOContent {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
    /// View-projection without the camera translation
    pub sky_view_proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    /// xyz: unit vector from the scene towards the light
    pub light_direction: [f32; 4],
    pub light_ambient: [f32; 4],
    pub light_diffuse: [f32; 4],
    pub light_specular: [f32; 4],
    pub edge_color: [f32; 4],
    /// x: line width in pixels, y: extension along normals, zw: viewport size
    pub edge_params: [f32; 4],
}

fn rgb(color: [f32; 3]) -> [f32; 4] {
    [color[0], color[1], color[2], 1.0]
}

impl GlobalUBOContent {
    pub fn new(
        camera: &OrbitCamera,
        light: &LightConfig,
        edges: &EdgeConfig,
        viewport: (u32, u32),
    ) -> Self {
        let direction = Vector3::from(light.position).normalize();

        Self {
            view_position: [camera.eye.x, camera.eye.y, camera.eye.z, 1.0],
            view_proj: camera.build_view_projection_matrix().into(),
            sky_view_proj: camera.sky_view_projection_matrix().into(),
            light_view_proj: light_view_projection(light).into(),
            light_direction: [direction.x, direction.y, direction.z, 0.0],
            light_ambient: rgb(light.ambient),
            light_diffuse: rgb(light.diffuse),
            light_specular: rgb(light.specular),
            edge_color: rgb(edges.color),
            edge_params: [
                edges.width,
                edges.extend,
                viewport.0 as f32,
                viewport.1 as f32,
            ],
        }
    }
}

/// Orthographic projection from the light position towards the origin
///
/// The volume is `2 * shadow_extent` wide and deep, centred on the origin.
pub fn light_view_projection(light: &LightConfig) -> Matrix4<f32> {
    let position = Point3::from(light.position);
    let axis = Vector3::from(light.position);
    let distance = axis.magnitude();

    // look_at degenerates when the axis is vertical
    let up = if axis.normalize().y.abs() > 0.99 {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    };
    let light_view = Matrix4::look_at_rh(position, Point3::new(0.0, 0.0, 0.0), up);

    let extent = light.shadow_extent;
    let near = (distance - extent).max(0.1);
    let far = distance + extent;
    let light_proj = cgmath::ortho(-extent, extent, -extent, extent, near, far);

    OPENGL_TO_WGPU_MATRIX * light_proj * light_view
}

/// Type alias for the global uniform buffer
pub type GlobalUBO = UniformBuffer<GlobalUBOContent>;

/// Bind group layout and bind group for the global uniforms (slot 0)
pub struct GlobalBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: wgpu::BindGroup,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device, ubo: &GlobalUBO) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Globals Bind Group Layout");

        let bind_group = BindGroupBuilder::new(&bind_group_layout)
            .resource(ubo.binding_resource())
            .create(device, "Global Bind Group");

        GlobalBindings {
            bind_group_layout,
            bind_group,
        }
    }

    pub fn bind_group_layouts(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_groups(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}
