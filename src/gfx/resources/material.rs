//! Material system
//!
//! A material is a diffuse color optionally multiplied by a diffuse texture.
//! Materials are plain data until [`MaterialManager::upload`] gives them a
//! bind group; decoded images are shared by path so a texture used by many
//! meshes is uploaded once.

use std::{collections::HashMap, path::PathBuf, rc::Rc};

use wgpu::Device;

use super::texture_resource::{TextureImage, TextureResource};
use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types,
    uniform_buffer::UniformBuffer,
};

/// GPU uniform data for materials
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    /// x: 1.0 when a diffuse texture is bound
    pub params: [f32; 4],
}

type MaterialUBO = UniformBuffer<MaterialUniform>;

/// Material bind group layout: uniform, diffuse texture, sampler
pub struct MaterialBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
}

impl MaterialBindings {
    pub fn new(device: &Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(device, "Material Bind Group Layout");

        MaterialBindings { bind_group_layout }
    }

    pub fn bind_group_layouts(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    fn create_bind_group(
        &self,
        device: &Device,
        ubo: &MaterialUBO,
        texture: &TextureResource,
        label: &str,
    ) -> wgpu::BindGroup {
        BindGroupBuilder::new(&self.bind_group_layout)
            .resource(ubo.binding_resource())
            .texture(&texture.view)
            .sampler(&texture.sampler)
            .create(device, label)
    }
}

struct MaterialGpu {
    _ubo: MaterialUBO,
    bind_group: wgpu::BindGroup,
}

/// Diffuse material of a mesh
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
    pub diffuse_texture: Option<Rc<TextureImage>>,

    gpu: Option<MaterialGpu>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            base_color: [0.8, 0.8, 0.8, 1.0],
            diffuse_texture: None,
            gpu: None,
        }
    }
}

impl Clone for Material {
    /// Clones the material data; GPU resources are not shared
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            base_color: self.base_color,
            diffuse_texture: self.diffuse_texture.clone(),
            gpu: None,
        }
    }
}

impl std::fmt::Debug for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Material")
            .field("name", &self.name)
            .field("base_color", &self.base_color)
            .field(
                "diffuse_texture",
                &self.diffuse_texture.as_ref().map(|t| t.source.display().to_string()),
            )
            .field("uploaded", &self.gpu.is_some())
            .finish()
    }
}

impl Material {
    pub fn new(name: &str, base_color: [f32; 4]) -> Self {
        Self {
            name: name.to_string(),
            base_color,
            ..Default::default()
        }
    }

    /// Builder pattern: Set base color from RGB values
    pub fn with_color(mut self, r: f32, g: f32, b: f32) -> Self {
        self.base_color = [r, g, b, self.base_color[3]];
        self
    }

    pub fn with_texture(mut self, texture: Rc<TextureImage>) -> Self {
        self.diffuse_texture = Some(texture);
        self
    }

    pub fn uniform(&self) -> MaterialUniform {
        MaterialUniform {
            base_color: self.base_color,
            params: [
                if self.diffuse_texture.is_some() { 1.0 } else { 0.0 },
                0.0,
                0.0,
                0.0,
            ],
        }
    }

    /// Gets the bind group for rendering, once uploaded
    pub fn get_bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.gpu.as_ref().map(|gpu| &gpu.bind_group)
    }
}

/// Owns the material layout and the GPU copies of every texture in use
pub struct MaterialManager {
    bindings: MaterialBindings,
    fallback: TextureResource,
    textures: HashMap<PathBuf, Rc<TextureResource>>,
}

impl MaterialManager {
    pub fn new(device: &Device, queue: &wgpu::Queue) -> Self {
        Self {
            bindings: MaterialBindings::new(device),
            fallback: TextureResource::create_solid_color(
                device,
                queue,
                [255, 255, 255, 255],
                "Fallback Texture",
            ),
            textures: HashMap::new(),
        }
    }

    pub fn get_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        self.bindings.bind_group_layouts()
    }

    /// Number of distinct textures uploaded so far
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    fn texture_for(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        image: &TextureImage,
    ) -> Rc<TextureResource> {
        self.textures
            .entry(image.source.clone())
            .or_insert_with(|| {
                log::debug!("Uploading texture {}", image.source.display());
                Rc::new(TextureResource::create_from_image(
                    device,
                    queue,
                    &image.pixels,
                    &image.source.display().to_string(),
                ))
            })
            .clone()
    }

    /// Creates the material's uniform buffer and bind group
    pub fn upload(&mut self, device: &Device, queue: &wgpu::Queue, material: &mut Material) {
        let ubo = MaterialUBO::new_with_data(device, &material.uniform());
        let label = format!("Material {}", material.name);

        let bind_group = match &material.diffuse_texture {
            Some(image) => {
                let texture = self.texture_for(device, queue, image);
                self.bindings
                    .create_bind_group(device, &ubo, &texture, &label)
            }
            None => self
                .bindings
                .create_bind_group(device, &ubo, &self.fallback, &label),
        };

        material.gpu = Some(MaterialGpu {
            _ubo: ubo,
            bind_group,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn test_uniform_flags_texture() {
        let plain = Material::new("plain", [1.0, 0.5, 0.25, 1.0]);
        assert_eq!(plain.uniform().params[0], 0.0);
        assert_eq!(plain.uniform().base_color, [1.0, 0.5, 0.25, 1.0]);

        let image = Rc::new(TextureImage {
            source: PathBuf::from("skin.png"),
            pixels: RgbaImage::new(2, 2),
        });
        let textured = plain.clone().with_texture(image.clone());
        assert_eq!(textured.uniform().params[0], 1.0);
        assert_eq!(Rc::strong_count(&image), 2);
    }

    #[test]
    fn test_clone_drops_gpu_state() {
        let material = Material::default().with_color(0.1, 0.2, 0.3);
        let copy = material.clone();
        assert!(copy.get_bind_group().is_none());
        assert_eq!(copy.base_color, [0.1, 0.2, 0.3, 1.0]);
    }
}
