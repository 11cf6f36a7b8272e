//! WGPU-based rendering engine
//!
//! Owns the surface, device and every pipeline. A frame is three passes:
//! the shadow map from the light, the sky, then the lit and outlined scene.

use std::sync::Arc;
use wgpu::TextureFormat;

use crate::{
    error::{ContourError, Result},
    gfx::{
        resources::{
            global_bindings::{GlobalBindings, GlobalUBO, GlobalUBOContent},
            material::MaterialManager,
            texture_resource::TextureResource,
        },
        scene::{
            object::{create_mesh_bind_group_layout, DrawObject},
            scene::Scene,
        },
    },
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
    },
};

use super::{
    pipeline_manager::{PipelineConfig, PipelineManager},
    skybox::{create_sky_bind_group_layout, sky_vertex_layout, Skybox},
};

const SHADOW_PIPELINE: &str = "Shadow";
const SKY_PIPELINE: &str = "Sky";
const OUTLINE_PIPELINE: &str = "Outline";

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    format: TextureFormat,
    pub pipeline_manager: PipelineManager,
    global_ubo: GlobalUBO,
    global_bindings: GlobalBindings,

    mesh_layout: BindGroupLayoutWithDesc,
    sky_layout: BindGroupLayoutWithDesc,
    material_manager: MaterialManager,

    shadow_map: TextureResource,
    shadow_bind_group: wgpu::BindGroup,

    skybox: Option<Skybox>,
    clear_color: wgpu::Color,
}

impl RenderEngine {
    /// Creates a render engine drawing into `window`
    ///
    /// Fails when no adapter can present to the window, when the adapter
    /// cannot read storage buffers from vertex shaders, or when a shader or
    /// pipeline does not validate.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        vsync: bool,
        shadow_map_size: u32,
    ) -> Result<RenderEngine> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| ContourError::Gpu(format!("cannot create surface: {e}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| ContourError::Gpu(format!("no suitable adapter: {e}")))?;

        let info = adapter.get_info();
        log::info!("Using {} ({:?})", info.name, info.backend);

        if !adapter
            .get_downlevel_capabilities()
            .flags
            .contains(wgpu::DownlevelFlags::VERTEX_STORAGE)
        {
            return Err(ContourError::Gpu(format!(
                "{} cannot read storage buffers in vertex shaders",
                info.name
            )));
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| ContourError::Gpu(format!("cannot open device: {e}")))?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        // Textures are sRGB, so present to an sRGB target as well
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| ContourError::Gpu("surface reports no formats".to_string()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: present_mode(vsync),
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture =
            TextureResource::create_depth_texture(&device, &config, "depth_texture");

        let shadow_size = shadow_map_size.clamp(1, device.limits().max_texture_dimension_2d);
        let shadow_map = TextureResource::create_shadow_map(&device, shadow_size);
        let shadow_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::depth_texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Comparison))
            .create(&device, "Shadow Bind Group Layout");
        let shadow_bind_group = BindGroupBuilder::new(&shadow_layout)
            .texture(&shadow_map.view)
            .sampler(&shadow_map.sampler)
            .create(&device, "Shadow Bind Group");

        let global_ubo = GlobalUBO::new(&device);
        let global_bindings = GlobalBindings::new(&device, &global_ubo);
        let mesh_layout = create_mesh_bind_group_layout(&device);
        let sky_layout = create_sky_bind_group_layout(&device);
        let material_manager = MaterialManager::new(&device, &queue);

        let device_handle: Arc<wgpu::Device> = device.into();
        let queue_handle: Arc<wgpu::Queue> = queue.into();
        let mut pipeline_manager = PipelineManager::new(device_handle.clone());

        device_handle.push_error_scope(wgpu::ErrorFilter::Validation);

        pipeline_manager.load_shader("outline", include_str!("shaders/outline.wgsl"));
        pipeline_manager.load_shader("shadow", include_str!("shaders/shadow_pass.wgsl"));
        pipeline_manager.load_shader("sky", include_str!("shaders/skybox.wgsl"));

        // No culling so thin or open geometry still occludes the light
        pipeline_manager.register_pipeline(
            SHADOW_PIPELINE,
            PipelineConfig::default()
                .with_label("SHADOW")
                .with_shader("shadow")
                .with_vertex_only()
                .with_depth_stencil(TextureResource::DEPTH_FORMAT)
                .with_depth_bias(wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                })
                .with_cull_mode(None)
                .with_bind_group_layouts(vec![
                    global_bindings.bind_group_layouts().clone(),
                    mesh_layout.layout.clone(),
                ]),
        );

        pipeline_manager.register_pipeline(
            SKY_PIPELINE,
            PipelineConfig::default()
                .with_label("SKY")
                .with_shader("sky")
                .with_vertex_buffers(vec![sky_vertex_layout()])
                .with_depth_stencil(TextureResource::DEPTH_FORMAT)
                .with_depth_test(wgpu::CompareFunction::Always, false)
                .with_cull_mode(None)
                .with_color_format(format)
                .with_bind_group_layouts(vec![
                    global_bindings.bind_group_layouts().clone(),
                    sky_layout.layout.clone(),
                ]),
        );

        pipeline_manager.register_pipeline(
            OUTLINE_PIPELINE,
            PipelineConfig::default()
                .with_label("OUTLINE")
                .with_shader("outline")
                .with_depth_stencil(TextureResource::DEPTH_FORMAT)
                .with_color_format(format)
                .with_bind_group_layouts(vec![
                    global_bindings.bind_group_layouts().clone(),
                    mesh_layout.layout.clone(),
                    material_manager.get_bind_group_layout().clone(),
                    shadow_layout.layout.clone(),
                ]),
        );

        let created = pipeline_manager.create_all_pipelines();
        if let Some(error) = device_handle.pop_error_scope().await {
            return Err(ContourError::Gpu(error.to_string()));
        }
        created.map_err(|errors| ContourError::Gpu(errors.join("; ")))?;

        let stats = pipeline_manager.get_stats();
        log::debug!(
            "Pipelines ready: {} created, {} shaders, shadow map {}x{}",
            stats.total_pipelines,
            stats.loaded_shaders,
            shadow_size,
            shadow_size
        );

        Ok(RenderEngine {
            surface,
            device: device_handle,
            queue: queue_handle,
            config,
            depth_texture,
            format,
            pipeline_manager,
            global_ubo,
            global_bindings,
            mesh_layout,
            sky_layout,
            material_manager,
            shadow_map,
            shadow_bind_group,
            skybox: None,
            clear_color: wgpu::Color::BLACK,
        })
    }

    /// Uploads every object and the sky of `scene`
    ///
    /// Must be called once before the scene is rendered.
    pub fn prepare_scene(&mut self, scene: &mut Scene) -> Result<()> {
        for object in &mut scene.objects {
            object.init_gpu_resources(
                &self.device,
                &self.queue,
                &self.mesh_layout,
                &mut self.material_manager,
            );
        }

        self.skybox = match &scene.skybox_faces {
            Some(faces) => Some(Skybox::new(&self.device, &self.queue, &self.sky_layout, faces)?),
            None => None,
        };

        let [r, g, b] = scene.clear_color;
        self.clear_color = wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        };

        log::info!(
            "Uploaded {} objects, {} textures, skybox: {}",
            scene.objects.len(),
            self.material_manager.texture_count(),
            self.skybox.is_some()
        );
        Ok(())
    }

    /// Writes the camera, light and edge parameters for the next frame
    pub fn update(&mut self, scene: &Scene) {
        let content = GlobalUBOContent::new(
            &scene.camera_manager.camera,
            &scene.light,
            &scene.edges,
            self.get_surface_size(),
        );
        self.global_ubo.update_content(&self.queue, content);
    }

    /// Renders one frame of `scene`
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped.
    pub fn render_frame(&mut self, scene: &Scene) -> Result<()> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timed out waiting for the surface, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(ContourError::Gpu(e.to_string())),
        };

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        // PASS 1: shadow map, cleared even when nothing casts
        {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Depth Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            shadow_pass.set_bind_group(0, self.global_bindings.bind_groups(), &[]);

            if let Some(shadow_pipeline) = self.pipeline_manager.get_pipeline(SHADOW_PIPELINE) {
                shadow_pass.set_pipeline(shadow_pipeline);
                for object in scene.shadow_casters() {
                    shadow_pass.draw_object_depth(object);
                }
            }
        }

        // PASS 2: sky, then the scene on top
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, self.global_bindings.bind_groups(), &[]);

            if let Some(skybox) = &self.skybox {
                if let Some(pipeline) = self.pipeline_manager.get_pipeline(SKY_PIPELINE) {
                    render_pass.set_pipeline(pipeline);
                    skybox.draw(&mut render_pass);
                }
            }

            if let Some(pipeline) = self.pipeline_manager.get_pipeline(OUTLINE_PIPELINE) {
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(3, &self.shadow_bind_group, &[]);

                for object in &scene.objects {
                    render_pass.draw_object(object);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }

    /// Resizes the surface and recreates the depth buffer
    ///
    /// Zero-sized requests (minimized windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
    }

    /// Returns current surface dimensions in pixels
    pub fn get_surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Switches between Fifo (vsync) and Immediate presentation
    pub fn set_vsync(&mut self, enable: bool) {
        self.config.present_mode = present_mode(enable);
        self.surface.configure(&self.device, &self.config);
    }
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::AutoVsync
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_mode_follows_vsync() {
        assert_eq!(present_mode(true), wgpu::PresentMode::AutoVsync);
        assert_eq!(present_mode(false), wgpu::PresentMode::AutoNoVsync);
    }

    #[test]
    fn test_shaders_declare_entry_points() {
        let outline = include_str!("shaders/outline.wgsl");
        let shadow = include_str!("shaders/shadow_pass.wgsl");
        let sky = include_str!("shaders/skybox.wgsl");

        assert!(outline.contains("fn vs_main") && outline.contains("fn fs_main"));
        assert!(sky.contains("fn vs_main") && sky.contains("fn fs_main"));
        assert!(shadow.contains("fn vs_main") && !shadow.contains("fn fs_main"));
    }
}
