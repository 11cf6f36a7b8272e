//! Texture resource management for wgpu
//!
//! Provides utilities for creating GPU textures, views and samplers for the
//! depth buffer, the shadow map, material textures and the sky cube map.

use std::path::{Path, PathBuf};

use image::{imageops::FilterType, RgbaImage};

use crate::error::{ContourError, Result};

/// A decoded RGBA8 image together with the file it came from
#[derive(Debug, Clone)]
pub struct TextureImage {
    pub source: PathBuf,
    pub pixels: RgbaImage,
}

impl TextureImage {
    /// Decodes an image file (BMP, PNG or JPEG) into RGBA8
    pub fn load(path: &Path) -> Result<Self> {
        let pixels = image::open(path)
            .map_err(|source| ContourError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .into_rgba8();

        log::debug!(
            "Decoded {} ({}x{})",
            path.display(),
            pixels.width(),
            pixels.height()
        );
        Ok(Self {
            source: path.to_path_buf(),
            pixels,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// GPU texture resource containing texture, view, and sampler
#[derive(Clone)]
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl TextureResource {
    /// Standard depth buffer format used throughout the engine
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Color textures are stored as sRGB and sampled as linear
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    /// Creates a depth texture matching the surface configuration
    pub fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Square depth map rendered from the light, with a comparison sampler
    pub fn create_shadow_map(device: &wgpu::Device, size: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Outside the map counts as lit
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 100.0,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Uploads an image with a full mip chain and repeating addressing
    pub fn create_from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &RgbaImage,
        label: &str,
    ) -> Self {
        let levels = build_mip_chain(image);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(image.width(), image.height(), 1),
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::COLOR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip_level, level) in levels.iter().enumerate() {
            write_layer(queue, &texture, level, mip_level as u32, 0);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// 1x1 texture of a single color, bound when a material has no texture
    pub fn create_solid_color(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        label: &str,
    ) -> Self {
        Self::create_from_image(device, queue, &RgbaImage::from_pixel(1, 1, image::Rgba(rgba)), label)
    }

    /// Builds a cube map from six faces in +X, -X, +Y, -Y, +Z, -Z order
    ///
    /// Every face must be square and all faces the same size.
    pub fn create_cube_map<F: AsRef<TextureImage>>(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[F],
        label: &str,
    ) -> Result<Self> {
        let size = validate_cube_faces(faces)?;

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size, size, 6),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::COLOR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in faces.iter().enumerate() {
            let face: &TextureImage = face.as_ref();
            write_layer(queue, &texture, &face.pixels, 0, layer as u32);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            texture,
            view,
            sampler,
        })
    }
}

fn extent(width: u32, height: u32, layers: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: layers,
    }
}

fn write_layer(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    image: &RgbaImage,
    mip_level: u32,
    layer: u32,
) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
            aspect: wgpu::TextureAspect::All,
        },
        image.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * image.width()),
            rows_per_image: Some(image.height()),
        },
        extent(image.width(), image.height(), 1),
    );
}

/// Number of levels down to 1x1
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Level 0 is the image itself; each following level halves both sides
pub fn build_mip_chain(image: &RgbaImage) -> Vec<RgbaImage> {
    let count = mip_level_count(image.width(), image.height());
    let mut levels = Vec::with_capacity(count as usize);
    levels.push(image.clone());

    for _ in 1..count {
        let Some(previous) = levels.last() else { break };
        let width = (previous.width() / 2).max(1);
        let height = (previous.height() / 2).max(1);
        let next = image::imageops::resize(previous, width, height, FilterType::Triangle);
        levels.push(next);
    }
    levels
}

/// Returns the common edge length of six square, equally sized faces
pub fn validate_cube_faces<F: AsRef<TextureImage>>(faces: &[F]) -> Result<u32> {
    let [first, rest @ ..] = faces else {
        return Err(ContourError::Texture("cube map without faces".to_string()));
    };
    if faces.len() != 6 {
        return Err(ContourError::Texture(format!(
            "cube map needs 6 faces, got {}",
            faces.len()
        )));
    }

    let first: &TextureImage = first.as_ref();
    let (width, height) = first.dimensions();
    if width != height {
        return Err(ContourError::Texture(format!(
            "cube face {} is {}x{}, expected a square image",
            first.source.display(),
            width,
            height
        )));
    }

    for face in rest.iter().map(AsRef::<TextureImage>::as_ref) {
        if face.dimensions() != (width, height) {
            let (w, h) = face.dimensions();
            return Err(ContourError::Texture(format!(
                "cube face {} is {}x{}, expected {}x{} like {}",
                face.source.display(),
                w,
                h,
                width,
                height,
                first.source.display()
            )));
        }
    }
    Ok(width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn face(name: &str, width: u32, height: u32) -> Rc<TextureImage> {
        Rc::new(TextureImage {
            source: PathBuf::from(name),
            pixels: RgbaImage::new(width, height),
        })
    }

    #[test]
    fn test_mip_level_count() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(256, 256), 9);
        assert_eq!(mip_level_count(256, 64), 9);
        assert_eq!(mip_level_count(300, 7), 9);
    }

    #[test]
    fn test_mip_chain_halves_down_to_one_pixel() {
        let image = RgbaImage::from_pixel(16, 4, image::Rgba([200, 10, 10, 255]));
        let chain = build_mip_chain(&image);

        let sizes: Vec<_> = chain.iter().map(|level| level.dimensions()).collect();
        assert_eq!(sizes, vec![(16, 4), (8, 2), (4, 1), (2, 1), (1, 1)]);
        // Uniform color survives filtering
        assert_eq!(chain[4].get_pixel(0, 0), &image::Rgba([200, 10, 10, 255]));
    }

    #[test]
    fn test_cube_faces_must_match() {
        let faces = vec![
            face("px", 64, 64),
            face("nx", 64, 64),
            face("py", 64, 64),
            face("ny", 64, 64),
            face("pz", 64, 64),
            face("nz", 64, 64),
        ];
        assert_eq!(validate_cube_faces(&faces).unwrap(), 64);

        let mut mismatched = faces.clone();
        mismatched[3] = face("ny", 32, 32);
        let err = validate_cube_faces(&mismatched).unwrap_err();
        assert!(matches!(err, ContourError::Texture(ref msg) if msg.contains("ny")));

        let mut not_square = faces.clone();
        not_square[0] = face("px", 64, 32);
        assert!(validate_cube_faces(&not_square).is_err());

        assert!(validate_cube_faces(&faces[..5]).is_err());
    }

    #[test]
    fn test_missing_image_reports_path() {
        let err = TextureImage::load(Path::new("no/such/texture.bmp")).unwrap_err();
        match err {
            ContourError::Image { path, .. } => {
                assert_eq!(path, PathBuf::from("no/such/texture.bmp"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
