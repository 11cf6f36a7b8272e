//! Error types for the contour renderer.
//!
//! Fallible operations outside the adjacency builder return [`Result<T>`].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContourError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid scene configuration {path}: {source}")]
    SceneConfig {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("Failed to load model {path}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("Model {0} contains no triangles")]
    EmptyModel(PathBuf),

    #[error("Failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid texture: {0}")]
    Texture(String),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

/// Convenience alias for `Result<T, ContourError>`
pub type Result<T> = std::result::Result<T, ContourError>;
