//! Core rendering functionality
//!
//! Render pipelines, the sky and frame rendering. The WGSL sources live in
//! `shaders/` and are compiled into the binary.

pub mod pipeline_manager;
pub mod render_engine;
pub mod skybox;

// Re-export main types
pub use pipeline_manager::{PipelineConfig, PipelineManager, PipelineStats};
pub use render_engine::RenderEngine;
pub use skybox::Skybox;
