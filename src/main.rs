use anyhow::Context;

use contour::{app::ContourApp, config::SceneConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let scene_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "scene.ron".to_string());

    let config = SceneConfig::load(&scene_path)
        .with_context(|| format!("cannot read scene {scene_path}"))?;
    let app = ContourApp::new(&config).context("cannot load scene assets")?;
    app.run().context("renderer stopped with an error")?;

    Ok(())
}
