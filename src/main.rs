use anyhow::Result;

mod camera;
mod geometry;
mod gltf;
mod light;
mod material;
mod math;
mod orbit;
mod rendering;
mod scene_graph;
mod viewer;
mod window;

fn main() -> Result<()> {
    pretty_env_logger::init();

    let model_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "assets/model.gltf".to_string());

    pollster::block_on(window::run(model_url))?;

    Ok(())
}
