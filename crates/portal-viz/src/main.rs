use macroquad::prelude::*;
use portal_raster::{RenderConfig, RenderContext};
use portal_viz::{FlyCamera, SpanCanvas, demo};

const ROOMS: usize = 12;
const PVS_RADIUS: usize = 4;

fn load_config() -> RenderConfig {
    let Some(path) = std::env::args().nth(1) else {
        return RenderConfig::default();
    };
    match RenderConfig::load(&path) {
        Ok(config) => config,
        Err(err) => {
            log::error!("failed to load config {path}: {err}");
            std::process::exit(1);
        }
    }
}

#[macroquad::main("Portal Raster")]
async fn main() {
    env_logger::init();

    let config = load_config();
    let mut ctx = match RenderContext::new(config.clone()) {
        Ok(ctx) => ctx,
        Err(err) => {
            log::error!("invalid render config: {err}");
            std::process::exit(1);
        }
    };
    let mut level = match demo::corridor(ROOMS, Some(PVS_RADIUS)) {
        Ok(level) => level,
        Err(err) => {
            log::error!("failed to build demo level: {err}");
            std::process::exit(1);
        }
    };

    let mut camera = FlyCamera::new(demo::spawn_point(), 0.0);
    let mut canvas = SpanCanvas::new(config.screen(), BLACK);
    let texture = Texture2D::from_image(canvas.image());
    texture.set_filter(FilterMode::Nearest);

    loop {
        camera.update(get_frame_time());

        canvas.clear();
        let view = camera.to_camera(&ctx);
        let stats = match ctx.render_frame(&mut level, &view, &mut canvas) {
            Ok(stats) => stats,
            Err(err) => {
                log::error!("frame {} failed: {err}", ctx.frame());
                std::process::exit(1);
            }
        };
        texture.update(canvas.image());

        clear_background(BLACK);
        draw_texture_ex(
            &texture,
            0.0,
            0.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(screen_width(), screen_height())),
                ..Default::default()
            },
        );

        let leaf = level.find_leaf(camera.eye_point());
        draw_text(&format!("FPS: {}", get_fps()), 10.0, 20.0, 20.0, WHITE);
        draw_text(
            &format!(
                "Leaf {} | visible {} | PVS rejected {} | portals culled {}",
                leaf.0, stats.leaves_visible, stats.pvs_rejected, stats.portals_culled
            ),
            10.0,
            40.0,
            20.0,
            WHITE,
        );
        draw_text(
            &format!(
                "Nodes {} | painted {} px | arena high water {}",
                stats.nodes_visited,
                canvas.painted(),
                stats.arena_high_water
            ),
            10.0,
            60.0,
            20.0,
            WHITE,
        );
        draw_text("WASD move, Q/E down/up, arrows or drag to look", 10.0, 80.0, 20.0, GRAY);

        next_frame().await
    }
}
