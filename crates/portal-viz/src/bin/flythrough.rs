//! Headless walk down the demo corridor, logging per-frame traversal stats.
//!
//! Usage: `flythrough [config.json]`, or `flythrough --write-config <path>`
//! to write the default config as a starting point. Set `RUST_LOG=info` to
//! see the output.

use std::f32::consts::PI;
use std::process::ExitCode;

use portal_raster::{FrameStats, RenderConfig, RenderContext};
use portal_viz::{FlyCamera, SpanCanvas, demo};

const ROOMS: usize = 16;
const PVS_RADIUS: usize = 3;
const FRAMES: usize = 240;

/// Simple LCG so the camera wobble is repeatable.
struct Rng(u64);

impl Rng {
    fn next_f32(&mut self) -> f32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as f32) / (u32::MAX >> 1) as f32
    }
}

fn run(config: RenderConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut ctx = RenderContext::new(config.clone())?;
    let mut level = demo::corridor(ROOMS, Some(PVS_RADIUS))?;
    let mut canvas = SpanCanvas::new(config.screen(), macroquad::color::BLACK);
    let mut camera = FlyCamera::new(demo::spawn_point(), 0.0);
    let mut rng = Rng(0x5eed);

    let length = (ROOMS as i32 * demo::ROOM_SIZE) as f32;
    let step = (length - demo::ROOM_SIZE as f32) / FRAMES as f32;
    let mut totals = FrameStats::default();

    for i in 0..FRAMES {
        camera.position.z += step;
        camera.yaw = (rng.next_f32() - 0.5) * PI / 3.0;
        camera.pitch = (rng.next_f32() - 0.5) * PI / 6.0;

        canvas.clear();
        let stats = ctx.render_frame(&mut level, &camera.to_camera(&ctx), &mut canvas)?;
        log::info!(
            "frame {i}: leaf {} | {} visible | {} nodes | {} PVS rejected | {} bounds rejected | {} portals culled | {} px | arena {}",
            level.find_leaf(camera.eye_point()).0,
            stats.leaves_visible,
            stats.nodes_visited,
            stats.pvs_rejected,
            stats.bounds_rejected,
            stats.portals_culled,
            canvas.painted(),
            stats.arena_high_water
        );

        totals.leaves_visible += stats.leaves_visible;
        totals.nodes_visited += stats.nodes_visited;
        totals.pvs_rejected += stats.pvs_rejected;
        totals.arena_high_water = totals.arena_high_water.max(stats.arena_high_water);
    }

    log::info!(
        "{FRAMES} frames: {:.1} leaves and {:.1} nodes per frame, {} PVS rejections, peak arena {} cells",
        totals.leaves_visible as f32 / FRAMES as f32,
        totals.nodes_visited as f32 / FRAMES as f32,
        totals.pvs_rejected,
        totals.arena_high_water
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(flag) if flag == "--write-config" => {
            let Some(path) = args.next() else {
                log::error!("--write-config needs a path");
                return ExitCode::FAILURE;
            };
            return match RenderConfig::default().save(&path) {
                Ok(()) => {
                    log::info!("wrote default config to {path}");
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    log::error!("failed to write config {path}: {err}");
                    ExitCode::FAILURE
                }
            };
        }
        Some(path) => match RenderConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                log::error!("failed to load config {path}: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => RenderConfig::default(),
    };

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("flythrough failed: {err}");
            ExitCode::FAILURE
        }
    }
}
