//! Baller entry point
//!
//! Headless host: runs the fixed-timestep game loop with a scripted aim
//! sweep and, when `--render` is given and an adapter is available, draws
//! every frame into an offscreen texture.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use baller::Settings;
use baller::renderer::{ArenaRenderer, GlyphAtlas, OffscreenTarget, ShaderParams};
use baller::sim::{Game, GamePhase, TickInput, tick};

/// Ticks allowed for one round before the host gives up on it (two minutes)
const MAX_ROUND_TICKS: u64 = 120 * 120;
/// Render every Nth physics tick (60 fps at 120 Hz)
const RENDER_EVERY: u64 = 2;

/// Command-line arguments for the headless host
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Options {
    /// JSON settings file; built-in defaults when omitted
    #[arg(value_name = "SETTINGS")]
    settings: Option<PathBuf>,

    /// Run seed; the same seed replays the same game
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,

    /// Rounds to play before stopping
    #[arg(long, default_value_t = 50)]
    rounds: u32,

    /// Draw every other tick into an offscreen texture
    #[arg(long)]
    render: bool,

    /// Font for square labels, overriding render.font_path
    #[arg(long, value_name = "PATH")]
    font: Option<PathBuf>,
}

/// Launch angle for round `n`: a low-discrepancy sweep across the cone
fn sweep_angle(game: &Game, n: u32) -> f32 {
    const GOLDEN: f32 = 0.618_034;
    let t = (n as f32 * GOLDEN).fract();
    game.clamp_aim(std::f32::consts::PI * t)
}

struct Frame {
    target: OffscreenTarget,
    renderer: ArenaRenderer,
}

fn setup_render(settings: &Settings, game: &mut Game) -> Option<Frame> {
    let atlas = match &settings.render.font_path {
        Some(path) => {
            let px = settings.render.font_scale * settings.arena.square_size;
            GlyphAtlas::load(Path::new(path), px)
                .inspect_err(|e| log::error!("Digit labels disabled: {e}"))
                .ok()
        }
        None => {
            log::info!("No font configured (render.font_path or --font), digit labels disabled");
            None
        }
    };

    let width = settings.arena.width().ceil() as u32;
    let height = settings.arena.height().ceil() as u32;
    let target = match pollster::block_on(OffscreenTarget::new(width, height)) {
        Ok(target) => target,
        Err(e) => {
            log::error!("Rendering disabled: {e}");
            return None;
        }
    };

    log::info!("Rendering offscreen at {}x{}", target.size.0, target.size.1);
    let params = ShaderParams::new(game.arena.config(), &settings.render);
    let renderer = ArenaRenderer::new(
        &target.device,
        &target.queue,
        OffscreenTarget::FORMAT,
        &mut game.arena,
        atlas.as_ref(),
        &params,
    );
    Some(Frame { target, renderer })
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let options = Options::parse();
    let mut settings = Settings::load(options.settings.as_deref())?;
    if let Some(font) = options.font {
        settings.render.font_path = Some(font.display().to_string());
    }

    let mut game = Game::new(&settings, options.seed);
    let frame = if options.render {
        setup_render(&settings, &mut game)
    } else {
        None
    };

    let idle = TickInput::default();
    for n in 0..options.rounds {
        if game.phase != GamePhase::Aiming {
            break;
        }
        let launch = TickInput {
            aim_angle: Some(sweep_angle(&game, n)),
            launch: true,
            ..Default::default()
        };
        tick(&mut game, &launch);

        let start = game.time_ticks;
        while game.phase == GamePhase::InFlight {
            if game.time_ticks - start > MAX_ROUND_TICKS {
                log::warn!("Round {n} did not finish in {MAX_ROUND_TICKS} ticks, stopping");
                break;
            }
            tick(&mut game, &idle);
            if let Some(frame) = &frame
                && game.time_ticks % RENDER_EVERY == 0
            {
                frame.renderer.sync(&frame.target.queue, &mut game.arena);
                frame.target.render(&frame.renderer);
            }
        }
        if game.phase == GamePhase::InFlight {
            break;
        }
    }

    log::info!(
        "Finished after {} rounds ({:?}): {} balls, {} squares destroyed, {} hits, {} ticks",
        game.round,
        game.phase,
        game.arena.num_balls(),
        game.stats.destroyed,
        game.stats.hits,
        game.time_ticks
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Baller (headless) starting...");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
