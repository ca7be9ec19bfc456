//! Fixed timestep game loop
//!
//! One `tick` advances the physics by one step while balls are in flight, and
//! closes the round once every ball has landed. All randomness comes from
//! the game's seeded generator, so a seed plus an input sequence replays
//! exactly.

use std::f32::consts::{FRAC_PI_2, PI};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::arena::{AdvanceOutcome, Arena};
use super::contact::ContactReport;
use super::physics::PhysicsWorld;
use crate::settings::Settings;

/// Current phase of play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Balls staged at the launch point, waiting for a shot
    Aiming,
    /// Balls moving; the round ends when all have landed
    InFlight,
    Paused,
    /// A square reached the floor row
    GameOver,
}

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Launch angle in radians from +X, clamped to the allowed cone
    pub aim_angle: Option<f32>,
    /// Shoot along the current aim
    pub launch: bool,
    /// Pause toggle
    pub pause: bool,
}

pub struct Game {
    pub world: PhysicsWorld,
    pub arena: Arena,
    pub phase: GamePhase,
    /// Phase to return to when unpausing
    resume_phase: GamePhase,
    /// Rounds completed
    pub round: u32,
    pub aim: f32,
    pub time_ticks: u64,
    /// Contact totals over the whole run
    pub stats: ContactReport,
    rng: Pcg32,
    min_launch_angle: f32,
}

impl Game {
    /// Fresh arena with one ball and one spawned row
    pub fn new(settings: &Settings, seed: u64) -> Self {
        let mut world = PhysicsWorld::new(&settings.physics);
        let mut arena = Arena::new(&mut world, settings.arena.clone(), &settings.physics);
        let mut rng = Pcg32::seed_from_u64(seed);

        arena.add_ball(&mut world);
        let outcome = arena.advance(&mut world, rng.random());
        let phase = match outcome {
            AdvanceOutcome::Continue => GamePhase::Aiming,
            AdvanceOutcome::GameOver => GamePhase::GameOver,
        };
        log::info!("New game (seed {seed})");

        Self {
            world,
            arena,
            phase,
            resume_phase: phase,
            round: 0,
            aim: FRAC_PI_2,
            time_ticks: 0,
            stats: ContactReport::default(),
            rng,
            min_launch_angle: settings.arena.min_launch_angle,
        }
    }

    /// Clamp an angle into the launch cone above the floor
    pub fn clamp_aim(&self, angle: f32) -> f32 {
        let min = self.min_launch_angle;
        angle.clamp(min, PI - min)
    }

    /// Restage after every ball landed, then spawn the next row
    fn end_round(&mut self) -> AdvanceOutcome {
        self.arena.finish_round(&mut self.world);
        let seed = self.rng.random();
        let outcome = self.arena.advance(&mut self.world, seed);
        self.round += 1;
        match outcome {
            AdvanceOutcome::Continue => {
                self.phase = GamePhase::Aiming;
                log::debug!(
                    "Round {} done, {} balls, launch at x={:.1}",
                    self.round,
                    self.arena.num_balls(),
                    self.arena.spawn_position().x
                );
            }
            AdvanceOutcome::GameOver => {
                self.phase = GamePhase::GameOver;
                log::info!(
                    "Game over after {} rounds ({} squares destroyed)",
                    self.round,
                    self.stats.destroyed
                );
            }
        }
        outcome
    }
}

/// Advance the game by one fixed timestep
pub fn tick(game: &mut Game, input: &TickInput) {
    if input.pause {
        match game.phase {
            GamePhase::Aiming | GamePhase::InFlight => {
                game.resume_phase = game.phase;
                game.phase = GamePhase::Paused;
                return;
            }
            GamePhase::Paused => game.phase = game.resume_phase,
            GamePhase::GameOver => {}
        }
    }

    match game.phase {
        GamePhase::Paused | GamePhase::GameOver => return,
        _ => {}
    }

    game.time_ticks += 1;

    match game.phase {
        GamePhase::Aiming => {
            if let Some(angle) = input.aim_angle {
                game.aim = game.clamp_aim(angle);
            }
            if input.launch {
                game.arena.shoot(&mut game.world, game.aim);
                game.phase = GamePhase::InFlight;
            }
        }
        GamePhase::InFlight => {
            game.world.step();
            game.stats += game.arena.resolve_contacts(&mut game.world);
            game.arena.step(&game.world);
            if game.arena.all_balls_landed() {
                game.end_round();
            }
        }
        GamePhase::Paused | GamePhase::GameOver => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{Attributes, EntityKind};

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.arena.max_balls = 32;
        settings
    }

    /// Shoot, then tick until the phase leaves InFlight or `limit` ticks pass
    fn play_round(game: &mut Game, angle: f32, limit: usize) {
        tick(
            game,
            &TickInput {
                aim_angle: Some(angle),
                launch: true,
                ..Default::default()
            },
        );
        for _ in 0..limit {
            if game.phase != GamePhase::InFlight {
                break;
            }
            tick(game, &TickInput::default());
        }
    }

    #[test]
    fn test_new_game_is_aiming_with_one_ball() {
        let game = Game::new(&settings(), 12345);
        assert_eq!(game.phase, GamePhase::Aiming);
        assert_eq!(game.arena.num_balls(), 1);
        assert_eq!(game.arena.generation(), 2);
        assert_eq!(game.round, 0);
    }

    #[test]
    fn test_aim_is_clamped() {
        let mut game = Game::new(&settings(), 1);
        tick(
            &mut game,
            &TickInput {
                aim_angle: Some(-1.0),
                ..Default::default()
            },
        );
        assert_eq!(game.aim, 0.1);
        tick(
            &mut game,
            &TickInput {
                aim_angle: Some(4.0),
                ..Default::default()
            },
        );
        assert_eq!(game.aim, PI - 0.1);
        assert_eq!(game.phase, GamePhase::Aiming);
    }

    #[test]
    fn test_launch_then_round_completes() {
        let mut game = Game::new(&settings(), 777);
        play_round(&mut game, 1.2, 20_000);
        assert_eq!(game.phase, GamePhase::Aiming);
        assert_eq!(game.round, 1);
        assert_eq!(game.arena.generation(), 3);
        assert!(game.arena.all_balls_landed());
        let spawn = game.arena.spawn_position();
        for ball in game.arena.tracked_balls() {
            assert_eq!(ball.pos, spawn);
        }
    }

    #[test]
    fn test_pause_freezes_flight() {
        let mut game = Game::new(&settings(), 5);
        tick(
            &mut game,
            &TickInput {
                launch: true,
                ..Default::default()
            },
        );
        assert_eq!(game.phase, GamePhase::InFlight);
        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut game, &pause);
        assert_eq!(game.phase, GamePhase::Paused);

        let ticks = game.time_ticks;
        let before = game.arena.tracked_balls()[0].pos;
        tick(&mut game, &TickInput::default());
        assert_eq!(game.time_ticks, ticks);
        assert_eq!(game.arena.tracked_balls()[0].pos, before);

        tick(&mut game, &pause);
        assert_eq!(game.phase, GamePhase::InFlight);
    }

    #[test]
    fn test_square_on_floor_row_ends_game() {
        let mut game = Game::new(&settings(), 9);
        let index = game.arena.grid().index(0, 0);
        if let Some(cell) = game.arena.entity_mut(index) {
            cell.attrs = Attributes::new(EntityKind::ActiveCell, 5);
        }
        let generation = game.arena.generation();
        assert_eq!(game.end_round(), AdvanceOutcome::GameOver);
        assert_eq!(game.phase, GamePhase::GameOver);
        assert_eq!(game.arena.generation(), generation);

        // Further input is ignored
        let ticks = game.time_ticks;
        tick(
            &mut game,
            &TickInput {
                launch: true,
                ..Default::default()
            },
        );
        assert_eq!(game.phase, GamePhase::GameOver);
        assert_eq!(game.time_ticks, ticks);
    }

    #[test]
    fn test_determinism() {
        let mut game1 = Game::new(&settings(), 99999);
        let mut game2 = Game::new(&settings(), 99999);

        for angle in [1.0, 2.2, 0.6] {
            play_round(&mut game1, angle, 20_000);
            play_round(&mut game2, angle, 20_000);
        }

        assert_eq!(game1.time_ticks, game2.time_ticks);
        assert_eq!(game1.round, game2.round);
        assert_eq!(game1.phase, game2.phase);
        assert_eq!(game1.stats, game2.stats);
        assert_eq!(game1.arena.entities(), game2.arena.entities());
    }
}
