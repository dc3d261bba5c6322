//! Presentation hooks
//!
//! Observers see the world after every running tick and once at game over.
//! They never feed state back into the simulation.

use tracing::info;

use crate::game::game_loop::TickReport;
use crate::game::score::Score;
use crate::game::state::World;

pub trait SimObserver: Send {
    fn on_tick(&mut self, _world: &World, _score: &Score, _report: &TickReport) {}

    fn on_game_over(&mut self, _world: &World, _score: &Score) {}
}

/// Logs progress every `interval` frames and a summary at game over
pub struct TracingObserver {
    name: String,
    interval: u64,
}

impl TracingObserver {
    pub fn new(name: impl Into<String>, interval: u64) -> Self {
        Self {
            name: name.into(),
            interval: interval.max(1),
        }
    }
}

impl SimObserver for TracingObserver {
    fn on_tick(&mut self, world: &World, score: &Score, report: &TickReport) {
        if report.frame % self.interval == 0 {
            info!(
                "[{}] frame {} t={:.1}s: {} asteroids, {} ships, {} destroyed, accuracy {:.2}",
                self.name,
                report.frame,
                report.time,
                world.asteroids.len(),
                world.ships.len(),
                score.asteroids_hit,
                score.accuracy()
            );
        }
    }

    fn on_game_over(&mut self, _world: &World, score: &Score) {
        info!(
            "[{}] game over ({:?}) after {} frames: {}/{} asteroids, accuracy {:.2}, {} deaths, {} timeouts, {} faults",
            self.name,
            score.stopping_condition,
            score.frame_count,
            score.asteroids_hit,
            score.max_asteroids,
            score.accuracy(),
            score.deaths,
            score.controller_timeouts,
            score.controller_faults
        );
    }
}
