//! Stopping-condition state machine
//!
//! Evaluated once per tick, before the controller and physics run.

use serde::{Deserialize, Serialize};

use crate::game::state::World;

/// Run state; every variant other than `Running` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoppingCondition {
    Running,
    /// Every asteroid has been destroyed
    NoAsteroids,
    /// Every ship has been removed
    NoLives,
    /// Simulated time reached the scenario's time limit
    NoTime,
}

impl StoppingCondition {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StoppingCondition::Running)
    }
}

/// Determine the stopping condition for the current world.
///
/// Priority order: asteroids, then lives, then time.
pub fn check(world: &World, time_limit: Option<f32>) -> StoppingCondition {
    if world.asteroids.is_empty() {
        return StoppingCondition::NoAsteroids;
    }

    if world.ships.is_empty() {
        return StoppingCondition::NoLives;
    }

    if let Some(limit) = time_limit {
        if world.time >= limit {
            return StoppingCondition::NoTime;
        }
    }

    StoppingCondition::Running
}

/// Evaluate the transition and advance frame/time counters while running.
///
/// Terminal states are sticky: once reached, the world is never advanced again.
pub fn advance(world: &mut World, time_limit: Option<f32>, frequency: u32) -> StoppingCondition {
    if world.stopping_condition.is_terminal() {
        return world.stopping_condition;
    }

    let condition = check(world, time_limit);
    if condition == StoppingCondition::Running {
        world.frame += 1;
        world.time = world.frame as f32 / frequency as f32;
    }
    world.stopping_condition = condition;
    condition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Asteroid, GameMap, Ship};
    use crate::util::vec2::Vec2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn create_world(asteroids: usize, ships: usize) -> World {
        let mut world = World::new(GameMap::default(), StdRng::seed_from_u64(3));
        for i in 0..asteroids {
            let mut rng = StdRng::seed_from_u64(i as u64);
            world.add_asteroid(Asteroid::new(i as u64, Vec2::new(10.0, 10.0), 4, None, None, &mut rng));
        }
        for i in 0..ships {
            world.add_ship(Ship::new(i as u32 + 1, Vec2::new(400.0, 300.0), 0.0, 3));
        }
        world
    }

    #[test]
    fn test_running() {
        let world = create_world(1, 1);
        assert_eq!(check(&world, None), StoppingCondition::Running);
    }

    #[test]
    fn test_no_asteroids_has_priority() {
        let world = create_world(0, 0);
        assert_eq!(check(&world, Some(0.0)), StoppingCondition::NoAsteroids);
    }

    #[test]
    fn test_no_lives() {
        let world = create_world(1, 0);
        assert_eq!(check(&world, None), StoppingCondition::NoLives);
    }

    #[test]
    fn test_no_time() {
        let mut world = create_world(1, 1);
        world.time = 2.0;
        assert_eq!(check(&world, Some(2.0)), StoppingCondition::NoTime);
        assert_eq!(check(&world, None), StoppingCondition::Running);
    }

    #[test]
    fn test_advance_counts_frames() {
        let mut world = create_world(1, 1);
        for _ in 0..60 {
            assert_eq!(advance(&mut world, Some(1.0), 60), StoppingCondition::Running);
        }
        assert_eq!(world.frame, 60);
        assert_eq!(advance(&mut world, Some(1.0), 60), StoppingCondition::NoTime);
        assert_eq!(world.frame, 60);
    }

    #[test]
    fn test_terminal_is_sticky() {
        let mut world = create_world(0, 1);
        assert_eq!(advance(&mut world, None, 60), StoppingCondition::NoAsteroids);

        // Repopulating does not resurrect a finished run
        let mut rng = StdRng::seed_from_u64(9);
        world.add_asteroid(Asteroid::new(1, Vec2::ZERO, 1, None, None, &mut rng));
        assert_eq!(advance(&mut world, None, 60), StoppingCondition::NoAsteroids);
        assert_eq!(world.frame, 0);
    }
}
