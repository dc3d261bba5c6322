//! Built-in controllers for demos, benchmarks and tests

use crate::controller::{Controller, ShipHandle, WorldSnapshot};

/// Does nothing; ships drift on their previous commands
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleController;

impl Controller for IdleController {
    fn name(&self) -> &str {
        "idle"
    }

    fn actions(&mut self, _ships: &mut [ShipHandle], _world: &WorldSnapshot) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Turns at a constant rate and fires every tick
#[derive(Debug, Clone, Copy)]
pub struct SpinShooter {
    pub turn_rate: f32,
    pub thrust: f32,
}

impl Default for SpinShooter {
    fn default() -> Self {
        Self {
            turn_rate: 90.0,
            thrust: 0.0,
        }
    }
}

impl Controller for SpinShooter {
    fn name(&self) -> &str {
        "spin_shooter"
    }

    fn actions(&mut self, ships: &mut [ShipHandle], _world: &WorldSnapshot) -> anyhow::Result<()> {
        for ship in ships {
            ship.set_turn_rate(self.turn_rate);
            ship.set_thrust(self.thrust);
            ship.fire();
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) use testing::{FailingController, SleepyController};


#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::handle::ShipHandle;
    use crate::game::state::{GameMap, Ship, World};
    use crate::util::vec2::Vec2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_spin_shooter_commands() {
        let mut world = World::new(GameMap::default(), StdRng::seed_from_u64(0));
        world.add_ship(Ship::new(1, Vec2::new(100.0, 100.0), 0.0, 3));
        let snapshot = WorldSnapshot::capture(&world);

        let (handle, sink) = ShipHandle::open(snapshot.ships[0].clone());
        let mut handles = vec![handle];
        SpinShooter::default().actions(&mut handles, &snapshot).unwrap();

        let commands = sink.close();
        assert_eq!(commands.turn_rate, Some(90.0));
        assert!(commands.fire);
    }
}
