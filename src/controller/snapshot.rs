//! Read-only world snapshot handed to controllers each tick

use serde::Serialize;

use crate::game::state::{EntityId, GameMap, ShipId, World};
use crate::game::stopping::StoppingCondition;
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AsteroidView {
    pub id: EntityId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub size: u8,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulletView {
    pub id: EntityId,
    pub owner_id: ShipId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipView {
    pub id: ShipId,
    pub team: Option<String>,
    pub position: Vec2,
    pub velocity: Vec2,
    pub speed: f32,
    pub angle: f32,
    pub lives: u32,
    pub respawn_timer: f32,
    pub fire_cooldown: f32,
    pub bullets_remaining: Option<u32>,
    pub radius: f32,
    pub thrust_range: (f32, f32),
    pub turn_rate_range: (f32, f32),
}

impl ShipView {
    pub fn is_respawning(&self) -> bool {
        self.respawn_timer > 0.0
    }

    pub fn can_fire(&self) -> bool {
        self.fire_cooldown <= 0.0 && self.bullets_remaining != Some(0)
    }
}

/// Immutable copy of the world at the start of a tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub frame: u64,
    pub time: f32,
    pub stopping_condition: StoppingCondition,
    pub map: GameMap,
    pub asteroids: Vec<AsteroidView>,
    pub bullets: Vec<BulletView>,
    pub ships: Vec<ShipView>,
}

impl WorldSnapshot {
    pub fn capture(world: &World) -> Self {
        Self {
            frame: world.frame,
            time: world.time,
            stopping_condition: world.stopping_condition,
            map: world.map,
            asteroids: world
                .asteroids
                .iter()
                .map(|a| AsteroidView {
                    id: a.id,
                    position: a.position,
                    velocity: a.velocity,
                    angle: a.angle,
                    size: a.size,
                    radius: a.radius(),
                })
                .collect(),
            bullets: world
                .bullets
                .iter()
                .map(|b| BulletView {
                    id: b.id,
                    owner_id: b.owner_id,
                    position: b.position,
                    velocity: b.velocity,
                    angle: b.angle,
                })
                .collect(),
            ships: world
                .ships
                .iter()
                .map(|s| ShipView {
                    id: s.id,
                    team: s.team.clone(),
                    position: s.position,
                    velocity: s.velocity(),
                    speed: s.speed,
                    angle: s.angle,
                    lives: s.lives,
                    respawn_timer: s.respawn_timer,
                    fire_cooldown: s.fire_cooldown,
                    bullets_remaining: s.bullets_remaining,
                    radius: s.radius(),
                    thrust_range: s.thrust_range,
                    turn_rate_range: s.turn_rate_range,
                })
                .collect(),
        }
    }

    pub fn ship(&self, id: ShipId) -> Option<&ShipView> {
        self.ships.iter().find(|s| s.id == id)
    }

    /// Nearest asteroid to `position`, ignoring wraparound
    pub fn nearest_asteroid(&self, position: Vec2) -> Option<&AsteroidView> {
        self.asteroids.iter().min_by(|a, b| {
            a.position
                .distance_sq_to(position)
                .total_cmp(&b.position.distance_sq_to(position))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Asteroid, Ship};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_capture() {
        let mut world = World::new(GameMap::default(), StdRng::seed_from_u64(0));
        world.add_ship(Ship::new(1, Vec2::new(400.0, 300.0), 0.0, 3));
        let a = Asteroid::new(7, Vec2::new(10.0, 20.0), 3, Some(0.0), Some(0.0), &mut world.rng);
        world.add_asteroid(a);
        let a = Asteroid::new(8, Vec2::new(390.0, 290.0), 1, Some(0.0), Some(0.0), &mut world.rng);
        world.add_asteroid(a);
        world.add_bullet(1, Vec2::new(400.0, 300.0), 0.0);
        world.frame = 12;

        let snapshot = WorldSnapshot::capture(&world);

        assert_eq!(snapshot.frame, 12);
        assert_eq!(snapshot.asteroids.len(), 2);
        assert_eq!(snapshot.bullets[0].owner_id, 1);
        assert!(snapshot.ship(1).unwrap().is_respawning());
        assert!(snapshot.ship(2).is_none());
        assert_eq!(snapshot.nearest_asteroid(Vec2::new(400.0, 300.0)).map(|a| a.id), Some(8));
    }
}
