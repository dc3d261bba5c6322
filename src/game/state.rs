//! World state definitions
//!
//! Contains all entities (ships, asteroids, bullets) and the toroidal map.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::constants::{self, asteroid, bullet, map, ship};
use crate::game::stopping::StoppingCondition;
use crate::util::vec2::Vec2;

/// Stable ship identifier (1-based position in the scenario's ship list)
pub type ShipId = u32;

/// Identifier for asteroids and bullets
pub type EntityId = u64;

/// Toroidal map dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameMap {
    pub width: f32,
    pub height: f32,
}

impl GameMap {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn wrap(&self, position: Vec2) -> Vec2 {
        position.wrap(self.width, self.height)
    }

    /// Whether a point lies beyond the map inflated by `margin` on every side
    pub fn is_outside(&self, position: Vec2, margin: f32) -> bool {
        position.x < -margin
            || position.x > self.width + margin
            || position.y < -margin
            || position.y > self.height + margin
    }
}

impl Default for GameMap {
    fn default() -> Self {
        Self::new(map::WIDTH, map::HEIGHT)
    }
}

/// Ship state
#[derive(Debug, Clone, Serialize)]
pub struct Ship {
    pub id: ShipId,
    pub team: Option<String>,
    pub position: Vec2,
    /// Signed scalar speed along the heading
    pub speed: f32,
    /// Heading in degrees, normalized to (-180, 180]
    pub angle: f32,
    /// Applied thrust command (already clamped)
    pub thrust: f32,
    /// Applied turn rate command (already clamped)
    pub turn_rate: f32,
    pub drag: f32,
    pub max_speed: f32,
    pub thrust_range: (f32, f32),
    pub turn_rate_range: (f32, f32),
    pub lives: u32,
    /// Remaining invulnerability (seconds); > 0 means the ship cannot collide
    pub respawn_timer: f32,
    /// Seconds until the next shot is allowed
    pub fire_cooldown: f32,
    /// Ammo cap, None for unlimited
    pub bullets_remaining: Option<u32>,
    pub spawn_position: Vec2,
    pub spawn_angle: f32,
}

impl Ship {
    pub fn new(id: ShipId, position: Vec2, angle: f32, lives: u32) -> Self {
        Self {
            id,
            team: None,
            position,
            speed: 0.0,
            angle: normalize_heading(angle),
            thrust: 0.0,
            turn_rate: 0.0,
            drag: ship::DRAG,
            max_speed: ship::MAX_SPEED,
            thrust_range: ship::THRUST_RANGE,
            turn_rate_range: ship::TURN_RATE_RANGE,
            lives,
            respawn_timer: ship::RESPAWN_TIME,
            fire_cooldown: 0.0,
            bullets_remaining: None,
            spawn_position: position,
            spawn_angle: normalize_heading(angle),
        }
    }

    /// Velocity derived from heading and speed
    pub fn velocity(&self) -> Vec2 {
        Vec2::from_heading(self.angle) * self.speed
    }

    pub fn radius(&self) -> f32 {
        ship::RADIUS
    }

    pub fn is_respawning(&self) -> bool {
        self.respawn_timer > 0.0
    }

    pub fn can_fire(&self) -> bool {
        self.fire_cooldown <= 0.0 && self.bullets_remaining != Some(0)
    }

    /// Return to the spawn point with full invulnerability
    pub fn respawn(&mut self) {
        self.respawn_timer = ship::RESPAWN_TIME;
        self.position = self.spawn_position;
        self.angle = self.spawn_angle;
        self.speed = 0.0;
    }
}

/// Asteroid state
#[derive(Debug, Clone, Serialize)]
pub struct Asteroid {
    pub id: EntityId,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Rotation in degrees, normalized to (-180, 180]
    pub angle: f32,
    /// Spin rate in degrees/s
    pub spin: f32,
    pub size: u8,
}

impl Asteroid {
    /// Build an asteroid, drawing any unspecified speed/heading from `rng`
    pub fn new(
        id: EntityId,
        position: Vec2,
        size: u8,
        speed: Option<f32>,
        heading: Option<f32>,
        rng: &mut StdRng,
    ) -> Self {
        let max_speed = constants::asteroid_max_speed(size);
        let heading = heading.unwrap_or_else(|| rng.gen_range(-180.0..180.0));
        let speed = speed.unwrap_or_else(|| rng.gen_range(-max_speed / 2.0..max_speed / 2.0));
        let spin = rng.gen_range(-asteroid::MAX_SPIN / 2.0..asteroid::MAX_SPIN / 2.0);

        Self {
            id,
            position,
            velocity: Vec2::from_heading(heading) * speed,
            angle: 0.0,
            spin,
            size,
        }
    }

    pub fn radius(&self) -> f32 {
        constants::asteroid_radius(self.size)
    }
}

/// Bullet state
#[derive(Debug, Clone, Serialize)]
pub struct Bullet {
    pub id: EntityId,
    pub owner_id: ShipId,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Direction of travel in degrees
    pub angle: f32,
}

impl Bullet {
    pub fn new(id: EntityId, owner_id: ShipId, position: Vec2, heading: f32) -> Self {
        let velocity = Vec2::from_heading(heading) * bullet::SPEED;
        Self {
            id,
            owner_id,
            position,
            velocity,
            angle: velocity.direction_degrees(),
        }
    }

    pub fn radius(&self) -> f32 {
        bullet::RADIUS
    }
}

/// Complete simulation world for one run
#[derive(Debug, Clone)]
pub struct World {
    pub map: GameMap,
    pub ships: Vec<Ship>,
    pub asteroids: Vec<Asteroid>,
    pub bullets: Vec<Bullet>,
    /// Frames executed while running
    pub frame: u64,
    /// Simulated seconds elapsed
    pub time: f32,
    pub stopping_condition: StoppingCondition,
    /// Generator used for fragment velocities; seeded from the scenario
    pub rng: StdRng,
    next_entity_id: EntityId,
}

impl World {
    pub fn new(map: GameMap, rng: StdRng) -> Self {
        Self {
            map,
            ships: Vec::new(),
            asteroids: Vec::new(),
            bullets: Vec::new(),
            frame: 0,
            time: 0.0,
            stopping_condition: StoppingCondition::Running,
            rng,
            next_entity_id: 1,
        }
    }

    /// Allocate a new unique entity ID
    pub fn alloc_entity_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    pub fn get_ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships.iter().find(|s| s.id == id)
    }

    pub fn get_ship_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        self.ships.iter_mut().find(|s| s.id == id)
    }

    pub fn add_ship(&mut self, ship: Ship) {
        self.ships.push(ship);
    }

    pub fn add_asteroid(&mut self, asteroid: Asteroid) {
        self.asteroids.push(asteroid);
    }

    /// Spawn a bullet for `owner_id` and return its ID
    pub fn add_bullet(&mut self, owner_id: ShipId, position: Vec2, heading: f32) -> EntityId {
        let id = self.alloc_entity_id();
        self.bullets.push(Bullet::new(id, owner_id, position, heading));
        id
    }

    /// Total entity count (for performance monitoring)
    pub fn entity_count(&self) -> usize {
        self.ships.len() + self.asteroids.len() + self.bullets.len()
    }
}

/// Normalize a heading into (-180, 180]
pub fn normalize_heading(degrees: f32) -> f32 {
    let wrapped = (degrees + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_normalize_heading_range() {
        for raw in [-721.0, -540.0, -180.0, -179.5, 0.0, 179.0, 180.0, 181.0, 360.0, 900.0] {
            let h = normalize_heading(raw);
            assert!(h > -180.0 && h <= 180.0, "{} -> {}", raw, h);
        }
        assert_eq!(normalize_heading(-180.0), 180.0);
        assert_eq!(normalize_heading(190.0), -170.0);
        assert_eq!(normalize_heading(45.0), 45.0);
    }

    #[test]
    fn test_ship_starts_invulnerable() {
        let ship = Ship::new(1, Vec2::new(400.0, 300.0), 0.0, 3);
        assert!(ship.is_respawning());
        assert!(ship.can_fire());
        assert_eq!(ship.spawn_position, Vec2::new(400.0, 300.0));
    }

    #[test]
    fn test_ship_respawn_resets_kinematics() {
        let mut ship = Ship::new(1, Vec2::new(400.0, 300.0), 30.0, 3);
        ship.position = Vec2::new(10.0, 10.0);
        ship.speed = 100.0;
        ship.angle = -90.0;
        ship.respawn_timer = 0.0;

        ship.respawn();

        assert_eq!(ship.position, Vec2::new(400.0, 300.0));
        assert_eq!(ship.angle, 30.0);
        assert_eq!(ship.speed, 0.0);
        assert_eq!(ship.respawn_timer, ship::RESPAWN_TIME);
    }

    #[test]
    fn test_ammo_cap_blocks_firing() {
        let mut ship = Ship::new(1, Vec2::ZERO, 0.0, 3);
        ship.bullets_remaining = Some(0);
        assert!(!ship.can_fire());
    }

    #[test]
    fn test_asteroid_respects_explicit_fields() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = Asteroid::new(1, Vec2::new(5.0, 5.0), 2, Some(10.0), Some(0.0), &mut rng);
        assert!(a.velocity.approx_eq(Vec2::new(0.0, 10.0), 1e-4));
        assert!(a.spin.abs() <= asteroid::MAX_SPIN / 2.0);
    }

    #[test]
    fn test_random_asteroid_speed_within_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let a = Asteroid::new(1, Vec2::ZERO, 3, None, None, &mut rng);
            assert!(a.velocity.length() <= constants::asteroid_max_speed(3) / 2.0 + 1e-3);
        }
    }

    #[test]
    fn test_bullet_velocity_follows_heading() {
        let b = Bullet::new(1, 1, Vec2::ZERO, 0.0);
        assert!(b.velocity.approx_eq(Vec2::new(0.0, bullet::SPEED), 1e-3));
        assert!((b.angle - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_map_wrap_keeps_positions_on_map() {
        let map = GameMap::default();
        let p = map.wrap(Vec2::new(-1e-6, 10.0));
        assert!(p.x >= 0.0 && p.x < map.width);
        assert_eq!(map.wrap(Vec2::new(map.width + 1.0, 10.0)).x, 1.0);
    }

    #[test]
    fn test_map_outside() {
        let map = GameMap::default();
        assert!(!map.is_outside(Vec2::new(-10.0, 10.0), 27.0));
        assert!(map.is_outside(Vec2::new(-30.0, 10.0), 27.0));
        assert!(map.is_outside(Vec2::new(10.0, map.height + 28.0), 27.0));
    }

    #[test]
    fn test_entity_ids_unique() {
        let mut world = World::new(GameMap::default(), StdRng::seed_from_u64(0));
        let a = world.alloc_entity_id();
        let b = world.add_bullet(1, Vec2::ZERO, 0.0);
        assert_ne!(a, b);
        assert_eq!(world.bullets.len(), 1);
    }
}
