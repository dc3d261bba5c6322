use rayon::prelude::*;

use crate::error::SimError;
use crate::game::constants::bullet::OFFSCREEN_MARGIN;
use crate::game::state::{normalize_heading, Asteroid, Bullet, GameMap, Ship, ShipId, World};

/// Clamp an actuator command into `range`.
///
/// Out-of-range values are clamped; NaN is rejected because no clamp can make it meaningful.
pub fn clamp_actuator(
    value: f32,
    range: (f32, f32),
    ship_id: ShipId,
    field: &'static str,
) -> Result<f32, SimError> {
    if value.is_nan() {
        return Err(SimError::InvalidCommand { ship_id, field });
    }
    Ok(value.clamp(range.0, range.1))
}

/// Copy controller commands into a live ship after clamping.
///
/// `None` keeps the ship's previous command value.
pub fn apply_commands(ship: &mut Ship, turn_rate: Option<f32>, thrust: Option<f32>) -> Result<(), SimError> {
    if let Some(turn_rate) = turn_rate {
        ship.turn_rate = clamp_actuator(turn_rate, ship.turn_rate_range, ship.id, "turn_rate")?;
    }
    if let Some(thrust) = thrust {
        ship.thrust = clamp_actuator(thrust, ship.thrust_range, ship.id, "thrust")?;
    }
    Ok(())
}

/// Advance a ship by `dt` seconds
pub fn integrate_ship(ship: &mut Ship, map: &GameMap, dt: f32) {
    ship.respawn_timer = (ship.respawn_timer - dt).max(0.0);
    ship.fire_cooldown = (ship.fire_cooldown - dt).max(0.0);

    // Drag opposes the sign of speed and never overshoots zero
    let drag = ship.drag * dt;
    if ship.speed > 0.0 {
        ship.speed = (ship.speed - drag).max(0.0);
    } else if ship.speed < 0.0 {
        ship.speed = (ship.speed + drag).min(0.0);
    }

    ship.speed = (ship.speed + ship.thrust * dt).clamp(-ship.max_speed, ship.max_speed);
    ship.angle = normalize_heading(ship.angle + ship.turn_rate * dt);

    ship.position = map.wrap(ship.position + ship.velocity() * dt);
}

/// Advance an asteroid by `dt` seconds
pub fn integrate_asteroid(asteroid: &mut Asteroid, map: &GameMap, dt: f32) {
    asteroid.angle = normalize_heading(asteroid.angle + asteroid.spin * dt);
    asteroid.position = map.wrap(asteroid.position + asteroid.velocity * dt);
}

/// Advance a bullet by `dt` seconds; returns false once it has left the inflated map
pub fn integrate_bullet(bullet: &mut Bullet, map: &GameMap, dt: f32) -> bool {
    bullet.position += bullet.velocity * dt;
    !map.is_outside(bullet.position, OFFSCREEN_MARGIN)
}

/// Update physics for all entities.
///
/// Asteroids and bullets are independent of each other and integrate in parallel;
/// population order is preserved.
pub fn update(world: &mut World, dt: f32) {
    let map = world.map;

    for ship in &mut world.ships {
        integrate_ship(ship, &map, dt);
    }

    world
        .asteroids
        .par_iter_mut()
        .for_each(|asteroid| integrate_asteroid(asteroid, &map, dt));

    let alive: Vec<bool> = world
        .bullets
        .par_iter_mut()
        .map(|bullet| integrate_bullet(bullet, &map, dt))
        .collect();

    // Remove off-screen bullets (sequential - modifies collection)
    let mut flags = alive.into_iter();
    world.bullets.retain(|_| flags.next().unwrap_or(false));
}
