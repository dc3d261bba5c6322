//! Bullet firing with per-ship rate limiting and optional ammo caps

use crate::game::constants::ship::FIRE_PERIOD;
use crate::game::state::{EntityId, ShipId, World};
use crate::util::vec2::Vec2;

/// Projectile events for observers
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectileEvent {
    Fired {
        owner_id: ShipId,
        bullet_id: EntityId,
        position: Vec2,
        velocity: Vec2,
    },
}

/// Fire a bullet from a ship's nose if its rate limiter and ammo allow it.
///
/// Firing cancels any remaining respawn invulnerability.
pub fn fire(world: &mut World, ship_id: ShipId) -> Option<ProjectileEvent> {
    let ship = world.get_ship_mut(ship_id)?;
    if !ship.can_fire() {
        return None;
    }

    ship.fire_cooldown = FIRE_PERIOD;
    ship.respawn_timer = 0.0;
    if let Some(ammo) = ship.bullets_remaining.as_mut() {
        *ammo -= 1;
    }

    let (position, heading) = (ship.position, ship.angle);
    let bullet_id = world.add_bullet(ship_id, position, heading);
    let velocity = world.bullets.last().map(|b| b.velocity).unwrap_or_default();

    Some(ProjectileEvent::Fired {
        owner_id: ship_id,
        bullet_id,
        position,
        velocity,
    })
}
