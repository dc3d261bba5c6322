//! Collision detection and asteroid splitting
//!
//! Resolution order per tick is fixed: bullet-asteroid, ship-asteroid, ship-ship.
//! Fragments spawned in a pass only become collidable in the next pass.

use bitvec::prelude::*;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::SimError;
use crate::game::constants::asteroid::{FRAGMENTS, MAX_SIZE, MIN_SIZE};
use crate::game::score::{Destruction, Score};
use crate::game::spatial::{circles_overlap, AsteroidGrid};
use crate::game::state::{Asteroid, EntityId, ShipId, World};
use crate::util::vec2::Vec2;

/// Collision events for observers
#[derive(Debug, Clone, PartialEq)]
pub enum CollisionEvent {
    AsteroidDestroyed {
        asteroid_id: EntityId,
        size: u8,
        position: Vec2,
        cause: Destruction,
        fragments: usize,
    },
    ShipDestroyed {
        ship_id: ShipId,
        lives_remaining: u32,
        /// True when the ship was out of lives and left the simulation
        removed: bool,
    },
}

/// Run every collision pass for this tick
pub fn update(world: &mut World, score: &mut Score) -> Result<Vec<CollisionEvent>, SimError> {
    let mut events = Vec::new();
    let mut grid = AsteroidGrid::build(&world.asteroids);

    bullet_asteroid(world, &grid, score, &mut events)?;

    grid.rebuild(&world.asteroids);
    ship_asteroid(world, &grid, score, &mut events)?;

    ship_ship(world, score, &mut events);

    Ok(events)
}

/// Bullets destroy at most one asteroid each; first overlap in population order wins
fn bullet_asteroid(
    world: &mut World,
    grid: &AsteroidGrid,
    score: &mut Score,
    events: &mut Vec<CollisionEvent>,
) -> Result<(), SimError> {
    if world.bullets.is_empty() || world.asteroids.is_empty() {
        return Ok(());
    }

    let mut destroyed = bitvec![0; world.asteroids.len()];
    let mut spent = bitvec![0; world.bullets.len()];
    let mut hits: Vec<(usize, Destruction)> = Vec::new();

    for (bullet_index, bullet) in world.bullets.iter().enumerate() {
        let target = grid
            .query(bullet.position, bullet.radius())
            .into_iter()
            .find(|&i| {
                let a = &world.asteroids[i];
                !destroyed[i] && circles_overlap(bullet.position, bullet.radius(), a.position, a.radius())
            });

        if let Some(i) = target {
            destroyed.set(i, true);
            spent.set(bullet_index, true);
            hits.push((i, Destruction::Bullet(bullet.owner_id)));
        }
    }

    let mut index = 0;
    world.bullets.retain(|_| {
        let keep = !spent[index];
        index += 1;
        keep
    });

    destroy_batch(world, hits, score, events)
}

/// Vulnerable ships lose a life on contact and destroy the first asteroid they touch
fn ship_asteroid(
    world: &mut World,
    grid: &AsteroidGrid,
    score: &mut Score,
    events: &mut Vec<CollisionEvent>,
) -> Result<(), SimError> {
    if world.asteroids.is_empty() {
        return Ok(());
    }

    let mut destroyed = bitvec![0; world.asteroids.len()];
    let mut hits: Vec<(usize, Destruction)> = Vec::new();
    let mut crashed: SmallVec<[usize; 8]> = SmallVec::new();

    for (ship_index, ship) in world.ships.iter().enumerate() {
        if ship.is_respawning() {
            continue;
        }

        let touching: SmallVec<[usize; 4]> = grid
            .query(ship.position, ship.radius())
            .into_iter()
            .filter(|&i| {
                let a = &world.asteroids[i];
                circles_overlap(ship.position, ship.radius(), a.position, a.radius())
            })
            .collect();
        if touching.is_empty() {
            continue;
        }

        // Contact always costs a life; an asteroid already claimed this pass is not split twice
        crashed.push(ship_index);
        if let Some(&i) = touching.iter().find(|&&i| !destroyed[i]) {
            destroyed.set(i, true);
            hits.push((i, Destruction::Collision(ship.id)));
        }
    }

    lose_lives(world, &crashed, score, events);
    destroy_batch(world, hits, score, events)
}

/// Every vulnerable ship overlapping another vulnerable ship loses one life, simultaneously
fn ship_ship(world: &mut World, score: &mut Score, events: &mut Vec<CollisionEvent>) {
    let mut hit = bitvec![0; world.ships.len()];

    for i in 0..world.ships.len() {
        let a = &world.ships[i];
        if a.is_respawning() {
            continue;
        }
        for j in (i + 1)..world.ships.len() {
            let b = &world.ships[j];
            if b.is_respawning() {
                continue;
            }
            if circles_overlap(a.position, a.radius(), b.position, b.radius()) {
                hit.set(i, true);
                hit.set(j, true);
            }
        }
    }

    let crashed: SmallVec<[usize; 8]> = hit.iter_ones().collect();
    lose_lives(world, &crashed, score, events);
}

/// Decrement lives for the ships at `indices`; respawn or remove each one
fn lose_lives(world: &mut World, indices: &[usize], score: &mut Score, events: &mut Vec<CollisionEvent>) {
    if indices.is_empty() {
        return;
    }

    for &i in indices {
        let ship = &mut world.ships[i];
        ship.lives = ship.lives.saturating_sub(1);
        score.record_death(ship.id, ship.lives);

        let removed = ship.lives == 0;
        if !removed {
            ship.respawn();
        }
        debug!("Ship {} destroyed, {} lives remaining", ship.id, ship.lives);

        events.push(CollisionEvent::ShipDestroyed {
            ship_id: ship.id,
            lives_remaining: ship.lives,
            removed,
        });
    }

    world.ships.retain(|s| s.lives > 0);
}

/// Fragments for a destroyed asteroid: three of the next size down, none for size 1
pub fn split(world: &mut World, parent: &Asteroid) -> Result<Vec<Asteroid>, SimError> {
    if !(MIN_SIZE..=MAX_SIZE).contains(&parent.size) {
        return Err(SimError::invariant(format!(
            "asteroid {} has illegal size {}",
            parent.id, parent.size
        )));
    }

    if parent.size == MIN_SIZE {
        return Ok(Vec::new());
    }

    let mut fragments = Vec::with_capacity(FRAGMENTS);
    for _ in 0..FRAGMENTS {
        let id = world.alloc_entity_id();
        fragments.push(Asteroid::new(id, parent.position, parent.size - 1, None, None, &mut world.rng));
    }
    Ok(fragments)
}

/// Destroy the asteroid at `index`, spawning its fragments at the end of the population
pub fn destroy_asteroid(
    world: &mut World,
    index: usize,
    cause: Destruction,
    score: &mut Score,
) -> Result<CollisionEvent, SimError> {
    if index >= world.asteroids.len() {
        return Err(SimError::invariant(format!("asteroid index {} out of range", index)));
    }

    let mut events = Vec::with_capacity(1);
    destroy_batch(world, vec![(index, cause)], score, &mut events)?;
    events
        .pop()
        .ok_or_else(|| SimError::invariant("asteroid destruction produced no event"))
}

/// Destroy asteroids at unique indices; parents are removed, fragments appended in parent order
fn destroy_batch(
    world: &mut World,
    mut hits: Vec<(usize, Destruction)>,
    score: &mut Score,
    events: &mut Vec<CollisionEvent>,
) -> Result<(), SimError> {
    if hits.is_empty() {
        return Ok(());
    }

    hits.sort_by_key(|(index, _)| *index);
    let mut remove = bitvec![0; world.asteroids.len()];
    let mut spawned = Vec::with_capacity(hits.len() * FRAGMENTS);

    for (index, cause) in hits {
        let parent = world.asteroids[index].clone();
        let fragments = split(world, &parent)?;
        score.record_asteroid_destroyed(cause);

        events.push(CollisionEvent::AsteroidDestroyed {
            asteroid_id: parent.id,
            size: parent.size,
            position: parent.position,
            cause,
            fragments: fragments.len(),
        });

        remove.set(index, true);
        spawned.extend(fragments);
    }

    let mut index = 0;
    world.asteroids.retain(|_| {
        let keep = !remove[index];
        index += 1;
        keep
    });
    world.asteroids.extend(spawned);
    Ok(())
}
