/// Simulation timing constants
pub mod timing {
    /// Default simulation frequency in Hz
    pub const DEFAULT_FREQUENCY: u32 = 60;
    /// Default real-time multiplier (1 = wall-clock pacing, 0 = as fast as possible)
    pub const DEFAULT_REAL_TIME_MULTIPLIER: f32 = 1.0;
}

/// Map defaults
pub mod map {
    /// Default map width in world units
    pub const WIDTH: f32 = 800.0;
    /// Default map height in world units
    pub const HEIGHT: f32 = 600.0;
}

/// Ship constants
pub mod ship {
    /// Actuator range for thrust (units/s^2)
    pub const THRUST_RANGE: (f32, f32) = (-480.0, 480.0);
    /// Actuator range for turn rate (degrees/s)
    pub const TURN_RATE_RANGE: (f32, f32) = (-180.0, 180.0);
    /// Constant deceleration opposing speed (units/s^2)
    pub const DRAG: f32 = 80.0;
    /// Speed magnitude cap (units/s)
    pub const MAX_SPEED: f32 = 240.0;
    /// Invulnerability after spawning or respawning (seconds)
    pub const RESPAWN_TIME: f32 = 3.0;
    /// Minimum time between shots (seconds)
    pub const FIRE_PERIOD: f32 = 0.1;
    /// Default number of lives
    pub const DEFAULT_LIVES: u32 = 3;
    /// Collision radius
    pub const RADIUS: f32 = 20.0;
}

/// Asteroid constants
pub mod asteroid {
    /// Smallest asteroid size (never splits)
    pub const MIN_SIZE: u8 = 1;
    /// Largest asteroid size, also the default for random placement
    pub const MAX_SIZE: u8 = 4;
    /// Fragments spawned when an asteroid larger than MIN_SIZE is destroyed
    pub const FRAGMENTS: usize = 3;
    /// Base speed scale; max speed is BASE_SPEED * (2 + (4 - size) / 4)
    pub const BASE_SPEED: f32 = 60.0;
    /// Spin rates are drawn from [-MAX_SPIN / 2, MAX_SPIN / 2) degrees/s
    pub const MAX_SPIN: f32 = 120.0;
    /// Collision radius indexed by size (index 0 unused)
    pub const RADII: [f32; 5] = [0.0, 7.0, 11.0, 16.0, 34.0];
}

/// Bullet constants
pub mod bullet {
    /// Muzzle speed (units/s)
    pub const SPEED: f32 = 800.0;
    /// Collision radius
    pub const RADIUS: f32 = 4.0;
    /// Bullets are removed once this far outside the visible map
    pub const OFFSCREEN_MARGIN: f32 = 27.0;
}

/// Spatial grid constants
pub mod grid {
    /// Cell size for the asteroid broad phase; at least 2x the largest asteroid radius
    pub const CELL_SIZE: f32 = 72.0;
}

/// Maximum speed for a freshly spawned asteroid of the given size
pub fn asteroid_max_speed(size: u8) -> f32 {
    let scaler = 2.0 + (4.0 - size as f32) / 4.0;
    asteroid::BASE_SPEED * scaler
}

/// Collision radius for an asteroid of the given size
pub fn asteroid_radius(size: u8) -> f32 {
    asteroid::RADII
        .get(size as usize)
        .copied()
        .unwrap_or(asteroid::RADII[asteroid::MAX_SIZE as usize])
}

/// Total destruction events produced by destroying one asteroid of `size`
/// and letting every fragment cascade to extinction: 3^0 + 3^1 + ... + 3^(size-1)
pub fn cascade_count(size: u8) -> u64 {
    (0..size as u32).map(|k| 3u64.pow(k)).sum()
}
