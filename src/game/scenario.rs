//! Scenario definitions and world materialization
//!
//! A `Scenario` is validated once at construction and never changes afterwards.
//! Every run materializes a fresh `World` from it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimError;
use crate::game::constants::{asteroid, cascade_count};
use crate::game::state::{Asteroid, GameMap, Ship, World};
use crate::util::vec2::Vec2;

/// Initial state for one asteroid; unset fields are randomized
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsteroidState {
    pub position: Option<Vec2>,
    pub speed: Option<f32>,
    pub angle: Option<f32>,
    pub size: Option<u8>,
}

impl AsteroidState {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Some(Vec2::new(x, y)),
            ..Default::default()
        }
    }

    pub fn with_size(mut self, size: u8) -> Self {
        self.size = Some(size);
        self
    }

    /// Fix speed and heading so nothing about the asteroid is random except spin
    pub fn with_motion(mut self, speed: f32, angle: f32) -> Self {
        self.speed = Some(speed);
        self.angle = Some(angle);
        self
    }
}

/// Initial state for one ship
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipState {
    /// Defaults to the map center
    pub position: Option<Vec2>,
    pub angle: f32,
    /// Defaults to the configured lives
    pub lives: Option<u32>,
    pub team: Option<String>,
    /// Overrides the initial invulnerability window
    pub respawn_timer: Option<f32>,
    pub bullets_remaining: Option<u32>,
}

impl ShipState {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Some(Vec2::new(x, y)),
            ..Default::default()
        }
    }
}

/// How the starting asteroid population is described
#[derive(Debug, Clone, PartialEq)]
pub enum AsteroidSource {
    /// Fully random asteroids
    Random(usize),
    /// Explicit per-asteroid states
    Explicit(Vec<AsteroidState>),
}

impl AsteroidSource {
    pub fn len(&self) -> usize {
        match self {
            AsteroidSource::Random(n) => *n,
            AsteroidSource::Explicit(states) => states.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Validated, immutable scenario
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    name: String,
    asteroids: AsteroidSource,
    ships: Vec<ShipState>,
    seed: Option<u64>,
    time_limit: Option<f32>,
    map: GameMap,
}

impl Scenario {
    pub fn builder(name: impl Into<String>) -> ScenarioBuilder {
        ScenarioBuilder::new(name)
    }

    /// Parse and validate a scenario from its JSON description
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let description: ScenarioDescription =
            serde_json::from_str(json).map_err(|e| SimError::config(format!("invalid scenario JSON: {}", e)))?;
        Self::try_from(description)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn asteroids(&self) -> &AsteroidSource {
        &self.asteroids
    }

    pub fn ships(&self) -> &[ShipState] {
        &self.ships
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// None means unbounded
    pub fn time_limit(&self) -> Option<f32> {
        self.time_limit
    }

    pub fn map(&self) -> GameMap {
        self.map
    }

    /// Whether any asteroid property is left to the random generator
    pub fn is_random(&self) -> bool {
        match &self.asteroids {
            AsteroidSource::Random(_) => true,
            AsteroidSource::Explicit(states) => states
                .iter()
                .any(|s| s.position.is_none() || s.speed.is_none() || s.angle.is_none()),
        }
    }

    /// Build a fresh world for one run.
    ///
    /// A set seed reseeds the generator before any placement; the world keeps
    /// the generator for fragment randomization.
    pub fn materialize(&self, default_lives: u32) -> World {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut world = World::new(self.map, rng);

        let states: Vec<AsteroidState> = match &self.asteroids {
            AsteroidSource::Random(n) => vec![AsteroidState::default(); *n],
            AsteroidSource::Explicit(states) => states.clone(),
        };

        for state in &states {
            let position = state.position.unwrap_or_else(|| {
                Vec2::new(
                    world.rng.gen_range(0.0..self.map.width),
                    world.rng.gen_range(0.0..self.map.height),
                )
            });
            let size = state.size.unwrap_or(asteroid::MAX_SIZE);
            let id = world.alloc_entity_id();
            let a = Asteroid::new(id, self.map.wrap(position), size, state.speed, state.angle, &mut world.rng);
            world.add_asteroid(a);
        }

        if self.ships.is_empty() {
            world.add_ship(Ship::new(1, self.map.center(), 0.0, default_lives));
        } else {
            for (i, state) in self.ships.iter().enumerate() {
                let position = self.map.wrap(state.position.unwrap_or_else(|| self.map.center()));
                let mut s = Ship::new(i as u32 + 1, position, state.angle, state.lives.unwrap_or(default_lives));
                s.team = state.team.clone();
                s.bullets_remaining = state.bullets_remaining;
                if let Some(timer) = state.respawn_timer {
                    s.respawn_timer = timer.max(0.0);
                }
                world.add_ship(s);
            }
        }

        debug!(
            "Materialized scenario '{}': {} asteroids, {} ships",
            self.name,
            world.asteroids.len(),
            world.ships.len()
        );
        world
    }
}

/// Cascade total of a starting population, used to normalize the score
pub fn max_asteroids(asteroids: &[Asteroid]) -> u64 {
    asteroids.iter().map(|a| cascade_count(a.size)).sum()
}

/// Builder that validates everything at `build()`
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    name: String,
    num_asteroids: Option<usize>,
    asteroid_states: Option<Vec<AsteroidState>>,
    ships: Vec<ShipState>,
    seed: Option<u64>,
    time_limit: Option<f32>,
    map: GameMap,
}

impl ScenarioBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            num_asteroids: None,
            asteroid_states: None,
            ships: Vec::new(),
            seed: None,
            time_limit: None,
            map: GameMap::default(),
        }
    }

    pub fn num_asteroids(mut self, n: usize) -> Self {
        self.num_asteroids = Some(n);
        self
    }

    pub fn asteroid_states(mut self, states: Vec<AsteroidState>) -> Self {
        self.asteroid_states = Some(states);
        self
    }

    pub fn ship(mut self, state: ShipState) -> Self {
        self.ships.push(state);
        self
    }

    pub fn ships(mut self, states: Vec<ShipState>) -> Self {
        self.ships = states;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Seconds of simulated time; 0 means unbounded
    pub fn time_limit(mut self, seconds: f32) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    pub fn map(mut self, width: f32, height: f32) -> Self {
        self.map = GameMap::new(width, height);
        self
    }

    pub fn build(self) -> Result<Scenario, SimError> {
        let num_asteroids = self.num_asteroids.filter(|&n| n > 0);
        let asteroid_states = self.asteroid_states.filter(|s| !s.is_empty());

        let asteroids = match (num_asteroids, asteroid_states) {
            (Some(_), Some(_)) => {
                return Err(SimError::config(format!(
                    "scenario '{}' sets both num_asteroids and asteroid_states",
                    self.name
                )));
            }
            (None, None) => {
                return Err(SimError::config(format!(
                    "scenario '{}' needs num_asteroids or asteroid_states",
                    self.name
                )));
            }
            (Some(n), None) => AsteroidSource::Random(n),
            (None, Some(states)) => {
                for (i, state) in states.iter().enumerate() {
                    validate_asteroid(i, state)?;
                }
                AsteroidSource::Explicit(states)
            }
        };

        if !(self.map.width.is_finite() && self.map.height.is_finite())
            || self.map.width <= 0.0
            || self.map.height <= 0.0
        {
            return Err(SimError::config(format!(
                "map dimensions must be positive, got {}x{}",
                self.map.width, self.map.height
            )));
        }

        let time_limit = match self.time_limit {
            Some(t) if t.is_nan() || t < 0.0 => {
                return Err(SimError::config(format!("time limit must be >= 0, got {}", t)));
            }
            Some(t) if t == 0.0 || t.is_infinite() => None,
            other => other,
        };

        for (i, state) in self.ships.iter().enumerate() {
            if state.lives == Some(0) {
                return Err(SimError::config(format!("ship {} starts with zero lives", i + 1)));
            }
            if !state.angle.is_finite() || state.position.is_some_and(|p| !p.is_finite()) {
                return Err(SimError::config(format!("ship {} has a non-finite initial state", i + 1)));
            }
        }

        Ok(Scenario {
            name: self.name,
            asteroids,
            ships: self.ships,
            seed: self.seed,
            time_limit,
            map: self.map,
        })
    }
}

fn validate_asteroid(index: usize, state: &AsteroidState) -> Result<(), SimError> {
    if let Some(size) = state.size {
        if !(asteroid::MIN_SIZE..=asteroid::MAX_SIZE).contains(&size) {
            return Err(SimError::config(format!(
                "asteroid {} has size {}, expected {}..={}",
                index,
                size,
                asteroid::MIN_SIZE,
                asteroid::MAX_SIZE
            )));
        }
    }

    let finite = state.position.map_or(true, |p| p.is_finite())
        && state.speed.map_or(true, f32::is_finite)
        && state.angle.map_or(true, f32::is_finite);
    if !finite {
        return Err(SimError::config(format!("asteroid {} has a non-finite initial state", index)));
    }
    Ok(())
}

/// Serializable scenario description, validated on conversion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioDescription {
    pub name: String,
    pub num_asteroids: Option<usize>,
    pub asteroid_states: Option<Vec<AsteroidState>>,
    pub ships: Vec<ShipState>,
    pub seed: Option<u64>,
    pub time_limit: Option<f32>,
    pub map: Option<GameMap>,
}

impl TryFrom<ScenarioDescription> for Scenario {
    type Error = SimError;

    fn try_from(d: ScenarioDescription) -> Result<Self, Self::Error> {
        let name = if d.name.is_empty() { "Unnamed".to_string() } else { d.name };
        let mut builder = ScenarioBuilder::new(name).ships(d.ships);
        if let Some(n) = d.num_asteroids {
            builder = builder.num_asteroids(n);
        }
        if let Some(states) = d.asteroid_states {
            builder = builder.asteroid_states(states);
        }
        if let Some(seed) = d.seed {
            builder = builder.seed(seed);
        }
        if let Some(t) = d.time_limit {
            builder = builder.time_limit(t);
        }
        if let Some(map) = d.map {
            builder = builder.map(map.width, map.height);
        }
        builder.build()
    }
}

/// Parse a JSON array of scenario descriptions
pub fn load_portfolio(json: &str) -> Result<Vec<Scenario>, SimError> {
    let descriptions: Vec<ScenarioDescription> =
        serde_json::from_str(json).map_err(|e| SimError::config(format!("invalid portfolio JSON: {}", e)))?;
    descriptions.into_iter().map(Scenario::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::ship;

    #[test]
    fn test_both_asteroid_specs_rejected() {
        let result = Scenario::builder("both")
            .num_asteroids(2)
            .asteroid_states(vec![AsteroidState::at(10.0, 10.0)])
            .build();
        assert!(matches!(result, Err(SimError::Configuration(_))));
    }

    #[test]
    fn test_no_asteroid_spec_rejected() {
        assert!(matches!(Scenario::builder("none").build(), Err(SimError::Configuration(_))));
        assert!(matches!(
            Scenario::builder("zero").num_asteroids(0).build(),
            Err(SimError::Configuration(_))
        ));
    }

    #[test]
    fn test_bad_size_rejected() {
        for size in [0, 5, 200] {
            let result = Scenario::builder("bad")
                .asteroid_states(vec![AsteroidState::at(10.0, 10.0).with_size(size)])
                .build();
            assert!(matches!(result, Err(SimError::Configuration(_))), "size {}", size);
        }
    }

    #[test]
    fn test_time_limit_zero_is_unbounded() {
        let scenario = Scenario::builder("t").num_asteroids(1).time_limit(0.0).build().unwrap();
        assert_eq!(scenario.time_limit(), None);

        let result = Scenario::builder("t").num_asteroids(1).time_limit(-1.0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_map_rejected() {
        let result = Scenario::builder("m").num_asteroids(1).map(0.0, 600.0).build();
        assert!(matches!(result, Err(SimError::Configuration(_))));
    }

    #[test]
    fn test_empty_ship_list_spawns_center_ship() {
        let scenario = Scenario::builder("default").num_asteroids(1).seed(1).build().unwrap();
        let world = scenario.materialize(ship::DEFAULT_LIVES);

        assert_eq!(world.ships.len(), 1);
        assert_eq!(world.ships[0].id, 1);
        assert_eq!(world.ships[0].position, world.map.center());
        assert_eq!(world.ships[0].lives, ship::DEFAULT_LIVES);
    }

    #[test]
    fn test_ship_ids_are_one_based() {
        let scenario = Scenario::builder("ships")
            .num_asteroids(1)
            .ship(ShipState::at(100.0, 100.0))
            .ship(ShipState {
                lives: Some(5),
                team: Some("red".into()),
                respawn_timer: Some(0.0),
                ..ShipState::at(200.0, 200.0)
            })
            .build()
            .unwrap();
        let world = scenario.materialize(3);

        let ids: Vec<u32> = world.ships.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(world.ships[0].lives, 3);
        assert!(world.ships[0].is_respawning());
        assert_eq!(world.ships[1].lives, 5);
        assert_eq!(world.ships[1].team.as_deref(), Some("red"));
        assert!(!world.ships[1].is_respawning());
    }

    #[test]
    fn test_seeded_materialize_reproducible() {
        let scenario = Scenario::builder("seeded").num_asteroids(8).seed(42).build().unwrap();
        let a = scenario.materialize(3);
        let b = scenario.materialize(3);

        for (x, y) in a.asteroids.iter().zip(&b.asteroids) {
            assert_eq!(x.position, y.position);
            assert_eq!(x.velocity, y.velocity);
            assert_eq!(x.spin, y.spin);
        }
        assert!(scenario.is_random());
    }

    #[test]
    fn test_random_asteroids_in_bounds() {
        let scenario = Scenario::builder("r").num_asteroids(50).seed(9).build().unwrap();
        let world = scenario.materialize(3);

        assert_eq!(world.asteroids.len(), 50);
        for a in &world.asteroids {
            assert_eq!(a.size, asteroid::MAX_SIZE);
            assert!(a.position.x >= 0.0 && a.position.x < world.map.width);
            assert!(a.position.y >= 0.0 && a.position.y < world.map.height);
        }
    }

    #[test]
    fn test_explicit_asteroid_fields() {
        let scenario = Scenario::builder("e")
            .asteroid_states(vec![AsteroidState::at(50.0, 60.0).with_size(2).with_motion(0.0, 0.0)])
            .build()
            .unwrap();
        assert!(!scenario.is_random());

        let world = scenario.materialize(3);
        let a = &world.asteroids[0];
        assert_eq!(a.position, Vec2::new(50.0, 60.0));
        assert_eq!(a.size, 2);
        assert_eq!(a.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_max_asteroids() {
        let scenario = Scenario::builder("max")
            .asteroid_states(vec![
                AsteroidState::at(10.0, 10.0),
                AsteroidState::at(20.0, 20.0).with_size(2),
            ])
            .seed(0)
            .build()
            .unwrap();
        let world = scenario.materialize(3);
        assert_eq!(max_asteroids(&world.asteroids), 40 + 4);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "name": "json",
            "asteroid_states": [{"position": {"x": 100.0, "y": 120.0}, "size": 3}],
            "ships": [{"position": {"x": 400.0, "y": 300.0}, "angle": 90.0}],
            "seed": 7,
            "time_limit": 10.0,
            "map": {"width": 1000.0, "height": 800.0}
        }"#;
        let scenario = Scenario::from_json(json).unwrap();
        assert_eq!(scenario.name(), "json");
        assert_eq!(scenario.seed(), Some(7));
        assert_eq!(scenario.time_limit(), Some(10.0));
        assert_eq!(scenario.map(), GameMap::new(1000.0, 800.0));
        assert_eq!(scenario.ships()[0].angle, 90.0);
    }

    #[test]
    fn test_from_json_validates() {
        let json = r#"{"name": "bad", "num_asteroids": 3, "asteroid_states": [{}]}"#;
        assert!(matches!(Scenario::from_json(json), Err(SimError::Configuration(_))));
        assert!(matches!(Scenario::from_json("not json"), Err(SimError::Configuration(_))));
    }

    #[test]
    fn test_load_portfolio() {
        let json = r#"[{"name": "a", "num_asteroids": 2}, {"name": "b", "num_asteroids": 5, "seed": 3}]"#;
        let portfolio = load_portfolio(json).unwrap();
        assert_eq!(portfolio.len(), 2);
        assert_eq!(portfolio[1].asteroids().len(), 5);
    }
}
