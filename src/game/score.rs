//! Score accumulation and final rankings
//!
//! Counters only ever grow while the run is `Running`. Ratios are derived at
//! read time; a zero denominator yields 0.0.

use serde::Serialize;
use std::time::Duration;

use crate::game::performance::EvaluationStats;
use crate::game::state::{Ship, ShipId, World};
use crate::game::stopping::StoppingCondition;

/// What destroyed an asteroid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destruction {
    /// Hit by a bullet fired by this ship
    Bullet(ShipId),
    /// Rammed by this ship (costs the ship a life)
    Collision(ShipId),
}

/// Per-ship statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShipStats {
    pub ship_id: ShipId,
    pub team: Option<String>,
    pub bullets_fired: u64,
    pub bullets_hit: u64,
    pub asteroids_hit: u64,
    pub deaths: u32,
    pub distance_travelled: f32,
    pub lives_remaining: u32,
    pub survived: bool,
}

impl ShipStats {
    fn new(ship: &Ship) -> Self {
        Self {
            ship_id: ship.id,
            team: ship.team.clone(),
            lives_remaining: ship.lives,
            survived: true,
            ..Default::default()
        }
    }

    pub fn accuracy(&self) -> f32 {
        ratio(self.bullets_hit, self.bullets_fired)
    }
}

/// Optional per-tick history of selected metrics
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScoreHistory {
    /// Simulated time of each death
    pub death_times: Vec<f32>,
    pub accuracy_over_time: Vec<f32>,
    pub asteroids_over_time: Vec<u64>,
    #[serde(skip)]
    last_deaths: u32,
}

/// Ranking entry in the final results
#[derive(Debug, Clone, Serialize)]
pub struct ShipRanking {
    pub ship_id: ShipId,
    pub team: Option<String>,
    pub rank: u32,
    pub asteroids_hit: u64,
    pub accuracy: f32,
    pub deaths: u32,
    pub survived: bool,
}

/// Run score; one instance per run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Score {
    /// Every asteroid destruction (bullets and collisions)
    pub asteroids_hit: u64,
    /// Destructions caused by bullets
    pub bullets_hit: u64,
    pub bullets_fired: u64,
    pub deaths: u32,
    /// Per-tick speed integral of every non-respawning ship
    pub distance_travelled: f32,
    /// Distance the same ships would have covered at max speed
    pub max_distance: f32,
    /// Cascade total of the starting asteroid population
    pub max_asteroids: u64,
    pub frame_count: u64,
    pub time: f32,
    pub controller_timeouts: u64,
    pub controller_faults: u64,
    /// Duration of the most recent controller evaluation
    pub last_evaluation_time: Duration,
    /// Evaluation durations, recorded when cost tracking is enabled
    pub evaluation_times: Vec<Duration>,
    /// Summary of `evaluation_times`, computed once at termination
    pub evaluation_stats: Option<EvaluationStats>,
    pub stopping_condition: Option<StoppingCondition>,
    pub ships: Vec<ShipStats>,
    pub history: Option<ScoreHistory>,
}

impl Score {
    pub fn new(max_asteroids: u64, ships: &[Ship], record_history: bool) -> Self {
        Self {
            max_asteroids,
            ships: ships.iter().map(ShipStats::new).collect(),
            history: record_history.then(ScoreHistory::default),
            ..Default::default()
        }
    }

    /// Bullet hits / bullets fired, 0.0 with no shots
    pub fn accuracy(&self) -> f32 {
        ratio(self.bullets_hit, self.bullets_fired)
    }

    pub fn fraction_total_asteroids_hit(&self) -> f32 {
        ratio(self.asteroids_hit, self.max_asteroids)
    }

    pub fn fraction_distance_travelled(&self) -> f32 {
        if self.max_distance <= 0.0 {
            0.0
        } else {
            self.distance_travelled / self.max_distance
        }
    }

    pub fn ship(&self, ship_id: ShipId) -> Option<&ShipStats> {
        self.ships.iter().find(|s| s.ship_id == ship_id)
    }

    fn ship_mut(&mut self, ship_id: ShipId) -> Option<&mut ShipStats> {
        self.ships.iter_mut().find(|s| s.ship_id == ship_id)
    }

    pub fn record_bullet_fired(&mut self, ship_id: ShipId) {
        self.bullets_fired += 1;
        if let Some(stats) = self.ship_mut(ship_id) {
            stats.bullets_fired += 1;
        }
    }

    pub fn record_asteroid_destroyed(&mut self, cause: Destruction) {
        self.asteroids_hit += 1;
        match cause {
            Destruction::Bullet(ship_id) => {
                self.bullets_hit += 1;
                if let Some(stats) = self.ship_mut(ship_id) {
                    stats.bullets_hit += 1;
                    stats.asteroids_hit += 1;
                }
            }
            Destruction::Collision(ship_id) => {
                if let Some(stats) = self.ship_mut(ship_id) {
                    stats.asteroids_hit += 1;
                }
            }
        }
    }

    /// Record a lost life; zero lives remaining means the ship was removed
    pub fn record_death(&mut self, ship_id: ShipId, lives_remaining: u32) {
        self.deaths += 1;
        if let Some(stats) = self.ship_mut(ship_id) {
            stats.deaths += 1;
            stats.lives_remaining = lives_remaining;
            stats.survived = lives_remaining > 0;
        }
    }

    pub fn record_evaluation(&mut self, elapsed: Duration, track: bool) {
        self.last_evaluation_time = elapsed;
        if track {
            self.evaluation_times.push(elapsed);
        }
    }

    /// Update counters at the end of a running tick
    pub fn timestep_update(&mut self, world: &World, dt: f32) {
        self.frame_count = world.frame;
        self.time = world.time;

        for ship in world.ships.iter().filter(|s| !s.is_respawning()) {
            let travelled = ship.speed.abs() * dt;
            self.distance_travelled += travelled;
            self.max_distance += ship.max_speed * dt;
            if let Some(stats) = self.ship_mut(ship.id) {
                stats.distance_travelled += travelled;
            }
        }

        let accuracy = self.accuracy();
        let (deaths, time, asteroids_hit) = (self.deaths, self.time, self.asteroids_hit);
        if let Some(history) = self.history.as_mut() {
            while history.last_deaths < deaths {
                history.last_deaths += 1;
                history.death_times.push(time);
            }
            history.accuracy_over_time.push(accuracy);
            history.asteroids_over_time.push(asteroids_hit);
        }
    }

    /// Finalize the score once the run reaches a terminal state
    pub fn final_update(&mut self, world: &World, condition: StoppingCondition) {
        self.frame_count = world.frame;
        self.time = world.time;
        self.stopping_condition = Some(condition);
        self.evaluation_stats = EvaluationStats::from_samples(&self.evaluation_times);

        for stats in &mut self.ships {
            match world.get_ship(stats.ship_id) {
                Some(ship) => {
                    stats.lives_remaining = ship.lives;
                    stats.survived = true;
                }
                None => {
                    stats.lives_remaining = 0;
                    stats.survived = false;
                }
            }
        }
    }

    /// Rank ships by survival, then asteroids hit, then accuracy
    pub fn rankings(&self) -> Vec<ShipRanking> {
        let mut rankings: Vec<ShipRanking> = self
            .ships
            .iter()
            .map(|s| ShipRanking {
                ship_id: s.ship_id,
                team: s.team.clone(),
                rank: 0,
                asteroids_hit: s.asteroids_hit,
                accuracy: s.accuracy(),
                deaths: s.deaths,
                survived: s.survived,
            })
            .collect();

        rankings.sort_by(|a, b| {
            b.survived
                .cmp(&a.survived)
                .then_with(|| b.asteroids_hit.cmp(&a.asteroids_hit))
                .then_with(|| b.accuracy.partial_cmp(&a.accuracy).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| a.ship_id.cmp(&b.ship_id))
        });

        for (i, ranking) in rankings.iter_mut().enumerate() {
            ranking.rank = (i + 1) as u32;
        }

        rankings
    }
}

fn ratio(numerator: u64, denominator: u64) -> f32 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f32 / denominator as f32
    }
}
