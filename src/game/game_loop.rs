//! Game loop orchestration
//!
//! Each tick runs, strictly in order: stopping check, controller sandboxes,
//! command application and firing, physics, collisions, score update.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::SimConfig;
use crate::controller::sandbox::{Outcome, Sandbox};
use crate::controller::{Controller, ShipCommands, WorldSnapshot};
use crate::error::SimError;
use crate::game::observer::SimObserver;
use crate::game::performance::{PerformanceMonitor, PerformanceStatus};
use crate::game::scenario::{max_asteroids, Scenario};
use crate::game::score::Score;
use crate::game::state::{ShipId, World};
use crate::game::stopping::{self, StoppingCondition};
use crate::game::systems::collision::{self, CollisionEvent};
use crate::game::systems::physics;
use crate::game::systems::projectile::{self, ProjectileEvent};

/// What happened during one tick
#[derive(Debug, Clone)]
pub struct TickReport {
    pub frame: u64,
    pub time: f32,
    pub condition: StoppingCondition,
    pub timeouts: u32,
    pub faults: u32,
    pub shots: Vec<ProjectileEvent>,
    pub collisions: Vec<CollisionEvent>,
    /// Set when the performance status changed this tick
    pub performance: Option<PerformanceStatus>,
}

impl TickReport {
    fn new(world: &World, condition: StoppingCondition) -> Self {
        Self {
            frame: world.frame,
            time: world.time,
            condition,
            timeouts: 0,
            faults: 0,
            shots: Vec::new(),
            collisions: Vec::new(),
            performance: None,
        }
    }
}

/// One simulation run
pub struct GameLoop {
    config: SimConfig,
    scenario: Scenario,
    world: World,
    score: Score,
    sandboxes: Vec<Sandbox>,
    observers: Vec<Box<dyn SimObserver>>,
    monitor: PerformanceMonitor,
    finished: bool,
    /// Checked between ticks by `run`; set from outside to stop early
    cancel: Arc<AtomicBool>,
}

impl GameLoop {
    pub fn new(scenario: Scenario, config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;

        let world = scenario.materialize(config.lives);
        let score = Score::new(max_asteroids(&world.asteroids), &world.ships, config.record_history);
        let monitor = PerformanceMonitor::new(config.frequency);

        info!(
            "Scenario '{}' ready: {} asteroids, {} ships, {} Hz",
            scenario.name(),
            world.asteroids.len(),
            world.ships.len(),
            config.frequency
        );

        Ok(Self {
            config,
            scenario,
            world,
            score,
            sandboxes: Vec::new(),
            observers: Vec::new(),
            monitor,
            finished: false,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Register a controller for a set of ships.
    ///
    /// Every ship must exist and must not already belong to another controller.
    pub fn add_controller<C: Controller + 'static>(&mut self, controller: C, ships: &[ShipId]) -> Result<(), SimError> {
        let name = controller.name().to_string();
        if ships.is_empty() {
            return Err(SimError::config(format!("controller '{}' was given no ships", name)));
        }

        for (i, id) in ships.iter().enumerate() {
            if self.world.get_ship(*id).is_none() {
                return Err(SimError::config(format!("controller '{}' claims unknown ship {}", name, id)));
            }
            if ships[..i].contains(id) || self.sandboxes.iter().any(|s| s.ships().contains(id)) {
                return Err(SimError::config(format!("ship {} is already controlled", id)));
            }
        }

        let deadline = Duration::from_secs_f32(self.config.dt());
        let sandbox = Sandbox::new(Box::new(controller), ships.to_vec(), &self.config.sandbox, deadline)?;
        debug!("Controller '{}' registered for ships {:?}", name, ships);
        self.sandboxes.push(sandbox);
        Ok(())
    }

    /// Register a controller for every ship in the scenario
    pub fn add_controller_for_all<C: Controller + 'static>(&mut self, controller: C) -> Result<(), SimError> {
        let ships: Vec<ShipId> = self.world.ships.iter().map(|s| s.id).collect();
        self.add_controller(controller, &ships)
    }

    /// Share a cancel flag; `run` returns `Cancelled` once it is set
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancel = flag;
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn add_observer(&mut self, observer: Box<dyn SimObserver>) {
        self.observers.push(observer);
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn score(&self) -> &Score {
        &self.score
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn stopping_condition(&self) -> StoppingCondition {
        self.world.stopping_condition
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Run one tick. Once the run has ended this does nothing and reports the terminal state.
    pub fn step(&mut self) -> Result<TickReport, SimError> {
        if self.finished {
            return Ok(TickReport::new(&self.world, self.world.stopping_condition));
        }

        let condition = stopping::advance(&mut self.world, self.scenario.time_limit(), self.config.frequency);
        if condition.is_terminal() {
            self.finish(condition);
            return Ok(TickReport::new(&self.world, condition));
        }

        self.monitor.tick_start();
        let dt = self.config.dt();
        let mut report = TickReport::new(&self.world, condition);

        let commands = self.evaluate_controllers(&mut report)?;
        self.apply_commands(commands, &mut report)?;

        physics::update(&mut self.world, dt);
        report.collisions = collision::update(&mut self.world, &mut self.score)?;
        self.score.timestep_update(&self.world, dt);

        report.performance = self.monitor.tick_end(self.world.entity_count());
        if let Some(status) = report.performance {
            if status.is_degraded() {
                warn!("Tick performance degraded: {}", self.monitor.status_message());
            } else {
                debug!("Tick performance: {}", self.monitor.status_message());
            }
        }

        for observer in &mut self.observers {
            observer.on_tick(&self.world, &self.score, &report);
        }

        Ok(report)
    }

    fn evaluate_controllers(&mut self, report: &mut TickReport) -> Result<Vec<(ShipId, ShipCommands)>, SimError> {
        if self.sandboxes.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = Arc::new(WorldSnapshot::capture(&self.world));
        let track = self.config.sandbox.track_compute_cost;
        let mut commands = Vec::new();

        for sandbox in &mut self.sandboxes {
            let evaluation = sandbox.evaluate(self.world.frame, snapshot.clone())?;
            self.score.record_evaluation(evaluation.elapsed, track);

            match evaluation.outcome {
                Outcome::Completed => {}
                Outcome::TimedOut => {
                    self.score.controller_timeouts += 1;
                    report.timeouts += 1;
                }
                Outcome::Faulted(_) => {
                    self.score.controller_faults += 1;
                    report.faults += 1;
                }
            }
            commands.extend(evaluation.commands);
        }

        Ok(commands)
    }

    fn apply_commands(&mut self, commands: Vec<(ShipId, ShipCommands)>, report: &mut TickReport) -> Result<(), SimError> {
        for (ship_id, command) in commands {
            let Some(ship) = self.world.get_ship_mut(ship_id) else {
                continue;
            };
            physics::apply_commands(ship, command.turn_rate, command.thrust)?;

            if command.fire {
                if let Some(event) = projectile::fire(&mut self.world, ship_id) {
                    self.score.record_bullet_fired(ship_id);
                    report.shots.push(event);
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self, condition: StoppingCondition) {
        self.finished = true;
        self.score.final_update(&self.world, condition);

        info!(
            "Scenario '{}' finished: {:?} after {} frames ({:.2}s)",
            self.scenario.name(),
            condition,
            self.world.frame,
            self.world.time
        );

        for observer in &mut self.observers {
            observer.on_game_over(&self.world, &self.score);
        }
    }

    /// Run to a terminal state, pacing ticks in wall-clock time when the
    /// real-time multiplier is positive.
    pub fn run(mut self) -> Result<Score, SimError> {
        let pacing = self.config.pacing()?;
        let mut next_tick = Instant::now();

        loop {
            if self.cancel.load(Ordering::Relaxed) {
                info!("Scenario '{}' cancelled at frame {}", self.scenario.name(), self.world.frame);
                return Err(SimError::Cancelled { frame: self.world.frame });
            }

            let report = self.step()?;
            if report.condition.is_terminal() {
                break;
            }

            if let Some(period) = pacing {
                next_tick += period;
                let now = Instant::now();
                if next_tick > now {
                    std::thread::sleep(next_tick - now);
                } else {
                    next_tick = now;
                }
            }
        }

        Ok(self.score)
    }

    /// Final score; only meaningful once the run has finished
    pub fn into_score(self) -> Score {
        self.score
    }
}
