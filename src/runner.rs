//! Portfolio runner
//!
//! Runs every registered controller over every scenario in a portfolio.
//! Runs are independent and execute on tokio's blocking pool, bounded so a
//! timed controller never competes with more runs than the machine has cores.

use hashbrown::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::SimConfig;
use crate::controller::{Controller, ControllerFactory};
use crate::error::SimError;
use crate::game::game_loop::GameLoop;
use crate::game::observer::TracingObserver;
use crate::game::scenario::Scenario;
use crate::game::score::Score;

/// Scores keyed by controller name, then scenario name
pub type PortfolioResults = HashMap<String, HashMap<String, Result<Score, SimError>>>;

pub struct ScenarioRunner {
    config: SimConfig,
    portfolio: Vec<Scenario>,
    controllers: Vec<(String, ControllerFactory)>,
    /// Frames between progress log lines; 0 disables per-run observers
    log_interval: u64,
    /// Runs allowed on the blocking pool at once
    max_concurrency: usize,
    cancel: Arc<AtomicBool>,
}

impl ScenarioRunner {
    pub fn new(config: SimConfig) -> Self {
        Self {
            portfolio: Vec::new(),
            controllers: Vec::new(),
            log_interval: 0,
            max_concurrency: default_concurrency(&config),
            cancel: Arc::new(AtomicBool::new(false)),
            config,
        }
    }

    pub fn with_portfolio(mut self, portfolio: Vec<Scenario>) -> Self {
        self.portfolio = portfolio;
        self
    }

    pub fn with_log_interval(mut self, frames: u64) -> Self {
        self.log_interval = frames;
        self
    }

    pub fn with_max_concurrency(mut self, runs: usize) -> Self {
        self.max_concurrency = runs.max(1);
        self
    }

    /// Flag shared with every run; setting it stops runs between ticks
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn add_scenario(&mut self, scenario: Scenario) {
        self.portfolio.push(scenario);
    }

    /// Register a controller factory; the controller's name keys its results
    pub fn add_controller<F>(&mut self, factory: F) -> Result<(), SimError>
    where
        F: Fn() -> Box<dyn Controller> + Send + Sync + 'static,
    {
        let name = factory().name().to_string();
        if self.controllers.iter().any(|(n, _)| *n == name) {
            return Err(SimError::config(format!("controller '{}' registered twice", name)));
        }
        let factory: ControllerFactory = Arc::new(factory);
        self.controllers.push((name, factory));
        Ok(())
    }

    pub fn portfolio(&self) -> &[Scenario] {
        &self.portfolio
    }

    /// Run the full portfolio for every controller
    pub async fn run(&self) -> Result<PortfolioResults, SimError> {
        self.config.validate()?;
        if self.controllers.is_empty() || self.portfolio.is_empty() {
            return Err(SimError::config("runner needs at least one controller and one scenario"));
        }

        info!(
            "Running {} controllers over {} scenarios, {} at a time",
            self.controllers.len(),
            self.portfolio.len(),
            self.max_concurrency
        );

        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        'spawn: for (name, factory) in &self.controllers {
            for scenario in &self.portfolio {
                let permit = match permits.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break 'spawn,
                };
                if self.cancel.load(Ordering::Relaxed) {
                    warn!("Runner cancelled; skipping remaining scenarios");
                    break 'spawn;
                }

                let name = name.clone();
                let factory = factory.clone();
                let scenario = scenario.clone();
                let config = self.config.clone();
                let log_interval = self.log_interval;
                let cancel = self.cancel.clone();

                tasks.spawn_blocking(move || {
                    let _permit = permit;
                    let scenario_name = scenario.name().to_string();
                    let result = run_one(scenario, config, factory, &name, log_interval, cancel);
                    (name, scenario_name, result)
                });
            }
        }

        let mut results = PortfolioResults::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((controller, scenario, result)) => {
                    match &result {
                        Ok(score) => info!(
                            "{} / {}: {:?}, {} of {} asteroids, accuracy {:.2}",
                            controller,
                            scenario,
                            score.stopping_condition,
                            score.asteroids_hit,
                            score.max_asteroids,
                            score.accuracy()
                        ),
                        Err(e) => error!("{} / {}: {}", controller, scenario, e),
                    }
                    results.entry(controller).or_default().insert(scenario, result);
                }
                Err(e) => error!("Scenario run task failed: {}", e),
            }
        }

        Ok(results)
    }
}

/// Cores available to runs; a timed run occupies two threads (loop and controller worker)
fn default_concurrency(config: &SimConfig) -> usize {
    let cores = std::thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1);
    if config.sandbox.controller_timeout {
        (cores / 2).max(1)
    } else {
        cores
    }
}

fn run_one(
    scenario: Scenario,
    config: SimConfig,
    factory: ControllerFactory,
    name: &str,
    log_interval: u64,
    cancel: Arc<AtomicBool>,
) -> Result<Score, SimError> {
    let label = format!("{}/{}", name, scenario.name());
    let mut game = GameLoop::new(scenario, config)?;
    game.set_cancel_flag(cancel);
    if log_interval > 0 {
        game.add_observer(Box::new(TracingObserver::new(label, log_interval)));
    }
    game.add_controller_for_all(factory())?;
    game.run()
}
