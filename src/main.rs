use anyhow::Context;
use std::sync::atomic::Ordering;
use tracing::{error, info};

use asteroid_arena::config::SimConfig;
use asteroid_arena::controller::builtin::{IdleController, SpinShooter};
use asteroid_arena::game::scenario::{load_portfolio, AsteroidState, Scenario, ShipState};
use asteroid_arena::runner::{PortfolioResults, ScenarioRunner};
use asteroid_arena::SimError;

/// Frames between progress lines for each run
const LOG_INTERVAL: u64 = 600;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Portfolio runs default to competition settings; the environment may override them
    let config = SimConfig::load_or(SimConfig::competition());

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(false)
        .init();

    info!("Asteroid Arena v{}", env!("CARGO_PKG_VERSION"));
    config.validate()?;
    info!(
        "Configuration loaded: {} Hz, multiplier={}, timeout={}, tolerant={}",
        config.frequency,
        config.real_time_multiplier,
        config.sandbox.controller_timeout,
        config.sandbox.ignore_exceptions
    );

    let portfolio = match std::env::var("PORTFOLIO_PATH") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path).with_context(|| format!("reading portfolio {}", path))?;
            info!("Loaded portfolio from {}", path);
            load_portfolio(&json)?
        }
        Err(_) => default_portfolio()?,
    };

    let mut runner = ScenarioRunner::new(config)
        .with_portfolio(portfolio)
        .with_log_interval(LOG_INTERVAL);
    runner.add_controller(|| Box::new(IdleController))?;
    runner.add_controller(|| Box::new(SpinShooter::default()))?;

    let cancel = runner.cancel_flag();
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    tokio::select! {
        result = runner.run() => {
            match result {
                Ok(results) => report(&results),
                Err(e) => error!("Portfolio run failed: {}", e),
            }
        }
        _ = shutdown => {
            info!("Shutting down...");
            // Blocking runs outlive the dropped future; stop them between ticks
            cancel.store(true, Ordering::Relaxed);
        }
    }

    Ok(())
}

fn default_portfolio() -> Result<Vec<Scenario>, SimError> {
    Ok(vec![
        Scenario::builder("single_asteroid")
            .num_asteroids(1)
            .seed(1)
            .time_limit(10.0)
            .build()?,
        Scenario::builder("asteroid_field")
            .num_asteroids(6)
            .seed(2)
            .time_limit(30.0)
            .build()?,
        Scenario::builder("duel")
            .asteroid_states(vec![
                AsteroidState::at(200.0, 300.0),
                AsteroidState::at(600.0, 300.0),
                AsteroidState::at(400.0, 500.0).with_size(2),
            ])
            .ship(ShipState {
                team: Some("left".into()),
                ..ShipState::at(300.0, 150.0)
            })
            .ship(ShipState {
                team: Some("right".into()),
                angle: 90.0,
                ..ShipState::at(500.0, 150.0)
            })
            .seed(3)
            .time_limit(30.0)
            .build()?,
    ])
}

fn report(results: &PortfolioResults) {
    let mut controllers: Vec<_> = results.keys().collect();
    controllers.sort();

    for controller in controllers {
        let scores = &results[controller];
        let mut scenarios: Vec<_> = scores.keys().collect();
        scenarios.sort();

        let mut total_hits = 0;
        let mut total_max = 0;
        for scenario in scenarios {
            match &scores[scenario] {
                Ok(score) => {
                    total_hits += score.asteroids_hit;
                    total_max += score.max_asteroids;
                    for ranking in score.rankings() {
                        info!(
                            "  {} / {} ship {}: rank {}, {} hits, accuracy {:.2}, {} deaths",
                            controller,
                            scenario,
                            ranking.ship_id,
                            ranking.rank,
                            ranking.asteroids_hit,
                            ranking.accuracy,
                            ranking.deaths
                        );
                    }
                }
                Err(e) => error!("  {} / {} failed: {}", controller, scenario, e),
            }
        }

        info!("{}: {} of {} asteroids destroyed", controller, total_hits, total_max);
    }
}
