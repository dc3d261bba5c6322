//! Asteroid Arena Library
//!
//! A deterministic multi-ship asteroids simulation for evaluating autonomous
//! controllers. Controllers run inside a sandbox with a per-tick deadline and
//! fault isolation; runs produce a `Score` with per-ship statistics.

pub mod config;
pub mod controller;
pub mod error;
pub mod game;
pub mod runner;
pub mod util;

pub use config::{SandboxConfig, SimConfig};
pub use controller::{Controller, ShipHandle, WorldSnapshot};
pub use error::SimError;
pub use game::game_loop::GameLoop;
pub use game::scenario::Scenario;
pub use game::score::Score;
