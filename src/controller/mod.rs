//! Controller contract and sandbox
//!
//! Controllers receive a read-only `WorldSnapshot` and one `ShipHandle` per
//! ship they own, and write commands through the handles.

pub mod builtin;
pub mod handle;
pub mod sandbox;
pub mod snapshot;

use std::sync::Arc;

pub use handle::{ShipCommands, ShipHandle};
pub use snapshot::{AsteroidView, BulletView, ShipView, WorldSnapshot};

/// User control logic for one or more ships
pub trait Controller: Send {
    fn name(&self) -> &str;

    /// Decide this tick's commands. Errors and panics count as controller faults.
    fn actions(&mut self, ships: &mut [ShipHandle], world: &WorldSnapshot) -> anyhow::Result<()>;
}

impl<C: Controller + ?Sized> Controller for Box<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn actions(&mut self, ships: &mut [ShipHandle], world: &WorldSnapshot) -> anyhow::Result<()> {
        (**self).actions(ships, world)
    }
}

/// Builds a fresh controller for each run
pub type ControllerFactory = Arc<dyn Fn() -> Box<dyn Controller> + Send + Sync>;
