//! Per-ship command handles
//!
//! A handle is only writable for the tick that created it. The game loop closes
//! the shared slot once the controller returns or its deadline passes, so late
//! writes from an abandoned worker are discarded.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::controller::snapshot::ShipView;
use crate::game::state::ShipId;
use crate::util::vec2::Vec2;

/// Commands written during one tick; `None` keeps the previous value
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShipCommands {
    pub turn_rate: Option<f32>,
    pub thrust: Option<f32>,
    /// Fire intent for this tick only
    pub fire: bool,
}

#[derive(Debug)]
struct Slot {
    open: bool,
    commands: ShipCommands,
}

/// Controller-facing handle for one ship
#[derive(Debug)]
pub struct ShipHandle {
    state: ShipView,
    slot: Arc<Mutex<Slot>>,
}

impl ShipHandle {
    /// Open a handle for this tick, returning the game loop's side of the slot
    pub(crate) fn open(state: ShipView) -> (Self, CommandSink) {
        let slot = Arc::new(Mutex::new(Slot {
            open: true,
            commands: ShipCommands::default(),
        }));
        let sink = CommandSink {
            ship_id: state.id,
            slot: slot.clone(),
        };
        (Self { state, slot }, sink)
    }

    pub fn id(&self) -> ShipId {
        self.state.id
    }

    /// Ship state at the start of the tick
    pub fn state(&self) -> &ShipView {
        &self.state
    }

    pub fn position(&self) -> Vec2 {
        self.state.position
    }

    pub fn angle(&self) -> f32 {
        self.state.angle
    }

    pub fn speed(&self) -> f32 {
        self.state.speed
    }

    pub fn lives(&self) -> u32 {
        self.state.lives
    }

    pub fn set_turn_rate(&mut self, turn_rate: f32) {
        self.write(|c| c.turn_rate = Some(turn_rate));
    }

    pub fn set_thrust(&mut self, thrust: f32) {
        self.write(|c| c.thrust = Some(thrust));
    }

    pub fn set_fire(&mut self, fire: bool) {
        self.write(|c| c.fire = fire);
    }

    /// Request a shot this tick
    pub fn fire(&mut self) {
        self.set_fire(true);
    }

    /// Commands written so far this tick
    pub fn commands(&self) -> ShipCommands {
        self.slot.lock().commands
    }

    /// Whether writes are still accepted
    pub fn is_open(&self) -> bool {
        self.slot.lock().open
    }

    fn write(&self, f: impl FnOnce(&mut ShipCommands)) {
        let mut slot = self.slot.lock();
        if slot.open {
            f(&mut slot.commands);
        }
    }
}

/// Game loop side of a handle
#[derive(Debug)]
pub(crate) struct CommandSink {
    ship_id: ShipId,
    slot: Arc<Mutex<Slot>>,
}

impl CommandSink {
    pub fn ship_id(&self) -> ShipId {
        self.ship_id
    }

    /// Stop accepting writes and take whatever was set
    pub fn close(&self) -> ShipCommands {
        let mut slot = self.slot.lock();
        slot.open = false;
        std::mem::take(&mut slot.commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::snapshot::WorldSnapshot;
    use crate::game::state::{GameMap, Ship, World};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn create_view() -> ShipView {
        let mut world = World::new(GameMap::default(), StdRng::seed_from_u64(0));
        world.add_ship(Ship::new(3, Vec2::new(1.0, 2.0), 45.0, 2));
        WorldSnapshot::capture(&world).ships.remove(0)
    }

    #[test]
    fn test_handle_writes() {
        let (mut handle, sink) = ShipHandle::open(create_view());
        assert_eq!(handle.id(), 3);
        assert_eq!(handle.lives(), 2);

        handle.set_thrust(100.0);
        handle.fire();

        let commands = sink.close();
        assert_eq!(commands.thrust, Some(100.0));
        assert_eq!(commands.turn_rate, None);
        assert!(commands.fire);
        assert_eq!(sink.ship_id(), 3);
    }

    #[test]
    fn test_writes_after_close_discarded() {
        let (mut handle, sink) = ShipHandle::open(create_view());
        handle.set_turn_rate(10.0);
        let commands = sink.close();
        assert!(!handle.is_open());

        handle.set_turn_rate(99.0);
        handle.fire();

        assert_eq!(commands.turn_rate, Some(10.0));
        assert_eq!(handle.commands(), ShipCommands::default());
    }
}
