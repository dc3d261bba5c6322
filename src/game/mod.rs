pub mod constants;
pub mod state;
pub mod systems;
pub mod game_loop;
pub mod observer;
pub mod performance;
pub mod scenario;
pub mod score;
pub mod spatial;
pub mod stopping;
