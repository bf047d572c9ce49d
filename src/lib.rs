pub mod ai;
pub mod board;
pub mod controller;
pub mod moves;
pub mod player;
pub mod square;
pub mod web;

pub use ai::*;
pub use board::*;
pub use controller::*;
pub use moves::*;
pub use player::*;
pub use square::*;
pub use web::*;
