pub mod core;
pub mod levels;
pub mod moves;
pub mod roster;
pub mod schedule;
pub mod settings;
