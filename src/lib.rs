//! Timetable core for an academy: slot keys, class-level names, per-class
//! schedule aggregation and staged student moves, plus the JSON-lines
//! sidecar that serves them from a SQLite workspace.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod ipc;
pub mod overlay;
pub mod roster;
pub mod schedule;
pub mod slot_key;
pub mod taxonomy;
