//! Domain model of the inventory context.

pub mod aggregates;
pub mod commands;
pub mod conflicts;
pub mod events;
