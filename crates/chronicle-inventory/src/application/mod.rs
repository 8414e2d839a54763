//! Application services of the inventory context.

pub mod command_handlers;
pub mod query_handlers;
