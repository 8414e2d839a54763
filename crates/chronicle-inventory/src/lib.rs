//! Inventory bounded context.
//!
//! A small domain that exercises the Chronicle engine end to end: a factory
//! that opens inventories, business methods that raise events, conflict
//! rules keyed on the item an event touches, and load/mutate/save handlers.

pub mod application;
pub mod domain;
