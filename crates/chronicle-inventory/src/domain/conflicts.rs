//! Conflict rules for concurrent writes to one inventory.
//!
//! Item events of the same type commute unless they touch the same item.
//! Removing an item conflicts with someone else equipping it, and the other
//! way round. Everything else keeps the engine default: same type conflicts.

use chronicle_core::conflict::ConflictDetector;

use super::events::{
    ITEM_ADDED_EVENT_TYPE, ITEM_EQUIPPED_EVENT_TYPE, ITEM_REMOVED_EVENT_TYPE, InventoryEvent,
    InventoryEventKind,
};

fn same_item(pending: &InventoryEvent, committed: &InventoryEvent) -> bool {
    match (pending.payload.item_id(), committed.payload.item_id()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Builds the conflict detector for inventory aggregates.
#[must_use]
pub fn inventory_conflicts() -> ConflictDetector<InventoryEventKind> {
    ConflictDetector::new()
        .register(ITEM_ADDED_EVENT_TYPE, ITEM_ADDED_EVENT_TYPE, same_item)
        .register(ITEM_REMOVED_EVENT_TYPE, ITEM_REMOVED_EVENT_TYPE, same_item)
        .register(ITEM_EQUIPPED_EVENT_TYPE, ITEM_EQUIPPED_EVENT_TYPE, same_item)
        .register(ITEM_REMOVED_EVENT_TYPE, ITEM_EQUIPPED_EVENT_TYPE, same_item)
        .register(ITEM_EQUIPPED_EVENT_TYPE, ITEM_REMOVED_EVENT_TYPE, same_item)
}
