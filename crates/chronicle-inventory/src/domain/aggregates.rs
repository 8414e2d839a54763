//! Aggregate roots for the inventory context.

use std::collections::BTreeSet;

use chronicle_core::aggregate::{Aggregate, AggregateRoot, AggregateState};
use chronicle_core::clock::Clock;
use chronicle_core::command::CommandMetadata;
use chronicle_core::error::DomainError;
use chronicle_core::router::{Apply, EventRouter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{
    ITEM_EQUIPPED_EVENT_TYPE, InventoryEventKind, InventoryOpened, ItemAdded, ItemEquipped,
    ItemRemoved,
};

/// Materialised state of an inventory.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryState {
    /// Who the inventory belongs to. `None` until opened.
    pub owner: Option<String>,
    /// Items currently in the inventory.
    pub items: BTreeSet<Uuid>,
    /// Items currently equipped; always a subset of `items`.
    pub equipped: BTreeSet<Uuid>,
}

impl Apply<InventoryOpened> for InventoryState {
    fn apply(&mut self, event: &InventoryOpened) {
        self.owner = Some(event.owner.clone());
    }
}

impl Apply<ItemAdded> for InventoryState {
    fn apply(&mut self, event: &ItemAdded) {
        self.items.insert(event.item_id);
    }
}

impl Apply<ItemRemoved> for InventoryState {
    fn apply(&mut self, event: &ItemRemoved) {
        self.items.remove(&event.item_id);
        self.equipped.remove(&event.item_id);
    }
}

impl AggregateState for InventoryState {
    type Event = InventoryEventKind;
    const AGGREGATE_TYPE: &'static str = "inventory";

    fn router() -> EventRouter<Self, InventoryEventKind> {
        EventRouter::new(Self::AGGREGATE_TYPE)
            .on::<InventoryOpened>()
            .on::<ItemAdded>()
            .on::<ItemRemoved>()
            .register(ITEM_EQUIPPED_EVENT_TYPE, |state: &mut Self, payload| {
                if let InventoryEventKind::ItemEquipped(e) = payload {
                    state.equipped.insert(e.item_id);
                }
            })
    }
}

/// The aggregate root for an inventory.
#[derive(Debug)]
pub struct Inventory {
    aggregate: Aggregate<InventoryState>,
}

impl Inventory {
    /// Opens a new inventory for `owner`, producing an `InventoryOpened`
    /// event. The inventory id is taken from `cause.aggregate_id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `owner` is blank.
    pub fn open(
        owner: &str,
        cause: &CommandMetadata,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        let owner = owner.trim();
        if owner.is_empty() {
            return Err(DomainError::Validation(
                "inventory owner must not be blank".to_owned(),
            ));
        }

        let inventory_id = cause.aggregate_id;
        let mut aggregate = Aggregate::new(inventory_id);
        aggregate.raise(
            InventoryEventKind::InventoryOpened(InventoryOpened {
                inventory_id,
                owner: owner.to_owned(),
            }),
            cause,
            clock,
        )?;
        Ok(Self { aggregate })
    }

    /// Returns the inventory identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.aggregate.id()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &InventoryState {
        self.aggregate.state()
    }

    /// Returns the owner, if the inventory has been opened.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.state().owner.as_deref()
    }

    /// Returns `true` if the item is in the inventory.
    #[must_use]
    pub fn contains(&self, item_id: Uuid) -> bool {
        self.state().items.contains(&item_id)
    }

    /// Returns `true` if the item is equipped.
    #[must_use]
    pub fn is_equipped(&self, item_id: Uuid) -> bool {
        self.state().equipped.contains(&item_id)
    }

    /// Adds an item to the inventory, producing an `ItemAdded` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the item is already present.
    pub fn add_item(
        &mut self,
        item_id: Uuid,
        cause: &CommandMetadata,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.contains(item_id) {
            return Err(DomainError::Validation(format!(
                "item {item_id} already in inventory {}",
                self.id()
            )));
        }
        let inventory_id = self.id();
        self.aggregate.raise(
            InventoryEventKind::ItemAdded(ItemAdded {
                inventory_id,
                item_id,
            }),
            cause,
            clock,
        )?;
        Ok(())
    }

    /// Removes an item from the inventory, producing an `ItemRemoved` event.
    /// A removed item is no longer equipped.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the item is not in the inventory.
    pub fn remove_item(
        &mut self,
        item_id: Uuid,
        cause: &CommandMetadata,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_contains(item_id)?;
        let inventory_id = self.id();
        self.aggregate.raise(
            InventoryEventKind::ItemRemoved(ItemRemoved {
                inventory_id,
                item_id,
            }),
            cause,
            clock,
        )?;
        Ok(())
    }

    /// Equips an item, producing an `ItemEquipped` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the item is not in the inventory
    /// or is already equipped.
    pub fn equip_item(
        &mut self,
        item_id: Uuid,
        cause: &CommandMetadata,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_contains(item_id)?;
        if self.is_equipped(item_id) {
            return Err(DomainError::Validation(format!(
                "item {item_id} already equipped in inventory {}",
                self.id()
            )));
        }
        let inventory_id = self.id();
        self.aggregate.raise(
            InventoryEventKind::ItemEquipped(ItemEquipped {
                inventory_id,
                item_id,
            }),
            cause,
            clock,
        )?;
        Ok(())
    }

    fn ensure_contains(&self, item_id: Uuid) -> Result<(), DomainError> {
        if self.contains(item_id) {
            Ok(())
        } else {
            Err(DomainError::Validation(format!(
                "item {item_id} not found in inventory {}",
                self.id()
            )))
        }
    }
}

impl AggregateRoot for Inventory {
    type State = InventoryState;

    fn from_aggregate(aggregate: Aggregate<InventoryState>) -> Self {
        Self { aggregate }
    }

    fn aggregate(&self) -> &Aggregate<InventoryState> {
        &self.aggregate
    }

    fn aggregate_mut(&mut self) -> &mut Aggregate<InventoryState> {
        &mut self.aggregate
    }
}
