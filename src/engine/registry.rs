use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::model::*;

use super::EngineError;

pub type SharedSlotState = Arc<RwLock<SlotState>>;

/// Fixed set of slots, built once at construction. The map itself is never
/// mutated afterwards; each slot's state sits behind its own lock.
pub struct SlotRegistry {
    slots: HashMap<SlotId, SharedSlotState>,
    /// Configured order, for listings.
    order: Vec<SlotId>,
}

impl SlotRegistry {
    pub fn new(ids: &[SlotId], now: Ms) -> Self {
        let mut slots = HashMap::with_capacity(ids.len());
        let mut order = Vec::with_capacity(ids.len());
        for id in ids {
            if slots.contains_key(id) {
                continue;
            }
            slots.insert(
                id.clone(),
                Arc::new(RwLock::new(SlotState::new(id.clone(), now))),
            );
            order.push(id.clone());
        }
        Self { slots, order }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    pub fn ids(&self) -> &[SlotId] {
        &self.order
    }

    pub fn slot(&self, id: &str) -> Result<SharedSlotState, EngineError> {
        self.slots
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownSlot(id.to_string()))
    }

    /// Slots in configured order.
    pub fn iter(&self) -> impl Iterator<Item = (&SlotId, &SharedSlotState)> {
        self.order.iter().filter_map(|id| self.slots.get_key_value(id))
    }

    pub async fn get(&self, id: &str) -> Result<SlotStatus, EngineError> {
        let slot = self.slot(id)?;
        let guard = slot.read().await;
        Ok(guard.status)
    }

    pub async fn get_all(&self) -> BTreeMap<SlotId, SlotStatus> {
        let mut all = BTreeMap::new();
        for (id, slot) in self.iter() {
            let guard = slot.read().await;
            all.insert(id.clone(), guard.status);
        }
        all
    }
}

/// Only called from event application, with the slot's write lock held.
pub(super) fn set(state: &mut SlotState, status: SlotStatus, now: Ms) {
    if state.status != status {
        state.status = status;
        state.changed_at = now;
    }
}
