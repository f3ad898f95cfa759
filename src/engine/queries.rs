use std::collections::BTreeMap;

use tokio::sync::broadcast;

use crate::model::*;
use crate::observability::SLOTS;

use super::{Engine, EngineError};

impl Engine {
    /// Sweep, then read every slot.
    pub async fn snapshot_at(&self, now: Ms) -> BTreeMap<SlotId, SlotStatus> {
        self.sweep_expired(now).await;
        self.registry.get_all().await
    }

    pub async fn snapshot(&self) -> BTreeMap<SlotId, SlotStatus> {
        self.snapshot_at(self.now_ms()).await
    }

    /// Sweep, then read one slot.
    pub async fn snapshot_one_at(&self, id: &str, now: Ms) -> Result<SlotStatus, EngineError> {
        if !self.registry.contains(id) {
            return Err(EngineError::UnknownSlot(id.to_string()));
        }
        self.sweep_expired(now).await;
        self.registry.get(id).await
    }

    pub async fn snapshot_one(&self, id: &str) -> Result<SlotStatus, EngineError> {
        self.snapshot_one_at(id, self.now_ms()).await
    }

    /// Per-slot detail in configured order. Each entry is read under the
    /// slot's lock, so status and reservation always agree.
    pub async fn list_slots_at(&self, now: Ms) -> Vec<SlotInfo> {
        self.sweep_expired(now).await;
        let mut out = Vec::with_capacity(self.registry.len());
        for (id, slot) in self.registry.iter() {
            let guard = slot.read().await;
            out.push(SlotInfo {
                id: id.clone(),
                status: guard.status,
                changed_at: guard.changed_at,
                reservation: self.timers.get(id.as_str()),
            });
        }
        out
    }

    pub async fn list_slots(&self) -> Vec<SlotInfo> {
        self.list_slots_at(self.now_ms()).await
    }

    pub async fn stats_at(&self, now: Ms) -> OccupancyStats {
        let mut stats = OccupancyStats::default();
        for status in self.snapshot_at(now).await.values() {
            stats.record(*status);
        }
        metrics::gauge!(SLOTS, "status" => "free").set(stats.free as f64);
        metrics::gauge!(SLOTS, "status" => "reserved").set(stats.reserved as f64);
        metrics::gauge!(SLOTS, "status" => "occupied").set(stats.occupied as f64);
        stats
    }

    pub async fn stats(&self) -> OccupancyStats {
        self.stats_at(self.now_ms()).await
    }

    pub async fn reservation_of_at(
        &self,
        id: &str,
        now: Ms,
    ) -> Result<Option<Reservation>, EngineError> {
        let slot = self.registry.slot(id)?;
        self.sweep_expired(now).await;
        let _guard = slot.read().await;
        Ok(self.timers.get(id))
    }

    pub async fn reservation_of(&self, id: &str) -> Result<Option<Reservation>, EngineError> {
        self.reservation_of_at(id, self.now_ms()).await
    }

    /// Change feed for one slot.
    pub fn subscribe(&self, id: &str) -> Result<broadcast::Receiver<Event>, EngineError> {
        if !self.registry.contains(id) {
            return Err(EngineError::UnknownSlot(id.to_string()));
        }
        Ok(self.notify.subscribe(id))
    }

    /// Change feed for every slot.
    pub fn subscribe_all(&self) -> broadcast::Receiver<Event> {
        self.notify.subscribe_all()
    }
}
