mod clock;
mod error;
mod mutations;
mod queries;
mod registry;
mod timers;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::EngineError;
pub use registry::{SharedSlotState, SlotRegistry};
pub use timers::ReservationTimers;

use std::sync::Arc;

use tracing::info;

use crate::config::{ConfigError, EngineConfig};
use crate::limits::MAX_RESERVATION_MINUTES;
use crate::model::*;
use crate::notify::NotifyHub;

/// Authoritative slot state. Sensor reports and reservation requests go in,
/// snapshots come out; nothing outside this type touches the registry or the
/// timer table.
pub struct Engine {
    registry: SlotRegistry,
    timers: ReservationTimers,
    clock: Arc<dyn Clock>,
    default_reservation_minutes: i64,
    notify: Arc<NotifyHub>,
}

/// Apply an event to a slot and its timer entry together (no locking, caller
/// holds the slot's write lock).
fn apply_to_slot(state: &mut SlotState, timers: &ReservationTimers, event: &Event, now: Ms) {
    match event {
        Event::SlotOccupied { slot, .. } => {
            timers.remove(slot.as_str());
        }
        Event::SlotVacated { .. } => {}
        Event::ReservationPlaced { slot, reservation } => {
            timers.put(slot.clone(), *reservation);
        }
        Event::ReservationReleased { slot, .. } | Event::ReservationExpired { slot, .. } => {
            timers.remove(slot.as_str());
        }
    }
    registry::set(state, event.resulting_status(), now);
}

impl Engine {
    pub fn new(config: EngineConfig, notify: Arc<NotifyHub>) -> Result<Self, ConfigError> {
        Self::with_clock(config, notify, Arc::new(SystemClock))
    }

    /// Revalidates `config`, so hand-built configs get the same checks as
    /// `EngineConfig::new`.
    pub fn with_clock(
        config: EngineConfig,
        notify: Arc<NotifyHub>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let config = EngineConfig::new(config.slots, config.default_reservation_minutes)?;
        let registry = SlotRegistry::new(&config.slots, clock.now_ms());
        info!(
            "engine ready: {} slots, default reservation {}min",
            registry.len(),
            config.default_reservation_minutes
        );
        Ok(Self {
            registry,
            timers: ReservationTimers::new(),
            clock,
            default_reservation_minutes: config.default_reservation_minutes,
            notify,
        })
    }

    pub fn now_ms(&self) -> Ms {
        self.clock.now_ms()
    }

    pub fn slot_ids(&self) -> &[SlotId] {
        self.registry.ids()
    }

    pub fn default_reservation_minutes(&self) -> i64 {
        self.default_reservation_minutes
    }

    /// Timer entry as stored, without sweeping.
    #[cfg(test)]
    pub(crate) fn timer_entry(&self, id: &str) -> Option<Reservation> {
        self.timers.get(id)
    }

    /// Apply + notify in one call.
    pub(super) fn commit(&self, state: &mut SlotState, event: Event, now: Ms) {
        apply_to_slot(state, &self.timers, &event, now);
        self.notify.send(&event);
    }

    /// Drop this slot's reservation if it has run out. Runs under the slot's
    /// write lock so every operation sees only live reservations.
    pub(super) fn expire_due(&self, state: &mut SlotState, now: Ms) -> Option<Event> {
        let reservation = self.timers.get(state.id.as_str())?;
        if reservation.is_live(now) {
            return None;
        }
        if state.status != SlotStatus::Reserved {
            // Stale entry left behind by an override; just clear it.
            self.timers.remove(state.id.as_str());
            return None;
        }
        let event = Event::ReservationExpired {
            slot: state.id.clone(),
            reservation_id: reservation.id,
        };
        self.commit(state, event.clone(), now);
        metrics::counter!(crate::observability::RESERVATIONS_EXPIRED_TOTAL).increment(1);
        Some(event)
    }

    /// `None` or non-positive means "use the default".
    pub(super) fn resolve_duration(&self, duration_minutes: Option<i64>) -> Result<i64, EngineError> {
        match duration_minutes {
            None => Ok(self.default_reservation_minutes),
            Some(m) if m <= 0 => Ok(self.default_reservation_minutes),
            Some(m) if m > MAX_RESERVATION_MINUTES => Err(EngineError::InvalidInput(format!(
                "reservation of {m} minutes exceeds maximum of {MAX_RESERVATION_MINUTES}"
            ))),
            Some(m) => Ok(m),
        }
    }
}
