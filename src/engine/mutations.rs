use std::time::Instant;

use tracing::{debug, info, warn};

use crate::model::*;
use crate::observability::{
    OPERATION_DURATION_SECONDS, RELEASES_TOTAL, RESERVATION_REQUESTS_TOTAL, SENSOR_EVENTS_TOTAL,
};

use super::{Engine, EngineError};

/// Outcome label for an operation result: the success label, or the error kind.
pub(super) fn outcome_label<T>(result: &Result<(T, &'static str), EngineError>) -> &'static str {
    match result {
        Ok((_, outcome)) => outcome,
        Err(e) => e.kind(),
    }
}

/// Record the outcome counter and latency for one mutation, then drop the label.
fn finish<T>(
    counter: &'static str,
    op: &'static str,
    started: Instant,
    result: Result<(T, &'static str), EngineError>,
) -> Result<T, EngineError> {
    metrics::counter!(counter, "outcome" => outcome_label(&result)).increment(1);
    metrics::histogram!(OPERATION_DURATION_SECONDS, "op" => op)
        .record(started.elapsed().as_secs_f64());
    result.map(|(value, _)| value)
}

impl Engine {
    /// Sensor-origin occupancy report.
    ///
    /// `occupied = true` always wins: the slot becomes OCCUPIED and any
    /// reservation is evicted. `occupied = false` is ignored while a live
    /// reservation exists, otherwise the slot becomes FREE.
    pub async fn report_sensor(&self, id: &str, occupied: bool) -> Result<SlotStatus, EngineError> {
        self.sensor_update(id, occupied).await.map(|(status, _)| status)
    }

    /// Like `report_sensor`, also returning the reservation that backs a
    /// RESERVED result. Both are read under the same guard.
    pub(crate) async fn sensor_update(
        &self,
        id: &str,
        occupied: bool,
    ) -> Result<(SlotStatus, Option<Reservation>), EngineError> {
        let started = Instant::now();
        let result = self.apply_sensor(id, occupied).await;
        finish(SENSOR_EVENTS_TOTAL, "report_sensor", started, result)
    }

    async fn apply_sensor(
        &self,
        id: &str,
        occupied: bool,
    ) -> Result<((SlotStatus, Option<Reservation>), &'static str), EngineError> {
        let slot = self.registry.slot(id)?;
        let mut guard = slot.write().await;
        let now = self.clock.now_ms();
        self.expire_due(&mut guard, now);

        let outcome = if occupied {
            let superseded = self.timers.get(id).map(|r| r.id);
            if guard.status != SlotStatus::Occupied || superseded.is_some() {
                if let Some(rid) = superseded {
                    info!("sensor override on {id}: reservation {rid} evicted");
                } else {
                    info!("{id} occupied");
                }
                let event = Event::SlotOccupied { slot: guard.id.clone(), superseded };
                self.commit(&mut guard, event, now);
                "occupied"
            } else {
                "unchanged"
            }
        } else if let Some(reservation) = self.timers.get(id) {
            debug!(
                "ignoring empty reading on {id}: reserved until {}",
                reservation.expires_at
            );
            "ignored"
        } else if guard.status != SlotStatus::Free {
            info!("{id} vacated");
            let event = Event::SlotVacated { slot: guard.id.clone() };
            self.commit(&mut guard, event, now);
            "vacated"
        } else {
            "unchanged"
        };

        let reservation = match guard.status {
            SlotStatus::Reserved => self.timers.get(id),
            _ => None,
        };
        Ok(((guard.status, reservation), outcome))
    }

    /// User-origin reservation. Re-reserving a RESERVED slot refreshes the
    /// expiry; an OCCUPIED slot is rejected.
    pub async fn request_reservation(
        &self,
        id: &str,
        duration_minutes: Option<i64>,
    ) -> Result<Reservation, EngineError> {
        let started = Instant::now();
        let result = self.place_reservation(id, duration_minutes).await;
        finish(RESERVATION_REQUESTS_TOTAL, "request_reservation", started, result)
    }

    async fn place_reservation(
        &self,
        id: &str,
        duration_minutes: Option<i64>,
    ) -> Result<(Reservation, &'static str), EngineError> {
        let minutes = self.resolve_duration(duration_minutes)?;
        let slot = self.registry.slot(id)?;
        let mut guard = slot.write().await;
        let now = self.clock.now_ms();
        self.expire_due(&mut guard, now);

        if guard.status == SlotStatus::Occupied {
            warn!("reservation rejected: {id} is occupied");
            return Err(EngineError::SlotUnavailable(id.to_string()));
        }

        let refreshed = guard.status == SlotStatus::Reserved;
        let reservation = Reservation::new(now, minutes);
        info!(
            "{id} reserved for {minutes}min (reservation {}, expires {}){}",
            reservation.id,
            reservation.expires_at,
            if refreshed { ", refreshed" } else { "" }
        );
        let event = Event::ReservationPlaced { slot: guard.id.clone(), reservation };
        self.commit(&mut guard, event, now);

        Ok((reservation, if refreshed { "refreshed" } else { "accepted" }))
    }

    /// User-origin release. Safe to repeat: with no live reservation this is a
    /// no-op that reports the current status.
    pub async fn release_reservation(&self, id: &str) -> Result<SlotStatus, EngineError> {
        let started = Instant::now();
        let result = self.apply_release(id).await;
        finish(RELEASES_TOTAL, "release_reservation", started, result)
    }

    async fn apply_release(&self, id: &str) -> Result<(SlotStatus, &'static str), EngineError> {
        let slot = self.registry.slot(id)?;
        let mut guard = slot.write().await;
        let now = self.clock.now_ms();
        self.expire_due(&mut guard, now);

        let outcome = match self.timers.get(id) {
            Some(reservation) if guard.status == SlotStatus::Reserved => {
                info!("{id} released (reservation {})", reservation.id);
                let event = Event::ReservationReleased {
                    slot: guard.id.clone(),
                    reservation_id: reservation.id,
                };
                self.commit(&mut guard, event, now);
                "released"
            }
            Some(_) => {
                self.timers.remove(id);
                "noop"
            }
            None => {
                debug!("release on {id}: no reservation, status {}", guard.status);
                "noop"
            }
        };
        Ok((guard.status, outcome))
    }

    /// Revert every reservation whose expiry is at or before `now`. Returns the
    /// slots that went back to FREE. Entries already cleared or refreshed by a
    /// racing writer are skipped.
    pub async fn sweep_expired(&self, now: Ms) -> Vec<SlotId> {
        let mut reaped = Vec::new();
        for (id, expires_at) in self.timers.all_live() {
            if expires_at > now {
                continue;
            }
            let Ok(slot) = self.registry.slot(id.as_str()) else {
                self.timers.remove(id.as_str());
                continue;
            };
            let mut guard = slot.write().await;
            if let Some(event) = self.expire_due(&mut guard, now) {
                reaped.push(event.slot().clone());
            }
        }
        reaped
    }
}
