use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::limits::MAX_SLOT_ID_LEN;

/// Unix milliseconds, the only time type.
pub type Ms = i64;

pub const MINUTE_MS: Ms = 60_000;

/// Identifier of one physical parking bay, e.g. `A1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotId(String);

impl SlotId {
    pub fn new(id: impl Into<String>) -> Result<Self, &'static str> {
        let id = id.into();
        if id.is_empty() {
            return Err("slot id must not be empty");
        }
        if id.len() > MAX_SLOT_ID_LEN {
            return Err("slot id too long");
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err("slot id must contain only [A-Za-z0-9_-]");
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SlotId {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SlotId> for String {
    fn from(id: SlotId) -> Self {
        id.0
    }
}

impl Borrow<str> for SlotId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SlotStatus {
    #[default]
    Free,
    Reserved,
    Occupied,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Free => "FREE",
            SlotStatus::Reserved => "RESERVED",
            SlotStatus::Occupied => "OCCUPIED",
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry entry for one slot. Guarded by the slot's lock.
#[derive(Debug, Clone)]
pub struct SlotState {
    pub id: SlotId,
    pub status: SlotStatus,
    /// Last time `status` actually changed.
    pub changed_at: Ms,
}

impl SlotState {
    pub fn new(id: SlotId, now: Ms) -> Self {
        Self {
            id,
            status: SlotStatus::Free,
            changed_at: now,
        }
    }
}

/// A time-bounded hold on a slot. Lives in the timer table, keyed by slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub placed_at: Ms,
    pub expires_at: Ms,
    /// Duration as originally granted, after defaulting.
    pub duration_minutes: i64,
}

impl Reservation {
    pub fn new(placed_at: Ms, duration_minutes: i64) -> Self {
        Self {
            id: Ulid::new(),
            placed_at,
            expires_at: placed_at.saturating_add(duration_minutes.saturating_mul(MINUTE_MS)),
            duration_minutes,
        }
    }

    /// Expiry is inclusive: a reservation is dead at `expires_at`.
    pub fn is_live(&self, now: Ms) -> bool {
        self.expires_at > now
    }
}

/// Every state transition the engine applies. Also the notification payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    SlotOccupied {
        slot: SlotId,
        /// Reservation evicted by the sensor, if any.
        superseded: Option<Ulid>,
    },
    SlotVacated {
        slot: SlotId,
    },
    ReservationPlaced {
        slot: SlotId,
        reservation: Reservation,
    },
    ReservationReleased {
        slot: SlotId,
        reservation_id: Ulid,
    },
    ReservationExpired {
        slot: SlotId,
        reservation_id: Ulid,
    },
}

impl Event {
    pub fn slot(&self) -> &SlotId {
        match self {
            Event::SlotOccupied { slot, .. }
            | Event::SlotVacated { slot }
            | Event::ReservationPlaced { slot, .. }
            | Event::ReservationReleased { slot, .. }
            | Event::ReservationExpired { slot, .. } => slot,
        }
    }

    /// Status the slot is left in once this event is applied.
    pub fn resulting_status(&self) -> SlotStatus {
        match self {
            Event::SlotOccupied { .. } => SlotStatus::Occupied,
            Event::ReservationPlaced { .. } => SlotStatus::Reserved,
            Event::SlotVacated { .. }
            | Event::ReservationReleased { .. }
            | Event::ReservationExpired { .. } => SlotStatus::Free,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotInfo {
    pub id: SlotId,
    pub status: SlotStatus,
    pub changed_at: Ms,
    pub reservation: Option<Reservation>,
}

/// Aggregate counters, as shown on the lot dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct OccupancyStats {
    pub total: usize,
    pub free: usize,
    pub reserved: usize,
    pub occupied: usize,
}

impl OccupancyStats {
    pub fn record(&mut self, status: SlotStatus) {
        self.total += 1;
        match status {
            SlotStatus::Free => self.free += 1,
            SlotStatus::Reserved => self.reserved += 1,
            SlotStatus::Occupied => self.occupied += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_id_validation() {
        assert!(SlotId::new("A1").is_ok());
        assert!(SlotId::new("level-2_B14").is_ok());
        assert_eq!(SlotId::new(""), Err("slot id must not be empty"));
        assert!(SlotId::new("A 1").is_err());
        assert!(SlotId::new("x".repeat(MAX_SLOT_ID_LEN + 1)).is_err());
    }

    #[test]
    fn slot_id_deserialize_validates() {
        let ok: Vec<SlotId> = serde_json::from_str(r#"["A1","B2"]"#).unwrap();
        assert_eq!(ok[1].as_str(), "B2");
        let bad = serde_json::from_str::<Vec<SlotId>>(r#"["A1","../x"]"#);
        assert!(bad.is_err());
    }

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&SlotStatus::Reserved).unwrap(), "\"RESERVED\"");
        assert_eq!(SlotStatus::default(), SlotStatus::Free);
        assert_eq!(SlotStatus::Occupied.to_string(), "OCCUPIED");
    }

    #[test]
    fn reservation_expiry_is_inclusive() {
        let r = Reservation::new(1_000, 1);
        assert_eq!(r.expires_at, 1_000 + MINUTE_MS);
        assert!(r.is_live(r.expires_at - 1));
        assert!(!r.is_live(r.expires_at));
    }

    #[test]
    fn reservation_expiry_saturates() {
        let r = Reservation::new(1_000, i64::MAX / 2);
        assert_eq!(r.expires_at, Ms::MAX);
        assert!(r.is_live(1_000));
    }

    #[test]
    fn event_resulting_status() {
        let slot = SlotId::new("A1").unwrap();
        let placed = Event::ReservationPlaced {
            slot: slot.clone(),
            reservation: Reservation::new(0, 5),
        };
        assert_eq!(placed.resulting_status(), SlotStatus::Reserved);
        assert_eq!(placed.slot(), &slot);
        let json = serde_json::to_value(&placed).unwrap();
        assert_eq!(json["event"], "reservation_placed");
        assert_eq!(json["slot"], "A1");
    }

    #[test]
    fn stats_record() {
        let mut stats = OccupancyStats::default();
        stats.record(SlotStatus::Free);
        stats.record(SlotStatus::Occupied);
        stats.record(SlotStatus::Occupied);
        assert_eq!(
            stats,
            OccupancyStats { total: 3, free: 1, reserved: 0, occupied: 2 }
        );
    }
}
