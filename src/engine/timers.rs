use dashmap::DashMap;

use crate::model::*;

/// Expiry bookkeeping for reserved slots. No policy lives here; the engine
/// only writes an entry while holding that slot's write lock.
pub struct ReservationTimers {
    entries: DashMap<SlotId, Reservation>,
}

impl Default for ReservationTimers {
    fn default() -> Self {
        Self::new()
    }
}

impl ReservationTimers {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Insert or overwrite. Returns the replaced reservation.
    pub fn put(&self, id: SlotId, reservation: Reservation) -> Option<Reservation> {
        self.entries.insert(id, reservation)
    }

    pub fn remove(&self, id: &str) -> Option<Reservation> {
        self.entries.remove(id).map(|(_, r)| r)
    }

    pub fn get(&self, id: &str) -> Option<Reservation> {
        self.entries.get(id).map(|e| *e.value())
    }

    pub fn expiry_of(&self, id: &str) -> Option<Ms> {
        self.entries.get(id).map(|e| e.value().expires_at)
    }

    /// Every entry currently held, expired or not.
    pub fn all_live(&self) -> Vec<(SlotId, Ms)> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().expires_at))
            .collect()
    }

    pub fn due(&self, now: Ms) -> Vec<SlotId> {
        self.entries
            .iter()
            .filter(|e| e.value().expires_at <= now)
            .map(|e| e.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(id: &str) -> SlotId {
        SlotId::new(id).unwrap()
    }

    #[test]
    fn put_overwrites_instead_of_stacking() {
        let timers = ReservationTimers::new();
        let first = Reservation::new(0, 10);
        let second = Reservation::new(0, 30);
        assert!(timers.put(slot("A1"), first).is_none());
        assert_eq!(timers.put(slot("A1"), second), Some(first));
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.expiry_of("A1"), Some(30 * MINUTE_MS));
    }

    #[test]
    fn remove_missing_is_none() {
        let timers = ReservationTimers::new();
        assert!(timers.remove("A1").is_none());
        assert!(timers.is_empty());
    }

    #[test]
    fn due_includes_exact_expiry() {
        let timers = ReservationTimers::new();
        timers.put(slot("A1"), Reservation::new(0, 1));
        timers.put(slot("A2"), Reservation::new(0, 5));
        assert!(timers.due(MINUTE_MS - 1).is_empty());
        assert_eq!(timers.due(MINUTE_MS), vec![slot("A1")]);
        let mut live = timers.all_live();
        live.sort();
        assert_eq!(
            live,
            vec![(slot("A1"), MINUTE_MS), (slot("A2"), 5 * MINUTE_MS)]
        );
    }
}
