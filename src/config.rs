use std::collections::HashSet;
use std::path::Path;

use crate::limits::*;
use crate::model::SlotId;

/// Rows and bays of the default garage layout (`A1`..`D14`).
const DEFAULT_ROWS: [char; 4] = ['A', 'B', 'C', 'D'];
const DEFAULT_BAYS_PER_ROW: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub slots: Vec<SlotId>,
    pub default_reservation_minutes: i64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    EmptySlotSet,
    DuplicateSlot(String),
    InvalidSlotId { id: String, reason: &'static str },
    TooManySlots(usize),
    InvalidDuration(String),
    SlotsFile { path: String, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EmptySlotSet => write!(f, "no slots configured"),
            ConfigError::DuplicateSlot(id) => write!(f, "duplicate slot id: {id}"),
            ConfigError::InvalidSlotId { id, reason } => {
                write!(f, "invalid slot id {id:?}: {reason}")
            }
            ConfigError::TooManySlots(n) => {
                write!(f, "{n} slots configured, limit is {MAX_SLOTS}")
            }
            ConfigError::InvalidDuration(raw) => write!(
                f,
                "default reservation must be 1..={MAX_RESERVATION_MINUTES} minutes, got {raw:?}"
            ),
            ConfigError::SlotsFile { path, reason } => {
                write!(f, "cannot load slots file {path}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slots: default_layout(),
            default_reservation_minutes: DEFAULT_RESERVATION_MINUTES,
        }
    }
}

impl EngineConfig {
    pub fn new(slots: Vec<SlotId>, default_reservation_minutes: i64) -> Result<Self, ConfigError> {
        if slots.is_empty() {
            return Err(ConfigError::EmptySlotSet);
        }
        if slots.len() > MAX_SLOTS {
            return Err(ConfigError::TooManySlots(slots.len()));
        }
        let mut seen = HashSet::with_capacity(slots.len());
        for id in &slots {
            if !seen.insert(id.as_str()) {
                return Err(ConfigError::DuplicateSlot(id.to_string()));
            }
        }
        if !(1..=MAX_RESERVATION_MINUTES).contains(&default_reservation_minutes) {
            return Err(ConfigError::InvalidDuration(default_reservation_minutes.to_string()));
        }
        Ok(Self {
            slots,
            default_reservation_minutes,
        })
    }

    /// Build from raw string ids, validating each.
    pub fn from_ids<I, S>(ids: I, default_reservation_minutes: i64) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slots = ids
            .into_iter()
            .map(|raw| {
                let raw: String = raw.into();
                SlotId::new(raw.clone()).map_err(|reason| ConfigError::InvalidSlotId { id: raw, reason })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(slots, default_reservation_minutes)
    }

    /// Read `PARKWAY_SLOTS`, `PARKWAY_SLOTS_FILE` and
    /// `PARKWAY_DEFAULT_RESERVATION_MINUTES` from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let minutes = match var("PARKWAY_DEFAULT_RESERVATION_MINUTES") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::InvalidDuration(raw.clone()))?,
            None => DEFAULT_RESERVATION_MINUTES,
        };

        if let Some(list) = var("PARKWAY_SLOTS") {
            return Self::from_ids(parse_slot_list(&list), minutes);
        }
        if let Some(path) = var("PARKWAY_SLOTS_FILE") {
            return Self::new(load_slots_file(Path::new(&path))?, minutes);
        }
        Self::new(default_layout(), minutes)
    }
}

/// `"A1, A2,,B1"` → `["A1", "A2", "B1"]`.
pub fn parse_slot_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// JSON array of slot ids.
pub fn load_slots_file(path: &Path) -> Result<Vec<SlotId>, ConfigError> {
    let file_err = |reason: String| ConfigError::SlotsFile {
        path: path.display().to_string(),
        reason,
    };
    let text = std::fs::read_to_string(path).map_err(|e| file_err(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| file_err(e.to_string()))
}

pub fn default_layout() -> Vec<SlotId> {
    DEFAULT_ROWS
        .iter()
        .flat_map(|row| (1..=DEFAULT_BAYS_PER_ROW).map(move |bay| format!("{row}{bay}")))
        .filter_map(|id| SlotId::new(id).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_layout_is_four_rows_of_fourteen() {
        let layout = default_layout();
        assert_eq!(layout.len(), 56);
        assert_eq!(layout[0].as_str(), "A1");
        assert_eq!(layout[13].as_str(), "A14");
        assert_eq!(layout[55].as_str(), "D14");
    }

    #[test]
    fn env_defaults() {
        let cfg = EngineConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.default_reservation_minutes, DEFAULT_RESERVATION_MINUTES);
    }

    #[test]
    fn env_slot_list_and_duration() {
        let cfg = EngineConfig::from_vars(vars(&[
            ("PARKWAY_SLOTS", " A1, B2 ,,C3"),
            ("PARKWAY_DEFAULT_RESERVATION_MINUTES", "45"),
        ]))
        .unwrap();
        let ids: Vec<&str> = cfg.slots.iter().map(|s| s.as_str()).collect();
        assert_eq!(ids, vec!["A1", "B2", "C3"]);
        assert_eq!(cfg.default_reservation_minutes, 45);
    }

    #[test]
    fn env_rejects_bad_duration() {
        let err = EngineConfig::from_vars(vars(&[("PARKWAY_DEFAULT_RESERVATION_MINUTES", "soon")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidDuration("soon".into()));

        let err = EngineConfig::from_vars(vars(&[("PARKWAY_DEFAULT_RESERVATION_MINUTES", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDuration(_)));
    }

    #[test]
    fn rejects_duplicates_and_empty() {
        assert_eq!(
            EngineConfig::from_ids(["A1", "A1"], 20),
            Err(ConfigError::DuplicateSlot("A1".into()))
        );
        assert_eq!(
            EngineConfig::from_ids(Vec::<String>::new(), 20),
            Err(ConfigError::EmptySlotSet)
        );
        assert_eq!(
            EngineConfig::from_vars(vars(&[("PARKWAY_SLOTS", " , ")])),
            Err(ConfigError::EmptySlotSet)
        );
    }

    #[test]
    fn rejects_invalid_slot_id() {
        let err = EngineConfig::from_ids(["A1", "B 2"], 20).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSlotId { ref id, .. } if id == "B 2"));
        assert!(err.to_string().contains("B 2"));
    }

    #[test]
    fn slots_file() {
        let dir = std::env::temp_dir().join("parkway_test_config");
        std::fs::create_dir_all(&dir).unwrap();

        let good = dir.join("slots.json");
        std::fs::write(&good, r#"["P1", "P2", "P3"]"#).unwrap();
        let cfg = EngineConfig::from_vars(vars(&[(
            "PARKWAY_SLOTS_FILE",
            good.to_str().unwrap(),
        )]))
        .unwrap();
        assert_eq!(cfg.slots.len(), 3);

        let bad = dir.join("bad_slots.json");
        std::fs::write(&bad, r#"{"slots": 3}"#).unwrap();
        let err = load_slots_file(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::SlotsFile { .. }));

        let missing = load_slots_file(&dir.join("missing.json")).unwrap_err();
        assert!(missing.to_string().starts_with("cannot load slots file"));
    }

    #[test]
    fn slot_list_wins_over_file() {
        let cfg = EngineConfig::from_vars(vars(&[
            ("PARKWAY_SLOTS", "X1"),
            ("PARKWAY_SLOTS_FILE", "/nonexistent/slots.json"),
        ]))
        .unwrap();
        assert_eq!(cfg.slots.len(), 1);
    }
}
