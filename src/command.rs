//! Boundary normalization. Raw status strings and durations from callers are
//! turned into typed commands here, once; the engine never sees strings.

use std::str::FromStr;

use serde::Serialize;

use crate::engine::{Engine, EngineError};
use crate::model::*;
use crate::observability::{command_label, COMMANDS_TOTAL};

/// Who sent the update. Sensors and users may use the same vocabulary but
/// mean different things by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Sensor,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorReading {
    Occupied,
    Free,
}

impl SensorReading {
    pub fn is_occupied(&self) -> bool {
        matches!(self, SensorReading::Occupied)
    }
}

impl FromStr for SensorReading {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match normalize(raw).as_str() {
            "OCCUPIED" => Ok(SensorReading::Occupied),
            "FREE" | "EMPTY" => Ok(SensorReading::Free),
            _ => Err(EngineError::InvalidInput(format!("unknown sensor status {raw:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotCommand {
    Sensor { occupied: bool },
    Reserve { duration_minutes: Option<i64> },
    Release,
}

impl SlotCommand {
    /// Map a posted `status` onto an engine operation.
    ///
    /// Users may ask for `RESERVED` or hand a slot back with `FREE`/`EMPTY`;
    /// only sensors may report `OCCUPIED`.
    pub fn parse(
        origin: Origin,
        status: &str,
        duration_minutes: Option<i64>,
    ) -> Result<Self, EngineError> {
        match origin {
            Origin::Sensor => {
                let reading: SensorReading = status.parse()?;
                Ok(SlotCommand::Sensor { occupied: reading.is_occupied() })
            }
            Origin::User => match normalize(status).as_str() {
                "RESERVED" => Ok(SlotCommand::Reserve { duration_minutes }),
                "FREE" | "EMPTY" => Ok(SlotCommand::Release),
                "OCCUPIED" => Err(EngineError::InvalidInput(
                    "occupancy can only be reported by a sensor".into(),
                )),
                _ => Err(EngineError::InvalidInput(format!("unknown status {status:?}"))),
            },
        }
    }
}

/// Parse an optional textual duration in minutes. Blank means "not given".
pub fn parse_duration_minutes(raw: Option<&str>) -> Result<Option<i64>, EngineError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| EngineError::InvalidInput(format!("malformed duration {raw:?}")))
}

fn normalize(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Confirmation payload for a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotUpdate {
    pub slot: SlotId,
    pub status: SlotStatus,
    pub reservation: Option<Reservation>,
}

impl Engine {
    pub async fn apply(&self, id: &str, cmd: SlotCommand) -> Result<SlotUpdate, EngineError> {
        let label = command_label(&cmd);
        let result = self.dispatch(id, cmd).await;
        let status = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        metrics::counter!(COMMANDS_TOTAL, "command" => label, "status" => status).increment(1);
        result
    }

    async fn dispatch(&self, id: &str, cmd: SlotCommand) -> Result<SlotUpdate, EngineError> {
        let (status, reservation) = match cmd {
            SlotCommand::Sensor { occupied } => self.sensor_update(id, occupied).await?,
            SlotCommand::Reserve { duration_minutes } => {
                let reservation = self.request_reservation(id, duration_minutes).await?;
                (SlotStatus::Reserved, Some(reservation))
            }
            SlotCommand::Release => (self.release_reservation(id).await?, None),
        };
        let slot = SlotId::new(id).map_err(|reason| EngineError::InvalidInput(reason.into()))?;
        Ok(SlotUpdate { slot, status, reservation })
    }
}
