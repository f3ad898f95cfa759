#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Identifier outside the configured slot set.
    UnknownSlot(String),
    /// Reservation requested against an occupied slot.
    SlotUnavailable(String),
    InvalidInput(String),
}

impl EngineError {
    /// Every engine error is the caller's fault; transports map these to 4xx.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EngineError::UnknownSlot(_)
                | EngineError::SlotUnavailable(_)
                | EngineError::InvalidInput(_)
        )
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::UnknownSlot(_) => "unknown_slot",
            EngineError::SlotUnavailable(_) => "slot_unavailable",
            EngineError::InvalidInput(_) => "invalid_input",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::UnknownSlot(id) => write!(f, "unknown slot: {id}"),
            EngineError::SlotUnavailable(id) => {
                write!(f, "slot {id} is occupied and cannot be reserved")
            }
            EngineError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
