use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyReason {
    SystemOff,
    RestartDelay,
}

impl BusyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SystemOff => "system power is off",
            Self::RestartDelay => "compressor restart delay in progress",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    #[error("invalid value {value} for {field}")]
    InvalidValue { field: &'static str, value: f32 },
    #[error("busy: {}", .0.as_str())]
    Busy(BusyReason),
}
