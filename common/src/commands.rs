use crate::{
    error::ControlError,
    settings::{finite, non_negative},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    ToggleSystem,
    ToggleCompressor,
    ToggleFan,
    ToggleMode,
    SetAirSetpoint(f32),
    SetCompCutoff(f32),
    SetHysteresis(f32),
    SetDelay(u32),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ToggleSystem => "toggleSystem",
            Self::ToggleCompressor => "toggleComp",
            Self::ToggleFan => "toggleFan",
            Self::ToggleMode => "toggleMode",
            Self::SetAirSetpoint(_) => "setTemp",
            Self::SetCompCutoff(_) => "setCompTemp",
            Self::SetHysteresis(_) => "setHyst",
            Self::SetDelay(_) => "setDelay",
        }
    }

    /// Value checks that do not depend on controller state, so the boundary
    /// can reject bad input before queueing.
    pub fn validate(&self) -> Result<(), ControlError> {
        match *self {
            Self::SetAirSetpoint(value) => finite("airSetpoint", value).map(drop),
            Self::SetCompCutoff(value) => finite("compShutdown", value).map(drop),
            Self::SetHysteresis(value) => non_negative("hyst", value).map(drop),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    pub command: Command,
    pub result: Result<(), ControlError>,
}
