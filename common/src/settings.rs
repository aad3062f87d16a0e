use crate::{
    config::{clamp_delay, Settings},
    error::ControlError,
    types::Mode,
};

/// Owns the live [`Settings`]. Every setter reports whether the stored value
/// changed, so repeating a command is a no-op.
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    settings: Settings,
}

impl SettingsStore {
    pub fn new(mut settings: Settings) -> Self {
        settings.sanitize();
        Self { settings }
    }

    pub fn get(&self) -> Settings {
        self.settings
    }

    pub fn set_air_setpoint(&mut self, value: f32) -> Result<bool, ControlError> {
        let value = finite("airSetpoint", value)?;
        Ok(replace(&mut self.settings.air_setpoint_c, value))
    }

    pub fn set_comp_cutoff(&mut self, value: f32) -> Result<bool, ControlError> {
        let value = finite("compShutdown", value)?;
        Ok(replace(&mut self.settings.comp_cutoff_c, value))
    }

    pub fn set_hysteresis(&mut self, value: f32) -> Result<bool, ControlError> {
        let value = non_negative("hyst", value)?;
        Ok(replace(&mut self.settings.hysteresis_c, value))
    }

    pub fn set_delay(&mut self, seconds: u32) -> bool {
        replace(&mut self.settings.restart_delay_secs, clamp_delay(seconds))
    }

    pub fn set_mode(&mut self, mode: Mode) -> bool {
        replace(&mut self.settings.mode, mode)
    }

    pub fn toggle_mode(&mut self) -> Mode {
        self.settings.mode = self.settings.mode.toggled();
        self.settings.mode
    }

    pub fn set_system_power(&mut self, on: bool) -> bool {
        replace(&mut self.settings.system_power, on)
    }

    pub fn toggle_system_power(&mut self) -> bool {
        self.settings.system_power = !self.settings.system_power;
        self.settings.system_power
    }
}

pub(crate) fn finite(field: &'static str, value: f32) -> Result<f32, ControlError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ControlError::InvalidValue { field, value })
    }
}

pub(crate) fn non_negative(field: &'static str, value: f32) -> Result<f32, ControlError> {
    let value = finite(field, value)?;
    if value < 0.0 {
        return Err(ControlError::InvalidValue { field, value });
    }
    Ok(value)
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
