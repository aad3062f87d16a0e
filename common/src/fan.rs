use crate::error::{BusyReason, ControlError};

/// Evaporator fan relay. Runs independently of the thermostat; only master
/// power constrains it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fan {
    on: bool,
}

impl Fan {
    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn toggle(&mut self, system_power: bool) -> Result<bool, ControlError> {
        if !system_power {
            return Err(ControlError::Busy(BusyReason::SystemOff));
        }
        self.on = !self.on;
        Ok(self.on)
    }

    /// Forces the relay off while master power is off. Returns `true` if the
    /// relay was switched.
    pub fn enforce(&mut self, system_power: bool) -> bool {
        if !system_power && self.on {
            self.on = false;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_while_powered() {
        let mut fan = Fan::default();
        assert_eq!(fan.toggle(true), Ok(true));
        assert_eq!(fan.toggle(true), Ok(false));
    }

    #[test]
    fn power_off_forces_fan_off_and_blocks_toggle() {
        let mut fan = Fan::default();
        fan.toggle(true).unwrap();

        assert!(fan.enforce(false));
        assert!(!fan.is_on());
        assert_eq!(
            fan.toggle(false),
            Err(ControlError::Busy(BusyReason::SystemOff))
        );
        assert!(!fan.is_on());
        assert!(!fan.enforce(false));
    }
}
