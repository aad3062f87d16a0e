use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Mode {
    #[default]
    Cooling,
    Heating,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cooling => "Cooling",
            Self::Heating => "Heating",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Cooling => Self::Heating,
            Self::Heating => Self::Cooling,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompressorState {
    #[default]
    Off,
    Wait,
    On,
}

impl CompressorState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Wait => "WAIT",
            Self::On => "ON",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorId {
    /// Compressor body temperature (T1).
    Compressor,
    /// Return air temperature (T2).
    Air,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relay {
    Compressor,
    Fan,
}

/// One tick's worth of sensor data. `None` means the read failed this tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReading {
    pub t1: Option<f32>,
    pub t2: Option<f32>,
}

impl SensorReading {
    pub fn new(t1: Option<f32>, t2: Option<f32>) -> Self {
        Self {
            t1: t1.filter(|value| value.is_finite()),
            t2: t2.filter(|value| value.is_finite()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct HistorySample {
    pub t1: Option<f32>,
    pub t2: Option<f32>,
}

impl From<SensorReading> for HistorySample {
    fn from(reading: SensorReading) -> Self {
        Self {
            t1: reading.t1,
            t2: reading.t2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConnectivityInfo {
    pub address: String,
    pub signal_strength_dbm: Option<i32>,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub system: &'static str,
    #[serde(rename = "compState")]
    pub comp_state: &'static str,
    pub countdown: u32,
    pub fan: &'static str,
    pub mode: &'static str,
    pub demand: bool,
    pub t1: Option<f32>,
    pub t2: Option<f32>,
    #[serde(rename = "compShutdown")]
    pub comp_shutdown: f32,
    #[serde(rename = "airSetpoint")]
    pub air_setpoint: f32,
    pub hyst: f32,
    pub delay: u32,
    pub ip: String,
    pub rssi: Option<i32>,
    pub uptime: String,
    #[serde(rename = "uptimeSecs")]
    pub uptime_secs: u64,
}

impl StatusSnapshot {
    pub fn is_system_on(&self) -> bool {
        self.system == "ON"
    }

    pub fn is_waiting(&self) -> bool {
        self.comp_state == CompressorState::Wait.as_str()
    }
}

pub fn on_off(value: bool) -> &'static str {
    if value {
        "ON"
    } else {
        "OFF"
    }
}

pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    let seconds = secs % 60;
    format!("{days}d {hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn uptime_formats_days_and_clock() {
        assert_eq!(format_uptime(0), "0d 00:00:00");
        assert_eq!(format_uptime(93_784), "1d 02:03:04");
    }

    #[test]
    fn non_finite_readings_become_gaps() {
        let reading = SensorReading::new(Some(f32::NAN), Some(21.5));
        assert_eq!(reading.t1, None);
        assert_eq!(reading.t2, Some(21.5));
    }

    #[test]
    fn mode_toggles_between_cooling_and_heating() {
        assert_eq!(Mode::Cooling.toggled(), Mode::Heating);
        assert_eq!(Mode::Heating.toggled(), Mode::Cooling);
    }
}
