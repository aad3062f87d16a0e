use serde::{Deserialize, Serialize};

use crate::{
    history::{HISTORY_CAPACITY, HISTORY_INTERVAL_SECS},
    types::Mode,
};

pub const MIN_RESTART_DELAY_SECS: u32 = 5;
pub const MAX_RESTART_DELAY_SECS: u32 = 3_600;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub tick_interval_ms: u64,
    pub history_interval_secs: u32,
    pub history_capacity: usize,
    pub command_queue_depth: usize,
    pub http_port: u16,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            history_interval_secs: HISTORY_INTERVAL_SECS,
            history_capacity: HISTORY_CAPACITY,
            command_queue_depth: 32,
            http_port: 8080,
        }
    }
}

impl ControllerConfig {
    pub fn sanitize(&mut self) {
        self.tick_interval_ms = self.tick_interval_ms.clamp(100, 10_000);
        if self.history_interval_secs == 0 {
            self.history_interval_secs = HISTORY_INTERVAL_SECS;
        }
        if self.history_capacity == 0 {
            self.history_capacity = HISTORY_CAPACITY;
        }
        self.command_queue_depth = self.command_queue_depth.clamp(1, 1_024);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub air_setpoint_c: f32,
    pub comp_cutoff_c: f32,
    pub hysteresis_c: f32,
    pub restart_delay_secs: u32,
    pub mode: Mode,
    pub system_power: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            air_setpoint_c: 4.0,
            comp_cutoff_c: 70.0,
            hysteresis_c: 1.0,
            restart_delay_secs: 120,
            mode: Mode::Cooling,
            system_power: true,
        }
    }
}

impl Settings {
    /// Repairs values loaded from a config file. Runtime setters reject
    /// instead of repairing.
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if !self.air_setpoint_c.is_finite() {
            self.air_setpoint_c = defaults.air_setpoint_c;
        }
        if !self.comp_cutoff_c.is_finite() {
            self.comp_cutoff_c = defaults.comp_cutoff_c;
        }
        if !self.hysteresis_c.is_finite() || self.hysteresis_c < 0.0 {
            self.hysteresis_c = defaults.hysteresis_c;
        }
        self.restart_delay_secs = clamp_delay(self.restart_delay_secs);
    }
}

pub fn clamp_delay(seconds: u32) -> u32 {
    seconds.clamp(MIN_RESTART_DELAY_SECS, MAX_RESTART_DELAY_SECS)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub address: Option<String>,
    pub signal_strength_dbm: Option<i32>,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            address: None,
            signal_strength_dbm: Some(-58),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub ambient_air_c: f32,
    pub ambient_comp_c: f32,
    pub air_drift_c_per_sec: f32,
    pub comp_heat_c_per_sec: f32,
    /// Every Nth read of each sensor fails. Zero disables dropouts.
    pub dropout_every: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ambient_air_c: 18.0,
            ambient_comp_c: 25.0,
            air_drift_c_per_sec: 0.02,
            comp_heat_c_per_sec: 0.05,
            dropout_every: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub controller: ControllerConfig,
    pub settings: Settings,
    pub connectivity: ConnectivityConfig,
    pub simulation: SimulationConfig,
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        self.controller.sanitize();
        self.settings.sanitize();
    }
}
