use std::time::Instant;

use compressor_common::{Relay, RelayPort, SensorId, SensorPort, SimulationConfig};

// Temperatures the plant settles at with the compressor running.
const COOLED_AIR_OFFSET_C: f32 = -20.0;
const HOT_COMPRESSOR_OFFSET_C: f32 = 60.0;
const FAN_RATE_FACTOR: f32 = 1.5;

#[derive(Debug)]
pub struct SimulatedPlant {
    config: SimulationConfig,
    air_c: f32,
    compressor_c: f32,
    compressor_on: bool,
    fan_on: bool,
    reads: u64,
    last_update: Option<Instant>,
}

impl SimulatedPlant {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            air_c: config.ambient_air_c,
            compressor_c: config.ambient_comp_c,
            config,
            compressor_on: false,
            fan_on: false,
            reads: 0,
            last_update: None,
        }
    }

    pub fn air_c(&self) -> f32 {
        self.air_c
    }

    pub fn compressor_c(&self) -> f32 {
        self.compressor_c
    }

    pub fn is_compressor_on(&self) -> bool {
        self.compressor_on
    }

    pub fn is_fan_on(&self) -> bool {
        self.fan_on
    }

    pub fn advance_by(&mut self, dt_secs: f32) {
        let air_target = if self.compressor_on {
            self.config.ambient_air_c + COOLED_AIR_OFFSET_C
        } else {
            self.config.ambient_air_c
        };
        let air_rate = if self.fan_on {
            self.config.air_drift_c_per_sec * FAN_RATE_FACTOR
        } else {
            self.config.air_drift_c_per_sec
        };
        self.air_c = approach(self.air_c, air_target, air_rate * dt_secs);

        let compressor_target = if self.compressor_on {
            self.config.ambient_comp_c + HOT_COMPRESSOR_OFFSET_C
        } else {
            self.config.ambient_comp_c
        };
        self.compressor_c = approach(
            self.compressor_c,
            compressor_target,
            self.config.comp_heat_c_per_sec * dt_secs,
        );
    }

    fn advance_to_now(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_update.replace(now) {
            self.advance_by(now.duration_since(last).as_secs_f32());
        }
    }

    fn dropped(&self) -> bool {
        self.config.dropout_every > 0 && self.reads % self.config.dropout_every == 0
    }
}

impl SensorPort for SimulatedPlant {
    fn read_sensor(&mut self, id: SensorId) -> Option<f32> {
        if id == SensorId::Compressor {
            self.advance_to_now();
        }

        self.reads = self.reads.wrapping_add(1);
        if self.dropped() {
            return None;
        }

        match id {
            SensorId::Compressor => Some(self.compressor_c),
            SensorId::Air => Some(self.air_c),
        }
    }
}

impl RelayPort for SimulatedPlant {
    fn set_relay(&mut self, relay: Relay, on: bool) {
        match relay {
            Relay::Compressor => self.compressor_on = on,
            Relay::Fan => self.fan_on = on,
        }
    }
}

fn approach(current: f32, target: f32, max_step: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_step {
        target
    } else {
        current + max_step.copysign(delta)
    }
}
