use crate::types::{Relay, SensorId};

pub trait SensorPort {
    /// Must return within a bounded time. `None` on any read failure.
    fn read_sensor(&mut self, id: SensorId) -> Option<f32>;
}

pub trait RelayPort {
    fn set_relay(&mut self, relay: Relay, on: bool);
}
