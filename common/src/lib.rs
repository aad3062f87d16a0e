pub mod commands;
pub mod compressor;
pub mod config;
pub mod engine;
pub mod error;
pub mod fan;
pub mod history;
pub mod ports;
pub mod scheduler;
pub mod settings;
pub mod thermostat;
pub mod types;

pub use commands::{Command, CommandOutcome};
pub use compressor::{Compressor, Transition, TransitionCause};
pub use config::{ConnectivityConfig, ControllerConfig, RuntimeConfig, Settings, SimulationConfig};
pub use engine::{ControllerEngine, EngineAction, TickOutcome};
pub use error::{BusyReason, ControlError};
pub use history::{HistoryRing, HistorySampler, HISTORY_CAPACITY, HISTORY_INTERVAL_SECS};
pub use ports::{RelayPort, SensorPort};
pub use scheduler::{ControlScheduler, TickReport};
pub use settings::SettingsStore;
pub use types::{
    CompressorState, ConnectivityInfo, HistorySample, Mode, Relay, SensorId, SensorReading,
    StatusSnapshot,
};
