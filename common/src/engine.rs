use crate::{
    commands::Command,
    compressor::{Compressor, StepInput, Transition},
    config::{ControllerConfig, Settings},
    error::ControlError,
    fan::Fan,
    history::{HistoryRing, HistorySampler},
    settings::SettingsStore,
    thermostat,
    types::{
        format_uptime, on_off, CompressorState, ConnectivityInfo, HistorySample, Relay,
        SensorReading, StatusSnapshot,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineAction {
    CompressorOn,
    CompressorOff,
    FanOn,
    FanOff,
}

impl EngineAction {
    fn for_relay(relay: Relay, on: bool) -> Self {
        match (relay, on) {
            (Relay::Compressor, true) => Self::CompressorOn,
            (Relay::Compressor, false) => Self::CompressorOff,
            (Relay::Fan, true) => Self::FanOn,
            (Relay::Fan, false) => Self::FanOff,
        }
    }

    pub fn relay(self) -> (Relay, bool) {
        match self {
            Self::CompressorOn => (Relay::Compressor, true),
            Self::CompressorOff => (Relay::Compressor, false),
            Self::FanOn => (Relay::Fan, true),
            Self::FanOff => (Relay::Fan, false),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub transition: Option<Transition>,
    pub actions: Vec<EngineAction>,
    pub sampled: Option<HistorySample>,
}

#[derive(Debug, Clone, Copy, Default)]
struct DrivenRelays {
    compressor: bool,
    fan: bool,
}

/// All mutable control state. Commands go through [`apply_command`], time
/// goes through [`tick`]; nothing else mutates it.
///
/// [`apply_command`]: ControllerEngine::apply_command
/// [`tick`]: ControllerEngine::tick
#[derive(Debug, Clone)]
pub struct ControllerEngine {
    settings: SettingsStore,
    compressor: Compressor,
    fan: Fan,

    demand: bool,
    // Set by a manual compressor toggle; consumed by the next tick.
    manual_hold: bool,

    reading: SensorReading,
    history: HistoryRing,
    sampler: HistorySampler,

    driven: DrivenRelays,
}

impl ControllerEngine {
    pub fn new(config: &ControllerConfig, settings: Settings) -> Self {
        Self {
            settings: SettingsStore::new(settings),
            compressor: Compressor::new(),
            fan: Fan::default(),
            demand: false,
            manual_hold: false,
            reading: SensorReading::default(),
            history: HistoryRing::new(config.history_capacity),
            sampler: HistorySampler::new(config.history_interval_secs),
            driven: DrivenRelays::default(),
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings.get()
    }

    pub fn compressor_state(&self) -> CompressorState {
        self.compressor.state()
    }

    pub fn countdown_secs(&self) -> u32 {
        self.compressor.countdown_secs()
    }

    pub fn is_fan_on(&self) -> bool {
        self.fan.is_on()
    }

    pub fn demand(&self) -> bool {
        self.demand
    }

    pub fn reading(&self) -> SensorReading {
        self.reading
    }

    pub fn history(&self) -> Vec<HistorySample> {
        self.history.snapshot()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn apply_command(&mut self, command: Command) -> Result<(), ControlError> {
        command.validate()?;

        match command {
            Command::ToggleSystem => {
                self.settings.toggle_system_power();
            }
            Command::ToggleCompressor => {
                let transition = self.compressor.toggle(&self.settings.get())?;
                self.demand = transition.to == CompressorState::On;
                self.manual_hold = true;
            }
            Command::ToggleFan => {
                self.fan.toggle(self.settings.get().system_power)?;
            }
            Command::ToggleMode => {
                self.settings.toggle_mode();
            }
            Command::SetAirSetpoint(value) => {
                self.settings.set_air_setpoint(value)?;
            }
            Command::SetCompCutoff(value) => {
                self.settings.set_comp_cutoff(value)?;
            }
            Command::SetHysteresis(value) => {
                self.settings.set_hysteresis(value)?;
            }
            Command::SetDelay(seconds) => {
                self.settings.set_delay(seconds);
            }
        }
        Ok(())
    }

    pub fn tick(&mut self, reading: SensorReading, elapsed_secs: u32) -> TickOutcome {
        let settings = self.settings.get();
        self.reading = reading;

        if !settings.system_power {
            self.fan.enforce(false);
            self.demand = false;
            self.manual_hold = false;
        } else if !self.manual_hold {
            self.demand = thermostat::demand(self.demand, reading.t2, &settings);
        }

        let transition = self.compressor.step(StepInput {
            settings: &settings,
            t1: reading.t1,
            demand: self.demand,
            elapsed_secs,
            hold_manual: self.manual_hold,
        });
        self.manual_hold = false;

        let actions = self.sync_relays();

        let sampled = self.sampler.advance(elapsed_secs).then(|| {
            let sample = HistorySample::from(reading);
            self.history.append(sample);
            sample
        });

        TickOutcome {
            transition,
            actions,
            sampled,
        }
    }

    pub fn snapshot(&self, connectivity: &ConnectivityInfo) -> StatusSnapshot {
        let settings = self.settings.get();
        StatusSnapshot {
            system: on_off(settings.system_power),
            comp_state: self.compressor.state().as_str(),
            countdown: self.compressor.countdown_secs(),
            fan: on_off(self.fan.is_on()),
            mode: settings.mode.as_str(),
            demand: self.demand,
            t1: self.reading.t1,
            t2: self.reading.t2,
            comp_shutdown: settings.comp_cutoff_c,
            air_setpoint: settings.air_setpoint_c,
            hyst: settings.hysteresis_c,
            delay: settings.restart_delay_secs,
            ip: connectivity.address.clone(),
            rssi: connectivity.signal_strength_dbm,
            uptime: format_uptime(connectivity.uptime_secs),
            uptime_secs: connectivity.uptime_secs,
        }
    }

    fn sync_relays(&mut self) -> Vec<EngineAction> {
        let mut actions = Vec::new();

        let compressor = self.compressor.is_running();
        if compressor != self.driven.compressor {
            actions.push(EngineAction::for_relay(Relay::Compressor, compressor));
            self.driven.compressor = compressor;
        }

        let fan = self.fan.is_on();
        if fan != self.driven.fan {
            actions.push(EngineAction::for_relay(Relay::Fan, fan));
            self.driven.fan = fan;
        }

        actions
    }
}
