use crate::{
    commands::{Command, CommandOutcome},
    compressor::Transition,
    config::{ControllerConfig, Settings},
    engine::{ControllerEngine, EngineAction},
    ports::{RelayPort, SensorPort},
    types::{
        CompressorState, ConnectivityInfo, HistorySample, Relay, SensorId, SensorReading,
        StatusSnapshot,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub elapsed_secs: u32,
    pub outcomes: Vec<CommandOutcome>,
    pub transition: Option<Transition>,
    pub actions: Vec<EngineAction>,
    pub sampled: Option<HistorySample>,
    pub snapshot: StatusSnapshot,
}

/// Turns a monotonic millisecond clock into whole elapsed seconds, carrying
/// the remainder so no time is lost between ticks.
#[derive(Debug, Clone, Default)]
struct TickClock {
    last_ms: Option<u64>,
    carry_ms: u64,
}

impl TickClock {
    fn elapsed_secs(&mut self, now_ms: u64) -> u32 {
        let Some(last_ms) = self.last_ms.replace(now_ms) else {
            return 0;
        };
        self.carry_ms += now_ms.saturating_sub(last_ms);
        let secs = self.carry_ms / 1_000;
        self.carry_ms %= 1_000;
        u32::try_from(secs).unwrap_or(u32::MAX)
    }

    /// Drops the sub-second carry so the next whole second is counted from
    /// the last tick.
    fn restart_carry(&mut self) {
        self.carry_ms = 0;
    }
}

pub struct ControlScheduler<H> {
    engine: ControllerEngine,
    hardware: H,
    clock: TickClock,
}

impl<H: SensorPort + RelayPort> ControlScheduler<H> {
    /// Drives both relays off so hardware starts in the engine's initial
    /// state.
    pub fn new(config: &ControllerConfig, settings: Settings, mut hardware: H) -> Self {
        hardware.set_relay(Relay::Compressor, false);
        hardware.set_relay(Relay::Fan, false);
        Self {
            engine: ControllerEngine::new(config, settings),
            hardware,
            clock: TickClock::default(),
        }
    }

    pub fn engine(&self) -> &ControllerEngine {
        &self.engine
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    pub fn history(&self) -> Vec<HistorySample> {
        self.engine.history()
    }

    /// Drains `commands`, reads both sensors, advances the engine and pushes
    /// relay changes to the hardware.
    pub fn tick<I>(
        &mut self,
        now_ms: u64,
        commands: I,
        connectivity: &ConnectivityInfo,
    ) -> TickReport
    where
        I: IntoIterator<Item = Command>,
    {
        let elapsed_secs = self.clock.elapsed_secs(now_ms);
        let was_waiting = self.engine.compressor_state() == CompressorState::Wait;

        let outcomes = commands
            .into_iter()
            .map(|command| CommandOutcome {
                command,
                result: self.engine.apply_command(command),
            })
            .collect();

        let reading = SensorReading::new(
            self.hardware.read_sensor(SensorId::Compressor),
            self.hardware.read_sensor(SensorId::Air),
        );

        let outcome = self.engine.tick(reading, elapsed_secs);
        if !was_waiting && self.engine.compressor_state() == CompressorState::Wait {
            // The restart countdown starts at this tick.
            self.clock.restart_carry();
        }
        for action in &outcome.actions {
            let (relay, on) = action.relay();
            self.hardware.set_relay(relay, on);
        }

        TickReport {
            elapsed_secs,
            outcomes,
            transition: outcome.transition,
            actions: outcome.actions,
            sampled: outcome.sampled,
            snapshot: self.engine.snapshot(connectivity),
        }
    }
}
