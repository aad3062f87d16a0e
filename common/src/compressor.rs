use crate::{
    config::Settings,
    error::{BusyReason, ControlError},
    types::CompressorState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    SystemOff,
    SafetyCutoff,
    DelayElapsed,
    Demand,
    DemandSatisfied,
    ManualToggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CompressorState,
    pub to: CompressorState,
    pub cause: TransitionCause,
}

/// Inputs for one evaluation of the machine.
#[derive(Debug, Clone, Copy)]
pub struct StepInput<'a> {
    pub settings: &'a Settings,
    pub t1: Option<f32>,
    pub demand: bool,
    pub elapsed_secs: u32,
    /// Set on the tick a manual toggle lands. Skips the demand-driven steps,
    /// and a WAIT entered by the toggle keeps its full countdown.
    pub hold_manual: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Compressor {
    state: CompressorState,
    countdown_secs: u32,
}

impl Compressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CompressorState {
        self.state
    }

    pub fn countdown_secs(&self) -> u32 {
        self.countdown_secs
    }

    pub fn is_running(&self) -> bool {
        self.state == CompressorState::On
    }

    /// Advances the machine by one tick. Rules are checked in priority order
    /// and at most one transition happens per call.
    pub fn step(&mut self, input: StepInput<'_>) -> Option<Transition> {
        let settings = input.settings;

        if !settings.system_power {
            self.countdown_secs = 0;
            return self.enter(CompressorState::Off, TransitionCause::SystemOff);
        }

        if self.state == CompressorState::On && cutoff_tripped(input.t1, settings) {
            return self.stop(settings, TransitionCause::SafetyCutoff);
        }

        match self.state {
            // Time elapsed this tick passed before the manual stop.
            CompressorState::Wait if input.hold_manual => None,
            CompressorState::Wait => {
                self.countdown_secs = self.countdown_secs.saturating_sub(input.elapsed_secs);
                if self.countdown_secs == 0 {
                    return self.enter(CompressorState::Off, TransitionCause::DelayElapsed);
                }
                None
            }
            _ if input.hold_manual => None,
            CompressorState::Off if input.demand => {
                self.enter(CompressorState::On, TransitionCause::Demand)
            }
            CompressorState::On if !input.demand => {
                self.stop(settings, TransitionCause::DemandSatisfied)
            }
            _ => None,
        }
    }

    /// Manual start/stop. A stop still pays the full restart delay.
    pub fn toggle(&mut self, settings: &Settings) -> Result<Transition, ControlError> {
        if !settings.system_power {
            return Err(ControlError::Busy(BusyReason::SystemOff));
        }

        let from = self.state;
        let to = match from {
            CompressorState::Wait => return Err(ControlError::Busy(BusyReason::RestartDelay)),
            CompressorState::On => {
                self.countdown_secs = settings.restart_delay_secs;
                CompressorState::Wait
            }
            CompressorState::Off => CompressorState::On,
        };
        self.state = to;

        Ok(Transition {
            from,
            to,
            cause: TransitionCause::ManualToggle,
        })
    }

    fn stop(&mut self, settings: &Settings, cause: TransitionCause) -> Option<Transition> {
        self.countdown_secs = settings.restart_delay_secs;
        self.enter(CompressorState::Wait, cause)
    }

    fn enter(&mut self, to: CompressorState, cause: TransitionCause) -> Option<Transition> {
        if self.state == to {
            return None;
        }
        let from = self.state;
        self.state = to;
        Some(Transition { from, to, cause })
    }
}

fn cutoff_tripped(t1: Option<f32>, settings: &Settings) -> bool {
    t1.is_some_and(|temp| temp >= settings.comp_cutoff_c)
}
