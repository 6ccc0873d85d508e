// Pump relay control: a five-state machine fed by the current sensor once
// per second, with a dry-run supervisor that overrides everything else.

use crate::config::PumpConfig;
use crate::hardware::Hardware;
use log::{error, info};

/// Relay blink sequence played in the warning state, one entry per second.
/// Exhausting it shuts the pump off.
const WARNING_PATTERN: [bool; 14] = [
    false, false, true, true, true, true, false, false, true, true, true, true, true, true,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    Off,
    Idle,
    Running,
    Warning,
    DryRun,
}

impl PumpState {
    pub fn name(&self) -> &'static str {
        match self {
            PumpState::Off => "Off",
            PumpState::Idle => "Idle",
            PumpState::Running => "Running",
            PumpState::Warning => "Warning",
            PumpState::DryRun => "Dry Run",
        }
    }

    /// Numeric code used on the wire.
    pub fn code(&self) -> i8 {
        match self {
            PumpState::DryRun => -2,
            PumpState::Off => -1,
            PumpState::Idle => 0,
            PumpState::Running => 1,
            PumpState::Warning => 2,
        }
    }
}

/// Inputs consumed by the transition function.
#[derive(Debug, Clone, Copy)]
pub enum PumpEvent {
    /// One-second boundary; `load_on` is the current sensor's verdict on
    /// whether the pump is physically drawing load.
    Tick { load_on: bool },
    Enable,
    Disable,
}

pub struct PumpController {
    cfg: PumpConfig,
    state: PumpState,
    relay_on: bool,
    shutoff_timer: u32,
    warning_step: usize,
    dryrun_secs: u32,
}

impl PumpController {
    pub fn new(cfg: PumpConfig, hw: &mut dyn Hardware) -> Self {
        let mut controller = Self {
            cfg,
            state: PumpState::Off,
            relay_on: false,
            shutoff_timer: 0,
            warning_step: 0,
            dryrun_secs: 0,
        };
        controller.enter(PumpState::Off, hw);
        controller
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    pub fn relay_energized(&self) -> bool {
        self.relay_on
    }

    /// Whether a current reading means the pump is physically drawing load.
    pub fn load_on(&self, current_ma: u32) -> bool {
        current_ma > self.cfg.on_threshold_ma
    }

    /// Manual command; the only way out of the dry-run lockout.
    pub fn enable(&mut self, hw: &mut dyn Hardware) {
        self.apply(PumpEvent::Enable, hw);
    }

    pub fn disable(&mut self, hw: &mut dyn Hardware) {
        self.apply(PumpEvent::Disable, hw);
    }

    /// Run one one-second control step: dry-run supervision first (it
    /// supersedes every other transition), then the state machine. The
    /// state machine holds off until the current filter has warmed up.
    pub fn tick_second(&mut self, current_ma: u32, filter_warmed: bool, hw: &mut dyn Hardware) {
        if self.check_dry_run(current_ma, hw) {
            return;
        }
        if self.shutoff_timer > 0 {
            self.shutoff_timer -= 1;
        }
        if filter_warmed {
            let load_on = self.load_on(current_ma);
            self.apply(PumpEvent::Tick { load_on }, hw);
        }
    }

    fn apply(&mut self, event: PumpEvent, hw: &mut dyn Hardware) {
        let next = match (self.state, event) {
            (_, PumpEvent::Enable) => Some(PumpState::Idle),
            (_, PumpEvent::Disable) => Some(PumpState::Off),

            (PumpState::Idle, PumpEvent::Tick { load_on }) => {
                if load_on {
                    Some(PumpState::Running)
                } else if self.shutoff_timer == 0 {
                    Some(PumpState::Off)
                } else {
                    None
                }
            }
            (PumpState::Running, PumpEvent::Tick { load_on }) => {
                if !load_on {
                    Some(PumpState::Idle)
                } else if self.shutoff_timer == 0 {
                    Some(PumpState::Warning)
                } else {
                    None
                }
            }
            (PumpState::Warning, PumpEvent::Tick { load_on }) => {
                self.step_warning(load_on, hw);
                return;
            }
            (PumpState::Off | PumpState::DryRun, PumpEvent::Tick { .. }) => None,
        };
        if let Some(next) = next {
            self.enter(next, hw);
        }
    }

    /// Advance the blink pattern by one phase. Exhaustion shuts the pump
    /// off; a steady-energized phase with no load means demand ceased
    /// during the warning window, so the cycle is cancelled back to idle.
    fn step_warning(&mut self, load_on: bool, hw: &mut dyn Hardware) {
        self.warning_step += 1;
        let Some(&phase) = WARNING_PATTERN.get(self.warning_step) else {
            self.enter(PumpState::Off, hw);
            return;
        };
        let toggled = self.set_relay(phase, hw);
        if !toggled && self.relay_on && !load_on {
            self.enter(PumpState::Idle, hw);
        }
    }

    /// Dry-run supervision: a pump drawing load but markedly less than a
    /// pump moving water is running dry. Tolerated for the configured
    /// window, then latched into the lockout. Returns true when it forced
    /// a transition this tick.
    fn check_dry_run(&mut self, current_ma: u32, hw: &mut dyn Hardware) -> bool {
        let starved = self.relay_on
            && current_ma > self.cfg.on_threshold_ma
            && current_ma < self.cfg.dryrun_threshold_ma;
        if !starved {
            self.dryrun_secs = 0;
            return false;
        }
        self.dryrun_secs += 1;
        if self.dryrun_secs > self.cfg.dryrun_window_s {
            error!(
                "Pump starved for {}s at {} mA, locking out",
                self.dryrun_secs, current_ma
            );
            self.enter(PumpState::DryRun, hw);
            return true;
        }
        false
    }

    fn enter(&mut self, state: PumpState, hw: &mut dyn Hardware) {
        info!("Entering pump state: {}", state.name());
        match state {
            PumpState::Idle | PumpState::Running => {
                self.set_relay(true, hw);
                self.shutoff_timer = self.cfg.auto_shutoff_s;
            }
            PumpState::Warning => {
                self.warning_step = 0;
                self.set_relay(WARNING_PATTERN[0], hw);
            }
            PumpState::Off | PumpState::DryRun => {
                self.set_relay(false, hw);
                self.dryrun_secs = 0;
            }
        }
        self.state = state;
    }

    fn set_relay(&mut self, on: bool, hw: &mut dyn Hardware) -> bool {
        let toggled = self.relay_on != on;
        hw.set_pump_relay(on);
        self.relay_on = on;
        toggled
    }
}
