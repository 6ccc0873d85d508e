// Scripted hardware double for unit tests.

use super::Hardware;
use std::collections::VecDeque;

/// Returns scripted values while a script is queued, then falls back to the
/// fixed `current_raw` / `pulse_us` fields. Defaults model absent hardware:
/// full-scale ADC (no current) and no echo.
pub struct MockHardware {
    pub current_raw: u16,
    pub pulse_us: u32,
    pub button: bool,
    current_script: VecDeque<u16>,
    pulse_script: VecDeque<u32>,
    relay: bool,
    relay_writes: usize,
}

impl MockHardware {
    pub fn new() -> Self {
        Self {
            current_raw: 1024,
            pulse_us: 0,
            button: false,
            current_script: VecDeque::new(),
            pulse_script: VecDeque::new(),
            relay: false,
            relay_writes: 0,
        }
    }

    pub fn script_current(&mut self, raw: impl IntoIterator<Item = u16>) {
        self.current_script.extend(raw);
    }

    pub fn script_pulses(&mut self, durations: impl IntoIterator<Item = u32>) {
        self.pulse_script.extend(durations);
    }

    pub fn relay_energized(&self) -> bool {
        self.relay
    }

    pub fn relay_writes(&self) -> usize {
        self.relay_writes
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl Hardware for MockHardware {
    fn read_current_raw(&mut self) -> u16 {
        self.current_script.pop_front().unwrap_or(self.current_raw)
    }

    fn ranging_pulse_us(&mut self) -> u32 {
        self.pulse_script.pop_front().unwrap_or(self.pulse_us)
    }

    fn set_pump_relay(&mut self, energized: bool) {
        self.relay = energized;
        self.relay_writes += 1;
    }

    fn button_pressed(&mut self) -> bool {
        self.button
    }
}
