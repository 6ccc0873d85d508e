// Hardware abstraction for the controller core. The core only ever touches
// these four primitive operations; pin wiring, buses and drivers live with
// the platform integration.

pub mod mock;

pub trait Hardware {
    /// Raw ADC reading of the current-sense channel. The channel is
    /// inverted: full scale means no current. Absent hardware should read
    /// full scale, which the calibration maps to 0 mA ("pump not running").
    fn read_current_raw(&mut self) -> u16;

    /// Fire one ultrasonic ranging pulse and measure the echo round trip
    /// in microseconds. Returns 0 when no echo came back in time.
    fn ranging_pulse_us(&mut self) -> u32;

    /// Drive the pump relay.
    fn set_pump_relay(&mut self, energized: bool);

    /// Raw manual-button level, true while pressed.
    fn button_pressed(&mut self) -> bool;
}
