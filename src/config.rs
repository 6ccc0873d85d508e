use serde::{Deserialize, Serialize};

/// Controller configuration, built once at startup and handed to the
/// scheduler. The defaults are the values the installation actually runs
/// with; nothing here is mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub tank: TankConfig,
    pub current: CurrentSenseConfig,
    pub pump: PumpConfig,

    /// Minutes the level must settle after the pump stops before a
    /// consumption cycle is committed.
    pub consumption_settle_min: u32,
}

/// Tank geometry used to turn a ranging distance into a fill fraction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TankConfig {
    pub height_mm: u32,
    /// Gap between the ranging sensor and the overflow water line.
    pub sensor_offset_mm: u32,
}

/// Calibration of the current-sense ADC channel.
///
/// 1.5V from the ACS712 is 10A, and the voltage divider is 1/2.5, so 10A
/// reads as 0.6V at the ADC. The channel is inverted: full scale means no
/// current at all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CurrentSenseConfig {
    pub adc_full_scale: u16,
    /// ADC counts (below full scale) corresponding to 10A.
    pub counts_per_10a: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PumpConfig {
    /// Above this draw the pump is physically moving the motor.
    pub on_threshold_ma: u32,
    /// Below this draw (but above `on_threshold_ma`) the pump is running
    /// without moving water.
    pub dryrun_threshold_ma: u32,
    /// Seconds of starved draw tolerated before the safety lockout.
    pub dryrun_window_s: u32,
    /// Ceiling on unattended continuous run time, in seconds.
    pub auto_shutoff_s: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tank: TankConfig {
                height_mm: 920,
                sensor_offset_mm: 40,
            },
            current: CurrentSenseConfig {
                adc_full_scale: 1024,
                counts_per_10a: 409,
            },
            pump: PumpConfig {
                on_threshold_ma: 800,
                dryrun_threshold_ma: 2000,
                dryrun_window_s: 30,
                auto_shutoff_s: 60 * 15,
            },
            consumption_settle_min: 10,
        }
    }
}
