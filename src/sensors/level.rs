// Tank level sensing: a burst of ultrasonic pings reduced by a fast median,
// smoothed across calls by a slower mean, then converted to a fill fraction
// in parts-per-thousand.

use crate::config::TankConfig;
use crate::filter::{MeanFilter, MedianFilter};
use crate::hardware::Hardware;
use log::warn;

pub const FAST_MEDIAN_LEN: usize = 5;
pub const SLOW_MEAN_LEN: usize = 8;

pub struct LevelSensor {
    cfg: TankConfig,
    mean: MeanFilter<SLOW_MEAN_LEN>,
}

impl LevelSensor {
    /// Takes one blocking sample immediately so a level read never sees an
    /// empty mean window.
    pub fn new(cfg: TankConfig, hw: &mut dyn Hardware) -> Self {
        let mut sensor = Self {
            cfg,
            mean: MeanFilter::new(),
        };
        sensor.sample(hw);
        sensor
    }

    /// Fire up to five ranging pulses and fold the burst into the filters.
    /// A pulse timeout aborts the rest of the burst instead of feeding
    /// zeros into the median. Returns true once the mean window is full.
    pub fn sample(&mut self, hw: &mut dyn Hardware) -> bool {
        let mut fast: MedianFilter<u32, FAST_MEDIAN_LEN> = MedianFilter::new();
        for _ in 0..FAST_MEDIAN_LEN {
            let duration = hw.ranging_pulse_us();
            if duration == 0 {
                warn!("Unable to get distance value");
                break;
            }
            fast.push(duration);
        }
        if let Some(median) = fast.filtered() {
            self.mean.push(median);
        }
        self.mean.is_warmed_up()
    }

    pub fn is_warmed_up(&self) -> bool {
        self.mean.is_warmed_up()
    }

    /// Current fill level: 0 = empty, 1000 = full.
    pub fn level_permille(&self) -> u16 {
        let duration = u64::from(self.mean.filtered().unwrap_or(0));
        // Echo round trip to distance: 0.034 cm/us, halved
        let mut distance_mm = (duration * 34 / 200) as i64;
        distance_mm -= i64::from(self.cfg.sensor_offset_mm);
        let height = i64::from(self.cfg.height_mm);
        let distance_mm = distance_mm.clamp(0, height);
        (((height - distance_mm) * 1000) / height) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::hardware::mock::MockHardware;

    fn tank() -> TankConfig {
        ControllerConfig::default().tank
    }

    #[test]
    fn converts_echo_time_to_fill_fraction() {
        let mut hw = MockHardware::new();
        hw.pulse_us = 2000;
        let sensor = LevelSensor::new(tank(), &mut hw);
        // 2000 us -> 340 mm, minus 40 mm offset -> 300 mm below sensor
        assert_eq!(sensor.level_permille(), ((920 - 300) * 1000 / 920) as u16);
    }

    #[test]
    fn distance_clamps_to_tank_bounds() {
        let mut hw = MockHardware::new();
        hw.pulse_us = 60_000; // far beyond tank bottom
        let sensor = LevelSensor::new(tank(), &mut hw);
        assert_eq!(sensor.level_permille(), 0);

        let mut hw = MockHardware::new();
        hw.pulse_us = 100; // echo from above the overflow line
        let sensor = LevelSensor::new(tank(), &mut hw);
        assert_eq!(sensor.level_permille(), 1000);
    }

    #[test]
    fn timeout_keeps_last_valid_reading() {
        let mut hw = MockHardware::new();
        hw.pulse_us = 2000;
        let mut sensor = LevelSensor::new(tank(), &mut hw);
        let before = sensor.level_permille();

        // Whole burst times out: the mean window is left untouched
        hw.pulse_us = 0;
        sensor.sample(&mut hw);
        assert_eq!(sensor.level_permille(), before);
    }

    #[test]
    fn timeout_mid_burst_uses_partial_median() {
        let mut hw = MockHardware::new();
        hw.script_pulses([2000, 2000, 0, 9999, 9999]);
        hw.pulse_us = 0;
        let sensor = LevelSensor::new(tank(), &mut hw);
        // Only the two pulses before the timeout count
        assert_eq!(sensor.level_permille(), ((920 - 300) * 1000 / 920) as u16);
    }

    #[test]
    fn warm_up_needs_full_mean_window() {
        let mut hw = MockHardware::new();
        hw.pulse_us = 2000;
        let mut sensor = LevelSensor::new(tank(), &mut hw);
        assert!(!sensor.is_warmed_up());
        for _ in 0..SLOW_MEAN_LEN - 2 {
            assert!(!sensor.sample(&mut hw));
        }
        assert!(sensor.sample(&mut hw));
        assert!(sensor.is_warmed_up());
    }
}
