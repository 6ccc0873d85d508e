// Pump current sensing: repeated ADC reads through a short median filter,
// then a linear calibration to milliamps.

use crate::config::CurrentSenseConfig;
use crate::filter::MedianFilter;
use crate::hardware::Hardware;

pub const CURRENT_FILTER_LEN: usize = 5;

pub struct CurrentSensor {
    cfg: CurrentSenseConfig,
    filter: MedianFilter<u16, CURRENT_FILTER_LEN>,
}

impl CurrentSensor {
    pub fn new(cfg: CurrentSenseConfig) -> Self {
        Self {
            cfg,
            filter: MedianFilter::new(),
        }
    }

    /// Take one raw reading. Returns true once the median window is full;
    /// the first few reads are usable but degraded.
    pub fn sample(&mut self, hw: &mut dyn Hardware) -> bool {
        self.filter.push(hw.read_current_raw());
        self.filter.is_warmed_up()
    }

    /// Filtered current draw in milliamps. The ADC channel is inverted, so
    /// an empty filter (or absent hardware at full scale) reads as 0 mA.
    pub fn current_ma(&self) -> u32 {
        let raw = self.filter.filtered().unwrap_or(self.cfg.adc_full_scale);
        let counts = u32::from(self.cfg.adc_full_scale.saturating_sub(raw));
        counts * 10_000 / self.cfg.counts_per_10a
    }
}
