// The tick loop. Single-threaded and cooperative: every component is
// serviced at its own cadence from one `poll`, and all wall-clock boundary
// crossings are derived from a single snapshot per tick.

use crate::clock::{Clock, ClockSnapshot};
use crate::config::ControllerConfig;
use crate::consumption::ConsumptionTracker;
use crate::hardware::Hardware;
use crate::history::{DayWindowIndex, HistorySample, HistoryStore};
use crate::pump::{PumpController, PumpState};
use crate::sensors::{CurrentSensor, LevelSensor};
use crate::stats::{PumpStats, StatsSummary, TankStats};
use crate::storage::Storage;
use log::info;

/// Current-sensor sampling cadence.
const CURRENT_SAMPLE_INTERVAL_MS: u64 = 100;

/// Crossing into this hour commits the daily sample to storage.
const DAY_COMMIT_HOUR: u32 = 23;

/// Fast-tick cycles the button must read released before a new press
/// counts again.
const BUTTON_RELEASE_CYCLES: u8 = 2;

pub struct Scheduler<C: Clock, S: Storage> {
    config: ControllerConfig,
    clock: C,
    storage: S,

    current: CurrentSensor,
    level: LevelSensor,
    pump: PumpController,
    hourly: ConsumptionTracker,
    daily: ConsumptionTracker,
    history: HistoryStore,

    last_sample_ms: u64,
    last_second: u32,
    last_minute: u32,
    last_hour: u32,
    current_warmed: bool,
    level_filling: bool,
    index_primed: bool,

    button_was_pressed: bool,
    button_release_countdown: u8,
}

impl<C: Clock, S: Storage> Scheduler<C, S> {
    /// Builds every component and takes the blocking warm-up samples. The
    /// boundary markers start at the current (possibly still unsynced)
    /// wall-clock position.
    pub fn new(config: ControllerConfig, clock: C, storage: S, hw: &mut dyn Hardware) -> Self {
        let snapshot = clock.now();
        let mut current = CurrentSensor::new(config.current);
        current.sample(hw);
        let level = LevelSensor::new(config.tank, hw);
        let pump = PumpController::new(config.pump, hw);
        let settle = config.consumption_settle_min;

        Self {
            config,
            last_sample_ms: clock.monotonic_ms(),
            clock,
            storage,
            current,
            level,
            pump,
            hourly: ConsumptionTracker::new(settle),
            daily: ConsumptionTracker::new(settle),
            history: HistoryStore::new(),
            last_second: snapshot.second,
            last_minute: snapshot.minute,
            last_hour: snapshot.hour,
            current_warmed: false,
            level_filling: true,
            index_primed: false,
            button_was_pressed: false,
            button_release_countdown: 0,
        }
    }

    /// Service whatever is due. Call this from the main loop as often as
    /// convenient; internally nothing runs more than once per cadence.
    pub fn poll(&mut self, hw: &mut dyn Hardware) {
        let now_ms = self.clock.monotonic_ms();
        if now_ms.saturating_sub(self.last_sample_ms) >= CURRENT_SAMPLE_INTERVAL_MS {
            self.last_sample_ms = now_ms;
            self.current_warmed = self.current.sample(hw);
            self.poll_button(hw);
        }

        // One wall-clock read per tick; every boundary below derives from it
        let snapshot = self.clock.now();
        if snapshot.second != self.last_second {
            self.last_second = snapshot.second;
            self.tick_second(hw);
        }
        if snapshot.minute != self.last_minute {
            self.last_minute = snapshot.minute;
            self.tick_minute(&snapshot, hw);
        }
    }

    fn tick_second(&mut self, hw: &mut dyn Hardware) {
        self.pump
            .tick_second(self.current.current_ma(), self.current_warmed, hw);
    }

    fn tick_minute(&mut self, snapshot: &ClockSnapshot, hw: &mut dyn Hardware) {
        let warmed = self.level.sample(hw);
        if self.level_filling && warmed {
            self.level_filling = false;
            self.last_hour = snapshot.hour;
        }

        let level = self.level.level_permille();
        let pump_active = self.pump.load_on(self.current.current_ma());
        self.hourly.tick(pump_active, level);
        self.daily.tick(pump_active, level);

        if !snapshot.is_synchronized() {
            // No plausible date yet; hour/day bookkeeping stays suspended
            return;
        }

        if !self.index_primed {
            self.history.recompute_30day_index(&self.storage, snapshot.year);
            self.index_primed = true;
        }

        if self.last_hour != snapshot.hour && !self.level_filling {
            self.last_hour = snapshot.hour;
            let mut sample = HistorySample {
                level,
                timestamp: snapshot.epoch,
                consumption: self.hourly.consumption(level, true),
            };
            info!("Hourly sample, level: {}", sample.level);
            self.history.record_hour(sample);

            if snapshot.hour == DAY_COMMIT_HOUR {
                info!("Writing daily sample to storage");
                sample.consumption = self.daily.consumption(level, true);
                self.history
                    .record_day(&self.storage, snapshot.year, snapshot.month, &sample);
                self.history.recompute_30day_index(&self.storage, snapshot.year);
            }
        }
    }

    /// Raw button edge handling: a fresh press toggles the pump between
    /// enabled and disabled. The release is held off for two fast cycles so
    /// a bouncing contact does not double-toggle.
    fn poll_button(&mut self, hw: &mut dyn Hardware) {
        if hw.button_pressed() {
            if !self.button_was_pressed {
                match self.pump.state() {
                    PumpState::Off | PumpState::DryRun => self.pump.enable(hw),
                    _ => self.pump.disable(hw),
                }
            }
            self.button_was_pressed = true;
            self.button_release_countdown = BUTTON_RELEASE_CYCLES;
        } else if self.button_was_pressed {
            self.button_release_countdown -= 1;
            if self.button_release_countdown == 0 {
                self.button_was_pressed = false;
            }
        }
    }

    /// Manual command pass-through for the serving layer.
    pub fn enable_pump(&mut self, hw: &mut dyn Hardware) {
        self.pump.enable(hw);
    }

    pub fn disable_pump(&mut self, hw: &mut dyn Hardware) {
        self.pump.disable(hw);
    }

    pub fn pump_state(&self) -> PumpState {
        self.pump.state()
    }

    /// Live stats summary for the serving layer.
    pub fn stats(&mut self) -> StatsSummary {
        let level = self.level.level_permille();
        let diff = self
            .history
            .oldest_hour()
            .map(|oldest| i32::from(level) - i32::from(oldest.level))
            .unwrap_or(0);
        let consumed = self.daily.consumption(level, false);
        let current_ma = self.current.current_ma();

        StatsSummary {
            tank: TankStats {
                level,
                harvest: diff + consumed as i32,
                consumption: consumed,
            },
            pump: PumpStats {
                current_ma,
                active: self.pump.load_on(current_ma) as u8,
                state: self.pump.state().code(),
                state_text: self.pump.state().name(),
            },
        }
    }

    /// Ordered 24-hour ring snapshot, oldest first.
    pub fn last_24h(&self) -> Vec<HistorySample> {
        self.history.last_24h()
    }

    /// File identifier and byte offset for streaming the last 30 days.
    pub fn last_30_days(&self) -> Option<&DayWindowIndex> {
        self.history.last_30_days()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::hardware::mock::MockHardware;
    use crate::storage::MemStorage;

    // 2026-08-05 21:50:00 UTC
    const EVENING: u64 = 1_785_966_600;

    fn scheduler_at(
        epoch: u64,
        hw: &mut MockHardware,
    ) -> Scheduler<ManualClock, MemStorage> {
        Scheduler::new(
            ControllerConfig::default(),
            ManualClock::new(epoch),
            MemStorage::new(),
            hw,
        )
    }

    /// Drive the loop in 100 ms steps for the given span.
    fn run_for(sched: &mut Scheduler<ManualClock, MemStorage>, hw: &mut MockHardware, ms: u64) {
        for _ in 0..ms / 100 {
            sched.clock_mut().advance(100);
            sched.poll(hw);
        }
    }

    #[test]
    fn hour_and_day_boundaries_commit_history() {
        let mut hw = MockHardware::new();
        hw.pulse_us = 2000;
        let mut sched = scheduler_at(EVENING, &mut hw);

        // Through 22:00: the level filter warms up by 21:57, so the hour
        // crossing commits the first ring sample.
        run_for(&mut sched, &mut hw, 11 * 60 * 1000);
        assert_eq!(sched.last_24h().len(), 1);
        assert!(sched.storage().contents("/2026.json").is_none());

        // Through 23:00: second ring sample plus the daily write
        run_for(&mut sched, &mut hw, 60 * 60 * 1000);
        assert_eq!(sched.last_24h().len(), 2);
        let year = sched.storage().contents("/2026.json").expect("year file");
        assert!(year.starts_with(b"{\"LVL\":"));
        assert!(sched.storage().contents("/2026-08.json").is_some());

        let index = sched.last_30_days().expect("index recomputed after write");
        assert_eq!(index.file, "/2026.json");
        assert_eq!(index.offset, 0);

        let level = (920 - 300) * 1000 / 920;
        assert_eq!(sched.last_24h()[0].level, level as u16);
    }

    #[test]
    fn unsynchronized_clock_suspends_calendar_bookkeeping() {
        let mut hw = MockHardware::new();
        hw.pulse_us = 2000;
        // 1970: the time source has not synced yet
        let mut sched = scheduler_at(0, &mut hw);

        run_for(&mut sched, &mut hw, 3 * 60 * 60 * 1000);
        assert!(sched.last_24h().is_empty());
        assert!(sched.last_30_days().is_none());

        // Sync lands; the stale hour marker commits at the next minute
        // boundary
        sched.clock_mut().set_epoch(EVENING);
        run_for(&mut sched, &mut hw, 5 * 60 * 1000);
        assert_eq!(sched.last_24h().len(), 1);
    }

    #[test]
    fn button_press_toggles_pump_enable() {
        let mut hw = MockHardware::new();
        let mut sched = scheduler_at(EVENING, &mut hw);
        assert_eq!(sched.pump_state(), PumpState::Off);

        hw.button = true;
        run_for(&mut sched, &mut hw, 300);
        assert_eq!(sched.pump_state(), PumpState::Idle);

        // Held button must not toggle again
        run_for(&mut sched, &mut hw, 1000);
        assert_eq!(sched.pump_state(), PumpState::Idle);

        hw.button = false;
        run_for(&mut sched, &mut hw, 500);
        hw.button = true;
        run_for(&mut sched, &mut hw, 300);
        assert_eq!(sched.pump_state(), PumpState::Off);
    }

    #[test]
    fn pump_runs_and_consumption_is_accounted() {
        let mut hw = MockHardware::new();
        hw.pulse_us = 2000;
        let mut sched = scheduler_at(EVENING, &mut hw);
        sched.enable_pump(&mut hw);

        // Pump draws load: raw 900 is about 3 A
        hw.current_raw = 900;
        run_for(&mut sched, &mut hw, 2000);
        assert_eq!(sched.pump_state(), PumpState::Running);

        // Tank drains while the pump runs: the echo takes longer
        hw.pulse_us = 2400;
        run_for(&mut sched, &mut hw, 3 * 60 * 1000);

        // Demand stops
        hw.current_raw = 1024;
        run_for(&mut sched, &mut hw, 2000);
        assert_eq!(sched.pump_state(), PumpState::Idle);

        let stats = sched.stats();
        assert_eq!(stats.pump.active, 0);
        assert!(stats.tank.consumption > 0);
    }

    #[test]
    fn stats_reports_pump_state_and_level() {
        let mut hw = MockHardware::new();
        hw.pulse_us = 2000;
        let mut sched = scheduler_at(EVENING, &mut hw);

        let stats = sched.stats();
        assert_eq!(stats.pump.state, PumpState::Off.code());
        assert_eq!(stats.pump.state_text, "Off");
        assert_eq!(stats.pump.current_ma, 0);
        assert_eq!(stats.tank.level, ((920 - 300) * 1000 / 920) as u16);

        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"TANK\""));
        assert!(json.contains("\"PUMP\""));
    }
}
