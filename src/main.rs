// Host-side simulation harness: wires the controller core to a scripted
// tank model and runs it at full speed over simulated days. The on-device
// build replaces the model with the real pins and the manual clock with the
// NTP-synced one; the core does not know the difference.

use anyhow::Result;
use clap::Parser;
use log::{info, LevelFilter};
use std::path::PathBuf;

use tank_controller::clock::ManualClock;
use tank_controller::config::ControllerConfig;
use tank_controller::hardware::Hardware;
use tank_controller::logging;
use tank_controller::scheduler::Scheduler;
use tank_controller::storage::DirStorage;

/// 2026-01-01 00:00:00 UTC; the simulated NTP sync lands two minutes in.
const SIM_START_EPOCH: u64 = 1_767_225_600;

const TANK_HEIGHT_MM: i64 = 920;
const SENSOR_OFFSET_MM: i64 = 40;

#[derive(Parser)]
#[command(name = "tank-controller", about = "Host simulation of the water-tank controller")]
struct Args {
    /// Directory for the persisted history files
    #[arg(long, default_value = "tank-data")]
    data_dir: PathBuf,

    /// Simulated hours to run
    #[arg(long, default_value_t = 48)]
    hours: u64,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Scripted tank: water drains while the pump moves it, rain trickles in the
/// rest of the time. Units are tenths of a millimeter of water column.
struct SimulatedTank {
    water: i64,
    relay_on: bool,
    demand: bool,
}

impl SimulatedTank {
    fn new() -> Self {
        Self {
            water: TANK_HEIGHT_MM * 10 * 6 / 10, // start 60% full
            relay_on: false,
            demand: false,
        }
    }

    /// Garden watering twice a day.
    fn demand_at(minute_of_day: u64) -> bool {
        let morning = 7 * 60..7 * 60 + 20;
        let evening = 19 * 60..19 * 60 + 30;
        morning.contains(&minute_of_day) || evening.contains(&minute_of_day)
    }

    fn step_minute(&mut self, minute_of_day: u64) {
        self.demand = Self::demand_at(minute_of_day);
        if self.relay_on && self.demand && self.water > 0 {
            self.water -= 30; // 3 mm of column per minute of pumping
        } else {
            self.water += 1; // rain harvest trickle
        }
        self.water = self.water.clamp(0, TANK_HEIGHT_MM * 10);
    }
}

impl Hardware for SimulatedTank {
    fn read_current_raw(&mut self) -> u16 {
        if self.relay_on && self.demand && self.water > 0 {
            900 // about 3 A: pump moving water
        } else {
            1024 // full scale reads as no current
        }
    }

    fn ranging_pulse_us(&mut self) -> u32 {
        let air_gap_mm = SENSOR_OFFSET_MM + TANK_HEIGHT_MM - self.water / 10;
        (air_gap_mm * 200 / 34) as u32
    }

    fn set_pump_relay(&mut self, energized: bool) {
        self.relay_on = energized;
    }

    fn button_pressed(&mut self) -> bool {
        false
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logging::init_logger(level).expect("logger already installed");

    info!("Tank controller simulation, {} simulated hours", args.hours);
    std::fs::create_dir_all(&args.data_dir)?;

    let mut tank = SimulatedTank::new();
    let mut scheduler = Scheduler::new(
        ControllerConfig::default(),
        ManualClock::new(0),
        DirStorage::new(&args.data_dir),
        &mut tank,
    );

    let total_ms = args.hours * 3600 * 1000;
    let mut elapsed_ms: u64 = 0;
    while elapsed_ms < total_ms {
        scheduler.clock_mut().advance(100);
        elapsed_ms += 100;

        if elapsed_ms == 120_000 {
            scheduler.clock_mut().set_epoch(SIM_START_EPOCH + elapsed_ms / 1000);
            info!("Clock synchronized");
        }

        if elapsed_ms % 60_000 == 0 {
            let minute_of_day = (elapsed_ms / 60_000) % (24 * 60);
            let want = SimulatedTank::demand_at(minute_of_day);
            if want && !tank.demand {
                // The household turns the tap on and presses enable
                scheduler.enable_pump(&mut tank);
            }
            tank.step_minute(minute_of_day);
        }

        scheduler.poll(&mut tank);

        if elapsed_ms % 3_600_000 == 0 {
            let stats = scheduler.stats();
            info!("stats: {}", serde_json::to_string(&stats)?);
        }
    }

    info!(
        "24h history: {}",
        serde_json::to_string(&scheduler.last_24h())?
    );
    match scheduler.last_30_days() {
        Some(index) => info!("Last 30 days: {} from byte {}", index.file, index.offset),
        None => info!("Last 30 days index not computed"),
    }
    Ok(())
}
