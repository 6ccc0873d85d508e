// Sensor front-ends: each one owns its filter pipeline and is fed by the
// scheduler at its own cadence.

pub mod current;
pub mod level;

pub use current::CurrentSensor;
pub use level::LevelSensor;
