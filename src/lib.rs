//! Journey planning over a bit-packed, memory-mapped public transport
//! timetable.
//!
//! The timetable store maps read-only binary files once per process; the
//! router scans the connections of one day backward in time to build a
//! [`Profile`] of Pareto-optimal continuations towards an arrival station,
//! and the journey extractor turns a profile into concrete leg sequences.
//!
//! ```no_run
//! use horaire::{journeys, CachedTimeTable, FileTimeTable, Router};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let timetable = CachedTimeTable::new(FileTimeTable::open("timetable")?);
//! let date = horaire::chrono::NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
//! let profile = Router::new(&timetable).profile(date, 7872)?;
//! for journey in journeys(&profile, 11486)? {
//!     println!("{} -> {}", journey.dep_time(), journey.arr_time());
//! }
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod journey;
pub mod packed;
pub mod pareto_front;
pub mod timetable;

pub use chrono;
pub use tracing;

pub use engine::profile::Profile;
pub use engine::router::Router;
pub use journey::extractor::journeys;
pub use journey::{Journey, Leg, Stop};
pub use pareto_front::{ParetoFront, ParetoFrontBuilder};
pub use timetable::cached::CachedTimeTable;
pub use timetable::mapped::FileTimeTable;
pub use timetable::{TimeTable, TimeTableError, Vehicle};
