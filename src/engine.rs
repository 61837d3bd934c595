//! The profile-building engine: a backward scan over the connections of
//! one day that leaves, for every station, the Pareto frontier of optimal
//! continuations towards a fixed arrival station.

pub mod profile;
pub mod router;
