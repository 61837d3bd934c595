use chrono::NaiveDate;

use crate::pareto_front::{ParetoFront, ParetoFrontBuilder};
use crate::timetable::mapped::{Connections, Trips};
use crate::timetable::TimeTable;

/// The result of a profile query: for every station, the Pareto frontier
/// of `(arrival at destination, changes, departure)` tuples describing the
/// optimal continuations towards `arr_station_id` on `date`.
///
/// The payload of each tuple encodes the first connection to board and how
/// many stops to stay aboard, which is what journey extraction walks.
pub struct Profile<'timetable, T: TimeTable> {
    timetable: &'timetable T,
    date: NaiveDate,
    arr_station_id: usize,
    connections: Connections,
    trips: Trips,
    station_fronts: Vec<ParetoFront>,
}

impl<'timetable, T: TimeTable> Profile<'timetable, T> {
    pub fn timetable(&self) -> &'timetable T {
        self.timetable
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn arr_station_id(&self) -> usize {
        self.arr_station_id
    }

    /// The connections of the profile's date.
    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    /// The trips of the profile's date.
    pub fn trips(&self) -> &Trips {
        &self.trips
    }

    /// The frontier of a station. Panics if `station_id` is out of range.
    pub fn for_station(&self, station_id: usize) -> &ParetoFront {
        &self.station_fronts[station_id]
    }
}

/// A profile under construction: a frontier builder per station, plus one
/// per trip summarizing what remaining seated past a connection can reach.
/// Builders are absent until the scan first touches them.
pub struct ProfileBuilder<'timetable, T: TimeTable> {
    timetable: &'timetable T,
    date: NaiveDate,
    arr_station_id: usize,
    connections: Connections,
    trips: Trips,
    station_fronts: Vec<Option<ParetoFrontBuilder>>,
    trip_fronts: Vec<Option<ParetoFrontBuilder>>,
}

impl<'timetable, T: TimeTable> ProfileBuilder<'timetable, T> {
    pub fn new(
        timetable: &'timetable T,
        date: NaiveDate,
        arr_station_id: usize,
        connections: Connections,
        trips: Trips,
    ) -> Self {
        let station_fronts = vec![None; timetable.stations().len()];
        let trip_fronts = vec![None; trips.len()];
        ProfileBuilder {
            timetable,
            date,
            arr_station_id,
            connections,
            trips,
            station_fronts,
            trip_fronts,
        }
    }

    pub fn for_station(&self, station_id: usize) -> Option<&ParetoFrontBuilder> {
        self.station_fronts[station_id].as_ref()
    }

    pub fn station_front_mut(&mut self, station_id: usize) -> &mut ParetoFrontBuilder {
        self.station_fronts[station_id].get_or_insert_with(ParetoFrontBuilder::new)
    }

    pub fn for_trip(&self, trip_id: usize) -> Option<&ParetoFrontBuilder> {
        self.trip_fronts[trip_id].as_ref()
    }

    pub fn trip_front_mut(&mut self, trip_id: usize) -> &mut ParetoFrontBuilder {
        self.trip_fronts[trip_id].get_or_insert_with(ParetoFrontBuilder::new)
    }

    /// Freezes the station fronts; the trip fronts were only scaffolding.
    pub fn build(self) -> Profile<'timetable, T> {
        let station_fronts = self
            .station_fronts
            .iter()
            .map(|front| front.as_ref().map_or_else(ParetoFront::empty, |front| front.build()))
            .collect();
        Profile {
            timetable: self.timetable,
            date: self.date,
            arr_station_id: self.arr_station_id,
            connections: self.connections,
            trips: self.trips,
            station_fronts,
        }
    }
}
