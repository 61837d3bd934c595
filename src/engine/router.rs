use chrono::NaiveDate;
use tracing::debug;

use crate::engine::profile::{Profile, ProfileBuilder};
use crate::packed::{self, Criteria};
use crate::pareto_front::ParetoFrontBuilder;
use crate::timetable::{TimeTable, TimeTableError};

/// Computes profiles by a backward connection scan.
///
/// Connections are stored by decreasing departure time, so iterating them
/// in index order walks backward in wall-clock time: when a connection is
/// processed, everything reachable after it has already been propagated
/// into the trip and station fronts.
pub struct Router<'timetable, T: TimeTable> {
    timetable: &'timetable T,
}

impl<'timetable, T: TimeTable> Router<'timetable, T> {
    pub fn new(timetable: &'timetable T) -> Self {
        Router { timetable }
    }

    /// Builds the profile of optimal journeys towards `arr_station_id` on
    /// `date`. Fails only if the day's data cannot be loaded.
    pub fn profile(
        &self,
        date: NaiveDate,
        arr_station_id: usize,
    ) -> Result<Profile<'timetable, T>, TimeTableError> {
        let timetable = self.timetable;
        let connections = timetable.connections_for(date)?;
        let trips = timetable.trips_for(date)?;
        let transfers = timetable.transfers();
        let start = std::time::Instant::now();

        let mut builder = ProfileBuilder::new(
            timetable,
            date,
            arr_station_id,
            connections.clone(),
            trips,
        );

        let dest_transfers = transfers.arriving_at(arr_station_id);

        for conn_id in 0..connections.len() {
            let dep_stop_id = connections.dep_stop_id(conn_id);
            let arr_stop_id = connections.arr_stop_id(conn_id);
            let dep_mins = connections.dep_mins(conn_id);
            let arr_mins = connections.arr_mins(conn_id);
            let trip_id = connections.trip_id(conn_id);
            let arr_station_of_conn = timetable.station_id(arr_stop_id);

            // the candidate front for boarding this connection; payloads
            // are raw connection ids until the propagation step packs them
            let mut front = ParetoFrontBuilder::new();

            // end the journey: walk from the arrival stop to the destination
            for transfer_id in dest_transfers.indices() {
                if transfers.dep_station_id(transfer_id) == arr_station_of_conn {
                    front.add_packed(
                        arr_mins + transfers.minutes(transfer_id),
                        0,
                        conn_id as u32,
                    );
                }
            }

            // stay seated: whatever remaining aboard past this stop reaches
            if let Some(trip_front) = builder.for_trip(trip_id) {
                front.add_all(trip_front);
            }

            // alight and catch a later departure from the arrival station
            if let Some(station_front) = builder.for_station(arr_station_of_conn) {
                for &tuple in station_front.iter() {
                    if tuple.dep_mins() >= arr_mins {
                        front.add(Criteria::pack(
                            tuple.arr_mins(),
                            tuple.changes() + 1,
                            conn_id as u32,
                        ));
                    }
                }
            }

            if front.is_empty() {
                continue;
            }

            builder.trip_front_mut(trip_id).add_all(&front);

            let dep_station_of_conn = timetable.station_id(dep_stop_id);
            if let Some(station_front) = builder.for_station(dep_station_of_conn) {
                if station_front.fully_dominates(&front, dep_mins) {
                    continue;
                }
            }

            // reach the departure stop on foot from every neighboring
            // station, timestamping each tuple with the latest departure
            // that still catches this connection
            let conn_trip_pos = connections.trip_pos(conn_id);
            for transfer_id in transfers.arriving_at(dep_station_of_conn).indices() {
                let walk_dep_mins = dep_mins - transfers.minutes(transfer_id);
                let mut relocated = ParetoFrontBuilder::new();
                for &tuple in front.iter() {
                    let first_boarded_pos = connections.trip_pos(tuple.payload() as usize);
                    let payload =
                        packed::pack_24_8(conn_id as u32, first_boarded_pos - conn_trip_pos);
                    relocated.add(tuple.with_dep_mins(walk_dep_mins).with_payload(payload));
                }
                let from_station = transfers.dep_station_id(transfer_id);
                builder.station_front_mut(from_station).add_all(&relocated);
            }
        }

        let profile = builder.build();
        debug!(
            "profile for station {} on {} computed in {} ms",
            arr_station_id,
            date,
            start.elapsed().as_millis()
        );
        Ok(profile)
    }
}
