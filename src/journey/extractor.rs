use std::fmt::{self, Display, Formatter};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::engine::profile::Profile;
use crate::journey::{BadJourney, FootLeg, IntermediateStop, Journey, Leg, Stop, TransportLeg};
use crate::packed::{self, Criteria};
use crate::timetable::TimeTable;

#[derive(Debug)]
pub enum ExtractionError {
    /// A station frontier has no tuple for this (arrival, changes) pair,
    /// although the payload chain of the profile pointed at it.
    NoSuchTuple {
        station_id: usize,
        arr_mins: i32,
        changes: u32,
    },
    /// No transfer exists between two stations a foot leg must bridge.
    NoTransferBetween {
        dep_station_id: usize,
        arr_station_id: usize,
    },
    /// The reconstructed legs violate a journey invariant.
    BadJourney(BadJourney),
}

impl Display for ExtractionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionError::NoSuchTuple {
                station_id,
                arr_mins,
                changes,
            } => write!(
                f,
                "station {} has no frontier tuple arriving at {} with {} changes",
                station_id, arr_mins, changes
            ),
            ExtractionError::NoTransferBetween {
                dep_station_id,
                arr_station_id,
            } => write!(
                f,
                "no transfer from station {} to station {}",
                dep_station_id, arr_station_id
            ),
            ExtractionError::BadJourney(bad) => write!(f, "invalid journey: {}", bad),
        }
    }
}

impl std::error::Error for ExtractionError {}

impl From<BadJourney> for ExtractionError {
    fn from(bad: BadJourney) -> Self {
        ExtractionError::BadJourney(bad)
    }
}

/// Reconstructs the concrete journeys of a station's frontier, sorted by
/// departure then arrival time.
///
/// Each frontier tuple yields one journey; a tuple whose payload chain
/// cannot be resolved fails the whole extraction.
pub fn journeys<T: TimeTable>(
    profile: &Profile<'_, T>,
    dep_station_id: usize,
) -> Result<Vec<Journey>, ExtractionError> {
    let mut result = Vec::with_capacity(profile.for_station(dep_station_id).len());
    for &criteria in profile.for_station(dep_station_id).iter() {
        result.push(extract_journey(profile, dep_station_id, criteria)?);
    }
    result.sort_by_key(|journey| (journey.dep_time(), journey.arr_time()));
    Ok(result)
}

fn extract_journey<T: TimeTable>(
    profile: &Profile<'_, T>,
    dep_station_id: usize,
    criteria: Criteria,
) -> Result<Journey, ExtractionError> {
    let timetable = profile.timetable();
    let connections = profile.connections();
    let date = profile.date();

    let arr_mins = criteria.arr_mins();
    let mut legs: Vec<Leg> = Vec::new();
    let mut current_stop_id = dep_station_id;
    let mut current_arr_mins = 0;

    // walk to the first boarding stop if it is in another station
    let first_conn_id = packed::unpack_24(criteria.payload()) as usize;
    let first_dep_stop_id = connections.dep_stop_id(first_conn_id);
    if timetable.station_id(first_dep_stop_id) != current_stop_id {
        let conn_dep_mins = connections.dep_mins(first_conn_id);
        let walk = walk_minutes(timetable, current_stop_id, first_dep_stop_id)?;
        legs.push(foot_leg(
            timetable,
            date,
            current_stop_id,
            first_dep_stop_id,
            conn_dep_mins - walk,
            conn_dep_mins,
        ));
    }

    let mut remaining_changes = criteria.changes() as i32;
    while remaining_changes >= 0 {
        let station_id = timetable.station_id(current_stop_id);
        let tuple = profile
            .for_station(station_id)
            .get(arr_mins, remaining_changes as u32)
            .ok_or(ExtractionError::NoSuchTuple {
                station_id,
                arr_mins,
                changes: remaining_changes as u32,
            })?;

        let mut conn_id = packed::unpack_24(tuple.payload()) as usize;
        let intermediate_count = packed::unpack_8(tuple.payload()) as usize;
        let board_stop_id = connections.dep_stop_id(conn_id);

        // bridge alighting and re-boarding with a transfer on foot
        if matches!(legs.last(), Some(Leg::Transport(_))) {
            let walk = walk_minutes(timetable, current_stop_id, board_stop_id)?;
            legs.push(foot_leg(
                timetable,
                date,
                current_stop_id,
                board_stop_id,
                current_arr_mins,
                current_arr_mins + walk,
            ));
        }

        let trip_id = connections.trip_id(conn_id);
        let board_dep_mins = connections.dep_mins(conn_id);
        let mut intermediate_stops = Vec::with_capacity(intermediate_count);
        for _ in 0..intermediate_count {
            let stop_arr_time = date_time(date, connections.arr_mins(conn_id));
            conn_id = connections.next_connection_id(conn_id);
            intermediate_stops.push(IntermediateStop {
                stop: stop_at(timetable, connections.dep_stop_id(conn_id)),
                arr_time: stop_arr_time,
                dep_time: date_time(date, connections.dep_mins(conn_id)),
            });
        }

        let alight_stop_id = connections.arr_stop_id(conn_id);
        let route_id = profile.trips().route_id(trip_id);
        legs.push(Leg::Transport(TransportLeg {
            dep_stop: stop_at(timetable, board_stop_id),
            dep_time: date_time(date, board_dep_mins),
            arr_stop: stop_at(timetable, alight_stop_id),
            arr_time: date_time(date, connections.arr_mins(conn_id)),
            intermediate_stops,
            vehicle: timetable.routes().vehicle(route_id),
            route: timetable.routes().name(route_id).to_string(),
            destination: profile.trips().destination(trip_id).to_string(),
        }));

        current_stop_id = alight_stop_id;
        current_arr_mins = connections.arr_mins(conn_id);
        remaining_changes -= 1;
    }

    // close with a walk if the last stop is not in the arrival station
    if timetable.station_id(current_stop_id) != profile.arr_station_id() {
        let walk = walk_minutes(timetable, current_stop_id, profile.arr_station_id())?;
        legs.push(foot_leg(
            timetable,
            date,
            current_stop_id,
            profile.arr_station_id(),
            current_arr_mins,
            current_arr_mins + walk,
        ));
    }

    Ok(Journey::new(legs)?)
}

fn walk_minutes<T: TimeTable>(
    timetable: &T,
    dep_stop_id: usize,
    arr_stop_id: usize,
) -> Result<i32, ExtractionError> {
    let dep_station_id = timetable.station_id(dep_stop_id);
    let arr_station_id = timetable.station_id(arr_stop_id);
    timetable
        .transfers()
        .minutes_between(dep_station_id, arr_station_id)
        .ok_or(ExtractionError::NoTransferBetween {
            dep_station_id,
            arr_station_id,
        })
}

fn foot_leg<T: TimeTable>(
    timetable: &T,
    date: NaiveDate,
    dep_stop_id: usize,
    arr_stop_id: usize,
    dep_mins: i32,
    arr_mins: i32,
) -> Leg {
    Leg::Foot(FootLeg {
        dep_stop: stop_at(timetable, dep_stop_id),
        dep_time: date_time(date, dep_mins),
        arr_stop: stop_at(timetable, arr_stop_id),
        arr_time: date_time(date, arr_mins),
    })
}

fn stop_at<T: TimeTable>(timetable: &T, stop_id: usize) -> Stop {
    let station_id = timetable.station_id(stop_id);
    let stations = timetable.stations();
    Stop::new(
        stations.name(station_id).to_string(),
        timetable.platform_name(stop_id).map(str::to_string),
        stations.longitude(station_id),
        stations.latitude(station_id),
    )
}

// Minutes may be negative or past the end of the day; offsetting midnight
// keeps overnight times correct.
fn date_time(date: NaiveDate, mins: i32) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::minutes(i64::from(mins))
}
