// Copyright (C) 2017 Kisio Digital and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

//! Provides an easy way to assemble a small timetable and write it to a
//! directory in the binary on-disk format.
//!
//! ```ignore
//! let timetable = TimetableBuilder::default()
//!     .station("A")
//!     .station("B")
//!     .transfer("B", "B", 0)
//!     .route("m1", Vehicle::Metro)
//!     .trip("2025-03-17", "m1", "B", |trip| {
//!         trip.stop("A", "10:00", "10:00").stop("B", "10:12", "10:12");
//!     });
//! timetable.write(dir.path())?;
//! ```
//!
//! Stops are referenced by station name, or by `"Station/Platform"` for a
//! platform of a station.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::Path;

use horaire::Vehicle;

const COORD_UNIT: f64 = 4_294_967_296.0 / 360.0;

#[derive(Default)]
pub struct TimetableBuilder {
    strings: Vec<String>,
    stations: Vec<StationRecord>,
    aliases: Vec<(u16, u16)>,
    platforms: Vec<PlatformRecord>,
    routes: Vec<RouteRecord>,
    transfers: Vec<TransferRecord>,
    days: BTreeMap<String, Vec<TripRecord>>,
}

struct StationRecord {
    name: String,
    name_idx: u16,
    lon: i32,
    lat: i32,
}

struct PlatformRecord {
    name: String,
    name_idx: u16,
    station_id: u16,
}

struct RouteRecord {
    name: String,
    name_idx: u16,
    vehicle: Vehicle,
}

struct TransferRecord {
    dep_station_id: u16,
    arr_station_id: u16,
    minutes: u8,
}

struct TripRecord {
    route_id: u16,
    destination_idx: u16,
    stops: Vec<StopTime>,
}

struct StopTime {
    stop_id: u16,
    arr_mins: u16,
    dep_mins: u16,
}

/// Accumulates the stop times of one trip.
pub struct TripBuilder<'a> {
    timetable: &'a mut TimetableBuilder,
    stops: Vec<StopTime>,
}

impl<'a> TripBuilder<'a> {
    /// Adds a stop with its arrival and departure times (`"HH:MM"`). The
    /// arrival of the first stop and the departure of the last one are
    /// never read.
    pub fn stop(&mut self, stop: &str, arr: &str, dep: &str) -> &mut Self {
        let stop_id = self.timetable.stop_id(stop);
        self.stops.push(StopTime {
            stop_id,
            arr_mins: parse_time(arr),
            dep_mins: parse_time(dep),
        });
        self
    }
}

impl TimetableBuilder {
    pub fn station(self, name: &str) -> Self {
        // somewhere around Lausanne, offset per station to keep
        // coordinates distinct
        let n = self.stations.len() as f64;
        self.station_at(name, 6.62 + n * 0.01, 46.51 + n * 0.01)
    }

    pub fn station_at(mut self, name: &str, lon_degrees: f64, lat_degrees: f64) -> Self {
        let name_idx = self.intern(name);
        self.stations.push(StationRecord {
            name: name.to_string(),
            name_idx,
            lon: (lon_degrees * COORD_UNIT) as i32,
            lat: (lat_degrees * COORD_UNIT) as i32,
        });
        self
    }

    pub fn alias(mut self, alias: &str, station: &str) -> Self {
        let alias_idx = self.intern(alias);
        let station_idx = self.intern(station);
        self.aliases.push((alias_idx, station_idx));
        self
    }

    pub fn platform(mut self, station: &str, name: &str) -> Self {
        let station_id = self.station_id(station);
        let name_idx = self.intern(name);
        self.platforms.push(PlatformRecord {
            name: name.to_string(),
            name_idx,
            station_id,
        });
        self
    }

    pub fn route(mut self, name: &str, vehicle: Vehicle) -> Self {
        let name_idx = self.intern(name);
        self.routes.push(RouteRecord {
            name: name.to_string(),
            name_idx,
            vehicle,
        });
        self
    }

    pub fn transfer(mut self, from: &str, to: &str, minutes: u8) -> Self {
        let dep_station_id = self.station_id(from);
        let arr_station_id = self.station_id(to);
        self.transfers.push(TransferRecord {
            dep_station_id,
            arr_station_id,
            minutes,
        });
        self
    }

    /// Declares a service day, possibly without any trip.
    pub fn day(mut self, date: &str) -> Self {
        self.days.entry(date.to_string()).or_default();
        self
    }

    pub fn trip<F>(mut self, date: &str, route: &str, destination: &str, mut initer: F) -> Self
    where
        F: FnMut(&mut TripBuilder),
    {
        let route_id = self
            .routes
            .iter()
            .position(|r| r.name == route)
            .unwrap_or_else(|| panic!("unknown route {}", route)) as u16;
        let destination_idx = self.intern(destination);
        let mut trip_builder = TripBuilder {
            timetable: &mut self,
            stops: Vec::new(),
        };
        initer(&mut trip_builder);
        let stops = trip_builder.stops;
        assert!(stops.len() >= 2, "a trip needs at least two stops");
        self.days.entry(date.to_string()).or_default().push(TripRecord {
            route_id,
            destination_idx,
            stops,
        });
        self
    }

    /// Writes the timetable to `dir` in the binary on-disk format.
    pub fn write(&self, dir: &Path) -> io::Result<()> {
        // strings.txt, Latin-1, one string per line
        let mut text = Vec::new();
        for string in &self.strings {
            for c in string.chars() {
                text.push(latin1_byte(c));
            }
            text.push(b'\n');
        }
        fs::write(dir.join("strings.txt"), text)?;

        let mut stations = Vec::new();
        for station in &self.stations {
            push_u16(&mut stations, station.name_idx);
            push_s32(&mut stations, station.lon);
            push_s32(&mut stations, station.lat);
        }
        fs::write(dir.join("stations.bin"), stations)?;

        let mut aliases = Vec::new();
        for &(alias_idx, station_idx) in &self.aliases {
            push_u16(&mut aliases, alias_idx);
            push_u16(&mut aliases, station_idx);
        }
        fs::write(dir.join("station-aliases.bin"), aliases)?;

        let mut platforms = Vec::new();
        for platform in &self.platforms {
            push_u16(&mut platforms, platform.name_idx);
            push_u16(&mut platforms, platform.station_id);
        }
        fs::write(dir.join("platforms.bin"), platforms)?;

        let mut routes = Vec::new();
        for route in &self.routes {
            push_u16(&mut routes, route.name_idx);
            routes.push(route.vehicle.code());
        }
        fs::write(dir.join("routes.bin"), routes)?;

        // transfers are globally sorted by arrival station
        let mut sorted_transfers: Vec<&TransferRecord> = self.transfers.iter().collect();
        sorted_transfers.sort_by_key(|t| t.arr_station_id);
        let mut transfers = Vec::new();
        for transfer in sorted_transfers {
            push_u16(&mut transfers, transfer.dep_station_id);
            push_u16(&mut transfers, transfer.arr_station_id);
            transfers.push(transfer.minutes);
        }
        fs::write(dir.join("transfers.bin"), transfers)?;

        for (date, trips) in &self.days {
            self.write_day(&dir.join(date), trips)?;
        }

        Ok(())
    }

    fn write_day(&self, day_dir: &Path, trips: &[TripRecord]) -> io::Result<()> {
        fs::create_dir_all(day_dir)?;

        let mut trips_bytes = Vec::new();
        for trip in trips {
            push_u16(&mut trips_bytes, trip.route_id);
            push_u16(&mut trips_bytes, trip.destination_idx);
        }
        fs::write(day_dir.join("trips.bin"), trips_bytes)?;

        struct RawConnection {
            dep_stop_id: u16,
            dep_mins: u16,
            arr_stop_id: u16,
            arr_mins: u16,
            trip_id: usize,
            trip_pos: u8,
        }

        let mut connections = Vec::new();
        for (trip_id, trip) in trips.iter().enumerate() {
            for (trip_pos, pair) in trip.stops.windows(2).enumerate() {
                connections.push(RawConnection {
                    dep_stop_id: pair[0].stop_id,
                    dep_mins: pair[0].dep_mins,
                    arr_stop_id: pair[1].stop_id,
                    arr_mins: pair[1].arr_mins,
                    trip_id,
                    trip_pos: trip_pos as u8,
                });
            }
        }
        // the router scans connections by decreasing departure time
        connections.sort_by(|a, b| b.dep_mins.cmp(&a.dep_mins));

        let index_of: HashMap<(usize, u8), usize> = connections
            .iter()
            .enumerate()
            .map(|(index, c)| ((c.trip_id, c.trip_pos), index))
            .collect();

        let mut connections_bytes = Vec::new();
        let mut successors_bytes = Vec::new();
        for connection in &connections {
            push_u16(&mut connections_bytes, connection.dep_stop_id);
            push_u16(&mut connections_bytes, connection.dep_mins);
            push_u16(&mut connections_bytes, connection.arr_stop_id);
            push_u16(&mut connections_bytes, connection.arr_mins);
            let packed = ((connection.trip_id as u32) << 8) | connection.trip_pos as u32;
            push_s32(&mut connections_bytes, packed as i32);

            // next connection of the same trip, wrapping to its first one
            let successor = index_of
                .get(&(connection.trip_id, connection.trip_pos + 1))
                .or_else(|| index_of.get(&(connection.trip_id, 0)))
                .unwrap();
            push_s32(&mut successors_bytes, *successor as i32);
        }
        fs::write(day_dir.join("connections.bin"), connections_bytes)?;
        fs::write(day_dir.join("connections-succ.bin"), successors_bytes)?;

        Ok(())
    }

    fn intern(&mut self, string: &str) -> u16 {
        if let Some(index) = self.strings.iter().position(|s| s == string) {
            return index as u16;
        }
        self.strings.push(string.to_string());
        (self.strings.len() - 1) as u16
    }

    fn station_id(&self, name: &str) -> u16 {
        self.stations
            .iter()
            .position(|s| s.name == name)
            .unwrap_or_else(|| panic!("unknown station {}", name)) as u16
    }

    /// Resolves `"Station"` to a station id and `"Station/Platform"` to a
    /// platform id offset by the number of stations.
    fn stop_id(&self, reference: &str) -> u16 {
        match reference.split_once('/') {
            None => self.station_id(reference),
            Some((station, platform)) => {
                let station_id = self.station_id(station);
                let platform_index = self
                    .platforms
                    .iter()
                    .position(|p| p.station_id == station_id && p.name == platform)
                    .unwrap_or_else(|| panic!("unknown platform {}", reference));
                (self.stations.len() + platform_index) as u16
            }
        }
    }
}

fn parse_time(time: &str) -> u16 {
    let (hours, minutes) = time
        .split_once(':')
        .unwrap_or_else(|| panic!("bad time {}", time));
    let hours: u16 = hours.parse().unwrap_or_else(|_| panic!("bad time {}", time));
    let minutes: u16 = minutes.parse().unwrap_or_else(|_| panic!("bad time {}", time));
    hours * 60 + minutes
}

fn latin1_byte(c: char) -> u8 {
    let code = c as u32;
    assert!(code < 256, "character {:?} is not Latin-1", c);
    code as u8
}

fn push_u16(bytes: &mut Vec<u8>, value: u16) {
    bytes.extend_from_slice(&value.to_be_bytes());
}

fn push_s32(bytes: &mut Vec<u8>, value: i32) {
    bytes.extend_from_slice(&value.to_be_bytes());
}
