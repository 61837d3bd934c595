// Copyright  (C) 2020, Kisio Digital and/or its affiliates. All rights reserved.
//
// This file is part of Navitia,
// the software to build cool stuff with public transport.
//
// Hope you'll enjoy and contribute to this project,
// powered by Kisio Digital (www.kisio.com).
// Help us simplify mobility and open public transport:
// a non ending quest to the responsive locomotion way of traveling!
//
// This contribution is a part of the research and development work of the
// IVA Project which aims to enhance traveler information and is carried out
// under the leadership of the Technological Research Institute SystemX,
// with the partnership and support of the transport organization authority
// Ile-De-France Mobilités (IDFM), SNCF, and public funds
// under the scope of the French Program "Investissements d’Avenir".
//
// LICENCE: This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.
//
// Stay tuned using
// twitter @navitia
// channel `#navitia` on riot https://riot.im/app/#/room/#navitia:matrix.org
// https://groups.google.com/d/forum/navitia
// www.navitia.io

use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::PathBuf;

use chrono::NaiveDate;

pub mod cached;
pub mod mapped;
pub mod structured;

use self::mapped::{Connections, Platforms, Routes, StationAliases, Stations, Transfers, Trips};

/// The kind of vehicle serving a route.
///
/// The discriminant is the on-disk code; the order is part of the file
/// format contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vehicle {
    Tram,
    Metro,
    Train,
    Bus,
    Ferry,
    AerialLift,
    Funicular,
}

impl Vehicle {
    pub const ALL: [Vehicle; 7] = [
        Vehicle::Tram,
        Vehicle::Metro,
        Vehicle::Train,
        Vehicle::Bus,
        Vehicle::Ferry,
        Vehicle::AerialLift,
        Vehicle::Funicular,
    ];

    pub fn from_code(code: u8) -> Option<Vehicle> {
        Vehicle::ALL.get(code as usize).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Debug)]
pub enum TimeTableError {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    /// The file length is not a whole number of records.
    BadFileSize {
        path: PathBuf,
        record_size: usize,
        file_size: usize,
    },
    UnknownVehicleCode {
        route_id: usize,
        code: u8,
    },
    /// More than 255 transfers arrive at one station, which the packed
    /// transfer index cannot represent.
    OversizedTransferGroup {
        arr_station_id: usize,
    },
}

impl Display for TimeTableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TimeTableError::Io { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            TimeTableError::BadFileSize {
                path,
                record_size,
                file_size,
            } => write!(
                f,
                "{} has {} bytes, not a multiple of the {}-byte record",
                path.display(),
                file_size,
                record_size
            ),
            TimeTableError::UnknownVehicleCode { route_id, code } => {
                write!(f, "route {} has unknown vehicle code {}", route_id, code)
            }
            TimeTableError::OversizedTransferGroup { arr_station_id } => write!(
                f,
                "more than 255 transfers arrive at station {}",
                arr_station_id
            ),
        }
    }
}

impl std::error::Error for TimeTableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TimeTableError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A static public transport timetable.
///
/// The base views live for the whole process; trips and connections are
/// day-scoped and fetched per query date. Stop ids share one namespace:
/// ids below the station count are stations, the rest are platforms offset
/// by the station count.
pub trait TimeTable {
    fn stations(&self) -> &Stations;

    fn station_aliases(&self) -> &StationAliases;

    fn platforms(&self) -> &Platforms;

    fn routes(&self) -> &Routes;

    fn transfers(&self) -> &Transfers;

    fn trips_for(&self, date: NaiveDate) -> Result<Trips, TimeTableError>;

    fn connections_for(&self, date: NaiveDate) -> Result<Connections, TimeTableError>;

    fn is_station_id(&self, stop_id: usize) -> bool {
        stop_id < self.stations().len()
    }

    fn is_platform_id(&self, stop_id: usize) -> bool {
        stop_id >= self.stations().len()
    }

    /// The station a stop belongs to: the stop itself if it is a station,
    /// otherwise the platform's station.
    fn station_id(&self, stop_id: usize) -> usize {
        if self.is_station_id(stop_id) {
            stop_id
        } else {
            self.platforms().station_id(stop_id - self.stations().len())
        }
    }

    /// The platform name of a stop, or `None` if the stop is a station.
    fn platform_name(&self, stop_id: usize) -> Option<&str> {
        if self.is_platform_id(stop_id) {
            Some(self.platforms().name(stop_id - self.stations().len()))
        } else {
            None
        }
    }
}
