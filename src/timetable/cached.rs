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

use std::cell::RefCell;

use chrono::NaiveDate;
use tracing::debug;

use crate::timetable::mapped::{
    Connections, Platforms, Routes, StationAliases, Stations, Transfers, Trips,
};
use crate::timetable::{TimeTable, TimeTableError};

#[derive(Clone)]
struct DayCache {
    date: NaiveDate,
    trips: Trips,
    connections: Connections,
}

/// Memoizes the day-scoped views of the last served date.
///
/// Requests are served one at a time (no internal synchronization); a
/// request for another date replaces both cached views. The views share
/// their underlying buffers, so a cache hit is two cheap clones.
pub struct CachedTimeTable<T> {
    inner: T,
    cache: RefCell<Option<DayCache>>,
}

impl<T: TimeTable> CachedTimeTable<T> {
    pub fn new(inner: T) -> Self {
        CachedTimeTable {
            inner,
            cache: RefCell::new(None),
        }
    }

    fn day(&self, date: NaiveDate) -> Result<DayCache, TimeTableError> {
        if let Some(day) = self.cache.borrow().as_ref() {
            if day.date == date {
                return Ok(day.clone());
            }
        }
        debug!("day cache miss for {}", date);
        let day = DayCache {
            date,
            trips: self.inner.trips_for(date)?,
            connections: self.inner.connections_for(date)?,
        };
        *self.cache.borrow_mut() = Some(day.clone());
        Ok(day)
    }
}

impl<T: TimeTable> TimeTable for CachedTimeTable<T> {
    fn stations(&self) -> &Stations {
        self.inner.stations()
    }

    fn station_aliases(&self) -> &StationAliases {
        self.inner.station_aliases()
    }

    fn platforms(&self) -> &Platforms {
        self.inner.platforms()
    }

    fn routes(&self) -> &Routes {
        self.inner.routes()
    }

    fn transfers(&self) -> &Transfers {
        self.inner.transfers()
    }

    fn trips_for(&self, date: NaiveDate) -> Result<Trips, TimeTableError> {
        self.day(date).map(|day| day.trips)
    }

    fn connections_for(&self, date: NaiveDate) -> Result<Connections, TimeTableError> {
        self.day(date).map(|day| day.connections)
    }
}
