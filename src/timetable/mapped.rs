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

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use memmap2::Mmap;
use tracing::{debug, info};

use crate::packed::PackedRange;
use crate::timetable::structured::{
    BadBufferSize, Buffer, FieldType, Structure, StructuredBuffer,
};
use crate::timetable::{TimeTable, TimeTableError, Vehicle};

// Stored coordinates are 32-bit fixed point: value * 360 / 2^32 degrees.
const LON_LAT_UNIT: f64 = 360.0 / 4_294_967_296.0;

/// The shared string table: one Latin-1 string per line of `strings.txt`,
/// referenced by index from every other file.
pub struct StringTable {
    strings: Vec<String>,
}

impl StringTable {
    pub fn load(path: &Path) -> Result<Self, TimeTableError> {
        let bytes = std::fs::read(path).map_err(|source| TimeTableError::Io {
            path: path.to_owned(),
            source,
        })?;
        let text = encoding_rs::mem::decode_latin1(&bytes);
        let mut strings: Vec<String> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        // a trailing newline does not declare one more (empty) string
        if strings.last().map_or(false, |last| last.is_empty()) {
            strings.pop();
        }
        Ok(StringTable { strings })
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Panics if `index` is out of range.
    pub fn get(&self, index: usize) -> &str {
        &self.strings[index]
    }
}

impl From<Vec<String>> for StringTable {
    fn from(strings: Vec<String>) -> Self {
        StringTable { strings }
    }
}

/// Stations: name and fixed-point coordinates.
#[derive(Clone)]
pub struct Stations {
    buffer: StructuredBuffer,
    strings: Arc<StringTable>,
}

impl Stations {
    const NAME: usize = 0;
    const LON: usize = 1;
    const LAT: usize = 2;

    pub fn structure() -> Structure {
        Structure::new(&[FieldType::U16, FieldType::S32, FieldType::S32])
    }

    pub fn new(strings: Arc<StringTable>, buffer: StructuredBuffer) -> Self {
        Stations { buffer, strings }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn name(&self, id: usize) -> &str {
        self.strings.get(self.buffer.read_u16(Self::NAME, id) as usize)
    }

    pub fn longitude(&self, id: usize) -> f64 {
        f64::from(self.buffer.read_s32(Self::LON, id)) * LON_LAT_UNIT
    }

    pub fn latitude(&self, id: usize) -> f64 {
        f64::from(self.buffer.read_s32(Self::LAT, id)) * LON_LAT_UNIT
    }
}

/// Alternative station names, mapping an alias to a canonical name.
///
/// Not read by the router; exposed for name-index consumers.
#[derive(Clone)]
pub struct StationAliases {
    buffer: StructuredBuffer,
    strings: Arc<StringTable>,
}

impl StationAliases {
    const ALIAS: usize = 0;
    const STATION_NAME: usize = 1;

    pub fn structure() -> Structure {
        Structure::new(&[FieldType::U16, FieldType::U16])
    }

    pub fn new(strings: Arc<StringTable>, buffer: StructuredBuffer) -> Self {
        StationAliases { buffer, strings }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn alias(&self, id: usize) -> &str {
        self.strings.get(self.buffer.read_u16(Self::ALIAS, id) as usize)
    }

    pub fn station_name(&self, id: usize) -> &str {
        self.strings
            .get(self.buffer.read_u16(Self::STATION_NAME, id) as usize)
    }
}

/// Platforms: a name (often a track number) and the owning station.
#[derive(Clone)]
pub struct Platforms {
    buffer: StructuredBuffer,
    strings: Arc<StringTable>,
}

impl Platforms {
    const NAME: usize = 0;
    const STATION_ID: usize = 1;

    pub fn structure() -> Structure {
        Structure::new(&[FieldType::U16, FieldType::U16])
    }

    pub fn new(strings: Arc<StringTable>, buffer: StructuredBuffer) -> Self {
        Platforms { buffer, strings }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn name(&self, id: usize) -> &str {
        self.strings.get(self.buffer.read_u16(Self::NAME, id) as usize)
    }

    pub fn station_id(&self, id: usize) -> usize {
        self.buffer.read_u16(Self::STATION_ID, id) as usize
    }
}

/// Routes: a name and the kind of vehicle serving them.
#[derive(Clone)]
pub struct Routes {
    buffer: StructuredBuffer,
    strings: Arc<StringTable>,
}

impl Routes {
    const NAME: usize = 0;
    const VEHICLE: usize = 1;

    pub fn structure() -> Structure {
        Structure::new(&[FieldType::U16, FieldType::U8])
    }

    /// Vehicle codes are checked here once, so `vehicle` cannot fail.
    pub fn new(
        strings: Arc<StringTable>,
        buffer: StructuredBuffer,
    ) -> Result<Self, TimeTableError> {
        for route_id in 0..buffer.len() {
            let code = buffer.read_u8(Self::VEHICLE, route_id);
            if Vehicle::from_code(code).is_none() {
                return Err(TimeTableError::UnknownVehicleCode { route_id, code });
            }
        }
        Ok(Routes { buffer, strings })
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn name(&self, id: usize) -> &str {
        self.strings.get(self.buffer.read_u16(Self::NAME, id) as usize)
    }

    pub fn vehicle(&self, id: usize) -> Vehicle {
        // unwrap is safe because codes were checked in Self::new
        Vehicle::from_code(self.buffer.read_u8(Self::VEHICLE, id)).unwrap()
    }
}

/// Trips of one day: the route they follow and their headsign.
#[derive(Clone)]
pub struct Trips {
    buffer: StructuredBuffer,
    strings: Arc<StringTable>,
}

impl Trips {
    const ROUTE_ID: usize = 0;
    const DESTINATION: usize = 1;

    pub fn structure() -> Structure {
        Structure::new(&[FieldType::U16, FieldType::U16])
    }

    pub fn new(strings: Arc<StringTable>, buffer: StructuredBuffer) -> Self {
        Trips { buffer, strings }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn route_id(&self, id: usize) -> usize {
        self.buffer.read_u16(Self::ROUTE_ID, id) as usize
    }

    pub fn destination(&self, id: usize) -> &str {
        self.strings
            .get(self.buffer.read_u16(Self::DESTINATION, id) as usize)
    }
}

/// Walking edges between stations, globally sorted by arrival station so
/// that the transfers into one station form a contiguous range.
#[derive(Clone)]
pub struct Transfers {
    buffer: StructuredBuffer,
    // indexed by arrival station id
    arriving: Vec<PackedRange>,
}

impl Transfers {
    const DEP_STATION_ID: usize = 0;
    const ARR_STATION_ID: usize = 1;
    const MINUTES: usize = 2;

    pub fn structure() -> Structure {
        Structure::new(&[FieldType::U16, FieldType::U16, FieldType::U8])
    }

    pub fn new(buffer: StructuredBuffer) -> Result<Self, TimeTableError> {
        // single pass over the arrStationId-sorted table: one range per
        // distinct arrival station
        let mut arriving = Vec::new();
        let mut current: Option<(usize, usize)> = None;
        for id in 0..buffer.len() {
            let arr_station_id = buffer.read_u16(Self::ARR_STATION_ID, id) as usize;
            if let Some((station, start)) = current {
                if station == arr_station_id {
                    continue;
                }
                close_group(&mut arriving, station, start, id)?;
            }
            current = Some((arr_station_id, id));
        }
        if let Some((station, start)) = current {
            close_group(&mut arriving, station, start, buffer.len())?;
        }
        Ok(Transfers { buffer, arriving })
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn dep_station_id(&self, id: usize) -> usize {
        self.buffer.read_u16(Self::DEP_STATION_ID, id) as usize
    }

    pub fn arr_station_id(&self, id: usize) -> usize {
        self.buffer.read_u16(Self::ARR_STATION_ID, id) as usize
    }

    pub fn minutes(&self, id: usize) -> i32 {
        i32::from(self.buffer.read_u8(Self::MINUTES, id))
    }

    /// The range of transfer ids arriving at `station_id`; empty when the
    /// station has no incoming transfer.
    pub fn arriving_at(&self, station_id: usize) -> PackedRange {
        self.arriving
            .get(station_id)
            .copied()
            .unwrap_or(PackedRange::EMPTY)
    }

    /// The walking time between two stations, or `None` when no such
    /// transfer exists.
    pub fn minutes_between(&self, dep_station_id: usize, arr_station_id: usize) -> Option<i32> {
        self.arriving_at(arr_station_id)
            .indices()
            .find(|&id| self.dep_station_id(id) == dep_station_id)
            .map(|id| self.minutes(id))
    }
}

fn close_group(
    arriving: &mut Vec<PackedRange>,
    arr_station_id: usize,
    start: usize,
    end: usize,
) -> Result<(), TimeTableError> {
    if end - start > 0xFF {
        return Err(TimeTableError::OversizedTransferGroup { arr_station_id });
    }
    if arriving.len() <= arr_station_id {
        arriving.resize(arr_station_id + 1, PackedRange::EMPTY);
    }
    arriving[arr_station_id] = PackedRange::new(start, end);
    Ok(())
}

/// Connections of one day, sorted by decreasing departure time, with the
/// successor table linking each connection to the next one of its trip.
#[derive(Clone)]
pub struct Connections {
    buffer: StructuredBuffer,
    successors: Buffer,
}

impl Connections {
    const DEP_STOP_ID: usize = 0;
    const DEP_MINS: usize = 1;
    const ARR_STOP_ID: usize = 2;
    const ARR_MINS: usize = 3;
    const TRIP_POS: usize = 4;

    pub fn structure() -> Structure {
        Structure::new(&[
            FieldType::U16,
            FieldType::U16,
            FieldType::U16,
            FieldType::U16,
            FieldType::S32,
        ])
    }

    pub fn new(buffer: StructuredBuffer, successors: Buffer) -> Result<Self, BadBufferSize> {
        // one big-endian S32 successor per connection
        if successors.len() != buffer.len() * 4 {
            return Err(BadBufferSize {
                record_size: 4,
                buffer_len: successors.len(),
            });
        }
        Ok(Connections { buffer, successors })
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn dep_stop_id(&self, id: usize) -> usize {
        self.buffer.read_u16(Self::DEP_STOP_ID, id) as usize
    }

    pub fn dep_mins(&self, id: usize) -> i32 {
        i32::from(self.buffer.read_u16(Self::DEP_MINS, id))
    }

    pub fn arr_stop_id(&self, id: usize) -> usize {
        self.buffer.read_u16(Self::ARR_STOP_ID, id) as usize
    }

    pub fn arr_mins(&self, id: usize) -> i32 {
        i32::from(self.buffer.read_u16(Self::ARR_MINS, id))
    }

    /// The trip this connection belongs to, from the 24 high bits of the
    /// packed trip field.
    pub fn trip_id(&self, id: usize) -> usize {
        ((self.buffer.read_s32(Self::TRIP_POS, id) as u32) >> 8) as usize
    }

    /// The position of this connection within its trip, from the 8 low
    /// bits of the packed trip field.
    pub fn trip_pos(&self, id: usize) -> u32 {
        (self.buffer.read_s32(Self::TRIP_POS, id) as u32) & 0xFF
    }

    /// The next connection of the same trip, circular within the trip.
    pub fn next_connection_id(&self, id: usize) -> usize {
        assert!(id < self.len(), "connection index {} out of range", id);
        let offset = id * 4;
        i32::from_be_bytes([
            self.successors[offset],
            self.successors[offset + 1],
            self.successors[offset + 2],
            self.successors[offset + 3],
        ]) as usize
    }
}

/// A timetable whose data files are mapped into memory once and read in
/// place for the lifetime of the process.
pub struct FileTimeTable {
    directory: PathBuf,
    strings: Arc<StringTable>,
    stations: Stations,
    station_aliases: StationAliases,
    platforms: Platforms,
    routes: Routes,
    transfers: Transfers,
}

impl FileTimeTable {
    /// Maps the base files of a timetable directory.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, TimeTableError> {
        let directory = directory.into();
        let strings = Arc::new(StringTable::load(&directory.join("strings.txt"))?);

        let stations = Stations::new(
            Arc::clone(&strings),
            structured_file(&directory.join("stations.bin"), Stations::structure())?,
        );
        let station_aliases = StationAliases::new(
            Arc::clone(&strings),
            structured_file(
                &directory.join("station-aliases.bin"),
                StationAliases::structure(),
            )?,
        );
        let platforms = Platforms::new(
            Arc::clone(&strings),
            structured_file(&directory.join("platforms.bin"), Platforms::structure())?,
        );
        let routes = Routes::new(
            Arc::clone(&strings),
            structured_file(&directory.join("routes.bin"), Routes::structure())?,
        )?;
        let transfers = Transfers::new(structured_file(
            &directory.join("transfers.bin"),
            Transfers::structure(),
        )?)?;

        info!(
            "loaded timetable from {}: {} stations, {} platforms, {} routes, {} transfers",
            directory.display(),
            stations.len(),
            platforms.len(),
            routes.len(),
            transfers.len(),
        );

        Ok(FileTimeTable {
            directory,
            strings,
            stations,
            station_aliases,
            platforms,
            routes,
            transfers,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn day_directory(&self, date: NaiveDate) -> PathBuf {
        self.directory.join(date.format("%Y-%m-%d").to_string())
    }
}

impl TimeTable for FileTimeTable {
    fn stations(&self) -> &Stations {
        &self.stations
    }

    fn station_aliases(&self) -> &StationAliases {
        &self.station_aliases
    }

    fn platforms(&self) -> &Platforms {
        &self.platforms
    }

    fn routes(&self) -> &Routes {
        &self.routes
    }

    fn transfers(&self) -> &Transfers {
        &self.transfers
    }

    fn trips_for(&self, date: NaiveDate) -> Result<Trips, TimeTableError> {
        let path = self.day_directory(date).join("trips.bin");
        debug!("mapping {}", path.display());
        Ok(Trips::new(
            Arc::clone(&self.strings),
            structured_file(&path, Trips::structure())?,
        ))
    }

    fn connections_for(&self, date: NaiveDate) -> Result<Connections, TimeTableError> {
        let day = self.day_directory(date);
        let path = day.join("connections.bin");
        let succ_path = day.join("connections-succ.bin");
        debug!("mapping {} and {}", path.display(), succ_path.display());
        let records = structured_file(&path, Connections::structure())?;
        let successors = map_file(&succ_path)?;
        Connections::new(records, successors).map_err(|err| TimeTableError::BadFileSize {
            path: succ_path,
            record_size: err.record_size,
            file_size: err.buffer_len,
        })
    }
}

fn map_file(path: &Path) -> Result<Buffer, TimeTableError> {
    let file = File::open(path).map_err(|source| TimeTableError::Io {
        path: path.to_owned(),
        source,
    })?;
    let len = file
        .metadata()
        .map_err(|source| TimeTableError::Io {
            path: path.to_owned(),
            source,
        })?
        .len();
    // a zero-length mapping is invalid, an empty file is not
    if len == 0 {
        return Ok(Buffer::from(Vec::new()));
    }
    let mmap = unsafe { Mmap::map(&file) }.map_err(|source| TimeTableError::Io {
        path: path.to_owned(),
        source,
    })?;
    Ok(Buffer::from_mmap(mmap))
}

fn structured_file(path: &Path, structure: Structure) -> Result<StructuredBuffer, TimeTableError> {
    let buffer = map_file(path)?;
    StructuredBuffer::new(structure, buffer).map_err(|err| TimeTableError::BadFileSize {
        path: path.to_owned(),
        record_size: err.record_size,
        file_size: err.buffer_len,
    })
}
