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

use std::ops::Deref;
use std::sync::Arc;

use memmap2::Mmap;

/// Width of one field of a flattened record. All fields are big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    U8,
    U16,
    S32,
}

impl FieldType {
    fn size(self) -> usize {
        match self {
            FieldType::U8 => 1,
            FieldType::U16 => 2,
            FieldType::S32 => 4,
        }
    }
}

/// The fixed layout of one record: field offsets and total record size.
#[derive(Debug, Clone)]
pub struct Structure {
    offsets: Vec<usize>,
    record_size: usize,
}

impl Structure {
    pub fn new(fields: &[FieldType]) -> Self {
        let mut offsets = Vec::with_capacity(fields.len());
        let mut record_size = 0;
        for field in fields {
            offsets.push(record_size);
            record_size += field.size();
        }
        Structure {
            offsets,
            record_size,
        }
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    fn offset(&self, field: usize, index: usize) -> usize {
        index * self.record_size + self.offsets[field]
    }
}

/// A read-only byte buffer, either memory-mapped from a file or owned.
///
/// Cloning is cheap; all clones share the same underlying bytes, which is
/// what lets the day cache hand out views without re-mapping files.
#[derive(Clone, Debug)]
pub struct Buffer(BufferImpl);

#[derive(Clone, Debug)]
enum BufferImpl {
    Mapped(Arc<Mmap>),
    Owned(Arc<[u8]>),
}

impl Buffer {
    pub fn from_mmap(mmap: Mmap) -> Self {
        Buffer(BufferImpl::Mapped(Arc::new(mmap)))
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(bytes: Vec<u8>) -> Self {
        Buffer(BufferImpl::Owned(bytes.into()))
    }
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match &self.0 {
            BufferImpl::Mapped(mmap) => mmap,
            BufferImpl::Owned(bytes) => bytes,
        }
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

/// The buffer length is not a whole number of records.
#[derive(Debug)]
pub struct BadBufferSize {
    pub record_size: usize,
    pub buffer_len: usize,
}

/// A byte buffer read through a record layout: `size` records of
/// `record_size` bytes each, with O(1) big-endian field access.
#[derive(Clone, Debug)]
pub struct StructuredBuffer {
    structure: Structure,
    bytes: Buffer,
    len: usize,
}

impl StructuredBuffer {
    pub fn new(structure: Structure, bytes: Buffer) -> Result<Self, BadBufferSize> {
        let record_size = structure.record_size();
        if record_size == 0 || bytes.len() % record_size != 0 {
            return Err(BadBufferSize {
                record_size,
                buffer_len: bytes.len(),
            });
        }
        let len = bytes.len() / record_size;
        Ok(StructuredBuffer {
            structure,
            bytes,
            len,
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads a U8 field. Panics if `index` is out of range.
    pub fn read_u8(&self, field: usize, index: usize) -> u8 {
        assert!(index < self.len, "record index {} out of range", index);
        self.bytes[self.structure.offset(field, index)]
    }

    /// Reads a U16 field. Panics if `index` is out of range.
    pub fn read_u16(&self, field: usize, index: usize) -> u16 {
        assert!(index < self.len, "record index {} out of range", index);
        let offset = self.structure.offset(field, index);
        u16::from_be_bytes([self.bytes[offset], self.bytes[offset + 1]])
    }

    /// Reads an S32 field. Panics if `index` is out of range.
    pub fn read_s32(&self, field: usize, index: usize) -> i32 {
        assert!(index < self.len, "record index {} out of range", index);
        let offset = self.structure.offset(field, index);
        i32::from_be_bytes([
            self.bytes[offset],
            self.bytes[offset + 1],
            self.bytes[offset + 2],
            self.bytes[offset + 3],
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StructuredBuffer {
        // two records of (U16, U8, S32)
        let bytes: Vec<u8> = vec![
            0x00, 0x2A, // 42
            0x07, // 7
            0xFF, 0xFF, 0xFF, 0xFE, // -2
            0x12, 0x34, // 0x1234
            0xFF, // 255
            0x00, 0x00, 0x00, 0x09, // 9
        ];
        let structure = Structure::new(&[FieldType::U16, FieldType::U8, FieldType::S32]);
        StructuredBuffer::new(structure, Buffer::from(bytes)).unwrap()
    }

    #[test]
    fn reads_big_endian_fields() {
        let buffer = sample();
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.read_u16(0, 0), 42);
        assert_eq!(buffer.read_u8(1, 0), 7);
        assert_eq!(buffer.read_s32(2, 0), -2);
        assert_eq!(buffer.read_u16(0, 1), 0x1234);
        assert_eq!(buffer.read_u8(1, 1), 255);
        assert_eq!(buffer.read_s32(2, 1), 9);
    }

    #[test]
    fn rejects_partial_records() {
        let structure = Structure::new(&[FieldType::U16, FieldType::U8]);
        let err = StructuredBuffer::new(structure, Buffer::from(vec![0u8; 7])).unwrap_err();
        assert_eq!(err.record_size, 3);
        assert_eq!(err.buffer_len, 7);
    }

    #[test]
    #[should_panic]
    fn rejects_out_of_range_index() {
        sample().read_u16(0, 2);
    }
}
