// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The linear byte container used to transport serialized values from the
//! workers to the coordinator.
//!
//! Layout is little-endian throughout. Strings are a `u64` length followed by
//! the raw bytes. The NdArray and Dataframe framing written on top of this
//! container is described in the crate docs of `engine`.

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, ErrorKind};

/// A growable little-endian byte container.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Archive {
    buf: Vec<u8>,
}

impl Archive {
    /// Creates an empty archive.
    pub fn new() -> Archive {
        Archive::default()
    }

    /// The number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Reports whether the archive is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Appends a 32-bit integer.
    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends a 64-bit integer.
    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends an unsigned 64-bit integer.
    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends a 32-bit float.
    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends a 64-bit float.
    pub fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends a length-prefixed string.
    pub fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Appends raw bytes without framing.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// The archive's contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the archive, returning its contents.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// A cursor over an archive's byte layout.
#[derive(Debug)]
pub struct ArchiveReader<'a> {
    buf: &'a [u8],
}

impl<'a> ArchiveReader<'a> {
    /// Creates a reader over the given bytes.
    pub fn new(buf: &'a [u8]) -> ArchiveReader<'a> {
        ArchiveReader { buf }
    }

    /// The number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn short(&self) -> Error {
        Error::new(ErrorKind::InvalidValue, "archive truncated".to_string())
    }

    /// Reads a 32-bit integer.
    pub fn read_i32(&mut self) -> Result<i32, Error> {
        self.buf.read_i32::<LittleEndian>().map_err(|_| self.short())
    }

    /// Reads a 64-bit integer.
    pub fn read_i64(&mut self) -> Result<i64, Error> {
        self.buf.read_i64::<LittleEndian>().map_err(|_| self.short())
    }

    /// Reads an unsigned 64-bit integer.
    pub fn read_u64(&mut self) -> Result<u64, Error> {
        self.buf.read_u64::<LittleEndian>().map_err(|_| self.short())
    }

    /// Reads a 64-bit float.
    pub fn read_f64(&mut self) -> Result<f64, Error> {
        self.buf.read_f64::<LittleEndian>().map_err(|_| self.short())
    }

    /// Reads a length-prefixed string.
    pub fn read_str(&mut self) -> Result<String, Error> {
        let len = self.read_u64()? as usize;
        let buf = self.buf;
        if buf.len() < len {
            return Err(self.short());
        }
        let (head, tail) = buf.split_at(len);
        let s = std::str::from_utf8(head)
            .map_err(|e| Error::new(ErrorKind::InvalidValue, e.to_string()))?
            .to_string();
        self.buf = tail;
        Ok(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_round_trip() {
        let mut arc = Archive::new();
        arc.write_i64(2);
        arc.write_i64(3);
        arc.write_str("dist");
        arc.write_i32(12);
        arc.write_f64(0.5);

        let bytes = arc.into_bytes();
        let mut reader = ArchiveReader::new(&bytes);
        assert_eq!(reader.read_i64().unwrap(), 2);
        assert_eq!(reader.read_i64().unwrap(), 3);
        assert_eq!(reader.read_str().unwrap(), "dist");
        assert_eq!(reader.read_i32().unwrap(), 12);
        assert_eq!(reader.read_f64().unwrap(), 0.5);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_reader_rejects_truncation() {
        let mut arc = Archive::new();
        arc.write_i32(7);
        let bytes = arc.into_bytes();
        let mut reader = ArchiveReader::new(&bytes);
        assert_eq!(
            reader.read_i64().unwrap_err().kind(),
            ErrorKind::InvalidValue
        );
    }
}
