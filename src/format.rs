//! Point log container for recording and replaying point streams.
//!
//! Layout: a fixed-size header (magic, version, time range, count)
//! followed by length-prefixed postcard records, one per [`Point`].

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Point;

/// Magic bytes identifying a point log
pub const LOG_MAGIC: [u8; 4] = *b"PLOG";

/// Current format version
pub const LOG_VERSION: u16 = 1;

/// Fixed header size in bytes; the serialized header is zero-padded to this
pub const HEADER_SIZE: usize = 64;

// A serialized point is tens of bytes; larger prefixes mean corruption.
const MAX_RECORD_SIZE: usize = 65_536;

/// Fixed-size header at the start of every point log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointLogHeader {
    /// Magic bytes
    pub magic: [u8; 4],
    /// Format version
    pub version: u16,
    /// Reserved flag bits
    pub flags: u16,
    /// Timestamp of the first stamped point (microseconds), 0 if none
    pub start_time_us: u64,
    /// Timestamp of the last stamped point (microseconds), 0 if none
    pub end_time_us: u64,
    /// Number of point records in the body
    pub point_count: u64,
    /// Reserved for future use
    pub reserved: [u8; 24],
}

impl PointLogHeader {
    fn new() -> Self {
        Self {
            magic: LOG_MAGIC,
            version: LOG_VERSION,
            flags: 0,
            start_time_us: 0,
            end_time_us: 0,
            point_count: 0,
            reserved: [0u8; 24],
        }
    }

    /// Check magic bytes and version
    pub fn is_valid(&self) -> bool {
        self.magic == LOG_MAGIC && self.version == LOG_VERSION
    }

    /// Recorded time span in microseconds
    pub fn duration_us(&self) -> u64 {
        self.end_time_us.saturating_sub(self.start_time_us)
    }
}

/// Summary of a completed point log
#[derive(Debug, Clone)]
pub struct PointLogInfo {
    /// Number of points written
    pub point_count: u64,
    /// Timestamp of the first stamped point (microseconds), 0 if none
    pub start_time_us: u64,
    /// Timestamp of the last stamped point (microseconds), 0 if none
    pub end_time_us: u64,
}

impl PointLogInfo {
    /// Recorded time span in microseconds
    pub fn duration_us(&self) -> u64 {
        self.end_time_us.saturating_sub(self.start_time_us)
    }
}

/// Streaming point log writer.
///
/// `create` reserves the header region; `finish` seeks back and fills it
/// in once the counts and time range are known.
pub struct PointLogWriter {
    writer: BufWriter<File>,
    point_count: u64,
    start_time_us: Option<u64>,
    end_time_us: Option<u64>,
}

impl PointLogWriter {
    /// Create a new point log, truncating any existing file
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        // Reserve the header region; finish() comes back to fill it in
        writer.write_all(&[0u8; HEADER_SIZE])?;

        Ok(Self {
            writer,
            point_count: 0,
            start_time_us: None,
            end_time_us: None,
        })
    }

    /// Append one point record
    pub fn append(&mut self, point: &Point) -> Result<()> {
        let payload = postcard::to_allocvec(point)?;

        let len = payload.len() as u32;
        self.writer.write_all(&len.to_le_bytes())?;
        self.writer.write_all(&payload)?;

        self.point_count += 1;
        if let Some(ts) = point.timestamp_us {
            if self.start_time_us.is_none() {
                self.start_time_us = Some(ts);
            }
            self.end_time_us = Some(ts);
        }

        Ok(())
    }

    /// Number of points written so far
    pub fn point_count(&self) -> u64 {
        self.point_count
    }

    /// Write the completed header and flush everything to disk
    pub fn finish(mut self) -> Result<PointLogInfo> {
        let mut header = PointLogHeader::new();
        header.start_time_us = self.start_time_us.unwrap_or(0);
        header.end_time_us = self.end_time_us.unwrap_or(0);
        header.point_count = self.point_count;

        let header_bytes = postcard::to_allocvec(&header)?;
        if header_bytes.len() > HEADER_SIZE {
            return Err(Error::InvalidFormat(format!(
                "Header too large: {} bytes",
                header_bytes.len()
            )));
        }
        let mut buffer = [0u8; HEADER_SIZE];
        buffer[..header_bytes.len()].copy_from_slice(&header_bytes);

        self.writer.seek(SeekFrom::Start(0))?;
        self.writer.write_all(&buffer)?;
        self.writer.flush()?;

        Ok(PointLogInfo {
            point_count: self.point_count,
            start_time_us: header.start_time_us,
            end_time_us: header.end_time_us,
        })
    }
}

/// Streaming point log reader.
pub struct PointLogReader {
    reader: BufReader<File>,
    header: PointLogHeader,
    points_read: u64,
}

impl PointLogReader {
    /// Open a point log and validate its header
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut header_buffer = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header_buffer)?;

        let header: PointLogHeader = postcard::from_bytes(&header_buffer)
            .map_err(|e| Error::InvalidFormat(format!("Failed to parse header: {}", e)))?;

        if !header.is_valid() {
            return Err(Error::InvalidFormat(
                "Bad magic bytes or unsupported version".to_string(),
            ));
        }

        Ok(Self {
            reader,
            header,
            points_read: 0,
        })
    }

    /// Header read at open time
    pub fn header(&self) -> &PointLogHeader {
        &self.header
    }

    /// Total points recorded in the log
    pub fn point_count(&self) -> u64 {
        self.header.point_count
    }

    /// Points read so far
    pub fn points_read(&self) -> u64 {
        self.points_read
    }

    /// Read the next point record.
    ///
    /// Returns `None` at end of file.
    pub fn next_point(&mut self) -> Result<Option<Point>> {
        // Length prefix, 4 bytes little-endian
        let mut len_bytes = [0u8; 4];
        match self.reader.read_exact(&mut len_bytes) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_le_bytes(len_bytes) as usize;
        if len > MAX_RECORD_SIZE {
            return Err(Error::InvalidFormat(format!(
                "Record too large: {} bytes",
                len
            )));
        }

        let mut payload = vec![0u8; len];
        self.reader.read_exact(&mut payload)?;

        let point: Point = postcard::from_bytes(&payload)?;
        self.points_read += 1;

        Ok(Some(point))
    }

    /// Seek back to the first record
    pub fn rewind(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        self.points_read = 0;
        Ok(())
    }
}

impl Iterator for PointLogReader {
    type Item = Result<Point>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_point() {
            Ok(Some(point)) => Some(Ok(point)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
