// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CDR codec for the sbg_driver messages.
//!
//! Payloads start with the 4-byte encapsulation header, followed by the
//! message body. Only the leading fields needed for logging are decoded;
//! anything after the vector of interest is ignored.
//!
//! ```text
//! std_msgs/Header header     (i32 sec, u32 nanosec, string frame_id)
//! uint32          time_stamp
//! <status>                   (message specific, see below)
//! [uint32         gps_tow]   (GPS messages only)
//! Vector3         ...        (three f64)
//! ```

use crate::sample::{InertialSample, PositionSample, Sample, SampleKind, Vector3, VelocitySample};
use thiserror::Error;

/// CDR little-endian encapsulation identifier.
pub const CDR_LE: [u8; 4] = [0x00, 0x01, 0x00, 0x00];

/// `SbgImuStatus`: ten booleans.
const IMU_STATUS_LEN: usize = 10;
/// `SbgGpsPosStatus`: status and type bytes, then five signal-usage booleans.
const GPS_POS_STATUS_LEN: usize = 7;
/// `SbgGpsVelStatus`: status and type bytes.
const GPS_VEL_STATUS_LEN: usize = 2;

/// Payload decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("payload truncated: needed {needed} bytes at offset {offset}, have {len}")]
    Truncated {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("unknown encapsulation 0x{0:04x}")]
    UnknownEncapsulation(u16),
}

/// Message header stamp, as written by the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHeader {
    pub sec: i32,
    pub nanosec: u32,
    pub frame_id: String,
}

impl MessageHeader {
    pub fn new(sec: i32, nanosec: u32, frame_id: impl Into<String>) -> Self {
        Self {
            sec,
            nanosec,
            frame_id: frame_id.into(),
        }
    }
}

/// Decode a payload received on the channel for `kind`.
pub fn decode_sample(kind: SampleKind, payload: &[u8]) -> Result<Sample, DecodeError> {
    match kind {
        SampleKind::Inertial => decode_imu_data(payload).map(Sample::Inertial),
        SampleKind::Position => decode_gps_pos(payload).map(Sample::Position),
        SampleKind::Velocity => decode_gps_vel(payload).map(Sample::Velocity),
    }
}

/// Decode `sbg_driver/SbgImuData`.
pub fn decode_imu_data(payload: &[u8]) -> Result<InertialSample, DecodeError> {
    let mut cursor = CdrCursor::from_encapsulated(payload)?;
    let timestamp = cursor.read_prologue()?;
    cursor.skip(IMU_STATUS_LEN)?;
    let accel = cursor.read_vector3()?;
    let gyro = cursor.read_vector3()?;

    Ok(InertialSample {
        timestamp,
        accel,
        gyro,
    })
}

/// Decode `sbg_driver/SbgGpsPos`.
pub fn decode_gps_pos(payload: &[u8]) -> Result<PositionSample, DecodeError> {
    let mut cursor = CdrCursor::from_encapsulated(payload)?;
    let timestamp = cursor.read_prologue()?;
    cursor.skip(GPS_POS_STATUS_LEN)?;
    let _gps_tow = cursor.read_u32()?;
    let position = cursor.read_vector3()?;

    Ok(PositionSample {
        timestamp,
        position,
    })
}

/// Decode `sbg_driver/SbgGpsVel`.
pub fn decode_gps_vel(payload: &[u8]) -> Result<VelocitySample, DecodeError> {
    let mut cursor = CdrCursor::from_encapsulated(payload)?;
    let timestamp = cursor.read_prologue()?;
    cursor.skip(GPS_VEL_STATUS_LEN)?;
    let _gps_tow = cursor.read_u32()?;
    let velocity = cursor.read_vector3()?;

    Ok(VelocitySample {
        timestamp,
        velocity,
    })
}

/// Encode a sample with the layout its channel carries.
///
/// Status fields are zeroed and `gps_tow` is derived from the time stamp.
pub fn encode_sample(sample: &Sample, header: &MessageHeader) -> Vec<u8> {
    let mut writer = CdrWriter::new();
    match sample {
        Sample::Inertial(s) => {
            writer.write_prologue(header, s.timestamp);
            writer.write_zeroes(IMU_STATUS_LEN);
            writer.write_vector3(&s.accel);
            writer.write_vector3(&s.gyro);
            // temperature
            writer.write_f32(0.0);
        }
        Sample::Position(s) => {
            writer.write_prologue(header, s.timestamp);
            writer.write_zeroes(GPS_POS_STATUS_LEN);
            writer.write_u32(s.timestamp / 1000);
            writer.write_vector3(&s.position);
            // undulation
            writer.write_f64(0.0);
        }
        Sample::Velocity(s) => {
            writer.write_prologue(header, s.timestamp);
            writer.write_zeroes(GPS_VEL_STATUS_LEN);
            writer.write_u32(s.timestamp / 1000);
            writer.write_vector3(&s.velocity);
        }
    }
    writer.finish()
}

struct CdrCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    little_endian: bool,
}

impl<'a> CdrCursor<'a> {
    fn from_encapsulated(buf: &'a [u8]) -> Result<Self, DecodeError> {
        if buf.len() < 4 {
            return Err(DecodeError::Truncated {
                offset: 0,
                needed: 4,
                len: buf.len(),
            });
        }

        let rep_id = u16::from_be_bytes([buf[0], buf[1]]);
        let little_endian = match rep_id {
            0x0000 | 0x0002 => false,
            0x0001 | 0x0003 => true,
            other => return Err(DecodeError::UnknownEncapsulation(other)),
        };

        Ok(Self {
            buf: &buf[4..],
            pos: 0,
            little_endian,
        })
    }

    /// Header and `time_stamp`, common to every sbg message.
    fn read_prologue(&mut self) -> Result<u32, DecodeError> {
        let _sec = self.read_u32()?;
        let _nanosec = self.read_u32()?;
        self.skip_string()?;
        self.read_u32()
    }

    fn align(&mut self, alignment: usize) {
        let mask = alignment - 1;
        self.pos = (self.pos + mask) & !mask;
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.pos + n > self.buf.len() {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: n,
                len: self.buf.len(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        self.take(n).map(|_| ())
    }

    fn skip_string(&mut self) -> Result<(), DecodeError> {
        let len = self.read_u32()? as usize;
        self.skip(len)
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        self.align(4);
        let b = self.take(4)?;
        let bytes = [b[0], b[1], b[2], b[3]];
        Ok(if self.little_endian {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        })
    }

    fn read_f64(&mut self) -> Result<f64, DecodeError> {
        self.align(8);
        let b = self.take(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(b);
        Ok(if self.little_endian {
            f64::from_le_bytes(bytes)
        } else {
            f64::from_be_bytes(bytes)
        })
    }

    fn read_vector3(&mut self) -> Result<Vector3, DecodeError> {
        Ok(Vector3 {
            x: self.read_f64()?,
            y: self.read_f64()?,
            z: self.read_f64()?,
        })
    }
}

/// Little-endian CDR writer.
struct CdrWriter {
    buf: Vec<u8>,
}

impl CdrWriter {
    fn new() -> Self {
        let mut buf = Vec::with_capacity(128);
        buf.extend_from_slice(&CDR_LE);
        Self { buf }
    }

    /// Offset inside the body; alignment ignores the encapsulation header.
    fn body_len(&self) -> usize {
        self.buf.len() - CDR_LE.len()
    }

    fn align(&mut self, alignment: usize) {
        let mask = alignment - 1;
        let padded = (self.body_len() + mask) & !mask;
        self.buf.resize(padded + CDR_LE.len(), 0);
    }

    fn write_prologue(&mut self, header: &MessageHeader, timestamp: u32) {
        self.write_u32(header.sec as u32);
        self.write_u32(header.nanosec);
        self.write_string(&header.frame_id);
        self.write_u32(timestamp);
    }

    fn write_zeroes(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    fn write_u32(&mut self, v: u32) {
        self.align(4);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f32(&mut self, v: f32) {
        self.align(4);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.align(8);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_string(&mut self, s: &str) {
        // Length includes the trailing NUL.
        self.write_u32(s.len() as u32 + 1);
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
    }

    fn write_vector3(&mut self, v: &Vector3) {
        self.write_f64(v.x);
        self.write_f64(v.y);
        self.write_f64(v.z);
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}
