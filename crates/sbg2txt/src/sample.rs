// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Navigation samples and their CSV rendering.

use std::fmt::Write as _;

/// Three-axis vector, as carried by `geometry_msgs/Vector3`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Accelerometer and gyroscope reading from `sbg/imu_data`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InertialSample {
    /// Driver time stamp (microseconds since device power-up).
    pub timestamp: u32,
    /// Acceleration in m/s^2.
    pub accel: Vector3,
    /// Angular rate in rad/s.
    pub gyro: Vector3,
}

/// GNSS position from `sbg/gps_pos`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionSample {
    pub timestamp: u32,
    /// Latitude, longitude, altitude.
    pub position: Vector3,
}

/// GNSS velocity from `sbg/gps_vel`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocitySample {
    pub timestamp: u32,
    /// North, east, down velocity in m/s.
    pub velocity: Vector3,
}

/// The three record streams handled by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKind {
    Inertial,
    Position,
    Velocity,
}

impl SampleKind {
    /// All kinds, in the order files are opened and closed.
    pub const ALL: [SampleKind; 3] = [Self::Inertial, Self::Position, Self::Velocity];

    /// File name suffix and channel leaf name.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Inertial => "imu_data",
            Self::Position => "gps_pos",
            Self::Velocity => "gps_vel",
        }
    }

    /// Fixed first line of the log file.
    pub fn header(&self) -> &'static str {
        match self {
            Self::Inertial => "timestamp,accel.x,accel.y,accel.z,gyro.x,gyro.y,gyro.z",
            Self::Position => "timestamp,pos.x,pos.y,pos.z",
            Self::Velocity => "timestamp,vel.x,vel.y,vel.z",
        }
    }
}

impl std::fmt::Display for SampleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// A decoded sample of any kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Inertial(InertialSample),
    Position(PositionSample),
    Velocity(VelocitySample),
}

impl Sample {
    pub fn kind(&self) -> SampleKind {
        match self {
            Self::Inertial(_) => SampleKind::Inertial,
            Self::Position(_) => SampleKind::Position,
            Self::Velocity(_) => SampleKind::Velocity,
        }
    }

    /// Render as one newline-terminated CSV line.
    pub fn to_csv_line(&self) -> String {
        match self {
            Self::Inertial(s) => s.to_csv_line(),
            Self::Position(s) => s.to_csv_line(),
            Self::Velocity(s) => s.to_csv_line(),
        }
    }
}

impl From<InertialSample> for Sample {
    fn from(s: InertialSample) -> Self {
        Self::Inertial(s)
    }
}

impl From<PositionSample> for Sample {
    fn from(s: PositionSample) -> Self {
        Self::Position(s)
    }
}

impl From<VelocitySample> for Sample {
    fn from(s: VelocitySample) -> Self {
        Self::Velocity(s)
    }
}

impl InertialSample {
    /// `timestamp,ax,ay,az,gx,gy,gz\n`
    pub fn to_csv_line(&self) -> String {
        csv_line(
            self.timestamp,
            &[
                self.accel.x,
                self.accel.y,
                self.accel.z,
                self.gyro.x,
                self.gyro.y,
                self.gyro.z,
            ],
        )
    }
}

impl PositionSample {
    /// `timestamp,x,y,z\n`
    pub fn to_csv_line(&self) -> String {
        csv_line(
            self.timestamp,
            &[self.position.x, self.position.y, self.position.z],
        )
    }
}

impl VelocitySample {
    /// `timestamp,x,y,z\n`
    pub fn to_csv_line(&self) -> String {
        csv_line(
            self.timestamp,
            &[self.velocity.x, self.velocity.y, self.velocity.z],
        )
    }
}

fn csv_line(timestamp: u32, values: &[f64]) -> String {
    let mut line = String::with_capacity(16 + values.len() * 16);
    let _ = write!(line, "{}", timestamp);
    for value in values {
        line.push(',');
        push_fixed6(&mut line, *value);
    }
    line.push('\n');
    line
}

/// Six fixed decimals, spelling non-finite values the way C's `%f` does.
fn push_fixed6(out: &mut String, value: f64) {
    if value.is_nan() {
        out.push_str("nan");
    } else if value.is_infinite() {
        out.push_str(if value.is_sign_negative() { "-inf" } else { "inf" });
    } else {
        let _ = write!(out, "{:.6}", value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inertial_line() {
        let sample = InertialSample {
            timestamp: 42,
            accel: Vector3::new(1.0, 2.0, 3.0),
            gyro: Vector3::new(4.0, 5.0, 6.0),
        };
        assert_eq!(
            sample.to_csv_line(),
            "42,1.000000,2.000000,3.000000,4.000000,5.000000,6.000000\n"
        );
    }

    #[test]
    fn test_position_and_velocity_lines() {
        let pos = PositionSample {
            timestamp: 7,
            position: Vector3::new(48.8566, 2.3522, 35.25),
        };
        assert_eq!(pos.to_csv_line(), "7,48.856600,2.352200,35.250000\n");

        let vel = VelocitySample {
            timestamp: 4_000_000_000,
            velocity: Vector3::new(-0.5, 0.0, -12.1234567),
        };
        assert_eq!(
            vel.to_csv_line(),
            "4000000000,-0.500000,0.000000,-12.123457\n"
        );
    }

    #[test]
    fn test_non_finite_values() {
        let vel = VelocitySample {
            timestamp: 1,
            velocity: Vector3::new(f64::NAN, f64::INFINITY, f64::NEG_INFINITY),
        };
        assert_eq!(vel.to_csv_line(), "1,nan,inf,-inf\n");
    }

    #[test]
    fn test_headers() {
        assert_eq!(
            SampleKind::Inertial.header(),
            "timestamp,accel.x,accel.y,accel.z,gyro.x,gyro.y,gyro.z"
        );
        assert_eq!(SampleKind::Position.header(), "timestamp,pos.x,pos.y,pos.z");
        assert_eq!(SampleKind::Velocity.header(), "timestamp,vel.x,vel.y,vel.z");

        // Column count of each header matches its data lines.
        let line = Sample::from(InertialSample::default()).to_csv_line();
        assert_eq!(
            line.trim_end().split(',').count(),
            SampleKind::Inertial.header().split(',').count()
        );
    }

    #[test]
    fn test_sample_kind() {
        assert_eq!(
            Sample::from(PositionSample::default()).kind(),
            SampleKind::Position
        );
        assert_eq!(SampleKind::Velocity.to_string(), "gps_vel");
    }
}
