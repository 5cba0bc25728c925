// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-run log files: naming, creation and the ordered close sequence.

use crate::error::{LoggerError, Result};
use crate::sample::{Sample, SampleKind};
use chrono::NaiveDateTime;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Filename prefix format, e.g. `2024-01-02-03:04:05`.
pub const RUN_PREFIX_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";

/// Read-only for owner, group and other.
pub const DEFAULT_FILE_MODE: u32 = 0o444;

/// Names of the three files for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileNames {
    prefix: String,
}

impl LogFileNames {
    /// Names derived from the local start time of the run.
    pub fn for_start(started_at: NaiveDateTime) -> Self {
        Self {
            prefix: started_at.format(RUN_PREFIX_FORMAT).to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `<prefix>.<suffix>.log`
    pub fn file_name(&self, kind: SampleKind) -> String {
        format!("{}.{}.log", self.prefix, kind.suffix())
    }

    pub fn path_in(&self, dir: &Path, kind: SampleKind) -> PathBuf {
        dir.join(self.file_name(kind))
    }
}

/// The three sinks a run writes to.
///
/// Generic over the writer so tests can log into memory.
pub struct LogFiles<W: Write = File> {
    imu_data: W,
    gps_pos: W,
    gps_vel: W,
}

impl LogFiles<File> {
    /// Create (or open) the run's files in `dir` and write their headers.
    pub fn create(dir: &Path, names: &LogFileNames, mode: u32) -> Result<Self> {
        let open = |kind| {
            let path = names.path_in(dir, kind);
            open_log_file(&path, mode).map_err(|source| LoggerError::Open { path, source })
        };

        let imu_data = open(SampleKind::Inertial)?;
        let gps_pos = open(SampleKind::Position)?;
        let gps_vel = open(SampleKind::Velocity)?;

        let mut files = Self::from_writers(imu_data, gps_pos, gps_vel);
        for kind in SampleKind::ALL {
            files
                .write_header(kind)
                .map_err(|source| LoggerError::Header {
                    path: names.path_in(dir, kind),
                    source,
                })?;
        }

        tracing::debug!(prefix = names.prefix(), dir = %dir.display(), "Log files created");
        Ok(files)
    }
}

impl<W: Write> LogFiles<W> {
    /// Wrap already-open writers. Headers are not written.
    pub fn from_writers(imu_data: W, gps_pos: W, gps_vel: W) -> Self {
        Self {
            imu_data,
            gps_pos,
            gps_vel,
        }
    }

    /// Wrap writers and write the three headers.
    pub fn with_headers(imu_data: W, gps_pos: W, gps_vel: W) -> io::Result<Self> {
        let mut files = Self::from_writers(imu_data, gps_pos, gps_vel);
        for kind in SampleKind::ALL {
            files.write_header(kind)?;
        }
        Ok(files)
    }

    fn sink(&mut self, kind: SampleKind) -> &mut W {
        match kind {
            SampleKind::Inertial => &mut self.imu_data,
            SampleKind::Position => &mut self.gps_pos,
            SampleKind::Velocity => &mut self.gps_vel,
        }
    }

    fn write_header(&mut self, kind: SampleKind) -> io::Result<()> {
        let mut header = String::with_capacity(64);
        header.push_str(kind.header());
        header.push('\n');
        self.sink(kind).write_all(header.as_bytes())
    }

    /// Append one sample to its file in a single write.
    pub fn append(&mut self, sample: &Sample) -> io::Result<()> {
        let line = sample.to_csv_line();
        self.sink(sample.kind()).write_all(line.as_bytes())
    }

    /// Flush and release the sinks in order: inertial, position, velocity.
    ///
    /// Every sink is released even if an earlier one fails; the first
    /// failure is returned.
    pub fn close(self) -> Result<()> {
        let Self {
            imu_data,
            gps_pos,
            gps_vel,
        } = self;

        let mut first_err = None;
        for (kind, sink) in [
            (SampleKind::Inertial, imu_data),
            (SampleKind::Position, gps_pos),
            (SampleKind::Velocity, gps_vel),
        ] {
            if let Err(source) = close_sink(sink) {
                tracing::warn!(channel = kind.suffix(), "Failed to close log: {}", source);
                first_err.get_or_insert(LoggerError::Close {
                    channel: kind.suffix(),
                    source,
                });
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Borrow the underlying writers (inertial, position, velocity).
    pub fn writers(&self) -> (&W, &W, &W) {
        (&self.imu_data, &self.gps_pos, &self.gps_vel)
    }
}

fn close_sink<W: Write>(mut sink: W) -> io::Result<()> {
    sink.flush()?;
    drop(sink);
    Ok(())
}

fn open_log_file(path: &Path, mode: u32) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).append(true).create(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    options.open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{InertialSample, Vector3, VelocitySample};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn start_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
    }

    #[test]
    fn test_file_names() {
        let names = LogFileNames::for_start(start_time());
        assert_eq!(names.prefix(), "2024-01-02-03:04:05");
        assert_eq!(
            names.file_name(SampleKind::Inertial),
            "2024-01-02-03:04:05.imu_data.log"
        );
        assert_eq!(
            names.file_name(SampleKind::Position),
            "2024-01-02-03:04:05.gps_pos.log"
        );
        assert_eq!(
            names.file_name(SampleKind::Velocity),
            "2024-01-02-03:04:05.gps_vel.log"
        );
    }

    #[test]
    fn test_in_memory_append() {
        let mut files = LogFiles::with_headers(Vec::new(), Vec::new(), Vec::new()).unwrap();
        files
            .append(
                &InertialSample {
                    timestamp: 42,
                    accel: Vector3::new(1.0, 2.0, 3.0),
                    gyro: Vector3::new(4.0, 5.0, 6.0),
                }
                .into(),
            )
            .unwrap();
        files
            .append(
                &VelocitySample {
                    timestamp: 9,
                    velocity: Vector3::new(0.5, 0.25, 0.125),
                }
                .into(),
            )
            .unwrap();

        let (imu, pos, vel) = files.writers();
        assert_eq!(
            String::from_utf8_lossy(imu),
            "timestamp,accel.x,accel.y,accel.z,gyro.x,gyro.y,gyro.z\n\
             42,1.000000,2.000000,3.000000,4.000000,5.000000,6.000000\n"
        );
        assert_eq!(String::from_utf8_lossy(pos), "timestamp,pos.x,pos.y,pos.z\n");
        assert_eq!(
            String::from_utf8_lossy(vel),
            "timestamp,vel.x,vel.y,vel.z\n9,0.500000,0.250000,0.125000\n"
        );
    }

    #[test]
    fn test_create_writes_headers() {
        let temp_dir = TempDir::new().unwrap();
        let names = LogFileNames::for_start(start_time());

        let files = LogFiles::create(temp_dir.path(), &names, DEFAULT_FILE_MODE).unwrap();
        files.close().unwrap();

        for kind in SampleKind::ALL {
            let content = std::fs::read_to_string(names.path_in(temp_dir.path(), kind)).unwrap();
            assert_eq!(content, format!("{}\n", kind.header()));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_created_files_are_read_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let names = LogFileNames::for_start(start_time());
        LogFiles::create(temp_dir.path(), &names, DEFAULT_FILE_MODE)
            .unwrap()
            .close()
            .unwrap();

        let meta = std::fs::metadata(names.path_in(temp_dir.path(), SampleKind::Position)).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o444);
    }

    #[test]
    fn test_open_failure_names_path() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("does-not-exist");
        let names = LogFileNames::for_start(start_time());

        let err = LogFiles::create(&missing, &names, DEFAULT_FILE_MODE)
            .err()
            .unwrap();
        match err {
            LoggerError::Open { path, .. } => {
                assert!(path.ends_with("2024-01-02-03:04:05.imu_data.log"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    struct FailingFlush;

    impl Write for FailingFlush {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("disk gone"))
        }
    }

    #[test]
    fn test_close_reports_first_failure() {
        let files = LogFiles::from_writers(FailingFlush, FailingFlush, FailingFlush);
        match files.close() {
            Err(LoggerError::Close { channel, .. }) => assert_eq!(channel, "imu_data"),
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }
}
