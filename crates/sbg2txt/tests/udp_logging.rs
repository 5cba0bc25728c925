// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end: UDP frames in, CSV files out.

use chrono::NaiveDate;
use sbg2txt::{
    encode_sample, Bus, ChannelConfig, InertialSample, LogFileNames, LogFiles, LoggerNode,
    MessageHeader, PositionSample, Sample, SampleKind, UdpBridge, UdpPublisher, Vector3,
    VelocitySample, DEFAULT_FILE_MODE,
};
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn names() -> LogFileNames {
    let started = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(3, 4, 5)
        .unwrap();
    LogFileNames::for_start(started)
}

fn read(dir: &Path, file: &str) -> String {
    std::fs::read_to_string(dir.join(file)).unwrap()
}

fn payload(sample: impl Into<Sample>) -> Vec<u8> {
    encode_sample(&sample.into(), &MessageHeader::new(1_704_164_645, 0, "imu"))
}

#[test]
fn test_samples_over_udp_reach_their_files() {
    let temp_dir = TempDir::new().unwrap();
    let names = names();
    let files = LogFiles::create(temp_dir.path(), &names, DEFAULT_FILE_MODE).unwrap();

    let bus = Bus::new();
    let mut node = LoggerNode::new(files, &bus, &ChannelConfig::default(), 1000);
    let mut bridge = UdpBridge::spawn("127.0.0.1:0", bus.clone()).unwrap();
    let publisher = UdpPublisher::connect(bridge.local_addr()).unwrap();

    publisher
        .publish(
            "sbg/imu_data",
            &payload(InertialSample {
                timestamp: 42,
                accel: Vector3::new(1.0, 2.0, 3.0),
                gyro: Vector3::new(4.0, 5.0, 6.0),
            }),
        )
        .unwrap();
    publisher
        .publish(
            "sbg/gps_pos",
            &payload(PositionSample {
                timestamp: 43,
                position: Vector3::new(40.416775, -3.70379, 657.5),
            }),
        )
        .unwrap();
    publisher
        .publish(
            "sbg/gps_vel",
            &payload(VelocitySample {
                timestamp: 44,
                velocity: Vector3::new(0.25, -1.5, 0.0),
            }),
        )
        .unwrap();
    // Garbage on a subscribed channel is counted, not written.
    publisher.publish("sbg/gps_vel", &[0xde, 0xad]).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        node.dispatch_once(Duration::from_millis(50));
        let stats = node.stats();
        if stats.imu_data.received == 1 && stats.gps_pos.received == 1 && stats.gps_vel.received == 2
        {
            break;
        }
    }

    bridge.stop();
    let stats = node.shutdown().unwrap();
    assert_eq!(stats.imu_data.written, 1);
    assert_eq!(stats.gps_pos.written, 1);
    assert_eq!(stats.gps_vel.written, 1);
    assert_eq!(stats.gps_vel.decode_errors, 1);

    assert_eq!(
        read(temp_dir.path(), "2024-01-02-03:04:05.imu_data.log"),
        "timestamp,accel.x,accel.y,accel.z,gyro.x,gyro.y,gyro.z\n\
         42,1.000000,2.000000,3.000000,4.000000,5.000000,6.000000\n"
    );
    assert_eq!(
        read(temp_dir.path(), "2024-01-02-03:04:05.gps_pos.log"),
        "timestamp,pos.x,pos.y,pos.z\n43,40.416775,-3.703790,657.500000\n"
    );
    assert_eq!(
        read(temp_dir.path(), "2024-01-02-03:04:05.gps_vel.log"),
        "timestamp,vel.x,vel.y,vel.z\n44,0.250000,-1.500000,0.000000\n"
    );
}

#[test]
fn test_no_messages_leaves_headers_only() {
    let temp_dir = TempDir::new().unwrap();
    let names = names();
    let files = LogFiles::create(temp_dir.path(), &names, DEFAULT_FILE_MODE).unwrap();

    let bus = Bus::new();
    let mut node = LoggerNode::new(files, &bus, &ChannelConfig::default(), 1000);
    let handle = node.stop_handle();

    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(150));
        handle.stop();
    });
    node.run();
    stopper.join().unwrap();
    node.shutdown().unwrap();

    for kind in SampleKind::ALL {
        let content = read(temp_dir.path(), &names.file_name(kind));
        assert_eq!(content, format!("{}\n", kind.header()));
    }
}

#[test]
fn test_nothing_written_after_stop() {
    let temp_dir = TempDir::new().unwrap();
    let names = names();
    let files = LogFiles::create(temp_dir.path(), &names, DEFAULT_FILE_MODE).unwrap();

    let bus = Bus::new();
    let mut node = LoggerNode::new(files, &bus, &ChannelConfig::default(), 1000);

    bus.publish("sbg/gps_pos", payload(PositionSample::default()));
    node.dispatch_once(Duration::from_secs(1));

    node.stop_handle().stop();
    bus.publish("sbg/gps_pos", payload(PositionSample::default()));
    node.run();
    let stats = node.shutdown().unwrap();

    assert_eq!(stats.gps_pos.written, 1);
    let content = read(temp_dir.path(), &names.file_name(SampleKind::Position));
    assert_eq!(content.lines().count(), 2);
}
