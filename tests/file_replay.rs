//! Recording a point log and replaying it through the scanner contract.

use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use bindu_io::format::PointLogWriter;
use bindu_io::{create_scanner, Config, Error, Point, PointCallback, Scanner};

fn varied_points() -> Vec<Point> {
    vec![
        Point::new(0.5, -1.25, 2.0)
            .with_reflectivity(200)
            .with_timestamp_us(1_000),
        Point::new(-3.0, 0.0, 0.125).with_timestamp_us(2_000),
        Point::new(0.0, 0.0, 0.0),
        Point::new(17.5, 42.0, -9.75).with_reflectivity(1),
    ]
}

fn write_log(path: &std::path::Path, points: &[Point]) {
    let mut writer = PointLogWriter::create(path).unwrap();
    for p in points {
        writer.append(p).unwrap();
    }
    writer.finish().unwrap();
}

fn collector() -> (Arc<Mutex<Vec<Point>>>, PointCallback) {
    let collected = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&collected);
    (collected, Box::new(move |p| sink.lock().push(p)))
}

#[test]
fn record_then_replay_through_factory() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("hallway.plog");
    let points = varied_points();
    write_log(&path, &points);

    let config = Config::file_defaults(&path);
    let mut scanner = create_scanner(&config).unwrap();

    let (collected, callback) = collector();
    scanner.set_callback(callback).unwrap();
    scanner.init(None).unwrap();
    assert!(scanner.is_active());

    scanner.start().unwrap();
    assert_eq!(*collected.lock(), points);

    // Once-through: drained until re-armed
    assert!(matches!(scanner.start(), Err(Error::NotReady(_))));
    scanner.init(None).unwrap();
    scanner.start().unwrap();
    assert_eq!(collected.lock().len(), points.len() * 2);

    scanner.stop().unwrap();
    scanner.close().unwrap();
    assert!(!scanner.is_active());
    assert!(matches!(scanner.start(), Err(Error::AlreadyClosed)));
}

#[test]
fn empty_log_emits_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("empty.plog");
    write_log(&path, &[]);

    let config = Config::file_defaults(&path);
    let mut scanner = create_scanner(&config).unwrap();

    let (collected, callback) = collector();
    scanner.set_callback(callback).unwrap();
    scanner.init(None).unwrap();
    scanner.start().unwrap();

    assert!(collected.lock().is_empty());
}

#[test]
fn missing_log_fails_init_not_create() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.plog");

    let config = Config::file_defaults(&path);
    let mut scanner = create_scanner(&config).unwrap();
    assert!(matches!(
        scanner.init(None),
        Err(Error::SourceUnavailable(_))
    ));
}

#[test]
fn long_log_streams_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("long.plog");

    let mut writer = PointLogWriter::create(&path).unwrap();
    for i in 0..2000u32 {
        writer
            .append(&Point::new(i as f32, (i * 2) as f32, 0.0))
            .unwrap();
    }
    writer.finish().unwrap();

    let config = Config::file_defaults(&path);
    let mut scanner = create_scanner(&config).unwrap();
    let (collected, callback) = collector();
    scanner.set_callback(callback).unwrap();
    scanner.init(None).unwrap();
    scanner.start().unwrap();

    let points = collected.lock();
    assert_eq!(points.len(), 2000);
    for (i, p) in points.iter().enumerate() {
        assert_eq!(p.x, i as f32);
        assert_eq!(p.y, (i * 2) as f32);
    }
}
