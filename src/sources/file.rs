//! File-backed scanner replaying a recorded point log.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::format::PointLogReader;
use crate::scanner::{PointCallback, Scanner};

/// Scanner that replays a recorded point log.
///
/// Replay runs synchronously on the caller's thread, in file order, and
/// is once-through: after a completed replay the log is drained until
/// `init` re-arms it. An optional speed factor paces replay from the
/// recorded timestamps.
#[derive(Default)]
pub struct FileScanner {
    path: Option<PathBuf>,
    reader: Option<PointLogReader>,
    callback: Option<PointCallback>,
    speed: f32,
    closed: bool,
    points_replayed: u64,
}

impl FileScanner {
    /// Create a scanner for the log at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Set the replay speed factor.
    ///
    /// - 0.0 = as fast as possible (default)
    /// - 1.0 = approximate recorded timing
    /// - 2.0 = double speed
    ///
    /// Points without timestamps are delivered without delay.
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Current replay speed factor
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Points delivered across all replays
    pub fn points_replayed(&self) -> u64 {
        self.points_replayed
    }
}

impl Scanner for FileScanner {
    fn init(&mut self, source: Option<&Path>) -> Result<()> {
        if self.closed {
            return Err(Error::AlreadyClosed);
        }
        if let Some(path) = source {
            self.path = Some(path.to_path_buf());
        }
        let path = match &self.path {
            Some(p) => p.clone(),
            None => return Err(Error::NotReady("no log path given")),
        };
        let reader = PointLogReader::open(&path)
            .map_err(|e| Error::SourceUnavailable(format!("{}: {}", path.display(), e)))?;
        log::info!(
            "Opened point log {} ({} points)",
            path.display(),
            reader.point_count()
        );
        self.reader = Some(reader);
        Ok(())
    }

    fn set_callback(&mut self, callback: PointCallback) -> Result<()> {
        if self.closed {
            return Err(Error::AlreadyClosed);
        }
        self.callback = Some(callback);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::AlreadyClosed);
        }
        if self.callback.is_none() {
            return Err(Error::NotReady("no callback registered"));
        }
        let mut reader = self
            .reader
            .take()
            .ok_or(Error::NotReady("no log armed; call init"))?;

        log::info!("Replaying point log ({} points)", reader.point_count());
        let mut pacing: Option<(Instant, u64)> = None;
        let mut replayed = 0u64;
        loop {
            let point = match reader.next_point() {
                Ok(Some(p)) => p,
                Ok(None) => break,
                Err(e) => {
                    // Reader stays dropped; the log must be re-armed
                    log::error!("Replay failed after {} points: {}", replayed, e);
                    return Err(Error::SourceUnavailable(e.to_string()));
                }
            };

            if self.speed > 0.0 {
                if let Some(ts) = point.timestamp_us {
                    match pacing {
                        None => pacing = Some((Instant::now(), ts)),
                        Some((started, first_ts)) => {
                            let offset_us = ts.saturating_sub(first_ts);
                            let target = Duration::from_micros(
                                (offset_us as f64 / self.speed as f64) as u64,
                            );
                            let elapsed = started.elapsed();
                            if target > elapsed {
                                std::thread::sleep(target - elapsed);
                            }
                        }
                    }
                }
            }

            if let Some(cb) = self.callback.as_mut() {
                cb(point);
            }
            replayed += 1;
        }

        self.points_replayed += replayed;
        log::info!("Replay complete: {} points delivered", replayed);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::AlreadyClosed);
        }
        // Replay is synchronous; nothing is ever in flight between calls
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.reader = None;
        self.callback = None;
        log::info!(
            "File scanner closed ({} points replayed)",
            self.points_replayed
        );
        Ok(())
    }

    fn is_active(&self) -> bool {
        !self.closed && self.reader.is_some() && self.callback.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PointLogWriter;
    use crate::types::Point;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write_log(path: &Path, count: u64) {
        let mut writer = PointLogWriter::create(path).unwrap();
        for i in 0..count {
            writer
                .append(&Point::new(i as f32, 0.0, 0.0).with_timestamp_us(i * 1000))
                .unwrap();
        }
        writer.finish().unwrap();
    }

    fn collecting_callback() -> (Arc<Mutex<Vec<Point>>>, PointCallback) {
        let collected = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&collected);
        (collected, Box::new(move |p| sink.lock().push(p)))
    }

    #[test]
    fn test_replay_delivers_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("capture.plog");
        write_log(&path, 5);

        let mut scanner = FileScanner::new(&path);
        let (collected, callback) = collecting_callback();
        scanner.set_callback(callback).unwrap();
        scanner.init(None).unwrap();
        scanner.start().unwrap();

        let points = collected.lock();
        assert_eq!(points.len(), 5);
        for (i, p) in points.iter().enumerate() {
            assert_eq!(p.x, i as f32);
        }
        assert_eq!(scanner.points_replayed(), 5);
    }

    #[test]
    fn test_start_requires_init() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("capture.plog");
        write_log(&path, 1);

        let mut scanner = FileScanner::new(&path);
        let (_, callback) = collecting_callback();
        scanner.set_callback(callback).unwrap();
        assert!(matches!(scanner.start(), Err(Error::NotReady(_))));
    }

    #[test]
    fn test_start_requires_callback() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("capture.plog");
        write_log(&path, 1);

        let mut scanner = FileScanner::new(&path);
        scanner.init(None).unwrap();
        assert!(matches!(scanner.start(), Err(Error::NotReady(_))));
    }

    #[test]
    fn test_drained_until_reinit() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("capture.plog");
        write_log(&path, 3);

        let mut scanner = FileScanner::new(&path);
        let (collected, callback) = collecting_callback();
        scanner.set_callback(callback).unwrap();
        scanner.init(None).unwrap();
        scanner.start().unwrap();
        assert_eq!(collected.lock().len(), 3);

        // Drained: another start needs a fresh init
        assert!(matches!(scanner.start(), Err(Error::NotReady(_))));

        scanner.init(None).unwrap();
        scanner.start().unwrap();
        assert_eq!(collected.lock().len(), 6);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.plog");

        let mut scanner = FileScanner::new(&path);
        assert!(matches!(
            scanner.init(None),
            Err(Error::SourceUnavailable(_))
        ));
    }

    #[test]
    fn test_malformed_file_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("garbage.plog");
        std::fs::write(&path, b"not a point log").unwrap();

        let mut scanner = FileScanner::new(&path);
        assert!(matches!(
            scanner.init(None),
            Err(Error::SourceUnavailable(_))
        ));
    }

    #[test]
    fn test_empty_log_replays_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.plog");
        write_log(&path, 0);

        let mut scanner = FileScanner::new(&path);
        let (collected, callback) = collecting_callback();
        scanner.set_callback(callback).unwrap();
        scanner.init(None).unwrap();
        scanner.start().unwrap();
        assert!(collected.lock().is_empty());
    }

    #[test]
    fn test_default_has_no_path() {
        let mut scanner = FileScanner::default();
        assert!(matches!(scanner.init(None), Err(Error::NotReady(_))));
    }

    #[test]
    fn test_init_with_explicit_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("capture.plog");
        write_log(&path, 2);

        let mut scanner = FileScanner::default();
        let (collected, callback) = collecting_callback();
        scanner.set_callback(callback).unwrap();
        scanner.init(Some(&path)).unwrap();
        scanner.start().unwrap();
        assert_eq!(collected.lock().len(), 2);
    }

    #[test]
    fn test_paced_replay_delivers_everything() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("capture.plog");
        write_log(&path, 5);

        let mut scanner = FileScanner::new(&path);
        scanner.set_speed(1000.0);
        let (collected, callback) = collecting_callback();
        scanner.set_callback(callback).unwrap();
        scanner.init(None).unwrap();
        scanner.start().unwrap();
        assert_eq!(collected.lock().len(), 5);
    }

    #[test]
    fn test_close_is_terminal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("capture.plog");
        write_log(&path, 1);

        let mut scanner = FileScanner::new(&path);
        scanner.init(None).unwrap();
        scanner.close().unwrap();

        assert!(matches!(scanner.init(None), Err(Error::AlreadyClosed)));
        assert!(matches!(scanner.start(), Err(Error::AlreadyClosed)));
        assert!(matches!(scanner.stop(), Err(Error::AlreadyClosed)));
        assert!(!scanner.is_active());

        scanner.close().unwrap();
    }
}
