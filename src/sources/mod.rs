//! Point source implementations and the configuration-driven factory.

pub mod file;
pub mod lidar;

pub use file::FileScanner;
pub use lidar::LidarScanner;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::scanner::Scanner;
use crate::transport::{LidarTransport, MockTransport};
use crate::types::BroadcastCode;

/// Build a scanner from configuration.
///
/// `kind = "file"` wires a [`FileScanner`] for the configured log;
/// `kind = "lidar"` wires a [`LidarScanner`] over the configured
/// backend. The returned scanner still needs `init`.
pub fn create_scanner(config: &Config) -> Result<Box<dyn Scanner>> {
    let source = &config.source;
    match source.kind.as_str() {
        "file" => {
            let path = source
                .path
                .as_ref()
                .ok_or_else(|| Error::Config("file source requires a path".to_string()))?;
            let mut scanner = FileScanner::new(path);
            scanner.set_speed(source.speed);
            Ok(Box::new(scanner))
        }
        "lidar" => {
            let code_str = source.broadcast_code.as_ref().ok_or_else(|| {
                Error::Config("lidar source requires a broadcast code".to_string())
            })?;
            let code: BroadcastCode = code_str.parse()?;
            let transport: Arc<dyn LidarTransport> = match source.backend.as_str() {
                "mock" => Arc::new(MockTransport::new()),
                other => {
                    return Err(Error::Config(format!("unknown lidar backend: {}", other)))
                }
            };
            Ok(Box::new(LidarScanner::with_timeouts(
                transport,
                code,
                Duration::from_millis(source.init_timeout_ms),
                Duration::from_millis(source.ack_timeout_ms),
            )))
        }
        other => Err(Error::UnknownSource(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_file_scanner() {
        let config = Config::file_defaults("capture.plog");
        assert!(create_scanner(&config).is_ok());
    }

    #[test]
    fn test_create_lidar_scanner() {
        let config = Config::lidar_defaults("AB:CD:EF:01:02:03");
        assert!(create_scanner(&config).is_ok());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let mut config = Config::default();
        config.source.kind = "camera".to_string();
        assert!(matches!(
            create_scanner(&config),
            Err(Error::UnknownSource(_))
        ));
    }

    #[test]
    fn test_file_kind_requires_path() {
        let mut config = Config::file_defaults("capture.plog");
        config.source.path = None;
        assert!(matches!(create_scanner(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_lidar_kind_requires_code() {
        let mut config = Config::lidar_defaults("AB:CD:EF:01:02:03");
        config.source.broadcast_code = None;
        assert!(matches!(create_scanner(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_broadcast_code_rejected() {
        let config = Config::lidar_defaults("not-a-code");
        assert!(matches!(create_scanner(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let mut config = Config::lidar_defaults("AB:CD:EF:01:02:03");
        config.source.backend = "vendor-x".to_string();
        assert!(matches!(create_scanner(&config), Err(Error::Config(_))));
    }
}
