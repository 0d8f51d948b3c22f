//! BinduIO: a point-source abstraction layer.
//!
//! One callback-driven [`Scanner`] contract over heterogeneous point
//! origins: a live LiDAR device behind a vendor link, or a recorded
//! point log replayed from disk. Consumers register a per-point callback,
//! drive `init` / `start` / `stop` / `close`, and never learn where the
//! points come from, so capture pipelines and their replay-based tests
//! share one code path.
//!
//! # Architecture
//!
//! - [`scanner`]: the uniform contract and callback type
//! - [`sources`]: the file-backed and device-backed implementations plus
//!   the configuration-driven factory
//! - [`transport`]: the vendor seam ([`transport::LidarTransport`] /
//!   [`transport::DeviceEventSink`]) and an in-process mock
//! - [`format`]: the point log container used for capture and replay
//! - [`config`]: TOML source selection
//!
//! # Example
//!
//! ```no_run
//! use bindu_io::{create_scanner, Config};
//!
//! fn main() -> bindu_io::Result<()> {
//!     let config = Config::from_file("bindu.toml")?;
//!     let mut scanner = create_scanner(&config)?;
//!     scanner.set_callback(Box::new(|p| {
//!         println!("{:.3} {:.3} {:.3}", p.x, p.y, p.z);
//!     }))?;
//!     scanner.init(None)?;
//!     scanner.start()?;
//!     scanner.stop()?;
//!     scanner.close()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod scanner;
pub mod sources;
pub mod transport;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use scanner::{PointCallback, Scanner};
pub use sources::{create_scanner, FileScanner, LidarScanner};
pub use types::Point;
