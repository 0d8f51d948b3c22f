//! Uniform scanner contract over heterogeneous point origins.
//!
//! Consumers register one callback and drive the same five operations
//! whether points come from a live device or a recorded log. Origins are
//! interchangeable behind `Box<dyn Scanner>`; see
//! [`create_scanner`](crate::sources::create_scanner).

use std::path::Path;

use crate::error::Result;
use crate::types::Point;

/// Per-point consumer callback.
///
/// Invoked once per point, in source order. Implementations must not call
/// back into the scanner that invoked them; the delivery lock is held for
/// the duration of each invocation.
pub type PointCallback = Box<dyn FnMut(Point) + Send>;

/// A source of points behind a uniform lifecycle.
///
/// Lifecycle: `init` acquires the underlying source, `start` begins
/// emission into the registered callback, `stop` ceases emission while
/// keeping the source acquired, `close` releases everything. `close` is
/// terminal: afterwards every operation except a repeated `close` (a
/// no-op) fails with `AlreadyClosed`.
pub trait Scanner: Send {
    /// Acquire the underlying source.
    ///
    /// File-backed scanners open and validate the log at `source` (the
    /// path is required on first init). Device-backed scanners run
    /// discovery and handshake and ignore `source`. Idempotent while the
    /// resource is healthy; after a lost device it retries acquisition.
    fn init(&mut self, source: Option<&Path>) -> Result<()>;

    /// Register the per-point callback, replacing any previous one.
    ///
    /// May be called before or after `init`, and while delivery is live;
    /// every invocation after the swap returns uses the new callback.
    fn set_callback(&mut self, callback: PointCallback) -> Result<()>;

    /// Begin emitting points into the registered callback.
    ///
    /// Fails with `NotReady` if no callback is registered or the source
    /// is not acquired.
    fn start(&mut self) -> Result<()>;

    /// Cease emission; the source stays acquired.
    ///
    /// Idempotent: stopping an already-stopped scanner is `Ok`.
    fn stop(&mut self) -> Result<()>;

    /// Release the source and drop the callback.
    ///
    /// When this returns, no callback invocation is in flight and none
    /// will follow. A second `close` is a no-op.
    fn close(&mut self) -> Result<()>;

    /// True while the scanner is emitting into its callback
    fn is_active(&self) -> bool;
}
