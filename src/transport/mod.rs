//! Transport seam between device-backed scanners and vendor links.
//!
//! The scanner issues requests through [`LidarTransport`]; everything the
//! link reports back arrives through [`DeviceEventSink`]. Keeping both
//! directions behind traits keeps vendor bridges swappable and lets tests
//! drive the scanner with [`MockTransport`].

pub mod mock;

pub use mock::{MockRemote, MockTransport};

use std::sync::Arc;

use crate::error::Result;
use crate::types::{BroadcastCode, DeviceFault, DeviceHandle, DeviceInfo, Point};

/// One arrival batch of points from a device.
///
/// Per-device arrival order is the delivery order; points inside a packet
/// are ordered as sampled.
#[derive(Debug, Clone, PartialEq)]
pub struct PointPacket {
    /// Session handle the batch belongs to
    pub handle: DeviceHandle,
    /// Points in sample order
    pub points: Vec<Point>,
}

impl PointPacket {
    /// Create a packet
    pub fn new(handle: DeviceHandle, points: Vec<Point>) -> Self {
        Self { handle, points }
    }
}

/// Acknowledgement a device returns for a sampling request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleAck {
    /// Start request accepted; emission begins
    StartAccepted,
    /// Start request refused; emission state unchanged
    StartRejected,
    /// Stop request accepted; emission ceases
    StopAccepted,
    /// Stop request refused; emission state unchanged
    StopRejected,
}

/// Event surface the transport drives.
///
/// Methods are invoked on the transport's event thread, one event at a
/// time per device, in arrival order. Implementations must not call back
/// into the transport from these methods.
pub trait DeviceEventSink: Send + Sync {
    /// A unit announced itself while unclaimed
    fn on_discovered(&self, info: &DeviceInfo);

    /// A connect request completed; `handle` is valid from here
    fn on_connected(&self, handle: DeviceHandle, info: &DeviceInfo);

    /// The session ended without a consumer request; `handle` is stale
    fn on_disconnected(&self, handle: DeviceHandle);

    /// A sampling request was acknowledged
    fn on_sample_ack(&self, handle: DeviceHandle, ack: SampleAck);

    /// A batch of points arrived
    fn on_packet(&self, packet: &PointPacket);

    /// The device reported a fault status
    fn on_fault(&self, handle: DeviceHandle, fault: DeviceFault);

    /// The device's descriptive record changed
    fn on_info_changed(&self, handle: DeviceHandle, info: &DeviceInfo);
}

/// Request surface of a vendor link.
///
/// Requests are asynchronous: completion arrives through the sink
/// registered with `start_discovery`. Implementations must be callable
/// from any thread; the scanner never issues a request while holding a
/// lock its sink paths take.
pub trait LidarTransport: Send + Sync {
    /// Begin listening for broadcasts and deliver all events to `sink`
    fn start_discovery(&self, sink: Arc<dyn DeviceEventSink>) -> Result<()>;

    /// Claim the unit announcing `code`; completes with `on_connected`
    fn request_connect(&self, code: &BroadcastCode) -> Result<()>;

    /// Ask the device to start emitting; completes with `on_sample_ack`
    fn start_sampling(&self, handle: DeviceHandle) -> Result<()>;

    /// Ask the device to stop emitting; completes with `on_sample_ack`
    fn stop_sampling(&self, handle: DeviceHandle) -> Result<()>;

    /// Release the claim on a connected device
    fn disconnect(&self, handle: DeviceHandle) -> Result<()>;

    /// Stop event delivery and drop the sink reference
    fn shutdown(&self) -> Result<()>;
}
