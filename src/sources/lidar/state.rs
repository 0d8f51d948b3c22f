//! Shared session state between consumer calls and the transport's event
//! thread.
//!
//! Lock discipline: the session mutex and the callback mutex are never
//! held at the same time, and neither is held across a transport request.
//! The callback mutex is held for the duration of every invocation, which
//! is what makes callback swaps clean and close quiescent.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};

use crate::scanner::PointCallback;
use crate::transport::{DeviceEventSink, PointPacket, SampleAck};
use crate::types::{
    BroadcastCode, DeviceFault, DeviceHandle, DeviceInfo, DeviceState, FaultSeverity,
};

/// Session record, guarded by `LidarShared::session`.
///
/// Consumer calls mutate it under the mutex and wait on the condvar for
/// completion events; the event thread mutates it and notifies.
pub(crate) struct Session {
    /// Lifecycle state
    pub(crate) state: DeviceState,
    /// Handle for the current session, `None` while disconnected
    pub(crate) handle: Option<DeviceHandle>,
    /// Info from discovery/connect, refreshed on change events
    pub(crate) info: Option<DeviceInfo>,
    /// Most recent fault the device reported
    pub(crate) last_fault: Option<DeviceFault>,
    /// Broadcast seen for the claimed code since the last init attempt
    pub(crate) discovered: bool,
    /// An init is waiting for connect completion; a completion arriving
    /// with this clear is stale and discarded
    pub(crate) connect_pending: bool,
    /// A start/stop is waiting for its ack; an ack arriving with this
    /// clear is stale and discarded
    pub(crate) ack_pending: bool,
    /// Outcome for the ack wait in progress
    pub(crate) ack_result: Option<SampleAck>,
    /// Session ended without a consumer request
    pub(crate) lost: bool,
}

impl Session {
    fn new() -> Self {
        Self {
            state: DeviceState::Disconnected,
            handle: None,
            info: None,
            last_fault: None,
            discovered: false,
            connect_pending: false,
            ack_pending: false,
            ack_result: None,
            lost: false,
        }
    }
}

/// State shared between a `LidarScanner` and the event thread driving it
pub(crate) struct LidarShared {
    /// Code this scanner claims; discovery events are filtered on it
    pub(crate) code: BroadcastCode,
    pub(crate) session: Mutex<Session>,
    pub(crate) session_cond: Condvar,
    /// Held for the duration of every callback invocation
    pub(crate) callback: Mutex<Option<PointCallback>>,
    pub(crate) delivered_points: AtomicU64,
    pub(crate) delivered_packets: AtomicU64,
    pub(crate) dropped_packets: AtomicU64,
}

impl LidarShared {
    pub(crate) fn new(code: BroadcastCode) -> Self {
        Self {
            code,
            session: Mutex::new(Session::new()),
            session_cond: Condvar::new(),
            callback: Mutex::new(None),
            delivered_points: AtomicU64::new(0),
            delivered_packets: AtomicU64::new(0),
            dropped_packets: AtomicU64::new(0),
        }
    }
}

impl DeviceEventSink for LidarShared {
    fn on_discovered(&self, info: &DeviceInfo) {
        let mut session = self.session.lock();
        if session.state == DeviceState::Closed {
            return;
        }
        if info.broadcast_code != self.code {
            log::debug!("Ignoring broadcast from {}", info.broadcast_code);
            return;
        }
        log::info!("Discovered device {} ({})", info.broadcast_code, info.model);
        session.discovered = true;
        session.info = Some(info.clone());
        self.session_cond.notify_all();
    }

    fn on_connected(&self, handle: DeviceHandle, info: &DeviceInfo) {
        let mut session = self.session.lock();
        if session.state == DeviceState::Closed {
            return;
        }
        if !session.connect_pending {
            log::debug!("Discarding stale connect completion for handle {}", handle);
            return;
        }
        log::info!(
            "Connected to device {} as handle {}",
            info.broadcast_code,
            handle
        );
        session.connect_pending = false;
        session.handle = Some(handle);
        session.info = Some(info.clone());
        session.state = DeviceState::Connected;
        session.lost = false;
        self.session_cond.notify_all();
    }

    fn on_disconnected(&self, handle: DeviceHandle) {
        let mut session = self.session.lock();
        if session.state == DeviceState::Closed {
            return;
        }
        if session.handle != Some(handle) {
            log::debug!("Discarding disconnect for stale handle {}", handle);
            return;
        }
        log::error!("Device handle {} disconnected unexpectedly", handle);
        session.state = DeviceState::Disconnected;
        session.handle = None;
        session.lost = true;
        self.session_cond.notify_all();
    }

    fn on_sample_ack(&self, handle: DeviceHandle, ack: SampleAck) {
        let mut session = self.session.lock();
        if session.state == DeviceState::Closed {
            return;
        }
        if session.handle != Some(handle) {
            log::debug!("Discarding ack for stale handle {}", handle);
            return;
        }
        if !session.ack_pending {
            log::debug!("Discarding stale ack {:?} for handle {}", ack, handle);
            return;
        }
        session.ack_pending = false;
        session.ack_result = Some(ack);
        // Apply the transition here so packets right after an accepted
        // start are not dropped in the waiter wakeup gap
        match ack {
            SampleAck::StartAccepted => session.state = DeviceState::Sampling,
            SampleAck::StopAccepted => session.state = DeviceState::Connected,
            SampleAck::StartRejected | SampleAck::StopRejected => {}
        }
        self.session_cond.notify_all();
    }

    fn on_packet(&self, packet: &PointPacket) {
        {
            let session = self.session.lock();
            let deliverable =
                session.state == DeviceState::Sampling && session.handle == Some(packet.handle);
            if !deliverable {
                drop(session);
                self.dropped_packets.fetch_add(1, Ordering::Relaxed);
                log::debug!("Discarding packet for handle {}: not sampling", packet.handle);
                return;
            }
        }

        let mut callback = self.callback.lock();
        match callback.as_mut() {
            Some(cb) => {
                for point in &packet.points {
                    cb(*point);
                }
                self.delivered_points
                    .fetch_add(packet.points.len() as u64, Ordering::Relaxed);
                let packets = self.delivered_packets.fetch_add(1, Ordering::Relaxed) + 1;
                if packets % 1000 == 0 {
                    log::debug!(
                        "Delivered {} packets ({} points, {} dropped)",
                        packets,
                        self.delivered_points.load(Ordering::Relaxed),
                        self.dropped_packets.load(Ordering::Relaxed)
                    );
                }
            }
            None => {
                self.dropped_packets.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn on_fault(&self, handle: DeviceHandle, fault: DeviceFault) {
        let mut session = self.session.lock();
        if session.state == DeviceState::Closed {
            return;
        }
        if session.handle != Some(handle) {
            log::debug!("Discarding fault for stale handle {}", handle);
            return;
        }
        match fault.severity {
            FaultSeverity::Warning => {
                log::warn!(
                    "Device handle {} warning {:#06x}: {}",
                    handle,
                    fault.code,
                    fault.message
                );
            }
            FaultSeverity::Error => {
                log::error!(
                    "Device handle {} fault {:#06x}: {}",
                    handle,
                    fault.code,
                    fault.message
                );
                if session.state == DeviceState::Sampling {
                    session.state = DeviceState::Connected;
                }
            }
            FaultSeverity::Fatal => {
                log::error!(
                    "Device handle {} fatal fault {:#06x}: {}",
                    handle,
                    fault.code,
                    fault.message
                );
                session.state = DeviceState::Disconnected;
                session.handle = None;
                session.lost = true;
            }
        }
        session.last_fault = Some(fault);
        self.session_cond.notify_all();
    }

    fn on_info_changed(&self, handle: DeviceHandle, info: &DeviceInfo) {
        let mut session = self.session.lock();
        if session.state == DeviceState::Closed {
            return;
        }
        if session.handle != Some(handle) {
            log::debug!("Discarding info change for stale handle {}", handle);
            return;
        }
        log::debug!(
            "Device handle {} info changed: {} / {}",
            handle,
            info.model,
            info.firmware
        );
        session.info = Some(info.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn test_shared() -> Arc<LidarShared> {
        Arc::new(LidarShared::new(
            "AB:CD:EF:01:02:03".parse().unwrap(),
        ))
    }

    fn connect(shared: &LidarShared, handle: DeviceHandle) {
        let mut session = shared.session.lock();
        session.state = DeviceState::Connected;
        session.handle = Some(handle);
    }

    #[test]
    fn test_discovery_filters_on_code() {
        let shared = test_shared();
        let other = DeviceInfo::new("00:00:00:00:00:01".parse().unwrap(), "other", "1.0");
        shared.on_discovered(&other);
        assert!(!shared.session.lock().discovered);

        let ours = DeviceInfo::new(shared.code, "mock-40", "1.0");
        shared.on_discovered(&ours);
        assert!(shared.session.lock().discovered);
    }

    #[test]
    fn test_stale_connect_completion_discarded() {
        let shared = test_shared();
        let info = DeviceInfo::new(shared.code, "mock-40", "1.0");
        shared.on_connected(DeviceHandle::new(1), &info);

        let session = shared.session.lock();
        assert_eq!(session.state, DeviceState::Disconnected);
        assert_eq!(session.handle, None);
    }

    #[test]
    fn test_packet_for_stale_handle_dropped() {
        let shared = test_shared();
        connect(&shared, DeviceHandle::new(1));
        shared.session.lock().state = DeviceState::Sampling;

        let packet = PointPacket::new(
            DeviceHandle::new(9),
            vec![crate::types::Point::new(1.0, 0.0, 0.0)],
        );
        shared.on_packet(&packet);

        assert_eq!(shared.dropped_packets.load(Ordering::Relaxed), 1);
        assert_eq!(shared.delivered_points.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_error_fault_forces_sampling_to_connected() {
        let shared = test_shared();
        let handle = DeviceHandle::new(1);
        connect(&shared, handle);
        shared.session.lock().state = DeviceState::Sampling;

        shared.on_fault(
            handle,
            DeviceFault::new(FaultSeverity::Error, 0x0200, "motor stall"),
        );

        let session = shared.session.lock();
        assert_eq!(session.state, DeviceState::Connected);
        assert_eq!(session.handle, Some(handle));
        assert!(!session.lost);
        assert!(session.last_fault.is_some());
    }

    #[test]
    fn test_fatal_fault_forces_disconnected() {
        let shared = test_shared();
        let handle = DeviceHandle::new(1);
        connect(&shared, handle);
        shared.session.lock().state = DeviceState::Sampling;

        shared.on_fault(
            handle,
            DeviceFault::new(FaultSeverity::Fatal, 0x0400, "temperature"),
        );

        let session = shared.session.lock();
        assert_eq!(session.state, DeviceState::Disconnected);
        assert_eq!(session.handle, None);
        assert!(session.lost);
    }

    #[test]
    fn test_warning_fault_changes_nothing() {
        let shared = test_shared();
        let handle = DeviceHandle::new(1);
        connect(&shared, handle);
        shared.session.lock().state = DeviceState::Sampling;

        shared.on_fault(
            handle,
            DeviceFault::new(FaultSeverity::Warning, 0x0001, "voltage dip"),
        );

        let session = shared.session.lock();
        assert_eq!(session.state, DeviceState::Sampling);
        assert!(!session.lost);
        assert!(session.last_fault.is_some());
    }

    #[test]
    fn test_events_ignored_after_close() {
        let shared = test_shared();
        shared.session.lock().state = DeviceState::Closed;

        let info = DeviceInfo::new(shared.code, "mock-40", "1.0");
        shared.on_discovered(&info);
        shared.on_connected(DeviceHandle::new(1), &info);
        shared.on_disconnected(DeviceHandle::new(1));

        let session = shared.session.lock();
        assert_eq!(session.state, DeviceState::Closed);
        assert!(!session.discovered);
        assert_eq!(session.handle, None);
    }
}
