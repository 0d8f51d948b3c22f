//! Device-backed scanner.
//!
//! Drives one LiDAR unit through a [`LidarTransport`]: discovery and
//! handshake on `init`, acknowledged sampling control on `start`/`stop`,
//! packet delivery into the registered callback, best-effort release on
//! `close`. Session state lives in [`state::LidarShared`], which also
//! receives the transport's events.

mod state;

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::scanner::{PointCallback, Scanner};
use crate::transport::{DeviceEventSink, LidarTransport};
use crate::types::{BroadcastCode, DeviceFault, DeviceHandle, DeviceInfo, DeviceState};

use state::LidarShared;

/// Default deadline for discovery plus handshake
pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline for a sampling request acknowledgement
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(2);

/// Scanner over a live LiDAR device
pub struct LidarScanner {
    transport: Arc<dyn LidarTransport>,
    shared: Arc<LidarShared>,
    init_timeout: Duration,
    ack_timeout: Duration,
}

impl LidarScanner {
    /// Create a scanner that claims the unit announcing `code`
    pub fn new(transport: Arc<dyn LidarTransport>, code: BroadcastCode) -> Self {
        Self::with_timeouts(transport, code, DEFAULT_INIT_TIMEOUT, DEFAULT_ACK_TIMEOUT)
    }

    /// Create a scanner with explicit deadlines
    pub fn with_timeouts(
        transport: Arc<dyn LidarTransport>,
        code: BroadcastCode,
        init_timeout: Duration,
        ack_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            shared: Arc::new(LidarShared::new(code)),
            init_timeout,
            ack_timeout,
        }
    }

    /// Current lifecycle state
    pub fn device_state(&self) -> DeviceState {
        self.shared.session.lock().state
    }

    /// Handle of the current session, if connected
    pub fn device_handle(&self) -> Option<DeviceHandle> {
        self.shared.session.lock().handle
    }

    /// Descriptive record from discovery/connect, refreshed on change
    pub fn device_info(&self) -> Option<DeviceInfo> {
        self.shared.session.lock().info.clone()
    }

    /// Most recent fault the device reported
    pub fn last_fault(&self) -> Option<DeviceFault> {
        self.shared.session.lock().last_fault.clone()
    }

    /// (points delivered, packets dropped)
    pub fn stats(&self) -> (u64, u64) {
        (
            self.shared.delivered_points.load(Ordering::Relaxed),
            self.shared.dropped_packets.load(Ordering::Relaxed),
        )
    }

    /// Wait for the outcome of the sampling request in flight.
    ///
    /// The event thread applies the state transition when the ack lands;
    /// this only classifies the outcome.
    fn wait_for_ack(&self) -> Result<()> {
        use crate::transport::SampleAck;

        let deadline = Instant::now() + self.ack_timeout;
        let mut session = self.shared.session.lock();
        let _ = self.shared.session_cond.wait_while_until(
            &mut session,
            |s| s.ack_pending && !s.lost,
            deadline,
        );
        if session.lost {
            session.ack_pending = false;
            return Err(Error::DeviceLost);
        }
        match session.ack_result.take() {
            Some(SampleAck::StartAccepted) | Some(SampleAck::StopAccepted) => Ok(()),
            Some(SampleAck::StartRejected) | Some(SampleAck::StopRejected) => {
                Err(Error::Rejected)
            }
            None => {
                // Gate any ack that lands after the deadline
                session.ack_pending = false;
                Err(Error::Timeout)
            }
        }
    }
}

impl Scanner for LidarScanner {
    fn init(&mut self, _source: Option<&Path>) -> Result<()> {
        {
            let mut session = self.shared.session.lock();
            match session.state {
                DeviceState::Closed => return Err(Error::AlreadyClosed),
                DeviceState::Connected | DeviceState::Sampling => return Ok(()),
                DeviceState::Disconnected => {}
            }
            // Require a fresh announcement for this attempt
            session.discovered = false;
        }

        log::info!("Scanning for device {}", self.shared.code);
        let deadline = Instant::now() + self.init_timeout;
        let sink: Arc<dyn DeviceEventSink> = self.shared.clone();
        self.transport.start_discovery(sink)?;

        {
            let mut session = self.shared.session.lock();
            let _ = self.shared.session_cond.wait_while_until(
                &mut session,
                |s| !s.discovered,
                deadline,
            );
            if !session.discovered {
                log::warn!(
                    "No broadcast from {} within {:?}",
                    self.shared.code,
                    self.init_timeout
                );
                return Err(Error::Timeout);
            }
            session.connect_pending = true;
        }

        if let Err(e) = self.transport.request_connect(&self.shared.code) {
            self.shared.session.lock().connect_pending = false;
            return Err(e);
        }

        let mut session = self.shared.session.lock();
        let _ = self.shared.session_cond.wait_while_until(
            &mut session,
            |s| s.connect_pending,
            deadline,
        );
        if session.state != DeviceState::Connected {
            // Gate a completion that lands after the deadline
            session.connect_pending = false;
            log::warn!(
                "Device {} did not complete handshake within {:?}",
                self.shared.code,
                self.init_timeout
            );
            return Err(Error::Timeout);
        }
        Ok(())
    }

    fn set_callback(&mut self, callback: PointCallback) -> Result<()> {
        if self.shared.session.lock().state == DeviceState::Closed {
            return Err(Error::AlreadyClosed);
        }
        *self.shared.callback.lock() = Some(callback);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if self.shared.callback.lock().is_none() {
            return Err(Error::NotReady("no callback registered"));
        }
        let handle = {
            let mut session = self.shared.session.lock();
            match session.state {
                DeviceState::Closed => return Err(Error::AlreadyClosed),
                DeviceState::Sampling => return Ok(()),
                DeviceState::Disconnected => {
                    return Err(if session.lost {
                        Error::DeviceLost
                    } else {
                        Error::NotReady("device not connected")
                    });
                }
                DeviceState::Connected => {}
            }
            let handle = match session.handle {
                Some(h) => h,
                None => return Err(Error::NotReady("device not connected")),
            };
            session.ack_pending = true;
            session.ack_result = None;
            handle
        };

        log::info!("Requesting sampling start from handle {}", handle);
        if let Err(e) = self.transport.start_sampling(handle) {
            self.shared.session.lock().ack_pending = false;
            return Err(e);
        }
        self.wait_for_ack()
    }

    fn stop(&mut self) -> Result<()> {
        let handle = {
            let mut session = self.shared.session.lock();
            match session.state {
                DeviceState::Closed => return Err(Error::AlreadyClosed),
                // Emission already idle, or a loss/fault forced it to cease
                DeviceState::Connected | DeviceState::Disconnected => return Ok(()),
                DeviceState::Sampling => {}
            }
            let handle = match session.handle {
                Some(h) => h,
                None => return Ok(()),
            };
            session.ack_pending = true;
            session.ack_result = None;
            handle
        };

        log::info!("Requesting sampling stop from handle {}", handle);
        if let Err(e) = self.transport.stop_sampling(handle) {
            self.shared.session.lock().ack_pending = false;
            return Err(e);
        }
        self.wait_for_ack()
    }

    fn close(&mut self) -> Result<()> {
        let (prev_state, handle) = {
            let mut session = self.shared.session.lock();
            if session.state == DeviceState::Closed {
                return Ok(());
            }
            let prev = (session.state, session.handle);
            session.state = DeviceState::Closed;
            session.handle = None;
            prev
        };

        // Best-effort release; failures are logged, teardown completes
        if let Some(handle) = handle {
            if prev_state == DeviceState::Sampling {
                if let Err(e) = self.transport.stop_sampling(handle) {
                    log::warn!("Stop during close failed: {}", e);
                }
            }
            if let Err(e) = self.transport.disconnect(handle) {
                log::warn!("Disconnect during close failed: {}", e);
            }
        }
        if let Err(e) = self.transport.shutdown() {
            log::warn!("Transport shutdown failed: {}", e);
        }

        // Taking the delivery lock orders this after any invocation in
        // flight; clearing the slot prevents any later one
        *self.shared.callback.lock() = None;

        let (points, dropped) = self.stats();
        log::info!(
            "Lidar scanner closed ({} points delivered, {} packets dropped)",
            points,
            dropped
        );
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.shared.session.lock().state == DeviceState::Sampling
    }
}

impl Drop for LidarScanner {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
