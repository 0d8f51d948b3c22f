//! In-process mock transport for tests and bring-up.
//!
//! Behaves like a vendor bridge: requests return immediately and the
//! matching events arrive later on a pump thread, so callers exercise the
//! same cross-thread paths a real link would. A [`MockRemote`] handle
//! scripts the far side: device roster, packet delivery, faults, drops,
//! and accept/reject behavior.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::transport::{DeviceEventSink, LidarTransport, PointPacket, SampleAck};
use crate::types::{BroadcastCode, DeviceFault, DeviceHandle, DeviceInfo, Point};

enum PumpEvent {
    Discovered(DeviceInfo),
    Connected(DeviceHandle, DeviceInfo),
    Disconnected(DeviceHandle),
    Ack(DeviceHandle, SampleAck),
    Packet(PointPacket),
    Fault(DeviceHandle, DeviceFault),
    InfoChanged(DeviceHandle, DeviceInfo),
    Flush(Sender<()>),
    Stop,
}

struct MockState {
    sink: Option<Arc<dyn DeviceEventSink>>,
    roster: Vec<DeviceInfo>,
    connected: Vec<(DeviceHandle, BroadcastCode)>,
    last_handle: Option<DeviceHandle>,
    accept_connect: bool,
    accept_start: bool,
    accept_stop: bool,
    refuse_requests: bool,
    silent: bool,
}

impl MockState {
    fn new() -> Self {
        Self {
            sink: None,
            roster: Vec::new(),
            connected: Vec::new(),
            last_handle: None,
            accept_connect: true,
            accept_start: true,
            accept_stop: true,
            refuse_requests: false,
            silent: false,
        }
    }
}

#[derive(Default)]
struct RequestCounters {
    connect: AtomicU32,
    start: AtomicU32,
    stop: AtomicU32,
    disconnect: AtomicU32,
}

struct MockInner {
    state: Mutex<MockState>,
    counters: RequestCounters,
    next_handle: AtomicU8,
    tx: Sender<PumpEvent>,
}

/// Mock vendor link with an event pump thread
pub struct MockTransport {
    inner: Arc<MockInner>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl MockTransport {
    /// Create a mock link and start its event pump
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let inner = Arc::new(MockInner {
            state: Mutex::new(MockState::new()),
            counters: RequestCounters::default(),
            next_handle: AtomicU8::new(1),
            tx,
        });

        let pump_inner = Arc::clone(&inner);
        let pump = thread::spawn(move || pump_loop(rx, pump_inner));

        Self {
            inner,
            pump: Mutex::new(Some(pump)),
        }
    }

    /// Scripting handle for the far side of the link
    pub fn remote(&self) -> MockRemote {
        MockRemote {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        let _ = self.inner.tx.send(PumpEvent::Stop);
        if let Some(handle) = self.pump.lock().take() {
            let _ = handle.join();
        }
    }
}

fn pump_loop(rx: Receiver<PumpEvent>, inner: Arc<MockInner>) {
    for event in rx.iter() {
        // Clone out the sink so no mock lock is held during dispatch
        let sink = inner.state.lock().sink.clone();
        match event {
            PumpEvent::Stop => break,
            PumpEvent::Flush(done) => {
                let _ = done.send(());
            }
            PumpEvent::Discovered(info) => {
                if let Some(s) = &sink {
                    s.on_discovered(&info);
                }
            }
            PumpEvent::Connected(handle, info) => {
                if let Some(s) = &sink {
                    s.on_connected(handle, &info);
                }
            }
            PumpEvent::Disconnected(handle) => {
                if let Some(s) = &sink {
                    s.on_disconnected(handle);
                }
            }
            PumpEvent::Ack(handle, ack) => {
                if let Some(s) = &sink {
                    s.on_sample_ack(handle, ack);
                }
            }
            PumpEvent::Packet(packet) => {
                if let Some(s) = &sink {
                    s.on_packet(&packet);
                }
            }
            PumpEvent::Fault(handle, fault) => {
                if let Some(s) = &sink {
                    s.on_fault(handle, fault);
                }
            }
            PumpEvent::InfoChanged(handle, info) => {
                if let Some(s) = &sink {
                    s.on_info_changed(handle, &info);
                }
            }
        }
    }
}

impl LidarTransport for MockTransport {
    fn start_discovery(&self, sink: Arc<dyn DeviceEventSink>) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.refuse_requests {
            return Err(Error::SourceUnavailable("mock link refused".to_string()));
        }
        state.sink = Some(sink);
        // Every registered unit is announcing; replay the roster
        for info in state.roster.clone() {
            let _ = self.inner.tx.send(PumpEvent::Discovered(info));
        }
        Ok(())
    }

    fn request_connect(&self, code: &BroadcastCode) -> Result<()> {
        self.inner.counters.connect.fetch_add(1, Ordering::Relaxed);
        let mut state = self.inner.state.lock();
        if state.refuse_requests {
            return Err(Error::SourceUnavailable("mock link refused".to_string()));
        }
        if state.silent {
            return Ok(());
        }
        let info = match state.roster.iter().find(|i| i.broadcast_code == *code) {
            Some(info) => info.clone(),
            // Unknown unit: request is accepted but never completes
            None => return Ok(()),
        };
        if !state.accept_connect {
            return Ok(());
        }
        let handle = DeviceHandle::new(self.inner.next_handle.fetch_add(1, Ordering::Relaxed));
        state.connected.push((handle, *code));
        state.last_handle = Some(handle);
        let _ = self.inner.tx.send(PumpEvent::Connected(handle, info));
        Ok(())
    }

    fn start_sampling(&self, handle: DeviceHandle) -> Result<()> {
        self.inner.counters.start.fetch_add(1, Ordering::Relaxed);
        let state = self.inner.state.lock();
        if state.refuse_requests {
            return Err(Error::SourceUnavailable("mock link refused".to_string()));
        }
        if state.silent || !state.connected.iter().any(|(h, _)| *h == handle) {
            return Ok(());
        }
        let ack = if state.accept_start {
            SampleAck::StartAccepted
        } else {
            SampleAck::StartRejected
        };
        let _ = self.inner.tx.send(PumpEvent::Ack(handle, ack));
        Ok(())
    }

    fn stop_sampling(&self, handle: DeviceHandle) -> Result<()> {
        self.inner.counters.stop.fetch_add(1, Ordering::Relaxed);
        let state = self.inner.state.lock();
        if state.refuse_requests {
            return Err(Error::SourceUnavailable("mock link refused".to_string()));
        }
        if state.silent || !state.connected.iter().any(|(h, _)| *h == handle) {
            return Ok(());
        }
        let ack = if state.accept_stop {
            SampleAck::StopAccepted
        } else {
            SampleAck::StopRejected
        };
        let _ = self.inner.tx.send(PumpEvent::Ack(handle, ack));
        Ok(())
    }

    fn disconnect(&self, handle: DeviceHandle) -> Result<()> {
        self.inner.counters.disconnect.fetch_add(1, Ordering::Relaxed);
        let mut state = self.inner.state.lock();
        state.connected.retain(|(h, _)| *h != handle);
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        self.inner.state.lock().sink = None;
        Ok(())
    }
}

/// Scripting handle for the far side of a [`MockTransport`].
///
/// Clones share the same link. Event-producing calls queue onto the pump;
/// use [`flush`](MockRemote::flush) to wait until everything queued so
/// far has been dispatched.
#[derive(Clone)]
pub struct MockRemote {
    inner: Arc<MockInner>,
}

impl MockRemote {
    /// Add a unit to the announcement roster.
    ///
    /// If discovery is already running the unit is announced right away.
    pub fn register_device(&self, info: DeviceInfo) {
        let mut state = self.inner.state.lock();
        let announcing = state.sink.is_some();
        state.roster.push(info.clone());
        if announcing {
            let _ = self.inner.tx.send(PumpEvent::Discovered(info));
        }
    }

    /// Accept or refuse future connect requests (refused requests never
    /// complete)
    pub fn set_accept_connect(&self, accept: bool) {
        self.inner.state.lock().accept_connect = accept;
    }

    /// Acknowledge future start requests as accepted or rejected
    pub fn set_accept_start(&self, accept: bool) {
        self.inner.state.lock().accept_start = accept;
    }

    /// Acknowledge future stop requests as accepted or rejected
    pub fn set_accept_stop(&self, accept: bool) {
        self.inner.state.lock().accept_stop = accept;
    }

    /// Make every request fail outright at the call site
    pub fn set_refuse_requests(&self, refuse: bool) {
        self.inner.state.lock().refuse_requests = refuse;
    }

    /// Swallow future requests: counted and accepted, never completed
    pub fn set_silent(&self, silent: bool) {
        self.inner.state.lock().silent = silent;
    }

    /// Deliver a batch of points for `handle`
    pub fn send_packet(&self, handle: DeviceHandle, points: Vec<Point>) {
        let _ = self
            .inner
            .tx
            .send(PumpEvent::Packet(PointPacket::new(handle, points)));
    }

    /// Drop a connected device without a consumer request
    pub fn drop_device(&self, handle: DeviceHandle) {
        self.inner
            .state
            .lock()
            .connected
            .retain(|(h, _)| *h != handle);
        let _ = self.inner.tx.send(PumpEvent::Disconnected(handle));
    }

    /// Report a fault status for `handle`
    pub fn raise_fault(&self, handle: DeviceHandle, fault: DeviceFault) {
        let _ = self.inner.tx.send(PumpEvent::Fault(handle, fault));
    }

    /// Report a descriptive-record change for `handle`
    pub fn update_info(&self, handle: DeviceHandle, info: DeviceInfo) {
        let _ = self.inner.tx.send(PumpEvent::InfoChanged(handle, info));
    }

    /// Handle assigned by the most recent accepted connect
    pub fn connected_handle(&self) -> Option<DeviceHandle> {
        self.inner.state.lock().last_handle
    }

    /// Wait until every event queued so far has been dispatched
    pub fn flush(&self) {
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        if self.inner.tx.send(PumpEvent::Flush(done_tx)).is_ok() {
            let _ = done_rx.recv_timeout(Duration::from_secs(5));
        }
    }

    /// Connect requests seen so far
    pub fn connect_requests(&self) -> u32 {
        self.inner.counters.connect.load(Ordering::Relaxed)
    }

    /// Start-sampling requests seen so far
    pub fn start_requests(&self) -> u32 {
        self.inner.counters.start.load(Ordering::Relaxed)
    }

    /// Stop-sampling requests seen so far
    pub fn stop_requests(&self) -> u32 {
        self.inner.counters.stop.load(Ordering::Relaxed)
    }

    /// Disconnect requests seen so far
    pub fn disconnect_requests(&self) -> u32 {
        self.inner.counters.disconnect.load(Ordering::Relaxed)
    }
}
