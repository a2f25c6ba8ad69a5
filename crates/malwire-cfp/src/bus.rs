//! CAN bus access.
//!
//! [`CanBus`] is the seam between the fragmentation protocol and a real
//! controller. [`LoopbackBus`] is an in-process broadcast bus: every frame
//! sent on one port is delivered to every other open port.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

use crate::error::{CfpError, Result};
use crate::frame::CanFrame;

/// A blocking, frame-oriented CAN interface.
pub trait CanBus: Send + Sync {
    /// Queue one frame for transmission.
    fn send_frame(&self, frame: &CanFrame) -> Result<()>;

    /// Block until a frame arrives. Fails with `BusClosed` after shutdown.
    fn recv_frame(&self) -> Result<CanFrame>;

    /// Stop the port. Idempotent; wakes a blocked `recv_frame`.
    fn shutdown(&self) -> Result<()>;
}

/// Decides whether a frame in flight is lost.
pub type LossFn = Box<dyn FnMut(&CanFrame) -> bool + Send>;

#[derive(Default)]
struct BusState {
    ports: Vec<(u64, Sender<CanFrame>)>,
    loss: Option<LossFn>,
}

/// In-memory broadcast CAN bus.
///
/// Cloning yields another handle to the same bus.
#[derive(Clone, Default)]
pub struct LoopbackBus {
    state: Arc<Mutex<BusState>>,
    next_port: Arc<AtomicU64>,
}

impl std::fmt::Debug for LoopbackBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackBus")
            .field("ports", &self.port_count())
            .finish()
    }
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new port to the bus.
    pub fn open_port(&self) -> LoopbackPort {
        let (tx, rx) = mpsc::channel();
        let id = self.next_port.fetch_add(1, Ordering::Relaxed);
        self.lock().ports.push((id, tx));
        LoopbackPort {
            id,
            bus: self.clone(),
            rx: Mutex::new(rx),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of open ports.
    pub fn port_count(&self) -> usize {
        self.lock().ports.len()
    }

    /// Drop frames for which `loss` returns true. `None` restores a
    /// lossless bus.
    pub fn set_loss(&self, loss: Option<LossFn>) {
        self.lock().loss = loss;
    }

    fn broadcast(&self, from: u64, frame: &CanFrame) {
        let mut state = self.lock();
        if let Some(loss) = state.loss.as_mut() {
            if loss(frame) {
                trace!(id = frame.id, "loopback frame dropped");
                return;
            }
        }
        for (_, tx) in state.ports.iter().filter(|(id, _)| *id != from) {
            // A port whose receiver is gone is being detached.
            let _ = tx.send(frame.clone());
        }
    }

    fn detach(&self, port: u64) {
        self.lock().ports.retain(|(id, _)| *id != port);
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One node's attachment to a [`LoopbackBus`].
pub struct LoopbackPort {
    id: u64,
    bus: LoopbackBus,
    rx: Mutex<Receiver<CanFrame>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for LoopbackPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackPort")
            .field("id", &self.id)
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}

impl CanBus for LoopbackPort {
    fn send_frame(&self, frame: &CanFrame) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CfpError::BusClosed);
        }
        self.bus.broadcast(self.id, frame);
        Ok(())
    }

    fn recv_frame(&self) -> Result<CanFrame> {
        let rx = self
            .rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        rx.recv().map_err(|_| CfpError::BusClosed)
    }

    fn shutdown(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            // Dropping the port's only sender disconnects its receiver.
            self.bus.detach(self.id);
        }
        Ok(())
    }
}

impl Drop for LoopbackPort {
    fn drop(&mut self) {
        self.bus.detach(self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn broadcast_skips_sender() {
        let bus = LoopbackBus::new();
        let a = bus.open_port();
        let b = bus.open_port();
        let c = bus.open_port();

        a.send_frame(&CanFrame::new(0x10, &b"hi"[..])).unwrap();
        assert_eq!(b.recv_frame().unwrap().id, 0x10);
        assert_eq!(c.recv_frame().unwrap().data.as_ref(), b"hi");
        assert!(a.rx.lock().unwrap().try_recv().is_err());
    }

    #[test]
    fn shutdown_wakes_blocked_receiver() {
        let bus = LoopbackBus::new();
        let port = Arc::new(bus.open_port());
        let reader = {
            let port = Arc::clone(&port);
            std::thread::spawn(move || port.recv_frame())
        };
        std::thread::sleep(Duration::from_millis(20));
        port.shutdown().unwrap();
        port.shutdown().unwrap();

        assert!(matches!(reader.join().unwrap(), Err(CfpError::BusClosed)));
        assert!(matches!(
            port.send_frame(&CanFrame::new(1, Vec::new())),
            Err(CfpError::BusClosed)
        ));
        assert_eq!(bus.port_count(), 0);
    }

    #[test]
    fn dropped_port_detaches() {
        let bus = LoopbackBus::new();
        let a = bus.open_port();
        {
            let _b = bus.open_port();
            assert_eq!(bus.port_count(), 2);
        }
        assert_eq!(bus.port_count(), 1);
        a.send_frame(&CanFrame::new(1, Vec::new())).unwrap();
    }

    #[test]
    fn loss_function_drops_frames() {
        let bus = LoopbackBus::new();
        let a = bus.open_port();
        let b = bus.open_port();
        bus.set_loss(Some(Box::new(|frame: &CanFrame| frame.id == 2)));

        for id in 1..=3 {
            a.send_frame(&CanFrame::new(id, Vec::new())).unwrap();
        }
        assert_eq!(b.recv_frame().unwrap().id, 1);
        assert_eq!(b.recv_frame().unwrap().id, 3);
    }
}
