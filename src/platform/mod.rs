//! OS seam for the hook pump.
//!
//! A `Platform` owns the OS hook registration and the pump's wait
//! primitive. The pump calls every method from its own thread; only the
//! `PumpWaker` it hands out is used from other threads.
//!
//! Backends:
//! - Windows: `WH_MOUSE_LL` with the thread message queue as wait primitive
//! - macOS / Linux X11: `rdev` (feature `rdev-listener`)
//! - `Simulated`: in-process stand-in for tests and headless hosts

#[cfg(all(not(target_os = "windows"), feature = "rdev-listener"))]
pub mod portable;
pub mod simulated;
#[cfg(target_os = "windows")]
pub mod win32;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::HookError;

pub use crate::pump::HookSink;
pub use simulated::{Simulated, SimulatedOs};

/// Why the pump's wait primitive returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// A lifecycle toggle was requested; re-check the desired state.
    Control,
    /// Something unrelated woke the loop.
    Other,
    /// Leave the loop.
    Quit,
}

/// Posts into the pump's wait primitive from any thread.
pub trait PumpWaker: Send + Sync + 'static {
    /// Request a desired-state re-check. Returns whether the post succeeded.
    fn wake(&self) -> bool;
    /// Request pump shutdown. Returns whether the post succeeded.
    fn quit(&self) -> bool;
}

/// OS hook backend driven by the pump thread.
pub trait Platform: Send + 'static {
    type Waker: PumpWaker;

    /// Called once on the pump thread before anything else. The returned
    /// waker must already be able to reach `wait`.
    fn bind(&mut self) -> Self::Waker;

    /// Register the global hook. Raw notifications go to `sink`.
    fn install(&mut self, sink: HookSink) -> Result<(), HookError>;

    /// Unregister the global hook.
    fn uninstall(&mut self) -> Result<(), HookError>;

    /// Block until the next wake.
    fn wait(&mut self) -> Wake;
}

/// Single-slot control channel for backends without an OS message queue.
///
/// Wakes coalesce: while one is pending, further wakes report success
/// without queueing, since the pump re-reads the desired state anyway.
pub fn control_channel() -> (ChannelWaker, ControlSignals) {
    let (tx, rx) = mpsc::channel(1);
    let quit = Arc::new(AtomicBool::new(false));
    (
        ChannelWaker {
            tx,
            quit: quit.clone(),
        },
        ControlSignals { rx, quit },
    )
}

#[derive(Clone)]
pub struct ChannelWaker {
    tx: mpsc::Sender<()>,
    quit: Arc<AtomicBool>,
}

impl ChannelWaker {
    fn post(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => true,
            Err(TrySendError::Closed(())) => false,
        }
    }
}

impl PumpWaker for ChannelWaker {
    fn wake(&self) -> bool {
        self.post()
    }

    fn quit(&self) -> bool {
        self.quit.store(true, Ordering::SeqCst);
        self.post()
    }
}

/// Receiving end of `control_channel`, owned by the backend.
pub struct ControlSignals {
    rx: mpsc::Receiver<()>,
    quit: Arc<AtomicBool>,
}

impl ControlSignals {
    /// Block until a wake arrives. Must run outside an async runtime.
    pub fn wait(&mut self) -> Wake {
        match self.rx.blocking_recv() {
            Some(()) if self.quit.load(Ordering::SeqCst) => Wake::Quit,
            Some(()) => Wake::Control,
            None => Wake::Quit,
        }
    }
}

#[cfg(target_os = "windows")]
pub type NativePlatform = win32::Win32Platform;

#[cfg(all(not(target_os = "windows"), feature = "rdev-listener"))]
pub type NativePlatform = portable::PortablePlatform;

/// The OS backend compiled into this build.
#[cfg(any(target_os = "windows", feature = "rdev-listener"))]
pub fn native() -> NativePlatform {
    NativePlatform::new()
}

/// Whether this build has a native backend.
pub const fn has_native() -> bool {
    cfg!(any(target_os = "windows", feature = "rdev-listener"))
}
