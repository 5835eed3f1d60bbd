//! Shared hook state.
//!
//! One `HookShared` is created per hook and shared via `Arc` between the
//! control API (consumer thread), the pump thread and the hook callback.
//! Everything here is atomic or write-once; nothing blocks.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::OnceLock;

use crate::error::HookError;
use crate::platform::PumpWaker;

/// Whether the OS hook is currently registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HookLifecycle {
    Uninstalled = 0,
    Installed = 1,
}

impl HookLifecycle {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Installed,
            _ => Self::Uninstalled,
        }
    }
}

impl std::fmt::Display for HookLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninstalled => write!(f, "uninstalled"),
            Self::Installed => write!(f, "installed"),
        }
    }
}

/// State shared between the control API and the pump.
pub struct HookShared {
    /// Intercept mode: forward moves or not.
    capture_move: AtomicBool,
    /// Desired hook state, re-read by the pump on every wake.
    should_run: AtomicBool,
    /// Actual hook state. Written by the pump thread only.
    lifecycle: AtomicU8,
    /// Set once the pump is addressable.
    waker: OnceLock<Box<dyn PumpWaker>>,
    /// Fatal error the pump exited with, if any.
    fault: OnceLock<HookError>,
    pump_alive: AtomicBool,
}

impl HookShared {
    pub fn new(capture_move: bool, should_run: bool) -> Self {
        Self {
            capture_move: AtomicBool::new(capture_move),
            should_run: AtomicBool::new(should_run),
            lifecycle: AtomicU8::new(HookLifecycle::Uninstalled as u8),
            waker: OnceLock::new(),
            fault: OnceLock::new(),
            pump_alive: AtomicBool::new(false),
        }
    }

    pub fn capture_move(&self) -> bool {
        self.capture_move.load(Ordering::Relaxed)
    }

    pub fn set_capture_move(&self, enabled: bool) {
        self.capture_move.store(enabled, Ordering::Relaxed);
    }

    pub fn should_run(&self) -> bool {
        self.should_run.load(Ordering::SeqCst)
    }

    /// Record the desired state, then wake the pump.
    ///
    /// The flag is written before the waker is looked up and the pump
    /// publishes its waker before reading the flag, so a request is never
    /// lost: either the post lands or the pump sees the new flag at startup.
    /// Returns whether a wake was posted.
    pub fn request_running(&self, running: bool) -> bool {
        self.should_run.store(running, Ordering::SeqCst);
        match self.waker.get() {
            Some(waker) => waker.wake(),
            None => false,
        }
    }

    /// Ask the pump to leave its wait loop.
    pub fn request_quit(&self) -> bool {
        match self.waker.get() {
            Some(waker) => waker.quit(),
            None => false,
        }
    }

    pub fn lifecycle(&self) -> HookLifecycle {
        HookLifecycle::from_u8(self.lifecycle.load(Ordering::Acquire))
    }

    pub(crate) fn set_lifecycle(&self, state: HookLifecycle) {
        self.lifecycle.store(state as u8, Ordering::Release);
    }

    pub(crate) fn publish_waker(&self, waker: Box<dyn PumpWaker>) {
        // Only the pump publishes, once.
        let _ = self.waker.set(waker);
        self.pump_alive.store(true, Ordering::SeqCst);
    }

    /// Whether the pump is running and can be woken.
    pub fn pump_alive(&self) -> bool {
        self.pump_alive.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_pump_exited(&self) {
        self.pump_alive.store(false, Ordering::SeqCst);
    }

    pub(crate) fn record_fault(&self, error: HookError) {
        let _ = self.fault.set(error);
    }

    pub fn fault(&self) -> Option<&HookError> {
        self.fault.get()
    }
}

impl std::fmt::Debug for HookShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookShared")
            .field("capture_move", &self.capture_move())
            .field("should_run", &self.should_run())
            .field("lifecycle", &self.lifecycle())
            .field("pump_alive", &self.pump_alive())
            .field("fault", &self.fault())
            .finish()
    }
}
