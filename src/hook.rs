//! Control handle for one mouse hook.
//!
//! `MouseHook::create` spawns the pump thread and returns the handle used
//! from the consumer's thread together with the `Dispatcher` that delivers
//! events to the listener on that same side.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::bridge::{self, BridgeShared, BridgeStats, Dispatcher, Listener};
use crate::error::HookError;
use crate::platform::Platform;
use crate::pump::{self, PumpExit};
use crate::state::{HookLifecycle, HookShared};

/// Creation options.
#[derive(Debug, Clone)]
pub struct HookOptions {
    /// Outstanding events the bridge holds before dropping new ones.
    pub queue_capacity: usize,
    /// Initial move capture mode.
    pub capture_move: bool,
    /// Whether the pump installs the hook as soon as it starts.
    pub start_running: bool,
}

impl Default for HookOptions {
    fn default() -> Self {
        Self {
            queue_capacity: bridge::DEFAULT_CAPACITY,
            capture_move: false,
            start_running: true,
        }
    }
}

/// Handle to a running hook pump.
///
/// Dropping the handle asks the pump to stop without waiting for it; use
/// [`MouseHook::stop`] or [`MouseHook::shutdown`] to stop and join.
pub struct MouseHook {
    shared: Arc<HookShared>,
    bridge: Arc<BridgeShared>,
    pump: Mutex<Option<JoinHandle<PumpExit>>>,
}

impl MouseHook {
    /// Spawn the pump on `platform` and bind `listener` to the bridge.
    pub fn create<P, L>(
        platform: P,
        listener: L,
        options: HookOptions,
    ) -> Result<(MouseHook, Dispatcher<L>), HookError>
    where
        P: Platform,
        L: Listener,
    {
        let shared = Arc::new(HookShared::new(options.capture_move, options.start_running));
        let (sender, dispatcher) = bridge::channel(options.queue_capacity, listener);
        let bridge = sender.shared();

        let pump_shared = shared.clone();
        let pump = thread::Builder::new()
            .name("mouse-hook-pump".into())
            .spawn(move || pump::run(platform, pump_shared, sender))?;

        info!(
            capacity = options.queue_capacity,
            capture_move = options.capture_move,
            start_running = options.start_running,
            "Mouse hook pump started"
        );

        Ok((
            MouseHook {
                shared,
                bridge,
                pump: Mutex::new(Some(pump)),
            },
            dispatcher,
        ))
    }

    /// Spawn the pump on the backend compiled into this build.
    #[cfg(any(target_os = "windows", feature = "rdev-listener"))]
    pub fn create_native<L: Listener>(
        listener: L,
        options: HookOptions,
    ) -> Result<(MouseHook, Dispatcher<L>), HookError> {
        Self::create(crate::platform::native(), listener, options)
    }

    /// Spawn the pump on the backend compiled into this build.
    #[cfg(not(any(target_os = "windows", feature = "rdev-listener")))]
    pub fn create_native<L: Listener>(
        _listener: L,
        _options: HookOptions,
    ) -> Result<(MouseHook, Dispatcher<L>), HookError> {
        Err(HookError::Unsupported)
    }

    /// Start forwarding move events.
    pub fn enable_mouse_move(&self) {
        self.shared.set_capture_move(true);
    }

    /// Stop forwarding move events.
    pub fn disable_mouse_move(&self) {
        self.shared.set_capture_move(false);
    }

    /// Ask the pump to uninstall the hook. Returns whether the wake was
    /// posted; the request itself is recorded either way.
    pub fn pause_mouse_events(&self) -> bool {
        let posted = self.shared.request_running(false);
        if !posted {
            warn!("Pause requested but the hook pump could not be woken");
        }
        posted
    }

    /// Ask the pump to install the hook. Returns whether the wake was
    /// posted; the request itself is recorded either way.
    pub fn resume_mouse_events(&self) -> bool {
        let posted = self.shared.request_running(true);
        if !posted {
            warn!("Resume requested but the hook pump could not be woken");
        }
        posted
    }

    pub fn is_capturing_moves(&self) -> bool {
        self.shared.capture_move()
    }

    /// Desired state, as last requested through pause/resume.
    pub fn is_running_requested(&self) -> bool {
        self.shared.should_run()
    }

    /// Actual OS hook state.
    pub fn lifecycle(&self) -> HookLifecycle {
        self.shared.lifecycle()
    }

    /// Whether the pump thread is up and addressable.
    pub fn is_pump_alive(&self) -> bool {
        self.shared.pump_alive()
    }

    /// Error that stopped the pump, if it died.
    pub fn fault(&self) -> Option<&HookError> {
        self.shared.fault()
    }

    pub fn stats(&self) -> BridgeStats {
        self.bridge.snapshot()
    }

    /// Ask the pump to leave its wait loop without waiting for it.
    pub fn request_shutdown(&self) -> bool {
        self.shared.request_quit()
    }

    /// Stop the pump and wait for its thread.
    ///
    /// Returns `None` if the pump was already joined or its thread panicked.
    pub fn stop(&self) -> Option<PumpExit> {
        let handle = self
            .pump
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        self.shared.request_quit();
        match handle.join() {
            Ok(exit) => Some(exit),
            Err(_) => {
                warn!("Hook pump thread panicked");
                None
            }
        }
    }

    /// Stop the pump, wait for its thread and drop the handle.
    pub fn shutdown(self) -> Option<PumpExit> {
        self.stop()
    }
}

impl Drop for MouseHook {
    fn drop(&mut self) {
        let pump = self.pump.get_mut().unwrap_or_else(PoisonError::into_inner);
        if pump.take().is_some() {
            self.shared.request_quit();
        }
    }
}

impl std::fmt::Debug for MouseHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MouseHook")
            .field("shared", &self.shared)
            .field("stats", &self.stats())
            .finish()
    }
}
