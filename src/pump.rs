//! Hook pump: the background thread that owns the OS mouse hook.
//!
//! The pump blocks in its platform's wait primitive and reacts to a single
//! kind of control wake by comparing the desired state (`should_run`) with
//! what is installed. Raw notifications never pass through the loop; the
//! OS hands them to the `HookSink` registered at install time.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::bridge::{EventSender, WeakEventSender};
use crate::event::{classify, MouseAction, RawNotification};
use crate::platform::{Platform, Wake};
use crate::state::{HookLifecycle, HookShared};

/// Hook callback state: classifies raw notifications and submits them to
/// the bridge without blocking.
#[derive(Clone)]
pub struct HookSink {
    shared: Arc<HookShared>,
    sender: WeakEventSender,
}

impl HookSink {
    pub(crate) fn new(shared: Arc<HookShared>, sender: WeakEventSender) -> Self {
        Self { shared, sender }
    }

    /// Cheap pre-check for the hot path: moves are only interesting while
    /// move capture is on. Backends call this before copying the OS record.
    #[inline]
    pub fn wants(&self, action: MouseAction) -> bool {
        action != MouseAction::Move || self.shared.capture_move()
    }

    /// Classify and forward one notification. Returns whether an event was
    /// queued. Never blocks.
    pub fn notify(&self, raw: RawNotification) -> bool {
        if !self.wants(raw.action) {
            return false;
        }
        match classify(&raw, self.shared.capture_move()) {
            Some(event) => self.sender.submit(event),
            None => false,
        }
    }
}

/// Why the pump thread ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpExit {
    /// The wait primitive reported shutdown.
    Shutdown,
    /// Registering the hook failed; see `HookShared::fault`.
    InstallFailed,
    /// Unregistering the hook failed; see `HookShared::fault`.
    UninstallFailed,
}

struct Pump<P> {
    platform: P,
    shared: Arc<HookShared>,
    sink: HookSink,
    installed: bool,
}

impl<P: Platform> Pump<P> {
    fn run_loop(&mut self) -> PumpExit {
        // The desired state may have been set before the pump existed.
        if let Err(exit) = self.reconcile() {
            return exit;
        }

        loop {
            match self.platform.wait() {
                Wake::Quit => return PumpExit::Shutdown,
                Wake::Other => continue,
                Wake::Control => {
                    if let Err(exit) = self.reconcile() {
                        return exit;
                    }
                }
            }
        }
    }

    fn reconcile(&mut self) -> Result<(), PumpExit> {
        let want = self.shared.should_run();
        match (want, self.installed) {
            (true, false) => match self.platform.install(self.sink.clone()) {
                Ok(()) => {
                    self.installed = true;
                    self.shared.set_lifecycle(HookLifecycle::Installed);
                    info!("Mouse hook installed");
                    Ok(())
                }
                Err(e) => {
                    error!("Mouse hook registration failed, stopping pump: {}", e);
                    self.shared.record_fault(e);
                    Err(PumpExit::InstallFailed)
                }
            },
            (false, true) => {
                // Whatever the outcome, the hook is no longer ours to manage.
                self.installed = false;
                self.shared.set_lifecycle(HookLifecycle::Uninstalled);
                match self.platform.uninstall() {
                    Ok(()) => {
                        info!("Mouse hook uninstalled");
                        Ok(())
                    }
                    Err(e) => {
                        error!("Mouse hook unregistration failed, stopping pump: {}", e);
                        self.shared.record_fault(e);
                        Err(PumpExit::UninstallFailed)
                    }
                }
            }
            _ => {
                debug!(want, installed = self.installed, "Pump woke with nothing to do");
                Ok(())
            }
        }
    }
}

/// Body of the pump thread.
///
/// Publishes the platform's waker before reading the desired state, runs
/// the wait loop, then removes a still-installed hook and releases the
/// bridge.
pub(crate) fn run<P: Platform>(
    mut platform: P,
    shared: Arc<HookShared>,
    sender: EventSender,
) -> PumpExit {
    let waker = platform.bind();
    shared.publish_waker(Box::new(waker));

    let mut pump = Pump {
        platform,
        shared: shared.clone(),
        sink: HookSink::new(shared.clone(), sender.downgrade()),
        installed: false,
    };

    let exit = pump.run_loop();

    if pump.installed {
        if let Err(e) = pump.platform.uninstall() {
            warn!("Failed to remove mouse hook on shutdown: {}", e);
        }
        shared.set_lifecycle(HookLifecycle::Uninstalled);
    }

    // Closes the wait primitive, so later wakes report failure.
    drop(pump);
    shared.mark_pump_exited();
    sender.release();
    info!(?exit, "Hook pump exiting");
    exit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge;
    use crate::event::RawButton;
    use crate::platform::{PumpWaker, Simulated};
    use std::thread;
    use std::time::{Duration, Instant};

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    fn noop(_: &str, _: i32, _: i32, _: i32, _: u32) {}

    #[test]
    fn sink_short_circuits_moves() {
        let shared = Arc::new(HookShared::new(false, true));
        let (tx, mut rx) = bridge::channel(8, noop);
        let sink = HookSink::new(shared.clone(), tx.downgrade());

        assert!(!sink.wants(MouseAction::Move));
        assert!(!sink.notify(RawNotification::new(MouseAction::Move, 1, 1, 0)));
        assert!(sink.wants(MouseAction::Down(RawButton::Left)));

        shared.set_capture_move(true);
        assert!(sink.notify(RawNotification::new(MouseAction::Move, 1, 1, 0)));
        assert!(!sink.notify(RawNotification::new(MouseAction::Other(0), 1, 1, 0)));
        assert_eq!(rx.dispatch_pending(), 1);
    }

    #[test]
    fn starts_installed_when_requested_before_spawn() {
        let (platform, os) = Simulated::new();
        let shared = Arc::new(HookShared::new(false, true));
        let (tx, _rx) = bridge::channel(8, noop);

        let pump_shared = shared.clone();
        let handle = thread::spawn(move || run(platform, pump_shared, tx));

        assert!(wait_until(|| shared.lifecycle() == HookLifecycle::Installed));
        assert!(os.is_installed());
        assert_eq!(os.install_count(), 1);

        assert!(shared.request_quit());
        assert_eq!(handle.join().unwrap(), PumpExit::Shutdown);
        assert!(!os.is_installed());
        assert!(!shared.pump_alive());
    }

    #[test]
    fn toggles_and_ignores_redundant_wakes() {
        let (platform, os) = Simulated::new();
        let shared = Arc::new(HookShared::new(false, false));
        let (tx, _rx) = bridge::channel(8, noop);

        let pump_shared = shared.clone();
        let handle = thread::spawn(move || run(platform, pump_shared, tx));

        assert!(wait_until(|| shared.pump_alive()));
        assert!(!os.is_installed());

        assert!(shared.request_running(true));
        assert!(wait_until(|| os.is_installed()));
        assert!(shared.request_running(true));
        assert!(shared.request_running(true));

        assert!(shared.request_running(false));
        assert!(wait_until(|| !os.is_installed()));
        assert_eq!(shared.lifecycle(), HookLifecycle::Uninstalled);
        assert_eq!(os.install_count(), 1);

        shared.request_quit();
        assert_eq!(handle.join().unwrap(), PumpExit::Shutdown);
    }

    #[test]
    fn install_failure_is_fatal() {
        let (platform, os) = Simulated::new();
        os.fail_next_install();
        let shared = Arc::new(HookShared::new(false, true));
        let (tx, mut rx) = bridge::channel(8, noop);

        let pump_shared = shared.clone();
        let exit = thread::spawn(move || run(platform, pump_shared, tx))
            .join()
            .unwrap();

        assert_eq!(exit, PumpExit::InstallFailed);
        assert!(matches!(shared.fault(), Some(crate::HookError::Register(_))));
        assert_eq!(shared.lifecycle(), HookLifecycle::Uninstalled);
        assert!(!rx.dispatch_next_blocking());
    }

    #[test]
    fn uninstall_failure_is_fatal() {
        let (platform, os) = Simulated::new();
        os.fail_next_uninstall();
        let shared = Arc::new(HookShared::new(false, true));
        let (tx, _rx) = bridge::channel(8, noop);

        let pump_shared = shared.clone();
        let handle = thread::spawn(move || run(platform, pump_shared, tx));
        assert!(wait_until(|| os.is_installed()));

        shared.request_running(false);
        assert_eq!(handle.join().unwrap(), PumpExit::UninstallFailed);
        assert!(matches!(shared.fault(), Some(crate::HookError::Unregister(_))));
    }

    #[test]
    fn spurious_wake_is_ignored() {
        let (platform, os) = Simulated::new();
        let shared = Arc::new(HookShared::new(false, true));
        let (tx, _rx) = bridge::channel(8, noop);

        let waker = os.waker();
        let pump_shared = shared.clone();
        let handle = thread::spawn(move || run(platform, pump_shared, tx));
        assert!(wait_until(|| os.is_installed()));

        assert!(waker.wake());
        assert!(waker.quit());
        assert_eq!(handle.join().unwrap(), PumpExit::Shutdown);
        assert_eq!(os.install_count(), 1);
    }
}
