//! In-process stand-in for an OS hook.
//!
//! `Simulated` plays the backend role on the pump thread; `SimulatedOs` is
//! the test's view of "the operating system": it delivers notifications
//! only while a hook is registered, exactly like the real thing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::{control_channel, ChannelWaker, ControlSignals, Platform, Wake};
use crate::error::HookError;
use crate::event::RawNotification;
use crate::pump::HookSink;

#[derive(Default)]
struct OsState {
    hook: Mutex<Option<HookSink>>,
    installs: AtomicUsize,
    uninstalls: AtomicUsize,
    fail_install: AtomicBool,
    fail_uninstall: AtomicBool,
}

/// Backend half, moved into the pump thread.
pub struct Simulated {
    os: Arc<OsState>,
    waker: ChannelWaker,
    signals: ControlSignals,
}

/// OS half, kept by the caller to synthesize input and inspect the hook.
#[derive(Clone)]
pub struct SimulatedOs {
    os: Arc<OsState>,
    waker: ChannelWaker,
}

impl Simulated {
    pub fn new() -> (Simulated, SimulatedOs) {
        let os = Arc::new(OsState::default());
        let (waker, signals) = control_channel();
        (
            Simulated {
                os: os.clone(),
                waker: waker.clone(),
                signals,
            },
            SimulatedOs { os, waker },
        )
    }
}

impl Platform for Simulated {
    type Waker = ChannelWaker;

    fn bind(&mut self) -> ChannelWaker {
        self.waker.clone()
    }

    fn install(&mut self, sink: HookSink) -> Result<(), HookError> {
        if self.os.fail_install.swap(false, Ordering::SeqCst) {
            return Err(HookError::Register("simulated registration failure".into()));
        }
        *lock(&self.os.hook) = Some(sink);
        self.os.installs.fetch_add(1, Ordering::SeqCst);
        debug!("Simulated hook registered");
        Ok(())
    }

    fn uninstall(&mut self) -> Result<(), HookError> {
        if self.os.fail_uninstall.swap(false, Ordering::SeqCst) {
            return Err(HookError::Unregister(
                "simulated unregistration failure".into(),
            ));
        }
        *lock(&self.os.hook) = None;
        self.os.uninstalls.fetch_add(1, Ordering::SeqCst);
        debug!("Simulated hook unregistered");
        Ok(())
    }

    fn wait(&mut self) -> Wake {
        self.signals.wait()
    }
}

impl SimulatedOs {
    /// Deliver one notification through the registered hook, if any.
    /// Returns whether a hook saw it.
    pub fn emit(&self, raw: RawNotification) -> bool {
        match lock(&self.os.hook).as_ref() {
            Some(sink) => {
                sink.notify(raw);
                true
            }
            None => false,
        }
    }

    pub fn is_installed(&self) -> bool {
        lock(&self.os.hook).is_some()
    }

    pub fn install_count(&self) -> usize {
        self.os.installs.load(Ordering::SeqCst)
    }

    pub fn uninstall_count(&self) -> usize {
        self.os.uninstalls.load(Ordering::SeqCst)
    }

    /// Make the next registration fail.
    pub fn fail_next_install(&self) {
        self.os.fail_install.store(true, Ordering::SeqCst);
    }

    /// Make the next unregistration fail.
    pub fn fail_next_uninstall(&self) {
        self.os.fail_uninstall.store(true, Ordering::SeqCst);
    }

    /// Direct handle to the pump's wait primitive.
    pub fn waker(&self) -> ChannelWaker {
        self.waker.clone()
    }
}

// A panicking test thread must not wedge every other user of the fake OS.
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge;
    use crate::event::{MouseAction, RawButton};
    use crate::state::HookShared;

    #[test]
    fn emit_requires_registered_hook() {
        let (mut platform, os) = Simulated::new();
        let shared = Arc::new(HookShared::new(false, true));
        let (tx, mut rx) = bridge::channel(4, |_: &str, _: i32, _: i32, _: i32, _: u32| {});
        let raw = RawNotification::new(MouseAction::Down(RawButton::Left), 3, 4, 0);

        assert!(!os.emit(raw));

        platform
            .install(HookSink::new(shared, tx.downgrade()))
            .unwrap();
        assert!(os.emit(raw));
        assert_eq!(rx.dispatch_pending(), 1);

        platform.uninstall().unwrap();
        assert!(!os.emit(raw));
        assert_eq!(os.install_count(), 1);
        assert_eq!(os.uninstall_count(), 1);
    }

    #[test]
    fn injected_failures_are_one_shot() {
        let (mut platform, os) = Simulated::new();
        let shared = Arc::new(HookShared::new(false, true));
        let (tx, _rx) = bridge::channel(4, |_: &str, _: i32, _: i32, _: i32, _: u32| {});
        let sink = HookSink::new(shared, tx.downgrade());

        os.fail_next_install();
        assert!(platform.install(sink.clone()).is_err());
        assert!(platform.install(sink).is_ok());
        assert!(os.is_installed());
    }
}
