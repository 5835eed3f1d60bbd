//! Process-wide hook.
//!
//! One hook and one listener per process, driven through free functions.
//! The hook lives in a static for the rest of the process once created;
//! `shutdown_mouse_hook` stops and joins its pump but does not free the slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use tracing::info;

use crate::bridge::{Dispatcher, Listener};
use crate::error::HookError;
use crate::hook::{HookOptions, MouseHook};
use crate::platform::Platform;
use crate::state::HookLifecycle;

static HOOK: OnceLock<MouseHook> = OnceLock::new();
static CLAIMED: AtomicBool = AtomicBool::new(false);
// Move capture requested before the hook existed.
static EARLY_CAPTURE_MOVE: AtomicBool = AtomicBool::new(false);

/// Create the process hook on the native backend.
#[cfg(any(target_os = "windows", feature = "rdev-listener"))]
pub fn create_mouse_hook<L: Listener>(listener: L) -> Result<Dispatcher<L>, HookError> {
    create_mouse_hook_on(crate::platform::native(), listener)
}

/// Create the process hook on the native backend.
#[cfg(not(any(target_os = "windows", feature = "rdev-listener")))]
pub fn create_mouse_hook<L: Listener>(_listener: L) -> Result<Dispatcher<L>, HookError> {
    Err(HookError::Unsupported)
}

/// Create the process hook on `platform`. Fails with
/// `HookError::AlreadyCreated` on every call after the first success.
pub fn create_mouse_hook_on<P, L>(platform: P, listener: L) -> Result<Dispatcher<L>, HookError>
where
    P: Platform,
    L: Listener,
{
    if CLAIMED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(HookError::AlreadyCreated);
    }

    let options = HookOptions {
        capture_move: EARLY_CAPTURE_MOVE.load(Ordering::SeqCst),
        ..HookOptions::default()
    };

    match MouseHook::create(platform, listener, options) {
        Ok((hook, dispatcher)) => {
            let _ = HOOK.set(hook);
            // Catch a toggle that landed between the load above and the set.
            if let Some(hook) = HOOK.get() {
                apply_capture_move(hook);
            }
            info!("Process mouse hook created");
            Ok(dispatcher)
        }
        Err(e) => {
            CLAIMED.store(false, Ordering::SeqCst);
            Err(e)
        }
    }
}

fn apply_capture_move(hook: &MouseHook) {
    if EARLY_CAPTURE_MOVE.load(Ordering::SeqCst) {
        hook.enable_mouse_move();
    } else {
        hook.disable_mouse_move();
    }
}

pub fn enable_mouse_move() {
    EARLY_CAPTURE_MOVE.store(true, Ordering::SeqCst);
    if let Some(hook) = HOOK.get() {
        apply_capture_move(hook);
    }
}

pub fn disable_mouse_move() {
    EARLY_CAPTURE_MOVE.store(false, Ordering::SeqCst);
    if let Some(hook) = HOOK.get() {
        apply_capture_move(hook);
    }
}

/// Returns `false` if no hook exists yet or the pump could not be woken.
pub fn pause_mouse_events() -> bool {
    HOOK.get().is_some_and(|hook| hook.pause_mouse_events())
}

/// Returns `false` if no hook exists yet or the pump could not be woken.
pub fn resume_mouse_events() -> bool {
    HOOK.get().is_some_and(|hook| hook.resume_mouse_events())
}

/// Stop the process hook's pump and wait for it. Its dispatcher reports
/// closure afterwards. Returns `false` if there is no hook or its pump was
/// already joined.
pub fn shutdown_mouse_hook() -> bool {
    HOOK.get().is_some_and(|hook| hook.stop().is_some())
}

/// The process hook, if created.
pub fn mouse_hook() -> Option<&'static MouseHook> {
    HOOK.get()
}

pub fn lifecycle() -> Option<HookLifecycle> {
    HOOK.get().map(MouseHook::lifecycle)
}
