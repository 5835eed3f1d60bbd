//! Global mouse hook.
//!
//! Observes system-wide mouse input on a dedicated pump thread and hands
//! classified events to a listener running on the consumer's side of a
//! bounded queue. The hook never blocks or consumes input; when the
//! consumer falls behind, new events are dropped and counted.
//!
//! Layers, bottom up:
//! - [`event`]: raw OS notifications and their classification
//! - [`bridge`]: bounded, non-blocking hand-off to the listener
//! - [`platform`]: OS backends behind the [`Platform`] trait
//! - [`pump`]: the thread that owns the OS hook and its lifecycle
//! - [`hook`]: the [`MouseHook`] control handle
//! - [`global`]: one process-wide hook driven by free functions
//! - [`emitter`]: per-kind subscriptions with decoded payloads

pub mod bridge;
pub mod emitter;
pub mod error;
pub mod event;
pub mod global;
pub mod hook;
pub mod platform;
pub mod pump;
pub mod state;

pub use bridge::{BridgeStats, Dispatcher, Listener};
pub use emitter::{MouseEvent, MouseEvents};
pub use error::{HookError, Result};
pub use event::{Button, ClassifiedEvent, EventKind, MouseAction, RawButton, RawNotification};
pub use global::{
    create_mouse_hook, create_mouse_hook_on, disable_mouse_move, enable_mouse_move,
    pause_mouse_events, resume_mouse_events, shutdown_mouse_hook,
};
pub use hook::{HookOptions, MouseHook};
pub use platform::{Platform, Simulated, SimulatedOs};
pub use pump::PumpExit;
pub use state::HookLifecycle;
