//! Event-emitter front end over [`MouseHook`].
//!
//! Handlers subscribe per event kind. The hook is created on the first
//! subscription and resumed right away, move capture follows whether any
//! move handler is subscribed, and payloads are decoded from the raw
//! positional values:
//!
//! - wheel: `delta` in notches (`aux` high word / 120) and `axis` (0 vertical,
//!   1 horizontal)
//! - down/up: extended buttons reported as `3 + id` (X1 = 4, X2 = 5)

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::bridge::{Dispatcher, Listener};
use crate::error::HookError;
use crate::event::EventKind;
use crate::hook::{HookOptions, MouseHook};
use crate::platform::Platform;
use crate::pump::PumpExit;

const WHEEL_DELTA: f64 = 120.0;

/// Decoded mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum MouseEvent {
    #[serde(rename = "mousemove")]
    Move { x: i32, y: i32 },
    #[serde(rename = "mousedown")]
    Down { x: i32, y: i32, button: i32 },
    #[serde(rename = "mouseup")]
    Up { x: i32, y: i32, button: i32 },
    #[serde(rename = "mousewheel")]
    Wheel { x: i32, y: i32, delta: f64, axis: i32 },
}

impl MouseEvent {
    /// Decode the listener's positional values.
    pub fn decode(name: &str, x: i32, y: i32, button: i32, aux: u32) -> Option<Self> {
        let high = (aux as i32) >> 16;
        let event = match EventKind::from_name(name)? {
            EventKind::Move => Self::Move { x, y },
            EventKind::Down => Self::Down {
                x,
                y,
                button: extended_button(button, high),
            },
            EventKind::Up => Self::Up {
                x,
                y,
                button: extended_button(button, high),
            },
            EventKind::Wheel => Self::Wheel {
                x,
                y,
                delta: f64::from(high) / WHEEL_DELTA,
                axis: button,
            },
        };
        Some(event)
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Move { .. } => EventKind::Move,
            Self::Down { .. } => EventKind::Down,
            Self::Up { .. } => EventKind::Up,
            Self::Wheel { .. } => EventKind::Wheel,
        }
    }
}

fn extended_button(button: i32, high: i32) -> i32 {
    if high != 0 {
        3 + high
    } else {
        button
    }
}

pub type Handler = Box<dyn FnMut(&MouseEvent) + Send>;

/// Listener that fans decoded events out to per-kind handlers.
#[derive(Default)]
pub struct Router {
    handlers: HashMap<EventKind, Vec<Handler>>,
}

impl Router {
    fn add(&mut self, kind: EventKind, handler: Handler) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    fn remove(&mut self, kind: EventKind) -> usize {
        self.handlers.remove(&kind).map_or(0, |h| h.len())
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }
}

impl Listener for Router {
    fn on_event(&mut self, name: &str, x: i32, y: i32, button: i32, aux: u32) {
        let Some(event) = MouseEvent::decode(name, x, y, button, aux) else {
            return;
        };
        if let Some(handlers) = self.handlers.get_mut(&event.kind()) {
            for handler in handlers.iter_mut() {
                handler(&event);
            }
        }
    }
}

/// Subscription-based mouse events with lazy hook creation.
pub struct MouseEvents<P: Platform> {
    platform: Option<P>,
    options: HookOptions,
    pending: Router,
    hook: Option<MouseHook>,
    dispatcher: Option<Dispatcher<Router>>,
    paused: bool,
}

impl<P: Platform> MouseEvents<P> {
    pub fn new(platform: P) -> Self {
        Self::with_options(platform, HookOptions::default())
    }

    pub fn with_options(platform: P, options: HookOptions) -> Self {
        Self {
            platform: Some(platform),
            options,
            pending: Router::default(),
            hook: None,
            dispatcher: None,
            paused: true,
        }
    }

    /// Subscribe `handler` to `kind`. The first subscription creates and
    /// resumes the hook.
    pub fn on<F>(&mut self, kind: EventKind, handler: F) -> Result<(), HookError>
    where
        F: FnMut(&MouseEvent) + Send + 'static,
    {
        if kind == EventKind::Move {
            self.set_move_capture(true);
        }
        self.router_mut().add(kind, Box::new(handler));

        if self.hook.is_none() {
            self.start()?;
        }
        Ok(())
    }

    /// Remove every handler for `kind`. Returns how many were removed.
    pub fn off(&mut self, kind: EventKind) -> usize {
        let removed = self.router_mut().remove(kind);
        if kind == EventKind::Move {
            self.set_move_capture(false);
        }
        removed
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Returns `false` if already paused or the pump could not be woken.
    pub fn pause(&mut self) -> bool {
        if self.paused {
            return false;
        }
        self.paused = true;
        self.hook
            .as_ref()
            .is_some_and(|hook| hook.pause_mouse_events())
    }

    /// Returns `false` if already running or the pump could not be woken.
    pub fn resume(&mut self) -> bool {
        if !self.paused {
            return false;
        }
        self.paused = false;
        self.hook
            .as_ref()
            .is_some_and(|hook| hook.resume_mouse_events())
    }

    /// Deliver queued events to handlers on the calling thread.
    pub fn dispatch_pending(&mut self) -> usize {
        self.dispatcher
            .as_mut()
            .map_or(0, |dispatcher| dispatcher.dispatch_pending())
    }

    /// Wait for and deliver one event. Returns `false` if there is no hook
    /// or it has shut down.
    pub async fn next(&mut self) -> bool {
        match self.dispatcher.as_mut() {
            Some(dispatcher) => dispatcher.dispatch_next().await,
            None => false,
        }
    }

    pub fn hook(&self) -> Option<&MouseHook> {
        self.hook.as_ref()
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        match &self.dispatcher {
            Some(dispatcher) => dispatcher.listener().handler_count(kind),
            None => self.pending.handler_count(kind),
        }
    }

    /// Stop the hook, if one was created.
    pub fn shutdown(mut self) -> Option<PumpExit> {
        self.hook.take().and_then(MouseHook::shutdown)
    }

    fn router_mut(&mut self) -> &mut Router {
        match self.dispatcher.as_mut() {
            Some(dispatcher) => dispatcher.listener_mut(),
            None => &mut self.pending,
        }
    }

    fn set_move_capture(&mut self, enabled: bool) {
        self.options.capture_move = enabled;
        if let Some(hook) = &self.hook {
            if enabled {
                hook.enable_mouse_move();
            } else {
                hook.disable_mouse_move();
            }
        }
    }

    fn start(&mut self) -> Result<(), HookError> {
        let Some(platform) = self.platform.take() else {
            return Ok(());
        };
        // A new subscription always resumes, whatever was requested before.
        let options = HookOptions {
            start_running: true,
            ..self.options.clone()
        };
        let router = std::mem::take(&mut self.pending);
        let (hook, dispatcher) = MouseHook::create(platform, router, options)?;
        self.hook = Some(hook);
        self.dispatcher = Some(dispatcher);
        self.paused = false;

        debug!("Mouse events started");
        Ok(())
    }
}
