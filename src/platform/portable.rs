//! rdev backend for macOS (Quartz event taps) and Linux/X11 (XRecord).
//!
//! `rdev::listen` blocks its thread forever and has no way to unregister,
//! so the listener thread is started by the first install and lives for
//! the rest of the process. Install/uninstall gate forwarding with an
//! atomic; while uninstalled the callback only tracks the cursor.
//!
//! rdev reports positions only on moves, so button and wheel events carry
//! the last known cursor position. Wheel ticks are scaled to 120 per notch
//! in the high word of `aux`, and X11 back/forward buttons (8/9) are
//! reported as extended buttons 1/2, matching what Windows hands out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use rdev::{listen, Event, EventType};
use tracing::{info, warn};

use super::{control_channel, ChannelWaker, ControlSignals, Platform, Wake};
use crate::error::HookError;
use crate::event::{MouseAction, RawButton, RawNotification};
use crate::pump::HookSink;

const WHEEL_DELTA: i64 = 120;

pub struct PortablePlatform {
    active: Arc<AtomicBool>,
    listener_started: bool,
    waker: ChannelWaker,
    signals: ControlSignals,
}

impl PortablePlatform {
    pub fn new() -> Self {
        let (waker, signals) = control_channel();
        Self {
            active: Arc::new(AtomicBool::new(false)),
            listener_started: false,
            waker,
            signals,
        }
    }
}

impl Default for PortablePlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn button_for(button: &rdev::Button) -> (RawButton, u32) {
    match *button {
        rdev::Button::Left => (RawButton::Left, 0),
        rdev::Button::Right => (RawButton::Right, 0),
        rdev::Button::Middle => (RawButton::Middle, 0),
        rdev::Button::Unknown(n) => {
            let id = match n {
                8 => 1,
                9 => 2,
                other => u32::from(other),
            };
            (RawButton::X, id << 16)
        }
    }
}

fn wheel_aux(ticks: i64) -> u32 {
    let delta = (ticks * WHEEL_DELTA).clamp(i16::MIN as i64, i16::MAX as i64) as i16;
    u32::from(delta as u16) << 16
}

type Translated = [Option<(MouseAction, u32)>; 2];

/// Translate one rdev event, tracking the cursor in `last`. A diagonal
/// wheel event yields a vertical and a horizontal notification.
fn translate(event_type: &EventType, last: &mut (i32, i32)) -> Translated {
    match event_type {
        EventType::MouseMove { x, y } => {
            *last = (*x as i32, *y as i32);
            [Some((MouseAction::Move, 0)), None]
        }
        EventType::ButtonPress(button) => {
            let (b, aux) = button_for(button);
            [Some((MouseAction::Down(b), aux)), None]
        }
        EventType::ButtonRelease(button) => {
            let (b, aux) = button_for(button);
            [Some((MouseAction::Up(b), aux)), None]
        }
        EventType::Wheel { delta_x, delta_y } => [
            (*delta_y != 0).then(|| (MouseAction::WheelVertical, wheel_aux(*delta_y))),
            (*delta_x != 0).then(|| (MouseAction::WheelHorizontal, wheel_aux(*delta_x))),
        ],
        _ => [None, None],
    }
}

/// Track the cursor for every event; produce notifications only while
/// `active`.
fn observe(
    event_type: &EventType,
    last: &mut (i32, i32),
    active: bool,
) -> Vec<RawNotification> {
    let translated = translate(event_type, last);
    if !active {
        return Vec::new();
    }
    translated
        .into_iter()
        .flatten()
        .map(|(action, aux)| RawNotification::new(action, last.0, last.1, aux))
        .collect()
}

impl Platform for PortablePlatform {
    type Waker = ChannelWaker;

    fn bind(&mut self) -> ChannelWaker {
        self.waker.clone()
    }

    fn install(&mut self, sink: HookSink) -> Result<(), HookError> {
        if !self.listener_started {
            let active = self.active.clone();
            thread::Builder::new()
                .name("mouse-hook-listener".into())
                .spawn(move || {
                    let mut last = (0, 0);
                    let callback = move |event: Event| {
                        let running = active.load(Ordering::Relaxed);
                        for raw in observe(&event.event_type, &mut last, running) {
                            if sink.wants(raw.action) {
                                sink.notify(raw);
                            }
                        }
                    };
                    if let Err(e) = listen(callback) {
                        warn!("Global mouse listener stopped: {:?}", e);
                    }
                })
                .map_err(|e| HookError::Register(e.to_string()))?;
            self.listener_started = true;
            info!("rdev mouse listener started");
        }

        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn uninstall(&mut self) -> Result<(), HookError> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn wait(&mut self) -> Wake {
        self.signals.wait()
    }
}
