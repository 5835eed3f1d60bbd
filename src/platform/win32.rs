//! Win32 backend: `WH_MOUSE_LL` registered from the pump thread.
//!
//! Low-level hook procedures run on the registering thread while it sits in
//! `GetMessageW`, so the thread message queue doubles as the pump's wait
//! primitive: `WM_USER` is the lifecycle toggle and `WM_QUIT` ends the loop.
//! The hook procedure has no user data pointer; the sink lives in a thread
//! local of the pump thread.

use std::cell::RefCell;

use tracing::{debug, info, warn};
use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetMessageW, PeekMessageW, PostThreadMessageW, SetWindowsHookExW,
    UnhookWindowsHookEx, HHOOK, MSG, MSLLHOOKSTRUCT, PM_NOREMOVE, WH_MOUSE_LL, WM_LBUTTONDOWN,
    WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MBUTTONUP, WM_MOUSEHWHEEL, WM_MOUSEMOVE, WM_MOUSEWHEEL,
    WM_QUIT, WM_RBUTTONDOWN, WM_RBUTTONUP, WM_USER, WM_XBUTTONDOWN, WM_XBUTTONUP,
};

use super::{Platform, PumpWaker, Wake};
use crate::error::HookError;
use crate::event::{MouseAction, RawButton, RawNotification};
use crate::pump::HookSink;

thread_local! {
    static SINK: RefCell<Option<HookSink>> = const { RefCell::new(None) };
}

fn action_for(message: u32) -> MouseAction {
    match message {
        WM_MOUSEMOVE => MouseAction::Move,
        WM_LBUTTONDOWN => MouseAction::Down(RawButton::Left),
        WM_LBUTTONUP => MouseAction::Up(RawButton::Left),
        WM_RBUTTONDOWN => MouseAction::Down(RawButton::Right),
        WM_RBUTTONUP => MouseAction::Up(RawButton::Right),
        WM_MBUTTONDOWN => MouseAction::Down(RawButton::Middle),
        WM_MBUTTONUP => MouseAction::Up(RawButton::Middle),
        WM_XBUTTONDOWN => MouseAction::Down(RawButton::X),
        WM_XBUTTONUP => MouseAction::Up(RawButton::X),
        WM_MOUSEWHEEL => MouseAction::WheelVertical,
        WM_MOUSEHWHEEL => MouseAction::WheelHorizontal,
        other => MouseAction::Other(other),
    }
}

unsafe extern "system" fn low_level_mouse_proc(
    code: i32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if code >= 0 {
        let action = action_for(wparam.0 as u32);

        // Unwanted moves are rejected before the OS record is touched.
        let wanted = SINK.with(|slot| slot.borrow().as_ref().is_some_and(|s| s.wants(action)));
        if wanted {
            let info = &*(lparam.0 as *const MSLLHOOKSTRUCT);
            let raw = RawNotification {
                hook_code: code,
                action,
                x: info.pt.x,
                y: info.pt.y,
                aux: info.mouseData,
            };
            SINK.with(|slot| {
                if let Some(sink) = slot.borrow().as_ref() {
                    sink.notify(raw);
                }
            });
        }
    }

    // Observe only; the event always continues to its target.
    CallNextHookEx(HHOOK::default(), code, wparam, lparam)
}

/// Posts to the pump thread's message queue.
pub struct ThreadWaker {
    thread_id: u32,
}

impl ThreadWaker {
    fn post(&self, message: u32) -> bool {
        unsafe { PostThreadMessageW(self.thread_id, message, WPARAM(0), LPARAM(0)) }.is_ok()
    }
}

impl PumpWaker for ThreadWaker {
    fn wake(&self) -> bool {
        self.post(WM_USER)
    }

    fn quit(&self) -> bool {
        self.post(WM_QUIT)
    }
}

/// `WH_MOUSE_LL` backend. Must be driven from a single thread.
#[derive(Default)]
pub struct Win32Platform {
    // Raw handle value; HHOOK itself is not Send.
    hook: Option<isize>,
}

impl Win32Platform {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Platform for Win32Platform {
    type Waker = ThreadWaker;

    fn bind(&mut self) -> ThreadWaker {
        // PostThreadMessageW fails until the thread owns a message queue,
        // and the first USER32 message call is what creates it.
        let mut msg = MSG::default();
        unsafe {
            let _ = PeekMessageW(&mut msg, HWND::default(), WM_USER, WM_USER, PM_NOREMOVE);
        }
        let thread_id = unsafe { GetCurrentThreadId() };
        debug!(thread_id, "Hook pump message queue ready");
        ThreadWaker { thread_id }
    }

    fn install(&mut self, sink: HookSink) -> Result<(), HookError> {
        SINK.with(|slot| *slot.borrow_mut() = Some(sink));

        let result = unsafe {
            SetWindowsHookExW(
                WH_MOUSE_LL,
                Some(low_level_mouse_proc),
                HINSTANCE::default(),
                0,
            )
        };

        match result {
            Ok(hook) => {
                self.hook = Some(hook.0 as isize);
                info!("WH_MOUSE_LL installed (handle: {:?})", hook.0);
                Ok(())
            }
            Err(e) => {
                SINK.with(|slot| slot.borrow_mut().take());
                Err(HookError::Register(e.to_string()))
            }
        }
    }

    fn uninstall(&mut self) -> Result<(), HookError> {
        let Some(raw) = self.hook.take() else {
            return Ok(());
        };

        let result = unsafe { UnhookWindowsHookEx(HHOOK(raw as _)) };
        SINK.with(|slot| slot.borrow_mut().take());
        result.map_err(|e| HookError::Unregister(e.to_string()))
    }

    fn wait(&mut self) -> Wake {
        let mut msg = MSG::default();
        let ret = unsafe { GetMessageW(&mut msg, HWND::default(), 0, 0) };
        if ret.0 <= 0 {
            debug!("GetMessageW returned {}, leaving pump loop", ret.0);
            return Wake::Quit;
        }
        if msg.message == WM_USER {
            Wake::Control
        } else {
            Wake::Other
        }
    }
}

impl Drop for Win32Platform {
    fn drop(&mut self) {
        if let Err(e) = self.uninstall() {
            warn!("Failed to remove WH_MOUSE_LL on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_table() {
        assert_eq!(action_for(WM_MOUSEMOVE), MouseAction::Move);
        assert_eq!(action_for(WM_LBUTTONDOWN), MouseAction::Down(RawButton::Left));
        assert_eq!(action_for(WM_RBUTTONUP), MouseAction::Up(RawButton::Right));
        assert_eq!(action_for(WM_MBUTTONDOWN), MouseAction::Down(RawButton::Middle));
        assert_eq!(action_for(WM_XBUTTONUP), MouseAction::Up(RawButton::X));
        assert_eq!(action_for(WM_MOUSEWHEEL), MouseAction::WheelVertical);
        assert_eq!(action_for(WM_MOUSEHWHEEL), MouseAction::WheelHorizontal);
        assert_eq!(action_for(0x0203), MouseAction::Other(0x0203));
    }
}
