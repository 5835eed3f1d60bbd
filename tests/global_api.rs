use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use mouse_hook::global;
use mouse_hook::{HookError, HookLifecycle, MouseAction, RawNotification, Simulated};

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

// The process hook is a singleton, so the whole lifecycle runs in one test.
#[test]
fn process_hook_lifecycle() {
    assert!(!global::pause_mouse_events());
    assert!(!global::resume_mouse_events());
    assert!(!global::shutdown_mouse_hook());
    assert!(global::mouse_hook().is_none());
    assert!(global::lifecycle().is_none());

    // Requested before creation; applies to the hook once it exists.
    global::enable_mouse_move();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let (platform, os) = Simulated::new();
    let mut dispatcher = global::create_mouse_hook_on(
        platform,
        move |name: &str, x: i32, y: i32, button: i32, aux: u32| {
            sink.lock().unwrap().push((name.to_string(), x, y, button, aux));
        },
    )
    .unwrap();

    assert!(global::mouse_hook().unwrap().is_capturing_moves());

    let (second, _os) = Simulated::new();
    let again = global::create_mouse_hook_on(second, |_: &str, _: i32, _: i32, _: i32, _: u32| {});
    assert!(matches!(again, Err(HookError::AlreadyCreated)));

    assert!(wait_until(|| global::lifecycle() == Some(HookLifecycle::Installed)));
    os.emit(RawNotification::new(MouseAction::Move, 3, 4, 0));
    assert!(wait_until(|| {
        dispatcher.dispatch_pending();
        !seen.lock().unwrap().is_empty()
    }));
    assert_eq!(seen.lock().unwrap()[0], ("mousemove".to_string(), 3, 4, -1, 0));

    global::disable_mouse_move();
    assert!(!global::mouse_hook().unwrap().is_capturing_moves());

    assert!(global::pause_mouse_events());
    assert!(wait_until(|| global::lifecycle() == Some(HookLifecycle::Uninstalled)));
    assert!(global::resume_mouse_events());
    assert!(wait_until(|| os.is_installed()));

    // Toggles after creation still reach the hook.
    global::enable_mouse_move();
    assert!(global::mouse_hook().unwrap().is_capturing_moves());
    global::disable_mouse_move();

    assert!(global::shutdown_mouse_hook());
    assert!(!global::mouse_hook().unwrap().is_pump_alive());
    assert!(!os.is_installed());
    assert!(!dispatcher.dispatch_next_blocking());
    assert!(!global::shutdown_mouse_hook());
    assert!(!global::pause_mouse_events());
}
