//! mouse-hook host.
//!
//! Streams global mouse events as JSON lines on stdout and takes control
//! commands on stdin. Closing stdin stops the host.

mod config;
mod ipc;
mod logger;

use anyhow::{bail, Result};
use tracing::{info, warn};

use mouse_hook::{platform, HookError, MouseEvent, MouseHook};

use config::{read_hook_config, HookConfig};
use ipc::bridge::{emit_error, emit_event, spawn_stdin_reader};
use ipc::{HookCommand, HookEvent, HookStatus};

#[tokio::main]
async fn main() -> Result<()> {
    let (hook_config, config_error) = match read_hook_config() {
        Ok(config) => (config, None),
        Err(e) => (HookConfig::default(), Some(e)),
    };
    logger::init(hook_config.log_to_file)?;
    if let Some(e) = config_error {
        warn!("Ignoring hook config: {:#}", e);
    }
    info!(?hook_config, "Configuration loaded");

    emit_event(&HookEvent::Starting {});

    if !platform::has_native() {
        let message = HookError::Unsupported.to_string();
        emit_error(&message);
        bail!(message);
    }

    let listener = |name: &str, x: i32, y: i32, button: i32, aux: u32| {
        if let Some(event) = MouseEvent::decode(name, x, y, button, aux) {
            emit_event(&HookEvent::Mouse(event));
        }
    };
    let (hook, mut dispatcher) = match MouseHook::create_native(listener, hook_config.hook_options())
    {
        Ok(created) => created,
        Err(e) => {
            emit_error(&e.to_string());
            return Err(e.into());
        }
    };

    let mut cmd_rx = spawn_stdin_reader();

    emit_event(&HookEvent::Ready {
        capture_move: hook.is_capturing_moves(),
        running: hook.is_running_requested(),
    });
    info!("Mouse hook host ready");

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(command) => {
                        if !handle_command(command, &hook) {
                            break;
                        }
                    }
                    None => {
                        info!("stdin closed, shutting down");
                        break;
                    }
                }
            }
            delivered = dispatcher.dispatch_next() => {
                if !delivered && dispatcher.is_closed() {
                    break;
                }
            }
        }
    }

    let fault = hook.fault().map(|e| e.to_string());
    let stats = hook.stats();
    let exit = hook.shutdown();
    info!(?exit, ?stats, "Mouse hook host shutting down");

    if let Some(message) = fault {
        emit_error(&message);
        bail!(message);
    }
    Ok(())
}

/// Handle a single command.
/// Returns `false` if the main loop should exit.
fn handle_command(cmd: HookCommand, hook: &MouseHook) -> bool {
    match cmd {
        HookCommand::Ping {} => {
            emit_event(&HookEvent::Pong {});
        }

        HookCommand::Stop {} => {
            emit_event(&HookEvent::Stopping {});
            return false;
        }

        HookCommand::Pause {} => {
            let posted = hook.pause_mouse_events();
            emit_event(&HookEvent::Paused { posted });
        }

        HookCommand::Resume {} => {
            let posted = hook.resume_mouse_events();
            emit_event(&HookEvent::Resumed { posted });
        }

        HookCommand::EnableMove {} => {
            hook.enable_mouse_move();
            emit_event(&HookEvent::MoveCapture { enabled: true });
        }

        HookCommand::DisableMove {} => {
            hook.disable_mouse_move();
            emit_event(&HookEvent::MoveCapture { enabled: false });
        }

        HookCommand::Status {} => {
            emit_event(&HookEvent::Status(HookStatus::of(hook)));
        }
    }

    true
}
