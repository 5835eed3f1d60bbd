//! stdin command reader and stdout event emitter.

use std::io::{self, BufRead, Write};

use tokio::sync::mpsc;
use tracing::{debug, error};

use super::{HookCommand, HookEvent};

/// Emit a `HookEvent` as a JSON line on stdout and flush.
pub fn emit_event(event: &HookEvent) {
    let json = match serde_json::to_string(event) {
        Ok(j) => j,
        Err(e) => {
            error!("Failed to serialize event: {}", e);
            return;
        }
    };
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    // The reading side may already be gone.
    let _ = writeln!(handle, "{}", json);
    let _ = handle.flush();
}

pub fn emit_error(message: &str) {
    emit_event(&HookEvent::Error {
        message: message.to_string(),
    });
}

/// Turn a bare command word into `{"command": word}`; JSON passes through.
fn normalize_command_line(input: &str) -> String {
    if input.starts_with('{') {
        return input.to_string();
    }
    serde_json::json!({ "command": input.to_ascii_lowercase() }).to_string()
}

/// Spawn a blocking thread that parses stdin lines into `HookCommand`s.
///
/// The channel closes when stdin reaches EOF or fails.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<HookCommand> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let text = match line {
                Ok(text) => text,
                Err(e) => {
                    error!("stdin read error: {}", e);
                    break;
                }
            };
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<HookCommand>(&normalize_command_line(trimmed)) {
                Ok(cmd) => {
                    debug!(?cmd, "Received command");
                    if tx.send(cmd).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Invalid command: {} (input: {})", e, trimmed);
                    emit_error(&format!("Invalid command: {}", e));
                }
            }
        }
        debug!("stdin reader thread exiting");
    });

    rx
}
