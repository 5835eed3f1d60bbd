//! IPC message types for the JSON-line protocol on stdin/stdout.
//!
//! Events go out as `{"event": "...", "data": {...}}`; commands come in as
//! `{"command": "..."}` or as a bare command word.

pub mod bridge;

use serde::{Deserialize, Serialize};

use mouse_hook::{BridgeStats, MouseEvent, MouseHook};

/// Events emitted to stdout.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    Starting {},
    Ready { capture_move: bool, running: bool },
    Mouse(MouseEvent),
    /// `posted` is whether the pump was woken to apply the request.
    Paused { posted: bool },
    Resumed { posted: bool },
    MoveCapture { enabled: bool },
    Status(HookStatus),
    Pong {},
    Error { message: String },
    Stopping {},
}

/// Snapshot reported by the `status` command.
#[derive(Debug, Clone, Serialize)]
pub struct HookStatus {
    pub lifecycle: String,
    pub running_requested: bool,
    pub capture_move: bool,
    pub pump_alive: bool,
    pub fault: Option<String>,
    pub stats: BridgeStats,
}

impl HookStatus {
    pub fn of(hook: &MouseHook) -> Self {
        Self {
            lifecycle: hook.lifecycle().to_string(),
            running_requested: hook.is_running_requested(),
            capture_move: hook.is_capturing_moves(),
            pump_alive: hook.is_pump_alive(),
            fault: hook.fault().map(|e| e.to_string()),
            stats: hook.stats(),
        }
    }
}

/// Commands read from stdin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command")]
#[serde(rename_all = "snake_case")]
pub enum HookCommand {
    Pause {},
    Resume {},
    EnableMove {},
    DisableMove {},
    Status {},
    Ping {},
    Stop {},
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mouse_event_is_nested_under_data() {
        let event = HookEvent::Mouse(MouseEvent::Wheel {
            x: 5,
            y: 6,
            delta: -1.0,
            axis: 0,
        });
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "mouse",
                "data": {"type": "mousewheel", "x": 5, "y": 6, "delta": -1.0, "axis": 0}
            })
        );
    }

    #[test]
    fn lifecycle_events_use_snake_case() {
        assert_eq!(
            serde_json::to_value(HookEvent::MoveCapture { enabled: true }).unwrap(),
            json!({"event": "move_capture", "data": {"enabled": true}})
        );
        assert_eq!(
            serde_json::to_value(HookEvent::Paused { posted: false }).unwrap(),
            json!({"event": "paused", "data": {"posted": false}})
        );
        assert_eq!(
            serde_json::to_value(HookEvent::Pong {}).unwrap(),
            json!({"event": "pong", "data": {}})
        );
    }

    #[test]
    fn commands_deserialize() {
        let cmd: HookCommand = serde_json::from_str(r#"{"command": "enable_move"}"#).unwrap();
        assert_eq!(cmd, HookCommand::EnableMove {});
        let cmd: HookCommand = serde_json::from_str(r#"{"command": "stop"}"#).unwrap();
        assert_eq!(cmd, HookCommand::Stop {});
        assert!(serde_json::from_str::<HookCommand>(r#"{"command": "jump"}"#).is_err());
    }
}
