//! Raw notifications and the classifier that turns them into events.
//!
//! The classifier runs inside the OS hook callback, so it is a pure
//! function over a copied record: no allocation, no locks, no I/O.

/// Physical button named by a raw button transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawButton {
    Left,
    Right,
    Middle,
    /// XBUTTON1/XBUTTON2. Which one is carried in the high word of `aux`.
    X,
}

/// OS action code of a raw notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseAction {
    Move,
    Down(RawButton),
    Up(RawButton),
    WheelVertical,
    WheelHorizontal,
    /// Any other message code the OS delivers through the hook.
    Other(u32),
}

/// One mouse action copied out of the OS record.
///
/// Only valid for the duration of the hook callback in spirit: backends
/// build it from OS-owned memory and hand it to the sink by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawNotification {
    /// OS pre-filter code. Negative means the hook must only pass the
    /// notification on.
    pub hook_code: i32,
    pub action: MouseAction,
    pub x: i32,
    pub y: i32,
    /// Wheel delta or extended button identifier, high word. Passed through
    /// uninterpreted.
    pub aux: u32,
}

impl RawNotification {
    pub fn new(action: MouseAction, x: i32, y: i32, aux: u32) -> Self {
        Self {
            hook_code: 0,
            action,
            x,
            y,
            aux,
        }
    }
}

/// Kind of a classified event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Move,
    Down,
    Up,
    Wheel,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [Self::Move, Self::Down, Self::Up, Self::Wheel];

    /// Name handed to the listener.
    pub fn name(self) -> &'static str {
        match self {
            Self::Move => "mousemove",
            Self::Down => "mousedown",
            Self::Up => "mouseup",
            Self::Wheel => "mousewheel",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "mousemove" => Some(Self::Move),
            "mousedown" => Some(Self::Down),
            "mouseup" => Some(Self::Up),
            "mousewheel" => Some(Self::Wheel),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Button field of a classified event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    None,
    WheelVertical,
    WheelHorizontal,
    Primary,
    Secondary,
    Middle,
    /// Extended button; identified only through `aux`.
    Extended,
}

impl Button {
    /// Integer handed to the listener.
    ///
    /// Vertical wheel maps to 0 and horizontal wheel to 1, which collides
    /// with `Primary`. Consumers depend on these values, so they stay.
    pub fn code(self) -> i32 {
        match self {
            Self::None | Self::Extended => -1,
            Self::WheelVertical => 0,
            Self::WheelHorizontal => 1,
            Self::Primary => 1,
            Self::Secondary => 2,
            Self::Middle => 3,
        }
    }
}

/// Semantic event ready to cross into the consumer's context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedEvent {
    pub kind: EventKind,
    pub x: i32,
    pub y: i32,
    pub button: Button,
    pub aux: u32,
}

impl ClassifiedEvent {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn button_code(&self) -> i32 {
        self.button.code()
    }
}

/// Map a raw notification to an event, or `None` when it is filtered out.
///
/// Moves only pass while `capture_move` is set. Unknown action codes and
/// negative hook codes are dropped without error.
pub fn classify(raw: &RawNotification, capture_move: bool) -> Option<ClassifiedEvent> {
    if raw.hook_code < 0 {
        return None;
    }

    let (kind, button) = match raw.action {
        MouseAction::Move => {
            if !capture_move {
                return None;
            }
            (EventKind::Move, Button::None)
        }
        MouseAction::Down(b) => (EventKind::Down, button_for(b)),
        MouseAction::Up(b) => (EventKind::Up, button_for(b)),
        MouseAction::WheelVertical => (EventKind::Wheel, Button::WheelVertical),
        MouseAction::WheelHorizontal => (EventKind::Wheel, Button::WheelHorizontal),
        MouseAction::Other(_) => return None,
    };

    Some(ClassifiedEvent {
        kind,
        x: raw.x,
        y: raw.y,
        button,
        aux: raw.aux,
    })
}

fn button_for(button: RawButton) -> Button {
    match button {
        RawButton::Left => Button::Primary,
        RawButton::Right => Button::Secondary,
        RawButton::Middle => Button::Middle,
        RawButton::X => Button::Extended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(action: MouseAction) -> RawNotification {
        RawNotification::new(action, 100, 200, 0)
    }

    #[test]
    fn moves_follow_capture_mode() {
        assert_eq!(classify(&raw(MouseAction::Move), false), None);

        let ev = classify(&raw(MouseAction::Move), true).unwrap();
        assert_eq!(ev.kind, EventKind::Move);
        assert_eq!(ev.button_code(), -1);
        assert_eq!((ev.x, ev.y), (100, 200));
    }

    #[test]
    fn buttons_map_to_fixed_codes() {
        let cases = [
            (RawButton::Left, 1),
            (RawButton::Right, 2),
            (RawButton::Middle, 3),
        ];
        for (button, code) in cases {
            for capture in [false, true] {
                let down = classify(&raw(MouseAction::Down(button)), capture).unwrap();
                assert_eq!(down.name(), "mousedown");
                assert_eq!(down.button_code(), code);

                let up = classify(&raw(MouseAction::Up(button)), capture).unwrap();
                assert_eq!(up.name(), "mouseup");
                assert_eq!(up.button_code(), code);
            }
        }
    }

    #[test]
    fn extended_buttons_keep_aux() {
        let n = RawNotification::new(MouseAction::Down(RawButton::X), 1, 2, 0x0002_0000);
        let ev = classify(&n, false).unwrap();
        assert_eq!(ev.kind, EventKind::Down);
        assert_eq!(ev.button, Button::Extended);
        assert_eq!(ev.button_code(), -1);
        assert_eq!(ev.aux, 0x0002_0000);
    }

    #[test]
    fn wheel_axis_codes_are_asymmetric() {
        let v = classify(&raw(MouseAction::WheelVertical), false).unwrap();
        assert_eq!(v.name(), "mousewheel");
        assert_eq!(v.button_code(), 0);

        let h = classify(&raw(MouseAction::WheelHorizontal), false).unwrap();
        assert_eq!(h.name(), "mousewheel");
        assert_eq!(h.button_code(), 1);
    }

    #[test]
    fn unknown_and_negative_codes_are_dropped() {
        assert_eq!(classify(&raw(MouseAction::Other(0x020E)), true), None);

        let mut n = raw(MouseAction::Down(RawButton::Left));
        n.hook_code = -1;
        assert_eq!(classify(&n, true), None);
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EventKind::from_name("keydown"), None);
    }
}
