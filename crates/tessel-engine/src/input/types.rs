/// Mouse button identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ButtonState {
    Pressed,
    Released,
}

/// Keys the runtime reports. Everything else arrives as `Other` with the
/// platform key code.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Other(u32),
}

/// Platform-agnostic input events emitted by the runtime.
///
/// Positions are physical pixels with the origin at the top-left corner of the
/// drawable area.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerMoved { x: f32, y: f32 },

    /// Pointer left the window surface.
    PointerLeft,

    PointerButton {
        button: MouseButton,
        state: ButtonState,
    },

    Key {
        key: Key,
        state: ButtonState,
        repeat: bool,
    },

    Focused(bool),

    /// The user asked to close the window.
    CloseRequested,
}
