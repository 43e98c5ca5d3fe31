// Platform-neutral input events delivered to the viewer

/// Keys the viewer reacts to; everything else arrives as `Other`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    F11,
    Left,
    Right,
    Char(char),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// The window was asked to close
    Quit,
    KeyPress { key: Key, modifiers: Modifiers },
    PointerPress { x: f64, y: f64, button: PointerButton },
    PointerRelease { x: f64, y: f64, button: PointerButton },
    PointerMove { x: f64, y: f64 },
    Resized { width: u32, height: u32 },
    /// The compositor entered or left fullscreen, whoever asked for it
    FullscreenChanged { fullscreen: bool },
    /// The window content must be repainted without any state change
    Exposed,
}

impl InputEvent {
    /// Whether this event can change what is on screen
    pub fn affects_display(&self) -> bool {
        !matches!(self, InputEvent::Quit)
    }
}

/// Window operations the viewer asks the platform for
pub trait WindowControl {
    fn set_fullscreen(&mut self, fullscreen: bool);
    fn minimize(&mut self);
    fn set_title(&mut self, title: &str);
}
