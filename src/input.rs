//! Output commands and the sinks that deliver them
//!
//! The engine's only effect on the outside world is a stream of
//! [`OutputCommand`]s handed to an [`InputSink`]. Delivery is best-effort:
//! a failed command is logged and never retried.
//!
//! - [`EnigoSink`]: real OS input through enigo (feature `inject`)
//! - [`LogSink`]: dry run, logs every command
//! - [`RecordingSink`]: collects commands in memory

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Tab,
    Enter,
    Space,
    Escape,
    Backspace,
    Alt,
    Control,
    Shift,
    Meta,
    Char(char),
}

impl Key {
    pub fn is_modifier(&self) -> bool {
        matches!(self, Key::Alt | Key::Control | Key::Shift | Key::Meta)
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let key = match lower.as_str() {
            "left" => Key::Left,
            "right" => Key::Right,
            "up" => Key::Up,
            "down" => Key::Down,
            "tab" => Key::Tab,
            "enter" | "return" => Key::Enter,
            "space" => Key::Space,
            "esc" | "escape" => Key::Escape,
            "backspace" => Key::Backspace,
            "alt" | "option" => Key::Alt,
            "ctrl" | "control" => Key::Control,
            "shift" => Key::Shift,
            "meta" | "cmd" | "super" | "win" => Key::Meta,
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => return Err(format!("unknown key '{}'", s)),
                }
            }
        };
        Ok(key)
    }
}

impl TryFrom<String> for Key {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Left => write!(f, "Left"),
            Key::Right => write!(f, "Right"),
            Key::Up => write!(f, "Up"),
            Key::Down => write!(f, "Down"),
            Key::Tab => write!(f, "Tab"),
            Key::Enter => write!(f, "Enter"),
            Key::Space => write!(f, "Space"),
            Key::Escape => write!(f, "Esc"),
            Key::Backspace => write!(f, "Backspace"),
            Key::Alt => write!(f, "Alt"),
            Key::Control => write!(f, "Ctrl"),
            Key::Shift => write!(f, "Shift"),
            Key::Meta => write!(f, "Meta"),
            Key::Char(c) => write!(f, "{}", c),
        }
    }
}

/// Parse a combo such as "ctrl+shift+t" into (modifiers, key)
pub fn parse_combo(combo: &str) -> Result<(Vec<Key>, Key), String> {
    let mut keys = combo
        .split('+')
        .filter(|part| !part.trim().is_empty())
        .map(Key::from_str)
        .collect::<Result<Vec<_>, _>>()?;
    let key = keys
        .pop()
        .ok_or_else(|| format!("empty key combo '{}'", combo))?;
    if let Some(held) = keys.iter().find(|k| !k.is_modifier()) {
        return Err(format!("'{}' in '{}' is not a modifier", held, combo));
    }
    Ok((keys, key))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputCommand {
    KeyTap(Key),
    KeyHold(Key),
    KeyRelease(Key),
    MouseMoveAbsolute { x: i32, y: i32 },
    MouseClick(MouseButton),
    /// Positive dy scrolls down, positive dx scrolls right
    MouseScroll { dx: i32, dy: i32 },
}

impl OutputCommand {
    /// Hold modifiers, tap the key, release modifiers in reverse order
    pub fn combo(modifiers: &[Key], key: Key) -> Vec<OutputCommand> {
        let mut commands = Vec::with_capacity(modifiers.len() * 2 + 1);
        commands.extend(modifiers.iter().map(|m| OutputCommand::KeyHold(*m)));
        commands.push(OutputCommand::KeyTap(key));
        commands.extend(modifiers.iter().rev().map(|m| OutputCommand::KeyRelease(*m)));
        commands
    }

    /// One tap per character
    pub fn text(text: &str) -> Vec<OutputCommand> {
        text.chars()
            .map(|c| match c {
                ' ' => OutputCommand::KeyTap(Key::Space),
                '\n' => OutputCommand::KeyTap(Key::Enter),
                c => OutputCommand::KeyTap(Key::Char(c)),
            })
            .collect()
    }
}

impl fmt::Display for OutputCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputCommand::KeyTap(k) => write!(f, "tap {}", k),
            OutputCommand::KeyHold(k) => write!(f, "hold {}", k),
            OutputCommand::KeyRelease(k) => write!(f, "release {}", k),
            OutputCommand::MouseMoveAbsolute { x, y } => write!(f, "move {},{}", x, y),
            OutputCommand::MouseClick(b) => write!(f, "click {:?}", b),
            OutputCommand::MouseScroll { dx, dy } => write!(f, "scroll {},{}", dx, dy),
        }
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Error type for input delivery
#[derive(Debug)]
pub enum InputError {
    Init(String),
    Delivery(String),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Init(msg) => write!(f, "Input init error: {}", msg),
            InputError::Delivery(msg) => write!(f, "Input delivery error: {}", msg),
        }
    }
}

impl std::error::Error for InputError {}

/// Synchronous, fire-and-forget executor of output commands
pub trait InputSink {
    fn execute(&mut self, command: &OutputCommand) -> Result<(), InputError>;

    /// Primary screen size in pixels, when the sink can tell
    fn screen_size(&mut self) -> Option<(u32, u32)> {
        None
    }

    /// Current pointer position in screen pixels, when the sink can tell
    fn cursor_position(&mut self) -> Option<(i32, i32)> {
        None
    }
}

/// Deliver one command, logging instead of propagating failures
pub fn emit(sink: &mut dyn InputSink, command: OutputCommand) {
    if let Err(e) = sink.execute(&command) {
        warn!(%command, "dropped output command: {}", e);
    }
}

pub fn emit_all(sink: &mut dyn InputSink, commands: impl IntoIterator<Item = OutputCommand>) {
    for command in commands {
        emit(sink, command);
    }
}

/// Dry-run sink
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl InputSink for LogSink {
    fn execute(&mut self, command: &OutputCommand) -> Result<(), InputError> {
        info!(target: "handpilot::output", "{}", command);
        Ok(())
    }
}

/// Collects commands in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub commands: Vec<OutputCommand>,
    screen: Option<(u32, u32)>,
    /// Follows absolute moves once set
    cursor: Option<(i32, i32)>,
    failing: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_screen(mut self, width: u32, height: u32) -> Self {
        self.screen = Some((width, height));
        self
    }

    pub fn with_cursor(mut self, x: i32, y: i32) -> Self {
        self.cursor = Some((x, y));
        self
    }

    /// Every command is recorded, then reported as failed
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn take(&mut self) -> Vec<OutputCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn count(&self, pred: impl Fn(&OutputCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }
}

impl InputSink for RecordingSink {
    fn execute(&mut self, command: &OutputCommand) -> Result<(), InputError> {
        self.commands.push(command.clone());
        if let (Some(cursor), OutputCommand::MouseMoveAbsolute { x, y }) = (&mut self.cursor, command)
        {
            *cursor = (*x, *y);
        }
        if self.failing {
            return Err(InputError::Delivery("recording sink set to fail".to_string()));
        }
        Ok(())
    }

    fn screen_size(&mut self) -> Option<(u32, u32)> {
        self.screen
    }

    fn cursor_position(&mut self) -> Option<(i32, i32)> {
        self.cursor
    }
}

// ============================================================================
// enigo
// ============================================================================

#[cfg(feature = "inject")]
pub use self::os::EnigoSink;

#[cfg(feature = "inject")]
mod os {
    use super::{InputError, InputSink, Key, MouseButton, OutputCommand};
    use enigo::{Axis, Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};

    /// OS keyboard/mouse injection using enigo
    pub struct EnigoSink {
        enigo: Enigo,
    }

    impl EnigoSink {
        pub fn new() -> Result<Self, InputError> {
            let enigo = Enigo::new(&Settings::default())
                .map_err(|e| InputError::Init(format!("Failed to initialize Enigo: {}", e)))?;
            Ok(Self { enigo })
        }

        fn key(&mut self, key: Key, direction: Direction) -> Result<(), InputError> {
            self.enigo
                .key(to_enigo_key(key), direction)
                .map_err(|e| InputError::Delivery(format!("Failed to send key {}: {}", key, e)))
        }
    }

    impl InputSink for EnigoSink {
        fn execute(&mut self, command: &OutputCommand) -> Result<(), InputError> {
            match *command {
                OutputCommand::KeyTap(key) => self.key(key, Direction::Click),
                OutputCommand::KeyHold(key) => self.key(key, Direction::Press),
                OutputCommand::KeyRelease(key) => self.key(key, Direction::Release),
                OutputCommand::MouseMoveAbsolute { x, y } => self
                    .enigo
                    .move_mouse(x, y, Coordinate::Abs)
                    .map_err(|e| InputError::Delivery(format!("Failed to move mouse: {}", e))),
                OutputCommand::MouseClick(button) => {
                    let button = match button {
                        MouseButton::Left => Button::Left,
                        MouseButton::Right => Button::Right,
                        MouseButton::Middle => Button::Middle,
                    };
                    self.enigo
                        .button(button, Direction::Click)
                        .map_err(|e| InputError::Delivery(format!("Failed to click: {}", e)))
                }
                OutputCommand::MouseScroll { dx, dy } => {
                    if dy != 0 {
                        self.enigo
                            .scroll(dy, Axis::Vertical)
                            .map_err(|e| InputError::Delivery(format!("Failed to scroll: {}", e)))?;
                    }
                    if dx != 0 {
                        self.enigo
                            .scroll(dx, Axis::Horizontal)
                            .map_err(|e| InputError::Delivery(format!("Failed to scroll: {}", e)))?;
                    }
                    Ok(())
                }
            }
        }

        fn screen_size(&mut self) -> Option<(u32, u32)> {
            let (w, h) = self.enigo.main_display().ok()?;
            if w <= 0 || h <= 0 {
                return None;
            }
            Some((w as u32, h as u32))
        }

        fn cursor_position(&mut self) -> Option<(i32, i32)> {
            self.enigo.location().ok()
        }
    }

    fn to_enigo_key(key: Key) -> enigo::Key {
        match key {
            Key::Left => enigo::Key::LeftArrow,
            Key::Right => enigo::Key::RightArrow,
            Key::Up => enigo::Key::UpArrow,
            Key::Down => enigo::Key::DownArrow,
            Key::Tab => enigo::Key::Tab,
            Key::Enter => enigo::Key::Return,
            Key::Space => enigo::Key::Space,
            Key::Escape => enigo::Key::Escape,
            Key::Backspace => enigo::Key::Backspace,
            Key::Alt => enigo::Key::Alt,
            Key::Control => enigo::Key::Control,
            Key::Shift => enigo::Key::Shift,
            Key::Meta => enigo::Key::Meta,
            Key::Char(c) => enigo::Key::Unicode(c),
        }
    }
}
