//! Modal state machine for vim-style input handling.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::commands::{Command, Direction, Mode, SourceMode};

/// Handles keyboard input and converts to commands.
pub struct InputHandler {
    mode: Mode,
    command_buffer: String,
    /// The source whose trim / monitor adjustments keypresses apply to.
    focused_source: SourceMode,
}

const FOCUS_RING: [SourceMode; 3] = [SourceMode::CaptureA, SourceMode::CaptureB, SourceMode::Generator];

fn cycle_focus(current: SourceMode) -> SourceMode {
    let i = FOCUS_RING.iter().position(|&m| m == current).unwrap_or(0);
    FOCUS_RING[(i + 1) % FOCUS_RING.len()]
}

impl InputHandler {
    pub fn new() -> Self {
        Self {
            mode: Mode::Normal,
            command_buffer: String::new(),
            focused_source: SourceMode::CaptureA,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn command_buffer(&self) -> &str {
        &self.command_buffer
    }

    pub fn focused_source(&self) -> SourceMode {
        self.focused_source
    }

    pub fn set_focused_source(&mut self, mode: SourceMode) {
        self.focused_source = mode;
    }

    /// Handle a key event and return a command if applicable.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Command> {
        if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Command::Quit);
        }
        match self.mode {
            Mode::Normal => self.handle_normal_mode(key),
            Mode::Command => self.handle_command_mode(key),
            Mode::Help => self.handle_help_mode(key),
        }
    }

    fn handle_normal_mode(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Char(':') => {
                self.mode = Mode::Command;
                self.command_buffer.clear();
                Some(Command::EnterCommandMode)
            }
            KeyCode::Char('?') => {
                self.mode = Mode::Help;
                Some(Command::ToggleHelp)
            }
            KeyCode::Esc => Some(Command::Cancel),

            KeyCode::Tab => {
                self.focused_source = cycle_focus(self.focused_source);
                Some(Command::CycleFocus)
            }

            // Direct source switching
            KeyCode::Char('1') => Some(Command::SwitchSource(SourceMode::CaptureA)),
            KeyCode::Char('2') => Some(Command::SwitchSource(SourceMode::CaptureB)),
            KeyCode::Char('3') => Some(Command::SwitchSource(SourceMode::Generator)),
            KeyCode::Char('4') => Some(Command::SwitchSource(SourceMode::Remote)),
            KeyCode::Char('n') => Some(Command::CycleSource(Direction::Forward)),
            KeyCode::Char('N') => Some(Command::CycleSource(Direction::Backward)),

            // Generator selection
            KeyCode::Char('g') => Some(Command::CycleGeneratorKind(Direction::Forward)),
            KeyCode::Char('G') => Some(Command::CycleGeneratorKind(Direction::Backward)),
            KeyCode::Char('r') => Some(Command::CycleRouting),
            KeyCode::Char('p') => Some(Command::ToggleStereoIdPulse),
            KeyCode::Char('<') => Some(Command::AdjustGeneratorFreq(-10.0)),
            KeyCode::Char('>') => Some(Command::AdjustGeneratorFreq(10.0)),
            KeyCode::Char(',') => Some(Command::AdjustGeneratorLevel(-1.0)),
            KeyCode::Char('.') => Some(Command::AdjustGeneratorLevel(1.0)),

            // Trim / monitor, scoped to the focused source
            KeyCode::Char('[') => Some(Command::AdjustTrim(self.focused_source, -0.5)),
            KeyCode::Char(']') => Some(Command::AdjustTrim(self.focused_source, 0.5)),
            KeyCode::Char('-') => Some(Command::AdjustMonitorGain(self.focused_source, -0.05)),
            KeyCode::Char('=') => Some(Command::AdjustMonitorGain(self.focused_source, 0.05)),
            KeyCode::Char('m') => Some(Command::ToggleMonitorMute(self.focused_source)),

            // Process-wide settings
            KeyCode::Char('t') => Some(Command::AdjustTargetLufs(-0.5)),
            KeyCode::Char('T') => Some(Command::AdjustTargetLufs(0.5)),
            KeyCode::Char('l') => Some(Command::AdjustTruePeakLimit(-0.5)),
            KeyCode::Char('L') => Some(Command::AdjustTruePeakLimit(0.5)),
            KeyCode::Char('w') => Some(Command::AdjustRadarWindow(-5.0)),
            KeyCode::Char('W') => Some(Command::AdjustRadarWindow(5.0)),

            KeyCode::Char('R') => Some(Command::ResetMeters),

            _ => None,
        }
    }

    fn handle_command_mode(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                let buffer = std::mem::take(&mut self.command_buffer);
                Some(Command::ExecuteCommand(buffer))
            }
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.command_buffer.clear();
                Some(Command::EnterNormalMode)
            }
            KeyCode::Backspace => {
                self.command_buffer.pop();
                if self.command_buffer.is_empty() {
                    self.mode = Mode::Normal;
                    Some(Command::EnterNormalMode)
                } else {
                    None
                }
            }
            KeyCode::Char(c) => {
                self.command_buffer.push(c);
                None
            }
            _ => None,
        }
    }

    fn handle_help_mode(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
                self.mode = Mode::Normal;
                Some(Command::ToggleHelp)
            }
            KeyCode::Char('j') | KeyCode::Down => Some(Command::HelpScrollDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Command::HelpScrollUp),
            _ => None,
        }
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn colon_enters_command_mode() {
        let mut handler = InputHandler::new();
        let cmd = handler.handle_key(key(KeyCode::Char(':')));
        assert!(matches!(cmd, Some(Command::EnterCommandMode)));
        assert_eq!(handler.mode(), Mode::Command);
    }

    #[test]
    fn tab_cycles_focused_source() {
        let mut handler = InputHandler::new();
        assert_eq!(handler.focused_source(), SourceMode::CaptureA);
        handler.handle_key(key(KeyCode::Tab));
        assert_eq!(handler.focused_source(), SourceMode::CaptureB);
        handler.handle_key(key(KeyCode::Tab));
        assert_eq!(handler.focused_source(), SourceMode::Generator);
        handler.handle_key(key(KeyCode::Tab));
        assert_eq!(handler.focused_source(), SourceMode::CaptureA);
    }

    #[test]
    fn trim_adjustment_targets_focused_source() {
        let mut handler = InputHandler::new();
        handler.set_focused_source(SourceMode::CaptureB);
        let cmd = handler.handle_key(key(KeyCode::Char('[')));
        assert!(matches!(cmd, Some(Command::AdjustTrim(SourceMode::CaptureB, v)) if v == -0.5));
    }

    #[test]
    fn command_mode_builds_buffer_and_executes_on_enter() {
        let mut handler = InputHandler::new();
        handler.handle_key(key(KeyCode::Char(':')));
        handler.handle_key(key(KeyCode::Char('q')));
        handler.handle_key(key(KeyCode::Char('u')));
        handler.handle_key(key(KeyCode::Char('i')));
        handler.handle_key(key(KeyCode::Char('t')));
        let cmd = handler.handle_key(key(KeyCode::Enter));
        assert!(matches!(cmd, Some(Command::ExecuteCommand(ref s)) if s == "quit"));
        assert_eq!(handler.mode(), Mode::Normal);
    }

    #[test]
    fn ctrl_q_quits_from_any_mode() {
        let mut handler = InputHandler::new();
        handler.handle_key(key(KeyCode::Char(':')));
        let cmd = handler.handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL));
        assert!(matches!(cmd, Some(Command::Quit)));
    }

    #[test]
    fn help_mode_toggles_back_to_normal() {
        let mut handler = InputHandler::new();
        handler.handle_key(key(KeyCode::Char('?')));
        assert_eq!(handler.mode(), Mode::Help);
        let cmd = handler.handle_key(key(KeyCode::Esc));
        assert!(matches!(cmd, Some(Command::ToggleHelp)));
        assert_eq!(handler.mode(), Mode::Normal);
    }
}
