//! Labelled single line text field.

use tui_realm_stdlib::{Input, Label};
use tuirealm::{
    command::{Cmd, Direction, Position},
    event::{Key, KeyEvent, KeyModifiers},
    props::{BorderSides, Borders, Color, Style, TextModifiers},
    tui::prelude::{Constraint, Direction as LayoutDirection, Layout, Rect},
    AttrValue, Attribute, Frame, MockComponent,
};

const LABEL_WIDTH: u16 = 12;

/// Values are kept as typed, the backend validates them.
pub(crate) struct FormField {
    label: &'static str,
    input: Input,
    focused: bool,
}

impl FormField {
    /// Field pre-filled with `draft`, the text typed the last time.
    pub(crate) fn new(label: &'static str, placeholder: &'static str, draft: &str) -> Self {
        let mut input = Input::default()
            .borders(Borders::default().sides(BorderSides::NONE))
            .placeholder(placeholder, Style::default().fg(Color::Gray))
            .value(draft);
        input.perform(Cmd::GoTo(Position::End));

        FormField {
            label,
            input,
            focused: false,
        }
    }

    pub(crate) fn value(&self) -> String {
        self.input
            .state()
            .unwrap_one()
            .unwrap_string()
            .trim()
            .to_owned()
    }

    pub(crate) fn set_focus(&mut self, focused: bool) {
        self.focused = focused;
        self.input.attr(Attribute::Focus, AttrValue::Flag(focused));
    }

    /// Applies an editing key, returning whether the field changed.
    pub(crate) fn edit(&mut self, key: KeyEvent) -> bool {
        let cmd = match key {
            KeyEvent {
                code: Key::Char(c),
                modifiers: KeyModifiers::NONE | KeyModifiers::SHIFT,
            } => Cmd::Type(c),
            KeyEvent {
                code: Key::Left, ..
            } => Cmd::Move(Direction::Left),
            KeyEvent {
                code: Key::Right, ..
            } => Cmd::Move(Direction::Right),
            KeyEvent { code: Key::Home, .. } => Cmd::GoTo(Position::Begin),
            KeyEvent { code: Key::End, .. } => Cmd::GoTo(Position::End),
            KeyEvent {
                code: Key::Backspace,
                ..
            } => Cmd::Delete,
            _ => return false,
        };
        self.input.perform(cmd);
        true
    }

    pub(crate) fn view(&mut self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(LayoutDirection::Horizontal)
            .constraints([Constraint::Length(LABEL_WIDTH), Constraint::Min(1)].as_ref())
            .split(area);

        let mut label = Label::default().text(self.label);
        if self.focused {
            label = label.modifiers(TextModifiers::BOLD);
        }
        label.view(frame, columns[0]);
        self.input.view(frame, columns[1]);
    }
}
