//! Titled text panel.

use tui_realm_stdlib::Textarea;
use tuirealm::{
    command::{Cmd, Direction},
    props::{Alignment, Borders, Color, TextSpan},
    tui::prelude::Rect,
    Frame, MockComponent,
};

pub(crate) struct Panel {
    textarea: Textarea,
    scrollable: bool,
}

impl Panel {
    pub(crate) fn new(title: &str, text: &str) -> Self {
        let rows: Vec<TextSpan> = text.lines().map(TextSpan::new).collect();
        Panel {
            textarea: Textarea::default()
                .borders(Borders::default())
                .title(title, Alignment::Left)
                .text_rows(&rows),
            scrollable: false,
        }
    }

    pub(crate) fn scrollable(mut self) -> Self {
        self.textarea = self.textarea.highlighted_str(">");
        self.scrollable = true;
        self
    }

    /// Drawn in a warning color, for text that may be outdated.
    pub(crate) fn stale(mut self) -> Self {
        self.textarea = self.textarea.foreground(Color::Yellow);
        self
    }

    /// Returns whether the panel moved.
    pub(crate) fn scroll(&mut self, direction: Direction) -> bool {
        if self.scrollable {
            self.textarea.perform(Cmd::Scroll(direction));
        }
        self.scrollable
    }

    pub(crate) fn view(&mut self, frame: &mut Frame, area: Rect) {
        self.textarea.view(frame, area)
    }
}
