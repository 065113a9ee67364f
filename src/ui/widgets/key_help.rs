//! Key bindings table shown under a screen.

use itertools::Itertools;
use tui_realm_stdlib::Table;
use tuirealm::{
    props::{Color, TextSpan},
    tui::prelude::Rect,
    Frame, MockComponent,
};

const HINTS_PER_ROW: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KeyHint {
    pub key: char,
    pub label: &'static str,
    /// The bound action is still running
    pub busy: bool,
}

impl KeyHint {
    fn span(&self) -> TextSpan {
        if self.busy {
            TextSpan::new(format!("{} - {} (pending)", self.key, self.label)).fg(Color::DarkGray)
        } else {
            TextSpan::new(format!("{} - {}", self.key, self.label))
        }
    }
}

pub(crate) fn view(frame: &mut Frame, area: Rect, hints: &[KeyHint]) {
    let rows: Vec<Vec<TextSpan>> = hints
        .iter()
        .map(KeyHint::span)
        .chunks(HINTS_PER_ROW)
        .into_iter()
        .map(|row| row.collect())
        .collect();

    Table::default().table(rows).view(frame, area);
}
