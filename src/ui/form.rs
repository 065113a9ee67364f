//! Action forms.
//!
//! A form lists the labelled fields of one contract action, all visible at
//! once. Enter moves to the next field and, on the last one, submits the
//! action built from the typed values.

mod field;

use tuirealm::{
    event::{Key, KeyEvent, KeyModifiers},
    tui::{
        prelude::{Alignment, Constraint, Direction, Layout, Rect},
        widgets::{Block, Borders},
    },
    Frame,
};

pub(crate) use self::field::FormField;
use crate::backend::actions::ActionTask;

/// Outcome of a key press in a form.
#[derive(Debug, PartialEq)]
pub(crate) enum FormStatus {
    Submit(ActionTask),
    Redraw,
    Ignored,
    Cancel,
}

pub(crate) struct ActionForm {
    title: &'static str,
    fields: Vec<FormField>,
    focus: usize,
    build: fn(Vec<String>) -> ActionTask,
}

impl ActionForm {
    /// `build` receives the field values in order, trimmed.
    pub(crate) fn new(
        title: &'static str,
        fields: Vec<FormField>,
        build: fn(Vec<String>) -> ActionTask,
    ) -> Self {
        let mut form = ActionForm {
            title,
            fields,
            focus: 0,
            build,
        };
        form.focus_on(0);
        form
    }

    pub(crate) fn title(&self) -> &'static str {
        self.title
    }

    /// Rows needed to draw the form, borders included.
    pub(crate) fn height(&self) -> u16 {
        u16::try_from(self.fields.len()).unwrap_or(u16::MAX).saturating_add(2)
    }

    #[cfg(test)]
    fn focus(&self) -> usize {
        self.focus
    }

    fn focus_on(&mut self, index: usize) {
        self.focus = index;
        for (i, field) in self.fields.iter_mut().enumerate() {
            field.set_focus(i == index);
        }
    }

    fn shift_focus(&mut self, forward: bool) {
        let count = self.fields.len().max(1);
        let next = if forward {
            (self.focus + 1) % count
        } else {
            (self.focus + count - 1) % count
        };
        self.focus_on(next);
    }

    pub(crate) fn on_key(&mut self, key: KeyEvent) -> FormStatus {
        match key {
            KeyEvent { code: Key::Esc, .. }
            | KeyEvent {
                code: Key::Char('q'),
                modifiers: KeyModifiers::CONTROL,
            } => FormStatus::Cancel,
            KeyEvent {
                code: Key::Enter, ..
            } if self.focus + 1 < self.fields.len() => {
                self.focus_on(self.focus + 1);
                FormStatus::Redraw
            }
            KeyEvent {
                code: Key::Enter, ..
            } => {
                let values = self.fields.iter().map(FormField::value).collect();
                FormStatus::Submit((self.build)(values))
            }
            KeyEvent {
                code: Key::Tab | Key::Down,
                ..
            } => {
                self.shift_focus(true);
                FormStatus::Redraw
            }
            KeyEvent {
                code: Key::BackTab | Key::Up,
                ..
            } => {
                self.shift_focus(false);
                FormStatus::Redraw
            }
            key => match self.fields.get_mut(self.focus) {
                Some(field) => {
                    if field.edit(key) {
                        FormStatus::Redraw
                    } else {
                        FormStatus::Ignored
                    }
                }
                None => FormStatus::Ignored,
            },
        }
    }

    pub(crate) fn view(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::new()
            .borders(Borders::ALL)
            .title(format!("{} (Enter: next / send, Esc: cancel)", self.title))
            .title_alignment(Alignment::Left);
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Length(1); self.fields.len()])
            .split(block.inner(area));

        frame.render_widget(block, area);
        for (field, row) in self.fields.iter_mut().zip(rows.iter()) {
            field.view(frame, *row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(form: &mut ActionForm, code: Key) -> FormStatus {
        form.on_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn typed(form: &mut ActionForm, text: &str) {
        for c in text.chars() {
            assert_eq!(press(form, Key::Char(c)), FormStatus::Redraw);
        }
    }

    fn beneficiary_form(wallet: &str) -> ActionForm {
        ActionForm::new(
            "Add beneficiary",
            vec![
                FormField::new("Wallet", "0x...", wallet),
                FormField::new("Share", "Percent", ""),
            ],
            |values| {
                let mut values = values.into_iter();
                ActionTask::AddBeneficiary {
                    wallet: values.next().unwrap_or_default(),
                    share: values.next().unwrap_or_default(),
                }
            },
        )
    }

    #[test]
    fn enter_walks_the_fields_then_submits() {
        let mut form = beneficiary_form("0xabc");
        assert_eq!(form.height(), 4);

        typed(&mut form, "d");
        assert_eq!(press(&mut form, Key::Enter), FormStatus::Redraw);
        assert_eq!(form.focus(), 1);

        typed(&mut form, " 10 ");
        assert_eq!(
            press(&mut form, Key::Enter),
            FormStatus::Submit(ActionTask::AddBeneficiary {
                wallet: "0xabcd".to_owned(),
                share: "10".to_owned(),
            })
        );
    }

    #[test]
    fn focus_wraps_around() {
        let mut form = beneficiary_form("");
        press(&mut form, Key::BackTab);
        assert_eq!(form.focus(), 1);
        press(&mut form, Key::Tab);
        assert_eq!(form.focus(), 0);
    }

    #[test]
    fn escape_cancels_and_unknown_keys_are_ignored() {
        let mut form = beneficiary_form("");
        assert_eq!(press(&mut form, Key::Function(5)), FormStatus::Ignored);
        assert_eq!(press(&mut form, Key::Esc), FormStatus::Cancel);
    }
}
