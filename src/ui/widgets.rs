//! Widgets shared by screens.

pub(crate) mod key_help;
pub(crate) mod panel;
