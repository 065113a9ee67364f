pub mod backend;
pub mod config;
pub mod relay;
pub mod ui;

use std::panic;

use backend::BackendEvent;
use tuirealm::event::KeyEvent;

pub enum Event {
    Key(KeyEvent),
    Backend(BackendEvent),
}

/// Routes panics through `tracing` before the default hook runs, so they end
/// up in the log even when the terminal is in raw mode.
pub fn log_panics() {
    let default_panic_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| {
                panic_info
                    .payload()
                    .downcast_ref::<String>()
                    .map(String::as_str)
            })
            .unwrap_or("unknown");

        let location = panic_info
            .location()
            .unwrap_or_else(|| panic::Location::caller());

        tracing::error!(
            location = tracing::field::display(location),
            "Panic occurred: {}",
            message
        );

        default_panic_hook(panic_info);
    }));
}
