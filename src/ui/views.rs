//! Application views.
//! Each module contains definitions of screens and forms related to a
//! subdomain.

pub(crate) mod actions;
pub(crate) mod main;
