//! Domain types and wire DTOs shared by the client core and the desktop app.

pub mod domain;
pub mod error;
pub mod protocol;
