//! UI layer for the desktop client: app shell, panels, widgets, themes, and
//! window chrome.

pub mod app;
pub mod layout;
pub mod panels;
pub mod theme;
pub mod widgets;

pub use app::{DesktopApp, StartupConfig};
