//! Interactive terminal client built on Ratatui.

mod app;
mod compose;
mod debug_log;
pub mod log_capture;
mod messages;
mod sidebar;
mod ui;

pub use app::run;
