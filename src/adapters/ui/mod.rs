pub mod banner;
pub mod tui;

pub use tui::TuiApp;

/// Prints the welcome banner. Call once at startup, after tracing init.
pub fn init_ui() {
    banner::print_welcome();
}
