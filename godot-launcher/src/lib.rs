#![warn(clippy::all)]

pub mod args;
pub mod child;
pub mod console;
pub mod error;
pub mod launcher;

pub use args::LaunchArgs;
pub use args::VERBOSE_FLAGS;
pub use console::Console;
pub use console::ConsoleSession;
pub use error::LaunchError;
pub use launcher::Launcher;

/// Looked up in the working directory, never next to the launcher binary.
#[cfg(windows)]
pub const CHILD_EXECUTABLE: &str = "Godot_console.exe";
#[cfg(not(windows))]
pub const CHILD_EXECUTABLE: &str = "Godot_console";
