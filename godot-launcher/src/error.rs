use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("{} not found at {}", crate::CHILD_EXECUTABLE, .path.display())]
    MissingChildExecutable { path: PathBuf },
    #[error("error launching {}: {}", crate::CHILD_EXECUTABLE, .0)]
    Launch(#[from] io::Error),
}

impl LaunchError {
    /// Every launch failure is reported to the caller the same way.
    pub const fn exit_code(&self) -> i32 {
        1
    }
}
