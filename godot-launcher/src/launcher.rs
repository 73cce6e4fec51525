use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;

#[cfg(windows)]
use std::os::windows::process::CommandExt;
#[cfg(windows)]
use windows::Win32::System::Threading::CREATE_NO_WINDOW;

use crate::CHILD_EXECUTABLE;
use crate::args::LaunchArgs;
use crate::child;
use crate::console::Console;
use crate::error::LaunchError;

/// Spawns the child executable, waits for it and hands back its exit code.
///
/// With a console, the child's output is echoed to it; without one the child
/// runs silently and nothing is printed.
#[derive(Clone, Default)]
pub struct Launcher {
    working_dir: Option<PathBuf>,
    console: Option<Console>,
}

impl Launcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look for the child here instead of the current directory at launch time.
    #[must_use]
    pub fn working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    #[must_use]
    pub fn console(mut self, console: Console) -> Self {
        self.console = Some(console);
        self
    }

    pub fn run(&self, args: &LaunchArgs) -> i32 {
        match self.launch(args) {
            Ok(code) => code,
            Err(error) => {
                tracing::error!("{error}");
                error.exit_code()
            }
        }
    }

    pub fn launch(&self, args: &LaunchArgs) -> Result<i32, LaunchError> {
        let working_dir = match &self.working_dir {
            Some(working_dir) => working_dir.clone(),
            None => std::env::current_dir()?,
        };

        let executable = working_dir.join(CHILD_EXECUTABLE);

        tracing::info!("working directory: {}", working_dir.display());
        tracing::info!(
            "looking for {CHILD_EXECUTABLE} at: {}",
            executable.display()
        );

        if !executable.is_file() {
            return Err(LaunchError::MissingChildExecutable { path: executable });
        }

        tracing::info!("launching {CHILD_EXECUTABLE}...");
        if !args.forwarded().is_empty() {
            tracing::info!("arguments: {}", args.command_line().to_string_lossy());
        }

        let mut child = self.command(&executable, &working_dir, args).spawn()?;

        if let Some(console) = &self.console {
            if let Err(error) = child::echo_output(&mut child, console) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(error.into());
            }
        }

        let status = child.wait()?;
        let code = status.code().ok_or_else(|| {
            io::Error::other(format!(
                "{CHILD_EXECUTABLE} terminated without an exit code ({status})"
            ))
        })?;

        tracing::info!("{CHILD_EXECUTABLE} exited with code: {code}");

        Ok(code)
    }

    fn command(&self, executable: &Path, working_dir: &Path, args: &LaunchArgs) -> Command {
        let mut command = Command::new(executable);
        command.current_dir(working_dir);

        Self::forward_args(&mut command, args);

        if self.console.is_some() {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            Self::hide_window(&mut command);
        }

        command
    }

    /// Windows children get the arguments as one raw string, exactly as joined.
    #[cfg(windows)]
    fn forward_args(command: &mut Command, args: &LaunchArgs) {
        if !args.forwarded().is_empty() {
            command.raw_arg(args.command_line());
        }
    }

    #[cfg(not(windows))]
    fn forward_args(command: &mut Command, args: &LaunchArgs) {
        command.args(args.forwarded());
    }

    #[cfg(windows)]
    fn hide_window(command: &mut Command) {
        command.creation_flags(CREATE_NO_WINDOW.0);
    }

    /// Without a GUI subsystem the child would inherit our std handles.
    #[cfg(not(windows))]
    fn hide_window(command: &mut Command) {
        command.stdout(Stdio::null()).stderr(Stdio::null());
    }
}
