use std::ffi::OsStr;
use std::ffi::OsString;

/// Launcher-private flags. They are matched exactly and never forwarded.
pub const VERBOSE_FLAGS: [&str; 2] = ["--verbose", "-v"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchArgs {
    verbose: bool,
    forwarded: Vec<OsString>,
}

impl LaunchArgs {
    pub fn from_env() -> Self {
        Self::parse(std::env::args_os().skip(1))
    }

    /// Splits the launcher's own flags out of `args`; everything else is
    /// kept verbatim and in order for the child.
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut verbose = false;
        let mut forwarded = vec![];

        for arg in args {
            let arg = arg.into();
            if is_verbose_flag(&arg) {
                verbose = true;
            } else {
                forwarded.push(arg);
            }
        }

        Self { verbose, forwarded }
    }

    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn forwarded(&self) -> &[OsString] {
        &self.forwarded
    }

    /// The forwarded arguments joined by single spaces.
    pub fn command_line(&self) -> OsString {
        let mut command_line = OsString::new();

        for (i, arg) in self.forwarded.iter().enumerate() {
            if i > 0 {
                command_line.push(" ");
            }
            command_line.push(arg);
        }

        command_line
    }
}

fn is_verbose_flag(arg: &OsStr) -> bool {
    VERBOSE_FLAGS.iter().any(|flag| arg == OsStr::new(flag))
}
