#![warn(clippy::all)]
#![windows_subsystem = "windows"]

use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use godot_launcher::Console;
use godot_launcher::ConsoleSession;
use godot_launcher::LaunchArgs;
use godot_launcher::Launcher;

fn setup(console: &Console) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let writer = console.clone();

    tracing::subscriber::set_global_default(
        tracing_subscriber::fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_target(false)
            .without_time()
            .finish(),
    )?;

    // Record panics as `tracing` events so they reach the console
    std::panic::set_hook(Box::new(|panic| {
        if let Some(location) = panic.location() {
            tracing::error!(
                message = %panic,
                panic.file = location.file(),
                panic.line = location.line(),
                panic.column = location.column(),
            );
        } else {
            tracing::error!(message = %panic);
        }
    }));

    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = LaunchArgs::from_env();

    // Console output guard has to have an assignment in the main fn to live
    // until the child has exited
    let session = if args.verbose() {
        ConsoleSession::attach().ok()
    } else {
        None
    };

    let mut launcher = Launcher::new();
    if let Some(session) = &session {
        setup(&session.console())?;
        launcher = launcher.console(session.console());
    }

    let code = launcher.run(&args);

    // `exit` skips destructors
    drop(launcher);
    drop(session);
    std::process::exit(code);
}
