use std::fmt::Display;
use std::fmt::Formatter;
use std::io;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::process::Child;
use std::thread;
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;

use crate::console::Console;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Stdout => "[Child]",
            Self::Stderr => "[Child Error]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildLine {
    pub stream: OutputStream,
    pub text: String,
}

impl Display for ChildLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.stream.tag(), self.text)
    }
}

/// Echoes the child's piped stdout and stderr to `console` until both
/// streams are closed.
///
/// Lines keep their order within a stream; the two streams interleave in
/// whatever order their lines arrive.
pub fn echo_output(child: &mut Child, console: &Console) -> io::Result<()> {
    let (sender, receiver) = crossbeam_channel::unbounded();
    let mut readers = vec![];

    if let Some(stdout) = child.stdout.take() {
        readers.push(forward(stdout, OutputStream::Stdout, sender.clone())?);
    }

    if let Some(stderr) = child.stderr.take() {
        readers.push(forward(stderr, OutputStream::Stderr, sender.clone())?);
    }

    // The channel disconnects once both reader threads hang up
    drop(sender);
    drain(&receiver, readers, console);

    Ok(())
}

fn drain(receiver: &Receiver<ChildLine>, readers: Vec<JoinHandle<()>>, console: &Console) {
    for line in receiver {
        if let Err(error) = console.write_line(&line) {
            tracing::warn!("could not echo child output: {error}");
        }
    }

    for reader in readers {
        let name = reader.thread().name().unwrap_or("child reader").to_string();
        if reader.join().is_err() {
            tracing::warn!("{name} panicked, child output may be incomplete");
        }
    }
}

fn forward<R: Read + Send + 'static>(
    reader: R,
    stream: OutputStream,
    sender: Sender<ChildLine>,
) -> io::Result<JoinHandle<()>> {
    let name = match stream {
        OutputStream::Stdout => "child-stdout",
        OutputStream::Stderr => "child-stderr",
    };

    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            if let Err(error) = read_lines(reader, stream, &sender) {
                tracing::warn!("stopped reading child {}: {error}", name);
            }
        })
}

fn read_lines<R: Read>(reader: R, stream: OutputStream, sender: &Sender<ChildLine>) -> io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = vec![];

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }

        let text = String::from_utf8_lossy(trim_line_ending(&buf));
        if text.is_empty() {
            continue;
        }

        let line = ChildLine {
            stream,
            text: text.into_owned(),
        };

        if sender.send(line).is_err() {
            return Ok(());
        }
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
