use std::io;
use std::io::Write;
use std::sync::Arc;

use color_eyre::Result;
use parking_lot::Mutex;

#[cfg(windows)]
use color_eyre::eyre::bail;
#[cfg(windows)]
use std::fs::File;
#[cfg(windows)]
use std::mem::ManuallyDrop;
#[cfg(windows)]
use std::os::windows::io::FromRawHandle;
#[cfg(windows)]
use std::os::windows::io::RawHandle;
#[cfg(windows)]
use windows::Win32::System::Console::AllocConsole;
#[cfg(windows)]
use windows::Win32::System::Console::FreeConsole;
#[cfg(windows)]
use windows::Win32::System::Console::GetStdHandle;
#[cfg(windows)]
use windows::Win32::System::Console::STD_OUTPUT_HANDLE;
#[cfg(windows)]
use windows::Win32::System::Console::SetConsoleOutputCP;

/// OEM United States, the code page the console output is encoded with.
pub const LEGACY_CODE_PAGE: u32 = 437;

/// A cloneable handle onto the launcher's console output. Every write is
/// flushed immediately.
#[derive(Clone)]
pub struct Console {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Console {
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn write_line(&self, line: impl std::fmt::Display) -> io::Result<()> {
        let mut sink = self.sink.lock();
        writeln!(sink, "{line}")?;
        sink.flush()
    }
}

impl Write for Console {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut sink = self.sink.lock();
        sink.write_all(buf)?;
        sink.flush()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.lock().flush()
    }
}

/// Owns the console for as long as the launcher wants to print to it.
///
/// Has to be bound to a variable in `main`; dropping it flushes pending output
/// and releases a console this process allocated.
pub struct ConsoleSession {
    console: Console,
    #[cfg(windows)]
    allocated: bool,
}

impl ConsoleSession {
    #[cfg(windows)]
    pub fn attach() -> Result<Self> {
        // Fails when a console is already attached, which is fine
        let allocated = unsafe { AllocConsole() }.is_ok();

        unsafe { SetConsoleOutputCP(LEGACY_CODE_PAGE) }?;

        let handle = unsafe { GetStdHandle(STD_OUTPUT_HANDLE) }?;
        if handle.is_invalid() {
            bail!("the attached console has no standard output handle");
        }

        let stdout = unsafe { StdoutHandle::from_raw(handle.0) };

        Ok(Self {
            console: Console::from_writer(CodePageWriter::new(stdout)),
            allocated,
        })
    }

    #[cfg(not(windows))]
    pub fn attach() -> Result<Self> {
        Ok(Self {
            console: Console::from_writer(io::stdout()),
        })
    }

    pub fn console(&self) -> Console {
        self.console.clone()
    }

    #[cfg(windows)]
    fn release(&self) {
        if self.allocated {
            let _ = unsafe { FreeConsole() };
        }
    }

    #[cfg(not(windows))]
    const fn release(&self) {}
}

impl Drop for ConsoleSession {
    fn drop(&mut self) {
        let _ = self.console.flush();
        self.release();
    }
}

/// Writes to the process's standard output handle without owning it; the
/// handle stays open when the last `Console` clone goes away.
#[cfg(windows)]
struct StdoutHandle(ManuallyDrop<File>);

#[cfg(windows)]
impl StdoutHandle {
    /// # Safety
    ///
    /// `handle` must be a valid, writable handle for the life of the process.
    unsafe fn from_raw(handle: RawHandle) -> Self {
        Self(ManuallyDrop::new(unsafe { File::from_raw_handle(handle) }))
    }
}

#[cfg(windows)]
impl Write for StdoutHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

/// Re-encodes UTF-8 text to code page 437 before handing it to `inner`.
#[cfg(any(windows, test))]
struct CodePageWriter<W> {
    inner: W,
}

#[cfg(any(windows, test))]
impl<W: Write> CodePageWriter<W> {
    const fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[cfg(any(windows, test))]
impl<W: Write> Write for CodePageWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner
            .write_all(&encode_cp437(&String::from_utf8_lossy(buf)))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// 0x80..=0xFF; the lower half is ASCII
#[cfg(any(windows, test))]
const CP437_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å', //
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ', //
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»', //
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐', //
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧', //
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀', //
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩', //
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{a0}',
];

#[cfg(any(windows, test))]
fn encode_cp437(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            if c.is_ascii() {
                c as u8
            } else {
                CP437_HIGH
                    .iter()
                    .position(|&high| high == c)
                    .map_or(b'?', |offset| 0x80 + offset as u8)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn ascii_is_unchanged() {
        assert_eq!(encode_cp437("Godot 4.3\r\n\t~"), b"Godot 4.3\r\n\t~".to_vec());
    }

    #[test]
    fn maps_code_page_characters() {
        assert_eq!(encode_cp437("é"), vec![0x82]);
        assert_eq!(encode_cp437("Ç"), vec![0x80]);
        assert_eq!(encode_cp437("█"), vec![0xDB]);
        assert_eq!(encode_cp437("°C"), vec![0xF8, b'C']);
        assert_eq!(encode_cp437("\u{a0}"), vec![0xFF]);
    }

    #[test]
    fn unmapped_characters_become_question_marks() {
        assert_eq!(encode_cp437("日本 €"), b"?? ?".to_vec());
    }

    #[test]
    fn code_page_writer_reports_the_utf8_length() {
        let captured = Captured::default();
        let mut writer = CodePageWriter::new(captured.clone());

        assert_eq!(writer.write("né".as_bytes()).unwrap(), 3);
        assert_eq!(*captured.0.lock(), vec![b'n', 0x82]);
    }

    #[test]
    fn clones_share_one_sink() {
        let captured = Captured::default();
        let console = Console::from_writer(captured.clone());
        let mut other = console.clone();

        console.write_line("[Child] first").unwrap();
        write!(other, "second").unwrap();

        assert_eq!(
            String::from_utf8(captured.0.lock().clone()).unwrap(),
            "[Child] first\nsecond"
        );
    }

    #[cfg(windows)]
    #[test]
    fn dropping_the_console_leaves_the_handle_open() {
        use std::os::windows::io::AsRawHandle;

        let path = std::env::temp_dir().join(format!(
            "godot-launcher-console-{}.txt",
            std::process::id()
        ));
        let file = File::create(&path).unwrap();

        let console = Console::from_writer(CodePageWriter::new(unsafe {
            StdoutHandle::from_raw(file.as_raw_handle())
        }));
        console.write_line("first é").unwrap();
        drop(console);

        (&file).write_all(b"second").unwrap();
        drop(file);

        assert_eq!(
            std::fs::read(&path).unwrap(),
            b"first \x82\nsecond".to_vec()
        );
        let _ = std::fs::remove_file(&path);
    }
}
