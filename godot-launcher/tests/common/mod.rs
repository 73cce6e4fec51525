#![allow(dead_code)]

use std::io;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use godot_launcher::CHILD_EXECUTABLE;
use parking_lot::Mutex;
use parking_lot::MutexGuard;
use uuid::Uuid;

// Writing a stub while another test forks can leave the file busy (ETXTBSY)
static SERIAL: Mutex<()> = parking_lot::const_mutex(());

pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock()
}

/// A throwaway working directory for one launcher invocation.
pub struct Sandbox {
    dir: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("godot-launcher-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn child_path(&self) -> PathBuf {
        self.dir.join(CHILD_EXECUTABLE)
    }

    /// Installs a `/bin/sh` stub under the child's fixed name.
    pub fn install_child(&self, script: &str) {
        self.write_child(script, 0o755);
    }

    pub fn install_non_executable_child(&self, script: &str) {
        self.write_child(script, 0o644);
    }

    fn write_child(&self, script: &str, mode: u32) {
        let path = self.child_path();
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

/// A writer that keeps everything written to it.
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
