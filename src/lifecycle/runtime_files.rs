//! Marker files under the runtime directory.
//!
//! Co-located processes read these to discover the gateway's pid and the
//! dynamically chosen listener addresses. Files are removed on explicit
//! cleanup or when the tracker is dropped, whichever comes first.

use parking_lot::Mutex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const PID_FILENAME: &str = "gateway.pid";
pub const MANAGEMENT_URL_FILENAME: &str = "management.url";
pub const STATIC_URL_FILENAME: &str = "static.url";

/// Tracks every marker file written so they can be removed at shutdown.
#[derive(Debug)]
pub struct RuntimeFiles {
    dir: PathBuf,
    written: Mutex<Vec<PathBuf>>,
}

impl RuntimeFiles {
    /// Ensure the runtime directory exists and is writable.
    pub fn prepare(dir: &Path) -> io::Result<Self> {
        create_dir(dir).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!(
                    "please ensure the owner of this service has write permission to {}: {e}",
                    dir.display()
                ),
            )
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: Mutex::new(Vec::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the decimal process id.
    pub fn write_pid(&self) -> io::Result<PathBuf> {
        self.write(PID_FILENAME, &std::process::id().to_string())
    }

    /// Write a listener address such as `http://127.0.0.1:41234`.
    pub fn write_address(&self, filename: &str, address: &str) -> io::Result<PathBuf> {
        self.write(filename, address)
    }

    /// Remove every file written so far. Failures are logged only.
    pub fn cleanup(&self) {
        for path in self.written.lock().drain(..) {
            if let Err(e) = fs::remove_file(&path) {
                tracing::error!(path = %path.display(), error = %e, "Failed to clean up runtime file");
            }
        }
    }

    fn write(&self, filename: &str, contents: &str) -> io::Result<PathBuf> {
        create_dir(&self.dir)?;
        let path = self.dir.join(filename);
        write_private(&path, contents)?;

        let mut written = self.written.lock();
        if !written.contains(&path) {
            written.push(path.clone());
        }
        Ok(path)
    }
}

impl Drop for RuntimeFiles {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Read a listener address written by [`RuntimeFiles::write_address`].
pub fn read_address(dir: &Path, filename: &str) -> io::Result<String> {
    Ok(fs::read_to_string(dir.join(filename))?.trim().to_string())
}

#[cfg(unix)]
fn create_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o755).create(dir)
}

#[cfg(not(unix))]
fn create_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    fs::write(path, contents)
}
