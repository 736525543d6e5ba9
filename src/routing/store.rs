//! Durable storage of the `path → target` mapping.
//!
//! The file is a flat JSON object, rewritten in full on every change.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

/// File name of the persisted route table inside the runtime directory.
pub const ROUTES_FILENAME: &str = "routes.json";

/// Read the persisted mapping. A missing file yields an empty mapping.
pub fn load_routes(path: &Path) -> io::Result<HashMap<String, String>> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(e),
    };
    Ok(serde_json::from_slice(&content)?)
}

/// Overwrite the persisted mapping.
///
/// Written to a sibling temp file first and renamed into place, so a crash
/// mid-write never leaves a truncated table behind.
pub fn save_routes(path: &Path, targets: &HashMap<String, String>) -> io::Result<()> {
    let content = serde_json::to_vec(targets)?;
    let tmp = path.with_extension("json.tmp");
    write_private(&tmp, &content)?;
    fs::rename(&tmp, path)
}

#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(content)
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> io::Result<()> {
    fs::write(path, content)
}
