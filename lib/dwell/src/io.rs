use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

/// Read-only view of the whole input. Empty files are represented without a
/// mapping, since zero-length mappings are rejected by the OS.
pub struct InputMap {
    map: Option<Mmap>,
}

impl InputMap {
    pub fn bytes(&self) -> &[u8] {
        self.map.as_ref().map(|m| &m[..]).unwrap_or(&[])
    }
}

pub fn map_input(path: impl AsRef<Path>) -> Result<InputMap> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open input {}", path.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("stat input {}", path.display()))?
        .len();
    if len == 0 {
        return Ok(InputMap { map: None });
    }
    let map = unsafe { Mmap::map(&file) }.with_context(|| format!("mmap input {}", path.display()))?;
    Ok(InputMap { map: Some(map) })
}

pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    fs::create_dir_all(path.as_ref())
        .with_context(|| format!("create_dir_all {}", path.as_ref().display()))
}

pub fn open_writer(path: impl AsRef<Path>) -> Result<BufWriter<File>> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }
    let file = File::create(path).with_context(|| format!("create output {}", path.display()))?;
    Ok(BufWriter::new(file))
}
